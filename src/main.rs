//! CLI entry point for hexo-editor

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hexo-editor")]
#[command(author = "Yukang Chen")]
#[command(version)]
#[command(about = "Local editor backend and live preview for Hexo blogs", long_about = None)]
struct Cli {
    /// Settings file (defaults to config.json in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the editor API server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,
    },

    /// Create a new post in the posts directory
    New {
        /// Title of the new post (defaults to the next post number)
        title: Option<String>,

        /// File name (defaults to the slug of the title)
        #[arg(short, long)]
        filename: Option<String>,
    },

    /// List posts or assets
    List {
        /// Type of content to list (post, asset)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Render the preview HTML of a post
    Render {
        /// Markdown file to render
        file: PathBuf,

        /// Write the HTML to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "hexo_editor=debug,info"
    } else {
        "hexo_editor=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from("config.json"));

    match cli.command {
        Commands::Serve { port, ip, open } => {
            tracing::info!("Starting server at http://{}:{}", ip, port);
            hexo_editor::server::start(&settings_path, &ip, port, open).await?;
        }

        Commands::New { title, filename } => {
            let workspace = hexo_editor::Workspace::new(&settings_path);
            let post = workspace.new_post(title.as_deref(), filename.as_deref())?;
            println!("Created: {}", post.filename);
        }

        Commands::List { r#type } => {
            let workspace = hexo_editor::Workspace::new(&settings_path);
            hexo_editor::commands::list::run(&workspace, &r#type)?;
        }

        Commands::Render { file, output } => {
            hexo_editor::commands::render::run(&file, output.as_deref())?;
        }

        Commands::Version => {
            println!("hexo-editor version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
