//! Configuration module

mod settings;

pub use settings::Language;
pub use settings::Settings;
pub use settings::Theme;
