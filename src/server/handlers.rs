//! API route handlers

use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::{ApiError, AppState};
use crate::config::Settings;
use crate::content::{FrontMatter, Post};
use crate::store::{Asset, PostFile, StoreError};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// JSON body whose rejection is rendered in the error envelope
type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Success envelope: `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
    }))
}

fn done() -> ApiResult<()> {
    Ok(Json(ApiResponse {
        success: true,
        data: None,
    }))
}

/// Run blocking file system work off the async runtime
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

pub async fn index() -> &'static str {
    "Hexo Editor Backend running"
}

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.workspace().settings)
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    body: JsonBody<Settings>,
) -> ApiResult<()> {
    let Json(settings) = body?;
    let mut workspace = state.workspace();
    blocking(move || Ok(workspace.save_settings(settings)?)).await?;
    state.previews().clear();
    tracing::info!("Settings updated");
    done()
}

#[derive(Debug, Deserialize)]
pub struct BrowseRequest {
    path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    success: bool,
    current_path: String,
    parent_path: Option<String>,
    folders: Vec<String>,
}

/// List the sub-directories of a directory, for the folder picker
pub async fn browse(body: JsonBody<BrowseRequest>) -> Result<Json<BrowseResponse>, ApiError> {
    let Json(request) = body?;
    let dir = request
        .path
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(home_dir);

    let mut folders = Vec::new();
    let mut entries = tokio::fs::read_dir(&dir).await.map_err(StoreError::from)?;
    while let Some(entry) = entries.next_entry().await.map_err(StoreError::from)? {
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            folders.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    folders.sort();

    Ok(Json(BrowseResponse {
        success: true,
        current_path: dir.display().to_string(),
        parent_path: dir.parent().map(|p| p.display().to_string()),
        folders,
    }))
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/"))
}

pub async fn list_posts(State(state): State<Arc<AppState>>) -> ApiResult<Vec<PostFile>> {
    let posts = state.workspace().posts();
    ok(blocking(move || Ok(posts.list())).await?)
}

#[derive(Debug, Deserialize)]
pub struct SavePostRequest {
    filename: String,
    content: String,
}

pub async fn save_post(
    State(state): State<Arc<AppState>>,
    body: JsonBody<SavePostRequest>,
) -> ApiResult<PostFile> {
    let Json(request) = body?;
    let posts = state.workspace().posts();
    let saved = blocking(move || Ok(posts.save(&request.filename, &request.content)?)).await?;
    ok(saved)
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<()> {
    let posts = state.workspace().posts();
    let name = filename.clone();
    blocking(move || Ok(posts.delete(&name)?)).await?;
    state.previews().invalidate(&filename);
    done()
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    filename: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    filename: String,
    front_matter: FrontMatter,
    raw_body: String,
    html: String,
}

/// Render the preview of unsaved content
pub async fn preview(
    State(state): State<Arc<AppState>>,
    body: JsonBody<PreviewRequest>,
) -> ApiResult<PreviewResponse> {
    let Json(request) = body?;
    let post = Post::from_content(&request.filename, &request.content);
    let html = state
        .previews()
        .render(&state.renderer, &post.filename, &post.content);

    ok(PreviewResponse {
        filename: post.filename,
        front_matter: post.front_matter,
        raw_body: post.raw_body,
        html,
    })
}

pub async fn list_assets(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Asset>> {
    let assets = state.workspace().assets();
    ok(blocking(move || Ok(assets.list())).await?)
}

#[derive(Debug, Deserialize)]
pub struct DeleteAssetQuery {
    folder: Option<String>,
    name: Option<String>,
}

pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeleteAssetQuery>,
) -> ApiResult<()> {
    let name = query
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing name".to_string()))?;
    let folder = query.folder.unwrap_or_default();
    let assets = state.workspace().assets();
    blocking(move || Ok(assets.delete(&folder, &name)?)).await?;
    done()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameAssetRequest {
    #[serde(default)]
    folder: String,
    old_name: Option<String>,
    new_name: Option<String>,
}

pub async fn rename_asset(
    State(state): State<Arc<AppState>>,
    body: JsonBody<RenameAssetRequest>,
) -> ApiResult<Asset> {
    let Json(request) = body?;
    let (Some(old_name), Some(new_name)) = (request.old_name, request.new_name) else {
        return Err(ApiError::BadRequest("Missing parameters".to_string()));
    };
    let assets = state.workspace().assets();
    let folder = request.folder;
    let asset = blocking(move || Ok(assets.rename(&folder, &old_name, &new_name)?)).await?;
    ok(asset)
}

/// Serve a raw image file from the image root
pub async fn serve_image(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    request: Request,
) -> Response {
    if path.contains("..") {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    let assets = state.workspace().assets();
    let lookup = tokio::task::spawn_blocking(move || assets.image_file(&path)).await;
    let file = match lookup {
        Ok(Ok(file)) => file,
        Ok(Err(StoreError::InvalidName(_))) => {
            return (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
        Ok(Err(_)) => return (StatusCode::NOT_FOUND, "Image not found").into_response(),
        Err(e) => return ApiError::from(e).into_response(),
    };

    match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(e) => match e {},
    }
}

/// Store an uploaded image. Accepts the `folder` and `file` fields in any order.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Asset> {
    let mut folder = String::new();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "folder" => folder = field.text().await?,
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                file = Some((filename, data));
            }
            _ => {}
        }
    }

    let Some((filename, data)) = file else {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    };

    let assets = state.workspace().assets();
    let asset = blocking(move || Ok(assets.upload(&folder, &filename, &data)?)).await?;
    ok(asset)
}
