use axum::extract::{Extension, Path};
use axum::http::header::{self, USER_AGENT};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::UiConfig;
use crate::utils::{classify_user_agent, ApiError};

/// UI variants and the static asset policy, loaded once at startup.
pub struct UiAssets {
    desktop: String,
    mobile: String,
    static_dir: PathBuf,
    allowed: HashSet<String>,
}

impl UiAssets {
    pub fn load(config: &UiConfig) -> std::io::Result<Self> {
        let templates = PathBuf::from(&config.templates_dir);
        let desktop = std::fs::read_to_string(templates.join("index.html"))?;
        let mobile = std::fs::read_to_string(templates.join("mobile.html"))?;
        info!("Loaded UI templates from {}", templates.display());

        Ok(Self {
            desktop,
            mobile,
            static_dir: PathBuf::from(&config.static_dir),
            allowed: config.static_allow_list.iter().cloned().collect(),
        })
    }
}

/// Serve the desktop or handheld UI based on the User-Agent header.
///
/// Phones with "Request Desktop Site" enabled send a desktop UA string and
/// get the desktop variant, which is exactly the intended behavior.
pub async fn index_handler(
    Extension(assets): Extension<Arc<UiAssets>>,
    headers: HeaderMap,
) -> Html<String> {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    let device = classify_user_agent(user_agent);
    debug!("UI request classified as {:?}", device);

    if device.is_handheld() {
        Html(assets.mobile.clone())
    } else {
        Html(assets.desktop.clone())
    }
}

/// Serve one of the allow-listed image assets by exact name. Anything not
/// on the list is a 404 before the filesystem is touched.
pub async fn static_handler(
    Extension(assets): Extension<Arc<UiAssets>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !assets.allowed.contains(&filename) {
        return Err(ApiError::NotFound(format!("File not found: {}", filename)));
    }

    let path = assets.static_dir.join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("File not found: {}", filename)))?;

    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    Ok(([(header::CONTENT_TYPE, mime.to_string())], bytes))
}
