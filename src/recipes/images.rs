use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

const IMAGE_DIR: &str = "uploads/recipe";
const URL_TTL_SECS: u64 = 30 * 60;

/// An uploaded image ready to store.
pub struct UploadItem {
    pub body: Bytes,
    pub file_name: Option<String>,
    pub content_type: String,
}

/// Object key for a new recipe image: a fresh UUID plus the upload's extension.
pub fn recipe_image_key(file_name: Option<&str>, content_type: &str) -> String {
    let ext = file_name
        .and_then(|n| std::path::Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .or_else(|| ext_from_mime(content_type).map(|e| format!(".{e}")))
        .unwrap_or_default();
    format!("{IMAGE_DIR}/{}{ext}", Uuid::new_v4())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Uploads the file and returns its key.
pub async fn store_image(st: &AppState, item: UploadItem) -> anyhow::Result<String> {
    let key = recipe_image_key(item.file_name.as_deref(), &item.content_type);
    st.storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Best effort; a dangling object is only logged.
pub async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, key, "failed to delete old recipe image");
    }
}

pub async fn image_url(st: &AppState, key: Option<&str>) -> anyhow::Result<Option<String>> {
    match key {
        Some(k) => {
            let url = st
                .storage
                .presign_get(k, URL_TTL_SECS)
                .await
                .with_context(|| format!("presign url for {}", k))?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}
