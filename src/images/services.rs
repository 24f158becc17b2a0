use anyhow::Context;
use bytes::Bytes;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

/// Where an uploaded image belongs.
#[derive(Debug, Clone, Copy)]
pub enum Folder {
    Blogs,
    Avatars,
}

impl Folder {
    fn as_str(self) -> &'static str {
        match self {
            Folder::Blogs => "blogs",
            Folder::Avatars => "avatars",
        }
    }
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

/// Stores the image and returns its object key.
pub async fn upload_image(
    st: &AppState,
    folder: Folder,
    owner_id: Uuid,
    image: UploadItem,
) -> Result<String, AppError> {
    let Some(ext) = ext_from_mime(&image.content_type) else {
        return Err(AppError::validation(format!(
            "unsupported image type {}",
            image.content_type
        )));
    };
    if image.body.is_empty() {
        return Err(AppError::validation("image is empty"));
    }
    let key = format!("{}/{}/{}.{}", folder.as_str(), owner_id, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, image.body, &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    info!(%key, "image uploaded");
    Ok(key)
}

/// Deletes an object whose database reference is already gone. Failures are
/// logged; the database state is final at this point.
pub async fn release_image(st: &AppState, key: &str) {
    match st.storage.delete_object(key).await {
        Ok(()) => info!(%key, "image released"),
        Err(e) => error!(error = ?e, %key, "failed to release image"),
    }
}

pub async fn release_images(st: &AppState, keys: &[String]) {
    for key in keys {
        release_image(st, key).await;
    }
}

/// Presigned GET URL for `key`, or `None` when there is no image or
/// presigning fails.
pub async fn image_url(st: &AppState, key: Option<&str>) -> Option<String> {
    let key = key?;
    match st
        .storage
        .presign_get(key, st.config.storage.url_ttl_seconds)
        .await
    {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = ?e, %key, "presign failed");
            None
        }
    }
}
