use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::{
    constants::{IMAGE_EXTENSIONS, RECIPE_IMAGE_DIR},
    error::ApiError,
};

#[derive(Debug, PartialEq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Decodes a `data:image/<format>;base64,<data>` payload.
pub fn decode_image(payload: &str) -> Result<DecodedImage, ApiError> {
    let (header, data) = payload
        .trim()
        .split_once(";base64,")
        .ok_or(ApiError::validation("Image must be a base64 data URI"))?;

    let format = header
        .strip_prefix("data:image/")
        .ok_or(ApiError::validation("Image must be a base64 data URI"))?;

    let extension = IMAGE_EXTENSIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(format))
        .map(|(_, extension)| *extension)
        .ok_or_else(|| ApiError::Validation(format!("Unsupported image format: {format}")))?;

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|_e| ApiError::validation("Image is not valid base64"))?;

    if bytes.is_empty() {
        return Err(ApiError::validation("Image is empty"));
    }

    Ok(DecodedImage { extension, bytes })
}

/// Recipe images on local disk, addressed by paths relative to `root`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
}

impl MediaStorage {
    pub fn new(root: PathBuf, url: String) -> Self {
        Self { root, url }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    pub async fn save_image(&self, image: &DecodedImage) -> Result<String, ApiError> {
        tokio::fs::create_dir_all(self.root.join(RECIPE_IMAGE_DIR)).await?;

        let path = format!("{RECIPE_IMAGE_DIR}/{}.{}", Uuid::new_v4(), image.extension);
        tokio::fs::write(self.root.join(&path), &image.bytes).await?;

        log::debug!("Stored image {path}");
        Ok(path)
    }

    /// Removal failures only leave an orphaned file behind, so they are logged.
    pub async fn remove(&self, path: &str) {
        if let Err(e) = tokio::fs::remove_file(self.root.join(path)).await {
            log::warn!("Failed to remove image {path}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent png
    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    #[test]
    fn decodes_png_payload() {
        let image = decode_image(&format!("data:image/png;base64,{PIXEL}")).unwrap();

        assert_eq!(image.extension, "png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn jpeg_is_stored_as_jpg() {
        let image = decode_image(&format!("data:image/jpeg;base64,{PIXEL}")).unwrap();
        assert_eq!(image.extension, "jpg");
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert!(decode_image(PIXEL).is_err());
        assert!(decode_image(&format!("data:text/plain;base64,{PIXEL}")).is_err());
        assert!(decode_image(&format!("data:image/tiff;base64,{PIXEL}")).is_err());
        assert!(decode_image("data:image/png;base64,!!!").is_err());
        assert!(decode_image("data:image/png;base64,").is_err());
    }

    #[test]
    fn builds_public_url() {
        let storage = MediaStorage::new(PathBuf::from("media"), String::from("/media/"));
        assert_eq!(
            storage.url("recipes/images/a.png"),
            "/media/recipes/images/a.png"
        );
    }

    #[tokio::test]
    async fn saves_and_removes_image() {
        let root = std::env::temp_dir().join(format!("foodgram-media-{}", Uuid::new_v4()));
        let storage = MediaStorage::new(root.clone(), String::from("/media/"));
        let image = decode_image(&format!("data:image/png;base64,{PIXEL}")).unwrap();

        let path = storage.save_image(&image).await.unwrap();
        assert!(path.starts_with("recipes/images/"));
        assert!(path.ends_with(".png"));
        assert_eq!(tokio::fs::read(root.join(&path)).await.unwrap(), image.bytes);

        storage.remove(&path).await;
        assert!(!root.join(&path).exists());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
