//! Recipe image storage
//!
//! Images arrive inline as `data:image/<ext>;base64,<payload>` URIs. They are
//! decoded, checked against the media configuration and written below the
//! media root under a random file name.

use crate::config::MediaConfig;
use anyhow::Context;
use data_encoding::BASE64;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

/// Directory below the media root that recipe images are written to
pub const RECIPE_IMAGE_DIR: &str = "recipes/images";

/// Error types for image handling
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Invalid image data: {0}")]
    InvalidDataUri(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("Image is empty")]
    Empty,

    #[error("Image too large: {size} bytes (maximum {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A decoded image ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Writes decoded images into the media directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    config: MediaConfig,
}

impl ImageStore {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Parse and validate a data URI without touching the filesystem
    pub fn decode(&self, data_uri: &str) -> Result<DecodedImage, ImageError> {
        let rest = data_uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUri("expected a data: URI".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidDataUri("missing ',' separator".to_string()))?;

        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::InvalidDataUri("payload must be base64".to_string()))?
            .to_ascii_lowercase();

        if !mime_type.starts_with("image/") {
            return Err(ImageError::UnsupportedType(mime_type));
        }
        let mime_type = if mime_type == "image/jpg" {
            "image/jpeg".to_string()
        } else {
            mime_type
        };
        if !self.config.is_type_allowed(&mime_type) {
            return Err(ImageError::UnsupportedType(mime_type));
        }

        let payload = payload.trim();
        if payload.is_empty() {
            return Err(ImageError::Empty);
        }

        // Reject oversized payloads before allocating the decoded buffer.
        let estimated = (payload.len() as u64 / 4) * 3;
        if estimated > self.config.max_image_size + 3 {
            return Err(ImageError::TooLarge {
                size: estimated,
                max: self.config.max_image_size,
            });
        }

        let bytes = BASE64
            .decode(payload.as_bytes())
            .map_err(|e| ImageError::InvalidDataUri(format!("bad base64 payload: {}", e)))?;

        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() as u64 > self.config.max_image_size {
            return Err(ImageError::TooLarge {
                size: bytes.len() as u64,
                max: self.config.max_image_size,
            });
        }

        Ok(DecodedImage { mime_type, bytes })
    }

    /// Write a decoded image and return its path relative to the media root
    pub async fn save(&self, image: &DecodedImage) -> Result<String, ImageError> {
        let dir: PathBuf = self.config.root.join(RECIPE_IMAGE_DIR);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media directory {}", dir.display()))?;

        let filename = format!(
            "{}.{}",
            Uuid::new_v4(),
            self.config.get_extension(&image.mime_type)
        );
        let file_path = dir.join(&filename);

        fs::write(&file_path, &image.bytes)
            .await
            .with_context(|| format!("Failed to write image {}", file_path.display()))?;

        tracing::debug!(path = %file_path.display(), size = image.bytes.len(), "Recipe image saved");
        Ok(format!("{}/{}", RECIPE_IMAGE_DIR, filename))
    }

    /// Decode and save a data URI in one step
    pub async fn store(&self, data_uri: &str) -> Result<String, ImageError> {
        let image = self.decode(data_uri)?;
        self.save(&image).await
    }

    /// Remove a stored image. A file that is already gone is not an error.
    pub async fn remove(&self, path: &str) {
        let file_path = self.config.root.join(path);
        if let Err(e) = fs::remove_file(&file_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %file_path.display(), "Failed to remove image: {}", e);
            }
        }
    }

    /// Public URL for a stored path
    pub fn public_url(&self, path: &str) -> String {
        self.config.public_url(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // 1x1 transparent PNG
    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn store_in(dir: &TempDir) -> ImageStore {
        ImageStore::new(MediaConfig {
            root: dir.path().to_path_buf(),
            ..MediaConfig::default()
        })
    }

    #[test]
    fn test_decode_png() {
        let dir = TempDir::new().unwrap();
        let image = store_in(&dir)
            .decode(&format!("data:image/png;base64,{}", PNG_1X1))
            .unwrap();

        assert_eq!(image.mime_type, "image/png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn test_decode_normalizes_jpg() {
        let dir = TempDir::new().unwrap();
        let image = store_in(&dir).decode("data:image/JPG;base64,AAEC").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.bytes, vec![0, 1, 2]);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(matches!(store.decode("not a uri"), Err(ImageError::InvalidDataUri(_))));
        assert!(matches!(
            store.decode("data:image/png;base64"),
            Err(ImageError::InvalidDataUri(_))
        ));
        assert!(matches!(
            store.decode("data:image/png,plain"),
            Err(ImageError::InvalidDataUri(_))
        ));
        assert!(matches!(
            store.decode("data:image/png;base64,@@@@"),
            Err(ImageError::InvalidDataUri(_))
        ));
        assert!(matches!(
            store.decode("data:image/png;base64,"),
            Err(ImageError::Empty)
        ));
    }

    #[test]
    fn test_decode_rejects_types() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(matches!(
            store.decode("data:text/plain;base64,AAEC"),
            Err(ImageError::UnsupportedType(_))
        ));
        assert!(matches!(
            store.decode("data:image/svg+xml;base64,AAEC"),
            Err(ImageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized() {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(MediaConfig {
            root: dir.path().to_path_buf(),
            max_image_size: 4,
            ..MediaConfig::default()
        });

        assert!(store.decode("data:image/png;base64,AAECAw==").is_ok());
        assert!(matches!(
            store.decode("data:image/png;base64,AAECAwQF"),
            Err(ImageError::TooLarge { size: 6, max: 4 })
        ));
    }

    #[tokio::test]
    async fn test_store_writes_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let path = store
            .store(&format!("data:image/png;base64,{}", PNG_1X1))
            .await
            .unwrap();

        assert!(path.starts_with("recipes/images/"));
        assert!(path.ends_with(".png"));
        let written = std::fs::read(dir.path().join(&path)).unwrap();
        assert_eq!(&written[1..4], b"PNG");
        assert_eq!(store.public_url(&path), format!("/media/{}", path));
    }

    #[tokio::test]
    async fn test_remove_deletes_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let path = store
            .store(&format!("data:image/png;base64,{}", PNG_1X1))
            .await
            .unwrap();
        store.remove(&path).await;
        assert!(!dir.path().join(&path).exists());

        // Already gone
        store.remove(&path).await;
    }
}
