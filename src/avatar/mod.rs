use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{imageops::FilterType, ImageFormat};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AvatarConfig;

/// A file received from a multipart upload, held in memory
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("Uploaded file is not a supported image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to store avatar: {0}")]
    Io(#[from] std::io::Error),

    #[error("Avatar processing task failed: {0}")]
    Task(String),
}

/// Turns an upload into a stored, normalized avatar and returns its public URL
#[async_trait]
pub trait AvatarProcessor: Send + Sync {
    async fn process(&self, owner: Uuid, upload: Upload) -> Result<String, AvatarError>;
}

/// Resizes uploads to a fixed square and writes them as PNG under the avatar directory
pub struct FsAvatarProcessor {
    dir: PathBuf,
    public_path: String,
    size: u32,
}

impl FsAvatarProcessor {
    pub fn new(config: &AvatarConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            public_path: config.public_path.trim_end_matches('/').to_string(),
            size: config.size,
        }
    }
}

#[async_trait]
impl AvatarProcessor for FsAvatarProcessor {
    async fn process(&self, owner: Uuid, upload: Upload) -> Result<String, AvatarError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = avatar_file_name(owner, &upload.file_name);
        let target = self.dir.join(&file_name);
        let size = self.size;

        tokio::task::spawn_blocking(move || -> Result<(), AvatarError> {
            let img = image::load_from_memory(&upload.bytes)?;
            img.resize_exact(size, size, FilterType::Lanczos3)
                .save_with_format(&target, ImageFormat::Png)?;
            Ok(())
        })
        .await
        .map_err(|e| AvatarError::Task(e.to_string()))??;

        tracing::debug!(%owner, file = %file_name, "Avatar stored");
        Ok(format!("{}/{}", self.public_path, file_name))
    }
}

/// `<owner>_<stem>.png`, with the stem reduced to a safe character set.
/// The same owner uploading the same file name always lands on the same file.
pub fn avatar_file_name(owner: Uuid, original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("avatar");

    let safe: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    let safe = if safe.trim_matches('_').is_empty() { "avatar".to_string() } else { safe };
    format!("{}_{}.png", owner, safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    fn processor(dir: &Path) -> FsAvatarProcessor {
        FsAvatarProcessor::new(&AvatarConfig {
            dir: dir.to_path_buf(),
            public_path: "/avatars/".to_string(),
            size: 250,
        })
    }

    #[test]
    fn file_names_are_stable_and_safe() {
        let owner = Uuid::nil();
        assert_eq!(
            avatar_file_name(owner, "me.jpg"),
            "00000000-0000-0000-0000-000000000000_me.png"
        );
        assert_eq!(avatar_file_name(owner, "../../etc/pass wd.png"), avatar_file_name(owner, "pass wd.png"));
        assert!(avatar_file_name(owner, "...").ends_with("_avatar.png"));
    }

    #[tokio::test]
    async fn resizes_to_a_fixed_square() {
        let dir = tempfile::tempdir().unwrap();
        let owner = Uuid::new_v4();
        let url = processor(dir.path())
            .process(owner, Upload { file_name: "photo.png".into(), bytes: png_bytes(40, 90) })
            .await
            .unwrap();

        assert_eq!(url, format!("/avatars/{}_photo.png", owner));
        let stored = dir.path().join(format!("{}_photo.png", owner));
        assert_eq!(image::image_dimensions(stored).unwrap(), (250, 250));
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let err = processor(dir.path())
            .process(Uuid::new_v4(), Upload { file_name: "notes.txt".into(), bytes: b"hello".to_vec() })
            .await
            .unwrap_err();
        assert!(matches!(err, AvatarError::Decode(_)));
    }
}
