//! Avatar file storage

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use crate::error::ApiError;

/// Largest accepted avatar, in bytes
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Public path prefix avatars are served under
pub const AVATAR_URL_PREFIX: &str = "/uploads/avatars";

const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpg", "image/jpeg", "image/png", "image/gif"];

/// A file received from a multipart form
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check and write an upload, returning the stored filename
    ///
    /// Files are named `<user id>-<unix millis>.<ext>`.
    pub async fn save(&self, user_id: &str, upload: AvatarUpload) -> Result<String, ApiError> {
        let content_type = upload
            .content_type
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(ApiError::Validation("Only image files are allowed!".into()));
        }
        if upload.data.is_empty() {
            return Err(ApiError::Validation("Uploaded file is empty".into()));
        }
        if upload.data.len() > MAX_AVATAR_BYTES {
            return Err(ApiError::Validation(format!(
                "File too large; the limit is {} bytes",
                MAX_AVATAR_BYTES
            )));
        }

        let extension = upload
            .file_name
            .as_deref()
            .and_then(file_extension)
            .unwrap_or_else(|| extension_for(&content_type).to_string());

        let filename = format!(
            "{}-{}.{}",
            sanitize(user_id),
            Utc::now().timestamp_millis(),
            extension
        );

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(ApiError::internal)?;
        tokio::fs::write(self.dir.join(&filename), &upload.data)
            .await
            .map_err(ApiError::internal)?;

        info!(user_id = %user_id, file = %filename, bytes = upload.data.len(), "Avatar stored");
        Ok(filename)
    }
}

pub fn avatar_url(filename: &str) -> String {
    format!("{}/{}", AVATAR_URL_PREFIX, filename)
}

/// Keep ids path-safe
fn sanitize(user_id: &str) -> String {
    user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "gif").then_some(ext)
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content_type: &str, file_name: &str, len: usize) -> AvatarUpload {
        AvatarUpload {
            file_name: Some(file_name.to_string()),
            content_type: Some(content_type.to_string()),
            data: vec![0u8; len],
        }
    }

    fn temp_store(tag: &str) -> AvatarStore {
        let dir = std::env::temp_dir().join(format!(
            "usergate-avatars-{}-{}",
            tag,
            std::process::id()
        ));
        AvatarStore::new(dir)
    }

    #[test]
    fn test_sanitize_and_extension() {
        assert_eq!(sanitize("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize("user-001_a"), "user-001_a");
        assert_eq!(file_extension("me.PNG").as_deref(), Some("png"));
        assert_eq!(file_extension("me.exe"), None);
        assert_eq!(file_extension("noext"), None);
        assert_eq!(extension_for("image/gif"), "gif");
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let store = temp_store("save");
        let name = store
            .save("user001", upload("image/png", "me.png", 16))
            .await
            .unwrap();

        assert!(name.starts_with("user001-"));
        assert!(name.ends_with(".png"));
        assert!(store.dir().join(&name).exists());
        assert_eq!(avatar_url(&name), format!("/uploads/avatars/{}", name));

        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[tokio::test]
    async fn test_rejects_non_images_and_oversized_files() {
        let store = temp_store("reject");

        assert!(matches!(
            store.save("u", upload("text/plain", "a.txt", 10)).await,
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            store
                .save("u", upload("image/png", "a.png", MAX_AVATAR_BYTES + 1))
                .await,
            Err(ApiError::Validation(_))
        ));
    }
}
