use std::path::Path;

use crate::error::SubmissionError;

/// Content types accepted for uploads when no policy is configured.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/tiff",
    "image/bmp",
];

/// A file to upload. The backend enqueues extraction when the upload lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub folder: String,
    // set when the file could not be read from disk; validation rejects it
    pub read_error: Option<String>,
}

/// An image already stored on the backend, to be analyzed again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub image_name: String,
    pub folder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Upload(UploadFile),
    Analyze(ImageRef),
}

/// One submittable piece of work.
///
/// `unit_ref` is the caller's name for the unit (usually the file or image
/// name); results are reported back under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOfWork {
    unit_ref: String,
    payload: Payload,
}

impl UnitOfWork {
    pub fn upload(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
        folder: impl Into<String>,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            unit_ref: file_name.clone(),
            payload: Payload::Upload(UploadFile {
                file_name,
                content_type: content_type.into(),
                bytes,
                folder: folder.into(),
                read_error: None,
            }),
        }
    }

    /// Builds an upload unit from a file on disk, guessing the content type
    /// from the extension.
    pub async fn upload_from_path(path: &Path, folder: &str) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = file_name_of(path);
        let content_type = content_type_for(&file_name);
        Ok(Self::upload(file_name, content_type, bytes, folder))
    }

    /// Like [`UnitOfWork::upload_from_path`], but a file that cannot be read
    /// still yields a unit. Validation rejects it with the read error, so one
    /// bad path does not stop the rest of a batch.
    pub async fn read_upload(path: &Path, folder: &str) -> Self {
        match Self::upload_from_path(path, folder).await {
            Ok(unit) => unit,
            Err(err) => {
                let file_name = file_name_of(path);
                let content_type = content_type_for(&file_name);
                let mut unit = Self::upload(file_name, content_type, Vec::new(), folder);
                if let Payload::Upload(file) = &mut unit.payload {
                    file.read_error = Some(err.to_string());
                }
                unit
            }
        }
    }

    pub fn analyze(image_name: impl Into<String>, folder: Option<String>) -> Self {
        let image_name = image_name.into();
        Self {
            unit_ref: image_name.clone(),
            payload: Payload::Analyze(ImageRef { image_name, folder }),
        }
    }

    /// Overrides the caller-facing reference.
    pub fn with_ref(mut self, unit_ref: impl Into<String>) -> Self {
        self.unit_ref = unit_ref.into();
        self
    }

    pub fn unit_ref(&self) -> &str {
        &self.unit_ref
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Local checks run before anything is sent to the gateway.
    pub fn validate(&self, policy: &InputPolicy) -> Result<(), SubmissionError> {
        match &self.payload {
            Payload::Upload(file) => {
                if let Some(err) = &file.read_error {
                    return Err(SubmissionError::invalid_input(format!(
                        "could not read {}: {err}",
                        file.file_name
                    )));
                }
                if file.bytes.is_empty() {
                    return Err(SubmissionError::invalid_input(format!(
                        "{} is empty",
                        file.file_name
                    )));
                }
                if !policy.allows(&file.content_type) {
                    return Err(SubmissionError::invalid_input(format!(
                        "content type {} is not allowed for {}",
                        file.content_type, file.file_name
                    )));
                }
                Ok(())
            }
            Payload::Analyze(image) => {
                if image.image_name.trim().is_empty() {
                    return Err(SubmissionError::invalid_input(
                        "image name must not be empty",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Which uploads the dispatcher lets through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPolicy {
    allowed_content_types: Vec<String>,
}

impl Default for InputPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_CONTENT_TYPES.iter().copied())
    }
}

impl InputPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_content_types: allowed
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn allows(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_content_types.iter().any(|t| *t == essence)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Content type for a file name, by extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_ref_defaults_to_name() {
        let unit = UnitOfWork::upload("form-1.png", "image/png", vec![1], "2024");
        assert_eq!(unit.unit_ref(), "form-1.png");

        let unit = UnitOfWork::analyze("form-2.jpg", None).with_ref("row-7");
        assert_eq!(unit.unit_ref(), "row-7");
    }

    #[test]
    fn empty_upload_is_invalid() {
        let unit = UnitOfWork::upload("blank.png", "image/png", Vec::new(), "2024");
        let err = unit.validate(&InputPolicy::default()).unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidInput { .. }));
        assert!(err.to_string().contains("blank.png is empty"));
    }

    #[test]
    fn disallowed_content_type_is_invalid() {
        let unit = UnitOfWork::upload("notes.pdf", "application/pdf", vec![1, 2], "2024");
        let err = unit.validate(&InputPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("application/pdf"));
    }

    #[test]
    fn blank_image_name_is_invalid() {
        let unit = UnitOfWork::analyze("   ", Some("2024".into()));
        assert!(unit.validate(&InputPolicy::default()).is_err());
    }

    #[test]
    fn policy_matches_mime_essence_case_insensitively() {
        let policy = InputPolicy::new(["image/PNG"]);
        assert!(policy.allows("image/png"));
        assert!(policy.allows("Image/Png; charset=binary"));
        assert!(!policy.allows("image/jpeg"));
    }

    #[test]
    fn content_type_guess() {
        assert_eq!(content_type_for("scan.JPG"), "image/jpeg");
        assert_eq!(content_type_for("scan.tif"), "image/tiff");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[tokio::test]
    async fn upload_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page-3.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let unit = UnitOfWork::upload_from_path(&path, "intake").await.unwrap();
        assert_eq!(unit.unit_ref(), "page-3.png");
        match unit.payload() {
            Payload::Upload(file) => {
                assert_eq!(file.content_type, "image/png");
                assert_eq!(file.bytes, b"\x89PNG");
                assert_eq!(file.folder, "intake");
            }
            other => panic!("expected upload payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_upload_keeps_unreadable_file_as_invalid_unit() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("ok.png");
        std::fs::write(&present, b"\x89PNG").unwrap();
        let missing = dir.path().join("missing.png");

        let ok = UnitOfWork::read_upload(&present, "intake").await;
        assert!(ok.validate(&InputPolicy::default()).is_ok());

        let bad = UnitOfWork::read_upload(&missing, "intake").await;
        assert_eq!(bad.unit_ref(), "missing.png");
        let err = bad.validate(&InputPolicy::default()).unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidInput { .. }));
        assert!(err.to_string().contains("could not read missing.png"));
    }
}
