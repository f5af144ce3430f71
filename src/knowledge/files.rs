//! Knowledge-base file records, metadata filters and batch uploads.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::knowledge::client::KnowledgeBase;
use crate::knowledge::errors::{KnowledgeError, KnowledgeResult};

/// Most files accepted in one batch upload.
pub const MAX_BATCH_FILES: usize = 100;

/// Vehicle registration plates, e.g. `GH-123-AB`.
static IMMATRICULATION_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}-[A-Z0-9]{3}-[A-Z0-9]{2}$").ok());

/// A file indexed in the knowledge-base vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStoreFile {
    /// Provider file id.
    pub id: String,
    /// Uploaded file name.
    pub filename: String,
    /// Indexing status (`in_progress`, `completed`, ...).
    pub status: String,
    /// Upload time, Unix seconds.
    pub created_at: i64,
    /// Size in bytes.
    pub bytes: u64,
    /// Provider purpose, `assistants` for knowledge files.
    pub purpose: String,
    /// Vehicle the document is about.
    pub immatriculation: Option<String>,
    /// Customer the document belongs to.
    pub client: Option<String>,
}

/// Searchable attributes stored with a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Vehicle registration plate.
    pub immatriculation: Option<String>,
    /// Customer name.
    pub client: Option<String>,
}

impl FileMetadata {
    /// Vector-store attributes object, `None` when nothing is set.
    #[must_use]
    pub fn attributes(&self) -> Option<Value> {
        let mut attributes = Map::new();
        for (key, value) in [("immatriculation", &self.immatriculation), ("client", &self.client)] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                attributes.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
        (!attributes.is_empty()).then_some(Value::Object(attributes))
    }
}

/// Listing filter; unset or empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileFilter {
    /// Required plate.
    #[serde(default)]
    pub immatriculation: Option<String>,
    /// Required customer.
    #[serde(default)]
    pub client: Option<String>,
}

impl FileFilter {
    /// Whether `file` passes the filter.
    #[must_use]
    pub fn matches(&self, file: &VectorStoreFile) -> bool {
        let accepts = |wanted: &Option<String>, actual: &Option<String>| match wanted.as_deref() {
            None | Some("") => true,
            Some(wanted) => actual.as_deref() == Some(wanted),
        };
        accepts(&self.immatriculation, &file.immatriculation) && accepts(&self.client, &file.client)
    }

    /// Keep the files that pass the filter.
    #[must_use]
    pub fn apply(&self, files: Vec<VectorStoreFile>) -> Vec<VectorStoreFile> {
        files.into_iter().filter(|file| self.matches(file)).collect()
    }
}

fn is_immatriculation(candidate: &str) -> bool {
    IMMATRICULATION_RE
        .as_ref()
        .is_some_and(|re| re.is_match(candidate))
}

/// Plate named by a folder or file path: the name itself, its stem, or its
/// first three dash-separated parts.
#[must_use]
pub fn extract_immatriculation_from_path(path: &str) -> Option<String> {
    let path = Path::new(path);
    let name = path.file_name()?.to_str()?;
    if is_immatriculation(name) {
        return Some(name.to_string());
    }

    if let Some(stem) = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| is_immatriculation(stem))
    {
        return Some(stem.to_string());
    }

    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() >= 3 {
        let candidate = parts[..3].join("-");
        if is_immatriculation(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// File name without any client-side directory part.
#[must_use]
pub fn clean_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|name| name.to_str())
        .map_or_else(|| "unknown".to_string(), str::to_string)
}

/// One file received for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Name to store the file under.
    pub filename: String,
    /// Raw content.
    pub content: Vec<u8>,
}

/// A file of a batch that could not be uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    /// File name as received.
    pub file: String,
    /// Failure reason.
    pub error: String,
}

/// Outcome of a batch upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpload {
    /// Uploaded files.
    pub files: Vec<VectorStoreFile>,
    /// Files that failed.
    pub errors: Vec<UploadFailure>,
    /// `files.len()`.
    pub success_count: usize,
    /// `errors.len()`.
    pub error_count: usize,
}

/// Upload a folder's files one by one, collecting per-file failures.
///
/// Without an explicit plate, one is derived from `folder_name`.
///
/// # Errors
/// Returns `TooManyFiles` when more than [`MAX_BATCH_FILES`] files are given.
pub async fn upload_batch(
    knowledge: &dyn KnowledgeBase,
    uploads: Vec<FileUpload>,
    mut metadata: FileMetadata,
    folder_name: Option<&str>,
) -> KnowledgeResult<BatchUpload> {
    if uploads.len() > MAX_BATCH_FILES {
        return Err(KnowledgeError::TooManyFiles {
            count: uploads.len(),
            max: MAX_BATCH_FILES,
        });
    }

    if metadata.immatriculation.as_deref().is_none_or(str::is_empty) {
        metadata.immatriculation = folder_name.and_then(extract_immatriculation_from_path);
    }

    let mut files = Vec::with_capacity(uploads.len());
    let mut errors = Vec::new();
    for upload in uploads {
        let original = upload.filename.clone();
        let upload = FileUpload {
            filename: clean_filename(&upload.filename),
            content: upload.content,
        };
        match knowledge.upload_file(upload, metadata.clone()).await {
            Ok(file) => files.push(file),
            Err(err) => {
                warn!(file = %original, error = %err, "knowledge file upload failed");
                errors.push(UploadFailure {
                    file: original,
                    error: err.to_string(),
                });
            }
        }
    }

    info!(uploaded = files.len(), failed = errors.len(), "knowledge batch uploaded");
    Ok(BatchUpload {
        success_count: files.len(),
        error_count: errors.len(),
        files,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::knowledge::client::KnowledgeFuture;

    fn file(id: &str, immatriculation: Option<&str>, client: Option<&str>) -> VectorStoreFile {
        VectorStoreFile {
            id: id.to_string(),
            filename: format!("{id}.pdf"),
            status: "completed".to_string(),
            created_at: 1_700_000_000,
            bytes: 10,
            purpose: "assistants".to_string(),
            immatriculation: immatriculation.map(str::to_string),
            client: client.map(str::to_string),
        }
    }

    #[test]
    fn test_extract_immatriculation() {
        assert_eq!(extract_immatriculation_from_path("GH-123-AB").as_deref(), Some("GH-123-AB"));
        assert_eq!(
            extract_immatriculation_from_path("/docs/flotte/GH-123-AB/").as_deref(),
            Some("GH-123-AB")
        );
        assert_eq!(extract_immatriculation_from_path("GH-123-AB.pdf").as_deref(), Some("GH-123-AB"));
        assert_eq!(
            extract_immatriculation_from_path("uploads/GH-123-AB-entretien-2024").as_deref(),
            Some("GH-123-AB")
        );
        assert_eq!(extract_immatriculation_from_path("gh-123-ab"), None);
        assert_eq!(extract_immatriculation_from_path("GH-12-AB"), None);
        assert_eq!(extract_immatriculation_from_path("rapports"), None);
        assert_eq!(extract_immatriculation_from_path(""), None);
    }

    #[test]
    fn test_filter_by_metadata() {
        let files = vec![
            file("a", Some("GH-123-AB"), Some("HOMECARE")),
            file("b", Some("GH-123-AB"), Some("GROUPE BEL")),
            file("c", None, Some("HOMECARE")),
        ];

        let ids = |filter: FileFilter| -> Vec<String> {
            filter.apply(files.clone()).into_iter().map(|f| f.id).collect()
        };

        assert_eq!(ids(FileFilter::default()), ["a", "b", "c"]);
        assert_eq!(
            ids(FileFilter {
                immatriculation: Some("GH-123-AB".to_string()),
                client: None,
            }),
            ["a", "b"]
        );
        assert_eq!(
            ids(FileFilter {
                immatriculation: Some("GH-123-AB".to_string()),
                client: Some("HOMECARE".to_string()),
            }),
            ["a"]
        );
        assert_eq!(
            ids(FileFilter {
                immatriculation: Some(String::new()),
                client: Some("HOMECARE".to_string()),
            }),
            ["a", "c"]
        );
    }

    #[test]
    fn test_metadata_attributes() {
        assert_eq!(FileMetadata::default().attributes(), None);
        let metadata = FileMetadata {
            immatriculation: Some("GH-123-AB".to_string()),
            client: Some(String::new()),
        };
        assert_eq!(metadata.attributes(), Some(json!({"immatriculation": "GH-123-AB"})));
    }

    #[test]
    fn test_clean_filename() {
        assert_eq!(clean_filename("dossier/sous/facture.pdf"), "facture.pdf");
        assert_eq!(clean_filename("facture.pdf"), "facture.pdf");
        assert_eq!(clean_filename(""), "unknown");
    }

    #[derive(Default)]
    struct RecordingKnowledge {
        uploads: Mutex<Vec<(String, FileMetadata)>>,
    }

    impl KnowledgeBase for RecordingKnowledge {
        fn list_files(&self) -> KnowledgeFuture<'_, KnowledgeResult<Vec<VectorStoreFile>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn upload_file(
            &self,
            upload: FileUpload,
            metadata: FileMetadata,
        ) -> KnowledgeFuture<'_, KnowledgeResult<VectorStoreFile>> {
            self.uploads
                .lock()
                .unwrap()
                .push((upload.filename.clone(), metadata.clone()));
            Box::pin(async move {
                if upload.content.is_empty() {
                    return Err(KnowledgeError::Status {
                        status: 400,
                        body: "empty file".to_string(),
                    });
                }
                let mut uploaded = file(&upload.filename, None, None);
                uploaded.filename = upload.filename;
                uploaded.immatriculation = metadata.immatriculation;
                uploaded.client = metadata.client;
                Ok(uploaded)
            })
        }

        fn delete_file(&self, _file_id: &str) -> KnowledgeFuture<'_, KnowledgeResult<Value>> {
            Box::pin(async { Ok(Value::Null) })
        }
    }

    fn upload(name: &str, content: &[u8]) -> FileUpload {
        FileUpload {
            filename: name.to_string(),
            content: content.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_batch_derives_plate_and_collects_failures() {
        let knowledge = RecordingKnowledge::default();
        let metadata = FileMetadata {
            immatriculation: None,
            client: Some("HOMECARE".to_string()),
        };
        let outcome = upload_batch(
            &knowledge,
            vec![upload("GH-123-AB/carte_grise.pdf", b"pdf"), upload("GH-123-AB/vide.pdf", b"")],
            metadata,
            Some("GH-123-AB"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.error_count, 1);
        assert_eq!(outcome.files[0].filename, "carte_grise.pdf");
        assert_eq!(outcome.files[0].immatriculation.as_deref(), Some("GH-123-AB"));
        assert_eq!(outcome.errors[0].file, "GH-123-AB/vide.pdf");

        let uploads = knowledge.uploads.lock().unwrap();
        assert_eq!(uploads[1].1.client.as_deref(), Some("HOMECARE"));
    }

    #[tokio::test]
    async fn test_batch_keeps_explicit_plate() {
        let knowledge = RecordingKnowledge::default();
        let metadata = FileMetadata {
            immatriculation: Some("AA-111-BB".to_string()),
            client: None,
        };
        let outcome = upload_batch(&knowledge, vec![upload("a.pdf", b"x")], metadata, Some("GH-123-AB"))
            .await
            .unwrap();
        assert_eq!(outcome.files[0].immatriculation.as_deref(), Some("AA-111-BB"));
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let knowledge = RecordingKnowledge::default();
        let uploads = (0..=MAX_BATCH_FILES).map(|i| upload(&format!("{i}.pdf"), b"x")).collect();
        let err = upload_batch(&knowledge, uploads, FileMetadata::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::TooManyFiles { count: 101, max: 100 }));
        assert!(knowledge.uploads.lock().unwrap().is_empty());
    }
}
