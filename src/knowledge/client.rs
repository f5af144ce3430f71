//! Knowledge-base file storage over the OpenAI files and vector-store endpoints.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::knowledge::errors::{KnowledgeError, KnowledgeResult};
use crate::knowledge::files::{FileMetadata, FileUpload, VectorStoreFile};

/// Boxed future returned by [`KnowledgeBase`] methods.
pub type KnowledgeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Files indexed for the assistant's file search.
pub trait KnowledgeBase: Send + Sync {
    /// Every file of the vector store with its metadata.
    fn list_files(&self) -> KnowledgeFuture<'_, KnowledgeResult<Vec<VectorStoreFile>>>;

    /// Upload a file and add it to the vector store.
    fn upload_file(
        &self,
        upload: FileUpload,
        metadata: FileMetadata,
    ) -> KnowledgeFuture<'_, KnowledgeResult<VectorStoreFile>>;

    /// Remove a file from the vector store, then from file storage.
    fn delete_file(&self, file_id: &str) -> KnowledgeFuture<'_, KnowledgeResult<Value>>;
}

/// Page size of vector-store listings.
const LIST_LIMIT: &str = "100";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    data: Vec<StoreFileEntry>,
}

#[derive(Debug, Deserialize)]
struct StoreFileEntry {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    bytes: u64,
    #[serde(default)]
    purpose: Option<String>,
    #[serde(default)]
    created_at: i64,
}

#[derive(Debug, Deserialize)]
struct StoreFileStatus {
    #[serde(default)]
    status: String,
}

fn attribute(attributes: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    attributes
        .and_then(|map| map.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// HTTP implementation of [`KnowledgeBase`].
#[derive(Debug)]
pub struct VectorStoreClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    vector_store_id: Option<String>,
}

impl VectorStoreClient {
    /// Build a client from configuration.
    ///
    /// A missing vector store id is reported by each call, not here.
    ///
    /// # Errors
    /// Returns an error if the API key is missing or the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> KnowledgeResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(KnowledgeError::NotConfigured("OPENAI_API_KEY"))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            vector_store_id: config.vector_store_id.clone(),
        })
    }

    fn vector_store_id(&self) -> KnowledgeResult<&str> {
        self.vector_store_id
            .as_deref()
            .ok_or(KnowledgeError::NotConfigured("KNOWLEDGE_VECTOR_STORE_ID"))
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(%method, %url, "files request");
        self.http.request(method, url).bearer_auth(&self.api_key)
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> KnowledgeResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "files request failed");
            return Err(KnowledgeError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn list(&self) -> KnowledgeResult<Vec<VectorStoreFile>> {
        let store_id = self.vector_store_id()?;
        let list: FileList = Self::send(
            self.request(Method::GET, &format!("vector_stores/{store_id}/files"))
                .query(&[("limit", LIST_LIMIT)]),
        )
        .await?;

        let mut files = Vec::with_capacity(list.data.len());
        for entry in list.data {
            let info: FileObject =
                Self::send(self.request(Method::GET, &format!("files/{}", entry.id))).await?;
            files.push(VectorStoreFile {
                filename: info.filename.unwrap_or_else(|| "unknown".to_string()),
                bytes: info.bytes,
                purpose: info.purpose.unwrap_or_else(|| "assistants".to_string()),
                immatriculation: attribute(entry.attributes.as_ref(), "immatriculation"),
                client: attribute(entry.attributes.as_ref(), "client"),
                id: entry.id,
                status: entry.status,
                created_at: entry.created_at,
            });
        }
        Ok(files)
    }

    async fn upload(&self, upload: FileUpload, metadata: FileMetadata) -> KnowledgeResult<VectorStoreFile> {
        let store_id = self.vector_store_id()?;
        let part = reqwest::multipart::Part::bytes(upload.content).file_name(upload.filename.clone());
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);
        let created: FileObject =
            Self::send(self.request(Method::POST, "files").multipart(form)).await?;

        let mut body = json!({ "file_id": created.id });
        if let (Some(attributes), Some(map)) = (metadata.attributes(), body.as_object_mut()) {
            map.insert("attributes".to_string(), attributes);
        }
        let attached: StoreFileStatus = Self::send(
            self.request(Method::POST, &format!("vector_stores/{store_id}/files"))
                .json(&body),
        )
        .await?;
        info!(file_id = %created.id, filename = %upload.filename, "knowledge file uploaded");

        Ok(VectorStoreFile {
            id: created.id,
            filename: upload.filename,
            status: attached.status,
            created_at: created.created_at,
            bytes: created.bytes,
            purpose: created.purpose.unwrap_or_else(|| "assistants".to_string()),
            immatriculation: metadata.immatriculation,
            client: metadata.client,
        })
    }

    async fn delete(&self, file_id: &str) -> KnowledgeResult<Value> {
        let store_id = self.vector_store_id()?;
        let _: Value = Self::send(
            self.request(Method::DELETE, &format!("vector_stores/{store_id}/files/{file_id}")),
        )
        .await?;
        let _: Value = Self::send(self.request(Method::DELETE, &format!("files/{file_id}"))).await?;
        info!(%file_id, "knowledge file deleted");

        Ok(json!({
            "success": true,
            "file_id": file_id,
            "message": "File deleted from vector store and Files API",
        }))
    }
}

impl KnowledgeBase for VectorStoreClient {
    fn list_files(&self) -> KnowledgeFuture<'_, KnowledgeResult<Vec<VectorStoreFile>>> {
        Box::pin(self.list())
    }

    fn upload_file(
        &self,
        upload: FileUpload,
        metadata: FileMetadata,
    ) -> KnowledgeFuture<'_, KnowledgeResult<VectorStoreFile>> {
        Box::pin(self.upload(upload, metadata))
    }

    fn delete_file(&self, file_id: &str) -> KnowledgeFuture<'_, KnowledgeResult<Value>> {
        let file_id = file_id.to_string();
        Box::pin(async move { self.delete(&file_id).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            VectorStoreClient::new(&LlmConfig::default()),
            Err(KnowledgeError::NotConfigured("OPENAI_API_KEY"))
        ));
    }

    #[tokio::test]
    async fn test_calls_need_a_vector_store() {
        let client = VectorStoreClient::new(&LlmConfig::default().with_api_key("sk-test")).unwrap();
        assert!(matches!(
            client.list_files().await,
            Err(KnowledgeError::NotConfigured("KNOWLEDGE_VECTOR_STORE_ID"))
        ));
        assert!(matches!(
            client.delete_file("file_1").await,
            Err(KnowledgeError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_decode_listing_entry() {
        let list: FileList = serde_json::from_value(json!({
            "data": [
                {"id": "file_1", "status": "completed", "created_at": 1_700_000_000,
                 "attributes": {"immatriculation": "GH-123-AB", "client": "HOMECARE"}},
                {"id": "file_2", "status": "in_progress", "created_at": 1_700_000_001, "attributes": null}
            ]
        }))
        .unwrap();
        assert_eq!(list.data.len(), 2);
        assert_eq!(
            attribute(list.data[0].attributes.as_ref(), "immatriculation").as_deref(),
            Some("GH-123-AB")
        );
        assert_eq!(attribute(list.data[1].attributes.as_ref(), "client"), None);
    }
}
