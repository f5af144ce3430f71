//! Knowledge-base files searched by the assistant.
//!
//! - `client`: the [`KnowledgeBase`] trait and its files / vector-store HTTP implementation
//! - `files`: file records, metadata filters, plate extraction and batch uploads

pub mod client;
pub mod errors;
pub mod files;

pub use client::{KnowledgeBase, KnowledgeFuture, VectorStoreClient};
pub use errors::{KnowledgeError, KnowledgeResult};
pub use files::{
    BatchUpload, FileFilter, FileMetadata, FileUpload, MAX_BATCH_FILES, VectorStoreFile,
    extract_immatriculation_from_path, upload_batch,
};
