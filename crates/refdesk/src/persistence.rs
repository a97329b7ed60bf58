//! Disk persistence for the vector store.
//!
//! Three JSON artifacts live in the cache directory:
//!
//! * `metadata.json` - the [`CacheManifest`]: embedding identity, record
//!   counts, and a content hash per source file;
//! * `vectors.json` - one record per indexed document, embedding included;
//! * `documents.json` - the document list without embeddings.
//!
//! Saves stage every artifact to a `.tmp` sibling and rename into place,
//! manifest last. A crash mid-save leaves either the old complete cache or
//! a manifest-less (hence invalid) one, never a torn manifest. Loads treat
//! missing or corrupt artifacts as a cache miss, not an error: the caller
//! falls back to re-ingestion.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::vector_store::{InMemoryVectorStore, MemoryRecord};

/// Manifest artifact file name.
pub const MANIFEST_FILE: &str = "metadata.json";
/// Vector artifact file name.
pub const VECTORS_FILE: &str = "vectors.json";
/// Document artifact file name.
pub const DOCUMENTS_FILE: &str = "documents.json";

/// Current manifest schema version.
pub const MANIFEST_VERSION: &str = "1.0";

/// Snapshot of one source file at save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileRecord {
    /// Source path as passed by the ingestion scan.
    pub path: String,
    /// Hex-encoded SHA-256 of the file contents.
    pub content_hash: String,
    /// File size in bytes.
    pub byte_size: u64,
    /// Filesystem modification time, when the platform reports one.
    /// Informational only; validity is decided by `content_hash`.
    pub last_modified_time: Option<DateTime<Utc>>,
}

/// Persisted description of a saved cache.
///
/// A cache is valid for a directory scan iff the scanned path set equals
/// `source_files` and every per-file content hash still matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheManifest {
    /// Manifest schema version.
    pub version: String,
    /// When the cache was written.
    pub created_at: DateTime<Utc>,
    /// Provider that produced the persisted vectors.
    pub embedding_provider: String,
    /// Model that produced the persisted vectors.
    pub embedding_model: String,
    /// Number of records in `vectors.json`.
    pub total_vectors: usize,
    /// Number of records in `documents.json`.
    pub total_documents: usize,
    /// Source files the cache was built from.
    pub source_files: Vec<SourceFileRecord>,
}

/// Everything a successful cache load yields. Documents and embeddings
/// are index-aligned and ready for
/// [`InMemoryVectorStore::add_precomputed`].
#[derive(Debug, Clone)]
pub struct LoadedCache {
    /// The manifest the artifacts were validated against.
    pub manifest: CacheManifest,
    /// Restored documents in their original insertion order.
    pub documents: Vec<Document>,
    /// Persisted embeddings, parallel to `documents`.
    pub embeddings: Vec<Vec<f32>>,
}

/// Diagnostic snapshot of the cache directory.
///
/// Reports what is on disk without deciding validity; pair with
/// [`VectorStorePersistence::is_valid`] for that.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    /// Whether the cache directory exists.
    pub exists: bool,
    /// Whether all three artifacts are present.
    pub complete: bool,
    /// The manifest, when present and parsable.
    pub manifest: Option<CacheManifest>,
    /// Size in bytes of each artifact found on disk, by file name.
    pub artifact_sizes: BTreeMap<String, u64>,
}

/// Reads and writes the cache artifact trio under one directory.
#[derive(Debug, Clone)]
pub struct VectorStorePersistence {
    cache_dir: PathBuf,
}

impl VectorStorePersistence {
    /// Creates a persistence handle rooted at `cache_dir`. The directory
    /// is created lazily on first save.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// The cache directory this handle reads and writes.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Saves the store's records and a manifest describing
    /// `source_paths`. Returns the manifest that was written.
    pub async fn save(
        &self,
        store: &InMemoryVectorStore,
        source_paths: &[PathBuf],
    ) -> Result<CacheManifest> {
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| persist_err(&self.cache_dir, &e))?;

        let mut source_files = Vec::with_capacity(source_paths.len());
        for path in source_paths {
            source_files.push(source_file_record(path).await?);
        }

        let records = store.records();
        let vector_records: Vec<VectorRecord> =
            records.iter().map(VectorRecord::from_memory).collect();
        let document_records: Vec<DocumentRecord> = records
            .iter()
            .map(|r| DocumentRecord::from_document(&r.document))
            .collect();
        let manifest = CacheManifest {
            version: MANIFEST_VERSION.to_string(),
            created_at: Utc::now(),
            embedding_provider: store.provider_name().to_string(),
            embedding_model: store.model_name().to_string(),
            total_vectors: vector_records.len(),
            total_documents: document_records.len(),
            source_files,
        };

        if let Err(e) = self
            .replace_artifacts(&vector_records, &document_records, &manifest)
            .await
        {
            self.discard_staging().await;
            return Err(e);
        }

        info!(
            vectors = manifest.total_vectors,
            documents = manifest.total_documents,
            source_files = manifest.source_files.len(),
            dir = %self.cache_dir.display(),
            "vector cache saved"
        );
        Ok(manifest)
    }

    /// Loads the persisted cache if it exists, parses, and was produced
    /// by the expected embedding identity. Any other state is a miss.
    pub async fn load(
        &self,
        expected_provider: &str,
        expected_model: &str,
    ) -> Result<Option<LoadedCache>> {
        let Some(manifest) = self.manifest().await? else {
            return Ok(None);
        };
        if manifest.embedding_provider != expected_provider
            || manifest.embedding_model != expected_model
        {
            warn!(
                cached_provider = %manifest.embedding_provider,
                cached_model = %manifest.embedding_model,
                expected_provider,
                expected_model,
                "cached vectors come from a different embedding identity; ignoring cache"
            );
            return Ok(None);
        }

        let Some(vector_records) = self
            .read_json::<Vec<VectorRecord>>(&self.cache_dir.join(VECTORS_FILE))
            .await?
        else {
            return Ok(None);
        };
        let Some(document_records) = self
            .read_json::<Vec<DocumentRecord>>(&self.cache_dir.join(DOCUMENTS_FILE))
            .await?
        else {
            return Ok(None);
        };

        if vector_records.len() != manifest.total_vectors
            || document_records.len() != manifest.total_documents
        {
            warn!(
                vectors = vector_records.len(),
                documents = document_records.len(),
                manifest_vectors = manifest.total_vectors,
                manifest_documents = manifest.total_documents,
                "cache artifacts disagree with the manifest; ignoring cache"
            );
            return Ok(None);
        }

        let mut documents = Vec::with_capacity(vector_records.len());
        let mut embeddings = Vec::with_capacity(vector_records.len());
        for record in vector_records {
            let VectorRecord {
                content,
                embedding,
                metadata,
                id,
            } = record;
            embeddings.push(embedding);
            documents.push(Document {
                page_content: content,
                metadata,
                id,
            });
        }
        Ok(Some(LoadedCache {
            manifest,
            documents,
            embeddings,
        }))
    }

    /// Removes all cache artifacts (and any staging leftovers). Removing
    /// the manifest first keeps a partially cleared cache invalid.
    /// Returns how many artifacts existed; idempotent.
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for name in [MANIFEST_FILE, VECTORS_FILE, DOCUMENTS_FILE] {
            match tokio::fs::remove_file(self.cache_dir.join(name)).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(persist_err(&self.cache_dir.join(name), &e)),
            }
        }
        self.discard_staging().await;
        info!(dir = %self.cache_dir.display(), removed, "vector cache cleared");
        Ok(removed)
    }

    /// Checks the persisted manifest against the current source scan:
    /// identical path sets and an unchanged content hash per file.
    ///
    /// Invalidation is all-or-nothing: one changed, added, or removed
    /// file discards the whole cache. Per-file incremental reuse is a
    /// possible extension, not implemented.
    pub async fn is_valid(&self, current_sources: &[PathBuf]) -> bool {
        let manifest = match self.manifest().await {
            Ok(Some(m)) => m,
            Ok(None) => {
                debug!(dir = %self.cache_dir.display(), "no usable cache manifest");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "could not read cache manifest");
                return false;
            }
        };

        let manifest_paths: BTreeSet<&str> =
            manifest.source_files.iter().map(|f| f.path.as_str()).collect();
        let current_owned: Vec<String> = current_sources
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let current_paths: BTreeSet<&str> = current_owned.iter().map(String::as_str).collect();
        if manifest_paths != current_paths {
            info!(
                cached = manifest_paths.len(),
                current = current_paths.len(),
                "source file set changed; cache invalid"
            );
            return false;
        }

        for record in &manifest.source_files {
            let bytes = match tokio::fs::read(&record.path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    info!(file = %record.path, error = %e, "source file unreadable; cache invalid");
                    return false;
                }
            };
            if sha256_hex(&bytes) != record.content_hash {
                info!(file = %record.path, "source file content changed; cache invalid");
                return false;
            }
        }
        true
    }

    /// The persisted manifest, if one exists and parses.
    pub async fn manifest(&self) -> Result<Option<CacheManifest>> {
        self.read_json(&self.cache_dir.join(MANIFEST_FILE)).await
    }

    /// Describes what is currently on disk, for diagnostics.
    pub async fn info(&self) -> Result<CacheInfo> {
        let exists = tokio::fs::try_exists(&self.cache_dir)
            .await
            .unwrap_or(false);

        let mut artifact_sizes = BTreeMap::new();
        for name in [MANIFEST_FILE, VECTORS_FILE, DOCUMENTS_FILE] {
            match tokio::fs::metadata(self.cache_dir.join(name)).await {
                Ok(meta) => {
                    artifact_sizes.insert(name.to_string(), meta.len());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(persist_err(&self.cache_dir.join(name), &e)),
            }
        }
        let complete = [MANIFEST_FILE, VECTORS_FILE, DOCUMENTS_FILE]
            .iter()
            .all(|name| artifact_sizes.contains_key(*name));

        Ok(CacheInfo {
            exists,
            complete,
            manifest: self.manifest().await?,
            artifact_sizes,
        })
    }

    /// Stages all three artifacts, then renames them into place. The
    /// manifest is renamed last: until it lands, the cache stays invalid.
    async fn replace_artifacts(
        &self,
        vectors: &[VectorRecord],
        documents: &[DocumentRecord],
        manifest: &CacheManifest,
    ) -> Result<()> {
        let staged = [
            self.stage(VECTORS_FILE, &serde_json::to_string_pretty(vectors)?)
                .await?,
            self.stage(DOCUMENTS_FILE, &serde_json::to_string_pretty(documents)?)
                .await?,
            self.stage(MANIFEST_FILE, &serde_json::to_string_pretty(manifest)?)
                .await?,
        ];
        for (tmp, target) in staged {
            tokio::fs::rename(&tmp, &target)
                .await
                .map_err(|e| persist_err(&target, &e))?;
        }
        Ok(())
    }

    /// Best-effort removal of staging leftovers.
    async fn discard_staging(&self) {
        for name in [MANIFEST_FILE, VECTORS_FILE, DOCUMENTS_FILE] {
            let _ = tokio::fs::remove_file(self.cache_dir.join(format!("{name}.tmp"))).await;
        }
    }

    async fn stage(&self, file_name: &str, payload: &str) -> Result<(PathBuf, PathBuf)> {
        let target = self.cache_dir.join(file_name);
        let tmp = self.cache_dir.join(format!("{file_name}.tmp"));
        tokio::fs::write(&tmp, payload)
            .await
            .map_err(|e| persist_err(&tmp, &e))?;
        Ok((tmp, target))
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "cache artifact is corrupt; ignoring cache");
                    Ok(None)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persist_err(path, &e)),
        }
    }
}

/// Hex-encoded SHA-256 of a byte slice.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(bytes))
}

async fn source_file_record(path: &Path) -> Result<SourceFileRecord> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| persist_err(path, &e))?;
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| persist_err(path, &e))?;
    Ok(SourceFileRecord {
        path: path.display().to_string(),
        content_hash: sha256_hex(&bytes),
        byte_size: metadata.len(),
        last_modified_time: metadata.modified().ok().map(DateTime::<Utc>::from),
    })
}

fn persist_err(path: &Path, e: &io::Error) -> Error {
    Error::Persistence(format!("{}: {e}", path.display()))
}

// Wire shapes for the JSON artifacts. Key casing follows the artifact
// format, independent of the public `Document` serialization.

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VectorRecord {
    content: String,
    embedding: Vec<f32>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl VectorRecord {
    fn from_memory(record: &MemoryRecord) -> Self {
        Self {
            content: record.document.page_content.clone(),
            embedding: record.embedding.clone(),
            metadata: record.document.metadata.clone(),
            id: record.document.id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRecord {
    page_content: String,
    #[serde(default)]
    metadata: std::collections::HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

impl DocumentRecord {
    fn from_document(document: &Document) -> Self {
        Self {
            page_content: document.page_content.clone(),
            metadata: document.metadata.clone(),
            id: document.id.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::documents::keys;
    use crate::embeddings::Embeddings;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedEmbeddings {
        provider: &'static str,
        model: &'static str,
    }

    #[async_trait]
    impl Embeddings for FixedEmbeddings {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2, 0.3])
        }

        fn provider_name(&self) -> &str {
            self.provider
        }

        fn model_name(&self) -> &str {
            self.model
        }
    }

    fn gemini_store() -> InMemoryVectorStore {
        InMemoryVectorStore::new(Arc::new(FixedEmbeddings {
            provider: "gemini",
            model: "gemini-embedding-001",
        }))
    }

    fn populated_store() -> InMemoryVectorStore {
        let mut store = gemini_store();
        let doc = Document::new("Kütüphane hafta içi 09:00-17:00 arasında açıktır.")
            .with_metadata(keys::SOURCE, "kurallar.txt")
            .with_id("chunk-0");
        store
            .add_precomputed(vec![doc], vec![vec![0.4, 0.5, 0.6]])
            .unwrap();
        store
    }

    async fn seed_source(dir: &Path) -> PathBuf {
        let path = dir.join("kurallar.txt");
        tokio::fs::write(&path, "Kütüphane hafta içi açıktır.")
            .await
            .unwrap();
        path
    }

    // ==== save / load ====

    #[tokio::test]
    async fn round_trip_restores_documents_and_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;

        let store = populated_store();
        let manifest = cache.save(&store, &[source.clone()]).await.unwrap();
        assert_eq!(manifest.version, MANIFEST_VERSION);
        assert_eq!(manifest.total_vectors, 1);
        assert_eq!(manifest.total_documents, 1);
        assert_eq!(manifest.embedding_provider, "gemini");
        assert_eq!(manifest.source_files.len(), 1);
        assert_eq!(manifest.source_files[0].content_hash.len(), 64);

        for name in [MANIFEST_FILE, VECTORS_FILE, DOCUMENTS_FILE] {
            assert!(cache.cache_dir().join(name).is_file(), "{name} missing");
            assert!(
                !cache.cache_dir().join(format!("{name}.tmp")).exists(),
                "{name}.tmp left behind"
            );
        }

        let loaded = cache
            .load("gemini", "gemini-embedding-001")
            .await
            .unwrap()
            .expect("cache should hit");
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(
            loaded.documents[0].page_content,
            "Kütüphane hafta içi 09:00-17:00 arasında açıktır."
        );
        assert_eq!(
            loaded.documents[0].get_metadata(keys::SOURCE),
            Some(&serde_json::json!("kurallar.txt"))
        );
        assert_eq!(loaded.documents[0].id.as_deref(), Some("chunk-0"));
        assert_eq!(loaded.embeddings, vec![vec![0.4, 0.5, 0.6]]);
    }

    #[tokio::test]
    async fn different_embedding_identity_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache.save(&populated_store(), &[source]).await.unwrap();

        assert!(cache
            .load("openai", "text-embedding-3-small")
            .await
            .unwrap()
            .is_none());
        assert!(cache
            .load("gemini", "some-newer-model")
            .await
            .unwrap()
            .is_none());
        assert!(cache
            .load("gemini", "gemini-embedding-001")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn missing_cache_is_a_miss_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("olmayan-dizin"));
        assert!(cache.load("gemini", "m").await.unwrap().is_none());
        assert!(cache.manifest().await.unwrap().is_none());
        assert!(!cache.is_valid(&[]).await);
    }

    #[tokio::test]
    async fn corrupt_artifacts_are_a_miss_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache.save(&populated_store(), &[source]).await.unwrap();

        tokio::fs::write(cache.cache_dir().join(VECTORS_FILE), b"{ not json")
            .await
            .unwrap();
        assert!(cache
            .load("gemini", "gemini-embedding-001")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn manifest_count_disagreement_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache.save(&populated_store(), &[source]).await.unwrap();

        let mut manifest = cache.manifest().await.unwrap().unwrap();
        manifest.total_vectors = 99;
        tokio::fs::write(
            cache.cache_dir().join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .await
        .unwrap();

        assert!(cache
            .load("gemini", "gemini-embedding-001")
            .await
            .unwrap()
            .is_none());
    }

    // ==== validity ====

    #[tokio::test]
    async fn validity_follows_source_content() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache
            .save(&populated_store(), &[source.clone()])
            .await
            .unwrap();

        assert!(cache.is_valid(std::slice::from_ref(&source)).await);

        tokio::fs::write(&source, "Kurallar tamamen değişti.")
            .await
            .unwrap();
        assert!(!cache.is_valid(std::slice::from_ref(&source)).await);
    }

    #[tokio::test]
    async fn validity_requires_exact_path_set() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache
            .save(&populated_store(), &[source.clone()])
            .await
            .unwrap();

        // Added file invalidates.
        let extra = dir.path().join("yeni.txt");
        tokio::fs::write(&extra, "yeni içerik").await.unwrap();
        assert!(!cache.is_valid(&[source.clone(), extra]).await);

        // Removed file invalidates.
        assert!(!cache.is_valid(&[]).await);

        // Deleting the file behind an unchanged scan list invalidates too.
        tokio::fs::remove_file(&source).await.unwrap();
        assert!(!cache.is_valid(std::slice::from_ref(&source)).await);
    }

    // ==== clear / wire format ====

    #[tokio::test]
    async fn clear_removes_all_artifacts_and_counts_them() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache.save(&populated_store(), &[source]).await.unwrap();

        assert_eq!(cache.clear().await.unwrap(), 3);
        for name in [MANIFEST_FILE, VECTORS_FILE, DOCUMENTS_FILE] {
            assert!(!cache.cache_dir().join(name).exists());
        }
        assert!(cache.manifest().await.unwrap().is_none());

        // Clearing an already-empty cache is fine.
        assert_eq!(cache.clear().await.unwrap(), 0);
    }

    // ==== info ====

    #[tokio::test]
    async fn info_describes_a_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("olmayan"));
        let info = cache.info().await.unwrap();
        assert!(!info.exists);
        assert!(!info.complete);
        assert!(info.manifest.is_none());
        assert!(info.artifact_sizes.is_empty());
    }

    #[tokio::test]
    async fn info_describes_a_complete_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache.save(&populated_store(), &[source]).await.unwrap();

        let info = cache.info().await.unwrap();
        assert!(info.exists);
        assert!(info.complete);
        assert_eq!(info.manifest.unwrap().total_vectors, 1);
        assert_eq!(info.artifact_sizes.len(), 3);
        assert!(info.artifact_sizes.values().all(|size| *size > 0));
    }

    #[tokio::test]
    async fn info_flags_a_partial_cache_as_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache.save(&populated_store(), &[source]).await.unwrap();
        tokio::fs::remove_file(cache.cache_dir().join(VECTORS_FILE))
            .await
            .unwrap();

        let info = cache.info().await.unwrap();
        assert!(info.exists);
        assert!(!info.complete);
        assert!(info.manifest.is_some());
        assert_eq!(info.artifact_sizes.len(), 2);
    }

    #[tokio::test]
    async fn artifacts_use_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VectorStorePersistence::new(dir.path().join("cache"));
        let source = seed_source(dir.path()).await;
        cache.save(&populated_store(), &[source]).await.unwrap();

        let manifest_raw = tokio::fs::read_to_string(cache.cache_dir().join(MANIFEST_FILE))
            .await
            .unwrap();
        for key in [
            "\"createdAt\"",
            "\"embeddingProvider\"",
            "\"embeddingModel\"",
            "\"totalVectors\"",
            "\"totalDocuments\"",
            "\"sourceFiles\"",
            "\"contentHash\"",
            "\"byteSize\"",
            "\"lastModifiedTime\"",
        ] {
            assert!(manifest_raw.contains(key), "manifest missing {key}");
        }

        let documents_raw = tokio::fs::read_to_string(cache.cache_dir().join(DOCUMENTS_FILE))
            .await
            .unwrap();
        assert!(documents_raw.contains("\"pageContent\""));
    }

    #[test]
    fn sha256_is_stable() {
        assert_eq!(
            sha256_hex(b"merhaba"),
            "4c6bcdd55f3153e1939669ab1ec039e4059174dc25abdfcb2f58868849b4d61b"
        );
        assert_eq!(sha256_hex(b""), sha256_hex(b""));
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
    }
}
