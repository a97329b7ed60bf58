//! End-to-end document service: scan, extract, chunk, embed, persist,
//! retrieve.
//!
//! [`DocumentService`] owns the vector store behind an `Arc<RwLock<_>>`
//! and wires the extraction and persistence layers together. A directory
//! ingest first tries the disk cache; only when the cache is missing,
//! stale, or unreadable are the source files re-processed. Individual
//! file failures never abort a run: they are logged, recorded in the
//! [`IngestReport`], and the remaining files proceed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::documents::{keys, Document};
use crate::embeddings::Embeddings;
use crate::error::{Error, Result};
use crate::extract::{self, Extracted, ExtractedContent};
use crate::persistence::{CacheInfo, CacheManifest, VectorStorePersistence};
use crate::retrieval::{HybridRetriever, RetrievalOptions, RetrievalOutcome};
use crate::splitter::RecursiveCharacterTextSplitter;
use crate::vector_store::InMemoryVectorStore;

/// Outcome of a directory ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Files extracted and indexed this run.
    pub files_processed: usize,
    /// Files skipped with the error that sank them.
    pub files_failed: Vec<(PathBuf, String)>,
    /// Document units added to the index.
    pub documents_added: usize,
    /// Whether the index was restored from the disk cache instead of
    /// re-processing the files.
    pub from_cache: bool,
}

/// Owns the in-memory index and its disk cache, and exposes the
/// ingestion and retrieval operations built on them.
pub struct DocumentService {
    config: ServiceConfig,
    embeddings: Arc<dyn Embeddings>,
    store: Arc<RwLock<InMemoryVectorStore>>,
    persistence: VectorStorePersistence,
    splitter: RecursiveCharacterTextSplitter,
    /// Source set of the most recent scan; what the cache is validated
    /// and saved against.
    sources: RwLock<Vec<PathBuf>>,
    /// Serializes cache reads and writes. Saves are atomic on disk, but
    /// two concurrent saves could still interleave their renames.
    cache_guard: Mutex<()>,
}

impl DocumentService {
    /// Creates a service with an empty index.
    ///
    /// Fails when the configuration is invalid (zero batch size,
    /// overlap not smaller than chunk size).
    pub fn new(config: ServiceConfig, embeddings: Arc<dyn Embeddings>) -> Result<Self> {
        config.validate()?;
        let splitter = RecursiveCharacterTextSplitter::new(config.splitter_config())?;
        let store = Arc::new(RwLock::new(InMemoryVectorStore::new(Arc::clone(&embeddings))));
        let persistence = VectorStorePersistence::new(config.cache_dir.clone());
        Ok(Self {
            config,
            embeddings,
            store,
            persistence,
            splitter,
            sources: RwLock::new(Vec::new()),
            cache_guard: Mutex::new(()),
        })
    }

    /// The configuration the service was built with.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Shared handle to the live vector store.
    #[must_use]
    pub fn store(&self) -> Arc<RwLock<InMemoryVectorStore>> {
        Arc::clone(&self.store)
    }

    /// Number of document units currently indexed.
    pub async fn document_count(&self) -> usize {
        self.store.read().await.len()
    }

    /// Ingests every supported file directly under `dir`.
    ///
    /// When caching is enabled and the cache still matches the scanned
    /// files, the index is restored from disk and no file is touched.
    /// Otherwise the index is rebuilt from the files and, with caching
    /// enabled, saved back to disk.
    pub async fn ingest_directory(&self, dir: impl AsRef<Path>) -> Result<IngestReport> {
        let dir = dir.as_ref();
        let paths = scan_supported(dir).await?;
        info!(dir = %dir.display(), files = paths.len(), "source scan complete");
        self.ingest_with_cache(&paths).await
    }

    /// Ingests the explicit file list from the configuration's
    /// `sourceFiles` key, with the same cache discipline as
    /// [`DocumentService::ingest_directory`]. Fails when the list is
    /// empty.
    pub async fn ingest_sources(&self) -> Result<IngestReport> {
        let paths = &self.config.source_files;
        if paths.is_empty() {
            return Err(Error::Configuration(
                "sourceFiles is empty; nothing to ingest".to_string(),
            ));
        }
        info!(files = paths.len(), "ingesting configured source files");
        self.ingest_with_cache(paths).await
    }

    /// Clears the cache and the index, then re-ingests `dir` from the
    /// files regardless of any cached state.
    pub async fn rebuild(&self, dir: impl AsRef<Path>) -> Result<IngestReport> {
        self.clear_cache().await?;
        let dir = dir.as_ref();
        let paths = scan_supported(dir).await?;
        info!(dir = %dir.display(), files = paths.len(), "rebuilding index from source files");
        *self.sources.write().await = paths.clone();
        self.ingest_paths(&paths).await
    }

    /// Extracts one file and appends its units to the index. Returns
    /// the number of units added.
    pub async fn ingest_file(&self, path: &Path) -> Result<usize> {
        let owned = path.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extract::extract_file(&owned))
            .await
            .map_err(|e| Error::Other(format!("extraction task failed: {e}")))??;
        let documents = self.to_documents(path, extracted);
        debug!(file = %path.display(), units = documents.len(), "file extracted");
        self.insert_batched(documents).await
    }

    /// Restores the index from the disk cache if one exists for the
    /// current embedding identity. Returns whether the index was
    /// replaced. A corrupt or mismatched cache is a miss, not an error.
    pub async fn load_from_cache(&self) -> Result<bool> {
        let _guard = self.cache_guard.lock().await;
        let loaded = match self
            .persistence
            .load(self.embeddings.provider_name(), self.embeddings.model_name())
            .await?
        {
            Some(loaded) => loaded,
            None => return Ok(false),
        };

        let mut store = self.store.write().await;
        store.clear();
        match store.add_precomputed(loaded.documents, loaded.embeddings) {
            Ok(added) => {
                info!(documents = added, "index restored from cache");
                Ok(true)
            }
            Err(error) => {
                store.clear();
                warn!(%error, "cached records were inconsistent; discarding them");
                Ok(false)
            }
        }
    }

    /// Persists the current index and the last scanned source set.
    pub async fn save_to_cache(&self) -> Result<CacheManifest> {
        let _guard = self.cache_guard.lock().await;
        let sources = self.sources.read().await.clone();
        let store = self.store.read().await;
        self.persistence.save(&store, &sources).await
    }

    /// Whether the cache on disk still matches the supported files
    /// currently under `dir`.
    pub async fn is_cache_valid(&self, dir: impl AsRef<Path>) -> Result<bool> {
        let paths = scan_supported(dir.as_ref()).await?;
        Ok(self.persistence.is_valid(&paths).await)
    }

    /// Diagnostic snapshot of the cache directory.
    pub async fn cache_info(&self) -> Result<CacheInfo> {
        self.persistence.info().await
    }

    /// Removes all cache artifacts. The in-memory index is untouched.
    /// Returns how many artifacts existed.
    pub async fn clear_cache(&self) -> Result<usize> {
        let _guard = self.cache_guard.lock().await;
        self.persistence.clear().await
    }

    /// Hybrid retriever over the live index, using the configured
    /// retrieval options.
    pub async fn retriever(&self) -> Result<HybridRetriever> {
        self.retriever_with(&self.config.retrieval).await
    }

    /// Hybrid retriever over the live index with explicit options.
    pub async fn retriever_with(&self, options: &RetrievalOptions) -> Result<HybridRetriever> {
        HybridRetriever::build(Arc::clone(&self.store), options).await
    }

    /// One-shot hybrid retrieval with the configured options.
    pub async fn search(&self, query: &str) -> Result<RetrievalOutcome> {
        let retriever = self.retriever().await?;
        Ok(retriever.retrieve(query).await)
    }

    /// Records `paths` as the source set, then serves from a matching
    /// cache or re-ingests the files.
    async fn ingest_with_cache(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        *self.sources.write().await = paths.to_vec();

        if self.config.use_cache && self.persistence.is_valid(paths).await {
            match self.load_from_cache().await {
                Ok(true) => {
                    let documents_added = self.store.read().await.len();
                    info!(documents = documents_added, "serving index from cache");
                    return Ok(IngestReport {
                        files_processed: 0,
                        files_failed: Vec::new(),
                        documents_added,
                        from_cache: true,
                    });
                }
                Ok(false) => debug!("cache produced no usable index; re-ingesting"),
                Err(error) => warn!(%error, "cache load failed; re-ingesting"),
            }
        }

        self.ingest_paths(paths).await
    }

    async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        self.store.write().await.clear();

        let mut report = IngestReport::default();
        for path in paths {
            match self.ingest_file(path).await {
                Ok(added) => {
                    report.files_processed += 1;
                    report.documents_added += added;
                }
                Err(error) => {
                    warn!(file = %path.display(), %error, "file skipped");
                    report.files_failed.push((path.clone(), error.to_string()));
                }
            }
        }
        info!(
            processed = report.files_processed,
            failed = report.files_failed.len(),
            documents = report.documents_added,
            "ingestion complete"
        );

        if self.config.use_cache {
            if let Err(error) = self.save_to_cache().await {
                warn!(%error, "cache save failed; continuing with the in-memory index");
            }
        }
        Ok(report)
    }

    /// Turns an extraction result into indexable units. Text is chunked;
    /// spreadsheet rows stay whole, one unit per row.
    fn to_documents(&self, path: &Path, extracted: Extracted) -> Vec<Document> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let type_name = extracted.document_type.as_str();

        match extracted.content {
            ExtractedContent::Text(text) => self
                .splitter
                .split_text(&text)
                .into_iter()
                .map(|chunk| {
                    Document::new(chunk)
                        .with_metadata(keys::SOURCE, file_name.clone())
                        .with_metadata(keys::DOCUMENT_TYPE, type_name)
                })
                .collect(),
            ExtractedContent::Rows(rows) => rows
                .into_iter()
                .map(|row| {
                    Document::new(row.full_text)
                        .with_metadata(keys::SOURCE, file_name.clone())
                        .with_metadata(keys::DOCUMENT_TYPE, type_name)
                        .with_metadata(keys::SHEET_NAME, row.sheet_name)
                        .with_metadata(keys::ROW_INDEX, row.row_index)
                        .with_metadata(keys::ROW_CONTENT, row.content)
                })
                .collect(),
        }
    }

    /// Embeds and appends documents in `batch_size` slices with the
    /// configured pause between them. A failed batch is dropped with a
    /// warning; later batches still run.
    async fn insert_batched(&self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        let batch_size = self.config.batch_size.max(1);
        let pause = self.config.batch_pause();
        let total_batches = documents.len().div_ceil(batch_size);

        let mut added = 0;
        for (index, batch) in documents.chunks(batch_size).enumerate() {
            if index > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            let mut store = self.store.write().await;
            match store.add_documents(batch.to_vec()).await {
                Ok(count) => {
                    added += count;
                    debug!(batch = index + 1, total_batches, count, "batch indexed");
                }
                Err(error) => {
                    warn!(
                        batch = index + 1,
                        total_batches,
                        size = batch.len(),
                        %error,
                        "batch failed; its documents were dropped"
                    );
                }
            }
        }
        Ok(added)
    }
}

/// Supported files directly under `dir`, sorted by path. Subdirectories
/// are not descended into.
async fn scan_supported(dir: &Path) -> Result<Vec<PathBuf>> {
    let root = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        if !root.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("source directory not found: {}", root.display()),
            )));
        }
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(&root)
            .max_depth(1)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.path().is_file() && extract::is_supported(entry.path()))
            .map(walkdir::DirEntry::into_path)
            .collect();
        paths.sort();
        Ok(paths)
    })
    .await
    .map_err(|e| Error::Other(format!("directory scan task failed: {e}")))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::documents::DocumentType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Deterministic embedder: every text maps to the same unit vector,
    /// batch sizes are recorded.
    struct CountingEmbeddings {
        batch_sizes: StdMutex<Vec<usize>>,
    }

    impl CountingEmbeddings {
        fn shared() -> Arc<Self> {
            Arc::new(Self {
                batch_sizes: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Embeddings for CountingEmbeddings {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batch_sizes.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn provider_name(&self) -> &str {
            "planned"
        }

        fn model_name(&self) -> &str {
            "planned-test"
        }
    }

    /// Fails the nth `embed_documents` call, succeeds otherwise.
    struct FlakyEmbeddings {
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl Embeddings for FlakyEmbeddings {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                return Err(Error::Provider("quota exceeded".to_string()));
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn provider_name(&self) -> &str {
            "planned"
        }

        fn model_name(&self) -> &str {
            "planned-test"
        }
    }

    fn test_config(cache_dir: &Path) -> ServiceConfig {
        ServiceConfig {
            cache_dir: cache_dir.to_path_buf(),
            batch_pause_ms: 0,
            ..ServiceConfig::default()
        }
    }

    fn service_in(dir: &Path) -> DocumentService {
        DocumentService::new(test_config(&dir.join("cache")), CountingEmbeddings::shared()).unwrap()
    }

    fn write_corpus(dir: &Path) {
        std::fs::write(
            dir.join("kurallar.txt"),
            "Kütüphane hafta içi 09:00-17:00 arasında açıktır. Ödünç süresi 30 gündür.",
        )
        .unwrap();
        std::fs::write(
            dir.join("katalog.txt"),
            "Simyacı romanı Paulo Coelho tarafından yazılmıştır.",
        )
        .unwrap();
    }

    // ==== scanning ====

    #[tokio::test]
    async fn scan_is_sorted_and_skips_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("notlar.md"), "desteklenmiyor").unwrap();
        std::fs::create_dir(dir.path().join("alt")).unwrap();
        std::fs::write(dir.path().join("alt").join("gizli.txt"), "alt dizin").unwrap();

        let paths = scan_supported(dir.path()).await.unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_supported(&dir.path().join("yok")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    // ==== ingestion ====

    #[tokio::test]
    async fn ingest_indexes_text_files_with_provenance() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let service = service_in(dir.path());

        let report = service.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(report.files_processed, 2);
        assert!(report.files_failed.is_empty());
        assert!(!report.from_cache);
        assert_eq!(report.documents_added, service.document_count().await);
        assert!(report.documents_added >= 2);

        let store = service.store();
        let store = store.read().await;
        let doc = store
            .documents()
            .into_iter()
            .find(|d| d.source() == Some("katalog.txt"))
            .unwrap();
        assert_eq!(doc.document_type(), Some(DocumentType::Text));
        assert!(doc.page_content.contains("Simyacı"));
    }

    #[tokio::test]
    async fn corrupt_file_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        // Not a real PDF; extraction fails, the run continues.
        std::fs::write(dir.path().join("bozuk.pdf"), b"PDF degil").unwrap();
        let service = service_in(dir.path());

        let report = service.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(report.files_processed, 2);
        assert_eq!(report.files_failed.len(), 1);
        assert!(report.files_failed[0].0.ends_with("bozuk.pdf"));
        assert!(report.documents_added >= 2);
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());

        let report = service.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(report, IngestReport::default());
        assert_eq!(service.document_count().await, 0);
    }

    #[tokio::test]
    async fn reingest_replaces_instead_of_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let config = ServiceConfig {
            use_cache: false,
            ..test_config(&dir.path().join("cache"))
        };
        let service = DocumentService::new(config, CountingEmbeddings::shared()).unwrap();

        let first = service.ingest_directory(dir.path()).await.unwrap();
        let second = service.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(first.documents_added, second.documents_added);
        assert_eq!(service.document_count().await, second.documents_added);
    }

    #[tokio::test]
    async fn ingest_sources_uses_the_configured_file_list() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let other = tempfile::tempdir().unwrap();
        std::fs::write(
            other.path().join("duyuru.txt"),
            "Kütüphane envanter sayımı nedeniyle cuma günü kapalıdır.",
        )
        .unwrap();
        let config = ServiceConfig {
            source_files: vec![
                dir.path().join("katalog.txt"),
                other.path().join("duyuru.txt"),
            ],
            ..test_config(&dir.path().join("cache"))
        };
        let service = DocumentService::new(config, CountingEmbeddings::shared()).unwrap();

        let report = service.ingest_sources().await.unwrap();
        assert_eq!(report.files_processed, 2);
        assert!(report.files_failed.is_empty());

        let store = service.store();
        let store = store.read().await;
        let sources: Vec<_> = store
            .documents()
            .iter()
            .filter_map(|d| d.source().map(str::to_owned))
            .collect();
        assert!(sources.contains(&"duyuru.txt".to_string()));
        // kurallar.txt sits next to katalog.txt but is not in the list.
        assert!(!sources.contains(&"kurallar.txt".to_string()));
    }

    #[tokio::test]
    async fn ingest_sources_warm_start_comes_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let config = ServiceConfig {
            source_files: vec![dir.path().join("katalog.txt")],
            ..test_config(&dir.path().join("cache"))
        };

        let first = DocumentService::new(config.clone(), CountingEmbeddings::shared()).unwrap();
        let built = first.ingest_sources().await.unwrap();
        assert!(!built.from_cache);

        let second = DocumentService::new(config, CountingEmbeddings::shared()).unwrap();
        let restored = second.ingest_sources().await.unwrap();
        assert!(restored.from_cache);
        assert_eq!(restored.documents_added, built.documents_added);
    }

    #[tokio::test]
    async fn ingest_sources_without_a_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());
        let err = service.ingest_sources().await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn batches_respect_configured_size() {
        let dir = tempfile::tempdir().unwrap();
        let text = "Kütüphane kuralları madde madde yazılmıştır. ".repeat(12);
        std::fs::write(dir.path().join("kurallar.txt"), text).unwrap();
        let embeddings = CountingEmbeddings::shared();
        let config = ServiceConfig {
            chunk_size: 60,
            chunk_overlap: 10,
            batch_size: 2,
            use_cache: false,
            ..test_config(&dir.path().join("cache"))
        };
        let service =
            DocumentService::new(config, Arc::clone(&embeddings) as Arc<dyn Embeddings>).unwrap();

        let report = service.ingest_directory(dir.path()).await.unwrap();
        let sizes = embeddings.batch_sizes.lock().unwrap().clone();
        assert!(sizes.len() >= 2, "expected multiple batches, got {sizes:?}");
        assert!(sizes.iter().all(|&s| 0 < s && s <= 2));
        assert_eq!(sizes.iter().sum::<usize>(), report.documents_added);
    }

    #[tokio::test]
    async fn failed_batch_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let config = ServiceConfig {
            use_cache: false,
            ..test_config(&dir.path().join("cache"))
        };
        let embeddings = Arc::new(FlakyEmbeddings {
            calls: AtomicUsize::new(0),
            fail_on: 1,
        });
        let service = DocumentService::new(config, embeddings).unwrap();

        let report = service.ingest_directory(dir.path()).await.unwrap();
        // The first file's batch failed; the second file still landed.
        assert_eq!(report.files_processed, 2);
        assert!(report.documents_added < service.config().batch_size * 2);
        assert!(service.document_count().await > 0);
    }

    // ==== caching ====

    #[tokio::test]
    async fn second_run_serves_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let cache_dir = dir.path().join("cache");

        let first = service_in(dir.path());
        let built = first.ingest_directory(dir.path()).await.unwrap();
        assert!(!built.from_cache);

        let second =
            DocumentService::new(test_config(&cache_dir), CountingEmbeddings::shared()).unwrap();
        let restored = second.ingest_directory(dir.path()).await.unwrap();
        assert!(restored.from_cache);
        assert_eq!(restored.files_processed, 0);
        assert_eq!(restored.documents_added, built.documents_added);
        assert_eq!(second.document_count().await, built.documents_added);
    }

    #[tokio::test]
    async fn changed_file_invalidates_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let service = service_in(dir.path());
        service.ingest_directory(dir.path()).await.unwrap();
        assert!(service.is_cache_valid(dir.path()).await.unwrap());

        std::fs::write(dir.path().join("kurallar.txt"), "Kurallar değişti.").unwrap();
        assert!(!service.is_cache_valid(dir.path()).await.unwrap());

        let report = service.ingest_directory(dir.path()).await.unwrap();
        assert!(!report.from_cache);
        assert_eq!(report.files_processed, 2);
    }

    #[tokio::test]
    async fn rebuild_bypasses_a_valid_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let service = service_in(dir.path());
        service.ingest_directory(dir.path()).await.unwrap();

        let report = service.rebuild(dir.path()).await.unwrap();
        assert!(!report.from_cache);
        assert_eq!(report.files_processed, 2);
        // The rebuild saved a fresh cache.
        let info = service.cache_info().await.unwrap();
        assert!(info.complete);
        assert!(info.manifest.is_some());
        assert!(service.is_cache_valid(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn disabled_cache_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let cache_dir = dir.path().join("cache");
        let config = ServiceConfig {
            use_cache: false,
            ..test_config(&cache_dir)
        };
        let service = DocumentService::new(config, CountingEmbeddings::shared()).unwrap();

        service.ingest_directory(dir.path()).await.unwrap();
        assert!(!cache_dir.exists());
        let info = service.cache_info().await.unwrap();
        assert!(!info.exists);
        assert!(info.manifest.is_none());
    }

    #[tokio::test]
    async fn clear_cache_forces_reprocessing() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let service = service_in(dir.path());
        service.ingest_directory(dir.path()).await.unwrap();

        assert_eq!(service.clear_cache().await.unwrap(), 3);
        assert!(service.cache_info().await.unwrap().manifest.is_none());
        let report = service.ingest_directory(dir.path()).await.unwrap();
        assert!(!report.from_cache);
    }

    #[tokio::test]
    async fn load_from_cache_without_a_cache_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());
        assert!(!service.load_from_cache().await.unwrap());
        assert_eq!(service.document_count().await, 0);
    }

    // ==== retrieval over the service ====

    #[tokio::test]
    async fn search_finds_ingested_content() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let service = service_in(dir.path());
        service.ingest_directory(dir.path()).await.unwrap();

        let outcome = service.search("Simyacı kimin eseri").await.unwrap();
        let docs = outcome.documents();
        assert!(!docs.is_empty());
        assert!(docs.iter().any(|d| d.page_content.contains("Simyacı")));
    }

    #[tokio::test]
    async fn search_over_empty_index_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path());
        service.ingest_directory(dir.path()).await.unwrap();

        let outcome = service.search("herhangi bir şey").await.unwrap();
        assert_eq!(outcome, RetrievalOutcome::NoRelevantInformation);
    }
}
