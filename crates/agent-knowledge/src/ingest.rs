//! Corpus ingestion: copy uploads, extract, chunk, embed, and replace the index.

use std::sync::Arc;

use agent_core::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::chunking::{ChunkConfig, chunk_text};
use crate::error::Result;
use crate::extractor::extract_text;
use crate::locks::KeyedLocks;
use crate::store::{Chunk, IndexStore, sanitize_upload_name, validate_corpus_id};

/// A file handed to ingestion
#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// What one ingestion call stored
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub files: Vec<String>,
    pub chunks: usize,
}

pub struct Ingestor {
    store: Arc<IndexStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunking: ChunkConfig,
    locks: KeyedLocks<Mutex<()>>,
}

impl Ingestor {
    pub fn new(store: Arc<IndexStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            chunking: ChunkConfig::default(),
            locks: KeyedLocks::new(),
        }
    }

    #[must_use]
    pub const fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Rebuild the corpus index from `uploads`.
    ///
    /// The new index holds only the chunks of this call's files; chunks from
    /// earlier ingestions are dropped even though their files stay on disk.
    /// Empty uploads and unusable names are skipped. Calls for the same corpus
    /// run one at a time.
    pub async fn ingest(&self, corpus_id: &str, uploads: Vec<Upload>) -> Result<IngestReport> {
        validate_corpus_id(corpus_id)?;
        let lock = self.locks.get(corpus_id);
        let _guard = lock.lock().await;

        let mut files = Vec::new();
        let mut chunks: Vec<Chunk> = Vec::new();

        for upload in uploads {
            if upload.bytes.is_empty() {
                tracing::debug!(corpus = corpus_id, file = %upload.file_name, "skipping empty upload");
                continue;
            }
            let Some(name) = sanitize_upload_name(&upload.file_name) else {
                tracing::warn!(corpus = corpus_id, file = %upload.file_name, "skipping upload without a usable name");
                continue;
            };

            let path = self.store.save_file(corpus_id, &name, &upload.bytes).await?;
            let text = extract_text(&path).await;
            let pieces = chunk_text(&text, &self.chunking);
            tracing::info!(corpus = corpus_id, file = %name, chunks = pieces.len(), "file extracted");

            chunks.extend(pieces.into_iter().enumerate().map(|(i, text)| Chunk {
                text,
                source: name.clone(),
                sequence_index: i,
            }));
            files.push(name);
        }

        let rows = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            self.embedder.embed(&texts).await?
        };

        self.store.write(corpus_id, &chunks, rows).await?;
        tracing::info!(corpus = corpus_id, files = files.len(), chunks = chunks.len(), "corpus indexed");

        Ok(IngestReport {
            files,
            chunks: chunks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KnowledgeError;
    use crate::retriever::Retriever;
    use crate::retriever::tests::KeywordEmbedder;

    fn setup(dir: &std::path::Path) -> (Arc<IndexStore>, Ingestor) {
        let store = Arc::new(IndexStore::new(dir));
        let ingestor = Ingestor::new(store.clone(), Arc::new(KeywordEmbedder));
        (store, ingestor)
    }

    #[tokio::test]
    async fn uploaded_document_is_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ingestor) = setup(dir.path());

        let report = ingestor
            .ingest(
                "research",
                vec![Upload::new("guide.md", "Rust async runtimes: tokio drives futures.")],
            )
            .await
            .unwrap();
        assert_eq!(report.files, vec!["guide.md"]);
        assert_eq!(report.chunks, 1);

        let retriever = Retriever::new(store, Arc::new(KeywordEmbedder));
        let hits = retriever.query("research", "tell me about rust", 4).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].source, "guide.md");
        assert!((-1.0..=1.0).contains(&hits[0].score));
    }

    #[tokio::test]
    async fn pdf_upload_is_chunked_from_its_pages() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ingestor) = setup(dir.path());
        let pdf = crate::extractor::tests::pdf_with_pages(&["rust ownership", "tokio runtime"]);

        let report = ingestor
            .ingest("kb", vec![Upload::new("manual.pdf", pdf)])
            .await
            .unwrap();
        assert_eq!(report.files, vec!["manual.pdf"]);
        assert_eq!(report.chunks, 1);

        let index = store.read("kb").await.unwrap().unwrap();
        assert_eq!(index.chunks[0].text, "rust ownership tokio runtime");
        assert_eq!(index.chunks[0].source, "manual.pdf");
    }

    #[tokio::test]
    async fn empty_uploads_are_skipped_and_index_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ingestor) = setup(dir.path());

        let report = ingestor
            .ingest("kb", vec![Upload::new("blank.txt", Vec::new()), Upload::new("ws.txt", "  \n ")])
            .await
            .unwrap();
        assert_eq!(report.files, vec!["ws.txt"]);
        assert_eq!(report.chunks, 0);

        let status = store.status("kb").await;
        assert!(status.indexed);
        assert_eq!(status.chunks, 0);
        assert_eq!(status.files, vec!["ws.txt"]);
    }

    #[tokio::test]
    async fn reingestion_replaces_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ingestor) = setup(dir.path());

        ingestor
            .ingest("kb", vec![Upload::new("a.txt", "python python")])
            .await
            .unwrap();
        let report = ingestor
            .ingest("kb", vec![Upload::new("b.txt", "rust")])
            .await
            .unwrap();
        assert_eq!(report.chunks, 1);

        let index = store.read("kb").await.unwrap().unwrap();
        assert!(index.chunks.iter().all(|c| c.source == "b.txt"));
        // originals stay in the file store
        assert_eq!(store.status("kb").await.files, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn identical_reingestion_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ingestor) = setup(dir.path());
        let text = "rust tokio ".repeat(500);
        let uploads = || vec![Upload::new("doc.txt", text.clone())];

        let first = ingestor.ingest("kb", uploads()).await.unwrap();
        let before = store.read("kb").await.unwrap().unwrap();
        let second = ingestor.ingest("kb", uploads()).await.unwrap();
        let after = store.read("kb").await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn path_components_are_stripped_from_names() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ingestor) = setup(dir.path());
        let report = ingestor
            .ingest("kb", vec![Upload::new("../../outside.txt", "rust")])
            .await
            .unwrap();
        assert_eq!(report.files, vec!["outside.txt"]);
        assert!(store.files_dir("kb").unwrap().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn bad_corpus_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (_, ingestor) = setup(dir.path());
        let err = ingestor
            .ingest("../x", vec![Upload::new("a.txt", "rust")])
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::InvalidCorpusId(_)));
    }

    #[tokio::test]
    async fn concurrent_ingestion_leaves_a_consistent_index() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ingestor) = setup(dir.path());
        let ingestor = Arc::new(ingestor);

        let mut handles = Vec::new();
        for i in 0..4 {
            let ingestor = ingestor.clone();
            handles.push(tokio::spawn(async move {
                let body = "rust ".repeat(900 * (i + 1));
                ingestor
                    .ingest("kb", vec![Upload::new(format!("f{i}.txt"), body)])
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let index = store.read("kb").await.unwrap().unwrap();
        assert_eq!(index.chunks.len(), index.vectors.len());
        let sources: std::collections::HashSet<_> =
            index.chunks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources.len(), 1);
    }
}
