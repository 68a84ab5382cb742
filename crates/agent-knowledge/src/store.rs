//! On-disk vector index, one directory per corpus.
//!
//! ```text
//! <root>/<corpus_id>/
//!     files/          uploaded originals
//!     meta.json       ordered chunk metadata
//!     vectors.json    {dim, rows}, one row per chunk
//! ```
//!
//! Both index artifacts are replaced together under a per-corpus write lock,
//! each through a temp file and rename, so readers in this process never see
//! one artifact from an old ingestion and the other from a new one.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{KnowledgeError, Result};
use crate::locks::KeyedLocks;

pub const META_FILE: &str = "meta.json";
pub const VECTORS_FILE: &str = "vectors.json";
pub const FILES_DIR: &str = "files";

/// One chunk of one source document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// File name of the uploaded source
    pub source: String,
    /// Position of the chunk within its source
    #[serde(alias = "i")]
    pub sequence_index: usize,
}

/// Dense row-major matrix, one row per chunk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorMatrix {
    /// Row width; 1 for an empty matrix
    pub dim: usize,
    pub rows: Vec<Vec<f32>>,
}

impl VectorMatrix {
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Self {
        let dim = rows.first().map_or(1, Vec::len).max(1);
        Self { dim, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A corpus' chunk set and matching vectors
#[derive(Clone, Debug, PartialEq)]
pub struct CorpusIndex {
    pub chunks: Vec<Chunk>,
    pub vectors: VectorMatrix,
}

/// Summary reported for a corpus
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatus {
    pub indexed: bool,
    pub chunks: usize,
    pub files: Vec<String>,
}

/// Corpus ids become directory names, so they must be one plain path segment.
pub fn validate_corpus_id(corpus_id: &str) -> Result<()> {
    let valid = !corpus_id.is_empty()
        && !corpus_id.starts_with('.')
        && corpus_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(KnowledgeError::InvalidCorpusId(corpus_id.to_string()))
    }
}

/// Final path component of an uploaded file name, or `None` if nothing usable
/// remains.
pub fn sanitize_upload_name(raw: &str) -> Option<String> {
    let unified = raw.replace('\\', "/");
    let name = unified.rsplit('/').next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

pub struct IndexStore {
    root: PathBuf,
    locks: KeyedLocks<RwLock<()>>,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: KeyedLocks::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn corpus_dir(&self, corpus_id: &str) -> Result<PathBuf> {
        validate_corpus_id(corpus_id)?;
        Ok(self.root.join(corpus_id))
    }

    pub fn files_dir(&self, corpus_id: &str) -> Result<PathBuf> {
        Ok(self.corpus_dir(corpus_id)?.join(FILES_DIR))
    }

    /// Copy an upload into the corpus file store, replacing a same-named file.
    pub async fn save_file(&self, corpus_id: &str, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = sanitize_upload_name(file_name)
            .ok_or_else(|| KnowledgeError::InvalidFileName(file_name.to_string()))?;
        let dir = self.files_dir(corpus_id)?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Replace the corpus index. `chunks` and `rows` must have equal length;
    /// an empty pair is written as a valid empty index.
    pub async fn write(&self, corpus_id: &str, chunks: &[Chunk], rows: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != rows.len() {
            return Err(KnowledgeError::Inconsistent {
                corpus: corpus_id.to_string(),
                chunks: chunks.len(),
                rows: rows.len(),
            });
        }

        let dir = self.corpus_dir(corpus_id)?;
        let meta = serde_json::to_vec(chunks)?;
        let matrix = serde_json::to_vec(&VectorMatrix::from_rows(rows))?;

        let lock = self.locks.get(corpus_id);
        let _guard = lock.write().await;

        tokio::fs::create_dir_all(&dir).await?;
        replace_file(&dir.join(VECTORS_FILE), &matrix).await?;
        replace_file(&dir.join(META_FILE), &meta).await?;

        tracing::debug!(corpus = corpus_id, chunks = chunks.len(), "index written");
        Ok(())
    }

    /// The stored index, or `None` when the corpus was never indexed
    pub async fn read(&self, corpus_id: &str) -> Result<Option<CorpusIndex>> {
        let dir = self.corpus_dir(corpus_id)?;
        let lock = self.locks.get(corpus_id);
        let _guard = lock.read().await;

        let (meta_path, vectors_path) = (dir.join(META_FILE), dir.join(VECTORS_FILE));
        if !(exists(&meta_path).await && exists(&vectors_path).await) {
            return Ok(None);
        }

        let chunks: Vec<Chunk> = serde_json::from_slice(&tokio::fs::read(&meta_path).await?)?;
        let vectors: VectorMatrix = serde_json::from_slice(&tokio::fs::read(&vectors_path).await?)?;

        if chunks.len() != vectors.len() {
            return Err(KnowledgeError::Inconsistent {
                corpus: corpus_id.to_string(),
                chunks: chunks.len(),
                rows: vectors.len(),
            });
        }
        Ok(Some(CorpusIndex { chunks, vectors }))
    }

    /// True iff both index artifacts exist
    pub async fn has_index(&self, corpus_id: &str) -> bool {
        let Ok(dir) = self.corpus_dir(corpus_id) else {
            return false;
        };
        let lock = self.locks.get(corpus_id);
        let _guard = lock.read().await;
        exists(&dir.join(META_FILE)).await && exists(&dir.join(VECTORS_FILE)).await
    }

    /// Uploaded file names, sorted; empty when there are none or the id is bad
    pub async fn list_files(&self, corpus_id: &str) -> Vec<String> {
        let Ok(dir) = self.files_dir(corpus_id) else {
            return Vec::new();
        };
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            return Vec::new();
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if is_file {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names
    }

    pub async fn status(&self, corpus_id: &str) -> IndexStatus {
        let indexed = self.has_index(corpus_id).await;
        let chunks = if indexed {
            self.chunk_count(corpus_id).await.unwrap_or(0)
        } else {
            0
        };
        IndexStatus {
            indexed,
            chunks,
            files: self.list_files(corpus_id).await,
        }
    }

    async fn chunk_count(&self, corpus_id: &str) -> Result<usize> {
        let path = self.corpus_dir(corpus_id)?.join(META_FILE);
        let lock = self.locks.get(corpus_id);
        let _guard = lock.read().await;
        let chunks: Vec<serde_json::Value> = serde_json::from_slice(&tokio::fs::read(path).await?)?;
        Ok(chunks.len())
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: &str, i: usize) -> Chunk {
        Chunk {
            text: text.into(),
            source: source.into(),
            sequence_index: i,
        }
    }

    #[test]
    fn corpus_ids_are_single_segments() {
        assert!(validate_corpus_id("research-assistant_2").is_ok());
        assert!(validate_corpus_id("a1b2c3d4-0000-4000-8000-000000000000").is_ok());
        for bad in ["", "..", ".hidden", "a/b", "a\\b", "x y"] {
            assert!(validate_corpus_id(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn upload_names_keep_last_component() {
        assert_eq!(sanitize_upload_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_upload_name("C:\\docs\\report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(sanitize_upload_name("dir/"), None);
        assert_eq!(sanitize_upload_name(".."), None);
    }

    #[tokio::test]
    async fn write_then_read_preserves_order_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let chunks = vec![
            chunk("первый фрагмент", "a.txt", 0),
            chunk("second chunk", "a.txt", 1),
            chunk("other", "b.md", 0),
        ];
        let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]];

        store.write("kb", &chunks, rows.clone()).await.unwrap();
        let index = store.read("kb").await.unwrap().unwrap();

        assert_eq!(index.chunks, chunks);
        assert_eq!(index.vectors.rows, rows);
        assert_eq!(index.vectors.dim, 2);
        assert!(store.has_index("kb").await);
    }

    #[tokio::test]
    async fn empty_index_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.write("empty", &[], Vec::new()).await.unwrap();

        let index = store.read("empty").await.unwrap().unwrap();
        assert!(index.chunks.is_empty());
        assert!(index.vectors.is_empty());
        assert_eq!(index.vectors.dim, 1);

        let status = store.status("empty").await;
        assert!(status.indexed);
        assert_eq!(status.chunks, 0);
        assert!(status.files.is_empty());
    }

    #[tokio::test]
    async fn mismatched_lengths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let err = store
            .write("kb", &[chunk("t", "a", 0)], Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::Inconsistent { chunks: 1, rows: 0, .. }));
        assert!(!store.has_index("kb").await);
    }

    #[tokio::test]
    async fn status_of_unknown_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        assert_eq!(store.status("nobody").await, IndexStatus::default());
        assert!(store.read("nobody").await.unwrap().is_none());
        assert!(store.list_files("../escape").await.is_empty());
    }

    #[tokio::test]
    async fn status_survives_corrupt_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.write("kb", &[chunk("t", "a.txt", 0)], vec![vec![1.0]]).await.unwrap();
        store.save_file("kb", "a.txt", b"t").await.unwrap();
        tokio::fs::write(dir.path().join("kb").join(META_FILE), b"{not json")
            .await
            .unwrap();

        let status = store.status("kb").await;
        assert!(status.indexed);
        assert_eq!(status.chunks, 0);
        assert_eq!(status.files, vec!["a.txt"]);
    }

    #[tokio::test]
    async fn legacy_sequence_field_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let corpus = dir.path().join("old");
        tokio::fs::create_dir_all(&corpus).await.unwrap();
        tokio::fs::write(corpus.join(META_FILE), br#"[{"text":"t","source":"s.txt","i":3}]"#)
            .await
            .unwrap();
        tokio::fs::write(corpus.join(VECTORS_FILE), br#"{"dim":2,"rows":[[1.0,2.0]]}"#)
            .await
            .unwrap();

        let index = store.read("old").await.unwrap().unwrap();
        assert_eq!(index.chunks[0].sequence_index, 3);
    }
}
