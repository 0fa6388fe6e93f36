//! On-disk vector collection backed by SQLite.
//!
//! One database file holds any number of named collections. Each collection
//! records the embedding model and dimensionality it was built with, so a
//! query-time embedder that does not match is rejected instead of silently
//! producing meaningless distances.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Chunk, DocumentMetadata};

/// File name of the SQLite database inside the collection directory.
pub const DB_FILE_NAME: &str = "index.sqlite3";

/// Errors raised by [`Collection`].
#[derive(Error, Debug)]
pub enum CollectionError {
    /// No collection with this name has been built yet.
    #[error("collection '{name}' not found at {}; build the index first", .path.display())]
    MissingCollection {
        /// Requested collection name.
        name: String,
        /// Database path that was checked.
        path: PathBuf,
    },

    /// A vector's length differs from the collection's dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Collection dimensionality.
        expected: usize,
        /// Offending vector length.
        actual: usize,
    },

    /// The collection was built with a different embedding model.
    #[error("collection was built with embedding model '{stored}' but '{requested}' was requested")]
    ModelMismatch {
        /// Model recorded at build time.
        stored: String,
        /// Model of the embedder supplied now.
        requested: String,
    },

    /// Chunks and embeddings passed to [`Collection::add`] differ in count.
    #[error("chunk count ({chunks}) doesn't match embedding count ({embeddings})")]
    LengthMismatch {
        /// Number of chunks.
        chunks: usize,
        /// Number of embeddings.
        embeddings: usize,
    },

    /// Underlying database failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored metadata could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure creating the collection directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Where collections are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the database file.
    pub collection_dir: PathBuf,
    /// Collection name within the database.
    pub collection_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection_dir: PathBuf::from("collection"),
            collection_name: "Linux_Philosophy".to_string(),
        }
    }
}

impl StoreConfig {
    /// Path of the database file.
    pub fn db_path(&self) -> PathBuf {
        self.collection_dir.join(DB_FILE_NAME)
    }
}

/// A stored chunk returned by [`Collection::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The stored chunk.
    pub chunk: Chunk,
    /// Cosine distance to the query (0 = same direction).
    pub distance: f32,
    /// Stored vector, kept for reranking.
    pub embedding: Vec<f32>,
}

/// Handle to one named collection.
pub struct Collection {
    conn: Connection,
    db_path: PathBuf,
    id: i64,
    name: String,
    model_id: String,
    dimensions: usize,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("db_path", &self.db_path)
            .field("name", &self.name)
            .field("model_id", &self.model_id)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl Collection {
    /// Opens the named collection, creating the database and collection when
    /// absent. An existing collection must match `model_id` and `dimensions`.
    pub fn create_or_open(
        dir: &Path,
        name: &str,
        model_id: &str,
        dimensions: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        init_schema(&conn)?;

        match lookup(&conn, name)? {
            Some((id, stored_model, stored_dims)) => {
                if stored_model != model_id {
                    return Err(CollectionError::ModelMismatch {
                        stored: stored_model,
                        requested: model_id.to_string(),
                    });
                }
                if stored_dims != dimensions {
                    return Err(CollectionError::DimensionMismatch {
                        expected: stored_dims,
                        actual: dimensions,
                    });
                }
                Ok(Self {
                    conn,
                    db_path,
                    id,
                    name: name.to_string(),
                    model_id: stored_model,
                    dimensions,
                })
            }
            None => {
                conn.execute(
                    "INSERT INTO collections (name, model, dimensions) VALUES (?1, ?2, ?3)",
                    params![name, model_id, dimensions as i64],
                )?;
                let id = conn.last_insert_rowid();
                log::info!(
                    "created collection '{}' in {} ({} dims, model {})",
                    name,
                    db_path.display(),
                    dimensions,
                    model_id
                );
                Ok(Self {
                    conn,
                    db_path,
                    id,
                    name: name.to_string(),
                    model_id: model_id.to_string(),
                    dimensions,
                })
            }
        }
    }

    /// Drops the named collection with all of its records, then creates it
    /// afresh for `model_id` and `dimensions`.
    pub fn recreate(dir: &Path, name: &str, model_id: &str, dimensions: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let mut conn = Connection::open(dir.join(DB_FILE_NAME))?;
        init_schema(&conn)?;
        if let Some((id, stored_model, _)) = lookup(&conn, name)? {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM records WHERE collection_id = ?1", params![id])?;
            tx.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
            tx.commit()?;
            log::info!("dropped collection '{name}' ({removed} records, model {stored_model})");
        }
        drop(conn);
        Self::create_or_open(dir, name, model_id, dimensions)
    }

    /// Opens a collection that must already exist, without writing anything.
    pub fn open_existing(dir: &Path, name: &str, model_id: &str) -> Result<Self> {
        let db_path = dir.join(DB_FILE_NAME);
        let missing = || CollectionError::MissingCollection {
            name: name.to_string(),
            path: db_path.clone(),
        };
        if !db_path.is_file() {
            return Err(missing());
        }
        let conn = Connection::open(&db_path)?;
        let has_schema: bool = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'collections'",
            [],
            |row| row.get::<_, i64>(0).map(|n| n > 0),
        )?;
        if !has_schema {
            return Err(missing());
        }
        let (id, stored_model, dimensions) = lookup(&conn, name)?.ok_or_else(missing)?;
        if stored_model != model_id {
            return Err(CollectionError::ModelMismatch {
                stored: stored_model,
                requested: model_id.to_string(),
            });
        }
        Ok(Self {
            conn,
            db_path,
            id,
            name: name.to_string(),
            model_id: stored_model,
            dimensions,
        })
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Embedding model recorded at build time.
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Vector length of every record.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Database file path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Appends chunks with their vectors in a single transaction.
    pub fn add(&mut self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(CollectionError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(CollectionError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (collection_id, chunk_index, start, text, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (chunk, embedding) in chunks.iter().zip(embeddings) {
                let metadata = serde_json::to_string(&chunk.metadata)?;
                stmt.execute(params![
                    self.id,
                    chunk.chunk_index as i64,
                    chunk.start as i64,
                    chunk.text,
                    metadata,
                    serialize_embedding(embedding),
                ])?;
            }
        }
        tx.commit()?;
        Ok(chunks.len())
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection_id = ?1",
            params![self.id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Deletes every record, keeping the collection and its model identity.
    pub fn clear(&mut self) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM records WHERE collection_id = ?1",
            params![self.id],
        )?;
        Ok(removed)
    }

    /// The `limit` records nearest to `query`, by ascending cosine distance.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimensions {
            return Err(CollectionError::DimensionMismatch {
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        let mut stmt = self.conn.prepare(
            "SELECT chunk_index, start, text, metadata, embedding
             FROM records WHERE collection_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![self.id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut hits = Vec::with_capacity(rows.len());
        for (chunk_index, start, text, metadata, bytes) in rows {
            let metadata: DocumentMetadata = serde_json::from_str(&metadata)?;
            let embedding = deserialize_embedding(&bytes);
            let distance = cosine_distance(query, &embedding);
            hits.push(SearchHit {
                chunk: Chunk {
                    text,
                    metadata,
                    chunk_index: chunk_index as usize,
                    start: start as usize,
                },
                distance,
                embedding,
            });
        }
        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            model TEXT NOT NULL,
            dimensions INTEGER NOT NULL,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY,
            collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
            chunk_index INTEGER NOT NULL,
            start INTEGER NOT NULL,
            text TEXT NOT NULL,
            metadata TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection_id);
        "#,
    )?;
    Ok(())
}

fn lookup(conn: &Connection, name: &str) -> Result<Option<(i64, String, usize)>> {
    let row = conn
        .query_row(
            "SELECT id, model, dimensions FROM collections WHERE name = ?1",
            params![name],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? as usize,
                ))
            },
        )
        .optional()?;
    Ok(row)
}

/// Serialize embedding as f32 little-endian bytes.
fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity; 0 for empty, mismatched or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, SourceKind};
    use pretty_assertions::assert_eq;

    fn chunk(text: &str, index: usize) -> Chunk {
        let doc = Document::new(text.to_string(), SourceKind::Pdf, "book.pdf#page=1", None, None);
        Chunk {
            text: text.to_string(),
            metadata: doc.metadata,
            chunk_index: index,
            start: index * 10,
        }
    }

    #[test]
    fn search_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let mut collection = Collection::create_or_open(dir.path(), "c", "test/model", 2).unwrap();
        collection
            .add(
                &[chunk("east", 0), chunk("north", 1), chunk("northeast", 2)],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            )
            .unwrap();
        assert_eq!(collection.count().unwrap(), 3);

        let hits = collection.search(&[0.0, 2.0], 2).unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["north", "northeast"]);
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[0].chunk.chunk_index, 1);
        assert_eq!(hits[0].chunk.start, 10);
    }

    #[test]
    fn reopening_checks_model_and_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        Collection::create_or_open(dir.path(), "c", "a/model", 3).unwrap();

        let err = Collection::create_or_open(dir.path(), "c", "b/model", 3).unwrap_err();
        assert!(matches!(err, CollectionError::ModelMismatch { .. }));
        let err = Collection::create_or_open(dir.path(), "c", "a/model", 4).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::DimensionMismatch { expected: 3, actual: 4 }
        ));
        let err = Collection::open_existing(dir.path(), "c", "b/model").unwrap_err();
        assert!(matches!(err, CollectionError::ModelMismatch { .. }));
        assert_eq!(
            Collection::open_existing(dir.path(), "c", "a/model")
                .unwrap()
                .dimensions(),
            3
        );
    }

    #[test]
    fn open_existing_reports_missing_collection() {
        let dir = tempfile::tempdir().unwrap();
        let err = Collection::open_existing(dir.path(), "Linux_Philosophy", "m").unwrap_err();
        assert!(matches!(err, CollectionError::MissingCollection { .. }));
        assert!(err.to_string().contains("Linux_Philosophy"));

        Collection::create_or_open(dir.path(), "other", "m", 2).unwrap();
        let err = Collection::open_existing(dir.path(), "Linux_Philosophy", "m").unwrap_err();
        assert!(matches!(err, CollectionError::MissingCollection { .. }));
    }

    #[test]
    fn add_rejects_wrong_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let mut collection = Collection::create_or_open(dir.path(), "c", "m", 2).unwrap();
        let err = collection.add(&[chunk("a", 0)], &[]).unwrap_err();
        assert!(matches!(err, CollectionError::LengthMismatch { .. }));
        let err = collection.add(&[chunk("a", 0)], &[vec![1.0]]).unwrap_err();
        assert!(matches!(err, CollectionError::DimensionMismatch { .. }));
        assert_eq!(collection.count().unwrap(), 0);
    }

    #[test]
    fn clear_keeps_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mut collection = Collection::create_or_open(dir.path(), "c", "m", 1).unwrap();
        collection.add(&[chunk("a", 0)], &[vec![1.0]]).unwrap();
        assert_eq!(collection.clear().unwrap(), 1);
        assert_eq!(collection.count().unwrap(), 0);
        assert!(Collection::open_existing(dir.path(), "c", "m").is_ok());
    }

    #[test]
    fn recreate_replaces_model_identity() {
        let dir = tempfile::tempdir().unwrap();
        let mut old = Collection::create_or_open(dir.path(), "c", "cohere/a", 2).unwrap();
        old.add(&[chunk("a", 0)], &[vec![1.0, 0.0]]).unwrap();
        let mut other = Collection::create_or_open(dir.path(), "other", "cohere/a", 2).unwrap();
        other.add(&[chunk("b", 0)], &[vec![0.0, 1.0]]).unwrap();
        drop(old);

        let fresh = Collection::recreate(dir.path(), "c", "local/bge-m3", 3).unwrap();
        assert_eq!(fresh.model_id(), "local/bge-m3");
        assert_eq!(fresh.dimensions(), 3);
        assert_eq!(fresh.count().unwrap(), 0);
        assert_eq!(other.count().unwrap(), 1);
        assert!(matches!(
            Collection::open_existing(dir.path(), "c", "cohere/a").unwrap_err(),
            CollectionError::ModelMismatch { .. }
        ));
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[3.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
