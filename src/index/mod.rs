//! Persisted similarity index over the reference corpus.
//!
//! The index is a single SQLite file using the sqlite-vec `vec0` virtual table.
//! It is written once by [`build`] and opened read-only by the service through
//! [`SimilarityIndex::open`].

pub mod build;
pub mod meta;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::{Mutex, Once};

use crate::corpus::{Orientation, ReferenceEntry};
use meta::IndexMeta;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedEntry {
    pub card: String,
    pub orientation: Orientation,
    pub text: String,
    /// vec0 distance to the query vector; smaller is closer.
    pub distance: f64,
}

/// Read-only handle to a built index.
pub struct SimilarityIndex {
    conn: Mutex<Connection>,
    meta: IndexMeta,
}

impl SimilarityIndex {
    /// Open an existing index file read-only and validate its metadata.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        anyhow::ensure!(
            path.exists(),
            "similarity index not found at {}. Run `tarot build-index` first.",
            path.display()
        );

        load_sqlite_vec();

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )
        .with_context(|| format!("failed to open similarity index at {}", path.display()))?;

        let index = Self::from_connection(conn)?;
        tracing::info!(
            path = %path.display(),
            entries = index.meta.entry_count,
            dim = index.meta.embedding_dim,
            model = %index.meta.embedding_model,
            "similarity index loaded"
        );
        Ok(index)
    }

    /// Wrap an already-open connection. The connection must hold a complete index.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        let meta = meta::read_meta(&conn).context("failed to read index metadata")?;
        Ok(Self {
            conn: Mutex::new(conn),
            meta,
        })
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// The `k` entries nearest to `embedding`, closest first.
    pub fn search(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedEntry>> {
        anyhow::ensure!(
            embedding.len() == self.meta.embedding_dim,
            "query embedding has {} dimensions but the index was built with {} ({}); rebuild the index or switch the embedding model back",
            embedding.len(),
            self.meta.embedding_dim,
            self.meta.embedding_model
        );
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))?;

        let mut stmt = conn.prepare(
            "WITH knn AS ( \
                 SELECT id, distance FROM entries_vec \
                 WHERE embedding MATCH ?1 AND k = ?2 \
             ) \
             SELECT e.card, e.orientation, e.text, knn.distance \
             FROM knn JOIN entries e ON e.id = knn.id \
             ORDER BY knn.distance, e.position",
        )?;

        let rows = stmt
            .query_map(params![embedding_to_bytes(embedding), k as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(card, orientation, text, distance)| {
                let orientation = orientation
                    .parse::<Orientation>()
                    .map_err(|e| anyhow::anyhow!("corrupt index entry: {e}"))?;
                Ok(RetrievedEntry {
                    card,
                    orientation,
                    text,
                    distance,
                })
            })
            .collect()
    }

    /// All stored entries in corpus order.
    pub fn entries(&self) -> Result<Vec<ReferenceEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))?;
        let mut stmt =
            conn.prepare("SELECT card, orientation, text FROM entries ORDER BY position")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(card, orientation, text)| {
                let orientation = orientation
                    .parse::<Orientation>()
                    .map_err(|e| anyhow::anyhow!("corrupt index entry: {e}"))?;
                Ok(ReferenceEntry {
                    text,
                    card,
                    orientation,
                })
            })
            .collect()
    }

    /// sqlite-vec version string, for diagnostics.
    pub fn sqlite_vec_version(&self) -> Result<String> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))?;
        Ok(conn.query_row("SELECT vec_version()", [], |r| r.get(0))?)
    }
}
