//! Build metadata stored alongside the vectors.
//!
//! An index is never migrated in place: when [`INDEX_SCHEMA_VERSION`] changes,
//! the index has to be rebuilt.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

/// The index layout the current binary reads and writes.
pub const INDEX_SCHEMA_VERSION: u32 = 1;

/// Everything recorded about one index build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexMeta {
    pub schema_version: u32,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub entry_count: usize,
    /// RFC 3339 timestamp.
    pub built_at: String,
}

pub fn get_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM index_meta WHERE key = ?1",
        [key],
        |row| row.get::<_, String>(0),
    )
    .optional()
}

pub fn set_value(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO index_meta (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

fn require(conn: &Connection, key: &str) -> Result<String> {
    get_value(conn, key)?
        .with_context(|| format!("index metadata is missing '{key}'; rebuild with `tarot build-index`"))
}

fn require_number<T: std::str::FromStr>(conn: &Connection, key: &str) -> Result<T> {
    let raw = require(conn, key)?;
    raw.parse::<T>()
        .map_err(|_| anyhow::anyhow!("index metadata '{key}' is not a number: {raw}"))
}

/// Read and validate the metadata of an existing index.
pub fn read_meta(conn: &Connection) -> Result<IndexMeta> {
    let schema_version: u32 = require_number(conn, "schema_version")?;
    anyhow::ensure!(
        schema_version == INDEX_SCHEMA_VERSION,
        "index schema version {schema_version} is not supported (expected {INDEX_SCHEMA_VERSION}); rebuild with `tarot build-index --force`"
    );

    Ok(IndexMeta {
        schema_version,
        embedding_provider: require(conn, "embedding_provider")?,
        embedding_model: require(conn, "embedding_model")?,
        embedding_dim: require_number(conn, "embedding_dim")?,
        entry_count: require_number(conn, "entry_count")?,
        built_at: require(conn, "built_at")?,
    })
}

pub fn write_meta(conn: &Connection, meta: &IndexMeta) -> rusqlite::Result<()> {
    set_value(conn, "schema_version", &meta.schema_version.to_string())?;
    set_value(conn, "embedding_provider", &meta.embedding_provider)?;
    set_value(conn, "embedding_model", &meta.embedding_model)?;
    set_value(conn, "embedding_dim", &meta.embedding_dim.to_string())?;
    set_value(conn, "entry_count", &meta.entry_count.to_string())?;
    set_value(conn, "built_at", &meta.built_at)?;
    Ok(())
}
