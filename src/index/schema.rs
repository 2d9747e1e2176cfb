//! SQL DDL for the similarity index.
//!
//! `entries` holds the reference texts, `entries_vec` (vec0) their embeddings,
//! and `index_meta` the build metadata. The vec0 column width is fixed per
//! build, so its DDL is generated from the embedding dimension.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    card TEXT NOT NULL,
    orientation TEXT NOT NULL CHECK(orientation IN ('upright','reversed')),
    text TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_card ON entries(card);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

fn vec_table_sql(dim: usize) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS entries_vec USING vec0(
    id TEXT PRIMARY KEY,
    embedding FLOAT[{dim}]
);"
    )
}

/// Create all index tables for vectors of `dim` dimensions. Idempotent.
pub fn init_schema(conn: &Connection, dim: usize) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(&vec_table_sql(dim))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::index::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"entries".to_string()));
        assert!(tables.contains(&"entries_vec".to_string()));
        assert!(tables.contains(&"index_meta".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        crate::index::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();
        init_schema(&conn, 8).unwrap();
    }

    #[test]
    fn orientation_is_constrained() {
        crate::index::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn, 8).unwrap();
        let result = conn.execute(
            "INSERT INTO entries (id, position, card, orientation, text) VALUES ('a', 0, '愚者', 'sideways', 'x')",
            [],
        );
        assert!(result.is_err());
    }
}
