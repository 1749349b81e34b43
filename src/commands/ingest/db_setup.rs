use anyhow::{Context, Result};
use legalseg::util::now_utc_string;
use rusqlite::Connection;

pub(crate) const DB_SCHEMA_VERSION: &str = "0.1.0";

pub(crate) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign_keys")?;
    Ok(())
}

pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          doc_id TEXT PRIMARY KEY,
          filename TEXT,
          title TEXT,
          doc_type TEXT NOT NULL,
          year TEXT,
          sha256 TEXT NOT NULL,
          char_count INTEGER NOT NULL,
          ingested_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
          chunk_id TEXT PRIMARY KEY,
          doc_id TEXT NOT NULL,
          chunk_seq INTEGER NOT NULL,
          level TEXT NOT NULL,
          hierarchy TEXT,
          parent_id TEXT,
          text TEXT NOT NULL,
          char_count INTEGER NOT NULL,
          token_count INTEGER NOT NULL,
          over_token_limit INTEGER NOT NULL DEFAULT 0,
          metadata_json TEXT NOT NULL,
          source_hash TEXT NOT NULL,
          FOREIGN KEY(doc_id) REFERENCES documents(doc_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS integrity_reports (
          doc_id TEXT NOT NULL,
          run_id TEXT NOT NULL,
          is_valid INTEGER NOT NULL,
          coverage_percentage REAL NOT NULL,
          duplication_percentage REAL NOT NULL,
          report_json TEXT NOT NULL,
          created_at TEXT NOT NULL,
          PRIMARY KEY (doc_id, run_id),
          FOREIGN KEY(doc_id) REFERENCES documents(doc_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_doc_seq ON chunks(doc_id, chunk_seq);
        CREATE INDEX IF NOT EXISTS idx_reports_doc ON integrity_reports(doc_id, created_at);
        ",
        )
        .context("failed to create legalseg schema")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

pub(crate) fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count rows: {sql}"))?;
    Ok(count)
}
