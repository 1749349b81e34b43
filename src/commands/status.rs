use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};

use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join("legalseg_index.sqlite"));

    info!(cache_root = %args.cache_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    let schema_version = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .unwrap_or(None)
        .unwrap_or_default();
    let docs_count = query_count(&conn, "SELECT COUNT(*) FROM documents").unwrap_or(0);
    let chunks_count = query_count(&conn, "SELECT COUNT(*) FROM chunks").unwrap_or(0);
    let invalid_count = query_count(
        &conn,
        "SELECT COUNT(*) FROM integrity_reports r
         WHERE r.created_at = (SELECT MAX(created_at) FROM integrity_reports WHERE doc_id = r.doc_id)
           AND r.is_valid = 0",
    )
    .unwrap_or(0);
    let over_limit_count =
        query_count(&conn, "SELECT COUNT(*) FROM chunks WHERE over_token_limit = 1").unwrap_or(0);

    info!(
        path = %db_path.display(),
        schema_version = %schema_version,
        documents = docs_count,
        chunks = chunks_count,
        invalid_documents = invalid_count,
        over_token_limit = over_limit_count,
        "database status"
    );

    Ok(())
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
