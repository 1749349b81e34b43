use anyhow::{Context, Result, bail};
use chrono::Utc;
use legalseg::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};
use legalseg::{TokenCounter, segment_document};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::IngestArgs;
use crate::commands::{load_document, tokenizer_info};
use crate::model::{IngestCounts, IngestPaths, IngestRunManifest};

mod db_setup;
mod store;

use db_setup::{DB_SCHEMA_VERSION, configure_connection, count_rows, ensure_schema};
use store::{DocumentRow, store_document};

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("ingest-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join("legalseg_index.sqlite"));

    let config = args.chunking.resolve()?;
    let (text, source) = load_document(&args.document)?;
    let counter = TokenCounter::for_model(&config.model_name)?;

    info!(
        input = %args.document.input.display(),
        db_path = %db_path.display(),
        run_id = %run_id,
        "starting ingest"
    );

    let output = segment_document(&text, args.document.doc_type, &source, &config, &counter)?;
    eprint!("{}", output.report);

    if !output.report.is_valid {
        if !args.force {
            bail!(
                "refusing to ingest {}: integrity report invalid ({}); rerun with --force to store anyway",
                args.document.input.display(),
                output.report.errors.join("; ")
            );
        }
        warn!(doc_id = %output.doc_key, "storing document with invalid integrity report");
    }

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let document = DocumentRow {
        filename: source.filename.as_deref(),
        title: source.title.as_deref(),
        year: source.year.as_deref(),
        text: &text,
    };
    let stats = store_document(&mut connection, &document, &output, &run_id)?;

    let counts = IngestCounts {
        chunks_inserted: stats.chunks_inserted,
        chunks_replaced: stats.chunks_replaced,
        docs_total: count_rows(&connection, "SELECT COUNT(*) FROM documents")?,
        chunks_total: count_rows(&connection, "SELECT COUNT(*) FROM chunks")?,
        reports_total: count_rows(&connection, "SELECT COUNT(*) FROM integrity_reports")?,
    };

    let manifest_path = manifest_dir.join(format!(
        "ingest_run_{}.json",
        utc_compact_string(started_ts)
    ));
    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        doc_id: output.doc_key.clone(),
        is_valid: output.report.is_valid,
        forced: args.force && !output.report.is_valid,
        tokenizer: tokenizer_info(&counter),
        paths: IngestPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            input_path: args.document.input.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts: counts.clone(),
        warnings: output
            .parsed
            .warnings
            .iter()
            .chain(output.report.warnings.iter())
            .cloned()
            .collect(),
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        doc_id = %output.doc_key,
        chunks_inserted = counts.chunks_inserted,
        chunks_replaced = counts.chunks_replaced,
        docs_total = counts.docs_total,
        chunks_total = counts.chunks_total,
        manifest = %manifest_path.display(),
        "ingest complete"
    );

    Ok(())
}
