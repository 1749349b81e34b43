use anyhow::{Context, Result};
use legalseg::SegmentationOutput;
use legalseg::util::{now_utc_string, sha256_hex};
use rusqlite::{Connection, params};

pub(crate) struct DocumentRow<'a> {
    pub filename: Option<&'a str>,
    pub title: Option<&'a str>,
    pub year: Option<&'a str>,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct StoreStats {
    pub chunks_inserted: usize,
    pub chunks_replaced: usize,
}

/// Replaces every stored chunk of the document and appends the run's report.
pub(crate) fn store_document(
    connection: &mut Connection,
    document: &DocumentRow<'_>,
    output: &SegmentationOutput,
    run_id: &str,
) -> Result<StoreStats> {
    let now = now_utc_string();
    let tx = connection.transaction()?;

    tx.execute(
        "
        INSERT INTO documents(doc_id, filename, title, doc_type, year, sha256, char_count, ingested_at)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(doc_id) DO UPDATE SET
          filename=excluded.filename,
          title=excluded.title,
          doc_type=excluded.doc_type,
          year=excluded.year,
          sha256=excluded.sha256,
          char_count=excluded.char_count,
          ingested_at=excluded.ingested_at
        ",
        params![
            &output.doc_key,
            document.filename,
            document.title,
            output.doc_type.as_str(),
            document.year,
            sha256_hex(document.text),
            document.text.chars().count() as i64,
            &now
        ],
    )
    .with_context(|| format!("failed to upsert document {}", output.doc_key))?;

    let chunks_replaced = tx.execute("DELETE FROM chunks WHERE doc_id = ?1", [&output.doc_key])?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO chunks(
              chunk_id, doc_id, chunk_seq, level, hierarchy, parent_id, text,
              char_count, token_count, over_token_limit, metadata_json, source_hash
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )?;

        for (seq, (chunk, record)) in output.chunks.iter().zip(output.records.iter()).enumerate() {
            let metadata_json = serde_json::to_string(&record.metadata)
                .with_context(|| format!("failed to serialize metadata for {}", chunk.id))?;
            statement
                .execute(params![
                    &chunk.id,
                    &output.doc_key,
                    seq as i64,
                    &chunk.level,
                    chunk.hierarchy.join(" > "),
                    chunk.parent_id.as_deref(),
                    &record.content,
                    chunk.char_count as i64,
                    chunk.token_count as i64,
                    chunk.quality.over_token_limit,
                    metadata_json,
                    sha256_hex(&record.content)
                ])
                .with_context(|| format!("failed to insert chunk {}", chunk.id))?;
        }
    }

    let report_json =
        serde_json::to_string(&output.report).context("failed to serialize integrity report")?;
    tx.execute(
        "
        INSERT INTO integrity_reports(
          doc_id, run_id, is_valid, coverage_percentage, duplication_percentage, report_json, created_at
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(doc_id, run_id) DO UPDATE SET
          is_valid=excluded.is_valid,
          coverage_percentage=excluded.coverage_percentage,
          duplication_percentage=excluded.duplication_percentage,
          report_json=excluded.report_json,
          created_at=excluded.created_at
        ",
        params![
            &output.doc_key,
            run_id,
            output.report.is_valid,
            output.report.coverage_percentage,
            output.report.duplication_percentage,
            report_json,
            &now
        ],
    )
    .context("failed to insert integrity report")?;

    tx.commit()?;

    Ok(StoreStats {
        chunks_inserted: output.chunks.len(),
        chunks_replaced,
    })
}
