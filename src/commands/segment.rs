use anyhow::{Result, bail};
use chrono::Utc;
use legalseg::util::{
    ensure_directory, now_utc_string, sha256_hex, utc_compact_string, write_json_pretty,
};
use legalseg::{TokenCounter, segment_document};
use tracing::{info, warn};

use crate::cli::SegmentArgs;
use crate::commands::{load_document, tokenizer_info};
use crate::model::{SegmentPaths, SegmentRunManifest};

pub fn run(args: SegmentArgs) -> Result<()> {
    let started_ts = Utc::now();
    let run_id = format!("segment-{}", utc_compact_string(started_ts));

    let config = args.chunking.resolve()?;
    let (text, source) = load_document(&args.document)?;
    let counter = TokenCounter::for_model(&config.model_name)?;

    info!(
        input = %args.document.input.display(),
        doc_type = %args.document.doc_type,
        model = %counter.model_name(),
        "starting segmentation"
    );

    let output = segment_document(&text, args.document.doc_type, &source, &config, &counter)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.cache_root.join("segments"));
    ensure_directory(&output_dir)?;
    let chunks_path = output_dir.join(format!("{}.chunks.json", output.doc_key));
    let report_path = output_dir.join(format!("{}.integrity.json", output.doc_key));
    let manifest_path = output_dir.join(format!("{}.manifest.json", output.doc_key));

    write_json_pretty(&chunks_path, &output.records)?;
    write_json_pretty(&report_path, &output.report)?;

    let manifest = SegmentRunManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        input_sha256: sha256_hex(&text),
        is_valid: output.report.is_valid,
        config: config.clone(),
        tokenizer: tokenizer_info(&counter),
        paths: SegmentPaths {
            input_path: args.document.input.display().to_string(),
            chunks_path: chunks_path.display().to_string(),
            report_path: report_path.display().to_string(),
        },
        summary: output.summary(),
        checks: output.report.summary(),
    };
    write_json_pretty(&manifest_path, &manifest)?;

    for warning in &output.parsed.warnings {
        warn!(warning = %warning, "parser warning");
    }
    eprint!("{}", output.report);

    info!(
        chunks = output.chunks.len(),
        coverage_percentage = output.report.coverage_percentage,
        is_valid = output.report.is_valid,
        chunks_path = %chunks_path.display(),
        "segmentation complete"
    );

    if args.strict && !output.report.is_valid {
        bail!(
            "integrity report invalid for {}: {}",
            args.document.input.display(),
            output.report.errors.join("; ")
        );
    }

    Ok(())
}
