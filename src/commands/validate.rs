use std::collections::BTreeMap;

use anyhow::{Context, Result};
use legalseg::util::{read_text_file, write_json_pretty};
use legalseg::{
    ChunkRecord, IntegrityValidator, PatternTable, SegmenterConfig, SourceMetadata,
    StructureParser,
};
use tracing::info;

use crate::cli::ValidateArgs;

pub fn run(args: ValidateArgs) -> Result<()> {
    let mut config = SegmenterConfig::load(args.config.as_deref())?;
    if let Some(value) = args.min_coverage {
        config.min_coverage = value;
    }
    if let Some(value) = args.max_duplication {
        config.max_duplication = value;
    }
    config.validate()?;

    let original = read_text_file(&args.input)?;
    let source = SourceMetadata {
        title: args.title.clone(),
        doc_id: args.doc_id.clone(),
        ..SourceMetadata::from_path(&args.input)
    };
    let raw = read_text_file(&args.chunks)?;
    let records: Vec<ChunkRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse chunk records {}", args.chunks.display()))?;

    let parsed = match args.doc_type {
        Some(doc_type) => {
            let table = PatternTable::for_document_type(doc_type)?;
            Some(StructureParser::new(&table).parse(&original, &BTreeMap::new()))
        }
        None => None,
    };

    let validator = IntegrityValidator::new(config.thresholds())?;
    let report = validator.validate(
        &original,
        &records,
        parsed.as_ref().map(|parsed| &parsed.tree),
        Some(&source),
    );

    print!("{report}");
    if let Some(path) = &args.report_path {
        write_json_pretty(path, &report)?;
    }

    info!(
        chunks = records.len(),
        schema = ?report.schema_variant,
        is_valid = report.is_valid,
        "validation complete"
    );

    Ok(())
}
