use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::chunker::{Chunk, OptimalChunker};
use crate::config::SegmenterConfig;
use crate::mapper::{MetadataMapper, SourceMetadata};
use crate::parser::{ParsedDocument, StructureParser};
use crate::patterns::{DocumentType, PatternTable};
use crate::tokens::TokenCounter;
use crate::validator::{ChunkRecord, IntegrityReport, IntegrityValidator};

#[derive(Debug)]
pub struct SegmentationOutput {
    pub doc_type: DocumentType,
    pub doc_key: String,
    pub parsed: ParsedDocument,
    pub chunks: Vec<Chunk>,
    pub records: Vec<ChunkRecord>,
    pub report: IntegrityReport,
}

/// Counts persisted next to the chunk file.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationSummary {
    pub doc_type: DocumentType,
    pub doc_key: String,
    pub line_count: usize,
    pub node_counts: BTreeMap<String, usize>,
    pub chunk_count: usize,
    pub over_token_limit: usize,
    pub split_exhausted: usize,
    pub merge_skipped: usize,
    pub parse_warnings: Vec<String>,
}

impl SegmentationOutput {
    pub fn summary(&self) -> SegmentationSummary {
        let flagged = |pred: fn(&Chunk) -> bool| self.chunks.iter().filter(|c| pred(c)).count();
        SegmentationSummary {
            doc_type: self.doc_type,
            doc_key: self.doc_key.clone(),
            line_count: self.parsed.line_count,
            node_counts: self
                .parsed
                .counts
                .iter()
                .map(|(kind, count)| (kind.as_str().to_string(), *count))
                .collect(),
            chunk_count: self.chunks.len(),
            over_token_limit: flagged(|chunk| chunk.quality.over_token_limit),
            split_exhausted: flagged(|chunk| chunk.quality.split_exhausted),
            merge_skipped: flagged(|chunk| chunk.quality.merge_skipped),
            parse_warnings: self.parsed.warnings.clone(),
        }
    }
}

/// Parse, chunk, map and validate one cleaned document.
pub fn segment_document(
    text: &str,
    doc_type: DocumentType,
    source: &SourceMetadata,
    config: &SegmenterConfig,
    counter: &TokenCounter,
) -> Result<SegmentationOutput> {
    config.validate()?;

    let table = PatternTable::for_document_type(doc_type)?;
    let validator = IntegrityValidator::new(config.thresholds())?;
    let doc_key = source.doc_key();

    let mut parse_metadata = BTreeMap::new();
    parse_metadata.insert("doc_type".to_string(), doc_type.as_str().to_string());
    parse_metadata.insert("doc_key".to_string(), doc_key.clone());
    if let Some(title) = &source.title {
        parse_metadata.insert("title".to_string(), title.clone());
    }

    let parsed = StructureParser::new(&table).parse(text, &parse_metadata);
    let chunks = OptimalChunker::new(config.chunker_config(), &table, counter)
        .chunk(&parsed.tree, &doc_key);
    let records = MetadataMapper::new(doc_type, source.clone()).map(&chunks);
    let report = validator.validate(text, &records, Some(&parsed.tree), Some(source));

    info!(
        doc_type = %doc_type,
        doc_key = %doc_key,
        articles = parsed.count(crate::patterns::NodeKind::Article),
        chunk_count = chunks.len(),
        coverage_percentage = report.coverage_percentage,
        is_valid = report.is_valid,
        "segmented document"
    );

    Ok(SegmentationOutput {
        doc_type,
        doc_key,
        parsed,
        chunks,
        records,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::NodeKind;

    fn law_text() -> String {
        let body = "Cơ quan nhà nước có thẩm quyền quy định chi tiết việc thi hành, bảo đảm quyền và nghĩa vụ của tổ chức, cá nhân. ";
        (1..=3)
            .map(|n| format!("Điều {n}. Điều khoản thứ {n}\n{}\n", body.repeat(4)))
            .collect()
    }

    fn source() -> SourceMetadata {
        SourceMetadata {
            filename: Some("luat-mau.txt".to_string()),
            title: Some("Luật Mẫu".to_string()),
            year: Some("2024".to_string()),
            doc_id: None,
        }
    }

    #[test]
    fn three_article_law_segments_cleanly() {
        let counter = TokenCounter::estimating("test-model", 4096);
        let output = segment_document(
            &law_text(),
            DocumentType::Law,
            &source(),
            &SegmenterConfig::default(),
            &counter,
        )
        .expect("pipeline runs");

        assert_eq!(output.parsed.count(NodeKind::Article), 3);
        assert_eq!(output.chunks.len(), 3);
        assert_eq!(output.records.len(), 3);
        assert_eq!(output.chunks[0].id, "luat_mau_dieu_1");
        assert!(output.report.coverage_percentage >= 95.0, "{}", output.report);
        assert!(output.report.is_valid, "{}", output.report);
        assert!(
            output
                .report
                .warnings
                .iter()
                .all(|warning| !warning.contains("source metadata"))
        );

        let summary = output.summary();
        assert_eq!(summary.chunk_count, 3);
        assert_eq!(summary.node_counts.get("article"), Some(&3));
    }

    #[test]
    fn empty_chapter_between_chapters_loses_no_markers() {
        let body = "Cơ quan nhà nước có thẩm quyền quy định chi tiết việc thi hành, bảo đảm quyền và nghĩa vụ của tổ chức, cá nhân. ";
        let text = format!(
            "Chương I\nQUY ĐỊNH CHUNG\nĐiều 1. Phạm vi\n{body}{body}{body}\nĐiều 2. Đối tượng\n{body}{body}{body}\nChương II\nNHỮNG QUY ĐỊNH KHÁC\nChương III\nĐIỀU KHOẢN THI HÀNH\nĐiều 3. Hiệu lực\n{body}{body}{body}\n"
        );
        let counter = TokenCounter::estimating("test-model", 4096);
        let output = segment_document(
            &text,
            DocumentType::Law,
            &source(),
            &SegmenterConfig::default(),
            &counter,
        )
        .expect("pipeline runs");

        assert!(output.report.missing_sections.is_empty(), "{}", output.report);
        assert!(output.report.content_loss_ok);
        assert!(output.report.is_valid, "{}", output.report);
        assert!(
            output
                .chunks
                .iter()
                .any(|chunk| chunk.id == "luat_mau_chuong_ii_intro")
        );
    }

    #[test]
    fn decree_output_uses_decree_schema() {
        let counter = TokenCounter::estimating("test-model", 4096);
        let output = segment_document(
            &law_text(),
            DocumentType::Decree,
            &source(),
            &SegmenterConfig::default(),
            &counter,
        )
        .expect("pipeline runs");

        assert_eq!(
            output.report.schema_variant,
            crate::validator::SchemaVariant::Decree
        );
        assert!(output.report.metadata_ok);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let counter = TokenCounter::estimating("test-model", 4096);
        let run = || {
            segment_document(
                &law_text(),
                DocumentType::Law,
                &source(),
                &SegmenterConfig::default(),
                &counter,
            )
            .expect("pipeline runs")
        };
        let (first, second) = (run(), run());

        assert_eq!(first.chunks, second.chunks);
        assert_eq!(first.records, second.records);
        assert_eq!(first.report, second.report);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let counter = TokenCounter::estimating("test-model", 4096);
        let config = SegmenterConfig {
            min_chars: 5000,
            ..SegmenterConfig::default()
        };
        assert!(
            segment_document("Điều 1. A", DocumentType::Law, &source(), &config, &counter)
                .is_err()
        );
    }
}
