use legalseg::validator::CheckSummary;
use legalseg::{SegmentationSummary, SegmenterConfig};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TokenizerInfo {
    pub model_name: String,
    pub max_tokens: usize,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentPaths {
    pub input_path: String,
    pub chunks_path: String,
    pub report_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input_sha256: String,
    pub is_valid: bool,
    pub config: SegmenterConfig,
    pub tokenizer: TokenizerInfo,
    pub paths: SegmentPaths,
    pub summary: SegmentationSummary,
    pub checks: CheckSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub input_path: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestCounts {
    pub chunks_inserted: usize,
    pub chunks_replaced: usize,
    pub docs_total: i64,
    pub chunks_total: i64,
    pub reports_total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub doc_id: String,
    pub is_valid: bool,
    pub forced: bool,
    pub tokenizer: TokenizerInfo,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub warnings: Vec<String>,
}
