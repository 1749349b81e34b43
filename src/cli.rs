use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use legalseg::{DocumentType, SegmenterConfig};

#[derive(Parser, Debug)]
#[command(
    name = "legalseg",
    version,
    about = "Structure-aware segmentation of Vietnamese legal documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse, chunk and validate a cleaned text file.
    Segment(SegmentArgs),
    /// Print the parsed hierarchy.
    Outline(OutlineArgs),
    /// Check a chunk record file against its original text.
    Validate(ValidateArgs),
    /// Segment a document and store it in the local SQLite index.
    Ingest(IngestArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Cleaned UTF-8 text of one document.
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = DocumentType::Law)]
    pub doc_type: DocumentType,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub year: Option<String>,

    #[arg(long)]
    pub doc_id: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ChunkingArgs {
    /// JSON file with segmenter settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub min_chars: Option<usize>,

    #[arg(long)]
    pub max_chars: Option<usize>,

    #[arg(long)]
    pub token_limit: Option<usize>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub min_coverage: Option<f64>,

    #[arg(long)]
    pub max_duplication: Option<f64>,
}

impl ChunkingArgs {
    /// Flags win over environment, file and defaults.
    pub fn resolve(&self) -> Result<SegmenterConfig> {
        let mut config = SegmenterConfig::load(self.config.as_deref())?;
        if let Some(value) = self.min_chars {
            config.min_chars = value;
        }
        if let Some(value) = self.max_chars {
            config.max_chars = value;
        }
        if let Some(value) = self.token_limit {
            config.token_limit = Some(value);
        }
        if let Some(value) = &self.model {
            config.model_name = value.clone();
        }
        if let Some(value) = self.min_coverage {
            config.min_coverage = value;
        }
        if let Some(value) = self.max_duplication {
            config.max_duplication = value;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct SegmentArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    #[command(flatten)]
    pub chunking: ChunkingArgs,

    #[arg(long, default_value = ".cache/legalseg")]
    pub cache_root: PathBuf,

    /// Defaults to `<cache_root>/segments`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Exit with an error when the integrity report is invalid.
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OutlineArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = DocumentType::Law)]
    pub doc_type: DocumentType,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Original cleaned text.
    #[arg(long)]
    pub input: PathBuf,

    /// JSON array of chunk records, as written by `segment`.
    #[arg(long)]
    pub chunks: PathBuf,

    /// Parse the original with this document type to enable the structure check.
    #[arg(long, value_enum)]
    pub doc_type: Option<DocumentType>,

    /// Title and id the records are expected to carry, as given to `segment`.
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub doc_id: Option<String>,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub min_coverage: Option<f64>,

    #[arg(long)]
    pub max_duplication: Option<f64>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub document: DocumentArgs,

    #[command(flatten)]
    pub chunking: ChunkingArgs,

    #[arg(long, default_value = ".cache/legalseg")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// Store chunks even when the integrity report is invalid.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/legalseg")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
