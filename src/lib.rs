//! Structure-aware segmentation of Vietnamese legal documents.
//!
//! Cleaned statute text is parsed into a Part/Chapter/Section/Article/Clause/Point
//! tree, cut into size- and token-bounded chunks, mapped into schema-specific
//! records and checked for coverage, duplication and marker loss.

pub mod chunker;
pub mod config;
pub mod mapper;
pub mod parser;
pub mod patterns;
pub mod pipeline;
pub mod tokens;
pub mod util;
pub mod validator;

pub use chunker::{Chunk, ChunkerConfig, OptimalChunker, QualityFlags, UnitAnchors};
pub use config::SegmenterConfig;
pub use mapper::{MetadataMapper, SourceMetadata};
pub use parser::{NodeId, ParsedDocument, StructureNode, StructureParser, StructureTree};
pub use patterns::{DocumentType, NodeKind, PatternRule, PatternTable};
pub use pipeline::{SegmentationOutput, SegmentationSummary, segment_document};
pub use tokens::TokenCounter;
pub use validator::{
    ChunkRecord, IntegrityReport, IntegrityValidator, SchemaVariant, ValidationThresholds,
};
