use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::chunker::Chunk;
use crate::patterns::DocumentType;
use crate::util::sanitize_ref_for_id;
use crate::validator::{ChunkRecord, SchemaVariant};

/// Caller-supplied document facts, passed through into every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub doc_id: Option<String>,
}

impl SourceMetadata {
    pub fn from_path(path: &Path) -> Self {
        Self {
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            ..Self::default()
        }
    }

    /// Key used as the chunk id prefix: explicit id, then file stem, then title.
    pub fn doc_key(&self) -> String {
        let candidate = self
            .doc_id
            .clone()
            .or_else(|| {
                self.filename.as_deref().map(|name| {
                    Path::new(name)
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_else(|| name.to_string())
                })
            })
            .or_else(|| self.title.clone())
            .unwrap_or_default();

        match sanitize_ref_for_id(&candidate) {
            key if key.is_empty() => "doc".to_string(),
            key => key,
        }
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.filename.clone())
            .unwrap_or_else(|| self.doc_key())
    }
}

pub fn schema_for(doc_type: DocumentType) -> SchemaVariant {
    match doc_type {
        DocumentType::Law => SchemaVariant::Law,
        DocumentType::Decree | DocumentType::Circular | DocumentType::Decision => {
            SchemaVariant::Decree
        }
    }
}

/// Folds chunks into flat persistence records for the schema of one
/// document type.
#[derive(Debug, Clone)]
pub struct MetadataMapper {
    doc_type: DocumentType,
    schema: SchemaVariant,
    source: SourceMetadata,
}

impl MetadataMapper {
    pub fn new(doc_type: DocumentType, source: SourceMetadata) -> Self {
        Self {
            doc_type,
            schema: schema_for(doc_type),
            source,
        }
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    pub fn map(&self, chunks: &[Chunk]) -> Vec<ChunkRecord> {
        let total = chunks.len();
        chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let metadata = match self.schema {
                    SchemaVariant::Law => self.law_fields(chunk),
                    SchemaVariant::Decree => self.decree_fields(chunk, index, total),
                    SchemaVariant::Unknown => Map::new(),
                };
                ChunkRecord {
                    chunk_id: chunk.id.clone(),
                    content: chunk.text.clone(),
                    hierarchy: chunk.hierarchy.clone(),
                    metadata,
                }
            })
            .collect()
    }

    fn law_fields(&self, chunk: &Chunk) -> Map<String, Value> {
        let anchors = &chunk.anchors;
        object(json!({
            "document_type": self.doc_type.as_str(),
            "document_title": self.source.display_title(),
            "filename": self.source.filename,
            "year": self.source.year,
            "phan": anchors.part,
            "chuong": anchors.chapter,
            "muc": anchors.section,
            "dieu": anchors.article,
            "khoan": anchors.clause,
            "diem": anchors.point,
            "hierarchy": chunk.hierarchy.join(" > "),
            "level": chunk.level,
            "char_count": chunk.char_count,
            "token_count": chunk.token_count,
            "parent_id": chunk.parent_id,
            "merged_with": chunk.merged_with,
            "source_line": chunk.source_line,
            "tags": chunk.quality.tags,
            "readability_score": chunk.quality.readability_score,
            "over_token_limit": chunk.quality.over_token_limit,
            "has_clause": chunk.quality.has_clause,
            "has_point": chunk.quality.has_point,
            "split_exhausted": chunk.quality.split_exhausted,
            "merge_skipped": chunk.quality.merge_skipped,
        }))
    }

    fn decree_fields(&self, chunk: &Chunk, index: usize, total: usize) -> Map<String, Value> {
        let anchors = &chunk.anchors;
        object(json!({
            "doc_id": self.source.doc_key(),
            "doc_type": self.doc_type.as_str(),
            "doc_title": self.source.display_title(),
            "year": self.source.year,
            "hierarchy_path": chunk.hierarchy,
            "chunk_index": index,
            "total_chunks": total,
            "level": chunk.level,
            "chapter": anchors.chapter,
            "section": anchors.section,
            "article": anchors.article,
            "clause": anchors.clause,
            "point": anchors.point,
            "char_count": chunk.char_count,
            "token_count": chunk.token_count,
            "parent_id": chunk.parent_id,
            "merged_with": chunk.merged_with,
            "tags": chunk.quality.tags,
            "over_token_limit": chunk.quality.over_token_limit,
        }))
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
