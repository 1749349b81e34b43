use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::mapper::SourceMetadata;
use crate::parser::StructureTree;
use crate::util::sha256_hex;

mod report;

pub use report::{CheckResult, CheckSummary, IntegrityCheck, IntegrityReport};

pub const LAW_REQUIRED_FIELDS: &[&str] = &[
    "document_type",
    "document_title",
    "hierarchy",
    "level",
    "char_count",
    "token_count",
];

pub const DECREE_REQUIRED_FIELDS: &[&str] = &[
    "doc_id",
    "doc_type",
    "hierarchy_path",
    "chunk_index",
    "total_chunks",
    "level",
];

/// Persistence record as handed to the validator: content plus a
/// schema-specific metadata bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub content: String,
    #[serde(default)]
    pub hierarchy: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ChunkRecord {
    fn has_hierarchy(&self) -> bool {
        if !self.hierarchy.is_empty() {
            return true;
        }
        ["hierarchy", "hierarchy_path"].iter().any(|key| {
            match self.metadata.get(*key) {
                Some(Value::String(value)) => !value.trim().is_empty(),
                Some(Value::Array(values)) => !values.is_empty(),
                _ => false,
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    Law,
    Decree,
    Unknown,
}

impl SchemaVariant {
    /// `doc_id` only appears in Decree-style records.
    pub fn detect(records: &[ChunkRecord]) -> Self {
        match records.first() {
            None => SchemaVariant::Unknown,
            Some(record) if record.metadata.contains_key("doc_id") => SchemaVariant::Decree,
            Some(_) => SchemaVariant::Law,
        }
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            SchemaVariant::Law => LAW_REQUIRED_FIELDS,
            SchemaVariant::Decree => DECREE_REQUIRED_FIELDS,
            SchemaVariant::Unknown => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    pub min_coverage: f64,
    pub max_duplication: f64,
    pub max_missing_ratio: f64,
    pub min_metadata_completeness: f64,
    pub max_poor_quality_ratio: f64,
    pub min_chunk_chars: usize,
    pub max_chunk_chars: usize,
    pub max_blank_run: usize,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            min_coverage: 0.80,
            max_duplication: 0.05,
            max_missing_ratio: 0.10,
            min_metadata_completeness: 0.90,
            max_poor_quality_ratio: 0.10,
            min_chunk_chars: 20,
            max_chunk_chars: 10_000,
            max_blank_run: 3,
        }
    }
}

#[derive(Debug, Default)]
struct CheckOutcome {
    passed: bool,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl CheckOutcome {
    fn passing() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    fn fail(&mut self, message: String) {
        self.passed = false;
        self.errors.push(message);
    }

    fn result(&self, hard: bool) -> CheckResult {
        match (self.passed, hard) {
            (false, true) => CheckResult::Fail,
            (false, false) => CheckResult::Warn,
            (true, _) if !self.warnings.is_empty() => CheckResult::Warn,
            (true, _) => CheckResult::Pass,
        }
    }
}

/// Post-hoc integrity checks over produced chunk records. Never fails; every
/// finding is returned in the report.
#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    thresholds: ValidationThresholds,
    markers: Vec<(Regex, &'static str)>,
}

impl IntegrityValidator {
    pub fn new(thresholds: ValidationThresholds) -> Result<Self> {
        let markers = vec![
            (
                Regex::new(r"(?i:chương)\s+([IVXLCDM]+|\d+)\b")
                    .context("failed to compile chapter marker regex")?,
                "Chương",
            ),
            (
                Regex::new(r"(?i:điều)\s+(\d+[a-zđ]?)")
                    .context("failed to compile article marker regex")?,
                "Điều",
            ),
            (
                Regex::new(r"(?i:khoản)\s+(\d+)")
                    .context("failed to compile clause marker regex")?,
                "Khoản",
            ),
        ];

        Ok(Self {
            thresholds,
            markers,
        })
    }

    pub fn thresholds(&self) -> &ValidationThresholds {
        &self.thresholds
    }

    pub fn validate(
        &self,
        original_text: &str,
        records: &[ChunkRecord],
        tree: Option<&StructureTree>,
        source: Option<&SourceMetadata>,
    ) -> IntegrityReport {
        let original_char_count = original_text.chars().count();
        let processed_char_count = records
            .iter()
            .map(|record| record.content.chars().count())
            .sum::<usize>();

        let (coverage_percentage, coverage) =
            self.check_coverage(original_char_count, processed_char_count);
        let (duplication_percentage, duplicate_chunk_ids, duplication) =
            self.check_duplication(records);
        let (missing_sections, content_loss) = self.check_content_loss(original_text, records);
        let structure = check_structure(records, tree);
        let schema_variant = SchemaVariant::detect(records);
        let mut metadata = self.check_metadata(schema_variant, records);
        if let Some(source) = source {
            check_source_agreement(schema_variant, records, source, &mut metadata);
        }
        let quality = self.check_quality(records);

        let named = [
            ("coverage", true, &coverage),
            ("duplication", true, &duplication),
            ("content_loss", true, &content_loss),
            ("structure", false, &structure),
            ("metadata", true, &metadata),
            ("quality", true, &quality),
        ];

        let checks = named
            .iter()
            .map(|(name, hard, outcome)| IntegrityCheck {
                name: name.to_string(),
                result: outcome.result(*hard),
                hard: *hard,
            })
            .collect::<Vec<IntegrityCheck>>();
        let warnings = named
            .iter()
            .flat_map(|(_, _, outcome)| outcome.warnings.iter().cloned())
            .collect::<Vec<String>>();
        let errors = named
            .iter()
            .flat_map(|(_, _, outcome)| outcome.errors.iter().cloned())
            .collect::<Vec<String>>();

        let is_valid = named
            .iter()
            .filter(|(_, hard, _)| *hard)
            .all(|(_, _, outcome)| outcome.passed);

        debug!(
            chunks = records.len(),
            coverage_percentage,
            duplication_percentage,
            missing = missing_sections.len(),
            warnings = warnings.len(),
            errors = errors.len(),
            is_valid,
            "validated chunk integrity"
        );

        IntegrityReport {
            is_valid,
            coverage_ok: coverage.passed,
            duplication_ok: duplication.passed,
            content_loss_ok: content_loss.passed,
            structure_ok: structure.passed,
            metadata_ok: metadata.passed,
            quality_ok: quality.passed,
            original_char_count,
            processed_char_count,
            coverage_percentage,
            duplication_percentage,
            schema_variant,
            total_chunks: records.len(),
            checks,
            missing_sections,
            duplicate_chunk_ids,
            warnings,
            errors,
        }
    }

    fn check_coverage(&self, original: usize, processed: usize) -> (f64, CheckOutcome) {
        let mut outcome = CheckOutcome::passing();
        if original == 0 {
            return (100.0, outcome);
        }

        let ratio = (processed as f64 / original as f64).min(1.0);
        let percentage = round2(ratio * 100.0);
        if ratio < self.thresholds.min_coverage {
            outcome.fail(format!(
                "coverage {:.2}% below minimum {:.2}%",
                percentage,
                self.thresholds.min_coverage * 100.0
            ));
        }

        (percentage, outcome)
    }

    fn check_duplication(&self, records: &[ChunkRecord]) -> (f64, Vec<String>, CheckOutcome) {
        let mut outcome = CheckOutcome::passing();
        if records.is_empty() {
            return (0.0, Vec::new(), outcome);
        }

        let hashes = records
            .iter()
            .map(|record| sha256_hex(&record.content.trim().to_lowercase()))
            .collect::<Vec<String>>();
        let mut occurrences = HashMap::<&str, usize>::new();
        for hash in &hashes {
            *occurrences.entry(hash.as_str()).or_insert(0) += 1;
        }

        let duplicate_chunk_ids = records
            .iter()
            .zip(hashes.iter())
            .filter(|(_, hash)| occurrences.get(hash.as_str()).copied().unwrap_or(0) > 1)
            .map(|(record, _)| record.chunk_id.clone())
            .collect::<Vec<String>>();

        let rate = duplicate_chunk_ids.len() as f64 / records.len() as f64;
        let percentage = round2(rate * 100.0);
        if rate > self.thresholds.max_duplication {
            outcome.fail(format!(
                "duplication rate {:.1}% exceeds maximum {:.1}% ({} of {} chunks)",
                percentage,
                self.thresholds.max_duplication * 100.0,
                duplicate_chunk_ids.len(),
                records.len()
            ));
        } else if rate > 0.0 {
            outcome.warnings.push(format!(
                "duplication rate {:.1}% ({} of {} chunks)",
                percentage,
                duplicate_chunk_ids.len(),
                records.len()
            ));
        }

        (percentage, duplicate_chunk_ids, outcome)
    }

    /// Canonical markers such as `Điều 5` in order of first appearance.
    pub fn extract_markers(&self, text: &str) -> Vec<String> {
        let mut found = Vec::<(usize, String)>::new();
        for (regex, label) in &self.markers {
            for captures in regex.captures_iter(text) {
                let (Some(whole), Some(number)) = (captures.get(0), captures.get(1)) else {
                    continue;
                };
                found.push((whole.start(), format!("{} {}", label, number.as_str())));
            }
        }
        found.sort_by_key(|(position, _)| *position);

        let mut seen = HashSet::<String>::new();
        found
            .into_iter()
            .filter_map(|(_, marker)| seen.insert(marker.clone()).then_some(marker))
            .collect()
    }

    fn check_content_loss(
        &self,
        original_text: &str,
        records: &[ChunkRecord],
    ) -> (Vec<String>, CheckOutcome) {
        let mut outcome = CheckOutcome::passing();
        let original_markers = self.extract_markers(original_text);
        if original_markers.is_empty() {
            return (Vec::new(), outcome);
        }

        let combined = records
            .iter()
            .map(|record| record.content.as_str())
            .collect::<Vec<&str>>()
            .join("\n");
        let chunk_markers = self
            .extract_markers(&combined)
            .into_iter()
            .collect::<HashSet<String>>();

        let missing = original_markers
            .iter()
            .filter(|marker| !chunk_markers.contains(*marker))
            .cloned()
            .collect::<Vec<String>>();
        if missing.is_empty() {
            return (missing, outcome);
        }

        let ratio = missing.len() as f64 / original_markers.len() as f64;
        let message = format!(
            "{} of {} structural markers missing from chunks ({:.1}%)",
            missing.len(),
            original_markers.len(),
            ratio * 100.0
        );
        if ratio > self.thresholds.max_missing_ratio {
            outcome.fail(message);
        } else {
            outcome.warnings.push(message);
        }

        (missing, outcome)
    }

    fn check_metadata(&self, variant: SchemaVariant, records: &[ChunkRecord]) -> CheckOutcome {
        let mut outcome = CheckOutcome::passing();
        let required = variant.required_fields();
        if records.is_empty() || required.is_empty() {
            return outcome;
        }

        let incomplete = records
            .iter()
            .filter(|record| {
                required.iter().any(|field| {
                    record
                        .metadata
                        .get(*field)
                        .map(Value::is_null)
                        .unwrap_or(true)
                })
            })
            .map(|record| record.chunk_id.as_str())
            .collect::<Vec<&str>>();
        if incomplete.is_empty() {
            return outcome;
        }

        let completeness = 1.0 - incomplete.len() as f64 / records.len() as f64;
        let schema = match variant {
            SchemaVariant::Law => "law",
            SchemaVariant::Decree => "decree",
            SchemaVariant::Unknown => "unknown",
        };
        let message = format!(
            "{} of {} chunks missing required {} metadata fields ({:.1}% complete)",
            incomplete.len(),
            records.len(),
            schema,
            completeness * 100.0
        );
        if completeness < self.thresholds.min_metadata_completeness {
            outcome.fail(message);
        } else {
            outcome.warnings.push(message);
        }

        outcome
    }

    fn check_quality(&self, records: &[ChunkRecord]) -> CheckOutcome {
        let mut outcome = CheckOutcome::passing();
        if records.is_empty() {
            return outcome;
        }

        let mut flagged = Vec::<String>::new();
        for record in records {
            let chars = record.content.chars().count();
            if chars < self.thresholds.min_chunk_chars {
                flagged.push(format!("{} too short ({} chars)", record.chunk_id, chars));
            } else if chars > self.thresholds.max_chunk_chars {
                flagged.push(format!("{} too long ({} chars)", record.chunk_id, chars));
            } else if longest_blank_run(&record.content) > self.thresholds.max_blank_run {
                flagged.push(format!("{} has excessive blank lines", record.chunk_id));
            }
        }
        if flagged.is_empty() {
            return outcome;
        }

        let ratio = flagged.len() as f64 / records.len() as f64;
        outcome.warnings.extend(flagged.iter().cloned());
        if ratio > self.thresholds.max_poor_quality_ratio {
            outcome.fail(format!(
                "{} of {} chunks have quality issues ({:.1}%)",
                flagged.len(),
                records.len(),
                ratio * 100.0
            ));
        }

        outcome
    }
}

/// Records must name the document the caller says they came from.
fn check_source_agreement(
    variant: SchemaVariant,
    records: &[ChunkRecord],
    source: &SourceMetadata,
    outcome: &mut CheckOutcome,
) {
    let title = source.display_title();
    let doc_key = source.doc_key();
    let expected: Vec<(&str, &str)> = match variant {
        SchemaVariant::Law => vec![("document_title", title.as_str())],
        SchemaVariant::Decree => vec![("doc_title", title.as_str()), ("doc_id", doc_key.as_str())],
        SchemaVariant::Unknown => Vec::new(),
    };
    if expected.is_empty() {
        return;
    }

    let disagreeing = records
        .iter()
        .filter(|record| {
            expected.iter().any(|(field, value)| {
                record.metadata.get(*field).and_then(Value::as_str) != Some(*value)
            })
        })
        .count();
    if disagreeing > 0 {
        outcome.warnings.push(format!(
            "{} of {} chunks disagree with source metadata ({})",
            disagreeing,
            records.len(),
            expected
                .iter()
                .map(|(field, _)| *field)
                .collect::<Vec<&str>>()
                .join(", ")
        ));
    }
}

fn check_structure(records: &[ChunkRecord], tree: Option<&StructureTree>) -> CheckOutcome {
    let mut outcome = CheckOutcome::passing();
    let Some(tree) = tree else {
        return outcome;
    };
    if tree.len() <= 1 {
        return outcome;
    }

    if !records.iter().any(ChunkRecord::has_hierarchy) {
        outcome.passed = false;
        outcome.warnings.push(format!(
            "document has {} structural nodes but no chunk carries a hierarchy path",
            tree.len() - 1
        ));
    }

    outcome
}

fn longest_blank_run(text: &str) -> usize {
    let mut longest = 0usize;
    let mut current = 0usize;
    for line in text.split('\n') {
        if line.trim().is_empty() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
