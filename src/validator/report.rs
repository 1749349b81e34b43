use std::fmt;

use serde::{Deserialize, Serialize};

use super::SchemaVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    Pass,
    Warn,
    Fail,
}

impl CheckResult {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckResult::Pass => "pass",
            CheckResult::Warn => "warn",
            CheckResult::Fail => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    pub name: String,
    pub result: CheckResult,
    /// Whether a failure of this check makes the document invalid.
    pub hard: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub total_checks: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub coverage_ok: bool,
    pub duplication_ok: bool,
    pub content_loss_ok: bool,
    pub structure_ok: bool,
    pub metadata_ok: bool,
    pub quality_ok: bool,
    pub original_char_count: usize,
    pub processed_char_count: usize,
    pub coverage_percentage: f64,
    pub duplication_percentage: f64,
    pub schema_variant: SchemaVariant,
    pub total_chunks: usize,
    pub checks: Vec<IntegrityCheck>,
    pub missing_sections: Vec<String>,
    pub duplicate_chunk_ids: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn summary(&self) -> CheckSummary {
        let count = |result: CheckResult| {
            self.checks
                .iter()
                .filter(|check| check.result == result)
                .count()
        };

        CheckSummary {
            total_checks: self.checks.len(),
            passed: count(CheckResult::Pass),
            warned: count(CheckResult::Warn),
            failed: count(CheckResult::Fail),
        }
    }
}

impl fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        let status = if self.is_valid { "VALID" } else { "INVALID" };

        writeln!(f, "Integrity report: {status}")?;
        writeln!(
            f,
            "Checks passed: {}/{} ({} with warnings, {} failed)",
            summary.passed + summary.warned,
            summary.total_checks,
            summary.warned,
            summary.failed
        )?;
        for check in &self.checks {
            writeln!(f, "  [{}] {}", check.result.as_str(), check.name)?;
        }
        writeln!(
            f,
            "Coverage: {:.2}% ({}/{} chars across {} chunks)",
            self.coverage_percentage,
            self.processed_char_count,
            self.original_char_count,
            self.total_chunks
        )?;

        if !self.missing_sections.is_empty() {
            writeln!(f, "Missing sections: {}", self.missing_sections.join(", "))?;
        }
        if !self.duplicate_chunk_ids.is_empty() {
            writeln!(f, "Duplicate chunk ids: {}", self.duplicate_chunk_ids.join(", "))?;
        }
        if !self.warnings.is_empty() {
            writeln!(f, "Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "  - {warning}")?;
            }
        }
        if !self.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for error in &self.errors {
                writeln!(f, "  - {error}")?;
            }
        }

        Ok(())
    }
}
