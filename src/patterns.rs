use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Law,
    Decree,
    Circular,
    Decision,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Law => "law",
            DocumentType::Decree => "decree",
            DocumentType::Circular => "circular",
            DocumentType::Decision => "decision",
        }
    }

    /// Vietnamese label used in breadcrumbs and record titles.
    pub fn label_vi(self) -> &'static str {
        match self {
            DocumentType::Law => "Luật",
            DocumentType::Decree => "Nghị định",
            DocumentType::Circular => "Thông tư",
            DocumentType::Decision => "Quyết định",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "law" | "luat" | "luật" | "bo_luat" | "bộ_luật" => Ok(DocumentType::Law),
            "decree" | "nghi_dinh" | "nghị_định" | "nd" => Ok(DocumentType::Decree),
            "circular" | "thong_tu" | "thông_tư" | "tt" => Ok(DocumentType::Circular),
            "decision" | "quyet_dinh" | "quyết_định" | "qd" => Ok(DocumentType::Decision),
            _ => bail!("unknown document type: {value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Part,
    Chapter,
    Section,
    Article,
    Clause,
    Point,
}

impl NodeKind {
    pub const STRUCTURAL: [NodeKind; 6] = [
        NodeKind::Part,
        NodeKind::Chapter,
        NodeKind::Section,
        NodeKind::Article,
        NodeKind::Clause,
        NodeKind::Point,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Part => "part",
            NodeKind::Chapter => "chapter",
            NodeKind::Section => "section",
            NodeKind::Article => "article",
            NodeKind::Clause => "clause",
            NodeKind::Point => "point",
        }
    }

    pub fn label_vi(self) -> &'static str {
        match self {
            NodeKind::Root => "Văn bản",
            NodeKind::Part => "Phần",
            NodeKind::Chapter => "Chương",
            NodeKind::Section => "Mục",
            NodeKind::Article => "Điều",
            NodeKind::Clause => "Khoản",
            NodeKind::Point => "Điểm",
        }
    }

    /// Suffix used when deriving chunk ids from a unit of this kind.
    pub fn id_key(self) -> &'static str {
        match self {
            NodeKind::Root => "doc",
            NodeKind::Part => "phan",
            NodeKind::Chapter => "chuong",
            NodeKind::Section => "muc",
            NodeKind::Article => "dieu",
            NodeKind::Clause => "khoan",
            NodeKind::Point => "diem",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Part | NodeKind::Chapter | NodeKind::Section)
    }

    fn rank(self) -> i32 {
        match self {
            NodeKind::Root => -1,
            NodeKind::Part => 0,
            NodeKind::Chapter => 1,
            NodeKind::Section => 2,
            NodeKind::Article => 3,
            NodeKind::Clause => 4,
            NodeKind::Point => 5,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PatternRule {
    pub kind: NodeKind,
    pub priority: u8,
    regex: Regex,
    number_group: usize,
    title_group: Option<usize>,
}

impl PatternRule {
    pub fn new(
        kind: NodeKind,
        priority: u8,
        pattern: &str,
        number_group: usize,
        title_group: Option<usize>,
    ) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("failed to compile {} heading regex", kind.as_str()))?;
        Ok(Self {
            kind,
            priority,
            regex,
            number_group,
            title_group,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    fn extract(&self, line: &str) -> Option<LineMatch> {
        let captures = self.regex.captures(line)?;
        let number = captures
            .get(self.number_group)
            .map(|m| m.as_str().split_whitespace().collect::<Vec<&str>>().join(" "))?;
        let title = self
            .title_group
            .and_then(|group| captures.get(group))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Some(LineMatch {
            kind: self.kind,
            number,
            title,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    pub kind: NodeKind,
    pub number: String,
    pub title: String,
}

/// Ordered, level-tagged heading patterns for one document type.
///
/// Rules are kept sorted by descending priority; the first rule that matches
/// a line decides its kind. Levels are assigned densely over the kinds the
/// table knows, so a Decree chapter sits at level 0 while a Law chapter sits
/// below its Part.
#[derive(Debug, Clone)]
pub struct PatternTable {
    doc_type: DocumentType,
    rules: Vec<PatternRule>,
    levels: Vec<(NodeKind, i32)>,
}

const PART_PATTERN: &str =
    r"^(?i:phần)\s+((?i:thứ)\s+\S+|[IVXLCDM]+|\d+)(?:\s*[.:\-–]\s*|\s+|$)(.*)$";
const CHAPTER_PATTERN: &str =
    r"^(?i:chương)\s+([IVXLCDM]+|\d+)(?:\s*[.:\-–]\s*|\s+|$)(.*)$";
const SECTION_PATTERN: &str = r"^(?i:mục)\s+(\d+|[IVXLCDM]+)(?:\s*[.:\-–]\s*|\s+|$)(.*)$";
const ARTICLE_PATTERN: &str = r"^Điều\s+(\d+[a-zđ]?)\s*[.:]?\s*(.*)$";
const ARTICLE_PATTERN_ANY_CASE: &str = r"^(?i:điều)\s+(\d+[a-zđ]?)\s*[.:]?\s*(.*)$";
const CLAUSE_PATTERN: &str = r"^(\d{1,3})\.\s+(.*)$";
const POINT_PATTERN: &str = r"^([a-zđ])\)\s+(.*)$";

impl PatternTable {
    pub fn new(doc_type: DocumentType, mut rules: Vec<PatternRule>) -> Self {
        rules.sort_by(|left, right| right.priority.cmp(&left.priority));

        let mut kinds = rules.iter().map(|rule| rule.kind).collect::<Vec<NodeKind>>();
        kinds.sort_by_key(|kind| kind.rank());
        kinds.dedup();
        let levels = kinds
            .into_iter()
            .enumerate()
            .map(|(index, kind)| (kind, index as i32))
            .collect();

        Self {
            doc_type,
            rules,
            levels,
        }
    }

    pub fn for_document_type(doc_type: DocumentType) -> Result<Self> {
        let rules = match doc_type {
            DocumentType::Law => vec![
                PatternRule::new(NodeKind::Part, 100, PART_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Chapter, 90, CHAPTER_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Section, 80, SECTION_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Article, 70, ARTICLE_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Point, 60, POINT_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Clause, 50, CLAUSE_PATTERN, 1, Some(2))?,
            ],
            DocumentType::Decree | DocumentType::Circular => vec![
                PatternRule::new(NodeKind::Chapter, 90, CHAPTER_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Section, 80, SECTION_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Article, 70, ARTICLE_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Point, 60, POINT_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Clause, 50, CLAUSE_PATTERN, 1, Some(2))?,
            ],
            DocumentType::Decision => vec![
                PatternRule::new(NodeKind::Chapter, 90, CHAPTER_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Article, 70, ARTICLE_PATTERN_ANY_CASE, 1, Some(2))?,
                PatternRule::new(NodeKind::Point, 60, POINT_PATTERN, 1, Some(2))?,
                PatternRule::new(NodeKind::Clause, 50, CLAUSE_PATTERN, 1, Some(2))?,
            ],
        };

        Ok(Self::new(doc_type, rules))
    }

    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn rule(&self, kind: NodeKind) -> Option<&PatternRule> {
        self.rules.iter().find(|rule| rule.kind == kind)
    }

    pub fn level_of(&self, kind: NodeKind) -> i32 {
        if kind == NodeKind::Root {
            return -1;
        }
        self.levels
            .iter()
            .find(|(known, _)| *known == kind)
            .map(|(_, level)| *level)
            .unwrap_or_else(|| kind.rank())
    }

    /// Classify a single trimmed line; `None` means the line is plain content.
    pub fn match_line(&self, line: &str) -> Option<LineMatch> {
        self.rules.iter().find_map(|rule| rule.extract(line))
    }

    /// True when any line of `text` is a heading of `kind` under this table.
    pub fn text_contains(&self, kind: NodeKind, text: &str) -> bool {
        let Some(rule) = self.rule(kind) else {
            return false;
        };
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .any(|line| {
                rule.regex.is_match(line)
                    && self.match_line(line).map(|found| found.kind) == Some(kind)
            })
    }
}
