use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parser::{NodeId, StructureTree};
use crate::patterns::{NodeKind, PatternTable};
use crate::tokens::TokenCounter;
use crate::util::sanitize_ref_for_id;

mod quality;
#[cfg(test)]
mod tests;

pub use quality::{readability_score, semantic_tags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    /// Overrides the model ceiling when set.
    pub token_limit: Option<usize>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chars: 300,
            max_chars: 2000,
            token_limit: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityFlags {
    pub tags: Vec<String>,
    pub readability_score: f64,
    pub over_token_limit: bool,
    pub has_clause: bool,
    pub has_point: bool,
    /// Still above `max_chars` after the single permitted split.
    pub split_exhausted: bool,
    /// Below `min_chars` with no size-compatible sibling to merge into.
    pub merge_skipped: bool,
}

/// Numbers of the structural units enclosing a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAnchors {
    pub part: Option<String>,
    pub chapter: Option<String>,
    pub section: Option<String>,
    pub article: Option<String>,
    pub clause: Option<String>,
    pub point: Option<String>,
}

impl UnitAnchors {
    fn from_path(tree: &StructureTree, id: NodeId) -> Self {
        let mut anchors = UnitAnchors::default();
        let mut path = tree.ancestors(id);
        if id != NodeId::ROOT {
            path.push(id);
        }

        for node_id in path {
            let node = tree.get(node_id);
            let number = Some(node.number.clone());
            match node.kind {
                NodeKind::Root => {}
                NodeKind::Part => anchors.part = number,
                NodeKind::Chapter => anchors.chapter = number,
                NodeKind::Section => anchors.section = number,
                NodeKind::Article => anchors.article = number,
                NodeKind::Clause => anchors.clause = number,
                NodeKind::Point => anchors.point = number,
            }
        }
        anchors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub level: String,
    pub hierarchy: Vec<String>,
    pub char_count: usize,
    pub token_count: usize,
    pub parent_id: Option<String>,
    pub merged_with: Vec<String>,
    pub anchors: UnitAnchors,
    pub source_line: Option<usize>,
    pub quality: QualityFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitLevel {
    Document,
    Preamble,
    Intro,
    Article,
    Clause,
    Point,
    Segment,
}

impl UnitLevel {
    fn as_str(self) -> &'static str {
        match self {
            UnitLevel::Document => "document",
            UnitLevel::Preamble => "preamble",
            UnitLevel::Intro => "intro",
            UnitLevel::Article => "article",
            UnitLevel::Clause => "clause",
            UnitLevel::Point => "point",
            UnitLevel::Segment => "segment",
        }
    }

    fn from_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Article => UnitLevel::Article,
            NodeKind::Clause => UnitLevel::Clause,
            NodeKind::Point => UnitLevel::Point,
            NodeKind::Root => UnitLevel::Document,
            NodeKind::Part | NodeKind::Chapter | NodeKind::Section => UnitLevel::Intro,
        }
    }

    /// Units whose structural children can be cut out as sub-chunks.
    fn splits_by_children(self) -> bool {
        matches!(self, UnitLevel::Article | UnitLevel::Clause | UnitLevel::Point)
    }
}

#[derive(Debug, Clone)]
struct Draft {
    id: String,
    unit: UnitLevel,
    merged: bool,
    node: NodeId,
    breadcrumb: String,
    heading: String,
    body: String,
    hierarchy: Vec<String>,
    /// Chunks with equal keys are siblings and may merge; `None` never merges.
    sibling_key: Option<String>,
    parent_id: Option<String>,
    merged_with: Vec<String>,
    anchors: UnitAnchors,
    source_line: Option<usize>,
    split_exhausted: bool,
}

impl Draft {
    fn text(&self) -> String {
        if self.breadcrumb.is_empty() {
            self.body.clone()
        } else {
            format!("{}\n{}", self.breadcrumb, self.body)
        }
    }

    fn char_count(&self) -> usize {
        let breadcrumb = self.breadcrumb.chars().count();
        let body = self.body.chars().count();
        if breadcrumb == 0 { body } else { breadcrumb + 1 + body }
    }

    fn level(&self) -> String {
        if self.merged {
            format!("merged_{}", self.unit.as_str())
        } else {
            self.unit.as_str().to_string()
        }
    }

    fn lineage_root(&self) -> &str {
        self.merged_with
            .first()
            .map(String::as_str)
            .unwrap_or(self.id.as_str())
    }
}

/// Structure-aware chunker: base segmentation, split/merge size
/// optimization, token validation and quality tagging, in that order.
#[derive(Debug)]
pub struct OptimalChunker<'a> {
    config: ChunkerConfig,
    table: &'a PatternTable,
    counter: &'a TokenCounter,
}

impl<'a> OptimalChunker<'a> {
    pub fn new(config: ChunkerConfig, table: &'a PatternTable, counter: &'a TokenCounter) -> Self {
        Self {
            config,
            table,
            counter,
        }
    }

    pub fn token_limit(&self) -> usize {
        self.config
            .token_limit
            .unwrap_or_else(|| self.counter.max_tokens())
    }

    pub fn chunk(&self, tree: &StructureTree, doc_key: &str) -> Vec<Chunk> {
        let doc_key = match sanitize_ref_for_id(doc_key) {
            key if key.is_empty() => "doc".to_string(),
            key => key,
        };

        let base = self.base_segmentation(tree, &doc_key);
        let base_count = base.len();
        let split = self.split_oversized(tree, base);
        let split_count = split.len();
        let merged = self.merge_undersized(split);
        let merged_count = merged.len();

        let token_limit = self.token_limit();
        let mut seen_ids = HashSet::<String>::new();
        let mut chunks = Vec::with_capacity(merged.len());
        for draft in merged {
            let id = unique_id(&draft.id, &mut seen_ids);
            chunks.push(self.finalize(draft, id, token_limit));
        }

        debug!(
            doc_key = %doc_key,
            base = base_count,
            after_split = split_count,
            after_merge = merged_count,
            over_token_limit = chunks.iter().filter(|chunk| chunk.quality.over_token_limit).count(),
            "chunked document"
        );

        chunks
    }

    fn base_segmentation(&self, tree: &StructureTree, doc_key: &str) -> Vec<Draft> {
        let mut drafts = Vec::new();

        for id in tree.preorder() {
            let node = tree.get(id);
            match node.kind {
                NodeKind::Root => {
                    if node.content.is_empty() {
                        continue;
                    }
                    let unit = if tree.is_empty() {
                        UnitLevel::Document
                    } else {
                        UnitLevel::Preamble
                    };
                    drafts.push(Draft {
                        id: format!("{}_{}", doc_key, unit.as_str()),
                        unit,
                        merged: false,
                        node: id,
                        breadcrumb: String::new(),
                        heading: String::new(),
                        body: node.content.clone(),
                        hierarchy: Vec::new(),
                        sibling_key: None,
                        parent_id: None,
                        merged_with: Vec::new(),
                        anchors: UnitAnchors::default(),
                        source_line: Some(1),
                        split_exhausted: false,
                    });
                }
                NodeKind::Part | NodeKind::Chapter | NodeKind::Section => {
                    // A childless heading appears in no descendant breadcrumb.
                    if node.content.is_empty() && !node.children.is_empty() {
                        continue;
                    }
                    let body = if node.content.is_empty() {
                        node.heading.clone()
                    } else {
                        format!("{}\n{}", node.heading, node.content)
                    };
                    drafts.push(Draft {
                        id: format!("{}_{}_intro", doc_key, path_key(tree, id)),
                        unit: UnitLevel::Intro,
                        merged: false,
                        node: id,
                        breadcrumb: breadcrumb(tree, id),
                        heading: node.heading.clone(),
                        body,
                        hierarchy: tree.path_labels(id),
                        sibling_key: None,
                        parent_id: None,
                        merged_with: Vec::new(),
                        anchors: UnitAnchors::from_path(tree, id),
                        source_line: node.source_line(),
                        split_exhausted: false,
                    });
                }
                NodeKind::Article | NodeKind::Clause | NodeKind::Point => {
                    let parent_kind = node.parent.map(|parent| tree.get(parent).kind);
                    let nested = matches!(
                        parent_kind,
                        Some(NodeKind::Article | NodeKind::Clause | NodeKind::Point)
                    );
                    if nested {
                        continue;
                    }

                    let hierarchy = tree.path_labels(id);
                    let chunk_id = if node.kind == NodeKind::Article {
                        format!(
                            "{}_{}_{}",
                            doc_key,
                            node.kind.id_key(),
                            sanitize_ref_for_id(&node.number)
                        )
                    } else {
                        format!("{}_{}", doc_key, path_key(tree, id))
                    };

                    drafts.push(Draft {
                        id: chunk_id,
                        unit: UnitLevel::from_kind(node.kind),
                        merged: false,
                        node: id,
                        breadcrumb: breadcrumb(tree, id),
                        heading: node.heading.clone(),
                        body: tree.render_subtree(id),
                        sibling_key: Some(container_key(&hierarchy)),
                        hierarchy,
                        parent_id: None,
                        merged_with: Vec::new(),
                        anchors: UnitAnchors::from_path(tree, id),
                        source_line: node.source_line(),
                        split_exhausted: false,
                    });
                }
            }
        }

        // Split and merge ids derive from these, so they must already be unique.
        let mut seen_ids = HashSet::<String>::new();
        for draft in &mut drafts {
            draft.id = unique_id(&draft.id, &mut seen_ids);
        }

        drafts
    }

    fn split_oversized(&self, tree: &StructureTree, drafts: Vec<Draft>) -> Vec<Draft> {
        let mut out = Vec::with_capacity(drafts.len());

        for draft in drafts {
            if draft.char_count() <= self.config.max_chars {
                out.push(draft);
                continue;
            }

            let has_children = !tree.get(draft.node).children.is_empty();
            let pieces = if draft.unit.splits_by_children() && has_children {
                self.split_by_children(tree, &draft)
            } else {
                self.split_by_lines(&draft)
            };

            if pieces.len() <= 1 {
                let mut kept = draft;
                kept.split_exhausted = true;
                out.push(kept);
                continue;
            }

            for mut piece in pieces {
                piece.split_exhausted = piece.char_count() > self.config.max_chars;
                out.push(piece);
            }
        }

        out
    }

    fn split_by_children(&self, tree: &StructureTree, draft: &Draft) -> Vec<Draft> {
        let unit = tree.get(draft.node);
        let mut pieces = Vec::with_capacity(unit.children.len());

        for (index, child_id) in unit.children.iter().enumerate() {
            let child = tree.get(*child_id);
            let mut body = unit.heading.clone();
            if index == 0 && !unit.content.is_empty() {
                body.push('\n');
                body.push_str(&unit.content);
            }
            body.push('\n');
            body.push_str(&tree.render_subtree(*child_id));

            pieces.push(Draft {
                id: format!(
                    "{}_{}_{}",
                    draft.id,
                    child.kind.id_key(),
                    sanitize_ref_for_id(&child.number)
                ),
                unit: UnitLevel::from_kind(child.kind),
                merged: false,
                node: *child_id,
                breadcrumb: draft.breadcrumb.clone(),
                heading: unit.heading.clone(),
                body,
                hierarchy: tree.path_labels(*child_id),
                sibling_key: Some(format!("{}#children", draft.id)),
                parent_id: Some(draft.id.clone()),
                merged_with: Vec::new(),
                anchors: UnitAnchors::from_path(tree, *child_id),
                source_line: child.source_line(),
                split_exhausted: false,
            });
        }

        pieces
    }

    fn split_by_lines(&self, draft: &Draft) -> Vec<Draft> {
        let content = draft
            .body
            .strip_prefix(draft.heading.as_str())
            .unwrap_or(&draft.body)
            .trim_start_matches('\n');

        let mut overhead = draft.heading.chars().count();
        if overhead > 0 {
            overhead += 1;
        }
        if !draft.breadcrumb.is_empty() {
            overhead += draft.breadcrumb.chars().count() + 1;
        }
        let budget = self.config.max_chars.saturating_sub(overhead).max(1);

        let mut groups = Vec::<String>::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        for line in content.lines() {
            let line_len = line.chars().count();
            if !current.is_empty() && current_len + 1 + line_len > budget {
                groups.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(line);
            current_len += line_len;
        }
        if !current.is_empty() {
            groups.push(current);
        }

        groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| {
                let body = if draft.heading.is_empty() {
                    group
                } else {
                    format!("{}\n{}", draft.heading, group)
                };
                Draft {
                    id: format!("{}_part_{}", draft.id, index + 1),
                    unit: UnitLevel::Segment,
                    merged: false,
                    node: draft.node,
                    breadcrumb: draft.breadcrumb.clone(),
                    heading: draft.heading.clone(),
                    body,
                    hierarchy: draft.hierarchy.clone(),
                    sibling_key: Some(format!("{}#parts", draft.id)),
                    parent_id: Some(draft.id.clone()),
                    merged_with: Vec::new(),
                    anchors: draft.anchors.clone(),
                    source_line: draft.source_line,
                    split_exhausted: false,
                }
            })
            .collect()
    }

    fn merge_undersized(&self, drafts: Vec<Draft>) -> Vec<Draft> {
        let mut current = drafts;

        loop {
            let mut merged_any = false;
            let mut next = Vec::with_capacity(current.len());
            let mut iter = current.into_iter().peekable();

            while let Some(draft) = iter.next() {
                let mergeable = iter
                    .peek()
                    .is_some_and(|neighbor| self.can_merge(&draft, neighbor));
                if !mergeable {
                    next.push(draft);
                    continue;
                }
                let Some(neighbor) = iter.next() else {
                    next.push(draft);
                    continue;
                };
                next.push(merge_pair(draft, neighbor));
                merged_any = true;
            }

            current = next;
            if !merged_any {
                break;
            }
        }

        current
    }

    fn can_merge(&self, draft: &Draft, neighbor: &Draft) -> bool {
        if draft.char_count() >= self.config.min_chars {
            return false;
        }
        let (Some(left), Some(right)) = (&draft.sibling_key, &neighbor.sibling_key) else {
            return false;
        };
        if left != right || draft.split_exhausted || neighbor.split_exhausted {
            return false;
        }

        let combined = draft.char_count() + 2 + neighbor.body.chars().count();
        combined <= self.config.max_chars
    }

    fn finalize(&self, draft: Draft, id: String, token_limit: usize) -> Chunk {
        let text = draft.text();
        let char_count = draft.char_count();
        let token_count = self.counter.count(&text);

        let quality = QualityFlags {
            tags: semantic_tags(&draft.body),
            readability_score: readability_score(&draft.body),
            over_token_limit: token_count > token_limit,
            has_clause: self.table.text_contains(NodeKind::Clause, &draft.body),
            has_point: self.table.text_contains(NodeKind::Point, &draft.body),
            split_exhausted: draft.split_exhausted,
            merge_skipped: char_count < self.config.min_chars,
        };

        Chunk {
            level: draft.level(),
            id,
            text,
            hierarchy: draft.hierarchy,
            char_count,
            token_count,
            parent_id: draft.parent_id,
            merged_with: draft.merged_with,
            anchors: draft.anchors,
            source_line: draft.source_line,
            quality,
        }
    }
}

fn merge_pair(left: Draft, right: Draft) -> Draft {
    let mut merged_with = if left.merged_with.is_empty() {
        vec![left.id.clone()]
    } else {
        left.merged_with.clone()
    };
    if right.merged_with.is_empty() {
        merged_with.push(right.id.clone());
    } else {
        merged_with.extend(right.merged_with.iter().cloned());
    }

    let id = format!("{}_merged_{}", left.lineage_root(), merged_with.len());
    Draft {
        id,
        merged: true,
        body: format!("{}\n\n{}", left.body, right.body),
        merged_with,
        ..left
    }
}

fn breadcrumb(tree: &StructureTree, id: NodeId) -> String {
    tree.ancestors(id)
        .into_iter()
        .map(|ancestor| tree.get(ancestor))
        .filter(|node| node.kind.is_container())
        .map(|node| format!("[{}]", node.display_name()))
        .collect::<Vec<String>>()
        .join(" ")
}

fn path_key(tree: &StructureTree, id: NodeId) -> String {
    let mut path = tree.ancestors(id);
    path.push(id);
    path.into_iter()
        .map(|node_id| {
            let node = tree.get(node_id);
            format!("{}_{}", node.kind.id_key(), sanitize_ref_for_id(&node.number))
        })
        .collect::<Vec<String>>()
        .join("_")
}

fn container_key(hierarchy: &[String]) -> String {
    match hierarchy.split_last() {
        Some((_, enclosing)) => enclosing.join(" > "),
        None => String::new(),
    }
}

fn unique_id(candidate: &str, seen: &mut HashSet<String>) -> String {
    if seen.insert(candidate.to_string()) {
        return candidate.to_string();
    }

    let mut suffix = 2usize;
    loop {
        let next = format!("{candidate}_dup{suffix}");
        if seen.insert(next.clone()) {
            return next;
        }
        suffix += 1;
    }
}
