use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::patterns::{NodeKind, PatternTable};

mod tree;
#[cfg(test)]
mod tests;

pub use tree::{NodeId, StructureNode, StructureTree};

#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub tree: StructureTree,
    pub counts: BTreeMap<NodeKind, usize>,
    pub line_count: usize,
    pub warnings: Vec<String>,
}

impl ParsedDocument {
    pub fn count(&self, kind: NodeKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Single-pass, stack-based heading parser shared by every document type.
#[derive(Debug, Clone, Copy)]
pub struct StructureParser<'a> {
    table: &'a PatternTable,
}

impl<'a> StructureParser<'a> {
    pub fn new(table: &'a PatternTable) -> Self {
        Self { table }
    }

    pub fn parse(&self, text: &str, metadata: &BTreeMap<String, String>) -> ParsedDocument {
        let mut tree = StructureTree::new();
        tree.node_mut(NodeId::ROOT).metadata = metadata.clone();

        let mut stack = Vec::<(i32, NodeId)>::new();
        let mut buffer = Vec::<&str>::new();
        let mut awaiting_title: Option<NodeId> = None;
        let mut line_count = 0usize;

        for (index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            line_count += 1;

            let Some(found) = self.table.match_line(line) else {
                if let Some(pending) = awaiting_title.take() {
                    if looks_like_upper_case_title(line) {
                        let node = tree.node_mut(pending);
                        node.title = line.to_string();
                        node.heading.push('\n');
                        node.heading.push_str(line);
                        continue;
                    }
                }
                buffer.push(line);
                continue;
            };
            awaiting_title = None;

            let current = stack.last().map(|(_, id)| *id).unwrap_or(NodeId::ROOT);
            flush_content(&mut tree, current, &mut buffer);

            let level = self.table.level_of(found.kind);
            while stack.last().is_some_and(|(top_level, _)| *top_level >= level) {
                stack.pop();
            }
            let parent = stack.last().map(|(_, id)| *id).unwrap_or(NodeId::ROOT);

            let needs_title = found.kind.is_container() && found.title.is_empty();
            let mut node_metadata = BTreeMap::new();
            node_metadata.insert("line".to_string(), (index + 1).to_string());

            let id = tree.add_child(
                parent,
                StructureNode {
                    kind: found.kind,
                    number: found.number,
                    title: found.title,
                    heading: line.to_string(),
                    content: String::new(),
                    level,
                    children: Vec::new(),
                    parent: None,
                    metadata: node_metadata,
                },
            );
            stack.push((level, id));

            if needs_title {
                awaiting_title = Some(id);
            }
        }

        let current = stack.last().map(|(_, id)| *id).unwrap_or(NodeId::ROOT);
        flush_content(&mut tree, current, &mut buffer);

        let counts = count_by_kind(&tree);
        let warnings = collect_parse_warnings(&tree, &counts);

        debug!(
            doc_type = %self.table.doc_type(),
            nodes = tree.len(),
            articles = counts.get(&NodeKind::Article).copied().unwrap_or(0),
            warnings = warnings.len(),
            "parsed document structure"
        );

        ParsedDocument {
            tree,
            counts,
            line_count,
            warnings,
        }
    }
}

fn flush_content(tree: &mut StructureTree, target: NodeId, buffer: &mut Vec<&str>) {
    if buffer.is_empty() {
        return;
    }

    let node = tree.node_mut(target);
    if !node.content.is_empty() {
        node.content.push('\n');
    }
    node.content.push_str(&buffer.join("\n"));
    buffer.clear();
}

fn looks_like_upper_case_title(line: &str) -> bool {
    let mut letters = line.chars().filter(|ch| ch.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|ch| !ch.is_lowercase())
}

fn count_by_kind(tree: &StructureTree) -> BTreeMap<NodeKind, usize> {
    let mut counts = BTreeMap::new();
    for (_, node) in tree.iter().skip(1) {
        *counts.entry(node.kind).or_insert(0) += 1;
    }
    counts
}

fn collect_parse_warnings(tree: &StructureTree, counts: &BTreeMap<NodeKind, usize>) -> Vec<String> {
    let mut warnings = Vec::new();

    if counts.is_empty() {
        if !tree.root().content.is_empty() {
            warnings.push("no structural markers found; document kept as a single blob".to_string());
        }
        return warnings;
    }

    if !counts.contains_key(&NodeKind::Article) {
        warnings.push("no articles found; chunking falls back to coarser units".to_string());
    }

    let mut seen = HashSet::<&str>::new();
    for (_, node) in tree.iter() {
        if node.kind == NodeKind::Article && !seen.insert(node.number.as_str()) {
            warnings.push(format!("article number repeated: {}", node.label()));
        }
    }

    warnings
}
