use std::collections::BTreeMap;

use serde::Serialize;

use crate::patterns::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

#[derive(Debug, Clone, Serialize)]
pub struct StructureNode {
    pub kind: NodeKind,
    pub number: String,
    pub title: String,
    /// Heading line(s) exactly as they appeared in the source.
    pub heading: String,
    pub content: String,
    pub level: i32,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub metadata: BTreeMap<String, String>,
}

impl StructureNode {
    fn root() -> Self {
        Self {
            kind: NodeKind::Root,
            number: String::new(),
            title: String::new(),
            heading: String::new(),
            content: String::new(),
            level: -1,
            children: Vec::new(),
            parent: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Short reference such as `Điều 5` or `Chương II`; empty for the root.
    pub fn label(&self) -> String {
        match self.kind {
            NodeKind::Root => String::new(),
            kind => format!("{} {}", kind.label_vi(), self.number),
        }
    }

    /// Label plus title, used in breadcrumbs.
    pub fn display_name(&self) -> String {
        let label = self.label();
        if self.title.is_empty() {
            label
        } else {
            format!("{}: {}", label, self.title)
        }
    }

    pub fn source_line(&self) -> Option<usize> {
        self.metadata
            .get("line")
            .and_then(|value| value.parse::<usize>().ok())
    }
}

/// Arena-backed parse tree. Node 0 is always the root.
#[derive(Debug, Clone, Serialize)]
pub struct StructureTree {
    nodes: Vec<StructureNode>,
}

impl Default for StructureTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![StructureNode::root()],
        }
    }

    pub fn root(&self) -> &StructureNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn get(&self, id: NodeId) -> &StructureNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &StructureNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, mut node: StructureNode) -> NodeId {
        let parent_level = self.nodes[parent.0].level;
        debug_assert!(
            node.level > parent_level,
            "child level {} must exceed parent level {}",
            node.level,
            parent_level
        );

        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut StructureNode {
        &mut self.nodes[id.0]
    }

    /// Ancestors from the outermost structural node down to `id`'s parent.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).parent;
        while let Some(current) = cursor {
            if current == NodeId::ROOT {
                break;
            }
            out.push(current);
            cursor = self.get(current).parent;
        }
        out.reverse();
        out
    }

    /// Human-readable path such as `["Chương I", "Điều 5", "Khoản 2"]`.
    pub fn path_labels(&self, id: NodeId) -> Vec<String> {
        let mut labels = self
            .ancestors(id)
            .into_iter()
            .map(|ancestor| self.get(ancestor).label())
            .collect::<Vec<String>>();
        if id != NodeId::ROOT {
            labels.push(self.get(id).label());
        }
        labels
    }

    /// Pre-order traversal in document order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.get(id).children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|node| node.kind == kind).count()
    }

    /// Heading, own content and every descendant, in reading order.
    pub fn render_subtree(&self, id: NodeId) -> String {
        let mut lines = Vec::<&str>::new();
        self.collect_lines(id, &mut lines);
        lines.join("\n")
    }

    fn collect_lines<'a>(&'a self, id: NodeId, lines: &mut Vec<&'a str>) {
        let node = self.get(id);
        if !node.heading.is_empty() {
            lines.push(&node.heading);
        }
        if !node.content.is_empty() {
            lines.push(&node.content);
        }
        for child in &node.children {
            self.collect_lines(*child, lines);
        }
    }

    pub fn outline(&self) -> String {
        let mut out = String::new();
        for id in self.preorder().into_iter().skip(1) {
            let node = self.get(id);
            let depth = self.ancestors(id).len();
            out.push_str(&"  ".repeat(depth));
            out.push_str(&node.display_name());
            out.push('\n');
        }
        out
    }
}
