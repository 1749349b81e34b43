use std::collections::BTreeMap;

use regex::Regex;

use super::*;
use crate::patterns::DocumentType;

fn parse_with(doc_type: DocumentType, text: &str) -> ParsedDocument {
    let table = PatternTable::for_document_type(doc_type).expect("pattern table should build");
    StructureParser::new(&table).parse(text, &BTreeMap::new())
}

fn assert_levels_increase(tree: &StructureTree) {
    for (id, node) in tree.iter() {
        if let Some(parent) = node.parent {
            assert!(
                node.level > tree.get(parent).level,
                "node {:?} ({}) not deeper than its parent",
                id,
                node.label()
            );
        }
    }
}

const LAW_SAMPLE: &str = "\
LUẬT DOANH NGHIỆP
Căn cứ Hiến pháp nước Cộng hòa xã hội chủ nghĩa Việt Nam;

PHẦN THỨ NHẤT
QUY ĐỊNH CHUNG
Chương I
PHẠM VI ĐIỀU CHỈNH
Điều 1. Phạm vi điều chỉnh
Luật này quy định về thành lập doanh nghiệp.
Điều 2. Đối tượng áp dụng
1. Doanh nghiệp.
2. Cơ quan, tổ chức, cá nhân có liên quan.
a) Tổ chức trong nước;
b) Tổ chức nước ngoài.
PHẦN THỨ HAI
TỔ CHỨC THỰC HIỆN
Chương II
HIỆU LỰC
Mục 1. Điều khoản chuyển tiếp
Điều 3. Hiệu lực thi hành
Luật này có hiệu lực từ ngày 01 tháng 01 năm 2021.
";

#[test]
fn parse_is_total_for_empty_and_blank_input() {
    for text in ["", "   ", "\n\n\t\n"] {
        let parsed = parse_with(DocumentType::Law, text);
        assert_eq!(parsed.tree.len(), 1);
        assert_eq!(parsed.tree.root().kind, NodeKind::Root);
        assert!(parsed.tree.root().content.is_empty());
        assert!(parsed.warnings.is_empty());
    }
}

#[test]
fn unstructured_text_becomes_single_root_blob() {
    let parsed = parse_with(
        DocumentType::Decree,
        "Văn bản không có cấu trúc.\n\nChỉ có hai dòng nội dung.",
    );

    assert_eq!(parsed.tree.len(), 1);
    assert_eq!(
        parsed.tree.root().content,
        "Văn bản không có cấu trúc.\nChỉ có hai dòng nội dung."
    );
    assert_eq!(parsed.warnings.len(), 1);
    assert!(parsed.warnings[0].contains("no structural markers"));
}

#[test]
fn law_sample_builds_expected_hierarchy() {
    let parsed = parse_with(DocumentType::Law, LAW_SAMPLE);
    let tree = &parsed.tree;

    assert_eq!(parsed.count(NodeKind::Part), 2);
    assert_eq!(parsed.count(NodeKind::Chapter), 2);
    assert_eq!(parsed.count(NodeKind::Section), 1);
    assert_eq!(parsed.count(NodeKind::Article), 3);
    assert_eq!(parsed.count(NodeKind::Clause), 2);
    assert_eq!(parsed.count(NodeKind::Point), 2);
    assert_levels_increase(tree);

    assert!(tree.root().content.starts_with("LUẬT DOANH NGHIỆP"));

    let article_three = tree
        .iter()
        .find(|(_, node)| node.kind == NodeKind::Article && node.number == "3")
        .map(|(id, _)| id)
        .expect("article 3 should exist");
    assert_eq!(
        tree.path_labels(article_three),
        vec!["Phần THỨ HAI", "Chương II", "Mục 1", "Điều 3"]
    );
}

#[test]
fn new_part_reparents_following_chapter() {
    let parsed = parse_with(DocumentType::Law, LAW_SAMPLE);
    let tree = &parsed.tree;

    let parts = tree.root().children.clone();
    assert_eq!(parts.len(), 2);
    let second_part = tree.get(parts[1]);
    assert_eq!(second_part.kind, NodeKind::Part);
    assert_eq!(second_part.children.len(), 1);
    assert_eq!(tree.get(second_part.children[0]).number, "II");
}

#[test]
fn upper_case_line_after_container_heading_becomes_title() {
    let parsed = parse_with(DocumentType::Law, LAW_SAMPLE);
    let chapter = parsed
        .tree
        .iter()
        .find(|(_, node)| node.kind == NodeKind::Chapter)
        .map(|(_, node)| node)
        .expect("chapter should exist");

    assert_eq!(chapter.title, "PHẠM VI ĐIỀU CHỈNH");
    assert_eq!(chapter.heading, "Chương I\nPHẠM VI ĐIỀU CHỈNH");
    assert_eq!(chapter.display_name(), "Chương I: PHẠM VI ĐIỀU CHỈNH");
    assert!(chapter.content.is_empty());
}

#[test]
fn content_goes_to_deepest_open_node() {
    let parsed = parse_with(DocumentType::Law, LAW_SAMPLE);
    let tree = &parsed.tree;

    let point_b = tree
        .iter()
        .find(|(_, node)| node.kind == NodeKind::Point && node.number == "b")
        .map(|(_, node)| node)
        .expect("point b should exist");
    assert_eq!(point_b.title, "Tổ chức nước ngoài.");
    assert!(point_b.content.is_empty());

    let article_one = tree
        .iter()
        .find(|(_, node)| node.kind == NodeKind::Article && node.number == "1")
        .map(|(_, node)| node)
        .expect("article 1 should exist");
    assert_eq!(article_one.content, "Luật này quy định về thành lập doanh nghiệp.");
    assert_eq!(article_one.source_line(), Some(8));
}

#[test]
fn article_count_matches_independent_regex_count() {
    let text = format!("{LAW_SAMPLE}\nĐiều 4. Điều khoản thi hành\nNội dung.\nĐiều 4a. Bổ sung\n");
    let parsed = parse_with(DocumentType::Law, &text);

    let independent = Regex::new(r"(?m)^\s*Điều\s+\d+").expect("regex should compile");
    assert_eq!(
        parsed.count(NodeKind::Article),
        independent.find_iter(&text).count()
    );
}

#[test]
fn render_subtree_preserves_reading_order() {
    let parsed = parse_with(DocumentType::Law, LAW_SAMPLE);
    let tree = &parsed.tree;
    let article_two = tree
        .iter()
        .find(|(_, node)| node.kind == NodeKind::Article && node.number == "2")
        .map(|(id, _)| id)
        .expect("article 2 should exist");

    assert_eq!(
        tree.render_subtree(article_two),
        "Điều 2. Đối tượng áp dụng\n1. Doanh nghiệp.\n2. Cơ quan, tổ chức, cá nhân có liên quan.\na) Tổ chức trong nước;\nb) Tổ chức nước ngoài."
    );
}

#[test]
fn repeated_article_numbers_are_reported() {
    let parsed = parse_with(
        DocumentType::Decree,
        "Điều 1. Một\nNội dung.\nĐiều 1. Lặp lại\nNội dung khác.",
    );
    assert_eq!(parsed.count(NodeKind::Article), 2);
    assert!(parsed.warnings.iter().any(|warning| warning.contains("Điều 1")));
}

#[test]
fn outline_indents_by_depth() {
    let parsed = parse_with(
        DocumentType::Decree,
        "Chương I\nQUY ĐỊNH CHUNG\nĐiều 1. Phạm vi\n1. Khoản một.",
    );
    assert_eq!(
        parsed.tree.outline(),
        "Chương I: QUY ĐỊNH CHUNG\n  Điều 1: Phạm vi\n    Khoản 1: Khoản một.\n"
    );
}
