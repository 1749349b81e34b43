use std::collections::{BTreeMap, HashSet};

use super::*;
use crate::parser::StructureParser;
use crate::patterns::DocumentType;

fn filler(chars: usize) -> String {
    "quy định về quyền và trách nhiệm của cơ quan "
        .chars()
        .cycle()
        .take(chars)
        .collect::<String>()
}

fn article(number: usize, body_chars: usize) -> String {
    format!("Điều {number}. Tiêu đề {number}\n{}\n", filler(body_chars))
}

fn run_chunker(doc_type: DocumentType, text: &str, config: ChunkerConfig) -> Vec<Chunk> {
    let table = PatternTable::for_document_type(doc_type).expect("pattern table should build");
    let counter = TokenCounter::estimating("test-model", 4096);
    let parsed = StructureParser::new(&table).parse(text, &BTreeMap::new());
    OptimalChunker::new(config, &table, &counter).chunk(&parsed.tree, "luat-01")
}

fn config(min_chars: usize, max_chars: usize) -> ChunkerConfig {
    ChunkerConfig {
        min_chars,
        max_chars,
        token_limit: None,
    }
}

#[test]
fn three_articles_yield_three_chunks_without_split_or_merge() {
    let text = format!("{}{}{}", article(1, 400), article(2, 450), article(3, 500));
    let chunks = run_chunker(DocumentType::Law, &text, config(300, 2000));

    let ids = chunks.iter().map(|chunk| chunk.id.as_str()).collect::<Vec<&str>>();
    assert_eq!(ids, vec!["luat_01_dieu_1", "luat_01_dieu_2", "luat_01_dieu_3"]);
    for chunk in &chunks {
        assert_eq!(chunk.level, "article");
        assert!(chunk.parent_id.is_none());
        assert!(chunk.merged_with.is_empty());
        assert!(!chunk.quality.split_exhausted);
        assert!(!chunk.quality.merge_skipped);
        assert_eq!(chunk.char_count, chunk.text.chars().count());
    }
    assert_eq!(chunks[1].hierarchy, vec!["Điều 2"]);
    assert_eq!(chunks[1].anchors.article.as_deref(), Some("2"));
}

#[test]
fn oversized_article_splits_into_clause_chunks() {
    let mut text = String::from("Chương I\nQUY ĐỊNH CHUNG\nĐiều 7. Quyền của tổ chức\n");
    for clause in 1..=5 {
        text.push_str(&format!("{clause}. {}\n", filler(600)));
    }
    let chunks = run_chunker(DocumentType::Law, &text, config(300, 2000));

    assert_eq!(chunks.len(), 5);
    for (index, chunk) in chunks.iter().enumerate() {
        let clause = index + 1;
        assert_eq!(chunk.id, format!("luat_01_dieu_7_khoan_{clause}"));
        assert_eq!(chunk.parent_id.as_deref(), Some("luat_01_dieu_7"));
        assert_eq!(chunk.level, "clause");
        assert!(chunk.text.starts_with("[Chương I: QUY ĐỊNH CHUNG]\nĐiều 7. Quyền của tổ chức\n"));
        assert!(chunk.text.contains(&format!("\n{clause}. ")));
        assert_eq!(
            chunk.hierarchy,
            vec!["Chương I".to_string(), "Điều 7".to_string(), format!("Khoản {clause}")]
        );
        assert!(chunk.char_count <= 2000);
        assert!(!chunk.quality.split_exhausted);
        assert!(chunk.quality.has_clause);
    }
}

#[test]
fn undersized_siblings_merge_and_record_lineage() {
    let text = format!("{}{}", article(1, 150), article(2, 150));
    let chunks = run_chunker(DocumentType::Decree, &text, config(300, 2000));

    assert_eq!(chunks.len(), 1);
    let merged = &chunks[0];
    assert_eq!(merged.id, "luat_01_dieu_1_merged_2");
    assert_eq!(merged.level, "merged_article");
    assert_eq!(merged.merged_with, vec!["luat_01_dieu_1", "luat_01_dieu_2"]);
    assert!(merged.char_count >= 300, "merged size {}", merged.char_count);
    assert!(!merged.quality.merge_skipped);
    assert!(merged.text.contains("Điều 1. Tiêu đề 1"));
    assert!(merged.text.contains("\n\nĐiều 2. Tiêu đề 2"));
}

#[test]
fn merge_that_would_exceed_max_is_skipped_and_flagged() {
    let text = format!("{}{}", article(1, 100), article(2, 1950));
    let chunks = run_chunker(DocumentType::Decree, &text, config(300, 2000));

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].quality.merge_skipped);
    assert!(chunks[0].merged_with.is_empty());
    assert!(!chunks[1].quality.merge_skipped);
}

#[test]
fn merges_never_cross_chapter_boundaries() {
    let text = format!(
        "Chương I\nMỘT\n{}Chương II\nHAI\n{}",
        article(1, 120),
        article(2, 120)
    );
    let chunks = run_chunker(DocumentType::Decree, &text, config(300, 2000));

    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|chunk| chunk.quality.merge_skipped));
    assert!(chunks[1].text.starts_with("[Chương II: HAI]\n"));
}

#[test]
fn article_without_clauses_splits_by_lines() {
    let mut text = String::from("Điều 9. Quy định dài\n");
    for _ in 0..6 {
        text.push_str(&filler(500));
        text.push('\n');
    }
    let chunks = run_chunker(DocumentType::Decree, &text, config(300, 2000));

    assert!(chunks.len() >= 2);
    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.id, format!("luat_01_dieu_9_part_{}", index + 1));
        assert_eq!(chunk.level, "segment");
        assert_eq!(chunk.parent_id.as_deref(), Some("luat_01_dieu_9"));
        assert!(chunk.text.starts_with("Điều 9. Quy định dài\n"));
        assert!(chunk.char_count <= 2000);
    }
}

#[test]
fn unsplittable_line_is_kept_and_flagged() {
    let text = format!("Điều 1. Một dòng rất dài\n{}\n", filler(2600));
    let chunks = run_chunker(DocumentType::Decree, &text, config(300, 2000));

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, "luat_01_dieu_1");
    assert!(chunks[0].char_count > 2000);
    assert!(chunks[0].quality.split_exhausted);
}

#[test]
fn unstructured_text_becomes_document_chunk() {
    let chunks = run_chunker(
        DocumentType::Law,
        &format!("{}\n{}", filler(200), filler(200)),
        config(300, 2000),
    );

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, "luat_01_document");
    assert_eq!(chunks[0].level, "document");
    assert!(chunks[0].hierarchy.is_empty());
}

#[test]
fn empty_input_produces_no_chunks() {
    assert!(run_chunker(DocumentType::Law, "", config(300, 2000)).is_empty());
}

#[test]
fn preamble_and_chapter_intro_keep_their_text() {
    let text = format!(
        "Căn cứ Hiến pháp;\nChương I\nQUY ĐỊNH CHUNG\nChương này quy định chung.\n{}",
        article(1, 500)
    );
    let chunks = run_chunker(DocumentType::Decree, &text, config(10, 2000));

    let levels = chunks.iter().map(|chunk| chunk.level.as_str()).collect::<Vec<&str>>();
    assert_eq!(levels, vec!["preamble", "intro", "article"]);
    assert_eq!(chunks[0].text, "Căn cứ Hiến pháp;");
    assert_eq!(chunks[1].id, "luat_01_chuong_i_intro");
    assert!(chunks[1].text.ends_with("Chương này quy định chung."));
}

#[test]
fn heading_only_chapter_keeps_its_heading() {
    let text = format!(
        "Chương I\nQUY ĐỊNH CHUNG\n{}Chương II\nNHỮNG QUY ĐỊNH KHÁC\nChương III\nĐIỀU KHOẢN THI HÀNH\n{}",
        article(1, 400),
        article(2, 400)
    );
    let chunks = run_chunker(DocumentType::Law, &text, config(300, 2000));

    let ids = chunks.iter().map(|chunk| chunk.id.as_str()).collect::<Vec<&str>>();
    assert_eq!(
        ids,
        vec!["luat_01_dieu_1", "luat_01_chuong_ii_intro", "luat_01_dieu_2"]
    );
    assert_eq!(chunks[1].level, "intro");
    assert_eq!(chunks[1].text, "Chương II\nNHỮNG QUY ĐỊNH KHÁC");
    assert_eq!(chunks[1].hierarchy, vec!["Chương II"]);
    assert!(chunks[1].quality.merge_skipped);
    assert!(chunks[2].text.starts_with("[Chương III: ĐIỀU KHOẢN THI HÀNH]\n"));
}

#[test]
fn repeated_article_split_pieces_point_at_their_own_parent() {
    let mut text = String::new();
    for _ in 0..2 {
        text.push_str("Điều 5. Quyền và nghĩa vụ\n");
        for clause in 1..=4 {
            text.push_str(&format!("{clause}. {}\n", filler(600)));
        }
    }
    let chunks = run_chunker(DocumentType::Law, &text, config(300, 2000));

    assert_eq!(chunks.len(), 8);
    for chunk in &chunks[..4] {
        assert_eq!(chunk.parent_id.as_deref(), Some("luat_01_dieu_5"));
        assert!(chunk.id.starts_with("luat_01_dieu_5_khoan_"));
    }
    for chunk in &chunks[4..] {
        assert_eq!(chunk.parent_id.as_deref(), Some("luat_01_dieu_5_dup2"));
        assert!(chunk.id.starts_with("luat_01_dieu_5_dup2_khoan_"));
    }
    let ids = chunks.iter().map(|chunk| chunk.id.clone()).collect::<HashSet<String>>();
    assert_eq!(ids.len(), 8);
}

#[test]
fn over_token_limit_is_flagged_not_dropped() {
    let table = PatternTable::for_document_type(DocumentType::Law).expect("law table");
    let counter = TokenCounter::estimating("test-model", 4096);
    let text = format!("{}{}", article(1, 900), article(2, 400));
    let parsed = StructureParser::new(&table).parse(&text, &BTreeMap::new());
    let config = ChunkerConfig {
        min_chars: 300,
        max_chars: 2000,
        token_limit: Some(150),
    };

    let chunks = OptimalChunker::new(config, &table, &counter).chunk(&parsed.tree, "doc");
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].token_count > 150);
    assert!(chunks[0].quality.over_token_limit);
    assert!(!chunks[1].quality.over_token_limit);
}

#[test]
fn repeated_article_numbers_get_unique_ids() {
    let text = format!("{}{}", article(1, 400), article(1, 400));
    let chunks = run_chunker(DocumentType::Decree, &text, config(300, 2000));

    let ids = chunks.iter().map(|chunk| chunk.id.clone()).collect::<HashSet<String>>();
    assert_eq!(ids.len(), 2);
    assert_eq!(chunks[1].id, "luat_01_dieu_1_dup2");
}

#[test]
fn chunking_is_deterministic() {
    let mut text = String::from("Chương I\nQUY ĐỊNH CHUNG\n");
    text.push_str(&article(1, 100));
    text.push_str(&article(2, 150));
    text.push_str("Điều 3. Dài\n");
    for clause in 1..=4 {
        text.push_str(&format!("{clause}. {}\na) {}\n", filler(500), filler(120)));
    }

    let first = run_chunker(DocumentType::Law, &text, config(300, 2000));
    let second = run_chunker(DocumentType::Law, &text, config(300, 2000));
    assert_eq!(first, second);
}

#[test]
fn every_chunk_respects_size_bounds_unless_flagged() {
    let mut text = String::from("Căn cứ Luật Tổ chức Chính phủ;\nChương I\nPHẠM VI\n");
    text.push_str(&article(1, 60));
    text.push_str(&article(2, 800));
    text.push_str("Điều 3. Nhiều khoản\n");
    for clause in 1..=6 {
        text.push_str(&format!("{clause}. {}\n", filler(550)));
    }
    text.push_str("Chương II\nTỔ CHỨC THỰC HIỆN\n");
    text.push_str(&article(4, 2500));
    text.push_str("Điều 5. Nhiều dòng\n");
    for _ in 0..5 {
        text.push_str(&filler(700));
        text.push('\n');
    }
    text.push_str(&article(6, 90));
    text.push_str(&article(7, 95));

    let (min_chars, max_chars) = (300, 2000);
    let chunks = run_chunker(DocumentType::Law, &text, config(min_chars, max_chars));
    assert!(!chunks.is_empty());

    for chunk in &chunks {
        assert!(!chunk.text.is_empty());
        if chunk.char_count > max_chars {
            assert!(chunk.quality.split_exhausted, "{} oversized but not flagged", chunk.id);
        }
        if !chunk.quality.split_exhausted && !chunk.quality.merge_skipped {
            assert!(
                (min_chars..=max_chars).contains(&chunk.char_count),
                "{} has {} chars",
                chunk.id,
                chunk.char_count
            );
        }
    }

    let merged = chunks
        .iter()
        .find(|chunk| chunk.merged_with == vec!["luat_01_dieu_6", "luat_01_dieu_7"])
        .expect("articles 6 and 7 should merge");
    assert_eq!(merged.hierarchy, vec!["Chương II", "Điều 6"]);
}

#[test]
fn every_content_line_lands_in_some_chunk() {
    let mut text = String::from("Căn cứ Hiến pháp;\nChương I\nPHẠM VI\n");
    text.push_str("Điều 1. Phạm vi điều chỉnh\n");
    for clause in 1..=4 {
        text.push_str(&format!("{clause}. {}\nb) điểm {clause}\n", filler(700)));
    }
    text.push_str(&article(2, 200));

    let chunks = run_chunker(DocumentType::Law, &text, config(300, 2000));
    let joined = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<&str>>()
        .join("\n");

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line == "Chương I" || line == "PHẠM VI" {
            assert!(joined.contains("[Chương I: PHẠM VI]"));
            continue;
        }
        assert!(joined.contains(line), "line missing from chunks: {line}");
    }
}
