const IDEAL_LINE_MIN: f64 = 80.0;
const IDEAL_LINE_MAX: f64 = 120.0;

const TAG_KEYWORDS: &[(&str, &[&str])] = &[
    ("scope", &["phạm vi điều chỉnh", "đối tượng áp dụng"]),
    ("definition", &["giải thích từ ngữ", "được hiểu như sau", "là việc", "định nghĩa"]),
    ("rights_obligations", &["quyền và nghĩa vụ", "nghĩa vụ", "có quyền"]),
    ("prohibition", &["nghiêm cấm", "hành vi bị cấm", "không được"]),
    ("penalty", &["xử phạt", "vi phạm", "phạt tiền", "truy cứu trách nhiệm"]),
    ("authority", &["thẩm quyền", "cơ quan nhà nước", "bộ trưởng", "ủy ban nhân dân"]),
    ("procedure", &["thủ tục", "hồ sơ", "trình tự", "thời hạn"]),
    ("finance", &["lệ phí", "phí", "ngân sách", "thuế"]),
    ("effectiveness", &["hiệu lực thi hành", "có hiệu lực", "bãi bỏ"]),
    ("transition", &["chuyển tiếp", "điều khoản chuyển tiếp"]),
];

/// Keyword tags in table order, each at most once.
pub fn semantic_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TAG_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// 1.0 when the average non-empty line length sits in the ideal band, decaying
/// proportionally outside it. Empty text scores 0.
pub fn readability_score(text: &str) -> f64 {
    let lengths = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.chars().count() as f64)
        .collect::<Vec<f64>>();

    if lengths.is_empty() {
        return 0.0;
    }

    let average = lengths.iter().sum::<f64>() / lengths.len() as f64;
    let score = if average < IDEAL_LINE_MIN {
        average / IDEAL_LINE_MIN
    } else if average > IDEAL_LINE_MAX {
        IDEAL_LINE_MAX / average
    } else {
        1.0
    };

    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_follow_keyword_table_order() {
        let tags = semantic_tags("Điều 3. Xử phạt vi phạm\nThẩm quyền xử phạt thuộc Ủy ban nhân dân.");
        assert_eq!(tags, vec!["penalty", "authority"]);
        assert!(semantic_tags("Nội dung chung.").is_empty());
    }

    #[test]
    fn readability_rewards_ideal_line_length() {
        assert_eq!(readability_score(&"x".repeat(100)), 1.0);
        assert_eq!(readability_score(&"x".repeat(40)), 0.5);
        assert_eq!(readability_score(&"x".repeat(240)), 0.5);
        assert_eq!(readability_score("\n\n"), 0.0);
    }
}
