//! 严重程度分级
//!
//! 预测服务公布的标签词表先查表；词表外的标签退回到按疾病的模式匹配，并记录警告。

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use crate::models::{Disease, Severity};

/// 预测服务标签词表
const LABEL_TABLE: &[(Disease, &str, Severity)] = &[
    (Disease::Alzheimer, "Non Demented", Severity::Low),
    (Disease::Alzheimer, "Very Mild Demented", Severity::Moderate),
    (Disease::Alzheimer, "Mild Demented", Severity::Moderate),
    (Disease::Alzheimer, "Moderate Demented", Severity::High),
    (Disease::Tumor, "No Tumor", Severity::Low),
    (Disease::Tumor, "Tumor Detected", Severity::High),
    (Disease::Parkinsons, "No Parkinson's", Severity::Low),
    (Disease::Parkinsons, "Parkinson's", Severity::High),
];

struct FallbackRules {
    non_demented: Regex,
    mild: Regex,
    no_tumor: Regex,
    no_parkinson: Regex,
    high: Regex,
    moderate: Regex,
}

fn rules() -> &'static FallbackRules {
    static RULES: OnceLock<FallbackRules> = OnceLock::new();
    RULES.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("static severity pattern");
        FallbackRules {
            non_demented: re(r"(?i)non\s*demented"),
            mild: re(r"(?i)very mild|mild"),
            no_tumor: re(r"(?i)no\s*tumou?r"),
            no_parkinson: re(r"(?i)no\s*parkinson"),
            high: re(r"(?i)high|severe"),
            moderate: re(r"(?i)moderate|medium"),
        }
    })
}

/// 查表，命中返回对应等级
pub fn lookup(disease: Disease, label: &str) -> Option<Severity> {
    let label = label.trim();
    LABEL_TABLE
        .iter()
        .find(|(d, l, _)| *d == disease && l.eq_ignore_ascii_case(label))
        .map(|(_, _, s)| *s)
}

/// 根据预测标签推导严重程度
pub fn classify(disease: Disease, label: &str) -> Severity {
    if let Some(severity) = lookup(disease, label) {
        return severity;
    }

    warn!(
        "Label '{}' is not in the {} vocabulary, using pattern fallback",
        label,
        disease.as_str()
    );

    let rules = rules();
    match disease {
        Disease::Alzheimer => {
            if rules.non_demented.is_match(label) {
                Severity::Low
            } else if rules.mild.is_match(label) {
                Severity::Moderate
            } else {
                Severity::High
            }
        }
        Disease::Tumor => {
            if rules.no_tumor.is_match(label) {
                Severity::Low
            } else {
                Severity::High
            }
        }
        Disease::Parkinsons => {
            if rules.no_parkinson.is_match(label) {
                Severity::Low
            } else {
                Severity::High
            }
        }
    }
}

/// 非影像类检测的通用规则，未识别的标签为 Low
pub fn classify_free_form(label: &str) -> Severity {
    let rules = rules();
    if rules.high.is_match(label) {
        Severity::High
    } else if rules.moderate.is_match(label) {
        Severity::Moderate
    } else {
        Severity::Low
    }
}

/// 按 testType 选择规则
pub fn classify_test(test_type: &str, label: &str) -> Severity {
    match Disease::from_segment(test_type) {
        Some(disease) => classify(disease, label),
        None => classify_free_form(label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alzheimer_vocabulary() {
        assert_eq!(classify(Disease::Alzheimer, "Non Demented"), Severity::Low);
        assert_eq!(classify(Disease::Alzheimer, "Very Mild Demented"), Severity::Moderate);
        assert_eq!(classify(Disease::Alzheimer, "Mild Demented"), Severity::Moderate);
        assert_eq!(classify(Disease::Alzheimer, "Moderate Demented"), Severity::High);
    }

    #[test]
    fn test_tumor_and_parkinson_vocabulary() {
        assert_eq!(classify(Disease::Tumor, "No Tumor"), Severity::Low);
        assert_eq!(classify(Disease::Tumor, "Tumor Detected"), Severity::High);
        assert_eq!(classify(Disease::Parkinsons, "No Parkinson's"), Severity::Low);
        assert_eq!(classify(Disease::Parkinsons, "Parkinson's"), Severity::High);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup(Disease::Tumor, " no tumor "), Some(Severity::Low));
        assert_eq!(lookup(Disease::Tumor, "Glioma"), None);
    }

    #[test]
    fn test_pattern_fallback() {
        assert_eq!(classify(Disease::Alzheimer, "NonDemented"), Severity::Low);
        assert_eq!(classify(Disease::Alzheimer, "mild cognitive"), Severity::Moderate);
        assert_eq!(classify(Disease::Alzheimer, "Class 7"), Severity::High);
        assert_eq!(classify(Disease::Tumor, "No tumour seen"), Severity::Low);
        assert_eq!(classify(Disease::Parkinsons, "Healthy"), Severity::High);
        assert_eq!(classify(Disease::Parkinsons, "No Parkinsons"), Severity::Low);
    }

    #[test]
    fn test_free_form() {
        assert_eq!(classify_free_form("Severe anemia"), Severity::High);
        assert_eq!(classify_free_form("medium risk"), Severity::Moderate);
        assert_eq!(classify_free_form("Normal"), Severity::Low);
        assert_eq!(classify_test("blood", "HIGH glucose"), Severity::High);
        assert_eq!(classify_test("tumor", "No Tumor"), Severity::Low);
    }
}
