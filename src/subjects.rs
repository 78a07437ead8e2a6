use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("國", "國文"),
    ("英", "英文"),
    ("自", "自然"),
    ("社", "社會"),
    ("物", "物理"),
    ("化", "化學"),
    ("生", "生物"),
    ("歷", "歷史"),
    ("地", "地理"),
    ("公", "公民"),
    ("數甲", "數甲"),
    ("數乙", "數乙"),
    ("數A", "數A"),
    ("數B", "數B"),
];

// Checked in order, the first contained fragment wins.
const DEFAULT_REPLACEMENTS: &[(&str, &str)] = &[
    ("公民與社會", "公民"),
    ("數學A", "數A"),
    ("數學B", "數B"),
    ("數學甲", "數甲"),
    ("數學乙", "數乙"),
    ("國文", "國文"),
    ("英文", "英文"),
    ("物理", "物理"),
    ("化學", "化學"),
    ("生物", "生物"),
    ("歷史", "歷史"),
    ("地理", "地理"),
];

/// Subject naming tables shared by both CSV importers.
///
/// Exam criteria use one or two character abbreviations while the score
/// distribution lists long official names; both are folded onto the same
/// canonical names so that subject sets from the two sources compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectVocabulary {
    pub abbreviations: BTreeMap<String, String>,
    pub replacements: Vec<(String, String)>,
}

impl Default for SubjectVocabulary {
    fn default() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS
                .iter()
                .map(|(abbr, name)| (abbr.to_string(), name.to_string()))
                .collect(),
            replacements: DEFAULT_REPLACEMENTS
                .iter()
                .map(|(full, name)| (full.to_string(), name.to_string()))
                .collect(),
        }
    }
}

impl SubjectVocabulary {
    /// Expand an exam-criteria abbreviation; unknown abbreviations are kept as-is.
    pub fn expand_abbreviation(&self, abbr: &str) -> String {
        self.abbreviations
            .get(abbr)
            .cloned()
            .unwrap_or_else(|| abbr.to_string())
    }

    /// Fold an official distribution subject name onto its canonical name.
    pub fn canonical_name(&self, subject: &str) -> String {
        self.replacements
            .iter()
            .find(|(fragment, _)| subject.contains(fragment.as_str()))
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| subject.to_string())
    }
}
