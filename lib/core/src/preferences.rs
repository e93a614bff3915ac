use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::Gender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn label(&self) -> &'static str {
        match self {
            SizeClass::Small => "소형",
            SizeClass::Medium => "중형",
            SizeClass::Large => "대형",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeClass {
    Young,
    Senior,
}

/// Hard constraints parsed from a query, plus the query itself.
///
/// `None` on an axis means "no constraint", never a default value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPreferences {
    pub size: Option<SizeClass>,
    pub age: Option<AgeClass>,
    pub gender: Option<Gender>,
    pub text: String,
}

impl QueryPreferences {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn has_constraints(&self) -> bool {
        self.size.is_some() || self.age.is_some() || self.gender.is_some()
    }
}

/// Keyword lists per constraint value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub small: Vec<String>,
    pub medium: Vec<String>,
    pub large: Vec<String>,
    pub young: Vec<String>,
    pub senior: Vec<String>,
    pub male: Vec<String>,
    pub female: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for Vocabulary {
    /// The single-syllable `남` and `여` are the gender labels of the shelter
    /// export, so queries copied from it match. Hangul keywords match as plain
    /// substrings, which means these two also fire inside words such as `여러`
    /// or `여유`. Configure a vocabulary without them when that matters.
    fn default() -> Self {
        Self {
            small: words(&["소형견", "소형", "작은", "small"]),
            medium: words(&["중형견", "중형", "중간", "medium"]),
            large: words(&["대형견", "대형", "큰", "large", "big"]),
            young: words(&["어린", "새끼", "젊은", "young", "puppy"]),
            senior: words(&["나이많은", "고령", "시니어", "senior", "old"]),
            male: words(&["수컷", "남자", "남", "male", "boy"]),
            female: words(&["암컷", "여자", "여", "female", "girl"]),
        }
    }
}

/// Keyword-based preference extraction. Pure and infallible.
#[derive(Debug, Clone, Default)]
pub struct PreferenceExtractor {
    vocabulary: Vocabulary,
}

impl PreferenceExtractor {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn extract(&self, query: &str) -> QueryPreferences {
        let haystack = query.to_lowercase();
        let vocab = &self.vocabulary;

        QueryPreferences {
            size: first_match(
                &haystack,
                &[
                    (SizeClass::Small, &vocab.small),
                    (SizeClass::Medium, &vocab.medium),
                    (SizeClass::Large, &vocab.large),
                ],
            ),
            age: first_match(
                &haystack,
                &[(AgeClass::Young, &vocab.young), (AgeClass::Senior, &vocab.senior)],
            ),
            gender: first_match(
                &haystack,
                &[(Gender::Male, &vocab.male), (Gender::Female, &vocab.female)],
            ),
            text: query.to_string(),
        }
    }
}

/// First class, in declared order, with any keyword present in `haystack`.
fn first_match<T: Copy>(haystack: &str, table: &[(T, &Vec<String>)]) -> Option<T> {
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| contains_keyword(haystack, k)))
        .map(|(class, _)| *class)
}

/// Case-insensitive keyword test. ASCII keywords must sit on word boundaries.
pub fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    if !keyword.is_ascii() {
        return haystack.contains(&keyword);
    }

    haystack.match_indices(&keyword).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + keyword.len()..].chars().next();
        !before.is_some_and(is_ascii_word) && !after.is_some_and(is_ascii_word)
    })
}

fn is_ascii_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Strip symbols from a query before embedding and collapse whitespace.
///
/// Letters and digits of any script survive, as do `.,!?`.
pub fn normalize_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?') {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_korean_query() {
        let extractor = PreferenceExtractor::default();
        let prefs = extractor.extract("소형견 수컷");
        assert_eq!(prefs.size, Some(SizeClass::Small));
        assert_eq!(prefs.gender, Some(Gender::Male));
        assert_eq!(prefs.age, None);
        assert_eq!(prefs.text, "소형견 수컷");
    }

    #[test]
    fn test_size_precedence() {
        let extractor = PreferenceExtractor::default();
        let prefs = extractor.extract("대형견도 괜찮지만 작은 아이면 좋겠어요");
        assert_eq!(prefs.size, Some(SizeClass::Small));
    }

    #[test]
    fn test_unmatched_axes_stay_unset() {
        let extractor = PreferenceExtractor::default();
        let prefs = extractor.extract("조용하고 차분한 성격");
        assert!(!prefs.has_constraints());
        assert_eq!(prefs, QueryPreferences::new("조용하고 차분한 성격"));
    }

    #[test]
    fn test_english_word_boundaries() {
        let extractor = PreferenceExtractor::default();
        let prefs = extractor.extract("A calm FEMALE senior dog");
        assert_eq!(prefs.gender, Some(Gender::Female));
        assert_eq!(prefs.age, Some(AgeClass::Senior));
        assert_eq!(prefs.size, None);

        assert!(!contains_keyword("bigger yard", "big"));
        assert!(contains_keyword("a big, friendly dog", "big"));
        assert!(!contains_keyword("anything", "  "));
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocab = Vocabulary {
            small: vec!["toy".to_string()],
            ..Vocabulary::default()
        };
        let prefs = PreferenceExtractor::new(vocab).extract("toy poodle");
        assert_eq!(prefs.size, Some(SizeClass::Small));
    }

    #[test]
    fn test_single_syllable_gender_keywords() {
        let query = "여러 마리 중 활발한 아이";
        let prefs = PreferenceExtractor::default().extract(query);
        assert_eq!(prefs.gender, Some(Gender::Female));

        let vocab = Vocabulary {
            male: vec!["수컷".to_string(), "남자".to_string()],
            female: vec!["암컷".to_string(), "여자".to_string()],
            ..Vocabulary::default()
        };
        let prefs = PreferenceExtractor::new(vocab).extract(query);
        assert_eq!(prefs.gender, None);
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  활발한♥ 강아지!!  @@ 원해요 "), "활발한 강아지!! 원해요");
        assert_eq!(normalize_query("small, calm dog."), "small, calm dog.");
        assert_eq!(normalize_query("###"), "");
    }
}
