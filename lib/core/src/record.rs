use serde::{Deserialize, Serialize};
use std::fmt;

/// State label the shelter export uses for animals open to foster/adoption.
pub const AVAILABLE_STATE: &str = "임보가능";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Parse the gender column of the shelter export.
    ///
    /// Unrecognized labels (including the export's "성별미정") yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "남" | "수컷" | "수" | "male" | "m" => Some(Gender::Male),
            "여" | "암컷" | "암" | "female" | "f" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "수컷",
            Gender::Female => "암컷",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Availability state of a record. Serialized as the plain state label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdoptionState {
    Available,
    Other(String),
}

impl AdoptionState {
    pub fn as_str(&self) -> &str {
        match self {
            AdoptionState::Available => AVAILABLE_STATE,
            AdoptionState::Other(label) => label,
        }
    }
}

impl From<String> for AdoptionState {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed == AVAILABLE_STATE || trimmed.eq_ignore_ascii_case("available") {
            AdoptionState::Available
        } else {
            AdoptionState::Other(trimmed.to_string())
        }
    }
}

impl From<&str> for AdoptionState {
    fn from(raw: &str) -> Self {
        AdoptionState::from(raw.to_string())
    }
}

impl From<AdoptionState> for String {
    fn from(state: AdoptionState) -> Self {
        match state {
            AdoptionState::Available => AVAILABLE_STATE.to_string(),
            AdoptionState::Other(label) => label,
        }
    }
}

impl fmt::Display for AdoptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keep only finite, strictly positive weights.
pub fn clean_weight(weight_kg: f64) -> Option<f64> {
    (weight_kg.is_finite() && weight_kg > 0.0).then_some(weight_kg)
}

/// Parse a weight column such as `4.5` or `12kg`.
pub fn clean_weight_text(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace())
        .parse::<f64>()
        .ok()
        .and_then(clean_weight)
}

/// A sheltered animal as loaded from the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    /// Free-text age descriptor, usually a birth year such as "2023(추정)"
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub neuter: Option<String>,
    pub state: AdoptionState,
    #[serde(default)]
    pub care_type: Option<String>,
    /// Hashtag string as exported, e.g. "#애교쟁이#사람좋아"
    #[serde(default)]
    pub personality_tags: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub rescue_story: String,
    #[serde(default)]
    pub special_needs: String,
    #[serde(default)]
    pub daily_care: String,
    #[serde(default)]
    pub embedding_text: String,
}

impl AnimalRecord {
    pub fn new(uid: impl Into<String>, name: impl Into<String>, state: impl Into<AdoptionState>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            gender: None,
            weight_kg: None,
            age: String::new(),
            neuter: None,
            state: state.into(),
            care_type: None,
            personality_tags: String::new(),
            personality: String::new(),
            rescue_story: String::new(),
            special_needs: String::new(),
            daily_care: String::new(),
            embedding_text: String::new(),
        }
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    /// Sets the weight; invalid weights are stored as missing.
    pub fn with_weight(mut self, weight_kg: f64) -> Self {
        self.weight_kg = clean_weight(weight_kg);
        self
    }

    pub fn with_age(mut self, age: impl Into<String>) -> Self {
        self.age = age.into();
        self
    }

    pub fn with_neuter(mut self, neuter: impl Into<String>) -> Self {
        self.neuter = Some(neuter.into());
        self
    }

    pub fn with_care_type(mut self, care_type: impl Into<String>) -> Self {
        self.care_type = Some(care_type.into());
        self
    }

    pub fn with_personality_tags(mut self, tags: impl Into<String>) -> Self {
        self.personality_tags = tags.into();
        self
    }

    pub fn with_personality(mut self, text: impl Into<String>) -> Self {
        self.personality = text.into();
        self
    }

    pub fn with_rescue_story(mut self, text: impl Into<String>) -> Self {
        self.rescue_story = text.into();
        self
    }

    pub fn with_special_needs(mut self, text: impl Into<String>) -> Self {
        self.special_needs = text.into();
        self
    }

    pub fn with_daily_care(mut self, text: impl Into<String>) -> Self {
        self.daily_care = text.into();
        self
    }

    pub fn with_embedding_text(mut self, text: impl Into<String>) -> Self {
        self.embedding_text = text.into();
        self
    }

    pub fn is_available(&self) -> bool {
        self.state == AdoptionState::Available
    }

    /// Hashtags without the leading `#`, in export order.
    pub fn tags(&self) -> Vec<&str> {
        self.personality_tags
            .split('#')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse("남"), Some(Gender::Male));
        assert_eq!(Gender::parse(" 수컷 "), Some(Gender::Male));
        assert_eq!(Gender::parse("Female"), Some(Gender::Female));
        assert_eq!(Gender::parse("여"), Some(Gender::Female));
        assert_eq!(Gender::parse("성별미정"), None);
        assert_eq!(Gender::parse(""), None);
    }

    #[test]
    fn test_clean_weight() {
        assert_eq!(clean_weight(4.5), Some(4.5));
        assert_eq!(clean_weight(0.0), None);
        assert_eq!(clean_weight(-3.0), None);
        assert_eq!(clean_weight(f64::NAN), None);
        assert_eq!(clean_weight(f64::INFINITY), None);

        assert_eq!(clean_weight_text(" 12kg "), Some(12.0));
        assert_eq!(clean_weight_text("3.2 KG"), Some(3.2));
        assert_eq!(clean_weight_text("몸무게미정"), None);
        assert_eq!(clean_weight_text("-1"), None);
    }

    #[test]
    fn test_adoption_state_roundtrip() {
        assert_eq!(AdoptionState::from("임보가능"), AdoptionState::Available);
        assert_eq!(AdoptionState::from("available"), AdoptionState::Available);
        assert_eq!(
            AdoptionState::from("입양완료"),
            AdoptionState::Other("입양완료".to_string())
        );

        let json = serde_json::to_string(&AdoptionState::Available).unwrap();
        assert_eq!(json, "\"임보가능\"");
        let parsed: AdoptionState = serde_json::from_str("\"입양완료\"").unwrap();
        assert_eq!(parsed.as_str(), "입양완료");
    }

    #[test]
    fn test_record_builder() {
        let record = AnimalRecord::new("42", "초코", AdoptionState::Available)
            .with_gender(Gender::Male)
            .with_weight(-1.0)
            .with_personality_tags("#애교쟁이# 사람좋아 ##");

        assert!(record.is_available());
        assert_eq!(record.weight_kg, None);
        assert_eq!(record.tags(), vec!["애교쟁이", "사람좋아"]);
    }

    #[test]
    fn test_record_deserialize_defaults() {
        let record: AnimalRecord = serde_json::from_str(
            r#"{"uid": "7", "name": "보리", "state": "입양완료", "weight_kg": 12.0}"#,
        )
        .unwrap();
        assert_eq!(record.gender, None);
        assert_eq!(record.weight_kg, Some(12.0));
        assert!(!record.is_available());
        assert!(record.personality.is_empty());
    }
}
