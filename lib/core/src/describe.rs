//! Natural-language descriptions of records.
//!
//! [`DescriptionBuilder::embedding_text`] produces the text a record is
//! embedded from; [`DescriptionBuilder::prompt_description`] produces the
//! bounded summary placed in a re-ranking prompt.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::filter::size_class;
use crate::record::AnimalRecord;

pub const DEFAULT_MAX_CHARS: usize = 30_000;
pub const DEFAULT_FIELD_BUDGET: usize = 200;

const ELLIPSIS: &str = "...";

/// Cut `text` to at most `budget` chars, appending `...` when anything was cut.
pub fn truncate_chars(text: &str, budget: usize) -> Cow<'_, str> {
    match text.char_indices().nth(budget) {
        None => Cow::Borrowed(text),
        Some((byte_end, _)) => Cow::Owned(format!("{}{}", &text[..byte_end], ELLIPSIS)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Section {
    Basic,
    Status,
    Tags,
    Personality,
    RescueStory,
    SpecialNeeds,
    DailyCare,
}

impl Section {
    fn is_essential(&self) -> bool {
        matches!(
            self,
            Section::Basic | Section::Status | Section::Tags | Section::Personality
        )
    }
}

/// Which supplementary sections give way first when a description is over budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationOrder {
    /// Drop rescue story, special needs and daily care together.
    #[default]
    EssentialOnly,
    /// Drop daily care, then special needs, then rescue story.
    PreferRescueStory,
    /// Drop daily care, then rescue story, then special needs.
    PreferSpecialNeeds,
}

impl TruncationOrder {
    /// Groups of sections removed together, in removal order.
    fn drop_order(&self) -> &'static [&'static [Section]] {
        match self {
            TruncationOrder::EssentialOnly => {
                &[&[Section::RescueStory, Section::SpecialNeeds, Section::DailyCare]]
            }
            TruncationOrder::PreferRescueStory => &[
                &[Section::DailyCare],
                &[Section::SpecialNeeds],
                &[Section::RescueStory],
            ],
            TruncationOrder::PreferSpecialNeeds => &[
                &[Section::DailyCare],
                &[Section::RescueStory],
                &[Section::SpecialNeeds],
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptionConfig {
    pub max_chars: usize,
    pub field_budget: usize,
    pub truncation: TruncationOrder,
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            field_budget: DEFAULT_FIELD_BUDGET,
            truncation: TruncationOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeStage {
    Young,
    YoungAdult,
    MiddleAged,
    Senior,
}

impl LifeStage {
    pub fn label(&self) -> &'static str {
        match self {
            LifeStage::Young => "어린 나이",
            LifeStage::YoungAdult => "청년기",
            LifeStage::MiddleAged => "중년기",
            LifeStage::Senior => "노령기",
        }
    }
}

/// First four-digit number in the age text.
pub fn birth_year(age_text: &str) -> Option<u16> {
    age_text
        .split(|c: char| !c.is_ascii_digit())
        .find(|token| token.len() == 4)
        .and_then(|token| token.parse().ok())
}

pub fn life_stage(age_text: &str) -> Option<LifeStage> {
    match birth_year(age_text)? {
        2023..=2024 => Some(LifeStage::Young),
        2020..=2022 => Some(LifeStage::YoungAdult),
        2017..=2019 => Some(LifeStage::MiddleAged),
        2013..=2016 => Some(LifeStage::Senior),
        _ => None,
    }
}

fn or_missing<'a>(value: &'a str, missing: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        missing
    } else {
        value
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescriptionBuilder {
    config: DescriptionConfig,
}

impl DescriptionBuilder {
    pub fn new(config: DescriptionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DescriptionConfig {
        &self.config
    }

    fn sections(&self, record: &AnimalRecord) -> Vec<(Section, String)> {
        let mut parts = Vec::with_capacity(7);

        let gender = record.gender.map(|g| g.label()).unwrap_or("성별미정");
        let weight = record
            .weight_kg
            .map(|w| format!("{}kg", w))
            .unwrap_or_else(|| "몸무게미정".to_string());
        let size = size_class(record.weight_kg)
            .map(|s| s.label())
            .unwrap_or("크기미정");
        let mut basic = format!(
            "{}는 {}이고 몸무게 {}인 {} 동물입니다.",
            or_missing(&record.name, "이름미정"),
            gender,
            weight,
            size
        );
        if !record.age.trim().is_empty() {
            match life_stage(&record.age) {
                Some(stage) => basic.push_str(&format!(" 나이는 {}({})입니다.", record.age.trim(), stage.label())),
                None => basic.push_str(&format!(" 나이는 {}입니다.", record.age.trim())),
            }
        }
        parts.push((Section::Basic, basic));

        if let Some(care_type) = record.care_type.as_deref().filter(|k| !k.trim().is_empty()) {
            parts.push((
                Section::Status,
                format!("현재 {} 상태이며 {}로 분류됩니다.", record.state, care_type.trim()),
            ));
        }

        let tags = record.tags();
        if !tags.is_empty() {
            parts.push((Section::Tags, format!("성격 특징은 {} 입니다.", tags.join(", "))));
        }

        let free_text = [
            (Section::Personality, "성격 설명", &record.personality),
            (Section::RescueStory, "구조 배경", &record.rescue_story),
            (Section::SpecialNeeds, "특별 요구사항", &record.special_needs),
            (Section::DailyCare, "일상 관리", &record.daily_care),
        ];
        for (section, label, text) in free_text {
            let text = text.trim();
            if !text.is_empty() {
                parts.push((section, format!("{}: {}", label, text)));
            }
        }

        parts
    }

    /// Text a record's embedding is computed from.
    pub fn embedding_text(&self, record: &AnimalRecord) -> String {
        let mut parts = self.sections(record);
        let max = self.config.max_chars;

        let joined = |parts: &[(Section, String)]| {
            parts.iter().map(|(_, text)| text.as_str()).collect::<Vec<_>>().join(" ")
        };

        let mut text = joined(&parts);
        if text.chars().count() <= max {
            return text;
        }

        for group in self.config.truncation.drop_order() {
            parts.retain(|(section, _)| !group.contains(section));
            text = joined(&parts);
            if text.chars().count() <= max {
                return text;
            }
        }

        debug_assert!(parts.iter().all(|(section, _)| section.is_essential()));
        truncate_chars(&text, max).into_owned()
    }

    /// Bounded summary of a record for a re-ranking prompt.
    pub fn prompt_description(&self, record: &AnimalRecord) -> String {
        let budget = self.config.field_budget;
        let mut fields = Vec::new();

        let mut profile = Vec::new();
        if let Some(gender) = record.gender {
            profile.push(gender.label().to_string());
        }
        if let Some(w) = record.weight_kg {
            let size = size_class(Some(w)).map(|s| s.label()).unwrap_or("크기미정");
            profile.push(format!("{}kg({})", w, size));
        }
        if !record.age.trim().is_empty() {
            profile.push(format!("나이 {}", truncate_chars(record.age.trim(), budget)));
        }
        if let Some(neuter) = record.neuter.as_deref().filter(|n| !n.trim().is_empty()) {
            profile.push(format!("중성화 {}", neuter.trim()));
        }
        if !profile.is_empty() {
            fields.push(profile.join(", "));
        }

        let tags = record.tags();
        if !tags.is_empty() {
            fields.push(format!("성격 태그: {}", truncate_chars(&tags.join(", "), budget)));
        }
        let free_text = [
            ("성격", &record.personality),
            ("구조 배경", &record.rescue_story),
            ("특별 요구사항", &record.special_needs),
        ];
        for (label, text) in free_text {
            let text = text.trim();
            if !text.is_empty() {
                fields.push(format!("{}: {}", label, truncate_chars(text, budget)));
            }
        }

        fields.join(" / ")
    }
}
