// CSV loader for the shelter export
use anyhow::{Context, Result};
use pawmatch_core::{clean_weight_text, AdoptionState, AnimalRecord, Gender};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Name used when the export has none.
pub const UNNAMED: &str = "이름미정";
const UNKNOWN_STATE: &str = "상태미정";

/// One row of the export. Unlisted columns are ignored.
#[derive(Debug, Deserialize)]
struct RawAnimalRow {
    #[serde(default)]
    uid: Option<String>,
    #[serde(rename = "addinfo01", default)]
    name: Option<String>,
    #[serde(rename = "addinfo03", default)]
    gender: Option<String>,
    #[serde(rename = "addinfo04", default)]
    neuter: Option<String>,
    #[serde(rename = "addinfo05", default)]
    age: Option<String>,
    #[serde(rename = "addinfo07", default)]
    weight: Option<String>,
    #[serde(rename = "addinfo08", default)]
    personality_tags: Option<String>,
    #[serde(rename = "addinfo09", default)]
    rescue_story: Option<String>,
    #[serde(rename = "addinfo10", default)]
    personality: Option<String>,
    #[serde(rename = "addinfo16", default)]
    special_needs: Option<String>,
    #[serde(rename = "addinfo20", default)]
    daily_care: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
}

impl RawAnimalRow {
    fn into_record(self, uid: String) -> AnimalRecord {
        let mut record = AnimalRecord::new(
            uid,
            non_blank(self.name).unwrap_or_else(|| UNNAMED.to_string()),
            AdoptionState::from(non_blank(self.state).unwrap_or_else(|| UNKNOWN_STATE.to_string())),
        );
        record.gender = non_blank(self.gender).as_deref().and_then(Gender::parse);
        record.weight_kg = non_blank(self.weight).as_deref().and_then(clean_weight_text);
        record.age = non_blank(self.age).unwrap_or_default();
        record.neuter = non_blank(self.neuter);
        record.care_type = non_blank(self.kind);
        record.personality_tags = non_blank(self.personality_tags).unwrap_or_default();
        record.personality = non_blank(self.personality).unwrap_or_default();
        record.rescue_story = non_blank(self.rescue_story).unwrap_or_default();
        record.special_needs = non_blank(self.special_needs).unwrap_or_default();
        record.daily_care = non_blank(self.daily_care).unwrap_or_default();
        record
    }
}

/// Parse export rows. Rows without a uid and repeated uids are skipped.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<AnimalRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for (row, result) in csv_reader.deserialize::<RawAnimalRow>().enumerate() {
        let raw = result.with_context(|| format!("Failed to parse CSV row {}", row + 1))?;
        let Some(uid) = non_blank(raw.uid.clone()) else {
            warn!(row = row + 1, "skipping row without uid");
            continue;
        };
        if !seen.insert(uid.clone()) {
            warn!(row = row + 1, uid = %uid, "skipping duplicate uid");
            continue;
        }
        records.push(raw.into_record(uid));
    }

    Ok(records)
}

pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<AnimalRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open dataset {}", path.display()))?;
    let records = read_records(file)?;
    info!(
        path = %path.display(),
        records = records.len(),
        available = records.iter().filter(|r| r.is_available()).count(),
        "dataset loaded"
    );
    Ok(records)
}
