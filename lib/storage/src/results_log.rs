use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pawmatch_similarity::Recommendation;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("satisfaction must be between 1 and 5, got {0}")]
pub struct InvalidSatisfaction(pub u8);

/// A user rating from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Satisfaction(u8);

impl Satisfaction {
    pub fn new(value: u8) -> std::result::Result<Self, InvalidSatisfaction> {
        Self::try_from(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Satisfaction {
    type Error = InvalidSatisfaction;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidSatisfaction(value))
        }
    }
}

impl From<Satisfaction> for u8 {
    fn from(s: Satisfaction) -> Self {
        s.0
    }
}

/// One row of the results log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub query_id: Uuid,
    pub query: String,
    /// 0 when the query produced no recommendations
    pub rank: usize,
    pub name: Option<String>,
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub satisfaction: Option<Satisfaction>,
}

/// Append-only JSON Lines log of served recommendations and their ratings.
pub struct ResultsLog {
    file: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl ResultsLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open results log {}", path.display()))?;

        Ok(Self {
            file: Mutex::new(BufWriter::new(file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let line = serde_json::to_vec(entry)?;
        let mut writer = self.file.lock();
        writer.write_all(&line)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Log one row per recommendation under a fresh query id.
    ///
    /// An empty result still gets a single row so the rating is kept.
    pub fn record(
        &self,
        query: &str,
        recommendations: &[Recommendation],
        satisfaction: Option<Satisfaction>,
    ) -> Result<Uuid> {
        let query_id = Uuid::new_v4();
        let timestamp = Utc::now();
        let row = |rank, name, reason, uid| LogEntry {
            timestamp,
            query_id,
            query: query.to_string(),
            rank,
            name,
            reason,
            uid,
            satisfaction,
        };

        if recommendations.is_empty() {
            self.append(&row(0, None, None, None))?;
        }
        for rec in recommendations {
            self.append(&row(rec.rank, rec.name.clone(), rec.reason.clone(), rec.uid.clone()))?;
        }

        debug!(query_id = %query_id, rows = recommendations.len().max(1), "results logged");
        Ok(query_id)
    }

    /// Read every row back, in write order.
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        self.file.lock().flush()?;
        let file = File::open(&self.path)?;
        let mut entries = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line)
                .with_context(|| format!("Malformed results log line {}", n + 1))?;
            entries.push(entry);
        }
        Ok(entries)
    }
}
