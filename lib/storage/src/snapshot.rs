// Corpus snapshots: gzip-compressed JSON with a SHA-256 sidecar
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use pawmatch_core::{AnimalRecord, Corpus, EmbeddingVector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SNAPSHOT_EXT: &str = "snapshot";
const CHECKSUM_EXT: &str = "sha256";

/// Snapshot description for listings and API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub uid: String,
    pub vector: Vec<f32>,
}

/// Everything needed to rebuild a [`Corpus`] without calling the embedding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    pub model: String,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
    pub records: Vec<AnimalRecord>,
    pub embeddings: Vec<StoredEmbedding>,
    /// uids whose embedding is a zero-vector placeholder
    #[serde(default)]
    pub failed: Vec<String>,
}

impl CorpusSnapshot {
    pub fn new(
        model: impl Into<String>,
        records: Vec<AnimalRecord>,
        embeddings: Vec<EmbeddingVector>,
        failed: Vec<String>,
    ) -> Self {
        let dimension = embeddings.first().map(EmbeddingVector::dim).unwrap_or(0);
        let embeddings = embeddings
            .into_iter()
            .map(|e| StoredEmbedding {
                uid: e.source().to_string(),
                vector: e.into_inner(),
            })
            .collect();
        Self {
            model: model.into(),
            dimension,
            created_at: Utc::now(),
            records,
            embeddings,
            failed,
        }
    }

    pub fn from_corpus(model: impl Into<String>, corpus: &Corpus) -> Self {
        let failed = corpus
            .records()
            .iter()
            .filter(|r| corpus.is_pending(&r.uid))
            .map(|r| r.uid.clone())
            .collect();
        Self::new(
            model,
            corpus.records().to_vec(),
            corpus.embeddings().to_vec(),
            failed,
        )
    }

    /// Validate alignment and rebuild the corpus.
    pub fn into_corpus(self) -> Result<Corpus> {
        if self.embeddings.iter().any(|e| e.vector.len() != self.dimension) {
            return Err(anyhow!(
                "Snapshot declares dimension {} but holds vectors of another size",
                self.dimension
            ));
        }
        let embeddings = self
            .embeddings
            .into_iter()
            .map(|e| EmbeddingVector::new(e.uid, e.vector))
            .collect();
        let corpus = Corpus::new(self.records, embeddings).context("Snapshot failed validation")?;
        Ok(corpus.with_pending(self.failed))
    }
}

fn checksum_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn file_time(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let secs = modified.duration_since(std::time::UNIX_EPOCH).ok()?.as_secs();
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

pub struct SnapshotStore {
    snapshot_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)
            .with_context(|| format!("Failed to create snapshot dir {}", snapshot_dir.display()))?;
        Ok(Self { snapshot_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.snapshot_dir
    }

    /// Generate snapshot filename with timestamp
    fn generate_snapshot_name() -> String {
        format!(
            "corpus-{}.{}",
            Utc::now().format("%Y-%m-%d-%H-%M-%S-%3f"),
            SNAPSHOT_EXT
        )
    }

    fn checksum_path(snapshot_path: &Path) -> PathBuf {
        let mut name = snapshot_path.as_os_str().to_owned();
        name.push(".");
        name.push(CHECKSUM_EXT);
        PathBuf::from(name)
    }

    pub fn save(&self, snapshot: &CorpusSnapshot) -> Result<SnapshotDescription> {
        let name = Self::generate_snapshot_name();
        let path = self.snapshot_dir.join(&name);

        let json_data = serde_json::to_vec(snapshot)?;
        let file = File::create(&path)
            .with_context(|| format!("Failed to create snapshot {}", path.display()))?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        encoder.write_all(&json_data)?;
        encoder.finish()?.flush()?;

        let file_data = fs::read(&path)?;
        let checksum = checksum_hex(&file_data);
        fs::write(Self::checksum_path(&path), &checksum)?;

        info!(
            snapshot = %name,
            records = snapshot.records.len(),
            failed = snapshot.failed.len(),
            bytes = file_data.len(),
            "corpus snapshot written"
        );

        Ok(SnapshotDescription {
            name,
            creation_time: file_time(&path),
            size: file_data.len() as u64,
            checksum: Some(checksum),
        })
    }

    pub fn load(&self, name: &str) -> Result<CorpusSnapshot> {
        let path = self.snapshot_dir.join(name);
        if !path.exists() {
            return Err(anyhow!("Snapshot '{}' not found in {}", name, self.snapshot_dir.display()));
        }
        Self::load_path(&path)
    }

    /// Load a snapshot file, verifying its sidecar checksum when present.
    pub fn load_path(path: &Path) -> Result<CorpusSnapshot> {
        let file_data =
            fs::read(path).with_context(|| format!("Failed to read snapshot {}", path.display()))?;

        let checksum_path = Self::checksum_path(path);
        if checksum_path.exists() {
            let expected = fs::read_to_string(&checksum_path)?;
            let actual = checksum_hex(&file_data);
            if expected.trim() != actual {
                return Err(anyhow!(
                    "Checksum mismatch for {}: expected {}, got {}",
                    path.display(),
                    expected.trim(),
                    actual
                ));
            }
        } else {
            debug!(path = %path.display(), "no checksum sidecar, skipping verification");
        }

        let mut decoder = GzDecoder::new(file_data.as_slice());
        let mut json_data = Vec::new();
        decoder.read_to_end(&mut json_data)?;

        let snapshot: CorpusSnapshot = serde_json::from_slice(&json_data)
            .with_context(|| format!("Malformed snapshot {}", path.display()))?;
        Ok(snapshot)
    }

    /// List snapshots, newest first
    pub fn list(&self) -> Result<Vec<SnapshotDescription>> {
        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.snapshot_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                let checksum = fs::read_to_string(Self::checksum_path(&path))
                    .ok()
                    .map(|c| c.trim().to_string());
                snapshots.push(SnapshotDescription {
                    name: name.to_string(),
                    creation_time: file_time(&path),
                    size: fs::metadata(&path)?.len(),
                    checksum,
                });
            }
        }

        // Names embed the timestamp
        snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(snapshots)
    }

    pub fn latest(&self) -> Result<Option<CorpusSnapshot>> {
        match self.list()?.first() {
            Some(description) => self.load(&description.name).map(Some),
            None => Ok(None),
        }
    }
}
