pub mod dataset;
pub mod results_log;
pub mod snapshot;

pub use dataset::{load_records, read_records, UNNAMED};
pub use results_log::{InvalidSatisfaction, LogEntry, ResultsLog, Satisfaction};
pub use snapshot::{CorpusSnapshot, SnapshotDescription, SnapshotStore, StoredEmbedding};
