use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use pawmatch_api::{AppState, RestApi};
use pawmatch_core::{CompletionProvider, Corpus, DescriptionBuilder, EmbeddingProvider};
use pawmatch_engine::{CorpusStats, Recommender, RecommenderConfig};
use pawmatch_providers::{BatchEmbedder, OpenAiCompletions, OpenAiEmbeddings, Retrying};
use pawmatch_storage::{load_records, CorpusSnapshot, ResultsLog, Satisfaction, SnapshotStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const SNAPSHOT_DIR: &str = "snapshots";
const RESULTS_LOG: &str = "results.jsonl";

/// Hybrid shelter-animal recommender
#[derive(Parser, Debug)]
#[command(name = "pawmatch")]
#[command(about = "Recommend shelter animals from a free-text query", long_about = None)]
struct Args {
    /// Path to the data directory
    #[arg(short, long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API key for the embedding and completion services
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a shelter export, embed every record and write a snapshot
    Build {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Recommend animals for a query
    Recommend {
        query: String,

        #[arg(short, long)]
        k: Option<usize>,

        /// Consider animals that are not currently available
        #[arg(long)]
        include_unavailable: bool,

        /// Skip the language-model re-ranking pass
        #[arg(long)]
        no_rerank: bool,

        /// Rate the result (1-5) and append it to the results log
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rate: Option<u8>,
    },
    /// Print corpus statistics
    Stats,
    /// Serve the REST API
    Serve {
        #[arg(long, default_value_t = 8080)]
        http_port: u16,
    },
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn require_key(api_key: &Option<String>) -> anyhow::Result<&str> {
    api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing API key: pass --api-key or set OPENAI_API_KEY"))
}

fn embedder(config: &RecommenderConfig, api_key: &str) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let client = OpenAiEmbeddings::new(config.openai.clone(), api_key)?;
    Ok(Arc::new(Retrying::new(client, config.retry.clone())))
}

fn completer(config: &RecommenderConfig, api_key: &str) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let client = OpenAiCompletions::new(config.openai.clone(), api_key)?;
    Ok(Arc::new(Retrying::new(client, config.retry.clone())))
}

fn load_corpus(data_dir: &Path) -> anyhow::Result<Corpus> {
    let store = SnapshotStore::new(data_dir.join(SNAPSHOT_DIR))?;
    let snapshot = store
        .latest()?
        .ok_or_else(|| anyhow!("No snapshot in {}; run `pawmatch build` first", store.dir().display()))?;
    info!(model = %snapshot.model, records = snapshot.records.len(), "snapshot loaded");
    snapshot.into_corpus()
}

fn build_recommender(
    config: &RecommenderConfig,
    api_key: &str,
    rerank: bool,
) -> anyhow::Result<Recommender> {
    let completer = if rerank && config.rerank {
        Some(completer(config, api_key)?)
    } else {
        None
    };
    Ok(Recommender::from_config(config, embedder(config, api_key)?, completer)?)
}

async fn build(args: &Args, config: &RecommenderConfig, input: &Path) -> anyhow::Result<()> {
    let api_key = require_key(&args.api_key)?;
    let describer = DescriptionBuilder::new(config.description.clone());

    let mut records = load_records(input)?;
    for record in &mut records {
        record.embedding_text = describer.embedding_text(record);
    }
    info!(records = records.len(), input = %input.display(), "dataset loaded");

    let client = OpenAiEmbeddings::new(config.openai.clone(), api_key)?;
    let batcher = BatchEmbedder::new(Retrying::new(client, config.retry.clone()), config.batch.clone());
    let outcome = batcher.embed_records(&records).await;
    if !outcome.failed.is_empty() {
        warn!(failed = outcome.failed.len(), "some records could not be embedded");
    }

    let snapshot = CorpusSnapshot::new(
        config.openai.embedding_model.clone(),
        records,
        outcome.embeddings,
        outcome.failed,
    );
    let store = SnapshotStore::new(args.data_dir.join(SNAPSHOT_DIR))?;
    let description = store.save(&snapshot)?;

    println!(
        "Wrote {} ({} records, {} without embeddings)",
        description.name,
        snapshot.records.len(),
        snapshot.failed.len()
    );
    Ok(())
}

async fn recommend(
    args: &Args,
    config: &RecommenderConfig,
    query: &str,
    k: Option<usize>,
    include_unavailable: bool,
    no_rerank: bool,
    rate: Option<u8>,
) -> anyhow::Result<()> {
    let api_key = require_key(&args.api_key)?;
    let corpus = load_corpus(&args.data_dir)?;
    let recommender = build_recommender(config, api_key, !no_rerank)?;

    let k = k.unwrap_or(config.top_k);
    let available_only = config.available_only && !include_unavailable;
    let recommendations = recommender
        .recommend(&corpus, query, available_only, k)
        .await
        .context("Recommendation failed")?;

    if recommendations.is_empty() {
        println!("No animals match \"{}\".", query);
    }
    for rec in &recommendations {
        println!("{}. {}", rec.rank, rec.display_name());
        if let Some(reason) = &rec.reason {
            println!("   {}", reason);
        }
        if let Some(link) = rec.link(&config.link_base) {
            println!("   {}", link);
        }
    }

    if let Some(rate) = rate {
        let satisfaction = Satisfaction::new(rate)?;
        let log = ResultsLog::open(args.data_dir.join(RESULTS_LOG))?;
        let query_id = log.record(query, &recommendations, Some(satisfaction))?;
        info!(query_id = %query_id, satisfaction = rate, "rating recorded");
    }
    Ok(())
}

fn serve(args: &Args, config: RecommenderConfig, http_port: u16) -> anyhow::Result<()> {
    let api_key = require_key(&args.api_key)?;
    let corpus = load_corpus(&args.data_dir)?;
    let recommender = build_recommender(&config, api_key, true)?;
    let results = ResultsLog::open(args.data_dir.join(RESULTS_LOG))?;

    let state = Arc::new(AppState::new(recommender, corpus, config).with_results_log(results));
    info!("HTTP API: http://localhost:{}/", http_port);

    let sys = actix_web::rt::System::new();
    sys.block_on(RestApi::start(state, http_port))?;
    info!("HTTP server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let config = RecommenderConfig::load_or_default(args.config.as_deref())?;
    info!(data_dir = ?args.data_dir, "Starting pawmatch v{}", env!("CARGO_PKG_VERSION"));

    if let Command::Serve { http_port } = args.command {
        let http_handle = std::thread::spawn(move || serve(&args, config, http_port));

        return tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
            joined = tokio::task::spawn_blocking(move || http_handle.join()) => {
                match joined {
                    Ok(Ok(result)) => result,
                    Ok(Err(_)) => Err(anyhow!("HTTP server thread panicked")),
                    Err(e) => Err(e.into()),
                }
            }
        };
    }

    match &args.command {
        Command::Build { input } => build(&args, &config, input).await,
        Command::Recommend {
            query,
            k,
            include_unavailable,
            no_rerank,
            rate,
        } => {
            recommend(&args, &config, query, *k, *include_unavailable, *no_rerank, *rate).await
        }
        Command::Stats => {
            let corpus = load_corpus(&args.data_dir)?;
            print!("{}", CorpusStats::compute(&corpus));
            Ok(())
        }
        // handled above
        Command::Serve { .. } => Ok(()),
    }
}
