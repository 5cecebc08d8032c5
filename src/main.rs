use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use svsearch_core::config::Config;
use svsearch_core::{ExistenceAggregator, ExistenceBackend, GenerationStore, GroupNodeRequest, SearchRequest, SearchService};
use svsearch_sources::{JsonExistenceBackend, JsonFileSource, Refresher};

#[derive(Parser)]
#[command(name = "svsearch", about = "Search statistical variables in hierarchy exports")]
struct Cli {
    /// Log at debug level (stderr).
    #[arg(long, global = true)]
    debug: bool,

    /// Config file layered over the defaults. Defaults to
    /// ~/.config/svsearch/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one query and print the response as JSON.
    Search {
        query: String,
        #[command(flatten)]
        data: DataArgs,
        /// Use the index without blocklisted groups.
        #[arg(long)]
        blocklisted: bool,
        /// Variables only.
        #[arg(long)]
        sv_only: bool,
        /// Attach variables to their best matched group.
        #[arg(long)]
        grouped: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print one group with child counts as JSON.
    Node {
        stat_var_group: String,
        #[command(flatten)]
        data: DataArgs,
        /// Entities that must have data for a child to count.
        #[arg(long, default_value_t = 1)]
        min_entities: usize,
    },
}

#[derive(Args)]
struct DataArgs {
    /// Hierarchy JSON exports, highest priority first.
    #[arg(long = "hierarchy", required = true)]
    hierarchies: Vec<PathBuf>,
    /// Synonym groups JSON. Overrides the config file.
    #[arg(long)]
    synonyms: Option<PathBuf>,
    /// Existence JSON files ({"rollup": [...]} or {"presence": [...]}).
    #[arg(long = "existence")]
    existence: Vec<PathBuf>,
    /// Scope to entities with data.
    #[arg(long = "entity")]
    entities: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.debug { "debug" } else { "info" })
            }),
        )
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let output = match cli.command {
        Command::Search { query, data, blocklisted, sv_only, grouped, limit } => {
            let service = load(&config, &data).await?;
            let request = SearchRequest {
                query,
                entities: data.entities,
                blocklisted,
                sv_only,
                grouped,
                limit,
            };
            serde_json::to_string_pretty(&service.search(&request).await?)?
        }
        Command::Node { stat_var_group, data, min_entities } => {
            let service = load(&config, &data).await?;
            let request = GroupNodeRequest {
                stat_var_group,
                entities: data.entities,
                num_entities_existence: min_entities,
            };
            serde_json::to_string_pretty(&service.group_node(&request).await?)?
        }
    };
    println!("{output}");
    Ok(())
}

async fn load(config: &Config, data: &DataArgs) -> anyhow::Result<SearchService> {
    let mut refresher = Refresher::new(config.hierarchy.clone());
    for path in &data.hierarchies {
        refresher = refresher.source(Arc::new(JsonFileSource::new(path)));
    }
    if let Some(path) = data.synonyms.as_ref().or(config.synonyms.path.as_ref()) {
        refresher = refresher.synonyms(path);
    }
    let store = GenerationStore::new(refresher.build().await?);

    let backends: Vec<Arc<dyn ExistenceBackend>> = data
        .existence
        .iter()
        .map(|path| Arc::new(JsonExistenceBackend::new(path)) as Arc<dyn ExistenceBackend>)
        .collect();
    tracing::info!(
        hierarchies = data.hierarchies.len(),
        backends = backends.len(),
        "loaded search data"
    );
    Ok(SearchService::new(
        Arc::new(store),
        ExistenceAggregator::new(backends),
        config.search.clone(),
    ))
}
