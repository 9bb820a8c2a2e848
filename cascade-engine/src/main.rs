use std::error::Error;
use std::io::Read;
use std::sync::Arc;

use cascade_engine::{BatchReport, CascadeConfig, ChangeRecord, ChangeRouter};
use cascade_store::{Item, MemoryStore};
use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Store contents and change records to replay against them
#[derive(Deserialize)]
struct Replay {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    records: Vec<ChangeRecord>,
}

#[derive(Serialize)]
struct ReplayResult {
    report: BatchReport,
    items: Vec<Item>,
}

pub fn init_log() {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{
        EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("CASCADE_LOG")
                .from_env_lossy(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_log();
    let conf = CascadeConfig::init_from_env()?;
    debug!("use cascade config: {:?}", conf);

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let replay: Replay = serde_json::from_str(&input)?;

    let store = Arc::new(MemoryStore::default());
    store.seed(&conf.table_name, replay.items).await?;
    info!(records = replay.records.len(), "replaying change records");

    let router = ChangeRouter::new(store.clone(), conf.clone())?;
    let report = router.process_batch(&replay.records).await;
    let success = report.is_success();

    let result = ReplayResult {
        report,
        items: store.items(&conf.table_name).await,
    };
    serde_json::to_writer_pretty(std::io::stdout().lock(), &result)?;
    println!();

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
