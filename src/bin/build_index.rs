use anyhow::Result;
use clap::Parser;
use docqa::{build_index, ConfigArgs};

#[derive(Parser, Debug)]
#[command(
    name = "docqa-build",
    about = "Load, normalize, split and embed every source into the vector collection"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Cli::parse().config.build_config();
    let embedder = config.embedding.build()?;

    let summary = build_index(&config, embedder.as_ref())?;
    if !summary.failed_sources.is_empty() {
        log::warn!("sources skipped: {}", summary.failed_sources.join(", "));
    }
    println!(
        "indexed {} chunks from {} documents into '{}' (collection size {})",
        summary.chunks, summary.documents, config.store.collection_name, summary.collection_size
    );
    Ok(())
}
