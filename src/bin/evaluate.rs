use anyhow::Result;
use clap::Parser;
use docqa::{
    build_rag_chain, build_retriever, run_evaluation, save_answers, ConfigArgs, VectorIndexer,
};

#[derive(Parser, Debug)]
#[command(
    name = "docqa-eval",
    about = "Answer the benchmark questions and write them to the answers file"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Cli::parse().config.build_config();

    let embedder = config.embedding.build()?;
    let indexer = VectorIndexer::new(
        config.store.clone(),
        config.embedding.batch_size,
        config.embedding.pause,
    );
    let collection = indexer.load(embedder.as_ref())?;
    let retriever = build_retriever(collection, embedder, config.retriever);
    let provider = config.generation.build()?;
    let chain = build_rag_chain(retriever, provider, &config.generation);

    let records = run_evaluation(&chain)?;
    let path = save_answers(&records, &config.answers_path)?;
    println!("wrote {} answers to {}", records.len(), path.display());
    Ok(())
}
