use anyhow::Result;
use clap::Parser;
use docqa::evaluation::AnswerRecord;
use docqa::{answer_question, build_rag_chain, build_retriever, ConfigArgs, VectorIndexer};

const DEMO_QUESTION: &str = "ریچارد استالمن کیست؟";

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    about = "Answer one demo question against an already-built collection"
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

    let answer = answer_question(&chain, DEMO_QUESTION)?;
    let record = AnswerRecord::new(0, DEMO_QUESTION, answer);

    println!("Demo question:");
    println!("{DEMO_QUESTION}");
    println!("Answer:");
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
