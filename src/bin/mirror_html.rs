use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use docqa::mirror::{http_client, SiteMirror};
use docqa::ConfigArgs;

#[derive(Parser, Debug)]
#[command(
    name = "docqa-mirror",
    about = "Download a site's internal HTML pages into the local HTML directory"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let sources = Cli::parse().config.build_config().sources;

    let client = http_client(Duration::from_secs(sources.timeout_secs))?;
    let mirror = SiteMirror::new(client, &sources.html_dir);
    let report = mirror.mirror(&sources.mirror_base_url)?;
    println!(
        "saved {} pages to {} ({} already present, {} failed)",
        report.saved.len(),
        sources.html_dir.display(),
        report.skipped,
        report.failed.len()
    );
    Ok(())
}
