use anyhow::{Context, Result};
use clap::Parser;
use shared::{Config, Pipeline, PipelineOptions};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "publish-briefing")]
#[command(about = "Publish the ALAPI daily briefing to Emlog and report to Feishu")]
struct Args {
    /// Fetch and render only; do not publish or notify
    #[arg(long)]
    dry_run: bool,

    /// Also save the rendered HTML into this directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the briefing image
    #[arg(long)]
    no_image: bool,

    /// Do not send Feishu notifications
    #[arg(long)]
    no_notify: bool,

    /// Accept invalid TLS certificates (overrides BRIEFING_INSECURE_TLS)
    #[arg(long)]
    insecure: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if args.insecure {
        config.http.insecure_tls = true;
    }

    for name in config.placeholders() {
        warn!(variable = name, "Still using the placeholder value; set it in the environment");
    }

    let options = PipelineOptions {
        dry_run: args.dry_run,
        output_dir: args.output,
        with_image: !args.no_image,
        notify: !args.no_notify,
        ..PipelineOptions::default()
    };

    println!("🚀 Publishing daily briefing...");
    let pipeline = Pipeline::new(&config, options)?;
    let report = pipeline.run().await?;

    if let Some(path) = &report.saved_to {
        println!("✓ HTML saved to: {}", path.display());
    }

    match (&report.article_id, &report.article_url) {
        (Some(id), Some(url)) => {
            println!("\n🎉 Daily briefing published!");
            println!("📄 Title: {}", report.title);
            println!("🔗 Article ID: {} ({})", id, url);
        }
        _ => {
            println!("\n✅ Dry run complete: {} ({} headlines)", report.title, report.headlines);
        }
    }

    Ok(())
}
