//! xkcd VK poster CLI - main entry point
//!
//! Publishes one random xkcd comic to a VK group wall and exits.

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use xkcd_vk_poster::{ComicReference, Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "xkcd_vk_poster")]
#[command(about = "Post a random xkcd comic to a VK group wall", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory the comic image is downloaded into
    #[arg(long, env = "XKCD_WORK_DIR", default_value = ".")]
    dir: PathBuf,

    /// Publish this comic instead of a random one
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..), conflicts_with = "seed")]
    comic: Option<u32>,

    /// Seed for the random comic choice
    #[arg(long)]
    seed: Option<u64>,

    /// Keep the downloaded image after posting
    #[arg(long, default_value_t = false)]
    keep_image: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("xkcd_vk_poster=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = PipelineConfig::from_env()?
        .with_work_dir(cli.dir)
        .with_keep_image(cli.keep_image);
    let pipeline = Pipeline::new(config)?;

    let report = match cli.comic {
        Some(index) => pipeline.run_for(ComicReference { index }).await?,
        None => {
            let mut rng = match cli.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            pipeline.run(&mut rng).await?
        }
    };

    println!(
        "✅ Posted comic #{} as {}",
        report.comic.index, report.attachment
    );

    Ok(())
}
