//! Stevedore push CLI.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stevedore_client::{push_until_complete, Client, LayerSource, PushOptions, ReadAt};
use stevedore_core::{Manifest, Reference};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stevedore - push artifacts to a stevedore server
#[derive(Parser, Debug)]
#[command(name = "stevedore")]
#[command(version, about, long_about = None)]
struct Args {
    /// Server base URL
    #[arg(long, env = "STEVEDORE_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push a manifest and its layers
    Push {
        /// Target reference, e.g. registry.example.com/lib/model:latest+Q4
        reference: String,

        /// Directory holding manifest.json and layer files named by digest
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Maximum concurrent chunk uploads
        #[arg(long, default_value_t = 8)]
        parallelism: usize,
    },
}

/// Layer source backed by a directory of files named by digest.
struct DirSource {
    dir: PathBuf,
}

impl LayerSource for DirSource {
    fn layer(&self, digest: &str) -> io::Result<Arc<dyn ReadAt>> {
        // Digests become file names directly; refuse anything path-like.
        if digest.contains('/') || digest.contains("..") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsafe digest: {digest}"),
            ));
        }
        let file = std::fs::File::open(self.dir.join(digest))?;
        Ok(Arc::new(file))
    }
}

async fn run_push(server: &str, reference: &str, dir: &Path, parallelism: usize) -> Result<()> {
    let reference = Reference::parse(reference).context("invalid reference")?;

    let manifest_path = dir.join("manifest.json");
    let manifest_bytes = std::fs::read(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    let manifest = Manifest::from_slice(&manifest_bytes).context("invalid manifest")?;

    // Verify the layer files before the first round trip.
    for layer in &manifest.layers {
        let path = dir.join(&layer.digest);
        let meta = std::fs::metadata(&path)
            .with_context(|| format!("missing layer file {}", path.display()))?;
        anyhow::ensure!(
            meta.len() == layer.size,
            "layer {} is {} bytes on disk but manifest declares {}",
            layer.digest,
            meta.len(),
            layer.size
        );
    }

    let client = Client::new(server)?;
    let source = DirSource {
        dir: dir.to_path_buf(),
    };
    let options = PushOptions {
        parallelism,
        ..Default::default()
    };

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, canceling push");
            canceller.cancel();
        }
    });

    push_until_complete(&client, &cancel, &reference, &manifest_bytes, &source, &options).await?;
    tracing::info!(reference = %reference, "pushed");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    match args.command {
        Command::Push {
            reference,
            dir,
            parallelism,
        } => run_push(&args.server, &reference, &dir, parallelism).await,
    }
}
