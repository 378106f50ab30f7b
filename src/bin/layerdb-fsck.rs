use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use layerdb_fsck::{
    config::{DaemonConfig, Settings, DEFAULT_CONFIG_PATH},
    fs::HostFs,
    fsck::check_store,
    store::DockerStore,
};

/// Check the Docker overlay2 layer store for broken layers, and optionally
/// remove them.  The Docker daemon must not be running.
#[derive(Debug, Parser)]
#[clap(name = "layerdb-fsck", version)]
struct App {
    /// A path to docker data root [default: from the daemon config, or /var/lib/docker]
    #[clap(long)]
    data_root: Option<PathBuf>,

    /// Remove broken layers, along with all image metadata
    #[clap(long)]
    fix_store: bool,

    /// Daemon configuration file to read the data root and storage driver from
    #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = App::parse();

    let config = DaemonConfig::load(&args.config)?;
    let settings = Settings::resolve(args.data_root, &config)?;
    let store = DockerStore::with_fs(HostFs, &settings.data_root, &settings.graph_driver);

    let report = check_store(&store, args.fix_store)
        .with_context(|| format!("failed to check Docker store {}", store.root().display()))?;

    if args.fix_store {
        log::info!("fixed {} layers", report.broken_count());
    }
    Ok(())
}
