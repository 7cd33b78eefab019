use clap::Parser;
use color_eyre::eyre::Result;
use futures_util::future::join_all;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use oxicache::infrastructure::{
    AppConfig, CliArgs, Command, DiskImageCache, StorageManager, TieredImageCache,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = if let Some(path) = &args.config {
        StorageManager::at(path.clone()).load_config()?
    } else if let Ok(storage) = StorageManager::new() {
        storage.load_config()?
    } else {
        AppConfig::default()
    };
    config.merge_with_args(args);
    Ok(config)
}

async fn fetch(cache: &TieredImageCache, urls: &[String]) {
    let lookups = urls.iter().map(|url| cache.lookup(url));
    let results = join_all(lookups).await;

    for (url, result) in urls.iter().zip(results) {
        match result {
            Some(loaded) => println!(
                "{url}\t{}\t{}x{}\t{}",
                loaded.source,
                loaded.width(),
                loaded.height(),
                loaded.key
            ),
            None => println!("{url}\tmiss"),
        }
    }

    info!(stats = %cache.stats(), "Fetch finished");
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = oxicache::VERSION, "Starting {}", oxicache::NAME);

    match &args.command {
        Command::Fetch { urls } => {
            let cache = TieredImageCache::from_config(&config.cache)?;
            fetch(&cache, urls).await;
        }
        Command::Stats => {
            let disk = DiskImageCache::new(config.cache.effective_cache_dir());
            let stats = disk.stats().await?;
            println!("{}\t{stats}", disk.cache_dir().display());
        }
        Command::Purge => {
            let cache = TieredImageCache::from_config(&config.cache)?;
            cache.purge().await?;
            println!("purged {}", config.cache.effective_cache_dir().display());
        }
    }

    Ok(())
}
