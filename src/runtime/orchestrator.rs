use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

use super::render::{format_json, format_results, ProgressPrinter};
use crate::{
    analysis::{AnalysisSnapshot, ClientSettings, HttpBackend, StreamingAnalysisClient},
    app::{init_config, load_config, load_config_from, Config},
    bookings::BookingStore,
    cache::RecommendationCache,
    cli::{handle_bookings, handle_cache, show_version, Cli, Commands, OutputFormat},
    storage::{FileStore, KeyValueStore, MemoryStore},
    survey::SurveyInput,
    utils::AnalysisError,
};

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
    config: Config,
}

impl Orchestrator {
    /// Create a new orchestrator from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        // Load configuration
        let config = if let Some(config_path) = &cli.config {
            load_config_from(config_path)?
        } else {
            match load_config() {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Failed to load config: {}. Using defaults.", e);
                    Config::default()
                }
            }
        };

        Ok(Self { cli, config })
    }

    /// Run the orchestrator. Returns false when a recommendation run failed.
    pub async fn run(self) -> Result<bool> {
        match &self.cli.command {
            Commands::Recommend {
                survey,
                refresh,
                output_format,
            } => self.recommend(survey, *refresh, *output_format).await,
            Commands::Cache { action } => {
                handle_cache(*action, &self.recommendation_cache()?)?;
                Ok(true)
            }
            Commands::Bookings { action } => {
                handle_bookings(action, &BookingStore::new(self.open_store()?))?;
                Ok(true)
            }
            Commands::Init => {
                let path = init_config()?;
                println!("Configuration at: {}", path.display());
                Ok(true)
            }
            Commands::Version => {
                show_version();
                Ok(true)
            }
        }
    }

    /// Run one recommendation and print the outcome
    async fn recommend(&self, source: &str, refresh: bool, format: OutputFormat) -> Result<bool> {
        let survey = SurveyInput::load(source)
            .with_context(|| format!("Failed to load survey from {}", source))?;

        let backend = Arc::new(HttpBackend::new(&self.config.backend)?);
        let printer = Arc::new(ProgressPrinter::new());
        let observer = printer.clone();
        let client = StreamingAnalysisClient::new(
            backend,
            self.recommendation_cache()?,
            ClientSettings::from(&self.config.analysis),
        )
        .with_observer(Arc::new(move |snapshot: &AnalysisSnapshot| {
            observer.observe(snapshot)
        }));

        println!(
            "Requesting recommendations from {}",
            self.config.backend.base_url.green()
        );

        let run = async {
            if refresh {
                client.clear_cache_and_restart(&survey).await
            } else {
                client.start(&survey).await
            }
        };

        let result = tokio::select! {
            result = run => result,
            _ = tokio::signal::ctrl_c() => {
                client.cancel();
                Err(AnalysisError::Cancelled)
            }
        };

        let snapshot = client.snapshot();
        match format {
            OutputFormat::Json => println!("{}", format_json(&snapshot)),
            OutputFormat::Text => {
                if let Err(AnalysisError::Cancelled) = &result {
                    println!("{}", "Cancelled.".yellow());
                } else {
                    print!("{}", format_results(&snapshot));
                }
            }
        }

        Ok(result.is_ok())
    }

    fn recommendation_cache(&self) -> Result<RecommendationCache> {
        let hours = self.config.analysis.cache_ttl_hours;
        let ttl = chrono::Duration::try_hours(hours)
            .with_context(|| format!("Cache TTL of {} hours is out of range", hours))?;
        Ok(RecommendationCache::new(self.open_store()?).with_ttl(ttl))
    }

    /// Open the configured key/value store
    fn open_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        let quota = self.config.storage.quota_bytes;
        if self.cli.ephemeral {
            return Ok(match quota {
                Some(quota) => Arc::new(MemoryStore::with_quota(quota)),
                None => Arc::new(MemoryStore::new()),
            });
        }

        let store = match &self.config.storage.data_dir {
            Some(dir) => FileStore::new(dir.clone()),
            None => FileStore::open_default(),
        }
        .context("Failed to open local storage")?;

        Ok(Arc::new(store.with_quota(quota)))
    }
}
