use anyhow::Context;
use clap::Parser;
use job_aggregator::{
    announcer_for_store, digest, Announcer, AshbySource, CompanyList, DiscordNotifier, FetchConfig, Fetcher,
    GreenhouseSource, IngestionPipeline, JobStore, KeywordConfig, LeverSource, MemoryJobStore, PgJobStore,
    RemoteOkSource, RssFeedSource, RunSummary, TheMuseSource, WorkableSource,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Collect UI/UX design internships, store them and announce the new ones
#[derive(Parser, Debug)]
#[command(name = "job-aggregator", version)]
struct Cli {
    /// Keyword configuration (YAML)
    #[arg(long, env = "KEYWORDS_PATH", default_value = "data/keywords.yml")]
    keywords: PathBuf,

    /// Companies whose Greenhouse, Lever, Ashby and Workable boards are polled (YAML)
    #[arg(long, env = "COMPANIES_PATH", default_value = "data/companies.yml")]
    companies: PathBuf,

    /// Postgres connection string. Without it the run keeps results in
    /// memory and sends no announcements.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    #[arg(long, env = "DISCORD_WEBHOOK_URL", hide_env_values = true)]
    discord_webhook_url: Option<String>,

    /// Channel id announcements are recorded under
    #[arg(long, env = "DISCORD_CHANNEL_ID", default_value = "internships")]
    channel: String,

    /// RemoteOK tag to keep
    #[arg(long, default_value = "design")]
    remoteok_tag: String,

    /// The Muse API key; the public API also answers without one
    #[arg(long, env = "THEMUSE_API_KEY", hide_env_values = true)]
    themuse_api_key: Option<String>,

    #[arg(long, env = "SOURCE_TIMEOUT_SECS", default_value_t = 60)]
    source_timeout_secs: u64,

    /// Cap on announcements per channel in one run
    #[arg(long)]
    max_announcements: Option<usize>,

    /// Write the ranked batch as JSON
    #[arg(long)]
    json_out: Option<PathBuf>,

    /// Write the ranked batch as a markdown README
    #[arg(long)]
    readme_out: Option<PathBuf>,

    /// Fetch, filter and write outputs without storing or announcing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!("Starting internship aggregator");

    let notifier = match &cli.discord_webhook_url {
        Some(webhook) => Some(DiscordNotifier::new()?.with_channel(cli.channel.clone(), webhook.clone())),
        None => {
            warn!("Discord webhook URL not configured - announcements disabled");
            None
        }
    };

    let result = run(&cli, notifier.as_ref()).await;
    if let Err(e) = &result {
        error!("Run failed: {:#}", e);
        if let Some(notifier) = &notifier {
            if let Err(report_error) = notifier.announce_error(&format!("{:#}", e), &cli.channel).await {
                warn!("Failed to report the failure: {}", report_error);
            }
        }
    }
    result
}

async fn run(cli: &Cli, notifier: Option<&DiscordNotifier>) -> anyhow::Result<()> {
    let keywords = KeywordConfig::load(&cli.keywords).map_err(|e| {
        error!("Refusing to run without a usable keyword configuration");
        e
    })?;
    let companies = CompanyList::load_or_empty(&cli.companies)?;

    let fetcher = Arc::new(Fetcher::new(FetchConfig::default())?);
    let pipeline = IngestionPipeline::builder()
        .add_source(Box::new(GreenhouseSource::new(fetcher.clone(), &companies.companies)))
        .add_source(Box::new(LeverSource::new(fetcher.clone(), &companies.companies)))
        .add_source(Box::new(AshbySource::new(fetcher.clone(), &companies.companies)))
        .add_source(Box::new(WorkableSource::new(fetcher.clone(), &companies.companies)))
        .add_source(Box::new(
            RemoteOkSource::new(fetcher.clone()).with_tag(Some(cli.remoteok_tag.clone())),
        ))
        .add_source(Box::new(
            TheMuseSource::new(fetcher.clone()).with_api_key(cli.themuse_api_key.clone()),
        ))
        .add_source(Box::new(RssFeedSource::with_default_feeds(fetcher.clone())))
        .keywords(keywords)
        .source_timeout(Duration::from_secs(cli.source_timeout_secs))
        .build()?;

    let run = pipeline.run().await;
    for failure in &run.stats.source_failures {
        warn!("Source {} produced nothing this run: {}", failure.source_name, failure.error);
    }

    if let Some(path) = &cli.json_out {
        digest::write_json_cache(path, &run.jobs, chrono::Utc::now())
            .await
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &cli.readme_out {
        digest::write_markdown(path, &run.jobs, run.scraped_date)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if cli.dry_run {
        info!("Dry run: {} jobs left unpublished", run.jobs.len());
        return Ok(());
    }

    let store: Box<dyn JobStore> = match &cli.database_url {
        Some(url) => {
            let store = PgJobStore::new(url)
                .await
                .context("connecting to the job database, check DATABASE_URL")?;
            store.setup_schema().await?;
            Box::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; results will not outlive this run");
            Box::new(MemoryJobStore::new())
        }
    };

    let announcer = announcer_for_store(store.as_ref(), notifier.map(|n| n as &dyn Announcer));
    let channels = vec![cli.channel.clone()];

    let report = pipeline
        .publish(&run, store.as_ref(), announcer, &channels, cli.max_announcements)
        .await;

    if let Some(announcer) = announcer {
        match store.stats(run.scraped_date).await {
            Ok(stats) => {
                let summary = RunSummary {
                    run_date: run.scraped_date,
                    new_jobs: report.inserted,
                    stats,
                };
                if let Err(e) = announcer.announce_summary(&summary, &cli.channel).await {
                    warn!("Failed to send daily summary: {}", e);
                }
            }
            Err(e) => warn!("Failed to read store statistics: {}", e),
        }
    }

    info!(
        "Done: {} ranked, {} new, {} announced, {} sources failed",
        run.jobs.len(),
        report.inserted,
        report.announced,
        run.stats.source_failures.len()
    );
    Ok(())
}
