pub mod cli;
pub mod clients;
pub mod config;
pub mod domain;
pub mod models;
pub mod parser;
pub mod providers;
pub mod quality;
pub mod services;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use clients::{QBitClient, SabClient};
pub use config::Config;
use config::{NzbMethod, TorrentMethod};
use domain::events::SearchEvent;
use providers::{ProviderRegistry, TorrentRssProvider};
use services::filter::ResultFilter;
use services::history::History;
use services::library::ShowLibrary;
use services::propers::ProperFinder;
use services::scene::SceneNames;
use services::scheduler::{Scheduler, TaskKind};
use services::search::SearchCoordinator;
use services::snatch::{Blackhole, DownloadClient, QBittorrent, Sabnzbd, SnatchExecutor};
use services::tasks::SearchTasks;

pub const USER_AGENT: &str = concat!("snatcharr/", env!("CARGO_PKG_VERSION"));

/// Everything a command needs, wired from the config.
pub struct App {
    pub config: Config,
    pub library: Arc<ShowLibrary>,
    pub history: Arc<History>,
    pub tasks: Arc<SearchTasks>,
    pub scheduler: Arc<Scheduler>,
    pub events: broadcast::Sender<SearchEvent>,
    pub cancel: CancellationToken,
    qbit: Option<QBitClient>,
}

impl App {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let scene = Arc::new(SceneNames::new(config.scene_exceptions.clone()));

        let library = Arc::new(
            ShowLibrary::load(&config.general.library_path(), scene.clone())
                .await
                .context("Failed to load show library")?,
        );
        let history = Arc::new(
            History::open(&config.general.history_path())
                .await
                .context("Failed to open snatch history")?,
        );

        let mut registry = ProviderRegistry::default();
        for provider in &config.providers {
            registry.register(Arc::new(TorrentRssProvider::new(
                provider.clone(),
                scene.clone(),
            )));
        }
        if registry.active().is_empty() {
            warn!("No active providers configured, searches will not run");
        }

        let (events, _) = broadcast::channel(config.general.event_bus_buffer_size.max(1));
        let filter = Arc::new(ResultFilter::new(&config.filter_settings(), scene));

        let nzb: Option<Arc<dyn DownloadClient>> = match config.search.nzb_method {
            NzbMethod::Blackhole => Some(Arc::new(Blackhole::new(
                PathBuf::from(&config.blackhole.nzb_dir),
                registry.clone(),
            ))),
            NzbMethod::Sabnzbd => Some(Arc::new(Sabnzbd::new(SabClient::new(
                config.sabnzbd.clone(),
            )?))),
            NzbMethod::Disabled => None,
        };

        let mut qbit = None;
        let torrent: Option<Arc<dyn DownloadClient>> = match config.search.torrent_method {
            TorrentMethod::Blackhole => Some(Arc::new(Blackhole::new(
                PathBuf::from(&config.blackhole.torrent_dir),
                registry.clone(),
            ))),
            TorrentMethod::Qbittorrent => {
                let client = QBitClient::new(config.qbittorrent.clone())?;
                qbit = Some(client.clone());
                Some(Arc::new(QBittorrent::new(client)))
            }
            TorrentMethod::Disabled => None,
        };

        let coordinator = Arc::new(
            SearchCoordinator::new(registry.clone(), filter.clone()).with_events(events.clone()),
        );
        let snatcher = Arc::new(
            SnatchExecutor::new(nzb, torrent, history.clone(), library.clone())
                .with_events(events.clone()),
        );
        let propers = ProperFinder::new(registry, library.clone(), filter, history.clone());

        let tasks = Arc::new(SearchTasks::new(
            coordinator,
            snatcher,
            propers,
            library.clone(),
            config.search_settings(),
        ));

        let cancel = CancellationToken::new();
        let scheduler = Arc::new(
            Scheduler::new(tasks.clone(), config.scheduler.clone(), cancel.clone())
                .with_events(events.clone()),
        );

        Ok(Self {
            config,
            library,
            history,
            tasks,
            scheduler,
            events,
            cancel,
            qbit,
        })
    }
}

fn init_logging(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Loads the config named on the command line, or from the default locations.
pub fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    if matches!(command, Commands::Init) {
        if Config::create_default_if_missing()? {
            println!("Created config.toml");
        } else {
            println!("config.toml already exists");
        }
        return Ok(());
    }

    if let Commands::Parse { name, file } = &command {
        return cli::cmd_parse(name, *file);
    }

    let config = load_config(cli.config.as_deref())?;
    config.validate()?;

    init_logging(&config);

    let app = App::build(config).await?;

    match command {
        Commands::Daemon => run_daemon(app).await,
        Commands::Search {
            show_id,
            season,
            episode,
            manual,
        } => cli::cmd_search_episode(&app, show_id, season, episode, manual).await,
        Commands::Season { show_id, season } => {
            cli::cmd_search_season(&app, show_id, season).await
        }
        Commands::Rss => cli::cmd_run_task(&app, TaskKind::CurrentSearch).await,
        Commands::Backlog => cli::cmd_run_task(&app, TaskKind::Backlog).await,
        Commands::Propers => cli::cmd_run_task(&app, TaskKind::Propers).await,
        Commands::History { limit } => cli::cmd_history(&app, limit).await,
        Commands::Parse { .. } | Commands::Init => Ok(()),
    }
}

async fn run_daemon(app: App) -> anyhow::Result<()> {
    info!(
        "snatcharr v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    if let Some(qbit) = &app.qbit
        && !qbit.is_available().await
    {
        warn!("qBittorrent is not reachable, torrent snatches will fail until it is");
    }

    let mut events = app.events.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(event = "search_event", payload = %json, "Search event"),
                    Err(e) => warn!(error = %e, "Failed to serialize search event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event log fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let scheduler = Arc::clone(&app.scheduler);
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Scheduler error: {}", e);
        }
    });

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    app.cancel.cancel();
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task failed: {}", e);
    }
    event_log.abort();

    if let Err(e) = app.library.save().await {
        warn!(error = %e, "Failed to save show library on shutdown");
    }
    info!("Daemon stopped");

    Ok(())
}
