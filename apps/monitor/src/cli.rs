use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use uppe_monitor::config::{Backend, Config};
use uppe_monitor::database::LibsqlStore;
use uppe_monitor::{
    HttpChecker, IdGenerator, MonitorEngine, MonitorScheduler, Repositories, Target, UuidGenerator,
};

#[derive(Debug, Parser)]
#[command(name = "uppe-monitor", version, about = "HTTP uptime monitor")]
pub struct Cli {
    /// Path to the config file (defaults to ~/.config/uppe/monitor.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check all active targets on their intervals until Ctrl-C
    Run {
        /// Extra ad-hoc targets, useful with the in-memory backend
        #[arg(long = "url")]
        urls: Vec<String>,
        /// Interval in seconds for ad-hoc targets
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
    /// Check one target now
    Check { id: String },
    /// Manage targets
    Target {
        #[command(subcommand)]
        action: TargetCommand,
    },
    /// Show the result history of a target, newest first
    Results {
        id: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show alerts of a target
    Alerts {
        id: String,
        /// Only unresolved alerts
        #[arg(long)]
        open: bool,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Subcommand)]
pub enum TargetCommand {
    Add {
        #[arg(long)]
        url: String,
        /// Display name, defaults to the URL
        #[arg(long)]
        name: Option<String>,
        /// Check interval in seconds
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
    List,
    Remove { id: String },
    Pause { id: String },
    Resume { id: String },
}

/// Open the store for commands whose effects must outlive the process. The
/// memory backend is empty on every start, so it is refused here.
async fn open_persistent(config: &Config, command: &str) -> Result<Repositories> {
    if config.storage.backend == Backend::Memory {
        bail!(
            "`{command}` needs a persistent store; set `backend = \"libsql\"` under [storage] \
             in the config"
        );
    }
    open_repositories(config).await
}

async fn open_repositories(config: &Config) -> Result<Repositories> {
    match config.storage.backend {
        Backend::Memory => Ok(Repositories::in_memory()),
        Backend::Libsql => {
            let store = Arc::new(
                LibsqlStore::open(&config.storage.path)
                    .await
                    .with_context(|| format!("opening {}", config.storage.path.display()))?,
            );
            Ok(Repositories::new(store.clone(), store.clone(), store))
        }
    }
}

fn build_engine(config: &Config, repos: Repositories) -> Result<MonitorEngine> {
    let checker = HttpChecker::new(config.monitor.timeout())?;

    Ok(MonitorEngine::new(repos, Arc::new(checker), Arc::new(UuidGenerator))
        .with_timeout(config.monitor.timeout())
        .with_transport_failure_recording(config.monitor.record_transport_failures))
}

pub async fn execute(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Config => {
            print!("{config}");
            Ok(())
        }
        Command::Run { urls, interval } => {
            let repos = open_repositories(&config).await?;
            for url in urls {
                let target =
                    Target::new(UuidGenerator.generate(), &url, &url, Duration::from_secs(interval));
                target.validate()?;
                repos.targets.save(&target).await?;
            }
            run(&config, repos).await
        }
        Command::Check { id } => {
            let repos = open_persistent(&config, "check").await?;
            let engine = build_engine(&config, repos)?;
            let outcome = engine.check_target(&id).await?;
            let result = &outcome.result;

            println!(
                "{} {} ({}) in {:?}",
                result.checked_at.format("%Y-%m-%d %H:%M:%S"),
                result.status,
                result.status_code,
                result.response_time
            );
            if let Some(alert) = &outcome.opened_alert {
                println!("opened alert {}: {}", alert.id, alert.message);
            }
            for alert in &outcome.resolved_alerts {
                println!("resolved alert {}", alert.id);
            }
            for warning in &outcome.warnings {
                eprintln!("warning: {warning}");
            }
            Ok(())
        }
        Command::Target { action } => {
            let repos = open_persistent(&config, "target").await?;
            target(action, repos).await
        }
        Command::Results { id, limit } => {
            let repos = open_persistent(&config, "results").await?;
            let results = match repos.results.find_by_target_id(&id).await {
                Ok(results) => results,
                Err(err) if err.is_not_found() => {
                    println!("no results for {id}");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            for result in results.iter().rev().take(limit) {
                println!(
                    "{}  {:<12} {:>3}  {:>8.1?}  {}",
                    result.checked_at.format("%Y-%m-%d %H:%M:%S"),
                    result.status,
                    result.status_code,
                    result.response_time,
                    result.error.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
        Command::Alerts { id, open } => {
            let repos = open_persistent(&config, "alerts").await?;
            let alerts = if open {
                repos.alerts.get_unresolved_by_target_id(&id).await?
            } else {
                match repos.alerts.find_by_target_id(&id).await {
                    Ok(alerts) => alerts,
                    Err(err) if err.is_not_found() => Vec::new(),
                    Err(err) => return Err(err.into()),
                }
            };

            if alerts.is_empty() {
                println!("no alerts for {id}");
            }
            for alert in alerts {
                let state = match alert.resolved_at {
                    Some(at) => format!("resolved {}", at.format("%Y-%m-%d %H:%M:%S")),
                    None => "open".to_string(),
                };
                println!(
                    "{}  {}  {:<12} {}  [{}]",
                    alert.id,
                    alert.created_at.format("%Y-%m-%d %H:%M:%S"),
                    alert.alert_type,
                    alert.message,
                    state
                );
            }
            Ok(())
        }
    }
}

async fn run(config: &Config, repos: Repositories) -> Result<()> {
    let engine = Arc::new(build_engine(config, repos)?);
    let scheduler = MonitorScheduler::new(engine);

    if config.scheduler.one_shot {
        let succeeded = scheduler.run_once().await?;
        info!("Completed one pass, {} checks succeeded", succeeded);
        return Ok(());
    }

    let handles = scheduler.schedule_all().await?;
    if handles.is_empty() {
        bail!("no active targets to monitor");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

async fn target(action: TargetCommand, repos: Repositories) -> Result<()> {
    match action {
        TargetCommand::Add { url, name, interval } => {
            let name = name.unwrap_or_else(|| url.clone());
            let target =
                Target::new(UuidGenerator.generate(), url, name, Duration::from_secs(interval));
            target.validate()?;
            repos.targets.save(&target).await?;
            println!("{}", target.id);
        }
        TargetCommand::List => {
            let mut targets = repos.targets.get_all().await?;
            targets.sort_by(|a, b| a.created_at.cmp(&b.created_at));

            for target in targets {
                println!(
                    "{}  {:<8} {:>6?}  {}  {}",
                    target.id,
                    if target.is_active { "active" } else { "paused" },
                    target.interval,
                    target.name,
                    target.url
                );
            }
        }
        TargetCommand::Remove { id } => {
            repos.targets.delete(&id).await?;
            println!("removed {id}");
        }
        TargetCommand::Pause { id } => set_active(&repos, &id, false).await?,
        TargetCommand::Resume { id } => set_active(&repos, &id, true).await?,
    }
    Ok(())
}

async fn set_active(repos: &Repositories, id: &str, active: bool) -> Result<()> {
    let mut target = repos.targets.find_by_id(id).await?;
    target.is_active = active;
    repos.targets.update(&target).await?;
    println!("{} {}", if active { "resumed" } else { "paused" }, id);
    Ok(())
}
