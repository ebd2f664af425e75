//! AirAlert - PurpleAir air-quality email alerts.
//!
//! Run with: `cargo run -p airalert-service -- --config config.toml`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use airalert_core::{AlertEngine, AqiCategory, Clock, Notifier, SensorSource, SystemClock, calc_aqi};
use airalert_service::{
    AlertLoop, Config, DigestLoop, LogNotifier, Mailer, PurpleAirSource, SmtpNotifier,
    default_config_path,
};
use airalert_store::StateStore;

/// AirAlert - emails people when nearby air quality turns unhealthy.
#[derive(Parser, Debug)]
#[command(name = "airalert")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// State file path (overrides config).
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Log messages instead of sending them.
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the daemon in the foreground (default behavior).
    Run,

    /// Poll once, send whatever is due, and exit.
    Once,

    /// Load and validate the configuration, then exit.
    CheckConfig,

    /// Print the AQI for a PM2.5 concentration.
    Aqi {
        /// Concentration in µg/m³.
        #[arg(allow_hyphen_values = true)]
        pm25: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("airalert=info".parse()?)
                .add_directive("airalert_service=info".parse()?)
                .add_directive("airalert_core=info".parse()?)
                .add_directive("airalert_store=info".parse()?),
        )
        .init();

    match args.command.take().unwrap_or(Command::Run) {
        Command::Aqi { pm25 } => {
            let aqi = calc_aqi(pm25);
            println!(
                "PM2.5 {} µg/m³ -> AQI {:.0} ({})",
                pm25,
                aqi,
                AqiCategory::from_aqi(aqi)
            );
            Ok(())
        }
        Command::CheckConfig => check_config(&args),
        Command::Run => run_daemon(load_config(&args)?, args.dry_run).await,
        Command::Once => run_once(load_config(&args)?, args.dry_run).await,
    }
}

fn config_path(args: &Args) -> PathBuf {
    args.config.clone().unwrap_or_else(default_config_path)
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let path = config_path(args);
    let mut config = Config::load(&path)?;

    // Override config with CLI args
    if let Some(state_file) = &args.state_file {
        config.state_file = state_file.clone();
    }

    if args.dry_run {
        config.validate_dry_run()?;
    } else {
        config.validate()?;
    }

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn check_config(args: &Args) -> anyhow::Result<()> {
    let config = load_config(args)?;

    println!("Configuration OK: {}", config_path(args).display());
    println!("  sensors:        {}", config.sensors.join(", "));
    println!("  threshold:      AQI {}", config.report_threshold);
    println!("  update period:  {} min", config.update_period);
    println!("  cooldown:       {} min", config.cooldown_time);
    println!("  status digest:  {:02}:00 local", config.status_email_hour);
    println!("  state file:     {}", config.state_file.display());
    println!(
        "  mail:           {}:{} (tls: {}, login: {})",
        config.email.smtp_addr,
        config.email.smtp_port,
        config.email.use_tls,
        config.email.login_required
    );
    println!("  recipients:     {}", config.email.addresses.join(", "));
    Ok(())
}

struct Parts {
    engine: AlertEngine,
    store: StateStore,
    source: Arc<dyn SensorSource>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    sensors: Arc<[String]>,
}

fn build_parts(config: &Config, dry_run: bool) -> anyhow::Result<Parts> {
    let store = StateStore::open(&config.state_file)
        .with_context(|| format!("Failed to open state file {}", config.state_file.display()))?;
    let state = store.load()?;
    info!(
        "Restored alert state from {} (alerting: {})",
        store.path().display(),
        state.was_high
    );

    let source = PurpleAirSource::new(&config.source).context("Failed to build HTTP client")?;

    let notifier: Arc<dyn Notifier> = if dry_run {
        info!("Dry run: messages will be logged, not sent");
        Arc::new(LogNotifier)
    } else {
        Arc::new(SmtpNotifier::new(&config.email)?)
    };

    Ok(Parts {
        engine: AlertEngine::new(config.policy(), state),
        store,
        source: Arc::new(source),
        notifier,
        clock: Arc::new(SystemClock::new()),
        sensors: config.sensors.clone().into(),
    })
}

async fn run_daemon(config: Config, dry_run: bool) -> anyhow::Result<()> {
    let parts = build_parts(&config, dry_run)?;

    info!(
        "Starting AirAlert: {} sensor(s), threshold AQI {}, cooldown {} min, digest at {:02}:00",
        parts.sensors.len(),
        config.report_threshold,
        config.cooldown_time,
        config.status_email_hour
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let (mailer, handle) = Mailer::new(
        parts.notifier,
        config.renderer(),
        Arc::clone(&parts.clock),
    );

    let alert = AlertLoop::new(
        parts.engine,
        parts.store,
        Arc::clone(&parts.source),
        Arc::clone(&parts.clock),
        Arc::clone(&parts.sensors),
        handle.clone(),
    );
    let digest = DigestLoop::new(
        parts.source,
        parts.clock,
        parts.sensors,
        config.status_email_hour,
        handle,
    );

    let mailer_task = tokio::spawn(mailer.run());
    let alert_task = tokio::spawn(alert.run(config.update_interval(), stop_rx.clone()));
    let digest_task = tokio::spawn(digest.run(stop_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    let _ = stop_tx.send(true);

    let _ = alert_task.await;
    let _ = digest_task.await;
    // Both loops dropped their handles, so the mailer drains and exits.
    let _ = mailer_task.await;

    Ok(())
}

async fn run_once(config: Config, dry_run: bool) -> anyhow::Result<()> {
    let parts = build_parts(&config, dry_run)?;
    let (mailer, handle) = Mailer::new(
        parts.notifier,
        config.renderer(),
        Arc::clone(&parts.clock),
    );
    let mailer_task = tokio::spawn(mailer.run());

    let mut alert = AlertLoop::new(
        parts.engine,
        parts.store,
        parts.source,
        parts.clock,
        parts.sensors,
        handle,
    );
    match alert.run_once(config.status_email_hour).await {
        Some(evaluation) => info!(
            "AQI {:.1}, decision: {}",
            evaluation.aqi,
            evaluation.decision.kind()
        ),
        None => info!("No readings this run"),
    }

    drop(alert);
    let _ = mailer_task.await;
    Ok(())
}
