use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use geoconfess_sync::config::{
    CliConfig, FileConfig, DEFAULT_REFRESH_RATE_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use geoconfess_sync::model::{
    Message, Notification, NotificationModel, PriestAvailabilityNotification, ResourceId,
    UserInfo, UserRole,
};
use geoconfess_sync::{
    NotificationObserver, NotificationService, Session, StaticToken, SyncSettings,
};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Root of the server REST API.
    #[clap(long)]
    pub server_url: Option<String>,

    /// Bearer token obtained at login.
    #[clap(long)]
    pub access_token: String,

    /// Id of the logged-in user.
    #[clap(long)]
    pub user_id: u64,

    /// Role of the logged-in user.
    #[clap(long, default_value = "penitent")]
    pub role: UserRole,

    /// Seconds between two successful notification fetches.
    #[clap(long, default_value_t = DEFAULT_REFRESH_RATE_SECS)]
    pub refresh_rate: f64,

    /// HTTP request timeout in seconds.
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,
}

/// Logs every observer callback.
struct LoggingObserver;

impl NotificationObserver for LoggingObserver {
    fn did_add_notifications(&self, notifications: &[Notification]) {
        for notification in notifications {
            let subject = match &notification.model {
                NotificationModel::MeetRequest(mr) => {
                    format!("meet request {} ({})", mr.id, mr.status.as_str())
                }
                NotificationModel::Message(msg) => format!("message {}: {}", msg.id, msg.text),
            };
            info!(
                "Notification {} {} {}",
                notification.id,
                notification.action.as_str(),
                subject
            );
        }
    }

    fn did_delete_notifications(&self, notifications: &[Notification]) {
        info!("{} notifications left the server window", notifications.len());
    }

    fn did_add_messages(&self, messages: &[Message]) {
        info!("{} new messages", messages.len());
    }

    fn did_receive_push_notification(&self, notification: &Notification) {
        info!("Push notification {} resolved", notification.id);
    }

    fn did_receive_priest_availability(&self, notice: &PriestAvailabilityNotification) {
        info!(
            "Recurrence {} at {} starts in one hour",
            notice.recurrence_id, notice.spot_name
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        server_api_url: cli_args.server_url.clone(),
        refresh_rate_secs: cli_args.refresh_rate,
        request_timeout_secs: cli_args.request_timeout,
    };
    let settings = SyncSettings::resolve(&cli_config, file_config)?;

    let session = Arc::new(Session::new(
        UserInfo::anonymous(ResourceId(cli_args.user_id)),
        cli_args.role,
        Arc::new(StaticToken::new(cli_args.access_token)),
    ));
    if settings.bots_enabled() {
        warn!("Bots enabled: synthetic notifications will be mixed with server ones");
    }

    let service = NotificationService::connect(settings, session)
        .context("Failed to create notification service")?;
    let handle = service.handle();

    let observer = Arc::new(LoggingObserver);
    let observer_id = handle.add_observer(&observer);
    handle.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down...");

    handle.remove_observer(observer_id);
    service.shutdown().await;
    Ok(())
}
