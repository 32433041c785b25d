use std::sync::Arc;

use pantry_watch::config::{get_config, NotificationConfig};
use pantry_watch::jobs::{CronHost, ExpirationCheckJob, RegistrationGuard, RetryPolicy};
use pantry_watch::logging::init_logging;
use pantry_watch::notify::{LogSink, NotificationSink, WebhookSink};
use pantry_watch::store::Database;
use tracing::{error, info};

fn build_sink(config: &NotificationConfig) -> Result<Arc<dyn NotificationSink>, Box<dyn std::error::Error>> {
    match (config.sink.as_str(), config.webhook_url.as_deref()) {
        ("webhook", Some(url)) => Ok(Arc::new(WebhookSink::new(url, config.permission_granted)?)),
        _ => Ok(Arc::new(LogSink::new(config.permission_granted))),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = get_config()?;
    init_logging(&config.logging);

    let Some(owner_id) = config.jobs.owner_id.as_deref().filter(|id| !id.trim().is_empty()) else {
        error!("No inventory owner configured; set PANTRY_OWNER_ID");
        return Err("jobs.owner_id is required".into());
    };

    let db = Database::connect(&config.database).await?;
    db.ensure_schema().await?;

    let sink = build_sink(&config.notifications)?;
    let job = Arc::new(ExpirationCheckJob::from_config(Arc::new(db), sink, config)?);

    // Registrations do not survive a restart; run once instead of waiting a full interval.
    let mut host = CronHost::new(RetryPolicy::from_config(&config.jobs))
        .await?
        .with_initial_run(config.jobs.run_on_start);
    host.start().await?;

    let registration = RegistrationGuard::from_config(&config.jobs)
        .ensure_registered(&host, owner_id, job)
        .await?;
    info!("Expiration check active ({:?})", registration);

    tokio::signal::ctrl_c().await?;
    host.shutdown().await?;

    Ok(())
}
