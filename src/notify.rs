use async_trait::async_trait;
use tracing::{info, warn};

/// Best-effort outbound mail. Delivery failures are logged by callers and never
/// surfaced to the client.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Default notifier: records the message in the log stream. Stands in for a
/// real mail relay in development and tests.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, body_len = body.len(), "notification dispatched");
        Ok(())
    }
}

/// Fire-and-forget wrapper used by handlers: a notifier failure must not fail
/// the triggering request.
pub async fn notify_best_effort(notifier: &dyn Notifier, to: &str, subject: &str, body: &str) {
    if let Err(e) = notifier.send(to, subject, body).await {
        warn!(error = %e, %to, "notification failed; continuing");
    }
}
