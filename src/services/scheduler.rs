use std::time::Duration;

use tracing::{info, warn};

use crate::error::AppError;
use crate::services::UpdateService;

/// Periodically replaces the cached snapshot with fresh portal data and
/// prunes expired interested sections.
pub struct RefreshScheduler {
    service: UpdateService,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(service: UpdateService, interval_secs: u64) -> Self {
        Self {
            service,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Runs the refresh loop forever. Errors are logged and the loop
    /// continues.
    pub async fn start(self) {
        info!("Starting refresh scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match self.run_refresh().await {
                Ok(swept) => {
                    info!("Periodic refresh completed (swept {} expired sections)", swept);
                }
                Err(e) => {
                    warn!("Periodic refresh failed: {:?}", e);
                }
            }
        }
    }

    async fn run_refresh(&self) -> Result<usize, AppError> {
        self.service.refresh_user_data(&[]).await?;
        self.service.sweep_expired_sections().await
    }
}
