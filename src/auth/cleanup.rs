//! Periodic purge of expired sessions.
//!
//! Each sweep runs under its own timeout. A failed or timed-out sweep is
//! logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::service::AuthService;

/// Run one sweep, bounded by `timeout`. Returns the number of rows deleted.
pub async fn sweep_once(service: &AuthService, timeout: Duration) -> Option<u64> {
    match tokio::time::timeout(timeout, service.cleanup_expired()).await {
        Ok(Ok(deleted)) => {
            if deleted > 0 {
                tracing::info!(deleted, "Session cleanup: purged expired sessions");
            } else {
                tracing::debug!("Session cleanup: nothing to purge");
            }
            Some(deleted)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Session cleanup failed; retrying next tick");
            None
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Session cleanup timed out; retrying next tick"
            );
            None
        }
    }
}

/// Run the cleanup loop until `cancel` fires.
///
/// The first sweep happens one full `every` after start.
pub async fn run(
    service: Arc<AuthService>,
    every: Duration,
    sweep_timeout: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = every.as_secs(),
        timeout_secs = sweep_timeout.as_secs(),
        "Session cleanup job started"
    );

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Skip the immediate first tick.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                sweep_once(&service, sweep_timeout).await;
            }
        }
    }
}

/// Spawn [`run`] on the current runtime.
pub fn spawn(
    service: Arc<AuthService>,
    every: Duration,
    sweep_timeout: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(service, every, sweep_timeout, cancel))
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::auth::service::{ClientInfo, Registration};
    use crate::auth::token::TokenIssuer;
    use crate::clock::ManualClock;
    use crate::db::SessionRepository;
    use crate::Database;
    use chrono::{TimeZone, Utc};

    async fn fixture() -> (Database, ManualClock, Arc<AuthService>) {
        let db = Database::open_in_memory().await.unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let service = Arc::new(AuthService::new(
            db.clone(),
            TokenIssuer::new("cleanup-secret"),
            Arc::new(clock.clone()),
            chrono::Duration::hours(1),
        ));
        (db, clock, service)
    }

    async fn register(service: &AuthService, email: &str) -> String {
        service
            .register(
                &Registration {
                    email: email.to_string(),
                    password: "password123".to_string(),
                    full_name: "Sweep".to_string(),
                },
                &ClientInfo::default(),
            )
            .await
            .unwrap()
            .session
            .id
    }

    #[tokio::test]
    async fn test_sweep_once_deletes_expired() {
        let (db, clock, service) = fixture().await;
        let session_id = register(&service, "a@example.com").await;

        assert_eq!(sweep_once(&service, Duration::from_secs(5)).await, Some(0));

        clock.advance(chrono::Duration::hours(2));
        assert_eq!(sweep_once(&service, Duration::from_secs(5)).await, Some(1));
        assert!(SessionRepository::new(db.pool())
            .get_by_id(&session_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sweep_once_failure_is_swallowed() {
        let (db, _clock, service) = fixture().await;
        db.close().await;
        assert_eq!(sweep_once(&service, Duration::from_secs(5)).await, None);
    }

    #[tokio::test]
    async fn test_run_sweeps_on_interval_and_stops_on_cancel() {
        let (db, clock, service) = fixture().await;
        let session_id = register(&service, "a@example.com").await;
        clock.advance(chrono::Duration::hours(2));

        let cancel = CancellationToken::new();
        let handle = spawn(
            service.clone(),
            Duration::from_millis(20),
            Duration::from_secs(5),
            cancel.clone(),
        );

        let sessions = SessionRepository::new(db.pool());
        let mut purged = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if sessions.get_by_id(&session_id).await.unwrap().is_none() {
                purged = true;
                break;
            }
        }
        assert!(purged, "expired session was never swept");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cleanup task did not stop")
            .unwrap();
    }
}
