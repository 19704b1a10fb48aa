//! Postgres lease-based leader elector
//!
//! Leadership is a row in the `leader_leases` table. An instance acquires
//! the lease when the row is absent, expired, or already its own, and must
//! keep renewing it; the renewal loop runs at a third of the lease duration.
//! `is_leader()` reads a cached flag updated by that loop, so the check
//! itself never touches the database. Any database error clears the flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sqlx::PgPool;
use tracing::{debug, warn};

use crate::leader::LeaderElector;

const LOCK_KEY: &str = "admission-scheduler";

/// Leader elector backed by a lease row in Postgres
#[derive(Debug, Clone)]
pub struct PgLeaderElector {
    pool: PgPool,
    instance_id: String,
    lease: Duration,
    leader: Arc<AtomicBool>,
}

impl PgLeaderElector {
    pub fn new(pool: PgPool, instance_id: String, lease: Duration) -> Self {
        Self {
            pool,
            instance_id,
            lease,
            leader: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs the acquisition/renewal loop forever
    ///
    /// Intended to be spawned once per process.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.lease / 3);

        loop {
            interval.tick().await;

            match self.try_acquire().await {
                Ok(acquired) => {
                    let was_leader = self.leader.swap(acquired, Ordering::SeqCst);
                    if acquired && !was_leader {
                        tracing::info!("Acquired leadership as {}", self.instance_id);
                    } else if !acquired && was_leader {
                        warn!("Lost leadership as {}", self.instance_id);
                    } else {
                        debug!("Leadership state unchanged (leader: {})", acquired);
                    }
                }
                Err(e) => {
                    // Fail closed: unreachable lease infrastructure means no
                    // instance may promote work.
                    if self.leader.swap(false, Ordering::SeqCst) {
                        warn!("Dropping leadership, lease renewal failed: {}", e);
                    } else {
                        debug!("Lease acquisition failed: {}", e);
                    }
                }
            }
        }
    }

    /// Attempts to take or renew the lease
    async fn try_acquire(&self) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            r#"
            INSERT INTO leader_leases (lock_key, holder, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (lock_key) DO UPDATE
            SET holder = EXCLUDED.holder, expires_at = EXCLUDED.expires_at
            WHERE leader_leases.holder = EXCLUDED.holder
               OR leader_leases.expires_at < now()
            "#,
        )
        .bind(LOCK_KEY)
        .bind(&self.instance_id)
        .bind(self.lease.as_secs_f64())
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }
}

impl LeaderElector for PgLeaderElector {
    fn is_leader(&self) -> bool {
        self.leader.load(Ordering::SeqCst)
    }
}
