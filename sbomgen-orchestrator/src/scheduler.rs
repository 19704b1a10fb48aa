//! Admission scheduler
//!
//! Promotes queued generation requests into active work objects on a fixed
//! interval. Promotion is gated by leader election, bounded by the global
//! concurrency cap, and backed by a skip-locked claim so that racing
//! replicas never double-promote a record even when leadership overlaps
//! briefly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time;
use tracing::{debug, error, info, warn};

use sbomgen_core::domain::work::WorkObject;

use crate::config::Config;
use crate::error::Result;
use crate::leader::LeaderElector;
use crate::store::{RequestStore, WorkObjectStore};

/// Outcome of a single scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// This instance is not the leader
    NotLeader,
    /// A previous tick is still running
    Busy,
    /// The concurrency cap is reached; no records were fetched
    Saturated {
        /// Active work objects at decision time
        active: i64,
    },
    /// Promotion ran; `promoted` work objects were created
    Promoted {
        /// Records claimed from the queue
        claimed: usize,
        /// Work objects actually created
        promoted: usize,
    },
}

/// Periodic promoter of NEW generation requests
pub struct AdmissionScheduler {
    config: Config,
    requests: Arc<dyn RequestStore>,
    work_objects: Arc<dyn WorkObjectStore>,
    elector: Arc<dyn LeaderElector>,
    ticking: AtomicBool,
}

impl AdmissionScheduler {
    pub fn new(
        config: Config,
        requests: Arc<dyn RequestStore>,
        work_objects: Arc<dyn WorkObjectStore>,
        elector: Arc<dyn LeaderElector>,
    ) -> Self {
        Self {
            config,
            requests,
            work_objects,
            elector,
            ticking: AtomicBool::new(false),
        }
    }

    /// Runs the admission loop forever
    pub async fn run(&self) {
        info!(
            "Starting admission scheduler (interval: {:?}, cap: {}, batch: {})",
            self.config.sync_interval,
            self.config.max_concurrent_generations,
            self.config.sync_batch
        );

        let mut interval = time::interval(self.config.sync_interval);

        loop {
            interval.tick().await;

            match self.tick().await {
                Ok(TickOutcome::Promoted { claimed, promoted }) if claimed > 0 => {
                    info!("Promoted {} of {} claimed request(s)", promoted, claimed);
                }
                Ok(outcome) => {
                    debug!("Scheduler tick: {:?}", outcome);
                }
                Err(e) => {
                    // Fetch and lock failures are transient; the records stay
                    // NEW and are retried on the next tick.
                    error!("Scheduler tick failed: {:#}", e);
                }
            }
        }
    }

    /// Performs one promotion pass
    pub async fn tick(&self) -> Result<TickOutcome> {
        // Overlap guard: a slow pass must not stack with the next interval.
        if self.ticking.swap(true, Ordering::SeqCst) {
            return Ok(TickOutcome::Busy);
        }

        let outcome = self.tick_inner().await;
        self.ticking.store(false, Ordering::SeqCst);
        outcome
    }

    async fn tick_inner(&self) -> Result<TickOutcome> {
        if !self.elector.is_leader() {
            return Ok(TickOutcome::NotLeader);
        }

        let active = self.work_objects.count_active().await?;
        if active >= self.config.max_concurrent_generations {
            debug!(
                "Concurrency cap reached ({}/{}), skipping promotion",
                active, self.config.max_concurrent_generations
            );
            return Ok(TickOutcome::Saturated { active });
        }

        let claimed = self.requests.claim_new(self.config.sync_batch).await?;
        if claimed.is_empty() {
            return Ok(TickOutcome::Promoted {
                claimed: 0,
                promoted: 0,
            });
        }

        let mut promoted = 0;
        for record in &claimed {
            let work = WorkObject::from_request(record);
            if self.work_objects.create_if_absent(&work).await? {
                info!(
                    "Promoted request {} ({}) into active work",
                    record.id,
                    record.request_type.as_str()
                );
                promoted += 1;
            } else {
                // A leftover object from an earlier promotion that did not
                // complete cleanly; do not retry blindly.
                warn!(
                    "Work object for request {} already exists, skipping",
                    record.id
                );
            }
        }

        Ok(TickOutcome::Promoted {
            claimed: claimed.len(),
            promoted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbomgen_core::domain::config::{ContainerImageConfig, GenerationConfig};
    use sbomgen_core::domain::request::RequestStatus;
    use sbomgen_core::dto::CreateRequest;

    use crate::leader::StaticLeaderElector;
    use crate::store::{InMemoryRequestStore, InMemoryWorkObjectStore};

    struct Fixture {
        scheduler: AdmissionScheduler,
        requests: Arc<InMemoryRequestStore>,
        work_objects: Arc<InMemoryWorkObjectStore>,
        elector: Arc<StaticLeaderElector>,
    }

    fn fixture(max_concurrent: i64, sync_batch: i64) -> Fixture {
        let mut config = Config::default();
        config.max_concurrent_generations = max_concurrent;
        config.sync_batch = sync_batch;

        let requests = Arc::new(InMemoryRequestStore::new());
        let work_objects = Arc::new(InMemoryWorkObjectStore::new());
        let elector = Arc::new(StaticLeaderElector::new(true));

        let scheduler = AdmissionScheduler::new(
            config,
            requests.clone(),
            work_objects.clone(),
            elector.clone(),
        );

        Fixture {
            scheduler,
            requests,
            work_objects,
            elector,
        }
    }

    fn create_request() -> CreateRequest {
        CreateRequest {
            identifier: "registry.example.com/app@sha256:abc".to_string(),
            config: GenerationConfig::ContainerImage(ContainerImageConfig {
                image: "registry.example.com/app@sha256:abc".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_non_leader_tick_is_a_no_op() {
        let fixture = fixture(20, 10);
        fixture.requests.create(create_request()).await.unwrap();
        fixture.elector.set_leader(false);

        let outcome = fixture.scheduler.tick().await.unwrap();
        assert_eq!(outcome, TickOutcome::NotLeader);

        let new = fixture
            .requests
            .list_by_status(RequestStatus::New)
            .await
            .unwrap();
        assert_eq!(new.len(), 1);
        assert_eq!(fixture.work_objects.count_active().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_promotes_oldest_first_up_to_batch() {
        let fixture = fixture(20, 2);
        let first = fixture.requests.create(create_request()).await.unwrap();
        let second = fixture.requests.create(create_request()).await.unwrap();
        let third = fixture.requests.create(create_request()).await.unwrap();

        let outcome = fixture.scheduler.tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Promoted {
                claimed: 2,
                promoted: 2
            }
        );

        assert!(fixture.work_objects.get(first.id).await.unwrap().is_some());
        assert!(fixture.work_objects.get(second.id).await.unwrap().is_some());
        assert!(fixture.work_objects.get(third.id).await.unwrap().is_none());

        let scheduled = fixture
            .requests
            .list_by_status(RequestStatus::Scheduled)
            .await
            .unwrap();
        assert_eq!(scheduled.len(), 2);
    }

    #[tokio::test]
    async fn test_cap_blocks_promotion() {
        let fixture = fixture(1, 10);
        fixture.requests.create(create_request()).await.unwrap();
        fixture.requests.create(create_request()).await.unwrap();

        let outcome = fixture.scheduler.tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Promoted {
                claimed: 2,
                promoted: 2
            }
        );

        // Cap of 1 is now exceeded by the soft admission; next tick must not
        // promote anything further.
        fixture.requests.create(create_request()).await.unwrap();
        let outcome = fixture.scheduler.tick().await.unwrap();
        assert_eq!(outcome, TickOutcome::Saturated { active: 2 });

        let new = fixture
            .requests
            .list_by_status(RequestStatus::New)
            .await
            .unwrap();
        assert_eq!(new.len(), 1);
    }

    #[tokio::test]
    async fn test_no_double_promotion_across_ticks() {
        let fixture = fixture(20, 10);
        fixture.requests.create(create_request()).await.unwrap();
        fixture.requests.create(create_request()).await.unwrap();

        fixture.scheduler.tick().await.unwrap();
        let outcome = fixture.scheduler.tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Promoted {
                claimed: 0,
                promoted: 0
            }
        );

        assert_eq!(fixture.work_objects.count_active().await.unwrap(), 2);
        let scheduled = fixture
            .requests
            .list_by_status(RequestStatus::Scheduled)
            .await
            .unwrap();
        assert_eq!(scheduled.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_schedulers_never_double_promote() {
        // Two replicas share the same stores and both believe they lead;
        // the claim still hands every record out exactly once.
        let mut config = Config::default();
        config.sync_batch = 10;

        let requests = Arc::new(InMemoryRequestStore::new());
        let work_objects = Arc::new(InMemoryWorkObjectStore::new());
        let elector = Arc::new(StaticLeaderElector::new(true));

        for _ in 0..6 {
            requests.create(create_request()).await.unwrap();
        }

        let replica_a = AdmissionScheduler::new(
            config.clone(),
            requests.clone(),
            work_objects.clone(),
            elector.clone(),
        );
        let replica_b = AdmissionScheduler::new(
            config,
            requests.clone(),
            work_objects.clone(),
            elector.clone(),
        );

        let (a, b) = tokio::join!(replica_a.tick(), replica_b.tick());
        a.unwrap();
        b.unwrap();

        let scheduled = requests
            .list_by_status(RequestStatus::Scheduled)
            .await
            .unwrap();
        assert_eq!(scheduled.len(), 6);
        assert_eq!(work_objects.count_active().await.unwrap(), 6);
        assert!(
            requests
                .list_by_status(RequestStatus::New)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_existing_work_object_is_skipped() {
        let fixture = fixture(20, 10);
        let record = fixture.requests.create(create_request()).await.unwrap();

        // Simulate a promotion that wrote the work object but died before
        // flipping the record's status.
        let work = WorkObject::from_request(&record);
        fixture.work_objects.create_if_absent(&work).await.unwrap();

        let outcome = fixture.scheduler.tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Promoted {
                claimed: 1,
                promoted: 0
            }
        );
    }
}
