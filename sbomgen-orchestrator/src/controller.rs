//! Reconciliation controller
//!
//! Level-triggered control loop driving one work object through its phases.
//! Every decision is derived from currently observed state: the work object
//! and the set of execution jobs it owns. Actions are idempotent (job names
//! are deterministic, submission is create-if-absent) and status writes are
//! version-checked, so the loop is safe to invoke redundantly and safe to
//! replay after a crash mid-transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sbomgen_core::domain::config::ResolvedConfig;
use sbomgen_core::domain::job::{JobObservation, JobPhase, JobState};
use sbomgen_core::domain::manifest::validate_bom;
use sbomgen_core::domain::request::{RequestStatus, ResultCode};
use sbomgen_core::domain::work::WorkObject;

use crate::classifier::classify;
use crate::error::{Error, Result};
use crate::factory::JobFactory;
use crate::store::{ExecutionBackend, ManifestStore, RequestStore, WorkObjectStore};

const REASON_MISSING_JOB: &str = "Generation failed: unable to find related job";

/// Outcome of one reconciliation pass over a work object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Observed state requires no action yet
    Unchanged,
    /// The work object moved to a new status
    Transitioned(RequestStatus),
}

/// Level-triggered reconciler for active work objects
pub struct ReconciliationController {
    work_objects: Arc<dyn WorkObjectStore>,
    backend: Arc<dyn ExecutionBackend>,
    manifests: Arc<dyn ManifestStore>,
    requests: Arc<dyn RequestStore>,
    factory: JobFactory,
    resync_interval: Duration,
}

impl ReconciliationController {
    pub fn new(
        work_objects: Arc<dyn WorkObjectStore>,
        backend: Arc<dyn ExecutionBackend>,
        manifests: Arc<dyn ManifestStore>,
        requests: Arc<dyn RequestStore>,
        factory: JobFactory,
        resync_interval: Duration,
    ) -> Self {
        Self {
            work_objects,
            backend,
            manifests,
            requests,
            factory,
            resync_interval,
        }
    }

    /// Runs the periodic resync loop forever
    pub async fn run(&self) {
        info!(
            "Starting reconciliation controller (resync: {:?})",
            self.resync_interval
        );

        let mut interval = time::interval(self.resync_interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.resync_once().await {
                error!("Resync pass failed: {:#}", e);
            }
        }
    }

    /// Reconciles every active work object once
    pub async fn resync_once(&self) -> Result<usize> {
        let active = self.work_objects.list_active().await?;
        let mut transitions = 0;

        for work in active {
            match self.reconcile(work.id).await {
                Ok(ReconcileOutcome::Transitioned(_)) => transitions += 1,
                Ok(ReconcileOutcome::Unchanged) => {}
                Err(e) if e.is_conflict() => {
                    // Someone else advanced this object; re-observe next pass.
                    debug!("Reconcile conflict for {}, will re-observe", work.id);
                }
                Err(e) => {
                    // Infrastructure errors leave the object untouched; it is
                    // retried on the next resync.
                    error!("Failed to reconcile {}: {:#}", work.id, e);
                }
            }
        }

        Ok(transitions)
    }

    /// Performs one reconciliation pass for a single work object
    pub async fn reconcile(&self, id: Uuid) -> Result<ReconcileOutcome> {
        let Some(mut work) = self.work_objects.get(id).await? else {
            warn!("Work object {} no longer exists, skipping", id);
            return Ok(ReconcileOutcome::Unchanged);
        };

        match work.status {
            // Terminal states accept no further transitions and spawn no
            // further jobs.
            RequestStatus::Finished | RequestStatus::Failed => Ok(ReconcileOutcome::Unchanged),
            RequestStatus::Scheduled => self.start_initialization(&mut work).await,
            RequestStatus::Initializing => self.observe_initialization(&mut work).await,
            RequestStatus::Initialized => self.start_generation(&mut work).await,
            RequestStatus::Generating => self.observe_generation(&mut work).await,
            RequestStatus::New => {
                warn!("Work object {} has pre-admission status NEW, skipping", id);
                Ok(ReconcileOutcome::Unchanged)
            }
        }
    }

    /// SCHEDULED: ensure the init job exists, then enter INITIALIZING
    async fn start_initialization(&self, work: &mut WorkObject) -> Result<ReconcileOutcome> {
        let spec = match self.factory.build(work, JobPhase::Init, None) {
            Ok(spec) => spec,
            Err(e) => {
                return self
                    .fail(
                        work,
                        ResultCode::ErrSystem,
                        format!("Generation failed: unable to construct the init job: {}", e),
                    )
                    .await;
            }
        };

        if self.backend.submit(&spec).await? {
            debug!("Created init job {} for {}", spec.name, work.id);
        }

        self.transition(work, RequestStatus::Initializing, None, None)
            .await?;
        Ok(ReconcileOutcome::Transitioned(RequestStatus::Initializing))
    }

    /// INITIALIZING: wait for the init job and act on its terminal state
    async fn observe_initialization(&self, work: &mut WorkObject) -> Result<ReconcileOutcome> {
        let jobs = self.backend.list_owned(work.id).await?;
        let Some(init) = jobs.iter().find(|job| job.phase == JobPhase::Init) else {
            return self
                .fail(work, ResultCode::ErrSystem, REASON_MISSING_JOB.to_string())
                .await;
        };

        match init.state {
            JobState::Pending => Ok(ReconcileOutcome::Unchanged),
            JobState::Failed { exit_code } => {
                let (code, reason) = classify_failure(exit_code);
                self.fail(work, code, reason.to_string()).await
            }
            JobState::Succeeded => {
                let resolved = init
                    .result
                    .clone()
                    .and_then(|payload| serde_json::from_value::<ResolvedConfig>(payload).ok());
                let Some(resolved) = resolved.filter(|r| !r.products.is_empty()) else {
                    return self
                        .fail(
                            work,
                            ResultCode::ErrSystem,
                            "Generation failed: init job reported no usable configuration"
                                .to_string(),
                        )
                        .await;
                };

                work.resolved = Some(resolved);
                self.transition(work, RequestStatus::Initialized, None, None)
                    .await?;

                // INITIALIZED is not a wait state; fan out immediately.
                self.start_generation(work).await
            }
        }
    }

    /// INITIALIZED: create one generate job per resolved product
    async fn start_generation(&self, work: &mut WorkObject) -> Result<ReconcileOutcome> {
        let Some(resolved) = work.resolved.clone() else {
            return self
                .fail(
                    work,
                    ResultCode::ErrSystem,
                    "Generation failed: resolved configuration is missing".to_string(),
                )
                .await;
        };

        for index in 0..resolved.products.len() {
            let spec = match self.factory.build(work, JobPhase::Generate, Some(index)) {
                Ok(spec) => spec,
                Err(e) => {
                    return self
                        .fail(
                            work,
                            ResultCode::ErrSystem,
                            format!(
                                "Generation failed: unable to construct a generate job: {}",
                                e
                            ),
                        )
                        .await;
                }
            };

            if self.backend.submit(&spec).await? {
                debug!("Created generate job {} for {}", spec.name, work.id);
            }
        }

        self.transition(work, RequestStatus::Generating, None, None)
            .await?;
        Ok(ReconcileOutcome::Transitioned(RequestStatus::Generating))
    }

    /// GENERATING: wait for all generate jobs, then collect their manifests
    async fn observe_generation(&self, work: &mut WorkObject) -> Result<ReconcileOutcome> {
        let jobs = self.backend.list_owned(work.id).await?;
        let mut generate: Vec<&JobObservation> = jobs
            .iter()
            .filter(|job| job.phase == JobPhase::Generate)
            .collect();
        generate.sort_by_key(|job| job.index);

        if generate.is_empty() {
            return self
                .fail(work, ResultCode::ErrSystem, REASON_MISSING_JOB.to_string())
                .await;
        }

        if generate.iter().any(|job| !job.state.is_terminal()) {
            return Ok(ReconcileOutcome::Unchanged);
        }

        let first_failed = generate.iter().find_map(|job| match job.state {
            JobState::Failed { exit_code } => Some((*job, exit_code)),
            _ => None,
        });
        if let Some((failed, exit_code)) = first_failed {
            let (code, reason) = classify_failure(exit_code);
            return self
                .fail(work, code, format!("{} (job {})", reason, failed.name))
                .await;
        }

        // All jobs succeeded; every artifact must be a valid manifest before
        // anything is persisted.
        let mut manifests = Vec::with_capacity(generate.len());
        for job in &generate {
            let Some(bom) = job.result.as_ref() else {
                return self
                    .fail(
                        work,
                        ResultCode::ErrGeneration,
                        format!("Generation failed: job {} produced no manifest", job.name),
                    )
                    .await;
            };

            if let Err(e) = validate_bom(bom) {
                return self
                    .fail(
                        work,
                        ResultCode::ErrGeneration,
                        format!(
                            "Generation failed: job {} produced an invalid manifest: {}",
                            job.name, e
                        ),
                    )
                    .await;
            }

            manifests.push((job.index.unwrap_or(0), (*bom).clone()));
        }

        for (index, bom) in &manifests {
            self.manifests.store_manifest(work.id, *index, bom).await?;
        }

        let count = manifests.len();
        self.transition(
            work,
            RequestStatus::Finished,
            Some(ResultCode::Success),
            Some(format!("Generated {} manifest(s)", count)),
        )
        .await?;
        Ok(ReconcileOutcome::Transitioned(RequestStatus::Finished))
    }

    /// Writes status, result and reason onto the work object in one
    /// version-checked update, then mirrors the transition onto the durable
    /// record
    async fn transition(
        &self,
        work: &mut WorkObject,
        status: RequestStatus,
        result: Option<ResultCode>,
        reason: Option<String>,
    ) -> Result<()> {
        work.status = status;
        work.result = result;
        work.reason = reason;
        *work = self.work_objects.update(work).await?;

        match self
            .requests
            .mirror_status(work.id, work.status, work.result, work.reason.as_deref())
            .await
        {
            Ok(()) => {}
            Err(Error::NotFound(_)) => {
                // A work object can outlive its record under operator
                // intervention; reconciliation still completes.
                debug!("No durable record to mirror for {}", work.id);
            }
            Err(e) => return Err(e),
        }

        info!("Request {} transitioned to {}", work.id, status.as_str());
        Ok(())
    }

    async fn fail(
        &self,
        work: &mut WorkObject,
        code: ResultCode,
        reason: String,
    ) -> Result<ReconcileOutcome> {
        warn!("Request {} failed with {}: {}", work.id, code.as_str(), reason);
        self.transition(work, RequestStatus::Failed, Some(code), Some(reason))
            .await?;
        Ok(ReconcileOutcome::Transitioned(RequestStatus::Failed))
    }
}

/// Maps a failed job's exit code to a failure result
///
/// Exit code 0 on a failed job is still a failure; it collapses to a system
/// error rather than surfacing SUCCESS on a FAILED request.
fn classify_failure(exit_code: i32) -> (ResultCode, &'static str) {
    match classify(exit_code) {
        (ResultCode::Success, _) => (ResultCode::ErrSystem, "A system error occurred"),
        classified => classified,
    }
}
