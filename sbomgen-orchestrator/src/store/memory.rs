//! In-memory store implementations
//!
//! Single-process implementations of the storage and backend contracts,
//! suitable for tests and local development. All state is lost when the
//! process exits; there is no cross-process coordination.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use sbomgen_core::domain::job::{ExecutionJobSpec, JobObservation, JobState};
use sbomgen_core::domain::request::{GenerationRequest, RequestStatus, ResultCode};
use sbomgen_core::domain::work::WorkObject;
use sbomgen_core::dto::CreateRequest;

use crate::error::{Error, Result};
use crate::store::{ExecutionBackend, ManifestStore, RequestStore, WorkObjectStore};

/// In-memory request record store
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    records: RwLock<HashMap<Uuid, GenerationRequest>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn create(&self, request: CreateRequest) -> Result<GenerationRequest> {
        request.config.validate()?;

        let record = GenerationRequest {
            id: Uuid::now_v7(),
            identifier: request.identifier,
            request_type: request.config.request_type(),
            config: request.config,
            status: RequestStatus::New,
            result: None,
            reason: None,
            creation_time: chrono::Utc::now(),
        };

        let mut records = self.records.write().unwrap();
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GenerationRequest>> {
        let records = self.records.read().unwrap();
        Ok(records.get(&id).cloned())
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<GenerationRequest>> {
        let records = self.records.read().unwrap();
        let mut matching: Vec<GenerationRequest> = records
            .values()
            .filter(|record| record.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|record| (record.creation_time, record.id));
        Ok(matching)
    }

    async fn claim_new(&self, limit: i64) -> Result<Vec<GenerationRequest>> {
        let mut records = self.records.write().unwrap();

        let mut candidates: Vec<Uuid> = records
            .values()
            .filter(|record| record.status == RequestStatus::New)
            .map(|record| record.id)
            .collect();
        candidates.sort_by_key(|id| {
            let record = &records[id];
            (record.creation_time, record.id)
        });
        candidates.truncate(limit.max(0) as usize);

        let mut claimed = Vec::with_capacity(candidates.len());
        for id in candidates {
            let record = records.get_mut(&id).expect("candidate id present");
            record.status = RequestStatus::Scheduled;
            claimed.push(record.clone());
        }
        Ok(claimed)
    }

    async fn mirror_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        result: Option<ResultCode>,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let record = records.get_mut(&id).ok_or(Error::NotFound(id))?;
        record.status = status;
        record.result = result;
        record.reason = reason.map(str::to_string);
        Ok(())
    }
}

/// In-memory work object store
#[derive(Debug, Default)]
pub struct InMemoryWorkObjectStore {
    objects: RwLock<HashMap<Uuid, WorkObject>>,
}

impl InMemoryWorkObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkObjectStore for InMemoryWorkObjectStore {
    async fn get(&self, id: Uuid) -> Result<Option<WorkObject>> {
        let objects = self.objects.read().unwrap();
        Ok(objects.get(&id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<WorkObject>> {
        let objects = self.objects.read().unwrap();
        let mut active: Vec<WorkObject> = objects
            .values()
            .filter(|work| !work.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|work| work.id);
        Ok(active)
    }

    async fn count_active(&self) -> Result<i64> {
        let objects = self.objects.read().unwrap();
        Ok(objects.values().filter(|work| !work.is_terminal()).count() as i64)
    }

    async fn create_if_absent(&self, work: &WorkObject) -> Result<bool> {
        let mut objects = self.objects.write().unwrap();
        if objects.contains_key(&work.id) {
            return Ok(false);
        }
        objects.insert(work.id, work.clone());
        Ok(true)
    }

    async fn update(&self, work: &WorkObject) -> Result<WorkObject> {
        let mut objects = self.objects.write().unwrap();
        let stored = objects.get_mut(&work.id).ok_or(Error::NotFound(work.id))?;

        if stored.version != work.version {
            return Err(Error::Conflict(work.id));
        }

        *stored = WorkObject {
            version: work.version + 1,
            ..work.clone()
        };
        Ok(stored.clone())
    }
}

/// In-memory execution backend
///
/// Jobs submitted here never run; tests drive their terminal state through
/// [`InMemoryExecutionBackend::complete`].
#[derive(Debug, Default)]
pub struct InMemoryExecutionBackend {
    jobs: RwLock<HashMap<String, JobObservation>>,
}

impl InMemoryExecutionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a job terminal with the given state and result payload
    pub fn complete(&self, name: &str, state: JobState, result: Option<serde_json::Value>) {
        let mut jobs = self.jobs.write().unwrap();
        if let Some(job) = jobs.get_mut(name) {
            job.state = state;
            job.result = result;
        }
    }

    /// Removes a job, simulating external deletion
    pub fn remove(&self, name: &str) {
        self.jobs.write().unwrap().remove(name);
    }

    /// Number of jobs ever submitted and still known to the backend
    pub fn job_count(&self) -> usize {
        self.jobs.read().unwrap().len()
    }
}

#[async_trait]
impl ExecutionBackend for InMemoryExecutionBackend {
    async fn submit(&self, spec: &ExecutionJobSpec) -> Result<bool> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&spec.name) {
            return Ok(false);
        }
        jobs.insert(
            spec.name.clone(),
            JobObservation {
                name: spec.name.clone(),
                owner: spec.owner,
                phase: spec.phase,
                index: spec.index,
                state: JobState::Pending,
                result: None,
            },
        );
        Ok(true)
    }

    async fn observe(&self, name: &str) -> Result<Option<JobObservation>> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs.get(name).cloned())
    }

    async fn list_owned(&self, owner: Uuid) -> Result<Vec<JobObservation>> {
        let jobs = self.jobs.read().unwrap();
        let mut owned: Vec<JobObservation> = jobs
            .values()
            .filter(|job| job.owner == owner)
            .cloned()
            .collect();
        owned.sort_by(|a, b| (a.phase.as_str(), a.index).cmp(&(b.phase.as_str(), b.index)));
        Ok(owned)
    }
}

/// In-memory manifest store
#[derive(Debug, Default)]
pub struct InMemoryManifestStore {
    manifests: RwLock<Vec<(Uuid, usize, serde_json::Value)>>,
}

impl InMemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manifests stored for one request, ordered by product index
    pub fn stored_for(&self, request_id: Uuid) -> Vec<(usize, serde_json::Value)> {
        let manifests = self.manifests.read().unwrap();
        let mut stored: Vec<(usize, serde_json::Value)> = manifests
            .iter()
            .filter(|(id, _, _)| *id == request_id)
            .map(|(_, index, bom)| (*index, bom.clone()))
            .collect();
        stored.sort_by_key(|(index, _)| *index);
        stored
    }
}

#[async_trait]
impl ManifestStore for InMemoryManifestStore {
    async fn store_manifest(
        &self,
        request_id: Uuid,
        product_index: usize,
        bom: &serde_json::Value,
    ) -> Result<Uuid> {
        let mut manifests = self.manifests.write().unwrap();
        manifests.push((request_id, product_index, bom.clone()));
        Ok(Uuid::now_v7())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbomgen_core::domain::config::{ContainerImageConfig, GenerationConfig};
    use sbomgen_core::domain::job::{JobPhase, ResourceLimits, job_name};

    fn create_request() -> CreateRequest {
        CreateRequest {
            identifier: "registry.example.com/app@sha256:abc".to_string(),
            config: GenerationConfig::ContainerImage(ContainerImageConfig {
                image: "registry.example.com/app@sha256:abc".to_string(),
            }),
        }
    }

    fn spec(owner: Uuid, phase: JobPhase, index: Option<usize>) -> ExecutionJobSpec {
        ExecutionJobSpec {
            name: job_name(owner, phase, index),
            owner,
            phase,
            index,
            payload: serde_json::json!({}),
            limits: ResourceLimits {
                cpu_millis: 500,
                memory_mib: 512,
            },
            timeout_seconds: 300,
            trace_id: "trace".to_string(),
        }
    }

    #[tokio::test]
    async fn test_claim_new_is_fifo_and_exhaustive() {
        let store = InMemoryRequestStore::new();
        let first = store.create(create_request()).await.unwrap();
        let second = store.create(create_request()).await.unwrap();
        let third = store.create(create_request()).await.unwrap();

        let claimed = store.claim_new(2).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].id, first.id);
        assert_eq!(claimed[1].id, second.id);
        assert!(claimed.iter().all(|r| r.status == RequestStatus::Scheduled));

        // Already claimed records are not handed out again
        let claimed = store.claim_new(10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, third.id);

        let claimed = store.claim_new(10).await.unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn test_work_object_update_checks_version() {
        let store = InMemoryWorkObjectStore::new();
        let request = InMemoryRequestStore::new()
            .create(create_request())
            .await
            .unwrap();
        let work = WorkObject::from_request(&request);

        assert!(store.create_if_absent(&work).await.unwrap());
        assert!(!store.create_if_absent(&work).await.unwrap());

        let mut first = store.get(work.id).await.unwrap().unwrap();
        let mut second = first.clone();

        first.status = RequestStatus::Initializing;
        let updated = store.update(&first).await.unwrap();
        assert_eq!(updated.version, 1);

        // The stale copy loses the race
        second.status = RequestStatus::Failed;
        let err = store.update(&second).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_backend_submit_is_create_if_absent() {
        let backend = InMemoryExecutionBackend::new();
        let owner = Uuid::now_v7();
        let spec = spec(owner, JobPhase::Init, None);

        assert!(backend.submit(&spec).await.unwrap());
        assert!(!backend.submit(&spec).await.unwrap());
        assert_eq!(backend.job_count(), 1);

        let observed = backend.observe(&spec.name).await.unwrap().unwrap();
        assert_eq!(observed.state, JobState::Pending);
    }

    #[tokio::test]
    async fn test_backend_lists_owned_jobs_in_order() {
        let backend = InMemoryExecutionBackend::new();
        let owner = Uuid::now_v7();
        let other = Uuid::now_v7();

        backend
            .submit(&spec(owner, JobPhase::Generate, Some(1)))
            .await
            .unwrap();
        backend
            .submit(&spec(owner, JobPhase::Generate, Some(0)))
            .await
            .unwrap();
        backend.submit(&spec(owner, JobPhase::Init, None)).await.unwrap();
        backend.submit(&spec(other, JobPhase::Init, None)).await.unwrap();

        let owned = backend.list_owned(owner).await.unwrap();
        assert_eq!(owned.len(), 3);
        assert_eq!(owned[0].phase, JobPhase::Generate);
        assert_eq!(owned[0].index, Some(0));
        assert_eq!(owned[1].index, Some(1));
        assert_eq!(owned[2].phase, JobPhase::Init);
    }
}
