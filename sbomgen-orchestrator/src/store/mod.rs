//! Storage and backend contracts
//!
//! Every collaborator of the engine is an explicit capability injected at
//! construction time: the durable request record store, the shared-state
//! work object store, the execution backend that runs generation tooling,
//! and manifest persistence. Postgres implementations live in
//! [`postgres`]; in-memory implementations for tests and embedding live in
//! [`memory`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use sbomgen_core::domain::job::{ExecutionJobSpec, JobObservation};
use sbomgen_core::domain::request::{GenerationRequest, RequestStatus, ResultCode};
use sbomgen_core::domain::work::WorkObject;
use sbomgen_core::dto::CreateRequest;

use crate::error::Result;

pub use memory::{
    InMemoryExecutionBackend, InMemoryManifestStore, InMemoryRequestStore, InMemoryWorkObjectStore,
};
pub use postgres::{PgManifestStore, PgRequestStore, PgWorkObjectStore};

/// Durable table of generation requests
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Creates a NEW record with a sortable id and the current time
    async fn create(&self, request: CreateRequest) -> Result<GenerationRequest>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GenerationRequest>>;

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<GenerationRequest>>;

    /// Atomically claims up to `limit` NEW records, oldest first, and marks
    /// them SCHEDULED
    ///
    /// Rows locked by a concurrent claim are skipped, so racing replicas
    /// never promote the same record twice.
    async fn claim_new(&self, limit: i64) -> Result<Vec<GenerationRequest>>;

    /// Mirrors a controller-written transition back onto the durable record
    async fn mirror_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        result: Option<ResultCode>,
        reason: Option<&str>,
    ) -> Result<()>;
}

/// Shared-state store of declarative work objects
#[async_trait]
pub trait WorkObjectStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<WorkObject>>;

    /// All work objects whose status is not terminal
    async fn list_active(&self) -> Result<Vec<WorkObject>>;

    /// Count used by the admission scheduler's back-pressure check
    async fn count_active(&self) -> Result<i64>;

    /// Create-if-absent keyed by id
    ///
    /// Returns false when an object with this id already exists.
    async fn create_if_absent(&self, work: &WorkObject) -> Result<bool>;

    /// Version-checked update of status, result, reason and resolved config
    ///
    /// Fails with [`crate::Error::Conflict`] when the stored version moved;
    /// the caller re-observes and retries on the next pass. Returns the
    /// object with its bumped version.
    async fn update(&self, work: &WorkObject) -> Result<WorkObject>;
}

/// Contract with the external job-execution substrate
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Create-if-absent submission keyed by the spec's deterministic name
    ///
    /// Returns false when a job with this name already exists, which makes
    /// "ensure desired state" idempotent at the reconciliation layer.
    async fn submit(&self, spec: &ExecutionJobSpec) -> Result<bool>;

    async fn observe(&self, name: &str) -> Result<Option<JobObservation>>;

    /// All jobs owned by one work object
    async fn list_owned(&self, owner: Uuid) -> Result<Vec<JobObservation>>;
}

/// Manifest persistence collaborator
///
/// Called only on the GENERATING -> FINISHED transition.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    async fn store_manifest(
        &self,
        request_id: Uuid,
        product_index: usize,
        bom: &serde_json::Value,
    ) -> Result<Uuid>;
}
