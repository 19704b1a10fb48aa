//! Declarative work object
//!
//! Shared-state projection of one generation request. Its existence is the
//! sole trigger for reconciliation: the admission scheduler creates it once,
//! and from then on only the reconciliation controller mutates it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::config::{GenerationConfig, ResolvedConfig};
use crate::domain::request::{GenerationRequest, RequestStatus, RequestType, ResultCode};

/// Active projection of a generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkObject {
    /// Same id as the durable request record
    pub id: Uuid,
    pub request_type: RequestType,
    pub config: GenerationConfig,
    pub status: RequestStatus,
    pub result: Option<ResultCode>,
    pub reason: Option<String>,
    /// Product list resolved by the init phase
    pub resolved: Option<ResolvedConfig>,
    /// Correlation id propagated into execution jobs
    pub trace_id: String,
    /// Stored version for optimistic concurrency on updates
    pub version: i64,
}

impl WorkObject {
    /// Projects a freshly promoted request into a work object
    ///
    /// The object starts in SCHEDULED; the controller owns every later
    /// transition.
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            id: request.id,
            request_type: request.request_type,
            config: request.config.clone(),
            status: RequestStatus::Scheduled,
            result: None,
            reason: None,
            resolved: None,
            trace_id: Uuid::new_v4().simple().to_string(),
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
