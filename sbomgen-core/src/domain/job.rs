//! Execution job types
//!
//! An execution job is one externally executed unit of work for one phase
//! (and optionally one product index) of a generation request. Job names are
//! deterministic so that repeated submission of the same desired state is
//! idempotent.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of the generation state machine backed by execution jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Init,
    Generate,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Init => "init",
            JobPhase::Generate => "generate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "init" => Some(JobPhase::Init),
            "generate" => Some(JobPhase::Generate),
            _ => None,
        }
    }
}

/// Deterministic job name for a (request, phase, index) triple
///
/// `<request-id>-<phase>` for singleton phases, `<request-id>-<phase>-<index>`
/// when the phase fans out per product.
pub fn job_name(owner: Uuid, phase: JobPhase, index: Option<usize>) -> String {
    match index {
        Some(index) => format!("{}-{}-{}", owner.simple(), phase.as_str(), index),
        None => format!("{}-{}", owner.simple(), phase.as_str()),
    }
}

/// Resource limits attached to an execution job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_millis: u32,
    pub memory_mib: u32,
}

/// Desired state of one execution job, handed to the execution backend
///
/// Building a spec is referentially transparent: the same work object, phase
/// and index always produce an identical spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionJobSpec {
    /// Deterministic name, also the create-if-absent key
    pub name: String,
    /// Work object owning this job, used for cascading cleanup
    pub owner: Uuid,
    pub phase: JobPhase,
    /// Product index for fanned-out generate jobs
    pub index: Option<usize>,
    /// Serialized input handed to the generation tooling
    pub payload: serde_json::Value,
    pub limits: ResourceLimits,
    /// Wall-clock limit enforced by the execution backend
    pub timeout_seconds: u64,
    /// Correlation id copied from the work object
    pub trace_id: String,
}

/// Observable state of an execution job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Pending,
    Succeeded,
    Failed { exit_code: i32 },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

/// Snapshot of one execution job as reported by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobObservation {
    pub name: String,
    pub owner: Uuid,
    pub phase: JobPhase,
    pub index: Option<usize>,
    pub state: JobState,
    /// Result payload declared by a succeeded job
    pub result: Option<serde_json::Value>,
}
