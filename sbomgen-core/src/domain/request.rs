//! Generation request domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::config::GenerationConfig;

/// Durable generation request record
///
/// Structure shared between the intake path (persists) and the engine
/// (promotes and reconciles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: Uuid,
    /// Target being manifested: a build id, an image reference or an advisory id.
    pub identifier: String,
    pub request_type: RequestType,
    pub config: GenerationConfig,
    pub status: RequestStatus,
    pub result: Option<ResultCode>,
    pub reason: Option<String>,
    pub creation_time: chrono::DateTime<chrono::Utc>,
}

impl GenerationRequest {
    /// Returns true when the request reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Kind of target a generation request manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Build,
    Operation,
    #[serde(rename = "CONTAINERIMAGE")]
    ContainerImage,
    Analysis,
    #[serde(rename = "BREW_RPM")]
    BrewRpm,
    Advisory,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Build => "BUILD",
            RequestType::Operation => "OPERATION",
            RequestType::ContainerImage => "CONTAINERIMAGE",
            RequestType::Analysis => "ANALYSIS",
            RequestType::BrewRpm => "BREW_RPM",
            RequestType::Advisory => "ADVISORY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUILD" => Some(RequestType::Build),
            "OPERATION" => Some(RequestType::Operation),
            "CONTAINERIMAGE" => Some(RequestType::ContainerImage),
            "ANALYSIS" => Some(RequestType::Analysis),
            "BREW_RPM" => Some(RequestType::BrewRpm),
            "ADVISORY" => Some(RequestType::Advisory),
            _ => None,
        }
    }
}

/// Lifecycle status of a generation request
///
/// Transitions are monotonic: NEW -> SCHEDULED -> INITIALIZING -> INITIALIZED
/// -> GENERATING -> FINISHED | FAILED. NEW and SCHEDULED exist only on the
/// durable record before admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    New,
    Scheduled,
    Initializing,
    Initialized,
    Generating,
    Finished,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::New => "NEW",
            RequestStatus::Scheduled => "SCHEDULED",
            RequestStatus::Initializing => "INITIALIZING",
            RequestStatus::Initialized => "INITIALIZED",
            RequestStatus::Generating => "GENERATING",
            RequestStatus::Finished => "FINISHED",
            RequestStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(RequestStatus::New),
            "SCHEDULED" => Some(RequestStatus::Scheduled),
            "INITIALIZING" => Some(RequestStatus::Initializing),
            "INITIALIZED" => Some(RequestStatus::Initialized),
            "GENERATING" => Some(RequestStatus::Generating),
            "FINISHED" => Some(RequestStatus::Finished),
            "FAILED" => Some(RequestStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Finished | RequestStatus::Failed)
    }
}

/// Result taxonomy exposed to API clients
///
/// Set only on terminal or phase-failure transitions, derived from the
/// generation tool's exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    Success,
    ErrGeneral,
    ErrConfigInvalid,
    ErrConfigMissing,
    ErrIndexInvalid,
    ErrGeneration,
    ErrSystem,
}

impl ResultCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::ErrGeneral => "ERR_GENERAL",
            ResultCode::ErrConfigInvalid => "ERR_CONFIG_INVALID",
            ResultCode::ErrConfigMissing => "ERR_CONFIG_MISSING",
            ResultCode::ErrIndexInvalid => "ERR_INDEX_INVALID",
            ResultCode::ErrGeneration => "ERR_GENERATION",
            ResultCode::ErrSystem => "ERR_SYSTEM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(ResultCode::Success),
            "ERR_GENERAL" => Some(ResultCode::ErrGeneral),
            "ERR_CONFIG_INVALID" => Some(ResultCode::ErrConfigInvalid),
            "ERR_CONFIG_MISSING" => Some(ResultCode::ErrConfigMissing),
            "ERR_INDEX_INVALID" => Some(ResultCode::ErrIndexInvalid),
            "ERR_GENERATION" => Some(ResultCode::ErrGeneration),
            "ERR_SYSTEM" => Some(ResultCode::ErrSystem),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            RequestStatus::New,
            RequestStatus::Scheduled,
            RequestStatus::Initializing,
            RequestStatus::Initialized,
            RequestStatus::Generating,
            RequestStatus::Finished,
            RequestStatus::Failed,
        ] {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("RUNNING"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RequestStatus::Finished.is_terminal());
        assert!(RequestStatus::Failed.is_terminal());
        assert!(!RequestStatus::Generating.is_terminal());
        assert!(!RequestStatus::New.is_terminal());
    }

    #[test]
    fn test_request_type_round_trip() {
        for request_type in [
            RequestType::Build,
            RequestType::Operation,
            RequestType::ContainerImage,
            RequestType::Analysis,
            RequestType::BrewRpm,
            RequestType::Advisory,
        ] {
            assert_eq!(RequestType::parse(request_type.as_str()), Some(request_type));
        }
    }

    #[test]
    fn test_result_code_serde_names() {
        let json = serde_json::to_value(ResultCode::ErrConfigInvalid).unwrap();
        assert_eq!(json, serde_json::json!("ERR_CONFIG_INVALID"));
        assert_eq!(ResultCode::parse("ERR_SYSTEM"), Some(ResultCode::ErrSystem));
    }
}
