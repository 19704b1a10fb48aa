//! Typed generation configuration
//!
//! Each request type carries its own configuration schema. The serialized
//! form is a tagged object whose `type` field selects the variant, so a
//! stored configuration blob can never be deserialized against the wrong
//! schema.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::request::RequestType;
use crate::error::DomainError;

/// Configuration payload of a generation request, keyed by request type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenerationConfig {
    #[serde(rename = "BUILD")]
    Build(BuildConfig),
    #[serde(rename = "OPERATION")]
    Operation(OperationConfig),
    #[serde(rename = "CONTAINERIMAGE")]
    ContainerImage(ContainerImageConfig),
    #[serde(rename = "ANALYSIS")]
    Analysis(AnalysisConfig),
    #[serde(rename = "BREW_RPM")]
    BrewRpm(BrewRpmConfig),
    #[serde(rename = "ADVISORY")]
    Advisory(AdvisoryConfig),
}

impl GenerationConfig {
    /// Request type this configuration belongs to
    pub fn request_type(&self) -> RequestType {
        match self {
            GenerationConfig::Build(_) => RequestType::Build,
            GenerationConfig::Operation(_) => RequestType::Operation,
            GenerationConfig::ContainerImage(_) => RequestType::ContainerImage,
            GenerationConfig::Analysis(_) => RequestType::Analysis,
            GenerationConfig::BrewRpm(_) => RequestType::BrewRpm,
            GenerationConfig::Advisory(_) => RequestType::Advisory,
        }
    }

    /// Validates the payload against its schema
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            GenerationConfig::Build(config) => {
                if config.build_id.is_empty() {
                    return Err(DomainError::InvalidConfig("build_id cannot be empty".into()));
                }
            }
            GenerationConfig::Operation(config) => {
                if config.operation_id.is_empty() {
                    return Err(DomainError::InvalidConfig(
                        "operation_id cannot be empty".into(),
                    ));
                }
            }
            GenerationConfig::ContainerImage(config) => {
                if config.image.is_empty() {
                    return Err(DomainError::InvalidConfig("image cannot be empty".into()));
                }
            }
            GenerationConfig::Analysis(config) => {
                if config.deliverable_urls.is_empty() {
                    return Err(DomainError::InvalidConfig(
                        "at least one deliverable URL is required".into(),
                    ));
                }
            }
            GenerationConfig::BrewRpm(config) => {
                if config.rpm.is_empty() {
                    return Err(DomainError::InvalidConfig("rpm cannot be empty".into()));
                }
            }
            GenerationConfig::Advisory(config) => {
                if config.advisory_id.is_empty() {
                    return Err(DomainError::InvalidConfig(
                        "advisory_id cannot be empty".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Checks that the payload's discriminator matches the recorded type
    pub fn ensure_type(&self, expected: RequestType) -> Result<(), DomainError> {
        let actual = self.request_type();
        if actual != expected {
            return Err(DomainError::TypeMismatch {
                expected: expected.as_str().to_string(),
                actual: actual.as_str().to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for manifesting a single build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub build_id: String,
    /// Products declared upfront; the init phase resolves the final list
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// Configuration for manifesting a multi-build operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationConfig {
    pub operation_id: String,
    #[serde(default)]
    pub deliverable_urls: Vec<String>,
}

/// Configuration for manifesting a container image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerImageConfig {
    /// Fully qualified image reference, digest preferred
    pub image: String,
}

/// Configuration for analysing pre-built deliverables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub deliverable_urls: Vec<String>,
}

/// Configuration for manifesting a single RPM build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrewRpmConfig {
    /// NVRA of the RPM build
    pub rpm: String,
}

/// Configuration for manifesting an advisory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    pub advisory_id: String,
}

/// One product entry of a resolved configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Generator tool to run for this product
    pub generator: String,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

/// Configuration resolved by the init phase
///
/// The generate phase fans out into one execution job per product entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub products: Vec<ProductConfig>,
}
