//! DTOs used at the intake seam

use serde::{Deserialize, Serialize};

use crate::domain::config::GenerationConfig;

/// Request to create a new generation request
///
/// The request type is derived from the configuration's discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Target being manifested: a build id, an image reference or an advisory id
    pub identifier: String,
    pub config: GenerationConfig,
}
