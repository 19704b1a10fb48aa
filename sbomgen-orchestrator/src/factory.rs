//! Execution job factory
//!
//! Builds the desired job specification for a (work object, phase, index)
//! triple. The factory is a pure function of its inputs: identical inputs
//! yield identical specs, which is what makes create-if-absent submission
//! idempotent at the reconciliation layer.

use serde_json::json;

use sbomgen_core::domain::job::{ExecutionJobSpec, JobPhase, ResourceLimits, job_name};
use sbomgen_core::domain::work::WorkObject;

use crate::config::Config;
use crate::error::{Error, Result};

const INIT_LIMITS: ResourceLimits = ResourceLimits {
    cpu_millis: 500,
    memory_mib: 512,
};

const GENERATE_LIMITS: ResourceLimits = ResourceLimits {
    cpu_millis: 1000,
    memory_mib: 2048,
};

/// Factory for execution job specifications
#[derive(Debug, Clone)]
pub struct JobFactory {
    init_timeout_seconds: u64,
    generate_timeout_seconds: u64,
}

impl JobFactory {
    pub fn new(init_timeout_seconds: u64, generate_timeout_seconds: u64) -> Self {
        Self {
            init_timeout_seconds,
            generate_timeout_seconds,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.init_job_timeout.as_secs(),
            config.generate_job_timeout.as_secs(),
        )
    }

    /// Builds the desired spec for one phase of a work object
    ///
    /// Generate-phase specs require a product index into the resolved
    /// configuration; init-phase specs take none.
    pub fn build(
        &self,
        work: &WorkObject,
        phase: JobPhase,
        index: Option<usize>,
    ) -> Result<ExecutionJobSpec> {
        let payload = match phase {
            JobPhase::Init => {
                let config = serde_json::to_value(&work.config).map_err(|e| {
                    Error::InvalidJobInput(format!("unserializable configuration: {}", e))
                })?;
                json!({
                    "config": config,
                    "output": output_path(work, None),
                })
            }
            JobPhase::Generate => {
                let index = index.ok_or_else(|| {
                    Error::InvalidJobInput("generate jobs require a product index".to_string())
                })?;
                let resolved = work.resolved.as_ref().ok_or_else(|| {
                    Error::InvalidJobInput(
                        "generate jobs require a resolved configuration".to_string(),
                    )
                })?;
                let product = resolved.products.get(index).ok_or_else(|| {
                    Error::InvalidJobInput(format!(
                        "product index {} out of range ({} products)",
                        index,
                        resolved.products.len()
                    ))
                })?;
                let product = serde_json::to_value(product).map_err(|e| {
                    Error::InvalidJobInput(format!("unserializable product entry: {}", e))
                })?;
                json!({
                    "product": product,
                    "index": index,
                    "output": output_path(work, Some(index)),
                })
            }
        };

        let (limits, timeout_seconds) = match phase {
            JobPhase::Init => (INIT_LIMITS, self.init_timeout_seconds),
            JobPhase::Generate => (GENERATE_LIMITS, self.generate_timeout_seconds),
        };

        Ok(ExecutionJobSpec {
            name: job_name(work.id, phase, index),
            owner: work.id,
            phase,
            index,
            payload,
            limits,
            timeout_seconds,
            trace_id: work.trace_id.clone(),
        })
    }
}

/// Output path convention shared with the generation tooling
fn output_path(work: &WorkObject, index: Option<usize>) -> String {
    match index {
        Some(index) => format!("/workdir/{}/product-{}/bom.json", work.id.simple(), index),
        None => format!("/workdir/{}/config.json", work.id.simple()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbomgen_core::domain::config::{
        ContainerImageConfig, GenerationConfig, ProductConfig, ResolvedConfig,
    };
    use sbomgen_core::domain::request::{GenerationRequest, RequestStatus, RequestType};
    use uuid::Uuid;

    fn work() -> WorkObject {
        let request = GenerationRequest {
            id: Uuid::now_v7(),
            identifier: "registry.example.com/app@sha256:abc".to_string(),
            request_type: RequestType::ContainerImage,
            config: GenerationConfig::ContainerImage(ContainerImageConfig {
                image: "registry.example.com/app@sha256:abc".to_string(),
            }),
            status: RequestStatus::New,
            result: None,
            reason: None,
            creation_time: chrono::Utc::now(),
        };
        WorkObject::from_request(&request)
    }

    fn resolved_work(products: usize) -> WorkObject {
        let mut work = work();
        work.resolved = Some(ResolvedConfig {
            products: (0..products)
                .map(|_| ProductConfig {
                    generator: "syft".to_string(),
                    parameters: Default::default(),
                })
                .collect(),
        });
        work
    }

    #[test]
    fn test_build_is_referentially_transparent() {
        let factory = JobFactory::new(300, 3600);
        let work = resolved_work(2);

        let first = factory.build(&work, JobPhase::Generate, Some(1)).unwrap();
        let second = factory.build(&work, JobPhase::Generate, Some(1)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_init_spec_carries_config_and_trace() {
        let factory = JobFactory::new(300, 3600);
        let work = work();

        let spec = factory.build(&work, JobPhase::Init, None).unwrap();
        assert_eq!(spec.name, format!("{}-init", work.id.simple()));
        assert_eq!(spec.owner, work.id);
        assert_eq!(spec.trace_id, work.trace_id);
        assert_eq!(spec.timeout_seconds, 300);
        assert_eq!(spec.payload["config"]["type"], "CONTAINERIMAGE");
    }

    #[test]
    fn test_generate_spec_selects_product_by_index() {
        let factory = JobFactory::new(300, 3600);
        let work = resolved_work(3);

        let spec = factory.build(&work, JobPhase::Generate, Some(2)).unwrap();
        assert_eq!(spec.name, format!("{}-generate-2", work.id.simple()));
        assert_eq!(spec.payload["index"], 2);
        assert_eq!(spec.timeout_seconds, 3600);
        assert!(
            spec.payload["output"]
                .as_str()
                .unwrap()
                .ends_with("/product-2/bom.json")
        );
    }

    #[test]
    fn test_generate_spec_requires_resolved_config() {
        let factory = JobFactory::new(300, 3600);
        let work = work();

        assert!(factory.build(&work, JobPhase::Generate, Some(0)).is_err());
    }

    #[test]
    fn test_generate_spec_rejects_out_of_range_index() {
        let factory = JobFactory::new(300, 3600);
        let work = resolved_work(1);

        assert!(factory.build(&work, JobPhase::Generate, Some(1)).is_err());
        assert!(factory.build(&work, JobPhase::Generate, None).is_err());
    }
}
