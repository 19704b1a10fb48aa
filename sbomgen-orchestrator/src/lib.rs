//! SBOM Generation Orchestrator
//!
//! Turns durable generation requests into supervised units of work executed
//! by an external job backend.
//!
//! Architecture:
//! - Stores: request records, work objects, manifests (Postgres + in-memory)
//! - Leader election: gates the admission scheduler in multi-replica deployments
//! - Admission scheduler: promotes NEW requests under a global concurrency cap
//! - Reconciliation controller: drives each work object through init and
//!   generate phases by creating and observing execution jobs
//! - Result classifier: maps job exit codes to the client-facing taxonomy

pub mod classifier;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod factory;
pub mod leader;
pub mod scheduler;
pub mod store;

pub use error::{Error, Result};
