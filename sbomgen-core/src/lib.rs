//! SBOM Generation Core
//!
//! Core types and abstractions for the SBOM generation engine.
//!
//! This crate contains:
//! - Domain types: Core business entities (GenerationRequest, WorkObject, ExecutionJobSpec, etc.)
//! - DTOs: Data transfer objects used at the intake seam

pub mod domain;
pub mod dto;
pub mod error;
