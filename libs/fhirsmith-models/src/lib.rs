//! FHIR data models
//!
//! Strongly-typed Rust structures for the FHIR resources the
//! terminology server cares about: `ValueSet`, `CodeSystem`,
//! `ConceptMap`, `Bundle`, and `OperationOutcome`.
//!
//! # Design Philosophy
//!
//! - **Version-agnostic core**: common fields present across FHIR R4/R4B/R5
//! - **Extensible**: an `extensions` map captures version-specific or
//!   custom properties instead of rejecting them
//! - **Strongly-typed** where it helps, `serde_json::Value` where it
//!   would cost more than it buys (filters, designations, properties)

pub mod common;

pub use common::*;
