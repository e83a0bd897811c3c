//! Composes package-backed, built-in, UCUM, and file-backed
//! terminology sources behind one version-aware lookup API (spec
//! §4.6–§4.7): `Library` holds the registered sources, `Provider`
//! resolves a `(system, version)` pair against them, and
//! `OperationContext`/the caches in [`caches`] carry per-request state.

mod builtin;
pub mod caches;
pub mod code_system_factory;
pub mod engine;
mod error;
mod file_backed;
pub mod library;
pub mod operation_context;
pub mod provider;
pub mod source;
mod ucum_factory;

pub use caches::{ExpansionCache, ResourceCache};
pub use code_system_factory::{
    CodeSystemFactory, CodeSystemProvider, ConceptLookup, SubsumptionRelationship,
};
pub use engine::{
    BasicEngine, ExpandParameters, Expansion, ExpandedConcept, LookupParameters, LookupResult,
    SubsumesParameters, TerminologyEngine, TranslateParameters, TranslationMatch,
    ValidateCodeParameters, ValidationResult,
};
pub use error::{Error, Result};
pub use library::Library;
pub use operation_context::{LanguagePreference, OperationContext, TooCostly};
pub use provider::Provider;
pub use source::{parse_descriptor, parse_source_line, Base, SourceEntry, SourceKind, TabularEngine};
pub use ucum_factory::UcumFactory;
