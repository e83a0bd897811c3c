//! The seam every concrete terminology source plugs into: built-in
//! tables, UCUM, and file-backed vocabularies all produce
//! [`CodeSystemProvider`]s through a [`CodeSystemFactory`] (spec §4.6).

use std::sync::Arc;

use crate::operation_context::OperationContext;
use crate::Result;

/// A single concept as returned by a provider, independent of the FHIR
/// resource shape a `CodeSystem` concept would carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptLookup {
    pub code: String,
    pub display: Option<String>,
    pub definition: Option<String>,
    pub properties: Vec<(String, String)>,
}

impl ConceptLookup {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display: None,
            definition: None,
            properties: Vec::new(),
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// Result of a `$subsumes` comparison between two codes in the same
/// system (FHIR's `subsumes-outcome` value set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsumptionRelationship {
    Equivalent,
    Subsumes,
    SubsumedBy,
    NotSubsumed,
}

/// A concrete, instantiated code system a provider can answer questions
/// about: lookup, containment, hierarchy. Built lazily by a
/// [`CodeSystemFactory`] so that expensive sources (file-backed tables,
/// package-derived systems) are only materialized on first use.
pub trait CodeSystemProvider: Send + Sync {
    fn system(&self) -> &str;
    fn version(&self) -> Option<&str>;

    fn lookup(&self, code: &str) -> Option<ConceptLookup>;

    fn contains(&self, code: &str) -> bool {
        self.lookup(code).is_some()
    }

    /// Default: no declared hierarchy, so nothing subsumes anything but
    /// itself. Hierarchical sources (built-in `areacode`, file-backed
    /// SNOMED) override this.
    fn subsumes(&self, code_a: &str, code_b: &str) -> SubsumptionRelationship {
        if code_a == code_b {
            SubsumptionRelationship::Equivalent
        } else {
            SubsumptionRelationship::NotSubsumed
        }
    }

    /// All codes this provider can enumerate, for sources small enough
    /// to support full expansion (built-ins, small file-backed tables).
    /// Sources for which enumeration is impractical (SNOMED CT) return
    /// an empty iterator; `$expand` against them requires a filter.
    fn all_codes(&self) -> Vec<ConceptLookup> {
        Vec::new()
    }
}

/// Produces a [`CodeSystemProvider`] for one canonical system (and,
/// optionally, one specific version of it). Registered into
/// `Library::code_system_factories` under `system`, `system|version`,
/// and `system|` (spec §4.6).
pub trait CodeSystemFactory: Send + Sync {
    fn system(&self) -> &str;
    fn version(&self) -> Option<&str>;

    fn build(&self, context: &OperationContext) -> Result<Arc<dyn CodeSystemProvider>>;
}
