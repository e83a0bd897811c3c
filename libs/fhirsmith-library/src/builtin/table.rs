//! Shared plumbing for the small, fully-enumerable built-in code
//! systems (country, lang, currency, mimetypes, usstates, areacode).
//! Each of those modules supplies a data table; this module turns it
//! into a [`CodeSystemFactory`]/[`CodeSystemProvider`] pair.

use std::sync::Arc;

use crate::code_system_factory::{CodeSystemFactory, CodeSystemProvider, ConceptLookup};
use crate::operation_context::OperationContext;
use crate::Result;

#[derive(Clone)]
pub struct StaticTable {
    system: String,
    concepts: Vec<ConceptLookup>,
}

impl StaticTable {
    pub fn new(system: impl Into<String>, data: &[(&str, &str)]) -> Arc<Self> {
        let concepts = data
            .iter()
            .map(|(code, display)| ConceptLookup::new(*code).with_display(*display))
            .collect();
        Arc::new(Self {
            system: system.into(),
            concepts,
        })
    }
}

impl CodeSystemProvider for StaticTable {
    fn system(&self) -> &str {
        &self.system
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn lookup(&self, code: &str) -> Option<ConceptLookup> {
        self.concepts.iter().find(|c| c.code == code).cloned()
    }

    fn all_codes(&self) -> Vec<ConceptLookup> {
        self.concepts.clone()
    }
}

impl CodeSystemFactory for StaticTable {
    fn system(&self) -> &str {
        &self.system
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn build(&self, _context: &OperationContext) -> Result<Arc<dyn CodeSystemProvider>> {
        Ok(Arc::new(Self {
            system: self.system.clone(),
            concepts: self.concepts.clone(),
        }))
    }
}
