//! Adapts `fhirsmith-ucum` to the `CodeSystemFactory` seam so the
//! `ucum:<path>` source type (spec §4.6) plugs into the same Provider
//! lookup as every other code system.

use std::sync::Arc;

use crate::code_system_factory::{CodeSystemFactory, CodeSystemProvider, ConceptLookup};
use crate::operation_context::OperationContext;
use crate::Result;

struct UcumProvider;

impl CodeSystemProvider for UcumProvider {
    fn system(&self) -> &str {
        fhirsmith_ucum::SYSTEM
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn lookup(&self, code: &str) -> Option<ConceptLookup> {
        fhirsmith_ucum::is_valid(code).then(|| ConceptLookup::new(code))
    }
}

pub struct UcumFactory;

impl UcumFactory {
    /// `path`, when present, names a site-local essence XML file (the
    /// `ucum:<path>` source line) that replaces the embedded default
    /// table for the rest of the process's lifetime.
    pub fn register(path: Option<&str>) -> Result<Arc<dyn CodeSystemFactory>> {
        if let Some(path) = path {
            let xml = std::fs::read_to_string(path)?;
            fhirsmith_ucum::with_db(&xml)?;
        }
        Ok(Arc::new(UcumFactory))
    }
}

impl CodeSystemFactory for UcumFactory {
    fn system(&self) -> &str {
        fhirsmith_ucum::SYSTEM
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn build(&self, _context: &OperationContext) -> Result<Arc<dyn CodeSystemProvider>> {
        Ok(Arc::new(UcumProvider))
    }
}
