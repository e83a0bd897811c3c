//! HGVS (Human Genome Variation Society) variant nomenclature. Unlike
//! the other built-ins this isn't a finite table — HGVS expressions are
//! compositional, like UCUM unit strings — so this factory validates
//! syntax rather than enumerating codes.

use std::sync::Arc;

use crate::code_system_factory::{CodeSystemFactory, CodeSystemProvider, ConceptLookup};
use crate::operation_context::OperationContext;
use crate::Result;

pub const SYSTEM: &str = "http://varnomen.hgvs.org";

/// A minimal structural check: `reference:kind.change`, where `kind`
/// is one of the HGVS variant-type prefixes (`c`, `g`, `m`, `n`, `p`,
/// `r`). This rejects obvious garbage without attempting to parse the
/// full HGVS grammar (insertions, deletions, ranges, uncertainty).
fn looks_like_hgvs(expr: &str) -> bool {
    let Some((reference, change)) = expr.split_once(':') else {
        return false;
    };
    if reference.is_empty() {
        return false;
    }
    let Some((kind, rest)) = change.split_once('.') else {
        return false;
    };
    matches!(kind, "c" | "g" | "m" | "n" | "p" | "r") && !rest.is_empty()
}

struct HgvsProvider;

impl CodeSystemProvider for HgvsProvider {
    fn system(&self) -> &str {
        SYSTEM
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn lookup(&self, code: &str) -> Option<ConceptLookup> {
        looks_like_hgvs(code).then(|| ConceptLookup::new(code))
    }
}

struct HgvsFactory;

impl CodeSystemFactory for HgvsFactory {
    fn system(&self) -> &str {
        SYSTEM
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn build(&self, _context: &OperationContext) -> Result<Arc<dyn CodeSystemProvider>> {
        Ok(Arc::new(HgvsProvider))
    }
}

pub fn factory() -> Arc<dyn CodeSystemFactory> {
    Arc::new(HgvsFactory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_coding_variant() {
        assert!(looks_like_hgvs("NM_004006.2:c.4375C>T"));
    }

    #[test]
    fn rejects_missing_kind_prefix() {
        assert!(!looks_like_hgvs("NM_004006.2:4375C>T"));
    }

    #[test]
    fn rejects_missing_reference() {
        assert!(!looks_like_hgvs(":c.4375C>T"));
    }
}
