//! `Provider`: version-aware code system resolution over a `Library`
//! (spec §4.6).

use std::collections::HashMap;
use std::sync::Arc;

use fhirsmith_catalog::Catalog;
use fhirsmith_models::{CodeSystem, CodeSystemConcept};
use fhirsmith_versioning::maj_min;

use crate::code_system_factory::{CodeSystemProvider, ConceptLookup};
use crate::error::{Error, Result};
use crate::library::Library;
use crate::operation_context::OperationContext;

pub struct Provider {
    library: Library,
}

/// A code system identified only by its canonical URL, with no `|`
/// suffix and no version parameter. `system|version` callers are split
/// apart before reaching [`Provider::get_code_system_provider`].
struct NormalizedSystem<'a> {
    system: &'a str,
    version: Option<String>,
}

fn normalize<'a>(system: &'a str, version: Option<&str>) -> Result<NormalizedSystem<'a>> {
    match system.split_once('|') {
        Some((bare, embedded_version)) => {
            if let Some(given) = version {
                if given != embedded_version {
                    return Err(Error::VersionInconsistent {
                        system: bare.to_string(),
                        in_system: embedded_version.to_string(),
                        given: given.to_string(),
                    });
                }
            }
            Ok(NormalizedSystem {
                system: bare,
                version: Some(embedded_version.to_string()),
            })
        }
        None => Ok(NormalizedSystem {
            system,
            version: version.map(str::to_string),
        }),
    }
}

/// Flatten a `CodeSystem`'s (possibly nested) concept hierarchy into a
/// flat code -> concept map, the shape a `CodeSystemProvider` needs.
fn flatten_concepts(concepts: &[CodeSystemConcept], into: &mut HashMap<String, ConceptLookup>) {
    for concept in concepts {
        let mut lookup = ConceptLookup::new(concept.code.clone());
        if let Some(display) = &concept.display {
            lookup = lookup.with_display(display.clone());
        }
        lookup.definition = concept.definition.clone();
        into.entry(concept.code.clone()).or_insert(lookup);
        if let Some(children) = &concept.concept {
            flatten_concepts(children, into);
        }
    }
}

struct ResourceCodeSystemProvider {
    system: String,
    version: Option<String>,
    concepts: HashMap<String, ConceptLookup>,
}

impl CodeSystemProvider for ResourceCodeSystemProvider {
    fn system(&self) -> &str {
        &self.system
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn lookup(&self, code: &str) -> Option<ConceptLookup> {
        self.concepts.get(code).cloned()
    }

    fn all_codes(&self) -> Vec<ConceptLookup> {
        self.concepts.values().cloned().collect()
    }
}

impl Provider {
    pub fn new(library: Library) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Spec §4.6 five-step lookup: normalize, build `vURL`/`vURL_mm`,
    /// check factories first, then resource-backed code systems, else
    /// `None`.
    pub fn get_code_system_provider(
        &self,
        context: &OperationContext,
        system: &str,
        version: Option<&str>,
        supplements: &[String],
    ) -> Result<Option<Arc<dyn CodeSystemProvider>>> {
        let normalized = normalize(system, version)?;
        let Some(version) = normalized.version else {
            // No version requested: try the bare system, then the
            // explicit "no version" alias.
            let bare = normalized.system.to_string();
            let unversioned = format!("{bare}|");
            for key in [bare.as_str(), unversioned.as_str()] {
                if let Some(factory) = self.library.code_system_factories().get(key) {
                    return Ok(Some(factory.build(context)?));
                }
            }
            for key in [bare.as_str(), unversioned.as_str()] {
                if let Some(resource) = self.library.code_systems().get(key) {
                    return Ok(Some(self.wrap_resource(resource, supplements)));
                }
            }
            return Ok(None);
        };

        let vurl = format!("{}|{}", normalized.system, version);
        let vurl_mm = maj_min(&version).map(|mm| format!("{}|{}", normalized.system, mm));

        let mut keys = vec![vurl.clone()];
        if let Some(mm) = &vurl_mm {
            keys.push(mm.clone());
        }

        for key in &keys {
            if let Some(factory) = self.library.code_system_factories().get(key) {
                return Ok(Some(factory.build(context)?));
            }
        }
        for key in &keys {
            if let Some(resource) = self.library.code_systems().get(key) {
                return Ok(Some(self.wrap_resource(resource, supplements)));
            }
        }
        Ok(None)
    }

    fn wrap_resource(
        &self,
        resource: &Arc<CodeSystem>,
        supplements: &[String],
    ) -> Arc<dyn CodeSystemProvider> {
        let mut concepts = HashMap::new();
        if let Some(top) = &resource.concept {
            flatten_concepts(top, &mut concepts);
        }
        // Supplements may add properties/designations to existing
        // concepts or introduce concepts of their own; a concept
        // already present from the base system wins.
        for supplement_url in supplements {
            if let Some(supplement) = self.library.code_systems().get(supplement_url) {
                if let Some(top) = &supplement.concept {
                    flatten_concepts(top, &mut concepts);
                }
            }
        }
        Arc::new(ResourceCodeSystemProvider {
            system: resource.url.clone(),
            version: resource.version.clone(),
            concepts,
        })
    }

    /// Spec §4.6: shallow-copy the factory/code-system maps, then
    /// prepend version-appropriate FHIR core packages to the value-set
    /// provider list so they are searched first.
    pub fn clone_with_fhir_version(
        &self,
        core_packages: Vec<Arc<Catalog>>,
        _context: &OperationContext,
        _path: &str,
    ) -> Self {
        let mut cloned = self.library.shallow_clone();
        cloned.prepend_value_set_providers(core_packages);
        Self { library: cloned }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caches::{ExpansionCache, ResourceCache};
    use crate::code_system_factory::CodeSystemFactory as _;

    struct FakeProvider(&'static str);

    impl CodeSystemProvider for FakeProvider {
        fn system(&self) -> &str {
            "http://loinc.org"
        }

        fn version(&self) -> Option<&str> {
            Some(self.0)
        }

        fn lookup(&self, code: &str) -> Option<ConceptLookup> {
            (code == "2160-0").then(|| ConceptLookup::new(code))
        }
    }

    struct FakeFactory;

    impl crate::code_system_factory::CodeSystemFactory for FakeFactory {
        fn system(&self) -> &str {
            "http://loinc.org"
        }

        fn version(&self) -> Option<&str> {
            Some("2.81")
        }

        fn build(&self, _context: &OperationContext) -> Result<Arc<dyn CodeSystemProvider>> {
            Ok(Arc::new(FakeProvider("2.81")))
        }
    }

    fn test_context() -> OperationContext {
        OperationContext::new(
            "req",
            None,
            Arc::new(ResourceCache::with_default_timeout()),
            Arc::new(ExpansionCache::new(10, None)),
        )
    }

    fn provider_with_loinc() -> Provider {
        let mut library = Library::empty();
        library.register_factory(Arc::new(FakeFactory), false);
        Provider::new(library)
    }

    #[test]
    fn resolves_exact_version_match() {
        let provider = provider_with_loinc();
        let ctx = test_context();
        let found = provider
            .get_code_system_provider(&ctx, "http://loinc.org|2.81.0", None, &[])
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn resolves_major_minor_match() {
        let provider = provider_with_loinc();
        let ctx = test_context();
        let found = provider
            .get_code_system_provider(&ctx, "http://loinc.org", Some("2.81"), &[])
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn returns_none_for_unrelated_version() {
        let provider = provider_with_loinc();
        let ctx = test_context();
        let found = provider
            .get_code_system_provider(&ctx, "http://loinc.org", Some("3.0"), &[])
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn rejects_inconsistent_embedded_and_explicit_version() {
        let provider = provider_with_loinc();
        let ctx = test_context();
        let err = provider
            .get_code_system_provider(&ctx, "http://loinc.org|2.81.0", Some("3.0"), &[])
            .unwrap_err();
        assert!(matches!(err, Error::VersionInconsistent { .. }));
    }

    struct ThreePartFactory;

    impl crate::code_system_factory::CodeSystemFactory for ThreePartFactory {
        fn system(&self) -> &str {
            "http://loinc.org"
        }

        fn version(&self) -> Option<&str> {
            Some("2.0.1")
        }

        fn build(&self, _context: &OperationContext) -> Result<Arc<dyn CodeSystemProvider>> {
            Ok(Arc::new(FakeProvider("2.0.1")))
        }
    }

    #[test]
    fn resolves_major_minor_match_for_three_part_registered_version() {
        let mut library = Library::empty();
        library.register_factory(Arc::new(ThreePartFactory), false);
        let provider = Provider::new(library);
        let ctx = test_context();

        let found = provider
            .get_code_system_provider(&ctx, "http://loinc.org", Some("2.0"), &[])
            .unwrap();
        assert!(found.is_some());
    }
}
