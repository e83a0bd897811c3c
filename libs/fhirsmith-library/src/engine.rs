//! `TerminologyEngine`: the interface the dispatcher's terminology
//! operations (`$expand`, `$validate-code`, `$lookup`, `$subsumes`,
//! `$translate`) are defined against. The real vocabulary algorithms —
//! SNOMED CT expression-constraint expansion, full ECL, cross-map
//! closure — are external collaborators (spec §1); this crate only
//! specifies the seam and a minimal in-memory implementation capable
//! of driving the dispatcher end to end against the `Provider` built
//! in this crate.

use std::sync::Arc;

use async_trait::async_trait;

use crate::code_system_factory::SubsumptionRelationship;
use crate::operation_context::OperationContext;
use crate::provider::Provider;
use crate::Result;

#[derive(Debug, Clone)]
pub struct ExpandParameters {
    pub value_set_url: String,
    pub filter_text: Option<String>,
    pub offset: usize,
    pub count: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ExpandedConcept {
    pub system: String,
    pub code: String,
    pub display: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Expansion {
    pub value_set_url: String,
    pub total: usize,
    pub concepts: Vec<ExpandedConcept>,
}

#[derive(Debug, Clone)]
pub struct ValidateCodeParameters {
    pub system: String,
    pub version: Option<String>,
    pub code: String,
    pub value_set_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub result: bool,
    pub message: Option<String>,
    pub display: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LookupParameters {
    pub system: String,
    pub version: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct LookupResult {
    pub name: Option<String>,
    pub display: Option<String>,
    pub definition: Option<String>,
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct SubsumesParameters {
    pub system: String,
    pub version: Option<String>,
    pub code_a: String,
    pub code_b: String,
}

#[derive(Debug, Clone)]
pub struct TranslateParameters {
    pub concept_map_url: String,
    pub system: String,
    pub code: String,
    pub target_system: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TranslationMatch {
    pub equivalence: String,
    pub system: String,
    pub code: String,
    pub display: Option<String>,
}

/// The interface a dispatcher worker calls into for each terminology
/// operation. Swapping the in-memory [`BasicEngine`] for a full
/// SNOMED/LOINC-aware engine requires no change to the dispatcher —
/// only a different implementation of this trait.
#[async_trait]
pub trait TerminologyEngine: Send + Sync {
    async fn expand(
        &self,
        context: &OperationContext,
        params: ExpandParameters,
    ) -> Result<Expansion>;

    async fn validate_code(
        &self,
        context: &OperationContext,
        params: ValidateCodeParameters,
    ) -> Result<ValidationResult>;

    async fn lookup(
        &self,
        context: &OperationContext,
        params: LookupParameters,
    ) -> Result<Option<LookupResult>>;

    async fn subsumes(
        &self,
        context: &OperationContext,
        params: SubsumesParameters,
    ) -> Result<SubsumptionRelationship>;

    async fn translate(
        &self,
        context: &OperationContext,
        params: TranslateParameters,
    ) -> Result<Vec<TranslationMatch>>;
}

/// Minimal engine over a [`Provider`]'s registered code systems. Drives
/// `$lookup`/`$validate-code`/`$subsumes` directly off a
/// `CodeSystemProvider`; `$expand` only supports resolving a value set
/// whose compose is a single `system` include (no nested value sets, no
/// filters beyond a simple display/code substring) and `$translate`
/// walks the resolved ConceptMap's `group[].element[].target[]` for a
/// matching source code (no closure across chained maps).
pub struct BasicEngine {
    provider: Arc<Provider>,
}

impl BasicEngine {
    pub fn new(provider: Arc<Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TerminologyEngine for BasicEngine {
    async fn expand(
        &self,
        context: &OperationContext,
        params: ExpandParameters,
    ) -> Result<Expansion> {
        context.dead_check("expand:start")?;
        let mut resource = None;
        for catalog in self.provider.library().value_set_providers() {
            let hits = catalog
                .search(&[("url".to_string(), params.value_set_url.clone())], None)
                .await
                .unwrap_or_default();
            if let Some(found) = hits.into_iter().next() {
                resource = Some(found);
                break;
            }
        }
        let Some(resource) = resource else {
            return Ok(Expansion {
                value_set_url: params.value_set_url,
                total: 0,
                concepts: Vec::new(),
            });
        };
        let systems: Vec<String> = resource
            .get("compose")
            .and_then(|c| c.get("include"))
            .and_then(|i| i.as_array())
            .map(|includes| {
                includes
                    .iter()
                    .filter_map(|inc| inc.get("system").and_then(|s| s.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut concepts = Vec::new();
        for system in systems {
            context.dead_check("expand:system")?;
            if let Some(provider) = self
                .provider
                .get_code_system_provider(context, &system, None, &[])?
            {
                for concept in provider.all_codes() {
                    if let Some(filter) = &params.filter_text {
                        let matches_display = concept
                            .display
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(&filter.to_lowercase()));
                        if !matches_display && !concept.code.contains(filter.as_str()) {
                            continue;
                        }
                    }
                    concepts.push(ExpandedConcept {
                        system: system.clone(),
                        code: concept.code,
                        display: concept.display,
                    });
                }
            }
        }
        let total = concepts.len();
        let concepts = concepts
            .into_iter()
            .skip(params.offset)
            .take(params.count.unwrap_or(usize::MAX))
            .collect();
        Ok(Expansion {
            value_set_url: params.value_set_url,
            total,
            concepts,
        })
    }

    async fn validate_code(
        &self,
        context: &OperationContext,
        params: ValidateCodeParameters,
    ) -> Result<ValidationResult> {
        let provider = self.provider.get_code_system_provider(
            context,
            &params.system,
            params.version.as_deref(),
            &[],
        )?;
        let Some(provider) = provider else {
            return Ok(ValidationResult {
                result: false,
                message: Some(format!("unknown code system '{}'", params.system)),
                display: None,
            });
        };
        match provider.lookup(&params.code) {
            Some(concept) => Ok(ValidationResult {
                result: true,
                message: None,
                display: concept.display,
            }),
            None => Ok(ValidationResult {
                result: false,
                message: Some(format!(
                    "code '{}' not found in system '{}'",
                    params.code, params.system
                )),
                display: None,
            }),
        }
    }

    async fn lookup(
        &self,
        context: &OperationContext,
        params: LookupParameters,
    ) -> Result<Option<LookupResult>> {
        let provider = self.provider.get_code_system_provider(
            context,
            &params.system,
            params.version.as_deref(),
            &[],
        )?;
        Ok(provider.and_then(|p| p.lookup(&params.code)).map(|concept| {
            LookupResult {
                name: Some(params.system.clone()),
                display: concept.display,
                definition: concept.definition,
                properties: concept.properties,
            }
        }))
    }

    async fn subsumes(
        &self,
        context: &OperationContext,
        params: SubsumesParameters,
    ) -> Result<SubsumptionRelationship> {
        let provider = self.provider.get_code_system_provider(
            context,
            &params.system,
            params.version.as_deref(),
            &[],
        )?;
        Ok(provider
            .map(|p| p.subsumes(&params.code_a, &params.code_b))
            .unwrap_or(SubsumptionRelationship::NotSubsumed))
    }

    async fn translate(
        &self,
        context: &OperationContext,
        params: TranslateParameters,
    ) -> Result<Vec<TranslationMatch>> {
        context.dead_check("translate:start")?;
        let mut resource = None;
        for catalog in self.provider.library().concept_map_providers() {
            let hits = catalog
                .search(&[("url".to_string(), params.concept_map_url.clone())], None)
                .await
                .unwrap_or_default();
            if let Some(found) = hits.into_iter().next() {
                resource = Some(found);
                break;
            }
        }
        let Some(resource) = resource else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        let Some(groups) = resource.get("group").and_then(|g| g.as_array()) else {
            return Ok(matches);
        };
        for group in groups {
            context.dead_check("translate:group")?;
            let source_system = group.get("source").and_then(|s| s.as_str());
            if source_system.is_some_and(|s| s != params.system) {
                continue;
            }
            let target_system = group.get("target").and_then(|t| t.as_str()).unwrap_or_default();
            if params
                .target_system
                .as_deref()
                .is_some_and(|wanted| wanted != target_system)
            {
                continue;
            }
            let Some(elements) = group.get("element").and_then(|e| e.as_array()) else {
                continue;
            };
            for element in elements {
                if element.get("code").and_then(|c| c.as_str()) != Some(params.code.as_str()) {
                    continue;
                }
                let Some(targets) = element.get("target").and_then(|t| t.as_array()) else {
                    continue;
                };
                for target in targets {
                    let Some(code) = target.get("code").and_then(|c| c.as_str()) else {
                        continue;
                    };
                    matches.push(TranslationMatch {
                        equivalence: target
                            .get("equivalence")
                            .and_then(|e| e.as_str())
                            .unwrap_or("equivalent")
                            .to_string(),
                        system: target_system.to_string(),
                        code: code.to_string(),
                        display: target.get("display").and_then(|d| d.as_str()).map(str::to_string),
                    });
                }
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod translate_tests {
    use super::*;
    use crate::caches::{ExpansionCache, ResourceCache};
    use crate::library::Library;
    use fhirsmith_catalog::{Catalog, Kind};
    use serde_json::json;

    fn test_context() -> OperationContext {
        OperationContext::new(
            "req",
            None,
            Arc::new(ResourceCache::with_default_timeout()),
            Arc::new(ExpansionCache::new(10, None)),
        )
    }

    #[tokio::test]
    async fn translate_walks_group_element_targets() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&dir.path().join(".conceptmaps.db"), Kind::ConceptMap)
            .await
            .unwrap();
        catalog
            .upsert(
                &json!({
                    "resourceType": "ConceptMap",
                    "id": "cm1",
                    "url": "http://example.org/cm1",
                    "status": "active",
                    "group": [{
                        "source": "http://example.org/source",
                        "target": "http://example.org/target",
                        "element": [{
                            "code": "A",
                            "target": [{"code": "B", "equivalence": "equal", "display": "Bee"}]
                        }]
                    }]
                }),
                100,
            )
            .await
            .unwrap();

        let mut library = Library::empty();
        library.add_concept_map_provider(Arc::new(catalog));
        let provider = Arc::new(Provider::new(library));
        let engine = BasicEngine::new(provider);
        let ctx = test_context();

        let matches = engine
            .translate(
                &ctx,
                TranslateParameters {
                    concept_map_url: "http://example.org/cm1".to_string(),
                    system: "http://example.org/source".to_string(),
                    code: "A".to_string(),
                    target_system: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].code, "B");
        assert_eq!(matches[0].system, "http://example.org/target");
        assert_eq!(matches[0].equivalence, "equal");
    }
}
