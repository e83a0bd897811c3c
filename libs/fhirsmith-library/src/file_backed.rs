//! Generic tabular factory backing the `loinc, rxnorm, ndc, unii,
//! snomed, cpt, omop:<file>` source types (spec §4.6): download the
//! file into the layout's cache directory if absent, then serve codes
//! out of a simple two-column table.
//!
//! Real LOINC/SNOMED/RxNorm distributions ship as multi-file archives
//! with their own schemas; this loader expects the already-flattened
//! `code\tdisplay` form a site's ingestion step produces, and exists to
//! give the Provider seam something real to resolve against rather
//! than to parse any one vendor's release format itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::code_system_factory::{CodeSystemFactory, CodeSystemProvider, ConceptLookup};
use crate::error::Error;
use crate::operation_context::OperationContext;
use crate::source::TabularEngine;
use crate::Result;

pub struct FileBackedFactory {
    engine: TabularEngine,
    path: PathBuf,
}

impl FileBackedFactory {
    /// Ensures `{cache_dir}/{file}` exists, downloading it from
    /// `{base_url}/{file}` first if not, then returns a factory bound
    /// to that path.
    pub async fn register(
        engine: TabularEngine,
        file: &str,
        base_url: Option<&str>,
        cache_dir: &Path,
    ) -> Result<Arc<dyn CodeSystemFactory>> {
        let path = cache_dir.join(file);
        if !path.exists() {
            let base_url = base_url.ok_or_else(|| Error::DownloadFailed {
                url: file.to_string(),
                reason: "no base.url configured for a missing file-backed source".to_string(),
            })?;
            let url = format!("{base_url}/{file}");
            let response = reqwest::get(&url)
                .await
                .map_err(|e| Error::DownloadFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?
                .error_for_status()
                .map_err(|e| Error::DownloadFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
            let bytes = response.bytes().await.map_err(|e| Error::DownloadFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, &bytes).await?;
        }
        Ok(Arc::new(Self { engine, path }))
    }

    fn load(&self) -> Result<FileBackedProvider> {
        let text = std::fs::read_to_string(&self.path)?;
        let concepts = text
            .lines()
            .filter_map(|line| {
                let mut cols = line.splitn(2, '\t');
                let code = cols.next()?.trim();
                if code.is_empty() {
                    return None;
                }
                let display = cols.next().map(|d| d.trim().to_string());
                let mut concept = ConceptLookup::new(code);
                if let Some(display) = display {
                    concept = concept.with_display(display);
                }
                Some((code.to_string(), concept))
            })
            .collect();
        Ok(FileBackedProvider {
            system: self.engine.canonical_system(),
            concepts,
        })
    }
}

impl CodeSystemFactory for FileBackedFactory {
    fn system(&self) -> &str {
        self.engine.canonical_system()
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn build(&self, _context: &OperationContext) -> Result<Arc<dyn CodeSystemProvider>> {
        Ok(Arc::new(self.load()?))
    }
}

struct FileBackedProvider {
    system: &'static str,
    concepts: HashMap<String, ConceptLookup>,
}

impl CodeSystemProvider for FileBackedProvider {
    fn system(&self) -> &str {
        self.system
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn lookup(&self, code: &str) -> Option<ConceptLookup> {
        self.concepts.get(code).cloned()
    }

    fn all_codes(&self) -> Vec<ConceptLookup> {
        // Large vocabularies (SNOMED CT has millions of concepts) are
        // not enumerated; `$expand` against them requires a filter.
        if self.engine_is_large() {
            Vec::new()
        } else {
            self.concepts.values().cloned().collect()
        }
    }
}

impl FileBackedProvider {
    fn engine_is_large(&self) -> bool {
        matches!(
            self.system,
            "http://snomed.info/sct" | "http://www.nlm.nih.gov/research/umls/rxnorm"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_tab_separated_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loinc.tsv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "2160-0\tCreatinine [Mass/volume] in Serum or Plasma").unwrap();
        writeln!(f, "718-7\tHemoglobin [Mass/volume] in Blood").unwrap();

        let factory = FileBackedFactory {
            engine: TabularEngine::Loinc,
            path,
        };
        let provider = factory.load().unwrap();
        assert_eq!(provider.system, "http://loinc.org");
        let hit = provider.lookup("2160-0").unwrap();
        assert_eq!(hit.display.as_deref(), Some("Creatinine [Mass/volume] in Serum or Plasma"));
        assert!(provider.lookup("missing").is_none());
    }
}
