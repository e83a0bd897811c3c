//! The Library YAML source descriptor (spec §4.6, §6):
//!
//! ```yaml
//! base:
//!   url: <download-root>
//! sources:
//!   - internal:country
//!   - npm!:hl7.fhir.r4.core#4.0.1
//! ```
//!
//! Each source line is `[type][!]:details`. The design note in spec §9
//! ("ordered source list with 'default' marker") replaces the `!`
//! suffix with an explicit `preferred: bool` field once parsed.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Base {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDescriptor {
    #[serde(default)]
    pub base: Base,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// One of the recognized tabular file-backed vocabularies (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularEngine {
    Loinc,
    RxNorm,
    Ndc,
    Unii,
    Snomed,
    Cpt,
    Omop,
}

impl TabularEngine {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "loinc" => Self::Loinc,
            "rxnorm" => Self::RxNorm,
            "ndc" => Self::Ndc,
            "unii" => Self::Unii,
            "snomed" => Self::Snomed,
            "cpt" => Self::Cpt,
            "omop" => Self::Omop,
            _ => return None,
        })
    }

    pub fn canonical_system(self) -> &'static str {
        match self {
            Self::Loinc => "http://loinc.org",
            Self::RxNorm => "http://www.nlm.nih.gov/research/umls/rxnorm",
            Self::Ndc => "http://hl7.org/fhir/sid/ndc",
            Self::Unii => "http://fdasis.nlm.nih.gov",
            Self::Snomed => "http://snomed.info/sct",
            Self::Cpt => "http://www.ama-assn.org/go/cpt",
            Self::Omop => "http://www.ohdsi.org/vocabularies/OMOP",
        }
    }
}

#[derive(Debug, Clone)]
pub enum SourceKind {
    Internal(String),
    Ucum(String),
    Tabular { engine: TabularEngine, file: String },
    Npm { package_id: String, version: Option<String> },
}

#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub kind: SourceKind,
    /// Marked by a trailing `!` right after the type name: this source
    /// is the preferred version of its code system when more than one
    /// source registers the same canonical URL.
    pub preferred: bool,
}

pub fn parse_source_line(line: &str) -> Result<SourceEntry> {
    let (head, details) = line
        .split_once(':')
        .ok_or_else(|| Error::SourceParse(format!("missing ':' in source line '{line}'")))?;
    let (type_name, preferred) = match head.strip_suffix('!') {
        Some(stripped) => (stripped, true),
        None => (head, false),
    };
    let details = details.trim();

    let kind = match type_name {
        "internal" => SourceKind::Internal(details.to_string()),
        "ucum" => SourceKind::Ucum(details.to_string()),
        "npm" => {
            let (package_id, version) = match details.split_once('#') {
                Some((id, v)) => (id.to_string(), Some(v.to_string())),
                None => (details.to_string(), None),
            };
            SourceKind::Npm { package_id, version }
        }
        other => match TabularEngine::parse(other) {
            Some(engine) => SourceKind::Tabular {
                engine,
                file: details.to_string(),
            },
            None => return Err(Error::UnknownSourceType(other.to_string())),
        },
    };

    Ok(SourceEntry { kind, preferred })
}

pub fn parse_descriptor(yaml: &str) -> Result<(Base, Vec<SourceEntry>)> {
    let raw: RawDescriptor =
        serde_yaml::from_str(yaml).map_err(|e| Error::SourceParse(e.to_string()))?;
    let sources = raw
        .sources
        .iter()
        .map(|line| parse_source_line(line))
        .collect::<Result<Vec<_>>>()?;
    Ok((raw.base, sources))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_internal_source() {
        let e = parse_source_line("internal:country").unwrap();
        assert!(!e.preferred);
        assert!(matches!(e.kind, SourceKind::Internal(n) if n == "country"));
    }

    #[test]
    fn parses_preferred_marker() {
        let e = parse_source_line("npm!:hl7.fhir.r4.core#4.0.1").unwrap();
        assert!(e.preferred);
        match e.kind {
            SourceKind::Npm { package_id, version } => {
                assert_eq!(package_id, "hl7.fhir.r4.core");
                assert_eq!(version.as_deref(), Some("4.0.1"));
            }
            _ => panic!("expected Npm"),
        }
    }

    #[test]
    fn parses_npm_without_version() {
        let e = parse_source_line("npm:hl7.fhir.us.core").unwrap();
        match e.kind {
            SourceKind::Npm { package_id, version } => {
                assert_eq!(package_id, "hl7.fhir.us.core");
                assert_eq!(version, None);
            }
            _ => panic!("expected Npm"),
        }
    }

    #[test]
    fn parses_tabular_sources() {
        let e = parse_source_line("loinc:loinc.zip").unwrap();
        match e.kind {
            SourceKind::Tabular { engine, file } => {
                assert_eq!(engine.canonical_system(), "http://loinc.org");
                assert_eq!(file, "loinc.zip");
            }
            _ => panic!("expected Tabular"),
        }
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(parse_source_line("bogus:thing").is_err());
    }

    #[test]
    fn parses_full_descriptor() {
        let yaml = "base:\n  url: https://example.org/download\nsources:\n  - internal:country\n  - ucum!:ucum-essence.xml\n";
        let (base, sources) = parse_descriptor(yaml).unwrap();
        assert_eq!(base.url.as_deref(), Some("https://example.org/download"));
        assert_eq!(sources.len(), 2);
        assert!(sources[1].preferred);
    }
}
