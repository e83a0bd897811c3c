//! `package/package.json` manifest model, per the FHIR NPM Package
//! specification.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub type PackageName = String;
pub type PackageVersion = String;
pub type VersionReference = String;
pub type Url = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageType {
    Conformance,
    Ig,
    Core,
    Examples,
    Group,
    Tool,
    IgTemplate,
    Unknown(String),
}

impl Serialize for PackageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            PackageType::Conformance => serializer.serialize_str("Conformance"),
            PackageType::Ig => serializer.serialize_str("IG"),
            PackageType::Core => serializer.serialize_str("Core"),
            PackageType::Examples => serializer.serialize_str("Examples"),
            PackageType::Group => serializer.serialize_str("Group"),
            PackageType::Tool => serializer.serialize_str("Tool"),
            PackageType::IgTemplate => serializer.serialize_str("IG-Template"),
            PackageType::Unknown(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for PackageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "Conformance" => PackageType::Conformance,
            "IG" => PackageType::Ig,
            "Core" => PackageType::Core,
            "Examples" => PackageType::Examples,
            "Group" => PackageType::Group,
            "Tool" | "fhir.tool" => PackageType::Tool,
            "IG-Template" => PackageType::IgTemplate,
            _ => PackageType::Unknown(s),
        })
    }
}

/// FHIR NPM Package manifest (`package/package.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: PackageName,
    pub version: PackageVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fhir_versions: Vec<String>,
    #[serde(default)]
    pub dependencies: HashMap<PackageName, VersionReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub package_type: Option<PackageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl PackageManifest {
    pub fn validate(&self, strict: bool) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::ValidationError("package name required".into()));
        }
        if self.version.is_empty() {
            return Err(Error::ValidationError("package version required".into()));
        }

        if strict && !fhirsmith_versioning::is_semver(&strip_label(&self.version)) {
            return Err(Error::ValidationError(format!(
                "'{}' is not a valid package version",
                self.version
            )));
        }
        Ok(())
    }

    /// First entry of `fhirVersions`, the canonical FHIR release this
    /// package targets.
    pub fn primary_fhir_version(&self) -> Option<&str> {
        self.fhir_versions.first().map(String::as_str)
    }

    pub fn has_core_dependency(&self) -> bool {
        self.dependencies.keys().any(|name| {
            name == "hl7.fhir.core" || (name.starts_with("hl7.fhir.r") && name.ends_with(".core"))
        })
    }
}

fn strip_label(v: &str) -> String {
    v.split_once('-').map(|(base, _)| base).unwrap_or(v).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn manifest_matches_npm_spec_example() {
        let manifest_json = json!({
            "name": "hl7.fhir.us.acme",
            "version": "0.1.0",
            "canonical": "http://hl7.org/fhir/us/acme",
            "title": "ACME project IG",
            "description": "Describes how the ACME project uses FHIR for its primary API",
            "fhirVersions": ["4.0.1"],
            "dependencies": {
                "hl7.fhir.r4.core": "4.0.1"
            },
            "author": "hl7",
            "maintainers": [{ "name": "US Steering Committee", "email": "ussc@lists.hl7.com" }],
        });

        let manifest: PackageManifest = serde_json::from_value(manifest_json).unwrap();
        assert_eq!(manifest.name, "hl7.fhir.us.acme");
        assert!(manifest.has_core_dependency());
        assert_eq!(manifest.primary_fhir_version(), Some("4.0.1"));
        assert!(manifest.validate(true).is_ok());
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let manifest = PackageManifest {
            name: String::new(),
            version: "1.0.0".into(),
            canonical: None,
            url: None,
            title: None,
            description: String::new(),
            fhir_versions: vec![],
            dependencies: HashMap::new(),
            keywords: vec![],
            author: String::new(),
            maintainers: vec![],
            package_type: None,
            jurisdiction: None,
            license: None,
            extra: Map::new(),
        };
        assert!(manifest.validate(false).is_err());
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let manifest_json = json!({
            "name": "hl7.fhir.pubpack",
            "version": "0.0.2",
            "author": "FHIR Project",
            "tools-version": 3
        });
        let manifest: PackageManifest = serde_json::from_value(manifest_json).unwrap();
        assert_eq!(manifest.extra.get("tools-version"), Some(&Value::from(3)));
    }
}
