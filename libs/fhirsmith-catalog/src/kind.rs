/// Which resource type a catalog database holds. Both variants share an
/// identical schema and search contract; only the main table's name and
/// the way the `systems` side table is populated differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    ValueSet,
    ConceptMap,
}

impl Kind {
    pub fn table(self) -> &'static str {
        match self {
            Kind::ValueSet => "valuesets",
            Kind::ConceptMap => "conceptmaps",
        }
    }

    pub fn resource_type(self) -> &'static str {
        match self {
            Kind::ValueSet => "ValueSet",
            Kind::ConceptMap => "ConceptMap",
        }
    }

    /// Database file name relative to a package directory, per the
    /// `{packagePath}/.valuesets.db` / `.conceptmaps.db` convention.
    pub fn db_file_name(self) -> &'static str {
        match self {
            Kind::ValueSet => ".valuesets.db",
            Kind::ConceptMap => ".conceptmaps.db",
        }
    }

    /// Canonical systems referenced by a resource of this kind, used to
    /// seed the `systems` side table. ValueSets declare them under
    /// `compose.include[].system`; ConceptMaps reference them as each
    /// group's `source`/`target`.
    pub fn systems_in(self, resource: &serde_json::Value) -> Vec<String> {
        match self {
            Kind::ValueSet => resource
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
                .unwrap_or_default(),
            Kind::ConceptMap => resource
                .get("group")
                .and_then(|g| g.as_array())
                .map(|groups| {
                    groups
                        .iter()
                        .flat_map(|g| {
                            [g.get("source"), g.get("target")]
                                .into_iter()
                                .flatten()
                                .filter_map(|v| v.as_str())
                                .map(str::to_string)
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
