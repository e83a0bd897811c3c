//! A SQLite-backed metadata index over ValueSet or ConceptMap resources
//! extracted from a single package, supporting the parametric search
//! contract and last-seen-based garbage collection.

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::schema::ensure_schema;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// Indexed columns eligible for the `elements` projection shortcut.
const INDEXED_ELEMENTS: &[&str] = &[
    "id", "url", "version", "date", "description", "name", "publisher", "status", "title",
];

pub struct Catalog {
    pool: SqlitePool,
    kind: Kind,
    space_id: Option<String>,
}

impl Catalog {
    pub async fn open(db_path: &Path, kind: Kind) -> Result<Self> {
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new().max_connections(4).connect(&url).await?;
        ensure_schema(&pool, kind).await?;
        Ok(Self {
            pool,
            kind,
            space_id: None,
        })
    }

    pub fn with_space_id(mut self, space_id: impl Into<String>) -> Self {
        self.space_id = Some(space_id.into());
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Insert or replace a resource's row and rebuild its side tables.
    /// `last_seen` is the UNIX timestamp to stamp the row with; callers
    /// doing a refresh cycle pass the cycle's start time so that
    /// `delete_older_than` can reclaim anything not touched this cycle.
    pub async fn upsert(&self, resource: &Value, last_seen: i64) -> Result<()> {
        let table = self.kind.table();
        let id = resource
            .get("id")
            .and_then(Value::as_str)
            .ok_or(Error::MissingField("id"))?;
        let content = serde_json::to_string(resource)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT OR REPLACE INTO {table} (
                id, url, version, date, description, effective_period_start,
                effective_period_end, expansion_identifier, name, publisher,
                status, title, content, last_seen
            ) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?)"
        ))
        .bind(id)
        .bind(opt_str(resource, "url"))
        .bind(opt_str(resource, "version"))
        .bind(opt_str(resource, "date"))
        .bind(opt_str(resource, "description"))
        .bind(nested_str(resource, &["effectivePeriod", "start"]))
        .bind(nested_str(resource, &["effectivePeriod", "end"]))
        .bind(nested_str(resource, &["expansion", "identifier"]))
        .bind(opt_str(resource, "name"))
        .bind(opt_str(resource, "publisher"))
        .bind(opt_str(resource, "status"))
        .bind(opt_str(resource, "title"))
        .bind(content)
        .bind(last_seen)
        .execute(&mut *tx)
        .await?;

        for side_table in ["identifiers", "jurisdictions", "systems"] {
            sqlx::query(&format!("DELETE FROM {side_table} WHERE vs_id = ?"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(identifiers) = resource.get("identifier").and_then(Value::as_array) {
            for ident in identifiers {
                let type_coding = ident
                    .get("type")
                    .and_then(|t| t.get("coding"))
                    .and_then(Value::as_array)
                    .and_then(|c| c.first());
                sqlx::query(
                    "INSERT INTO identifiers (vs_id, system, value, use, type_system, type_code)
                     VALUES (?,?,?,?,?,?)",
                )
                .bind(id)
                .bind(ident.get("system").and_then(Value::as_str))
                .bind(ident.get("value").and_then(Value::as_str))
                .bind(ident.get("use").and_then(Value::as_str))
                .bind(type_coding.and_then(|c| c.get("system")).and_then(Value::as_str))
                .bind(type_coding.and_then(|c| c.get("code")).and_then(Value::as_str))
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(jurisdictions) = resource.get("jurisdiction").and_then(Value::as_array) {
            for cc in jurisdictions {
                let Some(codings) = cc.get("coding").and_then(Value::as_array) else {
                    continue;
                };
                for coding in codings {
                    sqlx::query(
                        "INSERT INTO jurisdictions (vs_id, system, code, display) VALUES (?,?,?,?)",
                    )
                    .bind(id)
                    .bind(coding.get("system").and_then(Value::as_str))
                    .bind(coding.get("code").and_then(Value::as_str))
                    .bind(coding.get("display").and_then(Value::as_str))
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        for system in self.kind.systems_in(resource) {
            sqlx::query("INSERT INTO systems (vs_id, system) VALUES (?,?)")
                .bind(id)
                .bind(system)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Only bump `last_seen` for an already-cached `url|version`,
    /// leaving the row otherwise untouched (VSAC refresh fast path).
    pub async fn touch(&self, url: &str, version: Option<&str>, last_seen: i64) -> Result<bool> {
        let table = self.kind.table();
        let result = sqlx::query(&format!(
            "UPDATE {table} SET last_seen = ? WHERE url = ? AND version IS NOT DISTINCT FROM ?"
        ))
        .bind(last_seen)
        .bind(url)
        .bind(version)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn contains(&self, url: &str, version: Option<&str>) -> Result<bool> {
        let table = self.kind.table();
        let row: Option<(i64,)> = sqlx::query_as(&format!(
            "SELECT 1 FROM {table} WHERE url = ? AND version IS NOT DISTINCT FROM ? LIMIT 1"
        ))
        .bind(url)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn fetch_by_id(&self, id: &str) -> Result<Option<Value>> {
        let table = self.kind.table();
        let row: Option<(String,)> =
            sqlx::query_as(&format!("SELECT content FROM {table} WHERE id = ?"))
                .bind(strip_space_prefix(id, self.space_id.as_deref()))
                .fetch_optional(&self.pool)
                .await?;
        let Some((content,)) = row else {
            return Ok(None);
        };
        let mut value: Value = serde_json::from_str(&content)?;
        self.apply_space_prefix(&mut value);
        Ok(Some(value))
    }

    /// Parametric search per the name → column/operator table: `url`
    /// matches exactly, most metadata fields match case-insensitive
    /// substring, `identifier`/`jurisdiction`/`system` join their side
    /// tables, and anything unrecognized falls back to a substring
    /// search over the serialized resource. All params AND together.
    pub async fn search(
        &self,
        params: &[(String, String)],
        elements: Option<&[String]>,
    ) -> Result<Vec<Value>> {
        let table = self.kind.table();
        let projected = elements.filter(|els| els.iter().all(|e| INDEXED_ELEMENTS.contains(&e.as_str())));

        let select_cols = match projected {
            Some(els) => els.join(", "),
            None => "content".to_string(),
        };

        let mut from_clause = format!("{table}");
        let mut wheres = Vec::new();
        let mut binds: Vec<String> = Vec::new();
        let mut join_idx = 0usize;

        for (name, value) in params {
            match name.as_str() {
                "url" => {
                    wheres.push(format!("{table}.url = ?"));
                    binds.push(value.clone());
                }
                "version" | "name" | "title" | "status" | "publisher" | "description" | "date" => {
                    wheres.push(format!("{table}.{name} LIKE ?"));
                    binds.push(format!("%{value}%"));
                }
                "identifier" => {
                    join_idx += 1;
                    let alias = format!("ident{join_idx}");
                    from_clause.push_str(&format!(" JOIN identifiers {alias} ON {alias}.vs_id = {table}.id"));
                    wheres.push(format!("({alias}.system = ? OR {alias}.value LIKE ?)"));
                    binds.push(value.clone());
                    binds.push(format!("%{value}%"));
                }
                "jurisdiction" => {
                    join_idx += 1;
                    let alias = format!("juris{join_idx}");
                    from_clause
                        .push_str(&format!(" JOIN jurisdictions {alias} ON {alias}.vs_id = {table}.id"));
                    wheres.push(format!("({alias}.system = ? OR {alias}.code LIKE ?)"));
                    binds.push(value.clone());
                    binds.push(format!("%{value}%"));
                }
                "system" => {
                    join_idx += 1;
                    let alias = format!("sys{join_idx}");
                    from_clause.push_str(&format!(" JOIN systems {alias} ON {alias}.vs_id = {table}.id"));
                    wheres.push(format!("{alias}.system = ?"));
                    binds.push(value.clone());
                }
                _ => {
                    wheres.push(format!("{table}.content LIKE ?"));
                    binds.push(format!("%{value}%"));
                }
            }
        }

        let qualified_cols = select_cols
            .split(", ")
            .map(|c| format!("{table}.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {qualified_cols} FROM {from_clause}");
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres.join(" AND "));
        }

        let mut query = sqlx::query(&sql);
        for b in &binds {
            query = query.bind(b);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let value = match projected {
                Some(els) => self.reconstruct_projected(&row, els),
                None => {
                    let content: String = row.get(0);
                    let mut v: Value = serde_json::from_str(&content)?;
                    self.apply_space_prefix(&mut v);
                    v
                }
            };
            out.push(value);
        }
        Ok(out)
    }

    fn reconstruct_projected(&self, row: &sqlx::sqlite::SqliteRow, elements: &[String]) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "resourceType".to_string(),
            Value::String(self.kind.resource_type().to_string()),
        );
        for (idx, element) in elements.iter().enumerate() {
            let Some(text) = row.try_get::<Option<String>, _>(idx).ok().flatten() else {
                continue;
            };
            let text = if element == "id" {
                match &self.space_id {
                    Some(space_id) => format!("{space_id}-{text}"),
                    None => text,
                }
            } else {
                text
            };
            obj.insert(element.clone(), Value::String(text));
        }
        Value::Object(obj)
    }

    fn apply_space_prefix(&self, value: &mut Value) {
        let Some(space_id) = &self.space_id else {
            return;
        };
        if let Some(id) = value.get("id").and_then(Value::as_str).map(str::to_string) {
            value["id"] = Value::String(format!("{space_id}-{id}"));
        }
    }

    /// Delete rows (and their side-table entries) last seen before
    /// `cutoff`, returning the number of main-table rows removed.
    pub async fn delete_older_than(&self, cutoff: i64) -> Result<u64> {
        let table = self.kind.table();
        let ids: Vec<(String,)> =
            sqlx::query_as(&format!("SELECT id FROM {table} WHERE last_seen < ?"))
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?;

        let mut tx = self.pool.begin().await?;
        for (id,) in &ids {
            for side_table in ["identifiers", "jurisdictions", "systems"] {
                sqlx::query(&format!("DELETE FROM {side_table} WHERE vs_id = ?"))
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(ids.len() as u64)
    }
}

fn opt_str<'a>(v: &'a Value, field: &str) -> Option<&'a str> {
    v.get(field).and_then(Value::as_str)
}

fn nested_str<'a>(v: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = v;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str()
}

fn strip_space_prefix<'a>(id: &'a str, space_id: Option<&str>) -> &'a str {
    match space_id {
        Some(space_id) => id.strip_prefix(&format!("{space_id}-")).unwrap_or(id),
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn open_vs_catalog() -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&dir.path().join(".valuesets.db"), Kind::ValueSet)
            .await
            .unwrap();
        (dir, catalog)
    }

    fn sample_valueset(id: &str, url: &str, status: &str) -> Value {
        json!({
            "resourceType": "ValueSet",
            "id": id,
            "url": url,
            "version": "1.0.0",
            "name": "DemoVs",
            "status": status,
            "publisher": "Acme",
            "compose": { "include": [{ "system": "http://loinc.org" }] }
        })
    }

    #[tokio::test]
    async fn upsert_then_search_by_status() {
        let (_dir, catalog) = open_vs_catalog().await;
        catalog
            .upsert(&sample_valueset("vs1", "http://example.org/vs1", "active"), 100)
            .await
            .unwrap();

        let results = catalog
            .search(&[("status".to_string(), "active".to_string())], None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], "vs1");
    }

    #[tokio::test]
    async fn search_by_system_uses_side_table() {
        let (_dir, catalog) = open_vs_catalog().await;
        catalog
            .upsert(&sample_valueset("vs1", "http://example.org/vs1", "active"), 100)
            .await
            .unwrap();

        let hits = catalog
            .search(&[("system".to_string(), "http://loinc.org".to_string())], None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = catalog
            .search(&[("system".to_string(), "http://snomed.info/sct".to_string())], None)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn elements_projection_returns_only_indexed_columns() {
        let (_dir, catalog) = open_vs_catalog().await;
        catalog
            .upsert(&sample_valueset("vs1", "http://example.org/vs1", "active"), 100)
            .await
            .unwrap();

        let results = catalog
            .search(&[], Some(&["id".to_string(), "status".to_string()]))
            .await
            .unwrap();
        assert_eq!(results[0].as_object().unwrap().len(), 3);
        assert_eq!(results[0]["resourceType"], "ValueSet");
        assert_eq!(results[0]["id"], "vs1");
        assert_eq!(results[0]["status"], "active");
    }

    #[tokio::test]
    async fn space_id_prefixes_ids_on_emission_only() {
        let (_dir, catalog) = open_vs_catalog().await;
        let catalog = catalog.with_space_id("pkg1");
        catalog
            .upsert(&sample_valueset("vs1", "http://example.org/vs1", "active"), 100)
            .await
            .unwrap();

        let results = catalog.search(&[], None).await.unwrap();
        assert_eq!(results[0]["id"], "pkg1-vs1");

        let fetched = catalog.fetch_by_id("pkg1-vs1").await.unwrap().unwrap();
        assert_eq!(fetched["id"], "pkg1-vs1");
    }

    #[tokio::test]
    async fn delete_older_than_removes_stale_rows_and_side_tables() {
        let (_dir, catalog) = open_vs_catalog().await;
        catalog
            .upsert(&sample_valueset("vs1", "http://example.org/vs1", "active"), 100)
            .await
            .unwrap();
        catalog
            .upsert(&sample_valueset("vs2", "http://example.org/vs2", "active"), 200)
            .await
            .unwrap();

        let removed = catalog.delete_older_than(150).await.unwrap();
        assert_eq!(removed, 1);
        assert!(catalog.fetch_by_id("vs1").await.unwrap().is_none());
        assert!(catalog.fetch_by_id("vs2").await.unwrap().is_some());

        let hits = catalog
            .search(&[("system".to_string(), "http://loinc.org".to_string())], None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn touch_bumps_last_seen_without_full_upsert() {
        let (_dir, catalog) = open_vs_catalog().await;
        catalog
            .upsert(&sample_valueset("vs1", "http://example.org/vs1", "active"), 100)
            .await
            .unwrap();

        assert!(catalog
            .touch("http://example.org/vs1", Some("1.0.0"), 999)
            .await
            .unwrap());
        assert!(!catalog
            .touch("http://example.org/missing", Some("1.0.0"), 999)
            .await
            .unwrap());

        assert_eq!(catalog.delete_older_than(500).await.unwrap(), 0);
    }
}
