//! Per-request context threaded through every terminology operation
//! (spec §4.7): language preferences, a deadline, and the endpoint's
//! shared caches.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::caches::{ExpansionCache, ResourceCache};

const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// One entry of a parsed `Accept-Language` header, sorted by
/// descending `q`.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguagePreference {
    pub tag: String,
    pub q: f32,
}

/// Parse an `Accept-Language` header value into preferences ordered
/// most-preferred first. Malformed segments (unparsable `q`) default
/// to `q=1.0` rather than being dropped, matching how permissive HTTP
/// servers typically treat header noise.
pub fn parse_accept_language(header: &str) -> Vec<LanguagePreference> {
    let mut prefs: Vec<LanguagePreference> = header
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            let mut segments = part.splitn(2, ';');
            let tag = segments.next()?.trim().to_string();
            let q = segments
                .next()
                .and_then(|qpart| qpart.trim().strip_prefix("q="))
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(1.0);
            Some(LanguagePreference { tag, q })
        })
        .collect();
    prefs.sort_by(|a, b| b.q.partial_cmp(&a.q).unwrap_or(std::cmp::Ordering::Equal));
    prefs
}

/// Raised by [`OperationContext::dead_check`] once the deadline has
/// elapsed; carries whatever diagnostics the caller had accumulated so
/// far so the resulting `OperationOutcome` isn't empty.
#[derive(Debug, Clone, thiserror::Error)]
#[error("operation exceeded its deadline at '{marker}': {diagnostics}")]
pub struct TooCostly {
    pub marker: String,
    pub diagnostics: String,
}

pub struct OperationContext {
    pub request_id: String,
    pub languages: Vec<LanguagePreference>,
    pub started_at: Instant,
    pub deadline: Duration,
    pub resource_cache: Arc<ResourceCache>,
    pub expansion_cache: Arc<ExpansionCache>,
    diagnostics: std::sync::Mutex<Vec<String>>,
}

impl OperationContext {
    pub fn new(
        request_id: impl Into<String>,
        accept_language: Option<&str>,
        resource_cache: Arc<ResourceCache>,
        expansion_cache: Arc<ExpansionCache>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            languages: accept_language.map(parse_accept_language).unwrap_or_default(),
            started_at: Instant::now(),
            deadline: DEFAULT_DEADLINE,
            resource_cache,
            expansion_cache,
            diagnostics: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Accumulate a diagnostic message that should surface if this
    /// operation later fails with `TooCostly`.
    pub fn note(&self, diagnostic: impl Into<String>) {
        self.diagnostics
            .lock()
            .expect("operation context diagnostics poisoned")
            .push(diagnostic.into());
    }

    /// Called at every suspension point or loop iteration an operation
    /// defines (spec §4.7). Returns `Err(TooCostly)` once the deadline
    /// has elapsed, carrying every diagnostic noted so far.
    pub fn dead_check(&self, marker: &str) -> Result<(), TooCostly> {
        if self.started_at.elapsed() <= self.deadline {
            return Ok(());
        }
        let diagnostics = self
            .diagnostics
            .lock()
            .expect("operation context diagnostics poisoned")
            .join("; ");
        Err(TooCostly {
            marker: marker.to_string(),
            diagnostics,
        })
    }

    pub fn preferred_language(&self) -> Option<&str> {
        self.languages.first().map(|p| p.tag.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accept_language_in_quality_order() {
        let prefs = parse_accept_language("fr-CH, fr;q=0.9, en;q=0.8, de;q=0.7, *;q=0.5");
        assert_eq!(prefs[0].tag, "fr-CH");
        assert_eq!(prefs[0].q, 1.0);
        assert_eq!(prefs.last().unwrap().tag, "*");
    }

    #[test]
    fn dead_check_passes_within_deadline() {
        let ctx = OperationContext::new(
            "req-1",
            None,
            Arc::new(ResourceCache::with_default_timeout()),
            Arc::new(ExpansionCache::new(100, None)),
        );
        assert!(ctx.dead_check("start").is_ok());
    }

    #[test]
    fn dead_check_fails_past_deadline() {
        let ctx = OperationContext::new(
            "req-2",
            None,
            Arc::new(ResourceCache::with_default_timeout()),
            Arc::new(ExpansionCache::new(100, None)),
        )
        .with_deadline(Duration::from_millis(1));
        ctx.note("expanding large value set");
        std::thread::sleep(Duration::from_millis(10));
        let err = ctx.dead_check("loop-iteration-42").unwrap_err();
        assert_eq!(err.marker, "loop-iteration-42");
        assert!(err.diagnostics.contains("expanding"));
    }
}
