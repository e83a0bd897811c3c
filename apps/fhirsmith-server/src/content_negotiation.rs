//! Content negotiation (spec §4.8, §6): `_format`, `Accept`, pretty
//! printing, and the paging/filtering parameters the dispatcher must
//! also honour (`_elements`, `_sort`, `_offset`, `_count`).

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentFormat {
    #[default]
    Json,
    Xml,
    Html,
}

impl ContentFormat {
    pub fn parse(s: &str) -> Option<Self> {
        let mime_type = s.split(';').next().unwrap_or(s).trim();
        match mime_type.to_ascii_lowercase().as_str() {
            "json" | "application/json" | "application/fhir+json" => Some(Self::Json),
            "xml" | "text/xml" | "application/xml" | "application/fhir+xml" => Some(Self::Xml),
            "html" | "text/html" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Json => "application/fhir+json",
            Self::Xml => "application/fhir+xml",
            Self::Html => "text/html",
        }
    }

    pub fn browser_friendly_mime_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            other => other.mime_type(),
        }
    }
}

/// `_elements`/`_sort`/`_offset`/`_count` plus format/pretty negotiation
/// for one request (spec §6). Paging and sort apply to search and
/// `$expand`-style operations; format/pretty apply to every response.
#[derive(Debug, Clone, Default)]
pub struct ContentNegotiation {
    pub format: ContentFormat,
    pub elements: Option<Vec<String>>,
    pub sort: Option<String>,
    pub offset: usize,
    pub count: Option<usize>,
    pub pretty: bool,
    pub is_browser_request: bool,
    pub explicit_fhir_format_requested: bool,
}

impl ContentNegotiation {
    pub fn from_request(query: &HashMap<String, String>, headers: &HeaderMap) -> Self {
        let is_browser_request = Self::is_browser_request(headers);

        let explicit_fhir_format_requested = query
            .get("_format")
            .map(|s| {
                let s = s.to_lowercase();
                s.contains("fhir+json") || s.contains("fhir+xml")
            })
            .unwrap_or(false)
            || Self::has_explicit_fhir_format_in_accept(headers);

        let format = query
            .get("_format")
            .and_then(|s| ContentFormat::parse(s))
            .or_else(|| Self::extract_format_from_accept(headers))
            .unwrap_or_default();

        let elements = query.get("_elements").map(|s| {
            s.split(',').map(|e| e.trim().to_string()).collect::<Vec<_>>()
        });
        let sort = query.get("_sort").cloned();
        let offset = query
            .get("_offset")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        let count = query.get("_count").and_then(|s| s.parse::<usize>().ok());
        let pretty = query
            .get("_pretty")
            .map(|s| s == "true" || s.is_empty())
            .unwrap_or(false);

        Self {
            format,
            elements,
            sort,
            offset,
            count,
            pretty,
            is_browser_request,
            explicit_fhir_format_requested,
        }
    }

    fn is_browser_request(headers: &HeaderMap) -> bool {
        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        user_agent.contains("mozilla")
            && (user_agent.contains("chrome")
                || user_agent.contains("firefox")
                || user_agent.contains("safari")
                || user_agent.contains("edge"))
            && !user_agent.contains("bot")
    }

    /// First Accept entry (in header order) that names json, xml, or
    /// html wins; wildcard/unsupported entries are skipped rather than
    /// defaulting the whole response to JSON, so a browser's
    /// `text/html,application/xhtml+xml,...` renders the HTML page.
    fn extract_format_from_accept(headers: &HeaderMap) -> Option<ContentFormat> {
        let accept = headers.get("accept")?.to_str().ok()?;
        accept
            .split(',')
            .filter_map(|part| part.split(';').next())
            .find_map(|media_type| ContentFormat::parse(media_type.trim()))
    }

    fn has_explicit_fhir_format_in_accept(headers: &HeaderMap) -> bool {
        let Some(accept) = headers.get("accept").and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let accept = accept.to_lowercase();
        accept.contains("application/fhir+json") || accept.contains("application/fhir+xml")
    }

    pub fn response_mime_type(&self) -> &'static str {
        if self.format == ContentFormat::Json
            && self.is_browser_request
            && !self.explicit_fhir_format_requested
        {
            self.format.browser_friendly_mime_type()
        } else {
            self.format.mime_type()
        }
    }

    pub fn response_content_type_header(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("{}; charset=utf-8", self.response_mime_type()))
            .unwrap_or_else(|_| HeaderValue::from_static("application/fhir+json; charset=utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_param_wins_over_accept() {
        let mut q = HashMap::new();
        q.insert("_format".to_string(), "xml".to_string());
        let mut headers = HeaderMap::new();
        headers.insert("accept", "application/fhir+json".parse().unwrap());
        let cn = ContentNegotiation::from_request(&q, &headers);
        assert_eq!(cn.format, ContentFormat::Xml);
    }

    #[test]
    fn paging_params_parsed() {
        let mut q = HashMap::new();
        q.insert("_offset".to_string(), "20".to_string());
        q.insert("_count".to_string(), "10".to_string());
        q.insert("_sort".to_string(), "name".to_string());
        let cn = ContentNegotiation::from_request(&q, &HeaderMap::new());
        assert_eq!(cn.offset, 20);
        assert_eq!(cn.count, Some(10));
        assert_eq!(cn.sort.as_deref(), Some("name"));
    }

    #[test]
    fn browser_accept_html_without_format_param() {
        let headers_map = HeaderMap::new();
        let cn = ContentNegotiation::from_request(&HashMap::new(), &headers_map);
        assert_eq!(cn.format, ContentFormat::Json);
    }
}
