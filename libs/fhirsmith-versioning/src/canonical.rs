//! Canonical identifier helpers: a canonical is a URI optionally
//! suffixed with `|version`.

/// Split `url|version` into `(url, version)`. A bare url with no `|`
/// yields `(url, None)`.
pub fn split(canonical: &str) -> (&str, Option<&str>) {
    match canonical.split_once('|') {
        Some((url, version)) => (url, Some(version)),
        None => (canonical, None),
    }
}

/// Join a url and an optional version. Joining with `None` or an empty
/// version string yields the url unchanged.
pub fn join(url: &str, version: Option<&str>) -> String {
    match version {
        Some(v) if !v.is_empty() => format!("{url}|{v}"),
        _ => url.to_string(),
    }
}

/// Strip a `|version` suffix, if present.
pub fn remove_version(canonical: &str) -> &str {
    split(canonical).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_version() {
        let url = "http://example.org/ValueSet/x";
        let v = "1.0.0";
        assert_eq!(split(&join(url, Some(v))), (url, Some(v)));
    }

    #[test]
    fn join_with_empty_version_is_unchanged() {
        assert_eq!(join("http://x", Some("")), "http://x");
        assert_eq!(join("http://x", None), "http://x");
    }

    #[test]
    fn remove_version_strips_suffix() {
        assert_eq!(
            remove_version(&join("http://x", Some("1.0.0"))),
            "http://x"
        );
    }
}
