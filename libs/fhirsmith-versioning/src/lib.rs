//! Version algebra: semver parsing with FHIR-specific wildcards,
//! comparison, matching, and FHIR version-family detection.
//!
//! Every function here is pure: no I/O, no global state. `parse` is the
//! single entry point that turns a string into a [`Parsed`] version;
//! everything else operates on the parsed form.

pub mod canonical;
mod error;
mod family;

pub use error::{Error, Result};
pub use family::{family_for, package_for_version, FhirFamily};

use std::cmp::Ordering;
use std::fmt;

/// One numeric part of a version (major, minor, or patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Number(u32),
    /// `*`, `x`, or `X` — only produced when parsing in wildcard mode.
    Wildcard,
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Number(n) => write!(f, "{n}"),
            Part::Wildcard => write!(f, "x"),
        }
    }
}

/// A parsed version: `{major, minor, patch?, preRelease?, build?}` plus
/// the "this-or-later-optional" flag carried by a trailing `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub major: Part,
    pub minor: Option<Part>,
    pub patch: Option<Part>,
    pub pre_release: Option<String>,
    pub build: Option<String>,
    pub this_or_later: bool,
}

/// Precision to compare to in [`is_this_or_later`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Major,
    Minor,
    Patch,
    Full,
}

/// Map known special tokens (`R2`, `R2B`, `R3`, `R4`, `R4B`, `R5`, `R6`)
/// and the `http://hl7.org/fhir/` canonical prefix to fixed version
/// strings, before any other parsing happens.
pub fn normalize_special(v: &str) -> String {
    const PREFIX: &str = "http://hl7.org/fhir/";
    let v = v.strip_prefix(PREFIX).unwrap_or(v);
    match v {
        "R2" => "1.0.2".to_string(),
        "R2B" => "1.4.0".to_string(),
        "R3" => "3.0.2".to_string(),
        "R4" => "4.0.1".to_string(),
        "R4B" => "4.3.0".to_string(),
        "R5" => "5.0.0".to_string(),
        "R6" => "6.0.0".to_string(),
        other => other.to_string(),
    }
}

/// Parse a version string. When `allow_wildcards` is false, a `*`/`x`/`X`
/// part is an error rather than producing [`Part::Wildcard`].
pub fn parse(v: &str, allow_wildcards: bool) -> Result<Parsed> {
    let normalized = normalize_special(v);
    let mut rest = normalized.as_str();

    let this_or_later = rest.ends_with('?');
    if this_or_later {
        rest = &rest[..rest.len() - 1];
    }

    // Split off build metadata (`+...`), then pre-release (`-...`).
    let (rest, build) = match rest.split_once('+') {
        Some((base, build)) => (base, Some(build.to_string())),
        None => (rest, None),
    };
    let (rest, pre_release) = match rest.split_once('-') {
        Some((base, pre)) => (base, Some(pre.to_string())),
        None => (rest, None),
    };

    let numeric_parts: Vec<&str> = rest.split('.').collect();
    if numeric_parts.is_empty() || numeric_parts.len() > 3 {
        return Err(Error::NotSemver(v.to_string()));
    }

    let mut parts = Vec::with_capacity(3);
    for raw in &numeric_parts {
        parts.push(parse_part(raw, allow_wildcards, v)?);
    }

    let major = parts[0];
    let minor = parts.get(1).copied();
    let patch = parts.get(2).copied();

    Ok(Parsed {
        major,
        minor,
        patch,
        pre_release,
        build,
        this_or_later,
    })
}

fn parse_part(raw: &str, allow_wildcards: bool, whole: &str) -> Result<Part> {
    if matches!(raw, "*" | "x" | "X") {
        return if allow_wildcards {
            Ok(Part::Wildcard)
        } else {
            Err(Error::UnexpectedWildcard(whole.to_string()))
        };
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(Error::LeadingZero(whole.to_string()));
    }
    raw.parse::<u32>()
        .map(Part::Number)
        .map_err(|_| Error::NotSemver(whole.to_string()))
}

/// Whether `v` parses as a (non-wildcard) semver.
pub fn is_semver(v: &str) -> bool {
    parse(v, false).is_ok()
}

/// Whether `v` contains an unescaped `*`/`x`/`X` version-number wildcard.
pub fn has_wildcards(v: &str) -> bool {
    parse(v, false).is_err() && parse(v, true).is_ok()
}

fn cmp_number_part(a: Option<Part>, b: Option<Part>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Part::Number(a)), Some(Part::Number(b))) => a.cmp(&b),
        // A wildcard has no defined ordering against a concrete number;
        // treat it as equal so `compare` stays a total order without
        // claiming semantics `matches` already owns.
        _ => Ordering::Equal,
    }
}

fn cmp_string_part(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        // Absence sorts after presence: a release outranks a pre-release.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => cmp_dot_separated(a, b),
    }
}

fn cmp_dot_separated(a: &str, b: &str) -> Ordering {
    let mut ai = a.split('.');
    let mut bi = b.split('.');
    loop {
        match (ai.next(), bi.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Lexicographic compare over `major, minor, patch, preRelease, build`.
pub fn compare(a: &Parsed, b: &Parsed) -> Ordering {
    cmp_number_part(Some(a.major), Some(b.major))
        .then_with(|| cmp_number_part(a.minor, b.minor))
        .then_with(|| cmp_number_part(a.patch, b.patch))
        .then_with(|| cmp_string_part(&a.pre_release, &b.pre_release))
        .then_with(|| cmp_string_part(&a.build, &b.build))
}

/// Compare two raw version strings; returns `-1/0/1` per the contract.
/// Panics is never — an unparseable side is treated as its own
/// lexically-smallest bucket via `None`-like ordering is *not* done
/// here: callers must validate first, matching the "never silently
/// downgrade" rule. Use [`compare`] directly once both sides are parsed.
pub fn compare_str(a: &str, b: &str) -> Result<i32> {
    let pa = parse(a, true)?;
    let pb = parse(b, true)?;
    Ok(match compare(&pa, &pb) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

fn part_matches(criteria: Option<Part>, candidate: Option<Part>) -> bool {
    match (criteria, candidate) {
        (None, _) => true,
        (Some(Part::Wildcard), Some(_)) => true,
        (Some(Part::Wildcard), None) => false,
        (Some(Part::Number(c)), Some(Part::Number(v))) => c == v,
        (Some(Part::Number(_)), None) => false,
        (Some(Part::Number(_)), Some(Part::Wildcard)) => false,
    }
}

/// Part-wise match: `*`/`x`/`X` in `criteria` matches any non-null
/// candidate part. A trailing `?` on `criteria` truncates it at the
/// first null part, making everything after that point a wildcard.
pub fn matches(criteria: &str, candidate: &str) -> bool {
    let Ok(crit) = parse(criteria, true) else {
        return false;
    };
    let Ok(cand) = parse(candidate, true) else {
        return false;
    };

    // A missing part in `criteria` already behaves as a wildcard via
    // `part_matches`; the trailing `?` exists for callers that build
    // criteria strings dynamically and simply means "no further parts
    // were specified", which the parser already encodes as `None`.
    part_matches(Some(crit.major), Some(cand.major))
        && part_matches(crit.minor, cand.minor)
        && part_matches(crit.patch, cand.patch)
}

fn truncate_to(p: &Parsed, precision: Precision) -> (Part, Option<Part>, Option<Part>) {
    match precision {
        Precision::Major => (p.major, None, None),
        Precision::Minor => (p.major, p.minor, None),
        Precision::Patch | Precision::Full => (p.major, p.minor, p.patch),
    }
}

/// Whether `candidate` is the same as or later than `criteria`, compared
/// only up to `precision`.
pub fn is_this_or_later(criteria: &str, candidate: &str, precision: Precision) -> bool {
    let Ok(crit) = parse(criteria, false) else {
        return false;
    };
    let Ok(cand) = parse(candidate, false) else {
        return false;
    };

    let (cmaj, cmin, cpat) = truncate_to(&crit, precision);
    let (vmaj, vmin, vpat) = truncate_to(&cand, precision);

    let major_cmp = cmp_number_part(Some(cmaj), Some(vmaj));
    if major_cmp != Ordering::Equal {
        return major_cmp == Ordering::Less;
    }
    let minor_cmp = cmp_number_part(cmin, vmin);
    if minor_cmp != Ordering::Equal {
        return minor_cmp == Ordering::Less;
    }
    let patch_cmp = cmp_number_part(cpat, vpat);
    patch_cmp != Ordering::Greater
}

/// `major.minor` of a version string, or `None` if it doesn't parse.
pub fn maj_min(v: &str) -> Option<String> {
    let p = parse(v, false).ok()?;
    let Part::Number(major) = p.major else {
        return None;
    };
    let minor = match p.minor {
        Some(Part::Number(m)) => m,
        _ => 0,
    };
    Some(format!("{major}.{minor}"))
}

/// `major.minor.patch` of a version string, defaulting a missing patch
/// to `0`.
pub fn maj_min_patch(v: &str) -> Option<String> {
    let p = parse(v, false).ok()?;
    let Part::Number(major) = p.major else {
        return None;
    };
    let minor = match p.minor {
        Some(Part::Number(m)) => m,
        _ => 0,
    };
    let patch = match p.patch {
        Some(Part::Number(p)) => p,
        _ => 0,
    };
    Some(format!("{major}.{minor}.{patch}"))
}

/// The canonical package id a raw FHIR version belongs to, e.g.
/// `hl7.fhir.r4.core` for `4.0.1`.
pub fn package_for_version_str(v: &str) -> Option<&'static str> {
    family_for(v).map(package_for_version)
}

/// Whether `v` belongs to the named FHIR version family.
pub fn is_rx_ver(v: &str, family: FhirFamily) -> bool {
    family_for(v) == Some(family)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_leading_zero() {
        assert!(matches!(parse("01.2.3", false), Err(Error::LeadingZero(_))));
        assert!(parse("0.2.3", false).is_ok());
    }

    #[test]
    fn parse_allows_missing_patch() {
        let p = parse("4.0", false).unwrap();
        assert_eq!(p.major, Part::Number(4));
        assert_eq!(p.minor, Some(Part::Number(0)));
        assert_eq!(p.patch, None);
    }

    #[test]
    fn parse_wildcards_require_mode() {
        assert!(parse("1.x.0", false).is_err());
        assert!(parse("1.x.0", true).is_ok());
        assert!(has_wildcards("1.x.0"));
        assert!(!has_wildcards("1.2.0"));
    }

    #[test]
    fn compare_is_reflexive_and_antisymmetric() {
        let a = parse("1.2.3", false).unwrap();
        let b = parse("1.2.4", false).unwrap();
        assert_eq!(compare(&a, &a), Ordering::Equal);
        assert_eq!(compare(&a, &b), Ordering::Less);
        assert_eq!(compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn compare_prefers_release_over_prerelease() {
        let release = parse("1.0.0", false).unwrap();
        let pre = parse("1.0.0-alpha", false).unwrap();
        assert_eq!(compare(&release, &pre), Ordering::Greater);
    }

    #[test]
    fn matches_wildcards() {
        assert!(matches("*", "1.2.3"));
        assert!(matches("1.x", "1.2.3"));
        assert!(!matches("1.x", "2.0.0"));
        assert!(matches("1.2.x", "1.2.9"));
    }

    #[test]
    fn matches_this_or_later_truncation() {
        // "1.2?" truncates at patch: everything after minor is wildcard.
        assert!(matches("1.2?", "1.2.9"));
        assert!(!matches("1.2?", "1.3.0"));
    }

    #[test]
    fn is_this_or_later_full_precision() {
        assert!(is_this_or_later("4.0", "4.0.1", Precision::Full));
        assert!(!is_this_or_later("4.0", "3.5.0", Precision::Full));
    }

    #[test]
    fn maj_min_and_maj_min_patch() {
        assert_eq!(maj_min("4.0.1"), Some("4.0".to_string()));
        assert_eq!(maj_min_patch("4.0"), Some("4.0.0".to_string()));
    }

    #[test]
    fn normalize_special_tokens() {
        assert_eq!(normalize_special("R4"), "4.0.1");
        assert_eq!(normalize_special("http://hl7.org/fhir/R4"), "4.0.1");
        assert_eq!(normalize_special("4.2.0"), "4.2.0");
    }
}
