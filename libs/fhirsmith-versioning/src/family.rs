//! FHIR version family detection, keyed only off the leading
//! `major.minor` of a (normalized) version string.

use crate::maj_min;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FhirFamily {
    R2,
    R2B,
    R3,
    R4,
    R4B,
    R5,
    R6,
}

/// Detect the FHIR release family a version belongs to, inspecting
/// only the leading `major.minor`.
///
/// R4 also matches any `3.2`..`3.5` pre-release ballot of what became
/// the 4.0 release; R4B matches `4.1` and `4.3`; R5 matches `4.5`
/// (ballot) and `5.0`; R6 matches `5.5` (ballot) and `6.0`.
pub fn family_for(v: &str) -> Option<FhirFamily> {
    let mm = maj_min(v)?;
    match mm.as_str() {
        "1.0" => Some(FhirFamily::R2),
        "1.4" => Some(FhirFamily::R2B),
        "3.0" => Some(FhirFamily::R3),
        "3.2" | "3.3" | "3.4" | "3.5" | "4.0" => Some(FhirFamily::R4),
        "4.1" | "4.3" => Some(FhirFamily::R4B),
        "4.5" | "5.0" => Some(FhirFamily::R5),
        "5.5" | "6.0" => Some(FhirFamily::R6),
        _ => None,
    }
}

/// The canonical core package id for a FHIR version family.
pub fn package_for_version(family: FhirFamily) -> &'static str {
    match family {
        FhirFamily::R2 => "hl7.fhir.r2.core",
        FhirFamily::R2B => "hl7.fhir.r2b.core",
        FhirFamily::R3 => "hl7.fhir.r3.core",
        FhirFamily::R4 => "hl7.fhir.r4.core",
        FhirFamily::R4B => "hl7.fhir.r4b.core",
        FhirFamily::R5 => "hl7.fhir.r5.core",
        FhirFamily::R6 => "hl7.fhir.r6.core",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_exact_families() {
        assert_eq!(family_for("4.0.1"), Some(FhirFamily::R4));
        assert_eq!(family_for("4.5.0"), Some(FhirFamily::R5));
        assert_eq!(family_for("5.0.0"), Some(FhirFamily::R5));
        assert_eq!(family_for("4.1.0"), Some(FhirFamily::R4B));
        assert_eq!(family_for("4.3.0"), Some(FhirFamily::R4B));
    }

    #[test]
    fn detects_r4_ballot_prereleases() {
        assert_eq!(family_for("3.3.0"), Some(FhirFamily::R4));
    }

    #[test]
    fn unknown_family_is_none() {
        assert_eq!(family_for("9.9.9"), None);
    }

    #[test]
    fn package_ids_match_family() {
        assert_eq!(package_for_version(FhirFamily::R4), "hl7.fhir.r4.core");
        assert_eq!(package_for_version(FhirFamily::R4B), "hl7.fhir.r4b.core");
    }
}
