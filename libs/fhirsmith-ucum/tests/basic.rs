use rust_decimal::Decimal;
use std::str::FromStr;

#[test]
fn parse_rejects_non_ascii() {
    let err = fhirsmith_ucum::parse("µg").unwrap_err();
    assert!(matches!(err, fhirsmith_ucum::Error::NonAscii));
}

#[test]
fn validate_rejects_invalid_syntax() {
    assert!(fhirsmith_ucum::validate("mg//dL").is_err());
    assert!(fhirsmith_ucum::validate("kg/(m.s2").is_err());
    assert!(fhirsmith_ucum::validate("m..s").is_err());
}

#[test]
fn equivalence_basic() {
    assert!(fhirsmith_ucum::equivalent("mg/dL", "g/L").unwrap());
    assert!(!fhirsmith_ucum::equivalent("mg", "m").unwrap());
}

#[test]
fn case_sensitive_symbols() {
    assert!(fhirsmith_ucum::validate("[iU]").is_ok());
    assert!(fhirsmith_ucum::validate("[IU]").is_ok());
    assert!(fhirsmith_ucum::validate("iu").is_err());
}

#[test]
fn converts_minutes_to_seconds() {
    let v = fhirsmith_ucum::convert_decimal(Decimal::ONE, "min", "s").unwrap();
    assert_eq!(v, Decimal::from(60));
}

#[test]
fn deciliter_to_liter() {
    let v = fhirsmith_ucum::convert_decimal(Decimal::ONE, "dL", "L").unwrap();
    assert_eq!(v, Decimal::from_str("0.1").unwrap());
}

#[test]
fn normalizes_pressure_to_pa() {
    let n = fhirsmith_ucum::normalize(Decimal::from(120), "mm[Hg]").unwrap();
    assert_eq!(n.unit, "Pa");
    assert_eq!(n.value, Decimal::from_str("15998.64").unwrap());
}

#[test]
fn clinical_concentration_units_are_valid() {
    assert!(fhirsmith_ucum::is_valid("mmol/L"));
    assert!(fhirsmith_ucum::is_valid("ug/mL"));
    assert!(fhirsmith_ucum::is_valid("10*3/uL"));
    assert!(fhirsmith_ucum::is_valid("10*9/L"));
    assert!(fhirsmith_ucum::is_valid("meq/L"));
    assert!(fhirsmith_ucum::is_valid("[IU]/mL"));
}

#[test]
fn celsius_converts_affinely_to_kelvin() {
    let v = fhirsmith_ucum::convert_decimal(Decimal::from(0), "Cel", "K").unwrap();
    assert_eq!(v, Decimal::from_str("273.15").unwrap());
}

#[test]
fn non_linear_units_reject_conversion() {
    assert!(fhirsmith_ucum::convert_decimal(Decimal::ONE, "[pH]", "mol/l").is_err());
}

#[test]
fn percent_is_dimensionless() {
    assert!(fhirsmith_ucum::convertible("%", "[ppth]").unwrap());
}

#[test]
fn arbitrary_units_parse_but_stay_distinct_symbols() {
    assert!(fhirsmith_ucum::validate("[arb'U]/mL").is_ok());
}
