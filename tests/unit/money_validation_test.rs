// Parsing of monetary strings, rates, identifiers and reference months

use barber_commission::core::money::{format_money, parse_money, parse_rate, percentage_of, round_money};
use barber_commission::core::validation::{
    parse_date, parse_id, parse_optional_id, parse_reference_month, reference_month_of,
    require_non_blank, validate_date_range,
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[test]
fn test_parse_money_accepts_two_decimals() {
    assert_eq!(parse_money("amount", "80.00").unwrap(), dec!(80.00));
    assert_eq!(parse_money("amount", " 1500 ").unwrap(), dec!(1500));
    assert_eq!(parse_money("amount", "0.5").unwrap(), dec!(0.50));
}

#[test]
fn test_parse_money_rejects_malformed_input() {
    for input in ["", "   ", "abc", "12,50", "10.001", "R$ 10"] {
        let err = parse_money("amount", input).unwrap_err();
        assert!(err.is_validation(), "'{}' should be rejected", input);
    }
}

#[test]
fn test_parse_money_rejects_amounts_beyond_storage() {
    assert_eq!(parse_money("amount", "9999999999999.99").unwrap(), dec!(9999999999999.99));
    for input in ["10000000000000", "-10000000000000.00", "79228162514264337593543950335"] {
        let err = parse_money("amount", input).unwrap_err();
        assert!(err.is_validation(), "'{}' should be rejected", input);
    }
}

#[test]
fn test_parse_money_error_names_field() {
    let err = parse_money("gross_value", "x").unwrap_err();
    assert!(err.to_string().contains("gross_value"));
}

#[test]
fn test_parse_rate() {
    assert_eq!(parse_rate("rate", "33.3333").unwrap(), dec!(33.3333));
    assert!(parse_rate("rate", "33.33333").unwrap_err().is_validation());
    assert!(parse_rate("rate", "-1").unwrap_err().is_validation());
    assert!(parse_rate("rate", "fifty").unwrap_err().is_validation());
    assert!(parse_rate("rate", "100000000").unwrap_err().is_validation());
}

#[test]
fn test_rounding_and_formatting() {
    assert_eq!(round_money(dec!(2.345)), dec!(2.35));
    assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
    assert_eq!(percentage_of(dec!(59.90), dec!(35)).unwrap(), dec!(20.97));
    assert_eq!(format_money(dec!(80)), "80.00");
    assert_eq!(format_money(dec!(19.999)), "20.00");
}

#[test]
fn test_identifiers() {
    let id = Uuid::new_v4();
    assert_eq!(parse_id("professional_id", &format!(" {} ", id)).unwrap(), id);
    assert!(parse_id("professional_id", "42").unwrap_err().is_validation());
    assert_eq!(parse_optional_id("unit_id", None).unwrap(), None);
    assert_eq!(parse_optional_id("unit_id", Some("")).unwrap(), None);
    assert_eq!(parse_optional_id("unit_id", Some(&id.to_string())).unwrap(), Some(id));
}

#[test]
fn test_reference_month() {
    let (start, end) = parse_reference_month("2024-02").unwrap();
    assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

    let (_, december_end) = parse_reference_month("2025-12").unwrap();
    assert_eq!(december_end, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());

    for input in ["2025-13", "2025-1", "25-01", "2025/01", ""] {
        assert!(parse_reference_month(input).unwrap_err().is_validation(), "'{}'", input);
    }

    assert_eq!(reference_month_of(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()), "2025-03");
}

#[test]
fn test_dates_and_text() {
    assert!(parse_date("reference_date", "2025-01-15").is_ok());
    assert!(parse_date("reference_date", "15/01/2025").unwrap_err().is_validation());

    let jan = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let feb = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
    assert!(validate_date_range(jan, feb).is_ok());
    assert!(validate_date_range(jan, jan).is_ok());
    assert!(validate_date_range(feb, jan).unwrap_err().is_validation());

    assert_eq!(require_non_blank("reason", "  late rent ").unwrap(), "late rent");
    assert!(require_non_blank("reason", " \t").unwrap_err().is_validation());
}
