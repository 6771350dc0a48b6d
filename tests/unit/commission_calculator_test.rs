// Commission value computation and net settlement arithmetic
//
// Property-based checks for PERCENTUAL bounds and rounding, plus the
// FIXO and net formulas.

use barber_commission::core::money::round_money;
use barber_commission::modules::commissions::CommissionCalculator;
use barber_commission::modules::rules::CommissionType;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Monetary value in centavos, up to R$ 100,000.00
fn money() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Percentage with up to two decimal places in [0, 100]
fn percentage() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|basis| Decimal::new(basis, 2))
}

#[test]
fn test_percentual_known_values() {
    let cases = [
        (dec!(200.00), dec!(50), dec!(100.00)),
        (dec!(45.00), dec!(40), dec!(18.00)),
        (dec!(33.33), dec!(33.33), dec!(11.11)),
        (dec!(0.05), dec!(10), dec!(0.01)),
        (dec!(120.00), dec!(0), dec!(0.00)),
    ];

    for (base, rate, expected) in cases {
        let value = CommissionCalculator::commission_value(base, rate, CommissionType::Percentual)
            .expect("Failed to compute commission");
        assert_eq!(value, expected, "{} at {}%", base, rate);
    }
}

#[test]
fn test_fixed_value_ignores_base() {
    for base in [dec!(0), dec!(15.00), dec!(999.99)] {
        let value = CommissionCalculator::commission_value(base, dec!(12.50), CommissionType::Fixo)
            .expect("Failed to compute commission");
        assert_eq!(value, dec!(12.50));
    }
}

#[test]
fn test_rate_bounds() {
    let over = CommissionCalculator::commission_value(dec!(100), dec!(100.01), CommissionType::Percentual);
    assert!(over.unwrap_err().is_validation());

    let negative = CommissionCalculator::commission_value(dec!(100), dec!(-1), CommissionType::Percentual);
    assert!(negative.unwrap_err().is_validation());

    let full = CommissionCalculator::commission_value(dec!(80.00), dec!(100), CommissionType::Percentual)
        .expect("100% is a legal rate");
    assert_eq!(full, dec!(80.00));
}

#[test]
fn test_net_amount() {
    assert_eq!(CommissionCalculator::net_amount(dec!(100.00), dec!(80.00), dec!(0)).unwrap(), dec!(20.00));
    assert_eq!(CommissionCalculator::net_amount(dec!(100.00), dec!(150.00), dec!(10.00)).unwrap(), dec!(-40.00));
    assert_eq!(CommissionCalculator::net_amount(dec!(0), dec!(0), dec!(-5.00)).unwrap(), dec!(-5.00));
}

#[test]
fn test_out_of_range_arithmetic_is_an_error() {
    let huge = CommissionCalculator::commission_value(Decimal::MAX, dec!(50), CommissionType::Percentual);
    assert!(huge.unwrap_err().is_validation());

    let net = CommissionCalculator::net_amount(Decimal::MAX, Decimal::MIN, Decimal::ZERO);
    assert!(net.unwrap_err().is_validation());
}

proptest! {
    #[test]
    fn prop_percentual_within_base(base in money(), rate in percentage()) {
        let value = CommissionCalculator::commission_value(base, rate, CommissionType::Percentual).unwrap();

        prop_assert!(value >= Decimal::ZERO);
        prop_assert!(value <= base);
        prop_assert!(value.scale() <= 2);
    }

    #[test]
    fn prop_percentual_matches_rounded_product(base in money(), rate in percentage()) {
        let value = CommissionCalculator::commission_value(base, rate, CommissionType::Percentual).unwrap();
        let exact = base * rate / Decimal::ONE_HUNDRED;

        prop_assert_eq!(value, round_money(exact));
        prop_assert!((value - exact).abs() <= dec!(0.005));
    }

    #[test]
    fn prop_percentual_monotonic_in_rate(base in money(), low in percentage(), high in percentage()) {
        prop_assume!(low <= high);
        let a = CommissionCalculator::commission_value(base, low, CommissionType::Percentual).unwrap();
        let b = CommissionCalculator::commission_value(base, high, CommissionType::Percentual).unwrap();

        prop_assert!(a <= b);
    }

    #[test]
    fn prop_net_identity(commission in money(), advances in money(), adjustments in money()) {
        let net = CommissionCalculator::net_amount(commission, advances, adjustments).unwrap();
        prop_assert_eq!(net + advances - adjustments, commission);
    }
}
