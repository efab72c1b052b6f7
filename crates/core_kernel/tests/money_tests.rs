//! Unit tests for the Money module

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::EUR);
        assert!(m.is_zero());
        assert!(!m.is_negative());
        assert_eq!(m.currency(), Currency::EUR);
    }

    #[test]
    fn test_negative_detection() {
        assert!(Money::new(dec!(-1), Currency::USD).is_negative());
        assert!(!Money::new(dec!(1), Currency::USD).is_negative());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_multiply_by_days() {
        let daily = Money::new(dec!(80), Currency::USD);
        assert_eq!((daily * dec!(16)).amount(), dec!(1280));
    }

    #[test]
    fn test_add_same_currency() {
        let a = Money::new(dec!(320), Currency::USD);
        let b = Money::new(dec!(960), Currency::USD);
        assert_eq!((a + b).amount(), dec!(1280));
    }

    #[test]
    fn test_checked_sum_rejects_mixed_currencies() {
        let items = [
            Money::new(dec!(1), Currency::USD),
            Money::new(dec!(1), Currency::GBP),
        ];
        assert!(matches!(
            Money::checked_sum(&items, Currency::USD),
            Err(MoneyError::CurrencyMismatch(_, _))
        ));
    }

    #[test]
    fn test_round_to_currency() {
        let m = Money::new(dec!(10.005), Currency::USD).round_to_currency();
        assert_eq!(m.amount(), dec!(10.00));
        let yen = Money::new(dec!(10.5), Currency::JPY).round_to_currency();
        assert_eq!(yen.amount(), dec!(10));
    }
}

mod currency {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for c in [Currency::USD, Currency::EUR, Currency::GBP, Currency::JPY, Currency::SGD, Currency::CNY] {
            assert_eq!(c.code().parse::<Currency>().unwrap(), c);
        }
    }

    #[test]
    fn test_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Currency::USD).unwrap(), "\"USD\"");
    }
}
