//! Pre-built Test Fixtures
//!
//! Consistent, predictable data for tests. Dates follow one worked example: a
//! shipment arriving on 2026-01-01 with ten days of free time is due on
//! 2026-01-11, and four days later owes four days of demurrage.

use chrono::NaiveDate;
use domain_demurrage::{ContainerCounts, NewCustomer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for calendar dates
pub struct DateFixtures;

impl DateFixtures {
    /// Arrival of the reference shipment
    pub fn arrival() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    /// Free time of the reference shipment
    pub fn free_time_days() -> u32 {
        10
    }

    /// Day the reference shipment becomes overdue
    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 11).unwrap()
    }

    /// Four days after the due date
    pub fn four_days_later() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    /// One day after the due date, the "today" of a default batch run
    pub fn day_after_due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 12).unwrap()
    }
}

/// Fixture for container mixes
pub struct ContainerFixtures;

impl ContainerFixtures {
    /// One 20ft, two 40ft and one 45ft container
    pub fn mixed_four() -> ContainerCounts {
        ContainerCounts {
            twenty_ft: 1,
            forty_ft: 2,
            forty_five_ft: 1,
            ..Default::default()
        }
    }

    pub fn single_twenty_ft() -> ContainerCounts {
        ContainerCounts {
            twenty_ft: 1,
            ..Default::default()
        }
    }

    pub fn empty() -> ContainerCounts {
        ContainerCounts::default()
    }

    /// Demurrage of [`Self::mixed_four`] after four overdue days
    pub fn mixed_four_amount_after_four_days() -> Decimal {
        dec!(1280)
    }
}

/// Fixture for the sample customers
pub struct CustomerFixtures;

impl CustomerFixtures {
    pub fn alpha() -> NewCustomer {
        NewCustomer::new("Alpha Trading Co.", "CUST001").with_payment_terms(15)
    }

    pub fn beta() -> NewCustomer {
        NewCustomer::new("Beta Import Ltd.", "CUST002").with_payment_terms(30)
    }

    pub fn gamma() -> NewCustomer {
        NewCustomer::new("Gamma Exports Inc.", "CUST003").with_payment_terms(10)
    }
}
