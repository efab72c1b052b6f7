//! Custom Test Assertions
//!
//! Assertion helpers for generation summaries and invoices that give more
//! meaningful failure messages than plain `assert!`.

use core_kernel::BlNumber;
use domain_demurrage::{GenerationSummary, Invoice};
use rust_decimal::Decimal;

/// Asserts the counters and total of a summary agree with its lists
///
/// # Panics
///
/// Panics if a count differs from its list length or the total differs from
/// the sum of created amounts
pub fn assert_summary_consistent(summary: &GenerationSummary) {
    assert_eq!(
        summary.created_count,
        summary.created.len(),
        "created_count {} does not match {} created invoices",
        summary.created_count,
        summary.created.len()
    );
    assert_eq!(
        summary.skipped_count,
        summary.skipped.len(),
        "skipped_count {} does not match {} skipped bills",
        summary.skipped_count,
        summary.skipped.len()
    );

    let sum: Decimal = summary.created.iter().map(|invoice| invoice.amount).sum();
    assert_eq!(
        summary.total_amount, sum,
        "total_amount {} is not the sum of created amounts {}",
        summary.total_amount, sum
    );
}

/// Asserts a summary skipped `bl_number` with exactly `reason`
pub fn assert_skipped_with(summary: &GenerationSummary, bl_number: &str, reason: &str) {
    let skipped = summary
        .skipped
        .iter()
        .find(|s| s.bl_number.as_str() == bl_number)
        .unwrap_or_else(|| panic!("{} was not skipped; skipped: {:?}", bl_number, summary.skipped));
    assert_eq!(
        skipped.reason, reason,
        "{} skipped for '{}', expected '{}'",
        bl_number, skipped.reason, reason
    );
}

/// Asserts at most one open invoice exists for `bl_number` among `invoices`
pub fn assert_single_open_invoice(invoices: &[Invoice], bl_number: &BlNumber) {
    let open = invoices
        .iter()
        .filter(|invoice| &invoice.bl_number == bl_number && invoice.is_open())
        .count();
    assert!(
        open <= 1,
        "{} has {} open invoices, at most one allowed",
        bl_number,
        open
    );
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that a result is Err and returns the error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!("Expected Err matching {}, got Ok({:?})", stringify!($pattern), value),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}
