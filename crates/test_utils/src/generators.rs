//! Property-Based Test Generators
//!
//! Proptest strategies for generating shipments that keep the domain
//! invariants: non-negative container counts and dates within a sane window.

use chrono::{Days, NaiveDate};
use core_kernel::{BillOfLadingId, BlNumber, CustomerId};
use domain_demurrage::{BillOfLading, ContainerCounts};
use proptest::prelude::*;

/// Strategy for a single container count, zero included
pub fn container_count_strategy() -> impl Strategy<Value = u32> {
    0u32..50u32
}

/// Strategy for a full container mix, possibly empty
pub fn container_counts_strategy() -> impl Strategy<Value = ContainerCounts> {
    (
        container_count_strategy(),
        container_count_strategy(),
        container_count_strategy(),
        container_count_strategy(),
        container_count_strategy(),
        container_count_strategy(),
    )
        .prop_map(|(twenty_ft, forty_ft, forty_ft_high_cube, forty_five_ft, reefer, other)| {
            ContainerCounts {
                twenty_ft,
                forty_ft,
                forty_ft_high_cube,
                forty_five_ft,
                reefer,
                other,
            }
        })
}

/// Strategy for a calendar date between 2020 and roughly 2030
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..3650u64).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|base| base.checked_add_days(Days::new(offset)))
            .unwrap_or(NaiveDate::MIN)
    })
}

/// Strategy for free time in days
pub fn free_time_strategy() -> impl Strategy<Value = u32> {
    0u32..60u32
}

/// Strategy for a stored bill of lading belonging to customer 1
pub fn bill_of_lading_strategy() -> impl Strategy<Value = BillOfLading> {
    (1i64..10_000i64, date_strategy(), free_time_strategy(), container_counts_strategy()).prop_map(
        |(id, arrival_date, free_time_days, containers)| BillOfLading {
            id: BillOfLadingId::new(id),
            bl_number: BlNumber::generate(),
            customer_id: CustomerId::new(1),
            arrival_date,
            free_time_days,
            containers,
            created_at: chrono::Utc::now(),
        },
    )
}

/// Strategy for one seeded shipment: its containers, whether it already has an
/// open invoice, and whether it is emptied before the run
pub fn seeded_bill_strategy() -> impl Strategy<Value = (ContainerCounts, bool, bool)> {
    (container_counts_strategy(), any::<bool>(), prop::bool::weighted(0.25)).prop_map(
        |(containers, invoiced, empty)| {
            let containers = if empty { ContainerCounts::default() } else { containers };
            (containers, invoiced, empty)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use core_kernel::{Currency, Money};
    use domain_demurrage::{
        issue_invoice, ContainerType, CustomerLookup, DemurragePort, FixedClock, GenerationRequest,
        GenerationSummary, InMemoryDemurrageStore, InvoiceGenerator, NewCustomer, NewInvoice,
        ValidBillOfLading,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::fixtures::DateFixtures;

    /// Seeds the shipments plus one bill due a day later, runs the generator
    /// for the due date and returns the summary with the candidate count
    async fn run_generation(seeds: &[(ContainerCounts, bool, bool)]) -> (GenerationSummary, usize) {
        let store = InMemoryDemurrageStore::new();
        let customer = store
            .create_customer(NewCustomer::new("Property Shipping", "CUST001"))
            .await
            .unwrap();

        for (index, (containers, invoiced, _)) in seeds.iter().enumerate() {
            let bl_number = BlNumber::parse(format!("BL_PROP_{}", index)).unwrap();
            store
                .create_bill_of_lading(ValidBillOfLading {
                    bl_number: bl_number.clone(),
                    customer_id: customer.id,
                    arrival_date: DateFixtures::arrival(),
                    free_time_days: DateFixtures::free_time_days(),
                    containers: *containers,
                })
                .await
                .unwrap();
            if *invoiced {
                let invoice = NewInvoice::new(customer.id, bl_number, Money::new(dec!(80), Currency::USD))
                    .with_due_date(DateFixtures::four_days_later());
                issue_invoice(&store, invoice).await.unwrap();
            }
        }
        store
            .create_bill_of_lading(ValidBillOfLading {
                bl_number: BlNumber::parse("BL_PROP_LATER").unwrap(),
                customer_id: customer.id,
                arrival_date: DateFixtures::day_after_due(),
                free_time_days: 0,
                containers: ContainerCounts::default().with(ContainerType::TwentyFoot, 1),
            })
            .await
            .unwrap();

        let candidates = store
            .became_overdue_on(customer.id, DateFixtures::due_date())
            .await
            .unwrap()
            .len();
        let generator = InvoiceGenerator::new(
            Arc::new(store.clone()),
            Arc::new(FixedClock(DateFixtures::four_days_later())),
        );
        let summary = generator
            .generate(GenerationRequest::new(CustomerLookup::Code(customer.code)).on(DateFixtures::due_date()))
            .await
            .unwrap();
        (summary, candidates)
    }

    proptest! {
        #[test]
        fn bill_becomes_overdue_only_on_its_due_date(bill in bill_of_lading_strategy(), shift in 1u64..30u64) {
            let due = bill.due_date();
            prop_assert!(bill.became_overdue_on(due));
            prop_assert!(!bill.became_overdue_on(due + Days::new(shift)));
            prop_assert!(!bill.became_overdue_on(due - Days::new(shift)));
        }

        #[test]
        fn amount_is_never_negative(bill in bill_of_lading_strategy(), as_of in date_strategy()) {
            prop_assert!(bill.amount(as_of).amount() >= Decimal::ZERO);
        }

        #[test]
        fn amount_is_zero_on_due_date(bill in bill_of_lading_strategy()) {
            prop_assert!(bill.amount(bill.due_date()).is_zero());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn summary_accounts_for_every_candidate(
            seeds in prop::collection::vec(seeded_bill_strategy(), 1..8)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let (summary, candidates) = runtime.block_on(run_generation(&seeds));

            let created_total: Decimal = summary.created.iter().map(|i| i.amount).sum();
            prop_assert_eq!(summary.total_amount, created_total);
            prop_assert_eq!(summary.created_count, summary.created.len());
            prop_assert_eq!(summary.skipped_count, summary.skipped.len());
            prop_assert_eq!(summary.created_count + summary.skipped_count, candidates);
            prop_assert_eq!(candidates, seeds.len());

            let expected_created = seeds
                .iter()
                .filter(|(containers, invoiced, _)| !invoiced && containers.total() > 0)
                .count();
            prop_assert_eq!(summary.created_count, expected_created);
        }
    }
}
