//! PostgreSQL adapter tests
//!
//! Each test starts its own container; run with `cargo test -- --ignored`
//! on a machine with docker.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{Currency, HealthCheckable, InvoiceId, Money};
use domain_demurrage::audit::INVOICE_RESOURCE;
use domain_demurrage::{
    issue_invoice, Customer, CustomerLookup, DemurrageError, DemurragePort, FixedClock,
    GenerationRequest, InvoiceChanges, InvoiceGenerator, InvoiceStatus, NewInvoice,
};
use infra_db::{DatabaseError, PostgresDemurrageAdapter};
use test_utils::{
    assert_err_variant, assert_single_open_invoice, assert_skipped_with, assert_summary_consistent,
    BillOfLadingBuilder, ContainerFixtures, CustomerFixtures, DateFixtures, TestDatabase,
};

struct Fixture {
    _db: TestDatabase,
    adapter: Arc<PostgresDemurrageAdapter>,
    customer: Customer,
}

async fn fixture() -> Fixture {
    let db = TestDatabase::new().await.expect("Failed to start test database");
    let adapter = Arc::new(PostgresDemurrageAdapter::new(db.pool().clone()));
    let customer = adapter.create_customer(CustomerFixtures::alpha()).await.unwrap();
    Fixture {
        _db: db,
        adapter,
        customer,
    }
}

impl Fixture {
    fn generator(&self, today: NaiveDate) -> InvoiceGenerator {
        InvoiceGenerator::new(self.adapter.clone(), Arc::new(FixedClock(today)))
    }

    async fn add_due_bill(&self, bl_number: &str, builder: BillOfLadingBuilder) {
        self.adapter
            .create_bill_of_lading(
                builder
                    .with_bl_number(bl_number)
                    .for_customer(self.customer.id)
                    .build_valid(),
            )
            .await
            .unwrap();
    }

    fn request(&self) -> GenerationRequest {
        GenerationRequest::new(CustomerLookup::Code(self.customer.code.clone())).on(DateFixtures::due_date())
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_health_check() {
    let f = fixture().await;
    assert!(f.adapter.health_check().await.is_healthy());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_generation_run_creates_invoice_and_audit_entry() {
    let f = fixture().await;
    f.add_due_bill(
        "BL_PG_MIXED",
        BillOfLadingBuilder::new().with_containers(ContainerFixtures::mixed_four()),
    )
    .await;
    f.add_due_bill("BL_PG_EMPTY", BillOfLadingBuilder::new().without_containers())
        .await;

    let summary = f
        .generator(DateFixtures::four_days_later())
        .generate(f.request())
        .await
        .unwrap();

    assert_summary_consistent(&summary);
    assert_eq!(summary.created_count, 1);
    assert_eq!(summary.total_amount, dec!(1280));
    assert_skipped_with(&summary, "BL_PG_EMPTY", "Bill of lading currently have zero containers");

    let invoice = &summary.created[0];
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.currency, Currency::USD);
    assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2026, 1, 30).unwrap());

    let audit = f
        .adapter
        .audit_entries_for(INVOICE_RESOURCE, invoice.id.value())
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].metadata["bl_number"], "BL_PG_MIXED");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_second_run_skips_invoiced_bill() {
    let f = fixture().await;
    f.add_due_bill("BL_PG_TWICE", BillOfLadingBuilder::new()).await;
    let generator = f.generator(DateFixtures::four_days_later());

    let first = generator.generate(f.request()).await.unwrap();
    let second = generator.generate(f.request()).await.unwrap();

    assert_eq!(first.created_count, 1);
    assert_eq!(second.created_count, 0);
    assert_skipped_with(&second, "BL_PG_TWICE", "Open invoice already exists");

    let invoices = f
        .adapter
        .invoices_for_bill_of_lading(&first.created[0].bl_number)
        .await
        .unwrap();
    assert_eq!(invoices.len(), 1);
    assert_single_open_invoice(&invoices, &first.created[0].bl_number);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_unique_index_rejects_second_open_invoice() {
    let f = fixture().await;
    f.add_due_bill("BL_PG_UNIQUE", BillOfLadingBuilder::new()).await;
    let invoice = || {
        NewInvoice::new(
            f.customer.id,
            "BL_PG_UNIQUE".parse().unwrap(),
            Money::new(dec!(80), Currency::USD),
        )
        .with_due_date(DateFixtures::four_days_later())
    };

    issue_invoice(f.adapter.as_ref(), invoice()).await.unwrap();
    let result = issue_invoice(f.adapter.as_ref(), invoice()).await;

    assert_err_variant!(result, DemurrageError::Validation(_));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "requires docker"]
async fn test_concurrent_runs_create_one_invoice_per_bill() {
    let f = fixture().await;
    let bl_numbers: Vec<String> = (1..=5).map(|n| format!("BL_PG_RACE_{}", n)).collect();
    for bl_number in &bl_numbers {
        f.add_due_bill(bl_number, BillOfLadingBuilder::new()).await;
    }
    let first = f.generator(DateFixtures::four_days_later());
    let second = f.generator(DateFixtures::four_days_later());

    let (a, b) = tokio::join!(first.generate(f.request()), second.generate(f.request()));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_summary_consistent(&a);
    assert_summary_consistent(&b);
    assert_eq!(a.created_count + b.created_count, bl_numbers.len());
    for bl_number in &bl_numbers {
        let invoices = f
            .adapter
            .invoices_for_bill_of_lading(&bl_number.parse().unwrap())
            .await
            .unwrap();
        assert_eq!(invoices.len(), 1, "{}", bl_number);
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_overdue_candidates_are_stable_across_calls() {
    let f = fixture().await;
    for bl_number in ["BL_PG_C", "BL_PG_A", "BL_PG_B"] {
        f.add_due_bill(bl_number, BillOfLadingBuilder::new()).await;
    }
    f.add_due_bill(
        "BL_PG_DECOY",
        BillOfLadingBuilder::new().arriving(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()),
    )
    .await;

    let first = f
        .adapter
        .became_overdue_on(f.customer.id, DateFixtures::due_date())
        .await
        .unwrap();
    let second = f
        .adapter
        .became_overdue_on(f.customer.id, DateFixtures::due_date())
        .await
        .unwrap();

    let numbers: Vec<&str> = first.iter().map(|b| b.bl_number.as_str()).collect();
    assert_eq!(numbers, vec!["BL_PG_C", "BL_PG_A", "BL_PG_B"]);
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_amount_beyond_column_width_is_a_rejection() {
    let f = fixture().await;
    f.add_due_bill("BL_PG_HUGE", BillOfLadingBuilder::new()).await;
    let invoice = NewInvoice::new(
        f.customer.id,
        "BL_PG_HUGE".parse().unwrap(),
        Money::new(dec!(10000000000000), Currency::USD),
    )
    .with_due_date(DateFixtures::four_days_later());

    let mut tx = f.adapter.begin().await.unwrap();
    let err = tx.insert_invoice(&invoice).await.unwrap_err();
    tx.rollback().await.unwrap();

    assert!(err.is_record_rejection(), "{:?}", err);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_closed_invoice_frees_the_bill() {
    let f = fixture().await;
    f.add_due_bill("BL_PG_PAID", BillOfLadingBuilder::new()).await;
    let generator = f.generator(DateFixtures::four_days_later());

    let first = generator.generate(f.request()).await.unwrap();
    f.adapter
        .update_invoice(
            first.created[0].id,
            InvoiceChanges {
                status: Some(InvoiceStatus::Paid),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let second = generator.generate(f.request()).await.unwrap();
    assert_eq!(second.created_count, 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_amount_is_write_once() {
    let f = fixture().await;
    f.add_due_bill("BL_PG_AMOUNT", BillOfLadingBuilder::new()).await;
    let summary = f
        .generator(DateFixtures::four_days_later())
        .generate(f.request())
        .await
        .unwrap();
    let id = summary.created[0].id;

    let through_port = f
        .adapter
        .update_invoice(
            id,
            InvoiceChanges {
                amount: Some(dec!(1)),
                ..Default::default()
            },
        )
        .await;
    assert!(through_port.is_err());

    let raw = sqlx::query("UPDATE invoices SET amount = amount + 1 WHERE id = $1")
        .bind(id.value())
        .execute(f.adapter.pool())
        .await
        .map_err(DatabaseError::from);
    assert_err_variant!(raw, DatabaseError::ConstraintViolation(_));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_overdue_listing_orders_by_due_date() {
    let f = fixture().await;
    for (bl_number, due) in [("BL_PG_LATE", 20), ("BL_PG_EARLY", 5), ("BL_PG_TODAY", 25)] {
        f.add_due_bill(bl_number, BillOfLadingBuilder::new()).await;
        let invoice = NewInvoice::new(
            f.customer.id,
            bl_number.parse().unwrap(),
            Money::new(dec!(80), Currency::USD),
        )
        .with_due_date(NaiveDate::from_ymd_opt(2026, 2, due).unwrap());
        issue_invoice(f.adapter.as_ref(), invoice).await.unwrap();
    }

    let overdue = f
        .adapter
        .overdue_invoices(f.customer.id, NaiveDate::from_ymd_opt(2026, 2, 25).unwrap())
        .await
        .unwrap();

    let numbers: Vec<&str> = overdue.iter().map(|i| i.bl_number.as_str()).collect();
    assert_eq!(numbers, vec!["BL_PG_EARLY", "BL_PG_LATE"]);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_customer_lookups() {
    let f = fixture().await;

    let by_token = f
        .adapter
        .find_customer(&CustomerLookup::ApiToken(f.customer.api_token.as_str().to_string()))
        .await
        .unwrap();
    let by_id = f
        .adapter
        .find_customer(&CustomerLookup::Id(f.customer.id))
        .await
        .unwrap();

    assert_eq!(by_token.map(|c| c.code), Some("CUST001".to_string()));
    assert_eq!(by_id.map(|c| c.payment_terms_days), Some(15));
    assert!(f
        .adapter
        .find_invoice(f.customer.id, InvoiceId::new(999))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_duplicate_customer_code_conflicts() {
    let f = fixture().await;
    let err = f
        .adapter
        .create_customer(CustomerFixtures::alpha())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Code has already been taken"));
}
