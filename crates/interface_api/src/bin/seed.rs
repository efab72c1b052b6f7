//! Development seed data
//!
//! Creates three sample customers with bills of lading and invoices around
//! today's date, then prints each customer's API token and an admin JWT.
//! Running it twice leaves existing rows untouched.
//!
//! ```bash
//! DEMURRAGE_DATABASE_URL=postgres://... cargo run --bin demurrage-seed
//! ```

use std::sync::Arc;

use anyhow::Context;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use core_kernel::{BlNumber, Currency, CustomerId, Money, PortError};
use domain_demurrage::{
    issue_invoice, Clock, ContainerCounts, Customer, CustomerLookup, DemurragePort, InvoiceStatus,
    NewCustomer, NewInvoice, SystemClock, ValidBillOfLading,
};
use infra_db::{create_pool_from_url, run_migrations, PostgresDemurrageAdapter};
use interface_api::auth::{create_token, permissions};
use interface_api::config::ApiConfig;

struct SeedBill {
    bl_number: &'static str,
    arrival_days_ago: i64,
    free_time_days: u32,
    twenty_ft: u32,
    forty_ft: u32,
    invoice: Option<SeedInvoice>,
}

struct SeedInvoice {
    amount: i64,
    due_in_days: i64,
    status: InvoiceStatus,
}

const fn bill(
    bl_number: &'static str,
    arrival_days_ago: i64,
    free_time_days: u32,
    twenty_ft: u32,
    forty_ft: u32,
    invoice: Option<SeedInvoice>,
) -> SeedBill {
    SeedBill {
        bl_number,
        arrival_days_ago,
        free_time_days,
        twenty_ft,
        forty_ft,
        invoice,
    }
}

const fn invoice(amount: i64, due_in_days: i64, status: InvoiceStatus) -> Option<SeedInvoice> {
    Some(SeedInvoice {
        amount,
        due_in_days,
        status,
    })
}

fn seed_plan() -> Vec<(NewCustomer, Vec<SeedBill>)> {
    vec![
        (
            NewCustomer::new("Alpha Trading Co.", "CUST001").with_payment_terms(15),
            vec![
                bill("BL_C1_OVERDUE_2W", 14, 5, 2, 1, invoice(5000, -14, InvoiceStatus::Draft)),
                bill("BL_C1_OVERDUE_1D", 1, 0, 1, 2, invoice(3500, -1, InvoiceStatus::Paid)),
                bill("BL_C1_DUE_2W", 0, 14, 3, 0, invoice(2800, 14, InvoiceStatus::Draft)),
            ],
        ),
        (
            NewCustomer::new("Beta Import Ltd.", "CUST002").with_payment_terms(30),
            vec![
                bill("BL_C2_OVERDUE_2W", 14, 3, 4, 2, invoice(7200, -14, InvoiceStatus::Draft)),
                bill("BL_C2_OVERDUE_1D", 1, 0, 2, 3, invoice(6100, -1, InvoiceStatus::Draft)),
                bill("BL_C2_DUE_2W", 0, 30, 1, 1, invoice(4500, 14, InvoiceStatus::Draft)),
            ],
        ),
        (
            NewCustomer::new("Gamma Exports Inc.", "CUST003").with_payment_terms(10),
            vec![bill("BL_C3_OVERDUE_1D", 1, 0, 1, 2, None)],
        ),
    ]
}

fn shift(today: NaiveDate, days: i64) -> anyhow::Result<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    let date = if days < 0 {
        today.checked_sub_days(magnitude)
    } else {
        today.checked_add_days(magnitude)
    };
    date.context("date out of range")
}

async fn ensure_customer(port: &dyn DemurragePort, customer: NewCustomer) -> anyhow::Result<Customer> {
    if let Some(existing) = port.find_customer(&CustomerLookup::Code(customer.code.clone())).await? {
        return Ok(existing);
    }
    Ok(port.create_customer(customer).await?)
}

async fn ensure_bill(
    port: &dyn DemurragePort,
    customer_id: CustomerId,
    seed: &SeedBill,
    today: NaiveDate,
) -> anyhow::Result<BlNumber> {
    let bl_number = BlNumber::parse(seed.bl_number)?;
    let bill = ValidBillOfLading {
        bl_number: bl_number.clone(),
        customer_id,
        arrival_date: shift(today, -seed.arrival_days_ago)?,
        free_time_days: seed.free_time_days,
        containers: ContainerCounts {
            twenty_ft: seed.twenty_ft,
            forty_ft: seed.forty_ft,
            ..Default::default()
        },
    };

    match port.create_bill_of_lading(bill).await {
        Ok(_) | Err(PortError::Conflict { .. }) => Ok(bl_number),
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let pool = create_pool_from_url(&config.database_url)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool).await?;

    let port: Arc<dyn DemurragePort> = Arc::new(PostgresDemurrageAdapter::new(pool));
    let today = SystemClock::new(config.timezone()?).today();

    let mut customers = Vec::new();
    for (new_customer, bills) in seed_plan() {
        let customer = ensure_customer(port.as_ref(), new_customer).await?;

        for seed in &bills {
            let bl_number = ensure_bill(port.as_ref(), customer.id, seed, today).await?;

            let Some(planned) = &seed.invoice else { continue };
            if !port.invoices_for_bill_of_lading(&bl_number).await?.is_empty() {
                continue;
            }
            let invoice = NewInvoice::new(
                customer.id,
                bl_number,
                Money::new(Decimal::from(planned.amount), Currency::USD),
            )
            .with_status(planned.status)
            .with_due_date(shift(today, planned.due_in_days)?);
            issue_invoice(port.as_ref(), invoice).await?;
        }

        customers.push(customer);
    }

    tracing::info!(customers = customers.len(), "Development data seeded");

    println!("{}", "=".repeat(50));
    println!("CUSTOMER API TOKENS");
    println!("{}", "=".repeat(50));
    for customer in &customers {
        println!("{} ({}): {}", customer.name, customer.code, customer.api_token.as_str());
    }

    let admin_token = create_token(
        "seed-admin",
        vec![permissions::ADMIN.to_string()],
        &config.jwt_secret,
        config.jwt_expiration_secs,
    )?;
    println!("\n{}", "=".repeat(50));
    println!("ADMIN TOKEN");
    println!("{}", "=".repeat(50));
    println!("Authorization: Bearer {}", admin_token);

    Ok(())
}
