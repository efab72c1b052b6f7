//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults, so tests
//! only specify the fields they care about.

use chrono::{NaiveDate, Utc};
use fake::faker::company::en::CompanyName;
use fake::Fake;
use rust_decimal::Decimal;

use core_kernel::{BillOfLadingId, BlNumber, Currency, CustomerId, InvoiceId};
use domain_demurrage::{
    ApiToken, BillOfLading, ContainerCounts, ContainerType, Customer, Invoice, InvoiceStatus,
    NewBillOfLading, NewCustomer, ValidBillOfLading,
};

use crate::fixtures::{ContainerFixtures, DateFixtures};

/// Builder for customers
pub struct CustomerBuilder {
    id: CustomerId,
    name: String,
    code: String,
    payment_terms_days: u32,
    api_token: ApiToken,
}

impl Default for CustomerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerBuilder {
    /// Creates a builder with a random company name and a generated token
    pub fn new() -> Self {
        Self {
            id: CustomerId::new(1),
            name: CompanyName().fake(),
            code: "CUST001".to_string(),
            payment_terms_days: 15,
            api_token: ApiToken::generate(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = CustomerId::new(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_payment_terms(mut self, days: u32) -> Self {
        self.payment_terms_days = days;
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = ApiToken::new(token);
        self
    }

    /// Builds a stored customer
    pub fn build(self) -> Customer {
        Customer {
            id: self.id,
            name: self.name,
            code: self.code,
            payment_terms_days: self.payment_terms_days,
            api_token: self.api_token,
            created_at: Utc::now(),
        }
    }

    /// Builds a creation request with the same values
    pub fn build_new(self) -> NewCustomer {
        NewCustomer::new(self.name, self.code)
            .with_payment_terms(self.payment_terms_days)
            .with_api_token(self.api_token)
    }
}

/// Builder for bills of lading
pub struct BillOfLadingBuilder {
    id: BillOfLadingId,
    bl_number: BlNumber,
    customer_id: CustomerId,
    arrival_date: NaiveDate,
    free_time_days: u32,
    containers: ContainerCounts,
}

impl Default for BillOfLadingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BillOfLadingBuilder {
    /// Creates a builder for the reference shipment: one 20ft container,
    /// arriving on 2026-01-01 with ten days of free time
    pub fn new() -> Self {
        Self {
            id: BillOfLadingId::new(1),
            bl_number: BlNumber::generate(),
            customer_id: CustomerId::new(1),
            arrival_date: DateFixtures::arrival(),
            free_time_days: DateFixtures::free_time_days(),
            containers: ContainerFixtures::single_twenty_ft(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = BillOfLadingId::new(id);
        self
    }

    /// Sets the bl_number; panics on a blank value
    pub fn with_bl_number(mut self, bl_number: &str) -> Self {
        self.bl_number = BlNumber::parse(bl_number).expect("bl_number must not be blank");
        self
    }

    pub fn for_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn arriving(mut self, date: NaiveDate) -> Self {
        self.arrival_date = date;
        self
    }

    pub fn with_free_time(mut self, days: u32) -> Self {
        self.free_time_days = days;
        self
    }

    pub fn with_containers(mut self, containers: ContainerCounts) -> Self {
        self.containers = containers;
        self
    }

    pub fn with_container(mut self, kind: ContainerType, count: u32) -> Self {
        self.containers = self.containers.with(kind, count);
        self
    }

    pub fn without_containers(self) -> Self {
        self.with_containers(ContainerCounts::default())
    }

    /// Sets arrival and free time so the bill becomes overdue on `date`
    pub fn due_on(self, date: NaiveDate) -> Self {
        let free_time = self.free_time_days;
        let arrival = date
            .checked_sub_days(chrono::Days::new(u64::from(free_time)))
            .expect("due date too early for the free time");
        self.arriving(arrival)
    }

    pub fn build(self) -> BillOfLading {
        BillOfLading {
            id: self.id,
            bl_number: self.bl_number,
            customer_id: self.customer_id,
            arrival_date: self.arrival_date,
            free_time_days: self.free_time_days,
            containers: self.containers,
            created_at: Utc::now(),
        }
    }

    /// Builds a validated creation request for a port
    pub fn build_valid(self) -> ValidBillOfLading {
        ValidBillOfLading {
            bl_number: self.bl_number,
            customer_id: self.customer_id,
            arrival_date: self.arrival_date,
            free_time_days: self.free_time_days,
            containers: self.containers,
        }
    }

    /// Builds a raw intake request
    pub fn build_request(self) -> NewBillOfLading {
        let count = |kind| i64::from(self.containers.get(kind));
        NewBillOfLading {
            bl_number: Some(self.bl_number.as_str().to_string()),
            customer_id: Some(self.customer_id),
            arrival_date: Some(self.arrival_date),
            free_time_days: i64::from(self.free_time_days),
            number_of_20ft_containers: count(ContainerType::TwentyFoot),
            number_of_40ft_containers: count(ContainerType::FortyFoot),
            number_of_40ft_high_cube_containers: count(ContainerType::FortyFootHighCube),
            number_of_45ft_containers: count(ContainerType::FortyFiveFoot),
            number_of_reefer_containers: count(ContainerType::Reefer),
            number_of_other_containers: count(ContainerType::Other),
        }
    }
}

/// Builder for stored invoices
pub struct InvoiceBuilder {
    id: InvoiceId,
    customer_id: CustomerId,
    bl_number: BlNumber,
    amount: Decimal,
    status: InvoiceStatus,
    due_date: NaiveDate,
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceBuilder {
    pub fn new() -> Self {
        Self {
            id: InvoiceId::new(1),
            customer_id: CustomerId::new(1),
            bl_number: BlNumber::generate(),
            amount: ContainerFixtures::mixed_four_amount_after_four_days(),
            status: InvoiceStatus::Draft,
            due_date: DateFixtures::four_days_later(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = InvoiceId::new(id);
        self
    }

    pub fn for_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn for_bill_of_lading(mut self, bl_number: BlNumber) -> Self {
        self.bl_number = bl_number;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = date;
        self
    }

    pub fn build(self) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: self.id,
            customer_id: self.customer_id,
            bl_number: self.bl_number,
            amount: self.amount,
            currency: Currency::USD,
            status: self.status,
            due_date: self.due_date,
            created_at: now,
            updated_at: now,
        }
    }
}
