//! Customer repository implementation

use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool};

use core_kernel::CustomerId;
use domain_demurrage::{ApiToken, Customer};

use crate::error::DatabaseError;

const CUSTOMER_COLUMNS: &str = "id, name, code, payment_terms_days, api_token, created_at";

/// Repository for customer accounts
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CustomerRow>, DatabaseError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<CustomerRow>, DatabaseError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE code = $1");
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_api_token(&self, token: &str) -> Result<Option<CustomerRow>, DatabaseError> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE api_token = $1");
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Inserts a customer; a taken code or token surfaces as `DuplicateEntry`
    pub async fn create(&self, customer: NewCustomerRow) -> Result<CustomerRow, DatabaseError> {
        Self::insert(&self.pool, customer).await
    }

    pub async fn insert<'e, E>(executor: E, customer: NewCustomerRow) -> Result<CustomerRow, DatabaseError>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO customers (name, code, payment_terms_days, api_token) \
             VALUES ($1, $2, $3, $4) RETURNING {CUSTOMER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(customer.name)
            .bind(customer.code)
            .bind(customer.payment_terms_days)
            .bind(customer.api_token)
            .fetch_one(executor)
            .await?;
        Ok(row)
    }
}

/// Database row for a customer
#[derive(Debug, Clone, FromRow)]
pub struct CustomerRow {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub payment_terms_days: i32,
    pub api_token: String,
    pub created_at: DateTime<Utc>,
}

impl CustomerRow {
    pub fn into_domain(self) -> Result<Customer, DatabaseError> {
        let payment_terms_days = u32::try_from(self.payment_terms_days).map_err(|_| {
            DatabaseError::SerializationError(format!(
                "customer {} has negative payment terms {}",
                self.id, self.payment_terms_days
            ))
        })?;

        Ok(Customer {
            id: CustomerId::new(self.id),
            name: self.name,
            code: self.code,
            payment_terms_days,
            api_token: ApiToken::new(self.api_token),
            created_at: self.created_at,
        })
    }
}

/// Insert payload for a customer
#[derive(Debug, Clone)]
pub struct NewCustomerRow {
    pub name: String,
    pub code: String,
    pub payment_terms_days: i32,
    pub api_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(terms: i32) -> CustomerRow {
        CustomerRow {
            id: 1,
            name: "Alpha Trading Co.".into(),
            code: "CUST001".into(),
            payment_terms_days: terms,
            api_token: "token_abc".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_into_domain() {
        let customer = row(15).into_domain().unwrap();
        assert_eq!(customer.id, CustomerId::new(1));
        assert_eq!(customer.payment_terms_days, 15);
        assert_eq!(customer.api_token.as_str(), "token_abc");
    }

    #[test]
    fn test_negative_terms_rejected() {
        assert!(matches!(
            row(-1).into_domain(),
            Err(DatabaseError::SerializationError(_))
        ));
    }
}
