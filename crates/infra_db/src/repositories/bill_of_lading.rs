//! Bill of lading repository implementation
//!
//! The due date is never stored; queries compute it as `arrival_date + freetime`
//! (DATE + INTEGER days), which an expression index covers.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool};

use core_kernel::{BillOfLadingId, BlNumber, CustomerId};
use domain_demurrage::{BillOfLading, ContainerCounts};

use crate::error::DatabaseError;

const BILL_OF_LADING_COLUMNS: &str = "id, customer_id, bl_number, arrival_date, freetime, \
     number_of_20ft_containers, number_of_40ft_containers, number_of_40ft_high_cube_containers, \
     number_of_45ft_containers, number_of_reefer_containers, number_of_other_containers, created_at";

/// Repository for bills of lading
#[derive(Debug, Clone)]
pub struct BillOfLadingRepository {
    pool: PgPool,
}

impl BillOfLadingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a bill of lading; a taken `bl_number` surfaces as `DuplicateEntry`
    pub async fn create(&self, bill: NewBillOfLadingRow) -> Result<BillOfLadingRow, DatabaseError> {
        let sql = format!(
            "INSERT INTO bill_of_ladings (customer_id, bl_number, arrival_date, freetime, \
             number_of_20ft_containers, number_of_40ft_containers, number_of_40ft_high_cube_containers, \
             number_of_45ft_containers, number_of_reefer_containers, number_of_other_containers) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {BILL_OF_LADING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BillOfLadingRow>(&sql)
            .bind(bill.customer_id)
            .bind(bill.bl_number)
            .bind(bill.arrival_date)
            .bind(bill.freetime)
            .bind(bill.containers[0])
            .bind(bill.containers[1])
            .bind(bill.containers[2])
            .bind(bill.containers[3])
            .bind(bill.containers[4])
            .bind(bill.containers[5])
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_bl_number(&self, bl_number: &str) -> Result<Option<BillOfLadingRow>, DatabaseError> {
        let sql = format!("SELECT {BILL_OF_LADING_COLUMNS} FROM bill_of_ladings WHERE bl_number = $1");
        let row = sqlx::query_as::<_, BillOfLadingRow>(&sql)
            .bind(bl_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn became_overdue_on(
        &self,
        customer_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<BillOfLadingRow>, DatabaseError> {
        Self::select_overdue_on(&self.pool, customer_id, date, false).await
    }

    /// Bills of lading of `customer_id` due exactly on `date`, ordered by id
    ///
    /// With `lock`, the rows are selected `FOR UPDATE` and stay locked until
    /// the surrounding transaction ends.
    pub async fn select_overdue_on<'e, E>(
        executor: E,
        customer_id: i64,
        date: NaiveDate,
        lock: bool,
    ) -> Result<Vec<BillOfLadingRow>, DatabaseError>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "SELECT {BILL_OF_LADING_COLUMNS} FROM bill_of_ladings \
             WHERE customer_id = $1 AND arrival_date + freetime = $2 \
             ORDER BY id{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        let rows = sqlx::query_as::<_, BillOfLadingRow>(&sql)
            .bind(customer_id)
            .bind(date)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }
}

/// Database row for a bill of lading
#[derive(Debug, Clone, FromRow)]
pub struct BillOfLadingRow {
    pub id: i64,
    pub customer_id: i64,
    pub bl_number: String,
    pub arrival_date: NaiveDate,
    pub freetime: i32,
    pub number_of_20ft_containers: i32,
    pub number_of_40ft_containers: i32,
    pub number_of_40ft_high_cube_containers: i32,
    pub number_of_45ft_containers: i32,
    pub number_of_reefer_containers: i32,
    pub number_of_other_containers: i32,
    pub created_at: DateTime<Utc>,
}

impl BillOfLadingRow {
    pub fn into_domain(self) -> Result<BillOfLading, DatabaseError> {
        let bl_number = BlNumber::parse(self.bl_number)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        Ok(BillOfLading {
            id: BillOfLadingId::new(self.id),
            customer_id: CustomerId::new(self.customer_id),
            arrival_date: self.arrival_date,
            free_time_days: unsigned("freetime", self.freetime)?,
            containers: ContainerCounts {
                twenty_ft: unsigned("number_of_20ft_containers", self.number_of_20ft_containers)?,
                forty_ft: unsigned("number_of_40ft_containers", self.number_of_40ft_containers)?,
                forty_ft_high_cube: unsigned(
                    "number_of_40ft_high_cube_containers",
                    self.number_of_40ft_high_cube_containers,
                )?,
                forty_five_ft: unsigned("number_of_45ft_containers", self.number_of_45ft_containers)?,
                reefer: unsigned("number_of_reefer_containers", self.number_of_reefer_containers)?,
                other: unsigned("number_of_other_containers", self.number_of_other_containers)?,
            },
            bl_number,
            created_at: self.created_at,
        })
    }
}

fn unsigned(column: &str, value: i32) -> Result<u32, DatabaseError> {
    u32::try_from(value)
        .map_err(|_| DatabaseError::SerializationError(format!("{} is negative: {}", column, value)))
}

/// Insert payload for a bill of lading
///
/// `containers` follows the column order of [`domain_demurrage::ContainerType::ALL`].
#[derive(Debug, Clone)]
pub struct NewBillOfLadingRow {
    pub customer_id: i64,
    pub bl_number: String,
    pub arrival_date: NaiveDate,
    pub freetime: i32,
    pub containers: [i32; 6],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> BillOfLadingRow {
        BillOfLadingRow {
            id: 7,
            customer_id: 1,
            bl_number: "BL_C1_OVERDUE_2W".into(),
            arrival_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            freetime: 10,
            number_of_20ft_containers: 1,
            number_of_40ft_containers: 2,
            number_of_40ft_high_cube_containers: 0,
            number_of_45ft_containers: 1,
            number_of_reefer_containers: 0,
            number_of_other_containers: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_into_domain() {
        let bill = row().into_domain().unwrap();
        assert_eq!(bill.bl_number.as_str(), "BL_C1_OVERDUE_2W");
        assert_eq!(bill.total_containers(), 4);
        assert_eq!(bill.due_date(), NaiveDate::from_ymd_opt(2026, 1, 11).unwrap());
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut bad = row();
        bad.number_of_reefer_containers = -1;
        assert!(matches!(
            bad.into_domain(),
            Err(DatabaseError::SerializationError(_))
        ));
    }
}
