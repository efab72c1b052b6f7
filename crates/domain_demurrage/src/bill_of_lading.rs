//! Bills of lading and the demurrage amount calculation
//!
//! A bill of lading is read-only to the invoicing core. Its due date, container
//! total and owed amount are derived values computed on calendar dates only, so
//! no time-of-day component can shift a shipment across a day boundary.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{BillOfLadingId, BlNumber, Currency, CustomerId, Money};

use crate::error::DemurrageError;

/// Daily fee charged for each container once free time has elapsed (USD)
pub const RATE_PER_CONTAINER_PER_DAY: Decimal = dec!(80);

/// Currency of [`RATE_PER_CONTAINER_PER_DAY`]
pub const RATE_CURRENCY: Currency = Currency::USD;

/// Container types tracked on a bill of lading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerType {
    /// 20ft dry container
    TwentyFoot,
    /// 40ft dry container
    FortyFoot,
    /// 40ft high cube
    FortyFootHighCube,
    /// 45ft container
    FortyFiveFoot,
    /// Refrigerated container
    Reefer,
    /// Anything else (open top, flat rack, tank...)
    Other,
}

impl ContainerType {
    pub const ALL: [ContainerType; 6] = [
        ContainerType::TwentyFoot,
        ContainerType::FortyFoot,
        ContainerType::FortyFootHighCube,
        ContainerType::FortyFiveFoot,
        ContainerType::Reefer,
        ContainerType::Other,
    ];

    /// Storage column holding the count for this type
    pub fn column(&self) -> &'static str {
        match self {
            ContainerType::TwentyFoot => "number_of_20ft_containers",
            ContainerType::FortyFoot => "number_of_40ft_containers",
            ContainerType::FortyFootHighCube => "number_of_40ft_high_cube_containers",
            ContainerType::FortyFiveFoot => "number_of_45ft_containers",
            ContainerType::Reefer => "number_of_reefer_containers",
            ContainerType::Other => "number_of_other_containers",
        }
    }
}

/// Container counts by type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerCounts {
    pub twenty_ft: u32,
    pub forty_ft: u32,
    pub forty_ft_high_cube: u32,
    pub forty_five_ft: u32,
    pub reefer: u32,
    pub other: u32,
}

impl ContainerCounts {
    /// Returns the count for one container type
    pub fn get(&self, kind: ContainerType) -> u32 {
        match kind {
            ContainerType::TwentyFoot => self.twenty_ft,
            ContainerType::FortyFoot => self.forty_ft,
            ContainerType::FortyFootHighCube => self.forty_ft_high_cube,
            ContainerType::FortyFiveFoot => self.forty_five_ft,
            ContainerType::Reefer => self.reefer,
            ContainerType::Other => self.other,
        }
    }

    /// Sets the count for one container type
    pub fn with(mut self, kind: ContainerType, count: u32) -> Self {
        let slot = match kind {
            ContainerType::TwentyFoot => &mut self.twenty_ft,
            ContainerType::FortyFoot => &mut self.forty_ft,
            ContainerType::FortyFootHighCube => &mut self.forty_ft_high_cube,
            ContainerType::FortyFiveFoot => &mut self.forty_five_ft,
            ContainerType::Reefer => &mut self.reefer,
            ContainerType::Other => &mut self.other,
        };
        *slot = count;
        self
    }

    /// Total number of containers across all types
    pub fn total(&self) -> u64 {
        ContainerType::ALL
            .iter()
            .map(|kind| u64::from(self.get(*kind)))
            .sum()
    }
}

/// A shipment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillOfLading {
    /// Storage identifier
    pub id: BillOfLadingId,
    /// Business identifier, unique across all customers
    pub bl_number: BlNumber,
    /// Owning customer
    pub customer_id: CustomerId,
    /// Day the shipment arrived in port
    pub arrival_date: NaiveDate,
    /// Days of free time before demurrage starts
    pub free_time_days: u32,
    /// Container counts
    pub containers: ContainerCounts,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl BillOfLading {
    /// Day on which free time runs out: `arrival_date + free_time_days`
    pub fn due_date(&self) -> NaiveDate {
        self.arrival_date
            .checked_add_days(Days::new(u64::from(self.free_time_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Sum of the six container counts
    pub fn total_containers(&self) -> u64 {
        self.containers.total()
    }

    /// Whole days past the due date as of `as_of`, never negative
    ///
    /// The due date itself is not overdue.
    pub fn days_overdue(&self, as_of: NaiveDate) -> i64 {
        (as_of - self.due_date()).num_days().max(0)
    }

    /// Demurrage owed as of `as_of`
    pub fn amount(&self, as_of: NaiveDate) -> Money {
        let containers = Decimal::from(self.total_containers());
        let days = Decimal::from(self.days_overdue(as_of));
        Money::new(containers * RATE_PER_CONTAINER_PER_DAY * days, RATE_CURRENCY)
    }

    /// True when the shipment crosses into overdue status exactly on `date`
    pub fn became_overdue_on(&self, date: NaiveDate) -> bool {
        self.due_date() == date
    }
}

/// Filters `bills` down to those whose due date is exactly `date`
///
/// Input order is preserved.
pub fn became_overdue_on<'a, I>(bills: I, date: NaiveDate) -> Vec<BillOfLading>
where
    I: IntoIterator<Item = &'a BillOfLading>,
{
    bills
        .into_iter()
        .filter(|bl| bl.became_overdue_on(date))
        .cloned()
        .collect()
}

/// Intake request for a bill of lading, as received from outside
///
/// Counts are signed so that negative input can be reported instead of
/// silently wrapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBillOfLading {
    pub bl_number: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub free_time_days: i64,
    #[serde(default)]
    pub number_of_20ft_containers: i64,
    #[serde(default)]
    pub number_of_40ft_containers: i64,
    #[serde(default)]
    pub number_of_40ft_high_cube_containers: i64,
    #[serde(default)]
    pub number_of_45ft_containers: i64,
    #[serde(default)]
    pub number_of_reefer_containers: i64,
    #[serde(default)]
    pub number_of_other_containers: i64,
}

/// A bill of lading that passed validation and is ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBillOfLading {
    pub bl_number: BlNumber,
    pub customer_id: CustomerId,
    pub arrival_date: NaiveDate,
    pub free_time_days: u32,
    pub containers: ContainerCounts,
}

impl NewBillOfLading {
    /// Validates the request and fills in a generated bl_number if none was given
    pub fn validate(self) -> Result<ValidBillOfLading, DemurrageError> {
        let bl_number = match self.bl_number {
            Some(raw) => BlNumber::parse(raw)
                .map_err(|_| DemurrageError::validation("Bl number can't be blank"))?,
            None => BlNumber::generate(),
        };
        let customer_id = self
            .customer_id
            .ok_or_else(|| DemurrageError::validation("Customer must exist"))?;
        let arrival_date = self
            .arrival_date
            .ok_or_else(|| DemurrageError::validation("Arrival date can't be blank"))?;

        let free_time_days = non_negative("Freetime", self.free_time_days)?;
        let containers = ContainerCounts {
            twenty_ft: non_negative("Number of 20ft containers", self.number_of_20ft_containers)?,
            forty_ft: non_negative("Number of 40ft containers", self.number_of_40ft_containers)?,
            forty_ft_high_cube: non_negative(
                "Number of 40ft high cube containers",
                self.number_of_40ft_high_cube_containers,
            )?,
            forty_five_ft: non_negative("Number of 45ft containers", self.number_of_45ft_containers)?,
            reefer: non_negative("Number of reefer containers", self.number_of_reefer_containers)?,
            other: non_negative("Number of other containers", self.number_of_other_containers)?,
        };

        Ok(ValidBillOfLading {
            bl_number,
            customer_id,
            arrival_date,
            free_time_days,
            containers,
        })
    }
}

fn non_negative(field: &str, value: i64) -> Result<u32, DemurrageError> {
    u32::try_from(value).map_err(|_| {
        if value < 0 {
            DemurrageError::validation(format!("{} must be greater than or equal to 0", field))
        } else {
            DemurrageError::validation(format!("{} is too large", field))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bill(arrival: NaiveDate, free_time_days: u32, containers: ContainerCounts) -> BillOfLading {
        BillOfLading {
            id: BillOfLadingId::new(1),
            bl_number: BlNumber::generate(),
            customer_id: CustomerId::new(1),
            arrival_date: arrival,
            free_time_days,
            containers,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_due_date_adds_free_time() {
        let bl = bill(date(2026, 1, 1), 10, ContainerCounts::default());
        assert_eq!(bl.due_date(), date(2026, 1, 11));
    }

    #[test]
    fn test_amount_for_four_days_and_four_containers() {
        let containers = ContainerCounts::default()
            .with(ContainerType::TwentyFoot, 1)
            .with(ContainerType::FortyFoot, 2)
            .with(ContainerType::FortyFiveFoot, 1);
        let bl = bill(date(2026, 1, 1), 10, containers);

        assert_eq!(bl.days_overdue(date(2026, 1, 15)), 4);
        assert_eq!(bl.total_containers(), 4);
        assert_eq!(bl.amount(date(2026, 1, 15)).amount(), dec!(1280));
        assert_eq!(bl.amount(date(2026, 1, 15)).currency(), Currency::USD);
    }

    #[test]
    fn test_due_date_itself_is_not_overdue() {
        let bl = bill(date(2026, 1, 1), 10, ContainerCounts::default().with(ContainerType::Reefer, 3));
        assert_eq!(bl.days_overdue(bl.due_date()), 0);
        assert!(bl.amount(bl.due_date()).is_zero());
    }

    #[test]
    fn test_before_due_date_floors_to_zero() {
        let bl = bill(date(2026, 1, 1), 10, ContainerCounts::default().with(ContainerType::Other, 2));
        assert_eq!(bl.days_overdue(date(2025, 12, 1)), 0);
    }

    #[test]
    fn test_total_sums_every_type() {
        let containers = ContainerCounts {
            twenty_ft: 10,
            forty_ft: 5,
            forty_ft_high_cube: 3,
            forty_five_ft: 2,
            reefer: 4,
            other: 1,
        };
        assert_eq!(containers.total(), 25);
        assert_eq!(ContainerCounts::default().total(), 0);
    }

    #[test]
    fn test_became_overdue_on_is_point_in_time() {
        let first = bill(date(2026, 1, 1), 10, ContainerCounts::default());
        let decoy = bill(date(2026, 1, 2), 10, ContainerCounts::default());
        let bills = vec![first.clone(), decoy];

        let matched = became_overdue_on(&bills, date(2026, 1, 11));
        assert_eq!(matched, vec![first]);
        assert!(became_overdue_on(&bills, date(2026, 1, 13)).is_empty());
    }

    #[test]
    fn test_validate_generates_bl_number() {
        let valid = NewBillOfLading {
            customer_id: Some(CustomerId::new(1)),
            arrival_date: Some(date(2026, 1, 1)),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert!(valid.bl_number.as_str().starts_with("BL_"));
        assert_eq!(valid.free_time_days, 0);
        assert_eq!(valid.containers, ContainerCounts::default());
    }

    #[test]
    fn test_validate_rejects_missing_arrival_date() {
        let err = NewBillOfLading {
            customer_id: Some(CustomerId::new(1)),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("Arrival date"));
    }

    #[test]
    fn test_validate_rejects_negative_counts() {
        let err = NewBillOfLading {
            customer_id: Some(CustomerId::new(1)),
            arrival_date: Some(date(2026, 1, 1)),
            number_of_20ft_containers: -1,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("20ft"));

        let err = NewBillOfLading {
            customer_id: Some(CustomerId::new(1)),
            arrival_date: Some(date(2026, 1, 1)),
            free_time_days: -1,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("Freetime"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn days_overdue_is_never_negative(
            offset in -2000i64..2000i64,
            free_time in 0u32..400u32,
        ) {
            let arrival = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
            let bl = BillOfLading {
                id: BillOfLadingId::new(1),
                bl_number: BlNumber::generate(),
                customer_id: CustomerId::new(1),
                arrival_date: arrival,
                free_time_days: free_time,
                containers: ContainerCounts::default().with(ContainerType::FortyFoot, 1),
                created_at: Utc::now(),
            };
            let as_of = arrival + chrono::Duration::days(offset);
            prop_assert!(bl.days_overdue(as_of) >= 0);
            prop_assert!(!bl.amount(as_of).is_negative());
        }

        #[test]
        fn zero_containers_owe_nothing(offset in 0i64..5000i64) {
            let arrival = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
            let bl = BillOfLading {
                id: BillOfLadingId::new(1),
                bl_number: BlNumber::generate(),
                customer_id: CustomerId::new(1),
                arrival_date: arrival,
                free_time_days: 0,
                containers: ContainerCounts::default(),
                created_at: Utc::now(),
            };
            prop_assert!(bl.amount(arrival + chrono::Duration::days(offset)).is_zero());
        }
    }
}
