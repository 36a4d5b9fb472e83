//! Persistence seam over the measure store.
//!
//! Every operation translates store failures into the taxonomy: a UNIQUE
//! violation on (customer_code, measure_type, billing_month) is the
//! authoritative duplicate guard and surfaces as `DuplicateReading`, any
//! other fault as `Storage`.

use chrono::{DateTime, Utc};
use meter_core::{BillingPeriod, Measure, MeasureError, MeasureType};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use uuid::Uuid;

/// Fields for a new, unconfirmed measure record.
#[derive(Debug, Clone)]
pub struct NewMeasure {
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub measure_datetime: DateTime<Utc>,
    pub billing_month: String,
    pub measure_value: f64,
    pub image_url: String,
}

#[derive(Debug, Clone)]
pub struct MeasureRepository {
    pool: SqlitePool,
}

/// Measure row as stored.
#[derive(Debug, Clone, FromRow)]
struct MeasureRow {
    measure_uuid: String,
    customer_code: String,
    measure_type: String,
    measure_datetime: DateTime<Utc>,
    measure_value: f64,
    image_url: String,
    confirmed: bool,
}

impl TryFrom<MeasureRow> for Measure {
    type Error = MeasureError;

    fn try_from(row: MeasureRow) -> Result<Self, Self::Error> {
        let measure_uuid = Uuid::parse_str(&row.measure_uuid)
            .map_err(|e| MeasureError::Storage(format!("corrupt measure_uuid in store: {e}")))?;
        let measure_type = row
            .measure_type
            .parse::<MeasureType>()
            .map_err(|_| {
                MeasureError::Storage(format!("corrupt measure_type in store: {}", row.measure_type))
            })?;

        Ok(Measure {
            measure_uuid,
            customer_code: row.customer_code,
            measure_type,
            measure_datetime: row.measure_datetime,
            measure_value: row.measure_value,
            image_url: row.image_url,
            confirmed: row.confirmed,
        })
    }
}

const SELECT_MEASURE: &str = r#"
    SELECT measure_uuid, customer_code, measure_type, measure_datetime,
           measure_value, image_url, confirmed
    FROM measures
"#;

impl MeasureRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MeasureRepository { pool }
    }

    /// True iff any measure for the customer and type falls inside the
    /// billing period (inclusive bounds). Fast-fail optimization; the UNIQUE
    /// constraint remains the guard of record.
    pub async fn exists_in_period(
        &self,
        customer_code: &str,
        measure_type: MeasureType,
        period: &BillingPeriod,
    ) -> Result<bool, MeasureError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM measures
            WHERE customer_code = ?
              AND measure_type = ?
              AND measure_datetime >= ?
              AND measure_datetime <= ?
            "#,
        )
        .bind(customer_code)
        .bind(measure_type.as_str())
        .bind(period.start.to_rfc3339())
        .bind(period.end.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(count > 0)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Measure>, MeasureError> {
        let row: Option<MeasureRow> =
            sqlx::query_as(&format!("{SELECT_MEASURE} WHERE measure_uuid = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;

        row.map(Measure::try_from).transpose()
    }

    /// All measures for a customer, in stable datetime order.
    pub async fn find_by_customer(
        &self,
        customer_code: &str,
    ) -> Result<Vec<Measure>, MeasureError> {
        let rows: Vec<MeasureRow> = sqlx::query_as(&format!(
            "{SELECT_MEASURE} WHERE customer_code = ? ORDER BY measure_datetime"
        ))
        .bind(customer_code)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.into_iter().map(Measure::try_from).collect()
    }

    /// Insert a new record with `confirmed = false`. Two concurrent creators
    /// for the same customer/type/month race here; the loser's UNIQUE
    /// violation comes back as `DuplicateReading`.
    pub async fn create(&self, new: NewMeasure) -> Result<Measure, MeasureError> {
        let measure_uuid = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO measures (measure_uuid, customer_code, measure_type,
                                  measure_datetime, billing_month, measure_value,
                                  image_url, confirmed, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(measure_uuid.to_string())
        .bind(&new.customer_code)
        .bind(new.measure_type.as_str())
        .bind(new.measure_datetime.to_rfc3339())
        .bind(&new.billing_month)
        .bind(new.measure_value)
        .bind(&new.image_url)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
            {
                MeasureError::DuplicateReading
            }
            _ => storage(e),
        })?;

        Ok(Measure {
            measure_uuid,
            customer_code: new.customer_code,
            measure_type: new.measure_type,
            measure_datetime: new.measure_datetime,
            measure_value: new.measure_value,
            image_url: new.image_url,
            confirmed: false,
        })
    }

    /// Targeted value mutation; idempotent at the storage layer.
    pub async fn update_value(&self, id: Uuid, new_value: f64) -> Result<(), MeasureError> {
        sqlx::query("UPDATE measures SET measure_value = ? WHERE measure_uuid = ?")
            .bind(new_value)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    /// Compare-and-set confirmation: the transition only lands if the stored
    /// flag is still false at write time. Returns whether a row was updated.
    pub async fn confirm(&self, id: Uuid, value: f64) -> Result<bool, MeasureError> {
        let result = sqlx::query(
            r#"
            UPDATE measures
            SET measure_value = ?, confirmed = 1
            WHERE measure_uuid = ? AND confirmed = 0
            "#,
        )
        .bind(value)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(result.rows_affected() == 1)
    }
}

fn storage(e: sqlx::Error) -> MeasureError {
    MeasureError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn repo() -> MeasureRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        AppState::run_migrations(&pool).await.unwrap();
        MeasureRepository::new(pool)
    }

    fn dt(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn water_reading(customer: &str, datetime: &str) -> NewMeasure {
        let measure_datetime = dt(datetime);
        NewMeasure {
            customer_code: customer.to_string(),
            measure_type: MeasureType::Water,
            measure_datetime,
            billing_month: BillingPeriod::containing(measure_datetime).month_key(),
            measure_value: 100.0,
            image_url: "/public/images/test.png".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let repo = repo().await;
        let created = repo
            .create(water_reading("CUST-1", "2024-05-10T10:00:00Z"))
            .await
            .unwrap();
        assert!(!created.confirmed);

        let found = repo.find_by_id(created.measure_uuid).await.unwrap().unwrap();
        assert_eq!(found.measure_uuid, created.measure_uuid);
        assert_eq!(found.customer_code, "CUST-1");
        assert_eq!(found.measure_type, MeasureType::Water);
        assert_eq!(found.measure_datetime, dt("2024-05-10T10:00:00Z"));
        assert_eq!(found.measure_value, 100.0);
        assert!(!found.confirmed);
    }

    #[tokio::test]
    async fn unique_constraint_reports_duplicate_reading() {
        let repo = repo().await;
        repo.create(water_reading("CUST-1", "2024-05-10T10:00:00Z"))
            .await
            .unwrap();

        // Different datetime, same billing month.
        let err = repo
            .create(water_reading("CUST-1", "2024-05-25T18:00:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err, MeasureError::DuplicateReading);
    }

    #[tokio::test]
    async fn exists_in_period_uses_inclusive_month_bounds() {
        let repo = repo().await;
        repo.create(water_reading("CUST-1", "2024-05-01T00:00:00Z"))
            .await
            .unwrap();

        let may = BillingPeriod::containing(dt("2024-05-15T00:00:00Z"));
        let june = BillingPeriod::containing(dt("2024-06-15T00:00:00Z"));

        assert!(repo
            .exists_in_period("CUST-1", MeasureType::Water, &may)
            .await
            .unwrap());
        assert!(!repo
            .exists_in_period("CUST-1", MeasureType::Water, &june)
            .await
            .unwrap());
        assert!(!repo
            .exists_in_period("CUST-1", MeasureType::Gas, &may)
            .await
            .unwrap());
        assert!(!repo
            .exists_in_period("CUST-2", MeasureType::Water, &may)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn update_value_changes_only_the_value() {
        let repo = repo().await;
        let created = repo
            .create(water_reading("CUST-1", "2024-05-10T10:00:00Z"))
            .await
            .unwrap();

        repo.update_value(created.measure_uuid, 250.5).await.unwrap();
        // Idempotent at the storage layer: re-issuing changes nothing more.
        repo.update_value(created.measure_uuid, 250.5).await.unwrap();

        let found = repo.find_by_id(created.measure_uuid).await.unwrap().unwrap();
        assert_eq!(found.measure_value, 250.5);
        assert!(!found.confirmed);
    }

    #[tokio::test]
    async fn confirm_is_compare_and_set() {
        let repo = repo().await;
        let created = repo
            .create(water_reading("CUST-1", "2024-05-10T10:00:00Z"))
            .await
            .unwrap();

        assert!(repo.confirm(created.measure_uuid, 130.5).await.unwrap());
        // Second transition finds confirmed = 1 and does not land.
        assert!(!repo.confirm(created.measure_uuid, 999.0).await.unwrap());

        let found = repo.find_by_id(created.measure_uuid).await.unwrap().unwrap();
        assert!(found.confirmed);
        assert_eq!(found.measure_value, 130.5);
    }

    #[tokio::test]
    async fn find_by_customer_orders_by_datetime() {
        let repo = repo().await;
        repo.create(water_reading("CUST-1", "2024-06-10T10:00:00Z"))
            .await
            .unwrap();
        repo.create(water_reading("CUST-1", "2024-05-10T10:00:00Z"))
            .await
            .unwrap();

        let measures = repo.find_by_customer("CUST-1").await.unwrap();
        assert_eq!(measures.len(), 2);
        assert!(measures[0].measure_datetime < measures[1].measure_datetime);
        assert!(repo.find_by_customer("NOBODY").await.unwrap().is_empty());
    }
}
