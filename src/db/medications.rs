//! Medication and dose-log queries. Every query is scoped by the owning user.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::models::{Medication, MedicationLog, MedicationRow, NewMedication};
use super::{DatabaseError, Db};

impl Db {
    pub async fn add_medication(
        &self,
        user_id: i64,
        new: &NewMedication,
    ) -> Result<Medication, DatabaseError> {
        let row = sqlx::query_as::<_, MedicationRow>(
            "INSERT INTO medications (id, user_id, name, dosage, frequency, dose_time, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, user_id, name, dosage, frequency, dose_time, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&new.name)
        .bind(&new.dosage)
        .bind(new.frequency.label())
        .bind(new.time)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Medication::try_from(row)
    }

    /// Newest first.
    pub async fn list_medications(&self, user_id: i64) -> Result<Vec<Medication>, DatabaseError> {
        sqlx::query_as::<_, MedicationRow>(
            "SELECT id, user_id, name, dosage, frequency, dose_time, created_at
             FROM medications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Medication::try_from)
        .collect()
    }

    pub async fn logs_for_date(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<MedicationLog>, DatabaseError> {
        let logs = sqlx::query_as::<_, MedicationLog>(
            "SELECT id, medication_id, user_id, log_date, taken, taken_at
             FROM medication_logs WHERE user_id = $1 AND log_date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(self.pool())
        .await?;

        Ok(logs)
    }

    /// Records the medication as taken on `date`.
    ///
    /// The `(medication_id, log_date)` uniqueness constraint keeps a single
    /// log per day: marking again only refreshes `taken_at`.
    pub async fn mark_taken(
        &self,
        user_id: i64,
        medication_id: Uuid,
        date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<MedicationLog, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM medications WHERE id = $1 AND user_id = $2)",
        )
        .bind(medication_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if !owned {
            return Err(DatabaseError::NotFound(format!("medication {}", medication_id)));
        }

        let log = sqlx::query_as::<_, MedicationLog>(
            "INSERT INTO medication_logs (id, medication_id, user_id, log_date, taken, taken_at)
             VALUES ($1, $2, $3, $4, TRUE, $5)
             ON CONFLICT (medication_id, log_date)
             DO UPDATE SET taken = TRUE, taken_at = EXCLUDED.taken_at
             RETURNING id, medication_id, user_id, log_date, taken, taken_at",
        )
        .bind(Uuid::new_v4())
        .bind(medication_id)
        .bind(user_id)
        .bind(date)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(log)
    }
}
