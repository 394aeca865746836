//! # Measurement Repository
//!
//! Saved body measurements, always scoped to their owner. Another user's
//! measurement behaves exactly like a missing one.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use tailor_core::commands::{MeasurementUpdate, NewMeasurement};
use tailor_core::{Measurement, MeasurementType};

#[derive(Debug, sqlx::FromRow)]
struct MeasurementRow {
    id: String,
    user_id: String,
    #[sqlx(rename = "type")]
    measurement_type: MeasurementType,
    name: String,
    data: Json<BTreeMap<String, Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MeasurementRow> for Measurement {
    fn from(row: MeasurementRow) -> Self {
        Measurement {
            id: row.id,
            user_id: row.user_id,
            measurement_type: row.measurement_type,
            name: row.name,
            data: row.data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const MEASUREMENT_COLUMNS: &str = "id, user_id, type, name, data, created_at, updated_at";

/// Repository for saved measurements.
#[derive(Debug, Clone)]
pub struct MeasurementRepository {
    pool: SqlitePool,
}

impl MeasurementRepository {
    /// Creates a new MeasurementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MeasurementRepository { pool }
    }

    /// The user's measurements, newest first.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<Measurement>> {
        let rows: Vec<MeasurementRow> = sqlx::query_as(&format!(
            r#"
            SELECT {MEASUREMENT_COLUMNS} FROM measurements
            WHERE user_id = ?1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, id: &str, user_id: &str) -> DbResult<Measurement> {
        let row: Option<MeasurementRow> = sqlx::query_as(&format!(
            r#"
            SELECT {MEASUREMENT_COLUMNS} FROM measurements
            WHERE id = ?1 AND user_id = ?2 AND deleted_at IS NULL
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| DbError::not_found("Measurement", id))
    }

    pub async fn create(&self, user_id: &str, new: &NewMeasurement) -> DbResult<Measurement> {
        let id = generate_id();
        let now = Utc::now();

        debug!(id = %id, user_id = %user_id, "Saving measurement");

        sqlx::query(
            r#"
            INSERT INTO measurements (id, user_id, type, name, data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(new.measurement_type)
        .bind(new.name.trim())
        .bind(Json(&new.data))
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&id, user_id).await
    }

    /// Partial update; `data` replaces the whole object when given.
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        update: &MeasurementUpdate,
    ) -> DbResult<Measurement> {
        if update.is_empty() {
            return Err(DbError::InvalidInput("No fields to update".to_string()));
        }

        let result = sqlx::query(
            r#"
            UPDATE measurements SET
                type = COALESCE(?1, type),
                name = COALESCE(?2, name),
                data = COALESCE(?3, data),
                updated_at = ?4
            WHERE id = ?5 AND user_id = ?6 AND deleted_at IS NULL
            "#,
        )
        .bind(update.measurement_type)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.data.as_ref().map(Json))
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Measurement", id));
        }

        self.get(id, user_id).await
    }

    /// Soft-deletes a measurement.
    pub async fn delete(&self, id: &str, user_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE measurements SET deleted_at = ?1, updated_at = ?1
            WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Measurement", id));
        }

        info!(id = %id, "Measurement deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures;
    use serde_json::json;

    fn shirt() -> NewMeasurement {
        let mut data = BTreeMap::new();
        data.insert("chest".to_string(), json!(40));
        data.insert("sleeve".to_string(), json!("24.5"));
        NewMeasurement {
            measurement_type: MeasurementType::Shirt,
            name: "Office shirts".to_string(),
            data,
        }
    }

    #[tokio::test]
    async fn test_crud_scoped_to_owner() {
        let db = fixtures::db().await;
        let owner = fixtures::customer(&db, "m1@example.com").await;
        let other = fixtures::customer(&db, "m2@example.com").await;
        let repo = db.measurements();

        let saved = repo.create(&owner, &shirt()).await.unwrap();
        assert_eq!(saved.data["chest"], json!(40));
        assert_eq!(repo.list(&owner).await.unwrap().len(), 1);
        assert!(repo.list(&other).await.unwrap().is_empty());

        let peek = repo.get(&saved.id, &other).await;
        assert!(matches!(peek, Err(DbError::NotFound { .. })));

        let update = MeasurementUpdate {
            measurement_type: Some(MeasurementType::Kurta),
            ..Default::default()
        };
        let updated = repo.update(&saved.id, &owner, &update).await.unwrap();
        assert_eq!(updated.measurement_type, MeasurementType::Kurta);
        assert_eq!(updated.name, "Office shirts");
        assert_eq!(updated.data.len(), 2);

        let stolen = repo.delete(&saved.id, &other).await;
        assert!(matches!(stolen, Err(DbError::NotFound { .. })));

        repo.delete(&saved.id, &owner).await.unwrap();
        assert!(repo.list(&owner).await.unwrap().is_empty());
        assert!(matches!(repo.delete(&saved.id, &owner).await, Err(DbError::NotFound { .. })));
    }
}
