//! Audit log repository implementation

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgExecutor;
use sqlx::{FromRow, PgPool};

use core_kernel::AuditEntryId;
use domain_demurrage::{AuditEntry, NewAuditEntry};

use crate::error::DatabaseError;

const AUDIT_COLUMNS: &str = "id, event_type, actor, resource_type, resource_id, metadata, created_at";

/// Repository for the append-only audit log
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn for_resource(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> Result<Vec<AuditRow>, DatabaseError> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs \
             WHERE resource_type = $1 AND resource_id = $2 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(resource_type)
            .bind(resource_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn insert<'e, E>(executor: E, entry: &NewAuditEntry) -> Result<AuditRow, DatabaseError>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!(
            "INSERT INTO audit_logs (event_type, actor, resource_type, resource_id, metadata) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {AUDIT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(&entry.event_type)
            .bind(&entry.actor)
            .bind(&entry.resource_type)
            .bind(entry.resource_id)
            .bind(&entry.metadata)
            .fetch_one(executor)
            .await?;
        Ok(row)
    }
}

/// Database row for an audit entry
#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub id: i64,
    pub event_type: String,
    pub actor: String,
    pub resource_type: String,
    pub resource_id: i64,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            id: AuditEntryId::new(row.id),
            event_type: row.event_type,
            actor: row.actor,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}
