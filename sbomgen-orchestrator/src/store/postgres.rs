//! Postgres store implementations
//!
//! Handles all database operations for generation requests, work objects and
//! manifests.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use sbomgen_core::domain::config::{GenerationConfig, ResolvedConfig};
use sbomgen_core::domain::request::{GenerationRequest, RequestStatus, RequestType, ResultCode};
use sbomgen_core::domain::work::WorkObject;
use sbomgen_core::dto::CreateRequest;

use crate::error::{Error, Result};
use crate::store::{ManifestStore, RequestStore, WorkObjectStore};

/// Request record store backed by the `generation_requests` table
#[derive(Debug, Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn create(&self, request: CreateRequest) -> Result<GenerationRequest> {
        request.config.validate()?;

        let record = GenerationRequest {
            id: Uuid::now_v7(),
            identifier: request.identifier,
            request_type: request.config.request_type(),
            config: request.config,
            status: RequestStatus::New,
            result: None,
            reason: None,
            creation_time: chrono::Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO generation_requests (id, identifier, request_type, config, status, creation_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(&record.identifier)
        .bind(record.request_type.as_str())
        .bind(serde_json::to_value(&record.config).map_err(|e| Error::CorruptRecord {
            id: record.id,
            detail: e.to_string(),
        })?)
        .bind(record.status.as_str())
        .bind(record.creation_time)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "Generation request created: {} ({})",
            record.id,
            record.request_type.as_str()
        );

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GenerationRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, identifier, request_type, config, status, result, reason, creation_time
            FROM generation_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(GenerationRequest::try_from).transpose()
    }

    async fn list_by_status(&self, status: RequestStatus) -> Result<Vec<GenerationRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT id, identifier, request_type, config, status, result, reason, creation_time
            FROM generation_requests
            WHERE status = $1
            ORDER BY creation_time ASC, id ASC
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GenerationRequest::try_from).collect()
    }

    async fn claim_new(&self, limit: i64) -> Result<Vec<GenerationRequest>> {
        // Single-statement claim: the locked SELECT and the status flip
        // commit together, and SKIP LOCKED keeps racing replicas off the
        // same rows.
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            WITH picked AS (
                SELECT id
                FROM generation_requests
                WHERE status = 'NEW'
                ORDER BY creation_time ASC, id ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE generation_requests r
            SET status = 'SCHEDULED'
            FROM picked
            WHERE r.id = picked.id
            RETURNING r.id, r.identifier, r.request_type, r.config, r.status, r.result,
                      r.reason, r.creation_time
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut claimed: Vec<GenerationRequest> = rows
            .into_iter()
            .map(GenerationRequest::try_from)
            .collect::<Result<_>>()?;
        claimed.sort_by_key(|record| (record.creation_time, record.id));
        Ok(claimed)
    }

    async fn mirror_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        result: Option<ResultCode>,
        reason: Option<&str>,
    ) -> Result<()> {
        let outcome = sqlx::query(
            r#"
            UPDATE generation_requests
            SET status = $2, result = $3, reason = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(result.map(|code| code.as_str()))
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }
}

/// Work object store backed by the `work_objects` table
#[derive(Debug, Clone)]
pub struct PgWorkObjectStore {
    pool: PgPool,
}

impl PgWorkObjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkObjectStore for PgWorkObjectStore {
    async fn get(&self, id: Uuid) -> Result<Option<WorkObject>> {
        let row = sqlx::query_as::<_, WorkRow>(
            r#"
            SELECT id, request_type, config, status, result, reason, resolved, trace_id, version
            FROM work_objects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WorkObject::try_from).transpose()
    }

    async fn list_active(&self) -> Result<Vec<WorkObject>> {
        let rows = sqlx::query_as::<_, WorkRow>(
            r#"
            SELECT id, request_type, config, status, result, reason, resolved, trace_id, version
            FROM work_objects
            WHERE status NOT IN ('FINISHED', 'FAILED')
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkObject::try_from).collect()
    }

    async fn count_active(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM work_objects WHERE status NOT IN ('FINISHED', 'FAILED')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn create_if_absent(&self, work: &WorkObject) -> Result<bool> {
        let outcome = sqlx::query(
            r#"
            INSERT INTO work_objects (id, request_type, config, status, result, reason,
                                      resolved, trace_id, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(work.id)
        .bind(work.request_type.as_str())
        .bind(json_value(work.id, &work.config)?)
        .bind(work.status.as_str())
        .bind(work.result.map(|code| code.as_str()))
        .bind(work.reason.as_deref())
        .bind(work.resolved.as_ref().map(|r| json_value(work.id, r)).transpose()?)
        .bind(&work.trace_id)
        .bind(work.version)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    async fn update(&self, work: &WorkObject) -> Result<WorkObject> {
        let row = sqlx::query_as::<_, WorkRow>(
            r#"
            UPDATE work_objects
            SET status = $2, result = $3, reason = $4, resolved = $5, version = version + 1
            WHERE id = $1 AND version = $6
            RETURNING id, request_type, config, status, result, reason, resolved, trace_id, version
            "#,
        )
        .bind(work.id)
        .bind(work.status.as_str())
        .bind(work.result.map(|code| code.as_str()))
        .bind(work.reason.as_deref())
        .bind(work.resolved.as_ref().map(|r| json_value(work.id, r)).transpose()?)
        .bind(work.version)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => WorkObject::try_from(row),
            None => Err(Error::Conflict(work.id)),
        }
    }
}

/// Manifest store backed by the `manifests` table
#[derive(Debug, Clone)]
pub struct PgManifestStore {
    pool: PgPool,
}

impl PgManifestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ManifestStore for PgManifestStore {
    async fn store_manifest(
        &self,
        request_id: Uuid,
        product_index: usize,
        bom: &serde_json::Value,
    ) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();

        // Replays of a finished reconciliation overwrite the same
        // (request, index) slot instead of duplicating it.
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO manifests (id, request_id, product_index, bom, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (request_id, product_index)
            DO UPDATE SET bom = EXCLUDED.bom
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(request_id)
        .bind(product_index as i32)
        .bind(bom)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn json_value<T: serde::Serialize>(id: Uuid, value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::CorruptRecord {
        id,
        detail: e.to_string(),
    })
}

fn parse_status(id: Uuid, s: &str) -> Result<RequestStatus> {
    RequestStatus::parse(s).ok_or_else(|| Error::CorruptRecord {
        id,
        detail: format!("unknown status `{}`", s),
    })
}

fn parse_type(id: Uuid, s: &str) -> Result<RequestType> {
    RequestType::parse(s).ok_or_else(|| Error::CorruptRecord {
        id,
        detail: format!("unknown request type `{}`", s),
    })
}

fn parse_result(id: Uuid, s: Option<&str>) -> Result<Option<ResultCode>> {
    s.map(|s| {
        ResultCode::parse(s).ok_or_else(|| Error::CorruptRecord {
            id,
            detail: format!("unknown result code `{}`", s),
        })
    })
    .transpose()
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    identifier: String,
    request_type: String,
    config: serde_json::Value,
    status: String,
    result: Option<String>,
    reason: Option<String>,
    creation_time: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<RequestRow> for GenerationRequest {
    type Error = Error;

    fn try_from(row: RequestRow) -> Result<Self> {
        let request_type = parse_type(row.id, &row.request_type)?;
        let status = parse_status(row.id, &row.status)?;
        let result = parse_result(row.id, row.result.as_deref())?;
        let config: GenerationConfig =
            serde_json::from_value(row.config).map_err(|e| Error::CorruptRecord {
                id: row.id,
                detail: format!("config: {}", e),
            })?;
        config
            .ensure_type(request_type)
            .map_err(|e| Error::CorruptRecord {
                id: row.id,
                detail: e.to_string(),
            })?;

        Ok(GenerationRequest {
            id: row.id,
            identifier: row.identifier,
            request_type,
            config,
            status,
            result,
            reason: row.reason,
            creation_time: row.creation_time,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WorkRow {
    id: Uuid,
    request_type: String,
    config: serde_json::Value,
    status: String,
    result: Option<String>,
    reason: Option<String>,
    resolved: Option<serde_json::Value>,
    trace_id: String,
    version: i64,
}

impl TryFrom<WorkRow> for WorkObject {
    type Error = Error;

    fn try_from(row: WorkRow) -> Result<Self> {
        let request_type = parse_type(row.id, &row.request_type)?;
        let status = parse_status(row.id, &row.status)?;
        let result = parse_result(row.id, row.result.as_deref())?;
        let config: GenerationConfig =
            serde_json::from_value(row.config).map_err(|e| Error::CorruptRecord {
                id: row.id,
                detail: format!("config: {}", e),
            })?;
        config
            .ensure_type(request_type)
            .map_err(|e| Error::CorruptRecord {
                id: row.id,
                detail: e.to_string(),
            })?;
        let resolved: Option<ResolvedConfig> = row
            .resolved
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::CorruptRecord {
                id: row.id,
                detail: format!("resolved config: {}", e),
            })?;

        Ok(WorkObject {
            id: row.id,
            request_type,
            config,
            status,
            result,
            reason: row.reason,
            resolved,
            trace_id: row.trace_id,
            version: row.version,
        })
    }
}
