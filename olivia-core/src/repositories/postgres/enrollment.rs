// File: olivia-core/src/repositories/postgres/enrollment.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;

use olivia_common::error::Error;
use olivia_common::models::{CancellationReceipt, EnrollmentOutcome, SessionStatus};
use olivia_common::traits::repository_traits::EnrollmentRepository;

pub struct PostgresEnrollmentRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresEnrollmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

struct LockedSession {
    capacity: i32,
    status: SessionStatus,
    enrolled: i32,
}

/// Locks the session row for the rest of the transaction. Every enroll/cancel
/// for the same session queues behind this lock.
async fn lock_session(
    tx: &mut Transaction<'_, Postgres>,
    session_id: &str,
) -> Result<Option<LockedSession>, Error> {
    let row_opt = sqlx::query(
        r#"
        SELECT s.capacity, s.status, COALESCE(e.enrolled, 0) AS enrolled
        FROM sessions s
        LEFT JOIN enrollments e ON e.session_id = s.id
        WHERE s.id = $1
        FOR UPDATE OF s
        "#,
    )
        .bind(session_id)
        .fetch_optional(&mut **tx)
        .await?;

    match row_opt {
        Some(row) => {
            let status: String = row.try_get("status")?;
            Ok(Some(LockedSession {
                capacity: row.try_get("capacity")?,
                status: status.parse::<SessionStatus>()?,
                enrolled: row.try_get("enrolled")?,
            }))
        }
        None => Ok(None),
    }
}

async fn read_counts(
    tx: &mut Transaction<'_, Postgres>,
    session_id: &str,
) -> Result<(i32, i32), Error> {
    let row = sqlx::query(
        r#"
        SELECT s.capacity, COALESCE(e.enrolled, 0) AS enrolled
        FROM sessions s
        LEFT JOIN enrollments e ON e.session_id = s.id
        WHERE s.id = $1
        "#,
    )
        .bind(session_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok((row.try_get("capacity")?, row.try_get("enrolled")?))
}

async fn is_member_enrolled(
    tx: &mut Transaction<'_, Postgres>,
    session_id: &str,
    member_id: &str,
) -> Result<bool, Error> {
    let row_opt = sqlx::query(
        r#"
        SELECT 1 AS present
        FROM member_enrollments
        WHERE session_id = $1 AND member_id = $2
        "#,
    )
        .bind(session_id)
        .bind(member_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row_opt.is_some())
}

#[async_trait]
impl EnrollmentRepository for PostgresEnrollmentRepository {
    async fn enroll(&self, session_id: &str, member_id: &str) -> Result<EnrollmentOutcome, Error> {
        let mut tx = self.pool.begin().await?;

        let session = match lock_session(&mut tx, session_id).await? {
            Some(s) if s.status == SessionStatus::Scheduled => s,
            _ => return Err(Error::NotFound(format!("Session not found: {}", session_id))),
        };

        if is_member_enrolled(&mut tx, session_id, member_id).await? {
            tx.commit().await?;
            return Ok(EnrollmentOutcome {
                already_enrolled: true,
                capacity: session.capacity,
                enrolled: session.enrolled,
            });
        }

        if session.capacity - session.enrolled <= 0 {
            return Err(Error::Conflict(format!("Session is full: {}", session_id)));
        }

        sqlx::query(
            r#"
            INSERT INTO member_enrollments (session_id, member_id, created_at)
            VALUES ($1, $2, now())
            "#,
        )
            .bind(session_id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO enrollments (session_id, enrolled, updated_at)
            VALUES ($1, 1, now())
            ON CONFLICT (session_id)
            DO UPDATE SET enrolled = enrollments.enrolled + 1, updated_at = now()
            "#,
        )
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        let (capacity, enrolled) = read_counts(&mut tx, session_id).await?;
        tx.commit().await?;

        debug!("member {} enrolled in {} ({}/{})", member_id, session_id, enrolled, capacity);
        Ok(EnrollmentOutcome { already_enrolled: false, capacity, enrolled })
    }

    async fn cancel(&self, session_id: &str, member_id: &str) -> Result<CancellationReceipt, Error> {
        let mut tx = self.pool.begin().await?;

        if lock_session(&mut tx, session_id).await?.is_none() {
            return Err(Error::NotFound(format!("Session not found: {}", session_id)));
        }

        let deleted = sqlx::query(
            r#"
            DELETE FROM member_enrollments
            WHERE session_id = $1 AND member_id = $2
            "#,
        )
            .bind(session_id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted > 0 {
            sqlx::query(
                r#"
                UPDATE enrollments
                SET enrolled = GREATEST(enrolled - 1, 0), updated_at = now()
                WHERE session_id = $1
                "#,
            )
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
        }

        let (capacity, enrolled) = read_counts(&mut tx, session_id).await?;
        tx.commit().await?;

        Ok(CancellationReceipt::new(session_id, deleted > 0, capacity, enrolled))
    }
}
