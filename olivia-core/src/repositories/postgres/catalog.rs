// File: olivia-core/src/repositories/postgres/catalog.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;

use olivia_common::error::Error;
use olivia_common::models::{ClassDefinition, Session, SessionFilter, SessionStatus, SessionView};
use olivia_common::traits::repository_traits::CatalogRepository;

use crate::repositories::memory::catalog::CatalogSeed;

pub struct PostgresCatalogRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresCatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Upserts a seed file in one transaction. Seeded counts overwrite the
    /// stored count; member rows are inserted and counted on top.
    pub async fn import_seed(&self, seed: &CatalogSeed) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;

        for branch in &seed.branches {
            sqlx::query(
                r#"
                INSERT INTO branches (id, name) VALUES ($1, $2)
                ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
                "#,
            )
                .bind(&branch.id)
                .bind(&branch.name)
                .execute(&mut *tx)
                .await?;
        }

        for class in &seed.classes {
            sqlx::query(
                r#"
                INSERT INTO classes (id, name, bucket, tags, default_location, default_duration_min)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    bucket = EXCLUDED.bucket,
                    tags = EXCLUDED.tags,
                    default_location = EXCLUDED.default_location,
                    default_duration_min = EXCLUDED.default_duration_min
                "#,
            )
                .bind(&class.id)
                .bind(&class.name)
                .bind(&class.bucket)
                .bind(&class.tags)
                .bind(&class.default_location)
                .bind(class.default_duration_min)
                .execute(&mut *tx)
                .await?;
        }

        for session in &seed.sessions {
            sqlx::query(
                r#"
                INSERT INTO sessions (id, class_id, branch_id, start_at, end_at, location, instructor, capacity, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (id) DO UPDATE SET
                    class_id = EXCLUDED.class_id,
                    branch_id = EXCLUDED.branch_id,
                    start_at = EXCLUDED.start_at,
                    end_at = EXCLUDED.end_at,
                    location = EXCLUDED.location,
                    instructor = EXCLUDED.instructor,
                    capacity = EXCLUDED.capacity,
                    status = EXCLUDED.status
                "#,
            )
                .bind(&session.id)
                .bind(&session.class_id)
                .bind(&session.branch_id)
                .bind(session.start)
                .bind(session.end)
                .bind(&session.location)
                .bind(&session.instructor)
                .bind(session.capacity)
                .bind(session.status.to_string())
                .execute(&mut *tx)
                .await?;
        }

        for count in &seed.enrollments {
            sqlx::query(
                r#"
                INSERT INTO enrollments (session_id, enrolled, updated_at)
                VALUES ($1, GREATEST($2, 0), now())
                ON CONFLICT (session_id) DO UPDATE SET
                    enrolled = EXCLUDED.enrolled,
                    updated_at = now()
                "#,
            )
                .bind(&count.session_id)
                .bind(count.enrolled)
                .execute(&mut *tx)
                .await?;
        }

        for member in &seed.member_enrollments {
            let inserted = sqlx::query(
                r#"
                INSERT INTO member_enrollments (session_id, member_id, created_at)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
                .bind(&member.session_id)
                .bind(&member.member_id)
                .bind(member.enrolled_at)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if inserted > 0 {
                sqlx::query(
                    r#"
                    INSERT INTO enrollments (session_id, enrolled, updated_at)
                    VALUES ($1, 1, now())
                    ON CONFLICT (session_id) DO UPDATE SET
                        enrolled = enrollments.enrolled + 1,
                        updated_at = now()
                    "#,
                )
                    .bind(&member.session_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        info!(
            "Imported catalog seed: {} branches, {} classes, {} sessions",
            seed.branches.len(),
            seed.classes.len(),
            seed.sessions.len()
        );
        Ok(())
    }
}

const SESSION_VIEW_SELECT: &str = r#"
    SELECT
        s.id,
        s.class_id,
        s.branch_id,
        s.start_at,
        s.end_at,
        s.location,
        s.instructor,
        s.capacity,
        s.status,
        c.name AS class_name,
        c.bucket,
        c.tags,
        c.default_location,
        c.default_duration_min,
        b.name AS branch_name,
        COALESCE(e.enrolled, 0) AS enrolled
    FROM sessions s
    JOIN classes c ON c.id = s.class_id
    JOIN branches b ON b.id = s.branch_id
    LEFT JOIN enrollments e ON e.session_id = s.id
"#;

fn row_to_view(row: &PgRow) -> Result<SessionView, Error> {
    let status: String = row.try_get("status")?;
    let session = Session {
        id: row.try_get("id")?,
        class_id: row.try_get("class_id")?,
        branch_id: row.try_get("branch_id")?,
        start: row.try_get("start_at")?,
        end: row.try_get("end_at")?,
        location: row.try_get("location")?,
        instructor: row.try_get("instructor")?,
        capacity: row.try_get("capacity")?,
        status: status.parse::<SessionStatus>()?,
    };
    let class = ClassDefinition {
        id: session.class_id.clone(),
        name: row.try_get("class_name")?,
        bucket: row.try_get("bucket")?,
        tags: row.try_get("tags")?,
        default_location: row.try_get("default_location")?,
        default_duration_min: row.try_get("default_duration_min")?,
    };
    let branch_name: String = row.try_get("branch_name")?;
    let enrolled: i32 = row.try_get("enrolled")?;
    Ok(SessionView::from_parts(&session, &class, &branch_name, enrolled))
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<SessionView>, Error> {
        // window, branch and status narrow in SQL; bucket aliases, tag overlap
        // and open-spot checks go through SessionFilter::matches
        let sql = format!(
            r#"{SESSION_VIEW_SELECT}
            WHERE s.start_at >= $1
              AND s.start_at < $2
              AND s.status = 'scheduled'
              AND ($3::text[] IS NULL OR s.branch_id = ANY($3))
            ORDER BY s.start_at ASC, s.id ASC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(filter.starts_at_or_after)
            .bind(filter.starts_before)
            .bind(filter.branch_ids.clone())
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let view = row_to_view(&row)?;
            if filter.matches(&view) {
                out.push(view);
            }
        }
        Ok(out)
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionView>, Error> {
        let sql = format!("{SESSION_VIEW_SELECT} WHERE s.id = $1");
        let row_opt = sqlx::query(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.as_ref().map(row_to_view).transpose()
    }
}
