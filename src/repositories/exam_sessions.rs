use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::ExamSession;
use crate::db::types::Provider;

const COLUMNS: &str = "\
    id, username, exam_id, exam_code, provider, created_at, updated_at";

pub(crate) struct UpdateCode<'a> {
    pub username: &'a str,
    pub exam_id: &'a str,
    pub exam_code: &'a str,
    pub provider: Provider,
}

/// Create-or-update the session the provider registered for
/// (username, exam id), stamping it with the latest exam code.
pub(crate) async fn update_code(
    pool: &PgPool,
    params: UpdateCode<'_>,
    now: time::PrimitiveDateTime,
) -> Result<ExamSession, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "INSERT INTO exam_sessions (
            id, username, exam_id, exam_code, provider, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT (username, exam_id) DO UPDATE SET
            exam_code = EXCLUDED.exam_code,
            provider = EXCLUDED.provider,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(params.username)
    .bind(params.exam_id)
    .bind(params.exam_code)
    .bind(params.provider)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_exam_code(
    pool: &PgPool,
    exam_code: &str,
) -> Result<Option<ExamSession>, sqlx::Error> {
    sqlx::query_as::<_, ExamSession>(&format!(
        "SELECT {COLUMNS} FROM exam_sessions WHERE exam_code = $1"
    ))
    .bind(exam_code)
    .fetch_optional(pool)
    .await
}
