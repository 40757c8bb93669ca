use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::ExamRecord;

const COLUMNS: &str = "\
    id, user_id, exam_id, left_date, right_date, subject, duration, \
    created_at, updated_at";

pub(crate) struct UpsertExamRecord<'a> {
    pub exam_id: &'a str,
    pub left_date: &'a serde_json::Value,
    pub right_date: &'a serde_json::Value,
    pub subject: &'a str,
    pub duration: i64,
}

/// Bulk upsert of a user's synced exam offerings, keyed by (user, exam id).
pub(crate) async fn add_many(
    pool: &PgPool,
    user_id: &str,
    records: &[UpsertExamRecord<'_>],
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            "INSERT INTO exam_records (
                id, user_id, exam_id, left_date, right_date, subject, duration,
                created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            ON CONFLICT (user_id, exam_id) DO UPDATE SET
                left_date = EXCLUDED.left_date,
                right_date = EXCLUDED.right_date,
                subject = EXCLUDED.subject,
                duration = EXCLUDED.duration,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(record.exam_id)
        .bind(sqlx::types::Json(record.left_date))
        .bind(sqlx::types::Json(record.right_date))
        .bind(record.subject)
        .bind(record.duration)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<ExamRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "SELECT {COLUMNS} FROM exam_records WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}
