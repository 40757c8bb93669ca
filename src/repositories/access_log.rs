use sqlx::PgPool;
use uuid::Uuid;

pub(crate) async fn insert(
    pool: &PgPool,
    user_id: &str,
    ip: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO access_log (id, user_id, ip, logged_at) VALUES ($1,$2,$3,$4)")
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(ip)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}
