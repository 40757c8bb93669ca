use sqlx::PgPool;

use crate::db::models::User;
use crate::db::types::{Provider, UserRole};

const COLUMNS: &str = "\
    id, username, full_name, role, provider, hashed_password, is_active, \
    created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_username_provider(
    pool: &PgPool,
    username: &str,
    provider: Provider,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE username = $1 AND provider = $2"
    ))
    .bind(username)
    .bind(provider)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub full_name: &'a str,
    pub role: UserRole,
    pub provider: Provider,
    pub hashed_password: Option<String>,
    pub is_active: bool,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, username, full_name, role, provider, hashed_password, is_active,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.full_name)
    .bind(params.role)
    .bind(params.provider)
    .bind(params.hashed_password)
    .bind(params.is_active)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

/// Strategy callbacks delegate identity resolution here: an existing
/// identity for the provider wins, otherwise a student account is created.
pub(crate) async fn find_or_create(
    pool: &PgPool,
    provider: Provider,
    username: &str,
    full_name: Option<&str>,
    now: time::PrimitiveDateTime,
) -> Result<User, sqlx::Error> {
    if let Some(user) = find_by_username_provider(pool, username, provider).await? {
        return Ok(user);
    }

    create(
        pool,
        CreateUser {
            id: &uuid::Uuid::new_v4().to_string(),
            username,
            full_name: full_name.unwrap_or(username),
            role: UserRole::Student,
            provider,
            hashed_password: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users ORDER BY created_at DESC OFFSET $1 LIMIT $2"
    ))
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}
