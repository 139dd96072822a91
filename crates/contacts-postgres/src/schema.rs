use sqlx::PgPool;
use tracing::info;

use contacts_core::types::STANDARD_PHONE_TYPES;

/// Idempotent schema bootstrap. Safe to run on every startup.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS phone_type (
        id BIGSERIAL PRIMARY KEY,
        type_name TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS person (
        id BIGSERIAL PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        date_of_birth DATE NOT NULL,
        email TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS phone (
        id BIGSERIAL PRIMARY KEY,
        person_id BIGINT NOT NULL REFERENCES person(id) ON DELETE CASCADE,
        phone_type_id BIGINT NOT NULL REFERENCES phone_type(id) ON DELETE RESTRICT,
        number TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS address (
        id BIGSERIAL PRIMARY KEY,
        person_id BIGINT NOT NULL REFERENCES person(id) ON DELETE CASCADE,
        locality TEXT NOT NULL,
        street TEXT NOT NULL,
        number TEXT NOT NULL,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activity (
        id BIGSERIAL PRIMARY KEY,
        person_id BIGINT NOT NULL REFERENCES person(id) ON DELETE CASCADE,
        activity_type TEXT NOT NULL CHECK (activity_type IN ('call', 'meeting', 'email')),
        activity_date TIMESTAMP NOT NULL,
        description TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_phone_person ON phone(person_id)",
    "CREATE INDEX IF NOT EXISTS idx_phone_type ON phone(phone_type_id)",
    "CREATE INDEX IF NOT EXISTS idx_address_person ON address(person_id)",
    "CREATE INDEX IF NOT EXISTS idx_activity_person_date ON activity(person_id, activity_date DESC)",
];

pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Contacts schema ready");
    Ok(())
}

/// Insert the standard phone types that are not present yet.
/// Returns how many were added.
pub async fn seed_phone_types(pool: &PgPool) -> anyhow::Result<u64> {
    let names: Vec<String> = STANDARD_PHONE_TYPES.iter().map(|s| s.to_string()).collect();
    let result = sqlx::query(
        r#"
        INSERT INTO phone_type (type_name)
        SELECT UNNEST($1::text[])
        ON CONFLICT (type_name) DO NOTHING
        "#,
    )
    .bind(names)
    .execute(pool)
    .await?;

    info!(added = result.rows_affected(), "Phone types seeded");
    Ok(result.rows_affected())
}
