use crate::error::Result;
use crate::kind::Kind;
use sqlx::SqlitePool;

pub async fn ensure_schema(pool: &SqlitePool, kind: Kind) -> Result<()> {
    let table = kind.table();

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            url TEXT,
            version TEXT,
            date TEXT,
            description TEXT,
            effective_period_start TEXT,
            effective_period_end TEXT,
            expansion_identifier TEXT,
            name TEXT,
            publisher TEXT,
            status TEXT,
            title TEXT,
            content TEXT NOT NULL,
            last_seen INTEGER NOT NULL
        )"
    ))
    .execute(pool)
    .await?;

    for (col, expr) in [
        ("url_version", "(url, version)"),
        ("status", "status"),
        ("name", "name"),
        ("title", "title"),
        ("publisher", "publisher"),
        ("last_seen", "last_seen"),
    ] {
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table} ({expr})"
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS identifiers (
            vs_id TEXT NOT NULL,
            system TEXT,
            value TEXT,
            use TEXT,
            type_system TEXT,
            type_code TEXT
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_identifiers_vs_id ON identifiers (vs_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS jurisdictions (
            vs_id TEXT NOT NULL,
            system TEXT,
            code TEXT,
            display TEXT
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jurisdictions_vs_id ON jurisdictions (vs_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS systems (
            vs_id TEXT NOT NULL,
            system TEXT
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_systems_vs_id ON systems (vs_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_systems_system ON systems (system)")
        .execute(pool)
        .await?;

    Ok(())
}
