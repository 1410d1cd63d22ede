use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub mod challenges;
pub mod identities;

/// Mirrors the `users` / `qr_sessions` tables of the web stack this service
/// replaces. Timestamps are unix milliseconds.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS qr_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT UNIQUE NOT NULL,
    user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'pending',
    expires_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS qr_sessions_expires_at ON qr_sessions (expires_at);
"#;

pub fn create_pool(db_path: &str, create_if_missing: bool) -> Pool<Sqlite> {
    let conn_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(create_if_missing);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_lazy_with(conn_options)
}

pub async fn apply_schema(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

/// Opens the database used by the server, creating the file and any missing
/// tables on first start.
pub async fn open_database(db_path: &str) -> Result<Pool<Sqlite>, sqlx::Error> {
    let pool = create_pool(db_path, true);
    apply_schema(&pool).await?;
    Ok(pool)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> Pool<Sqlite> {
    // A single connection, since every `:memory:` connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    apply_schema(&pool).await.unwrap();
    pool
}

/// A file-backed pool shaped like production, for tests that need several
/// connections. The database lives as long as the returned directory.
#[cfg(test)]
pub(crate) async fn test_file_pool() -> (tempfile::TempDir, Pool<Sqlite>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qr-login.db");
    let pool = open_database(path.to_str().unwrap()).await.unwrap();
    (dir, pool)
}
