use schedsync::adapters::sqlite::{create_migrated_test_pool, SqliteTaskStore};
use sqlx::SqlitePool;

/// Fresh in-memory database with migrations applied.
///
/// Each call creates a completely isolated database instance.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

pub async fn sqlite_store() -> SqliteTaskStore {
    SqliteTaskStore::new(setup_test_db().await)
}

/// Closes the connection pool.
pub async fn teardown_test_db(pool: SqlitePool) {
    pool.close().await;
}
