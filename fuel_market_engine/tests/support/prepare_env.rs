use fuel_market_engine::SqliteDatabase;
use log::*;
use sqlx::{
    migrate,
    migrate::MigrateDatabase,
    Sqlite,
};

/// Creates a fresh database at `url`, runs the migrations and returns a connected store.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 5)
        .await
        .expect("Error creating connection pool");
    run_migrations(db.pool()).await;
    db
}

/// A unique database url, so that concurrently running tests do not trip over each other.
pub fn random_db_path() -> String {
    let db_name: u64 = rand::random();
    format!("sqlite://../data/test_fuel_{db_name}.db")
}

async fn create_database(url: &str) {
    std::fs::create_dir_all("../data").expect("Could not create data directory");
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        debug!("🚀️ Removing stale test database at {url}");
        Sqlite::drop_database(url).await.expect("Error dropping old test database");
    }
    Sqlite::create_database(url).await.expect("Error creating test database");
    debug!("🚀️ Database created at {url}");
}

async fn run_migrations(pool: &sqlx::SqlitePool) {
    migrate!("./src/sqlite/migrations").run(pool).await.expect("Error running migrations");
    debug!("🚀️ Migrations complete");
}
