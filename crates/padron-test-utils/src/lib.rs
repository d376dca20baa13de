//! Shared PostgreSQL harness for padron integration tests.
//!
//! Every test runs against its own freshly-migrated database inside one
//! shared server, so tests are isolated without paying a container start per
//! test. The server comes from one of two places:
//!
//! - **`PADRON_TEST_PG_URL`** set: an external instance (e.g. started by a
//!   nextest setup script) is used directly.
//! - Otherwise a testcontainers PostgreSQL is started lazily and shared per
//!   test binary through a `OnceCell`.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use padron_db::pool;

struct SharedPg {
    base_url: String,
    /// Held to keep the container alive. `None` when using an external URL.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("PADRON_TEST_PG_URL") {
        return SharedPg {
            base_url: url,
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("18")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Base URL of the shared server, with no database name appended.
///
/// Starts the container on first call unless `PADRON_TEST_PG_URL` points at
/// an external instance.
pub async fn pg_url() -> &'static str {
    &SHARED_PG.get_or_init(init_shared_pg).await.base_url
}

/// Single-connection pool to the `postgres` maintenance database, for
/// CREATE/DROP DATABASE statements.
async fn maint_pool() -> PgPool {
    let maint_url = format!("{}/postgres", pg_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&maint_url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a uniquely-named database with migrations applied.
///
/// Returns `(pool, db_name)`; pass `db_name` to [`drop_test_db`] when the
/// test is done.
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("padron_test_{}", Uuid::new_v4().simple());

    let maint = maint_pool().await;
    maint
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint.close().await;

    let temp_url = format!("{}/{db_name}", pg_url().await);
    let temp_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&temp_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e}"));

    pool::run_migrations(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a database created by [`create_test_db`].
///
/// Terminates lingering connections first; safe to call if the database is
/// already gone.
pub async fn drop_test_db(db_name: &str) {
    let maint = maint_pool().await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint.execute(terminate.as_str()).await;
    let _ = maint
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    maint.close().await;
}
