//! Shared helpers for per-module migration safety integration tests.
//!
//! Every module migrates its own tables into the *same* physical Postgres
//! database (`gl-rs` owns `tenants`/`accounts`/`outbox_events`; `party-rs`
//! owns `customers`/`vendors`; `ar-rs`/`ap-rs`/`inventory-rs` reference both
//! without recreating them). Running every module's migrations against one
//! blank database, in dependency order, is the only way to catch a table or
//! index name collision before it reaches a shared environment.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;

/// Each module's migrations directory, in the order they must apply:
/// `gl-rs` first (it owns the tables every other module references),
/// then `party-rs` (owns customers/vendors), then the modules that
/// reference both.
pub const MODULE_MIGRATIONS: &[(&str, &str)] = &[
    ("gl", concat!(env!("CARGO_MANIFEST_DIR"), "/../../modules/gl/db/migrations")),
    ("party", concat!(env!("CARGO_MANIFEST_DIR"), "/../../modules/party/db/migrations")),
    ("ar", concat!(env!("CARGO_MANIFEST_DIR"), "/../../modules/ar/db/migrations")),
    ("ap", concat!(env!("CARGO_MANIFEST_DIR"), "/../../modules/ap/db/migrations")),
    ("inventory", concat!(env!("CARGO_MANIFEST_DIR"), "/../../modules/inventory/db/migrations")),
    ("integrations", concat!(env!("CARGO_MANIFEST_DIR"), "/../../modules/integrations/db/migrations")),
];

/// Runs one module's migrations against `pool`. Migrations are read at
/// runtime (not embedded at compile time via `sqlx::migrate!`) so this one
/// function can drive every module's directory in turn.
pub async fn apply_module_migrations(pool: &PgPool, migrations_dir: &str) -> Result<(), MigrateError> {
    let migrator = Migrator::new(std::path::Path::new(migrations_dir)).await?;
    migrator.run(pool).await
}

/// Applies every module's migrations, in `MODULE_MIGRATIONS` order, against
/// a single shared database. Safe to call repeatedly — `sqlx`'s own
/// `_sqlx_migrations` bookkeeping table skips migrations already applied.
pub async fn apply_all_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    for (_module, dir) in MODULE_MIGRATIONS {
        apply_module_migrations(pool, dir).await?;
    }
    Ok(())
}
