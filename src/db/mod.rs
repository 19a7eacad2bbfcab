//! PostgreSQL access: the bb8 pool of diesel-async connections and the
//! embedded schema migrations.

mod migrate;
mod pool;

pub use migrate::{pending_migrations, revert_migrations, run_pending_migrations};
pub use pool::{AsyncDbPool, MIGRATIONS, establish_async_connection_pool};
