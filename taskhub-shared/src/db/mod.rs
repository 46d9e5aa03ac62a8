/// Database access
///
/// - `pool`: PostgreSQL connection pool management
/// - `migrations`: embedded migration runner

pub mod migrations;
pub mod pool;
