// State management module
// Handles SQLite persistence and file system operations

pub mod db;
pub mod models;
pub mod queries;
pub mod storage;

pub use db::{init_db, init_db_in_memory, DbConnection, DbError};
pub use models::{to_dto, to_entity, NewPlayerPerformance, PlayerPerformance, PlayerPerformanceDto};
pub use queries::{create_performance, get_performance, list_performances};
