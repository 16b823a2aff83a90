pub mod backup;
pub mod handle;
pub mod manager;
pub mod migrate;
pub mod queries;
pub mod schema;
pub mod stats;
pub mod status;
