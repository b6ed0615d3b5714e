pub mod auth;
pub mod ingest;
pub mod query;
pub mod status;
