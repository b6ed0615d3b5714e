pub mod api;
pub mod config;
pub mod core_state;
pub mod dataset;
pub mod engine;
pub mod lifecycle;
pub mod query;
pub mod table;
pub mod users;

pub use core_state::CoreState;
