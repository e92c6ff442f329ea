pub mod config;
pub mod environment;
pub mod errors;
pub mod info;
pub mod log;
pub mod persistence;
pub mod record;
pub mod resource;
pub mod routes;
pub mod schema;
pub mod store;
