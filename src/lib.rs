pub mod config;
pub mod database;
pub mod dtos;
pub mod error;
pub mod etl;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
