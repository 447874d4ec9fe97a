//! Client for the Ge.tt REST API (`open.ge.tt/1`).

pub mod client;
pub mod http_client;
pub mod models;
