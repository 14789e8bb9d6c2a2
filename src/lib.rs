pub mod app;
pub mod chat;
pub mod config;
pub mod enrich;
pub mod error;
pub mod fake_feed;
pub mod feed;
pub mod fixture;
pub mod http_client;
pub mod hub;
pub mod interpret;
pub mod routes;
pub mod state;
pub mod upstream;
