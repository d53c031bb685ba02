//! Minimal paste hosting: upload text or a file, get a link back, delete it
//! later with the secret handed out at upload time.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use errors::PasteError;
pub use routes::routes::app;
pub use state::{AppState, PasteSettings};
