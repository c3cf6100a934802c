pub mod errors;
pub mod models;
pub mod refresh;
pub mod service;
