pub mod codec;
pub mod error;
pub mod models;
pub mod portal;
pub mod scoring;
pub mod services;
pub mod store;
