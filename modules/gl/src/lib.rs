pub mod config;
pub mod consumer;
pub mod contracts;
pub mod db;
pub mod dlq;
pub mod health;
pub mod posting;
pub mod repos;
pub mod routes;
pub mod services;
pub mod validation;

pub use consumer::gl_posting_consumer::start_gl_posting_consumer;
pub use consumer::gl_reversal_consumer::start_gl_reversal_consumer;
pub use consumer::projection_worker::start_projection_worker;
