pub mod gl_posting_consumer;
pub mod gl_reversal_consumer;
pub mod projection_worker;
