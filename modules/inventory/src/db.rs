pub use platform_sdk::init_pool;
