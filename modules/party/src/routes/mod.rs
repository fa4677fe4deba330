pub mod customers;
pub mod vendors;
