pub mod account_activity_repo;
pub mod ap_aging_repo;
pub mod ar_aging_repo;
pub mod balance_sheet_repo;
pub mod pl_repo;
