pub mod credit_note_repo;
pub mod customer_advance_repo;
pub mod invoice_repo;
pub mod payment_repo;
