pub mod credit_note_service;
pub mod customer_advance_service;
pub mod invoice_service;
pub mod payment_service;
