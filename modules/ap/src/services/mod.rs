pub mod ap_payment_service;
pub mod bill_service;
pub mod vendor_advance_service;
pub mod vendor_credit_service;
