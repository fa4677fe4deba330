pub mod adjustment_service;
pub mod item_service;
pub mod location_service;
pub mod move_service;
pub mod recalc_service;
pub mod valuation_service;
