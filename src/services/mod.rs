pub mod deal_service;
pub mod deal_store;
pub mod validation;
