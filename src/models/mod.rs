pub mod deal;
pub mod error;
