pub use super::deals::Entity as Deals;
