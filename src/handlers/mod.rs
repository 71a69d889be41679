pub mod analytics;
pub mod brand;
pub mod inventory;
pub mod product;
pub mod sale;
