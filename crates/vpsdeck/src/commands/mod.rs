pub mod action;
pub mod cache;
pub mod catalog;
pub mod instances;
pub mod providers;
pub mod validate;
