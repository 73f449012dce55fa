pub mod audit;
pub mod booking;
pub mod error;
pub mod guard;
pub mod query;
pub mod quote;
pub mod service;
pub mod utils;
