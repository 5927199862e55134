pub mod climate;
pub mod error;
pub mod models;
pub mod schedule;

pub use error::ValidationError;
