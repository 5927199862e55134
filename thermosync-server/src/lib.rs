pub mod app;
pub mod configs;
pub mod errors;
pub mod repositories;
pub mod services;

pub use app::{run, Adjustment, App, Hardware};
