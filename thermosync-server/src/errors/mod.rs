pub mod config;
pub mod hvac;
pub mod mode;
pub mod sensor;
pub mod setting;
pub mod store;
pub mod zone;

pub use config::ConfigError;
pub use hvac::HvacError;
pub use mode::ModeError;
pub use sensor::SensorError;
pub use setting::SettingError;
pub use store::StoreError;
pub use zone::ZoneError;
