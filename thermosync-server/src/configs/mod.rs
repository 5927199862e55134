pub mod schema;
pub mod settings;
pub mod storage;

pub use schema::SchemaManager;
pub use settings::{
    Control, Database, Hvac, Logger, Report, SensorSettings, Settings, ZoneConfig, MAX_DELAY,
    MAX_OVERRIDE_HOLD,
};
pub use storage::Storage;
