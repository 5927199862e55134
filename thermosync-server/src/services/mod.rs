pub mod activity_service;
pub mod clock_service;
pub mod hvac_service;
pub mod registry_service;
pub mod sensor_service;
pub mod zone_service;

pub use activity_service::{ActivityLog, ActivityRecord, CsvActivityLog, TracingActivityLog};
pub use clock_service::{Clock, LocalZone, ManualClock, SystemClock};
pub use hvac_service::{Controller, HvacController, Relay};
pub use registry_service::ZoneRegistry;
pub use sensor_service::{CachedSensor, Reading, Sensor, SensorReader};
pub use zone_service::{
    decide, Action, ActiveSetting, Schedule, Zone, ZoneContext, ZoneHandle, ZoneState,
};
