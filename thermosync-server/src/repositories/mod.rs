mod mode;
mod setting;
mod zone;

pub use mode::ModeRepository;
pub use setting::{CreateOverrideRequest, OverrideTarget, SettingRepository};
pub use zone::ZoneRepository;
