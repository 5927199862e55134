mod mode;
mod setting;
mod status;
mod zone;

pub use mode::*;
pub use setting::*;
pub use status::*;
pub use zone::*;

pub type Id = i64;
