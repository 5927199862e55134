use serde::{Deserialize, Serialize};

use super::Id;

/// Live snapshot of one zone, as reported to status readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStatus {
    /// Zone identifier
    pub zone_id: Id,
    /// Currently resolved setting, if the loop has resolved one yet
    pub setting_id: Option<Id>,
    /// Mode of the resolved setting
    pub mode_id: Option<Id>,
    /// Temperature in Fahrenheit
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// Apparent temperature in Fahrenheit
    pub heat_index: f64,
    /// Lower bound of the active band
    pub min_temp: Option<f64>,
    /// Upper bound of the active band
    pub max_temp: Option<f64>,
    /// Dead band half-width of the active band
    pub correction: Option<f64>,
    pub heat: bool,
    pub ac: bool,
    pub fan: bool,
}
