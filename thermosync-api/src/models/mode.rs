use serde::{Deserialize, Serialize};

use super::Id;
use crate::error::ValidationError;

/// Mode every zone falls back to through its `Default` setting.
pub const DEFAULT_MODE_NAME: &str = "default";
/// Mode rewritten by temporary overrides.
pub const CUSTOM_MODE_NAME: &str = "custom";

const MIN_NAME_LENGTH: usize = 2;
const MIN_BAND: f64 = 2.0;
const MIN_CORRECTION: f64 = 0.5;

/// Named temperature band for one zone, in degrees Fahrenheit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    /// Mode identifier
    pub id: Id,
    /// Owning zone identifier
    pub zone_id: Id,
    /// Mode name
    pub name: String,
    /// Heating trigger
    pub min_temp: f64,
    /// Cooling trigger
    pub max_temp: f64,
    /// Half-width of the dead band inside `[min_temp, max_temp]`
    pub correction: f64,
}

/// Global limits every mode is clamped to when read back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureBounds {
    pub min_temp: f64,
    pub max_temp: f64,
}

impl Default for TemperatureBounds {
    fn default() -> Self {
        Self {
            min_temp: 60.0,
            max_temp: 85.0,
        }
    }
}

impl Mode {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_band(&self.name, self.min_temp, self.max_temp, self.correction)
    }

    pub fn is_reserved(&self) -> bool {
        is_reserved_name(&self.name)
    }

    /// Pulls a stored mode back inside the global bounds.
    ///
    /// Stored data is trusted, so this never fails: a band that collapses
    /// after clamping is replaced by the bounds themselves, and the correction
    /// is forced into `[0.5, band / 2]`.
    pub fn clamp_to(mut self, bounds: &TemperatureBounds) -> Self {
        self.min_temp = self.min_temp.max(bounds.min_temp);
        self.max_temp = self.max_temp.min(bounds.max_temp);
        if !(self.max_temp - self.min_temp >= MIN_BAND) {
            self.min_temp = bounds.min_temp;
            self.max_temp = bounds.max_temp;
        }
        if !(self.correction >= MIN_CORRECTION) {
            self.correction = MIN_CORRECTION;
        }
        let half_band = (self.max_temp - self.min_temp) / 2.0;
        if self.correction > half_band {
            self.correction = half_band;
        }
        self
    }

    /// The same band moved by `delta` degrees.
    pub fn shifted(&self, delta: f64) -> Self {
        Self {
            min_temp: self.min_temp + delta,
            max_temp: self.max_temp + delta,
            ..self.clone()
        }
    }
}

pub fn is_reserved_name(name: &str) -> bool {
    name == DEFAULT_MODE_NAME || name == CUSTOM_MODE_NAME
}

fn validate_band(
    name: &str,
    min_temp: f64,
    max_temp: f64,
    correction: f64,
) -> Result<(), ValidationError> {
    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(ValidationError::NameTooShort);
    }
    // Negated comparisons so NaN never passes.
    if !(max_temp - min_temp >= MIN_BAND) {
        return Err(ValidationError::TemperatureRange);
    }
    if !(correction >= MIN_CORRECTION) {
        return Err(ValidationError::CorrectionTooSmall);
    }
    if correction * 2.0 > max_temp - min_temp {
        return Err(ValidationError::CorrectionTooLarge);
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModeRequest {
    /// Owning zone identifier
    pub zone_id: Id,
    /// Mode name
    pub name: String,
    /// Heating trigger
    pub min_temp: f64,
    /// Cooling trigger
    pub max_temp: f64,
    /// Dead band half-width
    pub correction: f64,
}

impl CreateModeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_band(&self.name, self.min_temp, self.max_temp, self.correction)?;
        if is_reserved_name(&self.name) {
            return Err(ValidationError::ReservedName(self.name.clone()));
        }

        Ok(())
    }

    pub fn into_mode(self, id: Id) -> Mode {
        Mode {
            id,
            zone_id: self.zone_id,
            name: self.name,
            min_temp: self.min_temp,
            max_temp: self.max_temp,
            correction: self.correction,
        }
    }
}

/// Full replacement of a mode's editable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateModeRequest {
    /// New mode name
    pub name: String,
    /// New heating trigger
    pub min_temp: f64,
    /// New cooling trigger
    pub max_temp: f64,
    /// New dead band half-width
    pub correction: f64,
}

impl UpdateModeRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_band(&self.name, self.min_temp, self.max_temp, self.correction)?;
        if is_reserved_name(&self.name) {
            return Err(ValidationError::ReservedName(self.name.clone()));
        }

        Ok(())
    }

    pub fn apply(self, mode: &mut Mode) {
        mode.name = self.name;
        mode.min_temp = self.min_temp;
        mode.max_temp = self.max_temp;
        mode.correction = self.correction;
    }
}
