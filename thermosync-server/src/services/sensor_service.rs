use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::configs::SensorSettings;
use crate::errors::SensorError;

/// Climate sample: temperature in °F, relative humidity in %.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
}

impl Reading {
    /// Placeholder before the first successful read. NaN fails every
    /// comparison, so the control loop leaves the relays alone.
    pub const UNKNOWN: Reading = Reading {
        temperature: f64::NAN,
        humidity: f64::NAN,
    };
}

/// Source of zone readings used by the control loop.
#[async_trait]
pub trait Sensor: Send + Sync {
    async fn temperature(&self) -> f64;
    async fn humidity(&self) -> f64;
}

/// Hardware driver behind a [`CachedSensor`].
#[async_trait]
pub trait SensorReader: Send {
    async fn read(&mut self) -> Result<Reading, SensorError>;
}

struct CacheState<R> {
    reader: R,
    reading: Reading,
    read_at: Option<Instant>,
}

/// Debounces a slow driver: one bus read per `cache_ttl`, calibration
/// offsets applied, last good reading kept on failure.
pub struct CachedSensor<R> {
    state: Mutex<CacheState<R>>,
    ttl: Duration,
    temperature_correction: f64,
    humidity_correction: f64,
}

impl<R: SensorReader> CachedSensor<R> {
    pub fn new(reader: R, settings: &SensorSettings) -> Self {
        Self {
            state: Mutex::new(CacheState {
                reader,
                reading: Reading::UNKNOWN,
                read_at: None,
            }),
            ttl: Duration::from_secs(settings.cache_ttl),
            temperature_correction: settings.temperature_correction,
            humidity_correction: settings.humidity_correction,
        }
    }

    pub async fn reading(&self) -> Reading {
        let mut state = self.state.lock().await;
        if let Some(read_at) = state.read_at {
            if read_at.elapsed() < self.ttl {
                return state.reading;
            }
        }

        match state.reader.read().await {
            Ok(raw) => {
                state.reading = Reading {
                    temperature: raw.temperature + self.temperature_correction,
                    humidity: raw.humidity + self.humidity_correction,
                };
                state.read_at = Some(Instant::now());
            }
            Err(e) => tracing::warn!("failed to read sensor, keeping last reading: {}", e),
        }

        state.reading
    }
}

#[async_trait]
impl<R: SensorReader> Sensor for CachedSensor<R> {
    async fn temperature(&self) -> f64 {
        self.reading().await.temperature
    }

    async fn humidity(&self) -> f64 {
        self.reading().await.humidity
    }
}
