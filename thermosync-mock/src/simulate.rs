use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use embedded_hal::digital::{ErrorType, OutputPin};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use thermosync_server::errors::SensorError;
use thermosync_server::services::{Reading, SensorReader};
use tokio::time::Instant;

use crate::settings::Simulation;

/// Relay output wired into a simulated room.
#[derive(Debug, Clone)]
pub struct SimulatedPin {
    state: Arc<AtomicBool>,
}

impl SimulatedPin {
    pub fn is_high(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }
}

impl ErrorType for SimulatedPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug)]
struct Climate {
    temperature: f64,
    humidity: f64,
    updated_at: Instant,
}

/// Lumped thermal model: the room relaxes towards the outdoor temperature,
/// the AC and the furnace add a constant rate while running.
#[derive(Debug, Clone)]
pub struct Room {
    params: Simulation,
    climate: Arc<Mutex<Climate>>,
    ac: Arc<AtomicBool>,
    heat: Arc<AtomicBool>,
    fan: Arc<AtomicBool>,
}

impl Room {
    pub fn new(params: &Simulation) -> Self {
        Self {
            params: params.clone(),
            climate: Arc::new(Mutex::new(Climate {
                temperature: params.initial_temp,
                humidity: params.humidity,
                updated_at: Instant::now(),
            })),
            ac: Arc::default(),
            heat: Arc::default(),
            fan: Arc::default(),
        }
    }

    /// Fan, AC and heat outputs, in that order.
    pub fn pins(&self) -> (SimulatedPin, SimulatedPin, SimulatedPin) {
        let pin = |state: &Arc<AtomicBool>| SimulatedPin {
            state: Arc::clone(state),
        };

        (pin(&self.fan), pin(&self.ac), pin(&self.heat))
    }

    pub fn sensor(&self) -> RoomSensor {
        RoomSensor::new(self.clone())
    }

    /// True climate, advanced to now.
    pub fn climate(&self) -> (f64, f64) {
        let mut climate = self.climate.lock().unwrap_or_else(|e| e.into_inner());
        self.advance(&mut climate, Instant::now());

        (climate.temperature, climate.humidity)
    }

    fn advance(&self, climate: &mut Climate, now: Instant) {
        let minutes =
            now.duration_since(climate.updated_at).as_secs_f64() / 60.0 * self.params.time_scale;
        climate.updated_at = now;
        if minutes <= 0.0 {
            return;
        }

        let ac = self.ac.load(Ordering::SeqCst);
        let heat = self.heat.load(Ordering::SeqCst);
        let mut forcing = 0.0;
        if ac {
            forcing -= self.params.ac_rate;
        }
        if heat {
            forcing += self.params.heat_rate;
        }

        let p = &self.params;
        climate.temperature = if p.leakage > 0.0 {
            let target = p.outdoor_temp + forcing / p.leakage;
            target + (climate.temperature - target) * (-p.leakage * minutes).exp()
        } else {
            climate.temperature + forcing * minutes
        };

        // The coil dries the air while cooling; otherwise humidity drifts back.
        let humidity_target = if ac { p.humidity - 15.0 } else { p.humidity };
        climate.humidity = (humidity_target
            + (climate.humidity - humidity_target) * (-0.05 * minutes).exp())
        .clamp(0.0, 100.0);
    }
}

/// Noisy sensor reading a [`Room`].
pub struct RoomSensor {
    room: Room,
    noise: Option<Normal<f64>>,
    rng: StdRng,
}

impl RoomSensor {
    fn new(room: Room) -> Self {
        let noise = Normal::new(0.0, room.params.noise)
            .inspect_err(|e| tracing::warn!("sensor noise disabled: {}", e))
            .ok();

        Self {
            room,
            noise,
            rng: StdRng::from_os_rng(),
        }
    }
}

#[async_trait]
impl SensorReader for RoomSensor {
    async fn read(&mut self) -> Result<Reading, SensorError> {
        let (temperature, humidity) = self.room.climate();
        let noise = match &self.noise {
            Some(normal) => normal.sample(&mut self.rng),
            None => 0.0,
        };

        tracing::trace!(temperature, humidity, "simulated reading");

        Ok(Reading {
            temperature: temperature + noise,
            humidity,
        })
    }
}
