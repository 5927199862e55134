use std::sync::Arc;

use async_trait::async_trait;
use embedded_hal::digital::OutputPin;
use tokio::sync::Mutex;
use tokio::time::{self, Duration, Instant};

use crate::configs::Hvac;
use crate::errors::HvacError;

/// Relay outputs of one air handler.
///
/// Setters return the state the relay is actually in afterwards, so a refused
/// request is visible to the caller without being an error.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn fan(&self) -> bool;
    async fn ac(&self) -> bool;
    async fn heat(&self) -> bool;
    async fn set_fan(&self, on: bool) -> bool;
    async fn set_ac(&self, on: bool) -> bool;
    async fn set_heat(&self, on: bool) -> bool;
    /// Drives every relay low and drops pending fan changes.
    async fn reset(&self) -> Result<(), HvacError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relay {
    Fan,
    Ac,
    Heat,
}

impl Relay {
    pub fn name(self) -> &'static str {
        match self {
            Relay::Fan => "fan",
            Relay::Ac => "ac",
            Relay::Heat => "heat",
        }
    }
}

/// Relays that move heat and must never run together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Cooling,
    Heating,
}

impl Stage {
    fn relay(self) -> Relay {
        match self {
            Stage::Cooling => Relay::Ac,
            Stage::Heating => Relay::Heat,
        }
    }

    fn opposite(self) -> Stage {
        match self {
            Stage::Cooling => Stage::Heating,
            Stage::Heating => Stage::Cooling,
        }
    }
}

struct Output<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Output<P> {
    fn new(pin: P) -> Self {
        Self { pin, on: false }
    }

    fn drive(&mut self, on: bool) -> Result<(), P::Error> {
        if on {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.on = on;

        Ok(())
    }
}

struct Relays<P> {
    fan: Output<P>,
    ac: Output<P>,
    heat: Output<P>,
    /// Last time ac or heat was switched on
    last_engaged: Option<Instant>,
    /// Bumped by reset; delayed fan changes from an older epoch are dropped
    epoch: u64,
}

impl<P: OutputPin> Relays<P> {
    fn stage(&self, stage: Stage) -> bool {
        match stage {
            Stage::Cooling => self.ac.on,
            Stage::Heating => self.heat.on,
        }
    }

    fn set_fan(&mut self, on: bool) -> bool {
        if self.fan.on == on {
            return on;
        }
        if !on && (self.ac.on || self.heat.on) {
            tracing::debug!("keeping fan on while ac or heat is running");
            return self.fan.on;
        }
        if let Err(e) = self.fan.drive(on) {
            tracing::error!("failed to switch fan {}: {:?}", on_off(on), e);
        }

        self.fan.on
    }

    /// Returns whether the stage actually changed.
    fn set_stage(&mut self, stage: Stage, on: bool, switch_interval: Duration) -> bool {
        let opposite_on = self.stage(stage.opposite());
        let output = match stage {
            Stage::Cooling => &mut self.ac,
            Stage::Heating => &mut self.heat,
        };
        if output.on == on {
            return false;
        }

        if on {
            if opposite_on {
                tracing::error!(
                    "refusing to turn {} on while {} is on",
                    stage.relay().name(),
                    stage.opposite().relay().name()
                );
                return false;
            }
            if let Some(last) = self.last_engaged {
                let elapsed = last.elapsed();
                if elapsed < switch_interval {
                    tracing::warn!(
                        "refusing to turn {} on, last engagement was {}s ago (minimum {}s)",
                        stage.relay().name(),
                        elapsed.as_secs(),
                        switch_interval.as_secs()
                    );
                    return false;
                }
            }
        }

        if let Err(e) = output.drive(on) {
            tracing::error!("failed to switch {} {}: {:?}", stage.relay().name(), on_off(on), e);
            return false;
        }
        if on {
            self.last_engaged = Some(Instant::now());
        }

        true
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

/// Relay controller enforcing the heat/cool interlock, the compressor dwell
/// time and the fan purge delays.
pub struct HvacController<P> {
    relays: Arc<Mutex<Relays<P>>>,
    switch_interval: Duration,
    fan_on_delay: Duration,
    fan_off_delay: Duration,
}

impl<P> HvacController<P>
where
    P: OutputPin + Send + 'static,
{
    pub fn new(fan: P, ac: P, heat: P, hvac: &Hvac) -> Self {
        Self {
            relays: Arc::new(Mutex::new(Relays {
                fan: Output::new(fan),
                ac: Output::new(ac),
                heat: Output::new(heat),
                last_engaged: None,
                epoch: 0,
            })),
            switch_interval: Duration::from_secs(hvac.switch_interval),
            fan_on_delay: Duration::from_secs(hvac.fan_on_delay),
            fan_off_delay: Duration::from_secs(hvac.fan_off_delay),
        }
    }

    async fn switch_stage(&self, stage: Stage, on: bool) -> bool {
        let mut relays = self.relays.lock().await;
        if relays.set_stage(stage, on, self.switch_interval) {
            tracing::info!("{} {}", stage.relay().name(), on_off(on));

            let delay = if on { self.fan_on_delay } else { self.fan_off_delay };
            self.schedule_fan(on, delay, relays.epoch);
        }

        relays.stage(stage)
    }

    fn schedule_fan(&self, on: bool, delay: Duration, epoch: u64) {
        let relays = Arc::clone(&self.relays);
        tokio::spawn(async move {
            time::sleep(delay).await;

            let mut relays = relays.lock().await;
            if relays.epoch != epoch {
                tracing::debug!("dropping fan change queued before reset");
                return;
            }
            relays.set_fan(on);
        });
    }

    async fn apply(&self, relay: Relay, on: bool) -> bool {
        match relay {
            Relay::Fan => self.set_fan(on).await,
            Relay::Ac => self.set_ac(on).await,
            Relay::Heat => self.set_heat(on).await,
        }
    }

    /// Power-on self test, walking every relay through a full cycle. Each
    /// step waits out the dwell time so no refusal is expected.
    pub async fn self_test(&self) -> Result<(), HvacError> {
        const STEPS: &[(&str, &[(Relay, bool)])] = &[
            ("fan on", &[(Relay::Fan, true)]),
            ("ac on", &[(Relay::Ac, true)]),
            ("ac off", &[(Relay::Ac, false)]),
            ("heat on", &[(Relay::Fan, true), (Relay::Heat, true)]),
            ("heat off", &[(Relay::Heat, false)]),
            ("fan off", &[(Relay::Fan, false)]),
        ];

        let pause = self.switch_interval + Duration::from_secs(1);
        for (index, &(step, actions)) in STEPS.iter().enumerate() {
            if index > 0 {
                time::sleep(pause).await;
            }

            tracing::info!("self test: {}", step);
            for &(relay, on) in actions {
                if self.apply(relay, on).await != on {
                    return Err(HvacError::SelfTest {
                        step,
                        relay: relay.name(),
                        expected: on,
                    });
                }
            }
        }

        tracing::info!("self test passed");

        Ok(())
    }
}

#[async_trait]
impl<P> Controller for HvacController<P>
where
    P: OutputPin + Send + 'static,
{
    async fn fan(&self) -> bool {
        self.relays.lock().await.fan.on
    }

    async fn ac(&self) -> bool {
        self.relays.lock().await.ac.on
    }

    async fn heat(&self) -> bool {
        self.relays.lock().await.heat.on
    }

    async fn set_fan(&self, on: bool) -> bool {
        self.relays.lock().await.set_fan(on)
    }

    async fn set_ac(&self, on: bool) -> bool {
        self.switch_stage(Stage::Cooling, on).await
    }

    async fn set_heat(&self, on: bool) -> bool {
        self.switch_stage(Stage::Heating, on).await
    }

    async fn reset(&self) -> Result<(), HvacError> {
        let mut guard = self.relays.lock().await;
        let relays = &mut *guard;
        relays.epoch = relays.epoch.wrapping_add(1);

        // Every pin is driven even when an earlier one fails
        let mut result = Ok(());
        for (relay, output) in [
            (Relay::Ac, &mut relays.ac),
            (Relay::Heat, &mut relays.heat),
            (Relay::Fan, &mut relays.fan),
        ] {
            if let Err(e) = output.drive(false) {
                tracing::error!("failed to switch {} off during reset: {:?}", relay.name(), e);
                if result.is_ok() {
                    result = Err(HvacError::Pin {
                        relay: relay.name(),
                        message: format!("{e:?}"),
                    });
                }
            }
        }

        result
    }
}
