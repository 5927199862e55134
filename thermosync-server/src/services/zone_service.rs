use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thermosync_api::climate::heat_index;
use thermosync_api::models::{Id, Mode, Setting, TemperatureBounds, ZoneInfo, ZoneStatus};
use thermosync_api::schedule::resolve;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::configs::{Control, MAX_DELAY};
use crate::errors::ZoneError;
use crate::services::activity_service::{ActivityLog, ActivityRecord};
use crate::services::clock_service::Clock;
use crate::services::hvac_service::Controller;
use crate::services::sensor_service::Sensor;

/// A second fault inside this window stops the zone for good.
const ESCALATION_WINDOW: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Idle,
    Heating,
    Cooling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Hold,
    EngageCooling,
    DisengageCooling,
    EngageHeating,
    DisengageHeating,
}

/// Hysteresis step. A running stage stops once the temperature is back
/// `correction` degrees inside the band; an idle zone starts a stage only
/// once the temperature leaves the band.
pub fn decide(state: ZoneState, temp: f64, mode: &Mode) -> Action {
    match state {
        ZoneState::Cooling if temp <= mode.max_temp - mode.correction => Action::DisengageCooling,
        ZoneState::Heating if temp >= mode.min_temp + mode.correction => Action::DisengageHeating,
        ZoneState::Idle if temp > mode.max_temp => Action::EngageCooling,
        ZoneState::Idle if temp < mode.min_temp => Action::EngageHeating,
        _ => Action::Hold,
    }
}

/// Resolved setting and its mode, clamped to the global bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSetting {
    pub setting: Setting,
    pub mode: Mode,
}

/// Settings of one zone together with the modes they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    pub settings: Vec<Setting>,
    pub modes: Vec<Mode>,
}

impl Schedule {
    fn mode(&self, id: Id) -> Option<&Mode> {
        self.modes.iter().find(|mode| mode.id == id)
    }
}

/// Everything a zone loop needs besides its own hardware.
#[derive(Clone)]
pub struct ZoneContext {
    pub clock: Arc<dyn Clock>,
    pub activity: Arc<dyn ActivityLog>,
    pub bounds: TemperatureBounds,
    pub interval: Duration,
}

impl ZoneContext {
    pub fn new(clock: Arc<dyn Clock>, activity: Arc<dyn ActivityLog>, control: &Control) -> Self {
        Self {
            clock,
            activity,
            bounds: control.bounds(),
            interval: Duration::from_secs(control.interval.clamp(1, MAX_DELAY)),
        }
    }
}

/// Cloneable access to a running zone.
#[derive(Clone)]
pub struct ZoneHandle {
    info: ZoneInfo,
    controller: Arc<dyn Controller>,
    sensor: Arc<dyn Sensor>,
    updates: mpsc::Sender<Schedule>,
    active: watch::Receiver<Option<ActiveSetting>>,
}

impl ZoneHandle {
    pub fn id(&self) -> Id {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn controller(&self) -> Arc<dyn Controller> {
        Arc::clone(&self.controller)
    }

    pub fn sensor(&self) -> Arc<dyn Sensor> {
        Arc::clone(&self.sensor)
    }

    pub fn active(&self) -> Option<ActiveSetting> {
        self.active.borrow().clone()
    }

    pub fn setting(&self) -> Option<Setting> {
        self.active().map(|active| active.setting)
    }

    pub fn mode(&self) -> Option<Mode> {
        self.active().map(|active| active.mode)
    }

    /// Replaces the zone's schedule snapshot. Waits while a previous
    /// snapshot has not been picked up yet.
    pub async fn update(&self, schedule: Schedule) -> Result<(), ZoneError> {
        self.updates
            .send(schedule)
            .await
            .map_err(|_| ZoneError::Stopped(self.info.id))
    }

    /// Resolves once the loop publishes a setting matching `predicate`.
    pub async fn wait_for_setting<F>(&self, mut predicate: F) -> Result<ActiveSetting, ZoneError>
    where
        F: FnMut(&ActiveSetting) -> bool,
    {
        let mut active = self.active.clone();
        let current = active
            .wait_for(|current| current.as_ref().is_some_and(&mut predicate))
            .await
            .map_err(|_| ZoneError::Stopped(self.info.id))?;

        current.clone().ok_or(ZoneError::NoActiveSetting(self.info.id))
    }

    pub async fn status(&self) -> ZoneStatus {
        let active = self.active();
        let temperature = self.sensor.temperature().await;
        let humidity = self.sensor.humidity().await;

        ZoneStatus {
            zone_id: self.info.id,
            setting_id: active.as_ref().map(|active| active.setting.id),
            mode_id: active.as_ref().map(|active| active.mode.id),
            temperature,
            humidity,
            heat_index: heat_index(temperature, humidity),
            min_temp: active.as_ref().map(|active| active.mode.min_temp),
            max_temp: active.as_ref().map(|active| active.mode.max_temp),
            correction: active.as_ref().map(|active| active.mode.correction),
            heat: self.controller.heat().await,
            ac: self.controller.ac().await,
            fan: self.controller.fan().await,
        }
    }
}

/// Control loop of one zone. Owned by its supervisor task.
pub struct Zone {
    info: ZoneInfo,
    controller: Arc<dyn Controller>,
    sensor: Arc<dyn Sensor>,
    context: ZoneContext,
    updates: mpsc::Receiver<Schedule>,
    active: watch::Sender<Option<ActiveSetting>>,
    shutdown: watch::Receiver<bool>,
    /// Latest snapshot, kept across restarts
    schedule: Option<Schedule>,
}

impl Zone {
    pub fn new(
        info: ZoneInfo,
        controller: Arc<dyn Controller>,
        sensor: Arc<dyn Sensor>,
        context: ZoneContext,
        shutdown: watch::Receiver<bool>,
    ) -> (Zone, ZoneHandle) {
        let (update_sender, update_receiver) = mpsc::channel(1);
        let (active_sender, active_receiver) = watch::channel(None);

        let handle = ZoneHandle {
            info: info.clone(),
            controller: Arc::clone(&controller),
            sensor: Arc::clone(&sensor),
            updates: update_sender,
            active: active_receiver,
        };
        let zone = Zone {
            info,
            controller,
            sensor,
            context,
            updates: update_receiver,
            active: active_sender,
            shutdown,
            schedule: None,
        };

        (zone, handle)
    }

    /// Runs the loop until shutdown, restarting it after a fault. A second
    /// fault within an hour of the previous one ends the zone with
    /// [`ZoneError::Escalated`].
    pub async fn supervise(mut self) -> Result<(), ZoneError> {
        let zone_id = self.info.id;
        let mut last_fault: Option<Instant> = None;

        loop {
            let result = match self.controller.reset().await {
                Ok(()) => AssertUnwindSafe(self.run())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(ZoneError::Panicked(panic_message(panic)))),
                Err(e) => Err(e.into()),
            };

            let fault = match result {
                Ok(()) => {
                    if let Err(e) = self.controller.reset().await {
                        tracing::error!(zone_id, "failed to reset relays on shutdown: {}", e);
                    }
                    tracing::info!(zone_id, "zone \"{}\" stopped", self.info.name);
                    return Ok(());
                }
                Err(fault) => fault,
            };

            tracing::error!(zone_id, "control loop failed: {}", fault);

            let now = Instant::now();
            if let Some(previous) = last_fault {
                if now.duration_since(previous) < ESCALATION_WINDOW {
                    if let Err(e) = self.controller.reset().await {
                        tracing::error!(zone_id, "failed to reset relays: {}", e);
                    }
                    return Err(ZoneError::Escalated {
                        zone_id,
                        last: fault.to_string(),
                    });
                }
            }
            last_fault = Some(now);

            tracing::warn!(zone_id, "restarting control loop");
        }
    }

    async fn run(&mut self) -> Result<(), ZoneError> {
        if self.schedule.is_none() {
            tokio::select! {
                update = self.updates.recv() => match update {
                    Some(schedule) => self.schedule = Some(schedule),
                    None => return Ok(()),
                },
                _ = stopped(&mut self.shutdown) => return Ok(()),
            }
        }

        let mut temp = self.sensor.temperature().await;
        let mut state = ZoneState::Idle;
        let interval = self.context.interval;
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            state = self.iterate(state, temp).await?;

            tokio::select! {
                update = self.updates.recv() => match update {
                    Some(schedule) => {
                        tracing::debug!(
                            zone_id = self.info.id,
                            "received {} settings",
                            schedule.settings.len()
                        );
                        self.schedule = Some(schedule);
                    }
                    None => {
                        tracing::warn!(zone_id = self.info.id, "update channel closed");
                        return Ok(());
                    }
                },
                _ = ticker.tick() => temp = self.sensor.temperature().await,
                _ = stopped(&mut self.shutdown) => return Ok(()),
            }
        }
    }

    async fn iterate(&mut self, state: ZoneState, temp: f64) -> Result<ZoneState, ZoneError> {
        let Some(active) = self.refresh_active()? else {
            tracing::warn!(zone_id = self.info.id, "no setting applies, holding relays");
            self.record(temp).await;
            return Ok(state);
        };

        let action = decide(state, temp, &active.mode);
        let next = self.apply(state, action).await;
        if next != state {
            tracing::info!(
                zone_id = self.info.id,
                "{:?} -> {:?} at {:.1}°F (band {:.1}..{:.1}, correction {:.1})",
                state,
                next,
                temp,
                active.mode.min_temp,
                active.mode.max_temp,
                active.mode.correction
            );
        }
        self.record(temp).await;

        Ok(next)
    }

    /// Resolves the snapshot at the current time and publishes the result.
    /// Keeps the previous setting when nothing resolves.
    fn refresh_active(&mut self) -> Result<Option<ActiveSetting>, ZoneError> {
        let now = self.context.clock.now();
        let previous = self.active.borrow().clone();
        let Some(schedule) = self.schedule.as_ref() else {
            return Ok(previous);
        };

        let Some(setting) = resolve(&schedule.settings, now).cloned() else {
            return Ok(previous);
        };

        let mode = schedule
            .mode(setting.mode_id)
            .cloned()
            .ok_or(ZoneError::ModeNotFound {
                setting_id: setting.id,
                mode_id: setting.mode_id,
            })?
            .clamp_to(&self.context.bounds);

        if previous.as_ref().map(|p| p.setting.id) != Some(setting.id) {
            tracing::info!(
                zone_id = self.info.id,
                "switching to {} setting {} with mode \"{}\"",
                setting.priority,
                setting.id,
                mode.name
            );
        }

        let active = ActiveSetting { setting, mode };
        self.active.send_replace(Some(active.clone()));

        Ok(Some(active))
    }

    async fn apply(&self, state: ZoneState, action: Action) -> ZoneState {
        match action {
            Action::Hold => state,
            Action::EngageCooling | Action::DisengageCooling => {
                let on = self.controller.set_ac(action == Action::EngageCooling).await;
                if on { ZoneState::Cooling } else { ZoneState::Idle }
            }
            Action::EngageHeating | Action::DisengageHeating => {
                let on = self.controller.set_heat(action == Action::EngageHeating).await;
                if on { ZoneState::Heating } else { ZoneState::Idle }
            }
        }
    }

    async fn record(&self, temperature: f64) {
        let record = ActivityRecord {
            timestamp: self.context.clock.now(),
            zone_id: self.info.id,
            fan: self.controller.fan().await,
            ac: self.controller.ac().await,
            heat: self.controller.heat().await,
            temperature,
            humidity: self.sensor.humidity().await,
        };

        self.context.activity.record(&record);
    }
}

/// Resolves once shutdown is requested or its sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode() -> Mode {
        Mode {
            id: 1,
            zone_id: 1,
            name: "comfort".to_string(),
            min_temp: 70.0,
            max_temp: 75.0,
            correction: 2.0,
        }
    }

    #[test]
    fn test_idle_starts_outside_band() {
        let mode = mode();

        assert_eq!(decide(ZoneState::Idle, 75.5, &mode), Action::EngageCooling);
        assert_eq!(decide(ZoneState::Idle, 69.5, &mode), Action::EngageHeating);
        assert_eq!(decide(ZoneState::Idle, 75.0, &mode), Action::Hold);
        assert_eq!(decide(ZoneState::Idle, 70.0, &mode), Action::Hold);
        assert_eq!(decide(ZoneState::Idle, 72.5, &mode), Action::Hold);
    }

    #[test]
    fn test_cooling_stops_inside_correction() {
        let mode = mode();

        assert_eq!(decide(ZoneState::Cooling, 74.0, &mode), Action::Hold);
        assert_eq!(decide(ZoneState::Cooling, 73.1, &mode), Action::Hold);
        assert_eq!(decide(ZoneState::Cooling, 73.0, &mode), Action::DisengageCooling);
        assert_eq!(decide(ZoneState::Cooling, 60.0, &mode), Action::DisengageCooling);
    }

    #[test]
    fn test_heating_stops_inside_correction() {
        let mode = mode();

        assert_eq!(decide(ZoneState::Heating, 71.9, &mode), Action::Hold);
        assert_eq!(decide(ZoneState::Heating, 72.0, &mode), Action::DisengageHeating);
        assert_eq!(decide(ZoneState::Heating, 80.0, &mode), Action::DisengageHeating);
    }

    #[test]
    fn test_unknown_temperature_holds() {
        let mode = mode();

        for state in [ZoneState::Idle, ZoneState::Heating, ZoneState::Cooling] {
            assert_eq!(decide(state, f64::NAN, &mode), Action::Hold);
        }
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("sensor bus hung")), "sensor bus hung");
        assert_eq!(panic_message(Box::new(String::from("bad"))), "bad");
        assert_eq!(panic_message(Box::new(42)), "unknown panic");
    }
}
