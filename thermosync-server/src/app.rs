use std::sync::Arc;

use anyhow::Context;
use thermosync_api::models::{Id, Setting, ZoneInfo, ALL_DAYS};
use thermosync_api::schedule::override_until;
use time::OffsetDateTime;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::errors::ZoneError;
use crate::repositories::{
    CreateOverrideRequest, ModeRepository, OverrideTarget, SettingRepository, ZoneRepository,
};
use crate::services::{
    ActivityLog, Clock, Controller, CsvActivityLog, Schedule, Sensor, TracingActivityLog, Zone,
    ZoneContext, ZoneHandle, ZoneRegistry,
};

/// Devices driving one zone.
#[derive(Clone)]
pub struct Hardware {
    pub controller: Arc<dyn Controller>,
    pub sensor: Arc<dyn Sensor>,
}

/// Temporary change requested for a zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    /// Move the active band by this many degrees
    Shift(f64),
    /// Switch to an existing mode of the zone
    Mode(Id),
}

type ZoneTask = (Id, Result<(), ZoneError>);

/// Service root: owns the store, the registry and every zone task.
pub struct App {
    settings: Arc<Settings>,
    zones: ZoneRepository,
    modes: ModeRepository,
    schedule: SettingRepository,
    registry: Arc<ZoneRegistry>,
    clock: Arc<dyn Clock>,
    activity: Arc<dyn ActivityLog>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<JoinSet<ZoneTask>>,
}

impl App {
    /// Activity goes to the configured report file, or to the log.
    pub fn new(
        settings: Arc<Settings>,
        storage: Arc<Storage>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let activity: Arc<dyn ActivityLog> = match &settings.report.path {
            Some(path) => Arc::new(
                CsvActivityLog::create(path)
                    .with_context(|| format!("failed to open report file {path}"))?,
            ),
            None => Arc::new(TracingActivityLog),
        };

        Ok(Self::with_activity(settings, storage, clock, activity))
    }

    pub fn with_activity(
        settings: Arc<Settings>,
        storage: Arc<Storage>,
        clock: Arc<dyn Clock>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);

        Self {
            settings,
            zones: ZoneRepository::new(storage.clone()),
            modes: ModeRepository::new(storage.clone()),
            schedule: SettingRepository::new(storage),
            registry: Arc::new(ZoneRegistry::new()),
            clock,
            activity,
            shutdown,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn registry(&self) -> Arc<ZoneRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn zones(&self) -> &ZoneRepository {
        &self.zones
    }

    pub fn modes(&self) -> &ModeRepository {
        &self.modes
    }

    pub fn schedule(&self) -> &SettingRepository {
        &self.schedule
    }

    /// Starts the control loop of a stored zone and hands it its schedule.
    pub async fn start_zone(
        &self,
        info: ZoneInfo,
        hardware: Hardware,
    ) -> Result<ZoneHandle, ZoneError> {
        let context = ZoneContext::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.activity),
            &self.settings.control,
        );
        let (zone, handle) = Zone::new(
            info,
            hardware.controller,
            hardware.sensor,
            context,
            self.shutdown.subscribe(),
        );
        self.registry.register(handle.clone()).await?;

        let zone_id = handle.id();
        self.tasks
            .lock()
            .await
            .spawn(async move { (zone_id, zone.supervise().await) });

        tracing::info!(zone_id, "started zone \"{}\"", handle.name());

        self.refresh(zone_id).await?;

        Ok(handle)
    }

    /// Pushes the stored schedule to a running zone. Call after every
    /// change to the zone's settings or modes.
    pub async fn refresh(&self, zone_id: Id) -> Result<(), ZoneError> {
        let handle = self.registry.get(zone_id).await?;
        let schedule = Schedule {
            settings: self.schedule.find_by_zone_id(zone_id).await?,
            modes: self.modes.find_by_zone_id(zone_id).await?,
        };

        handle.update(schedule).await
    }

    /// Holds a temporary band until the next scheduled change, or for the
    /// configured hold time when nothing is scheduled.
    pub async fn override_zone(
        &self,
        zone_id: Id,
        adjustment: Adjustment,
    ) -> Result<Setting, ZoneError> {
        let handle = self.registry.get(zone_id).await?;
        let active = handle.active();

        let target = match adjustment {
            Adjustment::Mode(mode_id) => OverrideTarget::Mode(mode_id),
            Adjustment::Shift(delta) => {
                let mode = active
                    .as_ref()
                    .map(|active| active.mode.shifted(delta))
                    .ok_or(ZoneError::NoActiveSetting(zone_id))?;
                OverrideTarget::Custom {
                    min_temp: mode.min_temp,
                    max_temp: mode.max_temp,
                    correction: mode.correction,
                }
            }
        };

        let now = self.clock.now();
        let settings = self.schedule.find_by_zone_id(zone_id).await?;
        let end_day = hold_until(&settings, now, self.settings.control.override_hold)?;
        let setting = self
            .schedule
            .create_override(CreateOverrideRequest {
                zone_id,
                target,
                day_of_week: active.map_or(ALL_DAYS, |active| active.setting.day_of_week),
                start_day: now,
                end_day,
            })
            .await?;

        tracing::info!(
            zone_id,
            setting_id = setting.id,
            "override until {}",
            setting.end_day
        );

        self.refresh(zone_id).await?;

        Ok(setting)
    }

    /// Resolves when every zone has stopped, or with the error of the
    /// first zone that escalated.
    pub async fn wait(&self) -> Result<(), ZoneError> {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((zone_id, Err(e))) => {
                    tracing::error!(zone_id, "zone gave up: {}", e);
                    return Err(e);
                }
                Err(e) => return Err(ZoneError::Panicked(e.to_string())),
            }
        }

        Ok(())
    }

    /// Stops every zone loop and waits for their relays to be released.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((zone_id, Err(e))) => tracing::warn!(zone_id, "zone stopped with error: {}", e),
                Err(e) => tracing::error!("zone task failed: {}", e),
            }
        }

        tracing::info!("all zones stopped");
    }
}

/// End of an override placed at `now`.
fn hold_until(
    settings: &[Setting],
    now: OffsetDateTime,
    hold: u64,
) -> Result<OffsetDateTime, ZoneError> {
    let seconds = i64::try_from(hold).map_err(|_| ZoneError::HoldOutOfRange(hold))?;

    override_until(settings, now, time::Duration::seconds(seconds))
        .ok_or(ZoneError::HoldOutOfRange(hold))
}

/// Starts every configured zone, creating it in the store on first use, and
/// runs until Ctrl-C or until a zone escalates.
pub async fn run<F>(
    settings: Arc<Settings>,
    clock: Arc<dyn Clock>,
    mut hardware: F,
) -> anyhow::Result<()>
where
    F: FnMut(&ZoneInfo) -> anyhow::Result<Hardware>,
{
    let storage = Storage::new(&settings.database, SchemaManager::default())
        .await
        .with_context(|| format!("failed to open database {}", settings.database.url))?;
    let storage = Arc::new(storage);
    let app = App::new(Arc::clone(&settings), storage, clock)?;

    for zone in &settings.zones {
        let info = app.zones().find_or_create(&zone.name).await?;
        let devices = hardware(&info)?;
        app.start_zone(info, devices).await?;
    }

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
            Ok(())
        }
        result = app.wait() => result.map_err(anyhow::Error::from),
    };

    app.shutdown().await;

    result
}
