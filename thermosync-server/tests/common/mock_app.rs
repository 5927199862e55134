use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use thermosync_api::models::{
    CreateModeRequest, CreateSettingRequest, Id, Mode, Priority, Setting, ZoneInfo, ALL_DAYS,
};
use time::macros::datetime;
use time::OffsetDateTime;

use thermosync_server::configs::{Database, Hvac, SchemaManager, Settings, Storage};
use thermosync_server::services::{
    ActivityLog, ActivityRecord, HvacController, ManualClock, Sensor, ZoneHandle,
};
use thermosync_server::{App, Hardware};

/// Tuesday morning.
pub const START: OffsetDateTime = datetime!(2024-03-05 10:00 UTC);

#[derive(Debug, Clone, Default)]
pub struct MockPin {
    states: Arc<Mutex<Vec<bool>>>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_states(&self) -> Vec<bool> {
        self.states.lock().unwrap().clone()
    }

    pub fn is_high(&self) -> bool {
        self.states.lock().unwrap().last().copied().unwrap_or(false)
    }
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.states.lock().unwrap().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.states.lock().unwrap().push(true);
        Ok(())
    }
}

/// Sensor whose readings are set by the test. Can be told to panic on the
/// next reads to exercise the supervisor.
pub struct MockSensor {
    temperature: Mutex<f64>,
    humidity: Mutex<f64>,
    panics: AtomicUsize,
}

impl MockSensor {
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature: Mutex::new(temperature),
            humidity: Mutex::new(45.0),
            panics: AtomicUsize::new(0),
        }
    }

    pub fn set_temperature(&self, temperature: f64) {
        *self.temperature.lock().unwrap() = temperature;
    }

    /// Panics on the next `count` temperature reads.
    pub fn panic_times(&self, count: usize) {
        self.panics.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Sensor for MockSensor {
    async fn temperature(&self) -> f64 {
        let remaining = self.panics.load(Ordering::SeqCst);
        if remaining > 0 {
            self.panics.store(remaining - 1, Ordering::SeqCst);
            panic!("sensor bus hung");
        }

        *self.temperature.lock().unwrap()
    }

    async fn humidity(&self) -> f64 {
        *self.humidity.lock().unwrap()
    }
}

#[derive(Default)]
pub struct MemoryActivityLog {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemoryActivityLog {
    pub fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl ActivityLog for MemoryActivityLog {
    fn record(&self, record: &ActivityRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

pub struct MockHardware {
    pub fan: MockPin,
    pub ac: MockPin,
    pub heat: MockPin,
    pub sensor: Arc<MockSensor>,
}

pub struct MockApp {
    pub app: App,
    pub storage: Arc<Storage>,
    pub clock: ManualClock,
    pub activity: Arc<MemoryActivityLog>,
}

impl MockApp {
    pub async fn new() -> Self {
        Self::with_settings(Self::settings()).await
    }

    /// Short relay delays so tests do not need to wait out real dwell times.
    pub fn settings() -> Settings {
        Settings {
            hvac: Hvac {
                switch_interval: 30,
                fan_on_delay: 5,
                fan_off_delay: 10,
            },
            ..Settings::default()
        }
    }

    /// Opens a private in-memory database, then pauses time. Connections
    /// are opened before the pause so pool timeouts never see virtual time.
    pub async fn with_settings(settings: Settings) -> Self {
        let database = Database {
            url: "sqlite::memory:".to_string(),
            clean_start: true,
            connections: 4,
        };
        let storage = Arc::new(Storage::new(&database, SchemaManager::default()).await.unwrap());
        tokio::time::pause();

        let clock = ManualClock::new(START);
        let activity = Arc::new(MemoryActivityLog::default());

        let app = App::with_activity(
            Arc::new(settings),
            storage.clone(),
            Arc::new(clock.clone()),
            activity.clone(),
        );

        Self {
            app,
            storage,
            clock,
            activity,
        }
    }

    pub async fn create_zone(&self, name: &str) -> ZoneInfo {
        self.app.zones().create(name).await.unwrap()
    }

    pub async fn start_zone(&self, info: ZoneInfo, temperature: f64) -> (ZoneHandle, MockHardware) {
        self.start_zone_with(info, Arc::new(MockSensor::new(temperature)))
            .await
    }

    pub async fn start_zone_with(
        &self,
        info: ZoneInfo,
        sensor: Arc<MockSensor>,
    ) -> (ZoneHandle, MockHardware) {
        let hardware = MockHardware {
            fan: MockPin::new(),
            ac: MockPin::new(),
            heat: MockPin::new(),
            sensor,
        };
        let controller = HvacController::new(
            hardware.fan.clone(),
            hardware.ac.clone(),
            hardware.heat.clone(),
            &Self::settings().hvac,
        );

        let handle = self
            .app
            .start_zone(
                info,
                Hardware {
                    controller: Arc::new(controller),
                    sensor: hardware.sensor.clone(),
                },
            )
            .await
            .unwrap();

        (handle, hardware)
    }

    /// 70..75°F with a 2° correction.
    pub async fn create_comfort_mode(&self, zone_id: Id) -> Mode {
        self.app
            .modes()
            .create(CreateModeRequest {
                zone_id,
                name: "comfort".to_string(),
                min_temp: 70.0,
                max_temp: 75.0,
                correction: 2.0,
            })
            .await
            .unwrap()
    }

    /// Scheduled every day of 2024 between the given hours.
    pub fn scheduled_request(
        zone_id: Id,
        mode_id: Id,
        start_hour: u32,
        end_hour: u32,
    ) -> CreateSettingRequest {
        CreateSettingRequest {
            zone_id,
            mode_id,
            priority: Priority::Scheduled,
            day_of_week: ALL_DAYS,
            start_day: datetime!(2024-01-01 0:00 UTC),
            end_day: datetime!(2025-01-01 0:00 UTC),
            start_time: start_hour * 3600,
            end_time: end_hour * 3600,
        }
    }

    pub async fn schedule(
        &self,
        zone_id: Id,
        mode_id: Id,
        start_hour: u32,
        end_hour: u32,
    ) -> Setting {
        self.app
            .schedule()
            .create(Self::scheduled_request(zone_id, mode_id, start_hour, end_hour))
            .await
            .unwrap()
    }
}
