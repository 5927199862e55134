use std::sync::Arc;
use std::time::Duration;

use thermosync_api::models::Priority;
use thermosync_server::errors::ZoneError;
use thermosync_server::services::Schedule;
use tokio::time;

use crate::common::mock_app::{MockApp, MockSensor};

mod common;

#[tokio::test]
async fn test_hysteresis_cycle() {
    let app = MockApp::new().await;
    let zone = app.create_zone("living room").await;
    let comfort = app.create_comfort_mode(zone.id).await;
    app.schedule(zone.id, comfort.id, 8, 20).await;

    let (handle, hardware) = app.start_zone(zone, 76.0).await;
    let active = handle.wait_for_setting(|active| active.mode.id == comfort.id).await.unwrap();
    assert_eq!(active.setting.priority, Priority::Scheduled);

    // Cooling starts right away, the fan follows after its delay
    time::sleep(Duration::from_secs(6)).await;
    assert!(hardware.ac.is_high());
    assert!(hardware.fan.is_high());
    assert!(!hardware.heat.is_high());

    // Still above max - correction
    hardware.sensor.set_temperature(73.5);
    time::sleep(Duration::from_secs(60)).await;
    assert!(hardware.ac.is_high());

    hardware.sensor.set_temperature(73.0);
    time::sleep(Duration::from_secs(60)).await;
    assert!(!hardware.ac.is_high());
    time::sleep(Duration::from_secs(10)).await;
    assert!(!hardware.fan.is_high());

    hardware.sensor.set_temperature(68.0);
    time::sleep(Duration::from_secs(60)).await;
    assert!(hardware.heat.is_high());
    assert!(!hardware.ac.is_high());

    hardware.sensor.set_temperature(71.9);
    time::sleep(Duration::from_secs(60)).await;
    assert!(hardware.heat.is_high());

    hardware.sensor.set_temperature(72.0);
    time::sleep(Duration::from_secs(60)).await;
    assert!(!hardware.heat.is_high());

    let records = app.activity.records();
    assert!(records.len() >= 6);
    assert!(records.iter().all(|record| record.zone_id == handle.id()));
    assert!(records.iter().any(|record| record.ac && record.temperature == 76.0));
    assert!(records.iter().any(|record| record.heat && record.temperature == 68.0));
}

#[tokio::test]
async fn test_inside_band_holds() {
    let app = MockApp::new().await;
    let zone = app.create_zone("office").await;
    let comfort = app.create_comfort_mode(zone.id).await;
    app.schedule(zone.id, comfort.id, 8, 20).await;

    let (handle, hardware) = app.start_zone(zone, 72.5).await;
    handle.wait_for_setting(|active| active.mode.id == comfort.id).await.unwrap();

    time::sleep(Duration::from_secs(130)).await;
    assert!(!hardware.ac.is_high());
    assert!(!hardware.heat.is_high());
    assert!(!hardware.fan.is_high());
}

#[tokio::test]
async fn test_snapshot_replacement() {
    let app = MockApp::new().await;
    let zone = app.create_zone("bedroom").await;
    let comfort = app.create_comfort_mode(zone.id).await;
    let scheduled = app.schedule(zone.id, comfort.id, 8, 20).await;

    let (handle, _) = app.start_zone(zone.clone(), 72.0).await;
    handle.wait_for_setting(|active| active.setting.id == scheduled.id).await.unwrap();

    app.app.schedule().delete(scheduled.id).await.unwrap();
    app.app.refresh(zone.id).await.unwrap();

    let active = handle
        .wait_for_setting(|active| active.setting.priority == Priority::Default)
        .await
        .unwrap();
    assert_eq!(active.mode.name, "default");
}

#[tokio::test]
async fn test_empty_snapshot_keeps_previous_setting() {
    let app = MockApp::new().await;
    let zone = app.create_zone("garage").await;

    let (handle, _) = app.start_zone(zone, 72.0).await;
    let active = handle
        .wait_for_setting(|active| active.setting.priority == Priority::Default)
        .await
        .unwrap();

    handle.update(Schedule::default()).await.unwrap();
    time::sleep(Duration::from_secs(61)).await;

    assert_eq!(handle.setting(), Some(active.setting));
}

#[tokio::test]
async fn test_mode_clamped_to_bounds() {
    let app = MockApp::new().await;
    let zone = app.create_zone("cellar").await;
    let wide = app
        .app
        .modes()
        .create(thermosync_api::models::CreateModeRequest {
            zone_id: zone.id,
            name: "wide".to_string(),
            min_temp: 50.0,
            max_temp: 95.0,
            correction: 2.0,
        })
        .await
        .unwrap();
    app.schedule(zone.id, wide.id, 0, 24).await;

    let (handle, _) = app.start_zone(zone, 72.0).await;
    let active = handle.wait_for_setting(|active| active.mode.id == wide.id).await.unwrap();

    assert_eq!(active.mode.min_temp, 60.0);
    assert_eq!(active.mode.max_temp, 85.0);
    // The stored mode is untouched
    let stored = app.app.modes().find_by_id(wide.id).await.unwrap().unwrap();
    assert_eq!(stored.min_temp, 50.0);
}

#[tokio::test]
async fn test_status() {
    let app = MockApp::new().await;
    let zone = app.create_zone("study").await;
    let comfort = app.create_comfort_mode(zone.id).await;
    let scheduled = app.schedule(zone.id, comfort.id, 8, 20).await;

    let (handle, _) = app.start_zone(zone.clone(), 76.0).await;
    handle.wait_for_setting(|active| active.mode.id == comfort.id).await.unwrap();
    time::sleep(Duration::from_secs(6)).await;

    let status = handle.status().await;
    assert_eq!(status.zone_id, zone.id);
    assert_eq!(status.setting_id, Some(scheduled.id));
    assert_eq!(status.mode_id, Some(comfort.id));
    assert_eq!(status.temperature, 76.0);
    assert_eq!(status.humidity, 45.0);
    assert_eq!(status.min_temp, Some(70.0));
    assert_eq!(status.max_temp, Some(75.0));
    assert_eq!(status.correction, Some(2.0));
    assert!(status.ac && status.fan && !status.heat);
    assert!(status.heat_index > 70.0 && status.heat_index < 80.0);
}

#[tokio::test]
async fn test_restarts_after_fault() {
    let app = MockApp::new().await;
    let zone = app.create_zone("nursery").await;
    let comfort = app.create_comfort_mode(zone.id).await;
    app.schedule(zone.id, comfort.id, 8, 20).await;

    let sensor = Arc::new(MockSensor::new(76.0));
    sensor.panic_times(1);
    let (handle, hardware) = app.start_zone_with(zone, sensor).await;

    handle.wait_for_setting(|active| active.mode.id == comfort.id).await.unwrap();
    time::sleep(Duration::from_secs(6)).await;

    assert!(hardware.ac.is_high());
    assert!(handle.update(Schedule::default()).await.is_ok());
}

#[tokio::test]
async fn test_escalates_second_fault() {
    let app = MockApp::new().await;
    let zone = app.create_zone("workshop").await;

    let sensor = Arc::new(MockSensor::new(76.0));
    sensor.panic_times(2);
    let (handle, hardware) = app.start_zone_with(zone.clone(), sensor).await;

    match app.app.wait().await {
        Err(ZoneError::Escalated { zone_id, last }) => {
            assert_eq!(zone_id, zone.id);
            assert!(last.contains("sensor bus hung"));
        }
        other => panic!("expected escalation, got {other:?}"),
    }

    assert!(!hardware.ac.is_high());
    assert!(!hardware.heat.is_high());
    assert!(!hardware.fan.is_high());
    assert!(matches!(
        handle.update(Schedule::default()).await,
        Err(ZoneError::Stopped(id)) if id == zone.id
    ));
}

#[tokio::test]
async fn test_missing_mode_escalates() {
    let app = MockApp::new().await;
    let zone = app.create_zone("sunroom").await;
    let comfort = app.create_comfort_mode(zone.id).await;
    app.schedule(zone.id, comfort.id, 8, 20).await;

    let (handle, hardware) = app.start_zone(zone.clone(), 76.0).await;
    handle.wait_for_setting(|active| active.mode.id == comfort.id).await.unwrap();
    time::sleep(Duration::from_secs(6)).await;
    assert!(hardware.ac.is_high());

    // Settings whose modes are not part of the snapshot
    let settings = app.app.schedule().find_by_zone_id(zone.id).await.unwrap();
    handle
        .update(Schedule {
            settings,
            modes: Vec::new(),
        })
        .await
        .unwrap();

    match app.app.wait().await {
        Err(ZoneError::Escalated { zone_id, last }) => {
            assert_eq!(zone_id, zone.id);
            assert!(last.contains("missing mode"));
        }
        other => panic!("expected escalation, got {other:?}"),
    }

    assert!(!hardware.ac.is_high());
    assert!(!hardware.heat.is_high());
    assert!(!hardware.fan.is_high());
}

#[tokio::test]
async fn test_faults_an_hour_apart_restart() {
    let app = MockApp::new().await;
    let zone = app.create_zone("hallway").await;
    let comfort = app.create_comfort_mode(zone.id).await;
    app.schedule(zone.id, comfort.id, 8, 20).await;

    let sensor = Arc::new(MockSensor::new(72.0));
    let (handle, hardware) = app.start_zone_with(zone.clone(), sensor.clone()).await;
    handle.wait_for_setting(|active| active.mode.id == comfort.id).await.unwrap();

    sensor.panic_times(1);
    time::sleep(Duration::from_secs(61)).await;

    time::sleep(Duration::from_secs(2 * 60 * 60)).await;

    sensor.panic_times(1);
    time::sleep(Duration::from_secs(61)).await;

    assert!(app.app.refresh(zone.id).await.is_ok());
    sensor.set_temperature(76.0);
    time::sleep(Duration::from_secs(91)).await;
    assert!(hardware.ac.is_high());
    assert!(handle.update(Schedule::default()).await.is_ok());
}

#[tokio::test]
async fn test_shutdown_releases_relays() {
    let app = MockApp::new().await;
    let zone = app.create_zone("kitchen").await;
    let comfort = app.create_comfort_mode(zone.id).await;
    app.schedule(zone.id, comfort.id, 8, 20).await;

    let (handle, hardware) = app.start_zone(zone, 76.0).await;
    handle.wait_for_setting(|active| active.mode.id == comfort.id).await.unwrap();
    time::sleep(Duration::from_secs(6)).await;
    assert!(hardware.ac.is_high());

    app.app.shutdown().await;

    assert!(!hardware.ac.is_high());
    assert!(!hardware.fan.is_high());
    assert!(handle.update(Schedule::default()).await.is_err());
    assert!(app.app.wait().await.is_ok());
}
