use std::sync::Arc;

use thermosync_api::models::ZoneInfo;
use thermosync_server::services::{CachedSensor, Clock, Controller, HvacController};
use thermosync_server::Hardware;

use crate::settings::Settings;
use crate::simulate::{Room, SimulatedPin};

pub mod settings;
pub mod simulate;

/// Runs the full controller, one simulated room per configured zone.
pub async fn run(settings: Arc<Settings>, clock: Arc<dyn Clock>) -> anyhow::Result<()> {
    let server = Arc::new(settings.server.clone());

    thermosync_server::run(Arc::clone(&server), clock, |zone| {
        Ok(simulated_hardware(zone, &settings))
    })
    .await
}

/// Walks the relays of a simulated air handler through the power-on self
/// test.
pub async fn self_test(settings: &Settings) -> anyhow::Result<()> {
    let room = Room::new(&settings.simulation);
    let controller = controller(&room, settings);

    tracing::info!(
        "running self test, about {}s",
        (settings.server.hvac.switch_interval + 1) * 5
    );

    controller.reset().await?;
    controller.self_test().await?;
    controller.reset().await?;

    Ok(())
}

fn simulated_hardware(zone: &ZoneInfo, settings: &Settings) -> Hardware {
    let room = Room::new(&settings.simulation);
    tracing::info!(
        zone_id = zone.id,
        "simulating room for zone \"{}\" at {:.1}°F",
        zone.name,
        settings.simulation.initial_temp
    );

    Hardware {
        controller: Arc::new(controller(&room, settings)),
        sensor: Arc::new(CachedSensor::new(room.sensor(), &settings.server.sensor)),
    }
}

fn controller(room: &Room, settings: &Settings) -> HvacController<SimulatedPin> {
    let (fan, ac, heat) = room.pins();

    HvacController::new(fan, ac, heat, &settings.server.hvac)
}
