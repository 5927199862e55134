use std::collections::BTreeMap;

use thermosync_api::models::Id;
use tokio::sync::RwLock;

use crate::errors::ZoneError;
use crate::services::zone_service::ZoneHandle;

/// Running zones by id.
#[derive(Default)]
pub struct ZoneRegistry {
    zones: RwLock<BTreeMap<Id, ZoneHandle>>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, handle: ZoneHandle) -> Result<(), ZoneError> {
        let mut zones = self.zones.write().await;
        if zones.contains_key(&handle.id()) {
            return Err(ZoneError::AlreadyRunning(handle.id()));
        }

        tracing::debug!(zone_id = handle.id(), "registered zone \"{}\"", handle.name());
        zones.insert(handle.id(), handle);

        Ok(())
    }

    pub async fn get(&self, id: Id) -> Result<ZoneHandle, ZoneError> {
        self.zones
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ZoneError::NotFound(id))
    }

    pub async fn find_by_name(&self, name: &str) -> Option<ZoneHandle> {
        self.zones
            .read()
            .await
            .values()
            .find(|handle| handle.name() == name)
            .cloned()
    }

    pub async fn handles(&self) -> Vec<ZoneHandle> {
        self.zones.read().await.values().cloned().collect()
    }
}
