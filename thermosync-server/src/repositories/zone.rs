use std::sync::Arc;

use sqlx::{Error, SqliteConnection};
use thermosync_api::models::{
    CreateModeRequest, Id, Priority, Setting, ZoneInfo, ALL_DAYS, CUSTOM_MODE_NAME,
    DEFAULT_MODE_NAME, SECONDS_PER_DAY,
};
use time::macros::datetime;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::errors::StoreError;
use crate::repositories::mode::insert_mode;
use crate::repositories::setting::insert_setting;

const MIN_NAME_LENGTH: usize = 2;

#[derive(Clone)]
pub struct ZoneRepository {
    storage: Arc<Storage>,
}

impl ZoneRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl ZoneRepository {
    /// Creates a zone together with its system modes and the `Default`
    /// setting that keeps it covered at all times.
    pub async fn create(&self, name: &str) -> Result<ZoneInfo, StoreError> {
        if name.chars().count() < MIN_NAME_LENGTH {
            return Err(StoreError::ZoneNameTooShort);
        }

        let mut transaction = self.storage.get_pool().begin().await?;
        let existing: Option<(Id,)> = sqlx::query_as("SELECT id FROM zones WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *transaction)
            .await?;
        if existing.is_some() {
            return Err(StoreError::ZoneNameExists(name.to_string()));
        }

        let id = sqlx::query("INSERT INTO zones (name) VALUES ($1)")
            .bind(name)
            .execute(&mut *transaction)
            .await?
            .last_insert_rowid();
        bootstrap(&mut *transaction, id).await?;
        transaction.commit().await?;

        let zone = ZoneInfo {
            id,
            name: name.to_string(),
        };
        tracing::info!(zone_id = zone.id, "created zone \"{}\"", zone.name);

        Ok(zone)
    }

    pub async fn find_or_create(&self, name: &str) -> Result<ZoneInfo, StoreError> {
        match self.find_by_name(name).await? {
            Some(zone) => Ok(zone),
            None => self.create(name).await,
        }
    }

    pub async fn find_by_id(&self, id: Id) -> Result<Option<ZoneInfo>, StoreError> {
        let row: Option<(Id, String)> = sqlx::query_as("SELECT id, name FROM zones WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(row.map(|(id, name)| ZoneInfo { id, name }))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<ZoneInfo>, StoreError> {
        let row: Option<(Id, String)> =
            sqlx::query_as("SELECT id, name FROM zones WHERE name = $1")
                .bind(name)
                .fetch_optional(self.storage.get_pool())
                .await?;

        Ok(row.map(|(id, name)| ZoneInfo { id, name }))
    }

    pub async fn find_all(&self) -> Result<Vec<ZoneInfo>, StoreError> {
        let rows: Vec<(Id, String)> = sqlx::query_as("SELECT id, name FROM zones ORDER BY id")
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(rows.into_iter().map(|(id, name)| ZoneInfo { id, name }).collect())
    }
}

async fn bootstrap(connection: &mut SqliteConnection, zone_id: Id) -> Result<(), Error> {
    let default_mode = insert_mode(
        &mut *connection,
        CreateModeRequest {
            zone_id,
            name: DEFAULT_MODE_NAME.to_string(),
            min_temp: 60.0,
            max_temp: 85.0,
            correction: 2.0,
        },
    )
    .await?;
    insert_mode(
        &mut *connection,
        CreateModeRequest {
            zone_id,
            name: CUSTOM_MODE_NAME.to_string(),
            min_temp: 60.0,
            max_temp: 85.0,
            correction: 1.0,
        },
    )
    .await?;

    let setting = Setting {
        id: 0,
        zone_id,
        mode_id: default_mode.id,
        priority: Priority::Default,
        day_of_week: ALL_DAYS,
        start_day: OffsetDateTime::UNIX_EPOCH,
        end_day: datetime!(2200-01-01 0:00 UTC),
        start_time: 0,
        end_time: SECONDS_PER_DAY,
    };
    insert_setting(connection, &setting).await?;

    Ok(())
}
