use std::sync::Arc;

use sqlx::sqlite::SqliteExecutor;
use sqlx::{Error, FromRow, SqliteConnection};
use thermosync_api::models::{
    CreateSettingRequest, Id, Mode, Priority, Setting, CUSTOM_MODE_NAME, SECONDS_PER_DAY,
};
use thermosync_api::schedule::{find_overlap, overlaps};
use thermosync_api::ValidationError;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::errors::SettingError;
use crate::repositories::mode::{select_mode, update_band, ModeRow};

/// Band a temporary override applies.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideTarget {
    /// An existing mode of the zone
    Mode(Id),
    /// Written into the zone's "custom" mode
    Custom {
        min_temp: f64,
        max_temp: f64,
        correction: f64,
    },
}

#[derive(Debug, Clone)]
pub struct CreateOverrideRequest {
    pub zone_id: Id,
    pub target: OverrideTarget,
    pub day_of_week: u8,
    pub start_day: OffsetDateTime,
    pub end_day: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct SettingRow {
    id: Id,
    zone_id: Id,
    mode_id: Id,
    priority: i64,
    day_of_week: i64,
    start_day: OffsetDateTime,
    end_day: OffsetDateTime,
    start_time: i64,
    end_time: i64,
}

impl TryFrom<SettingRow> for Setting {
    type Error = Error;

    fn try_from(row: SettingRow) -> Result<Self, Self::Error> {
        let priority = u8::try_from(row.priority)
            .map_err(|e| Error::Decode(Box::new(e)))
            .and_then(|value| Priority::try_from(value).map_err(|e| Error::Decode(Box::new(e))))?;

        Ok(Setting {
            id: row.id,
            zone_id: row.zone_id,
            mode_id: row.mode_id,
            priority,
            day_of_week: u8::try_from(row.day_of_week).map_err(|e| Error::Decode(Box::new(e)))?,
            start_day: row.start_day,
            end_day: row.end_day,
            start_time: u32::try_from(row.start_time).map_err(|e| Error::Decode(Box::new(e)))?,
            end_time: u32::try_from(row.end_time).map_err(|e| Error::Decode(Box::new(e)))?,
        })
    }
}

pub(crate) async fn insert_setting<'c>(
    executor: impl SqliteExecutor<'c>,
    setting: &Setting,
) -> Result<Id, Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO settings (zone_id, mode_id, priority, day_of_week, start_day, end_day, start_time, end_time)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(setting.zone_id)
    .bind(setting.mode_id)
    .bind(u8::from(setting.priority))
    .bind(setting.day_of_week)
    .bind(setting.start_day)
    .bind(setting.end_day)
    .bind(setting.start_time)
    .bind(setting.end_time)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(id)
}

async fn select_by_zone<'c>(
    executor: impl SqliteExecutor<'c>,
    zone_id: Id,
) -> Result<Vec<Setting>, Error> {
    let rows: Vec<SettingRow> =
        sqlx::query_as("SELECT * FROM settings WHERE zone_id = $1 ORDER BY id")
            .bind(zone_id)
            .fetch_all(executor)
            .await?;

    rows.into_iter().map(Setting::try_from).collect()
}

async fn zone_exists(connection: &mut SqliteConnection, zone_id: Id) -> Result<bool, Error> {
    let zone: Option<(Id,)> = sqlx::query_as("SELECT id FROM zones WHERE id = $1")
        .bind(zone_id)
        .fetch_optional(connection)
        .await?;

    Ok(zone.is_some())
}

async fn check_references(
    connection: &mut SqliteConnection,
    zone_id: Id,
    mode_id: Id,
) -> Result<(), SettingError> {
    if !zone_exists(&mut *connection, zone_id).await? {
        return Err(SettingError::ZoneNotFound(zone_id));
    }
    match select_mode(connection, mode_id).await? {
        None => Err(SettingError::ModeNotFound(mode_id)),
        Some(mode) if mode.zone_id != zone_id => {
            Err(SettingError::ModeZoneMismatch { mode_id, zone_id })
        }
        Some(_) => Ok(()),
    }
}

#[derive(Clone)]
pub struct SettingRepository {
    storage: Arc<Storage>,
}

impl SettingRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl SettingRepository {
    pub async fn find_by_id(&self, id: Id) -> Result<Option<Setting>, SettingError> {
        let row: Option<SettingRow> = sqlx::query_as("SELECT * FROM settings WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(row.map(Setting::try_from).transpose()?)
    }

    pub async fn find_by_zone_id(&self, zone_id: Id) -> Result<Vec<Setting>, SettingError> {
        Ok(select_by_zone(self.storage.get_pool(), zone_id).await?)
    }

    pub async fn create(&self, request: CreateSettingRequest) -> Result<Setting, SettingError> {
        request.validate()?;

        let mut transaction = self.storage.get_pool().begin().await?;
        check_references(&mut *transaction, request.zone_id, request.mode_id).await?;

        let candidate = request.into_setting(0);
        let existing = select_by_zone(&mut *transaction, candidate.zone_id).await?;
        if let Some(id) = find_overlap(&candidate, &existing) {
            return Err(ValidationError::Overlap { id }.into());
        }

        let setting = Setting {
            id: insert_setting(&mut *transaction, &candidate).await?,
            ..candidate
        };
        transaction.commit().await?;

        tracing::debug!(
            setting_id = setting.id,
            zone_id = setting.zone_id,
            "created {} setting",
            setting.priority
        );

        Ok(setting)
    }

    pub async fn delete(&self, id: Id) -> Result<(), SettingError> {
        let setting = self.find_by_id(id).await?.ok_or(SettingError::NotFound(id))?;
        if setting.priority == Priority::Default {
            return Err(SettingError::DefaultUndeletable);
        }

        sqlx::query("DELETE FROM settings WHERE id = $1")
            .bind(id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    /// Places an all-day `Override` setting, rewriting the zone's custom mode
    /// first when asked to. An override replaces any earlier override it
    /// overlaps.
    pub async fn create_override(
        &self,
        request: CreateOverrideRequest,
    ) -> Result<Setting, SettingError> {
        let mut override_request = CreateSettingRequest {
            zone_id: request.zone_id,
            mode_id: 0,
            priority: Priority::Override,
            day_of_week: request.day_of_week,
            start_day: request.start_day,
            end_day: request.end_day,
            start_time: 0,
            end_time: SECONDS_PER_DAY,
        };
        override_request.validate()?;

        let mut transaction = self.storage.get_pool().begin().await?;
        if !zone_exists(&mut *transaction, request.zone_id).await? {
            return Err(SettingError::ZoneNotFound(request.zone_id));
        }

        override_request.mode_id = match request.target {
            OverrideTarget::Mode(mode_id) => {
                check_references(&mut *transaction, request.zone_id, mode_id).await?;
                mode_id
            }
            OverrideTarget::Custom {
                min_temp,
                max_temp,
                correction,
            } => {
                let custom: Option<ModeRow> =
                    sqlx::query_as("SELECT * FROM modes WHERE zone_id = $1 AND name = $2")
                        .bind(request.zone_id)
                        .bind(CUSTOM_MODE_NAME)
                        .fetch_optional(&mut *transaction)
                        .await?;
                let custom = custom.ok_or(SettingError::CustomModeMissing(request.zone_id))?;
                let band = Mode {
                    min_temp,
                    max_temp,
                    correction,
                    ..Mode::from(custom)
                };
                band.validate()?;
                update_band(&mut *transaction, &band).await?;
                band.id
            }
        };

        let candidate = override_request.into_setting(0);
        let existing = select_by_zone(&mut *transaction, candidate.zone_id).await?;
        for setting in existing.iter().filter(|setting| overlaps(&candidate, setting)) {
            tracing::debug!(setting_id = setting.id, "replacing previous override");
            sqlx::query("DELETE FROM settings WHERE id = $1")
                .bind(setting.id)
                .execute(&mut *transaction)
                .await?;
        }

        let setting = Setting {
            id: insert_setting(&mut *transaction, &candidate).await?,
            ..candidate
        };
        transaction.commit().await?;

        Ok(setting)
    }
}
