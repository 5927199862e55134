use std::sync::Arc;

use sqlx::sqlite::SqliteExecutor;
use sqlx::{Error, FromRow};
use thermosync_api::models::{CreateModeRequest, Id, Mode, UpdateModeRequest};

use crate::configs::Storage;
use crate::errors::ModeError;

#[derive(Debug, FromRow)]
pub(crate) struct ModeRow {
    id: Id,
    zone_id: Id,
    name: String,
    min_temp: f64,
    max_temp: f64,
    correction: f64,
}

impl From<ModeRow> for Mode {
    fn from(row: ModeRow) -> Self {
        Mode {
            id: row.id,
            zone_id: row.zone_id,
            name: row.name,
            min_temp: row.min_temp,
            max_temp: row.max_temp,
            correction: row.correction,
        }
    }
}

pub(crate) async fn select_mode<'c>(
    executor: impl SqliteExecutor<'c>,
    id: Id,
) -> Result<Option<Mode>, Error> {
    let row: Option<ModeRow> = sqlx::query_as("SELECT * FROM modes WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Mode::from))
}

pub(crate) async fn insert_mode<'c>(
    executor: impl SqliteExecutor<'c>,
    request: CreateModeRequest,
) -> Result<Mode, Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO modes (zone_id, name, min_temp, max_temp, correction)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(request.zone_id)
    .bind(&request.name)
    .bind(request.min_temp)
    .bind(request.max_temp)
    .bind(request.correction)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(request.into_mode(id))
}

pub(crate) async fn update_band<'c>(
    executor: impl SqliteExecutor<'c>,
    mode: &Mode,
) -> Result<(), Error> {
    sqlx::query(
        r#"
        UPDATE modes
        SET name = $1, min_temp = $2, max_temp = $3, correction = $4
        WHERE id = $5
        "#,
    )
    .bind(&mode.name)
    .bind(mode.min_temp)
    .bind(mode.max_temp)
    .bind(mode.correction)
    .bind(mode.id)
    .execute(executor)
    .await?;

    Ok(())
}

#[derive(Clone)]
pub struct ModeRepository {
    storage: Arc<Storage>,
}

impl ModeRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl ModeRepository {
    pub async fn create(&self, request: CreateModeRequest) -> Result<Mode, ModeError> {
        request.validate()?;

        let mut transaction = self.storage.get_pool().begin().await?;
        let zone: Option<(Id,)> = sqlx::query_as("SELECT id FROM zones WHERE id = $1")
            .bind(request.zone_id)
            .fetch_optional(&mut *transaction)
            .await?;
        if zone.is_none() {
            return Err(ModeError::ZoneNotFound(request.zone_id));
        }

        let mode = insert_mode(&mut *transaction, request).await?;
        transaction.commit().await?;

        tracing::debug!(mode_id = mode.id, zone_id = mode.zone_id, "created mode \"{}\"", mode.name);

        Ok(mode)
    }

    pub async fn find_by_id(&self, id: Id) -> Result<Option<Mode>, ModeError> {
        Ok(select_mode(self.storage.get_pool(), id).await?)
    }

    pub async fn find_by_zone_id(&self, zone_id: Id) -> Result<Vec<Mode>, ModeError> {
        let rows: Vec<ModeRow> =
            sqlx::query_as("SELECT * FROM modes WHERE zone_id = $1 ORDER BY id")
                .bind(zone_id)
                .fetch_all(self.storage.get_pool())
                .await?;

        Ok(rows.into_iter().map(Mode::from).collect())
    }

    pub async fn find_by_name(&self, zone_id: Id, name: &str) -> Result<Option<Mode>, ModeError> {
        let row: Option<ModeRow> = sqlx::query_as(
            "SELECT * FROM modes WHERE zone_id = $1 AND name = $2 ORDER BY id LIMIT 1",
        )
        .bind(zone_id)
        .bind(name)
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(row.map(Mode::from))
    }

    /// Replaces a user mode's band. System modes are only changed by the
    /// store itself.
    pub async fn update(&self, id: Id, request: UpdateModeRequest) -> Result<Mode, ModeError> {
        request.validate()?;

        let mut transaction = self.storage.get_pool().begin().await?;
        let mut mode = select_mode(&mut *transaction, id)
            .await?
            .ok_or(ModeError::NotFound(id))?;
        if mode.is_reserved() {
            return Err(ModeError::Reserved(mode.name));
        }

        request.apply(&mut mode);
        update_band(&mut *transaction, &mode).await?;
        transaction.commit().await?;

        Ok(mode)
    }

    pub async fn delete(&self, id: Id) -> Result<(), ModeError> {
        let mut transaction = self.storage.get_pool().begin().await?;
        let mode = select_mode(&mut *transaction, id)
            .await?
            .ok_or(ModeError::NotFound(id))?;
        if mode.is_reserved() {
            return Err(ModeError::Reserved(mode.name));
        }

        let user: Option<(Id,)> =
            sqlx::query_as("SELECT id FROM settings WHERE mode_id = $1 ORDER BY id LIMIT 1")
                .bind(id)
                .fetch_optional(&mut *transaction)
                .await?;
        if let Some((setting_id,)) = user {
            return Err(ModeError::InUse { setting_id });
        }

        sqlx::query("DELETE FROM modes WHERE id = $1")
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await?;

        Ok(())
    }
}
