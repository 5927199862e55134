use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use thermosync_api::models::Id;
use time::OffsetDateTime;

/// One control loop iteration as seen from the relays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub zone_id: Id,
    pub fan: bool,
    pub ac: bool,
    pub heat: bool,
    pub temperature: f64,
    pub humidity: f64,
}

/// Telemetry sink. Recording never fails the caller.
pub trait ActivityLog: Send + Sync {
    fn record(&self, record: &ActivityRecord);
}

/// Appends one CSV row per record, flushed immediately.
pub struct CsvActivityLog<W: Write> {
    writer: Mutex<csv::Writer<W>>,
}

impl CsvActivityLog<std::fs::File> {
    /// Opens `path` for appending. The header row is only written to a new
    /// or empty file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;

        Ok(Self::with_writer(
            csv::WriterBuilder::new().has_headers(is_empty).from_writer(file),
        ))
    }
}

impl<W: Write + Send> CsvActivityLog<W> {
    pub fn with_writer(writer: csv::Writer<W>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Option<W> {
        let writer = self.writer.into_inner().unwrap_or_else(|e| e.into_inner());

        writer.into_inner().ok()
    }
}

impl<W: Write + Send> ActivityLog for CsvActivityLog<W> {
    fn record(&self, record: &ActivityRecord) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        let result = writer
            .serialize(record)
            .and_then(|_| writer.flush().map_err(csv::Error::from));
        if let Err(e) = result {
            tracing::warn!(zone_id = record.zone_id, "failed to write activity: {}", e);
        }
    }
}

/// Used when no report file is configured.
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(&self, record: &ActivityRecord) {
        tracing::info!(
            target: "thermosync_server::activity",
            zone_id = record.zone_id,
            fan = record.fan,
            ac = record.ac,
            heat = record.heat,
            temperature = record.temperature,
            humidity = record.humidity,
            "activity"
        );
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn record(temperature: f64) -> ActivityRecord {
        ActivityRecord {
            timestamp: datetime!(2024-03-05 10:00 UTC),
            zone_id: 1,
            fan: true,
            ac: true,
            heat: false,
            temperature,
            humidity: 45.5,
        }
    }

    #[test]
    fn test_csv_rows() {
        let log = CsvActivityLog::with_writer(csv::Writer::from_writer(Vec::new()));

        log.record(&record(76.0));
        log.record(&record(75.25));

        let output = String::from_utf8(log.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "timestamp,zone_id,fan,ac,heat,temperature,humidity",
                "2024-03-05T10:00:00Z,1,true,true,false,76.0,45.5",
                "2024-03-05T10:00:00Z,1,true,true,false,75.25,45.5",
            ]
        );
    }
}
