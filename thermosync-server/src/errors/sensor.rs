#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Sensor bus error: {0}")]
    Bus(String),

    #[error("Sensor returned stale data")]
    Stale,

    #[error("Sensor I/O error: {0}")]
    Io(#[from] std::io::Error),
}
