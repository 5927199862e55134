use serde::{Deserialize, Serialize};

use super::Id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInfo {
    /// Zone identifier
    pub id: Id,
    /// Unique zone name
    pub name: String,
}
