/// DDL of one table.
pub trait Table: Send + Sync {
    fn name(&self) -> &'static str;

    fn create(&self) -> String;

    fn dispose(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.name())
    }
}

pub struct ZoneTable;

impl Table for ZoneTable {
    fn name(&self) -> &'static str {
        "zones"
    }

    fn create(&self) -> String {
        r#"
        CREATE TABLE IF NOT EXISTS zones (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );
        "#
        .to_string()
    }
}

pub struct ModeTable;

impl Table for ModeTable {
    fn name(&self) -> &'static str {
        "modes"
    }

    fn create(&self) -> String {
        r#"
        CREATE TABLE IF NOT EXISTS modes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            zone_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            min_temp REAL NOT NULL,
            max_temp REAL NOT NULL,
            correction REAL NOT NULL,
            FOREIGN KEY (zone_id) REFERENCES zones(id) ON DELETE CASCADE
        );
        "#
        .to_string()
    }
}

pub struct SettingTable;

impl Table for SettingTable {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn create(&self) -> String {
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            zone_id INTEGER NOT NULL,
            mode_id INTEGER NOT NULL,
            priority INTEGER NOT NULL,
            day_of_week INTEGER NOT NULL,
            start_day TEXT NOT NULL,
            end_day TEXT NOT NULL,
            start_time INTEGER NOT NULL,
            end_time INTEGER NOT NULL,
            FOREIGN KEY (zone_id) REFERENCES zones(id) ON DELETE CASCADE,
            FOREIGN KEY (mode_id) REFERENCES modes(id)
        );
        "#
        .to_string()
    }
}

/// Tables in creation order; every table only references tables before it.
pub struct SchemaManager {
    tables: Vec<Box<dyn Table>>,
}

impl SchemaManager {
    pub fn new(tables: Vec<Box<dyn Table>>) -> Self {
        Self { tables }
    }

    pub fn create_schema(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.create()).collect()
    }

    pub fn dispose_schema(&self) -> Vec<String> {
        self.tables.iter().rev().map(|table| table.dispose()).collect()
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        SchemaManager::new(vec![
            Box::new(ZoneTable),
            Box::new(ModeTable),
            Box::new(SettingTable),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispose_in_reverse_order() {
        let schema = SchemaManager::default();

        assert_eq!(
            schema.dispose_schema(),
            vec![
                "DROP TABLE IF EXISTS settings;",
                "DROP TABLE IF EXISTS modes;",
                "DROP TABLE IF EXISTS zones;",
            ]
        );
        assert!(schema.create_schema()[0].contains("CREATE TABLE IF NOT EXISTS zones"));
    }
}
