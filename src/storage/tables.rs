//! Reference data tables
//!
//! The price list and the technical tables (ready-made sets, nozzle flow rates,
//! PE100 friction losses, drip lines, zone limits, K factors) are JSON files
//! loaded once at startup and handed to the model verbatim.

use std::fs;
use std::path::Path;

use serde_json::Value;

/// All tables shipped in the data directory
#[derive(Debug, Clone, Default)]
pub struct DataTables {
    /// Rows converted from the price list CSV
    pub price_list: Vec<Value>,
    pub ready_sets: Value,
    pub nozzle_data: Value,
    pub pe100_friction: Value,
    pub drip_data: Value,
    pub zone_limits: Value,
    pub k_factors: Value,
}

impl DataTables {
    pub fn load(dir: &Path) -> Self {
        let price_list = match load_json_table(dir, "price_list.json") {
            Value::Array(rows) => rows,
            other => {
                if !other.is_null() {
                    tracing::warn!("price_list.json is not an array, ignoring it");
                }
                Vec::new()
            }
        };

        let tables = Self {
            price_list,
            ready_sets: load_json_table(dir, "ready_sets.json"),
            nozzle_data: load_json_table(dir, "nozzle_data.json"),
            pe100_friction: load_json_table(dir, "pe100_friction.json"),
            drip_data: load_json_table(dir, "drip_data.json"),
            zone_limits: load_json_table(dir, "zone_limits.json"),
            k_factors: load_json_table(dir, "k_factors.json"),
        };
        tracing::info!(
            "Loaded data tables from {} ({} price list rows)",
            dir.display(),
            tables.price_list.len()
        );
        tables
    }

    /// Render every table as a `NAME = <json>;` line for the system context
    pub fn data_context(&self) -> String {
        let price_list = Value::Array(self.price_list.clone());
        let entries: [(&str, &Value); 7] = [
            ("PRICE_LIST", &price_list),
            ("READY_SETS", &self.ready_sets),
            ("NOZZLE_DATA", &self.nozzle_data),
            ("PE100_FRICTION", &self.pe100_friction),
            ("DRIP_DATA", &self.drip_data),
            ("ZONE_LIMITS", &self.zone_limits),
            ("K_FACTORS", &self.k_factors),
        ];

        let mut out = String::from("\n");
        for (name, value) in entries {
            let json = serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string());
            out.push_str(&format!("{name} = {json};\n"));
        }
        out
    }
}

/// Load one table; a missing or unreadable file yields an empty array
pub fn load_json_table(dir: &Path, file_name: &str) -> Value {
    let path = dir.join(file_name);
    if !path.exists() {
        tracing::warn!("JSON table not found: {}", path.display());
        return Value::Array(Vec::new());
    }

    let parsed = fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()));

    match parsed {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to load JSON table {}: {}", path.display(), e);
            Value::Array(Vec::new())
        }
    }
}
