use shared::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

pub const EAST_WAREHOUSE: &str = "east-warehouse";
pub const WEST_WAREHOUSE: &str = "west-warehouse";

const EASTERN_PROVINCES: [&str; 6] = ["ON", "QC", "NB", "NS", "PE", "NL"];
const WESTERN_PROVINCES: [&str; 7] = ["BC", "AB", "SK", "MB", "YT", "NT", "NU"];

/// Province code to fulfillment location, plus the location used when a
/// province is not mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationTable {
    entries: HashMap<String, String>,
    default_location: String,
}

impl LocationTable {
    pub fn new(default_location: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            default_location: default_location.into(),
        }
    }

    pub fn with(mut self, province: &str, location: &str) -> Self {
        self.entries.insert(normalize_province(province), location.to_string());
        self
    }

    /// Canadian provinces split between the eastern and western warehouses.
    pub fn canada_default(default_location: impl Into<String>) -> Self {
        let table = EASTERN_PROVINCES
            .iter()
            .fold(Self::new(default_location), |table, p| table.with(p, EAST_WAREHOUSE));
        WESTERN_PROVINCES
            .iter()
            .fold(table, |table, p| table.with(p, WEST_WAREHOUSE))
    }

    /// Parses `ON=east-warehouse,BC=west-warehouse` into table entries.
    pub fn parse_pairs(mut self, pairs: &str) -> anyhow::Result<Self> {
        for pair in pairs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (province, location) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("invalid location mapping '{}', expected PROVINCE=location", pair))?;
            let (province, location) = (province.trim(), location.trim());
            if province.is_empty() || location.is_empty() {
                anyhow::bail!("invalid location mapping '{}'", pair);
            }
            self = self.with(province, location);
        }
        Ok(self)
    }

    pub fn lookup(&self, province: &str) -> Option<&str> {
        self.entries.get(&normalize_province(province)).map(String::as_str)
    }

    pub fn default_location(&self) -> &str {
        &self.default_location
    }
}

fn normalize_province(province: &str) -> String {
    province.trim().to_ascii_uppercase()
}

pub struct LocationResolver {
    table: LocationTable,
    fallbacks: AtomicU64,
}

impl LocationResolver {
    pub fn new(table: LocationTable) -> Self {
        Self {
            table,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Never fails: an unmapped province ships from the default location.
    pub fn resolve(&self, address: &Address) -> String {
        match self.table.lookup(&address.province) {
            Some(location) => location.to_string(),
            None => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "No location mapped for province '{}', using default location {}",
                    address.province,
                    self.table.default_location()
                );
                self.table.default_location().to_string()
            }
        }
    }

    /// Number of addresses resolved through the default location.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}
