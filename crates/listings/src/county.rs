use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountyTableError {
    Parse(String),
    Io(String),
}

impl std::fmt::Display for CountyTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountyTableError::Parse(msg) => write!(f, "county table is not valid JSON: {msg}"),
            CountyTableError::Io(msg) => write!(f, "county table could not be read: {msg}"),
        }
    }
}

impl std::error::Error for CountyTableError {}

/// First three alphanumerics of a postal code, upper-cased (`"d02 x285"` -> `"D02"`).
pub fn routing_key(code: &str) -> Option<String> {
    let key: String = code
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (key.len() == 3).then_some(key)
}

/// Read-only routing key to county lookup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CountyTable {
    by_key: BTreeMap<String, String>,
}

impl CountyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{ "D02": { "county": "Dublin" }, ... }`.
    ///
    /// Keys are normalised through [`routing_key`]; entries without a usable
    /// key or county name are skipped.
    pub fn from_json_str(raw: &str) -> Result<Self, CountyTableError> {
        let entries: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(raw).map_err(|e| CountyTableError::Parse(e.to_string()))?;

        let mut by_key = BTreeMap::new();
        for (key, value) in entries {
            let Some(key) = routing_key(&key) else {
                continue;
            };
            let county = ["county", "County", "COUNTY"]
                .iter()
                .find_map(|field| value.get(field).and_then(|v| v.as_str()));
            if let Some(county) = county.map(str::trim).filter(|c| !c.is_empty()) {
                by_key.insert(key, county.to_string());
            }
        }
        Ok(Self { by_key })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CountyTableError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CountyTableError::Io(e.to_string()))?;
        Self::from_json_str(&raw)
    }

    pub fn insert(&mut self, key: &str, county: impl Into<String>) {
        if let Some(key) = routing_key(key) {
            self.by_key.insert(key, county.into());
        }
    }

    /// County for any code whose routing key is known.
    pub fn county_for(&self, code: &str) -> Option<&str> {
        let key = routing_key(code)?;
        self.by_key.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Load-once holder for a [`CountyTable`].
///
/// The first `get_or_load` runs the loader; later calls return the same table.
/// A failed load is logged and memoized as an empty table.
#[derive(Debug, Default)]
pub struct CountyTableCell {
    cell: OnceCell<Rc<CountyTable>>,
}

impl CountyTableCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load<F>(&self, load: F) -> Rc<CountyTable>
    where
        F: FnOnce() -> Result<CountyTable, CountyTableError>,
    {
        let table = self.cell.get_or_init(|| match load() {
            Ok(table) => Rc::new(table),
            Err(err) => {
                warn!(%err, "county table unavailable; continuing without it");
                Rc::new(CountyTable::new())
            }
        });
        Rc::clone(table)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
