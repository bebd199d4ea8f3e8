use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use foundation::geo::LngLat;
use serde::{Deserialize, Serialize};

/// Last map view, restored on the next session.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PersistedView {
    pub center: LngLat,
    pub zoom: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basemap {
    #[default]
    Standard,
    Satellite,
    Dark,
}

/// User layer visibility: one base map plus named overlays.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerToggles {
    pub basemap: Basemap,
    pub overlays: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound,
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "view store location not found"),
            StoreError::Corrupt(msg) => write!(f, "view store corrupt: {msg}"),
            StoreError::Io(msg) => write!(f, "view store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Host-owned key/value blobs the engine reads once and writes on change.
pub trait ViewStore {
    fn load_view(&self) -> Result<Option<PersistedView>, StoreError>;
    fn save_view(&mut self, view: &PersistedView) -> Result<(), StoreError>;
    fn load_layers(&self) -> Result<Option<LayerToggles>, StoreError>;
    fn save_layers(&mut self, layers: &LayerToggles) -> Result<(), StoreError>;
}

/// On-disk and in-memory shape of [`PersistedView`].
#[derive(Debug, Serialize, Deserialize)]
struct ViewBlob {
    /// `[lng, lat]`
    center: [f64; 2],
    zoom: f64,
}

impl From<&PersistedView> for ViewBlob {
    fn from(v: &PersistedView) -> Self {
        Self {
            center: v.center.to_array(),
            zoom: v.zoom,
        }
    }
}

impl ViewBlob {
    fn into_view(self) -> Result<PersistedView, StoreError> {
        let center = LngLat::from_array(self.center);
        if !center.is_valid() || !self.zoom.is_finite() {
            return Err(StoreError::Corrupt(format!(
                "invalid persisted view {:?} @ {}",
                self.center, self.zoom
            )));
        }
        Ok(PersistedView {
            center,
            zoom: self.zoom,
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryViewStore {
    view: Option<PersistedView>,
    layers: Option<LayerToggles>,
    writes: usize,
}

impl InMemoryViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(view: PersistedView) -> Self {
        Self {
            view: Some(view),
            ..Self::default()
        }
    }

    /// Total successful saves of either blob.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ViewStore for InMemoryViewStore {
    fn load_view(&self) -> Result<Option<PersistedView>, StoreError> {
        Ok(self.view)
    }

    fn save_view(&mut self, view: &PersistedView) -> Result<(), StoreError> {
        self.view = Some(*view);
        self.writes += 1;
        Ok(())
    }

    fn load_layers(&self) -> Result<Option<LayerToggles>, StoreError> {
        Ok(self.layers.clone())
    }

    fn save_layers(&mut self, layers: &LayerToggles) -> Result<(), StoreError> {
        self.layers = Some(layers.clone());
        self.writes += 1;
        Ok(())
    }
}

/// Stores each blob as a small JSON file inside a directory.
#[derive(Debug)]
pub struct JsonFileViewStore {
    dir: PathBuf,
}

impl JsonFileViewStore {
    const VIEW_FILE: &'static str = "view.json";
    const LAYERS_FILE: &'static str = "layers.json";

    /// The directory must already exist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(StoreError::NotFound);
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(name);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(format!("read {}: {e}", path.display()))),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::write(&path, raw)
            .map_err(|e| StoreError::Io(format!("write {}: {e}", path.display())))
    }
}

impl ViewStore for JsonFileViewStore {
    fn load_view(&self) -> Result<Option<PersistedView>, StoreError> {
        self.read_json::<ViewBlob>(Self::VIEW_FILE)?
            .map(ViewBlob::into_view)
            .transpose()
    }

    fn save_view(&mut self, view: &PersistedView) -> Result<(), StoreError> {
        self.write_json(Self::VIEW_FILE, &ViewBlob::from(view))
    }

    fn load_layers(&self) -> Result<Option<LayerToggles>, StoreError> {
        self.read_json(Self::LAYERS_FILE)
    }

    fn save_layers(&mut self, layers: &LayerToggles) -> Result<(), StoreError> {
        self.write_json(Self::LAYERS_FILE, layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dublin() -> PersistedView {
        PersistedView {
            center: LngLat::new(-6.26, 53.35),
            zoom: 12.5,
        }
    }

    #[test]
    fn in_memory_round_trip_counts_writes() {
        let mut store = InMemoryViewStore::new();
        assert_eq!(store.load_view().unwrap(), None);
        store.save_view(&dublin()).unwrap();
        store.save_layers(&LayerToggles::default()).unwrap();
        assert_eq!(store.load_view().unwrap(), Some(dublin()));
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn json_file_store_persists_both_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileViewStore::open(dir.path()).unwrap();
        assert_eq!(store.load_view().unwrap(), None);
        assert_eq!(store.load_layers().unwrap(), None);

        let mut layers = LayerToggles {
            basemap: Basemap::Satellite,
            ..LayerToggles::default()
        };
        layers.overlays.insert("schools".to_string(), true);
        store.save_view(&dublin()).unwrap();
        store.save_layers(&layers).unwrap();

        let reopened = JsonFileViewStore::open(dir.path()).unwrap();
        assert_eq!(reopened.load_view().unwrap(), Some(dublin()));
        assert_eq!(reopened.load_layers().unwrap(), Some(layers));

        let raw = std::fs::read_to_string(dir.path().join("layers.json")).unwrap();
        assert!(raw.contains("\"satellite\""));
    }

    #[test]
    fn corrupt_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("view.json"), "{not json").unwrap();
        let store = JsonFileViewStore::open(dir.path()).unwrap();
        assert!(matches!(store.load_view(), Err(StoreError::Corrupt(_))));

        std::fs::write(dir.path().join("view.json"), r#"{"center":[500,0],"zoom":3}"#).unwrap();
        assert!(matches!(store.load_view(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert!(matches!(
            JsonFileViewStore::open(gone),
            Err(StoreError::NotFound)
        ));
    }
}
