use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use eframe::egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::canvas::host::{EntityId, StateStore, ViewportState};
use crate::canvas::viewport::default_viewport_state;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read state file `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state file `{path}` is not valid: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write state file `{path}`: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// On-disk layout of the state file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    pub pan: [f32; 2],
    pub zoom_level: u32,
    #[serde(default)]
    pub positions: BTreeMap<String, [f32; 2]>,
}

impl Default for SavedState {
    fn default() -> Self {
        let viewport = default_viewport_state();
        Self {
            pan: [viewport.pan.x, viewport.pan.y],
            zoom_level: viewport.zoom_level,
            positions: BTreeMap::new(),
        }
    }
}

/// Panel positions and the viewport, persisted as JSON.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    state: SavedState,
    dirty: bool,
}

impl JsonStore {
    /// Open `path`, falling back to defaults when it is missing or unreadable.
    pub fn open(path: &Path) -> Self {
        let state = match read_state(path) {
            Ok(Some(state)) => {
                debug!(path = %path.display(), positions = state.positions.len(), "loaded state file");
                state
            }
            Ok(None) => SavedState::default(),
            Err(err) => {
                warn!(error = %err, "using default canvas state");
                SavedState::default()
            }
        };
        Self {
            path: path.to_path_buf(),
            state,
            dirty: false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn forget(&mut self, entity: &EntityId) {
        if self.state.positions.remove(entity.as_str()).is_some() {
            self.dirty = true;
        }
    }

    /// Write pending changes, if any.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        let write_error = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let json = serde_json::to_string_pretty(&self.state).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(write_error)?;
        self.dirty = false;
        debug!(path = %self.path.display(), "saved state file");
        Ok(())
    }
}

fn read_state(path: &Path) -> Result<Option<SavedState>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

impl StateStore for JsonStore {
    fn load_position(&self, entity: &EntityId) -> Option<Pos2> {
        self.state
            .positions
            .get(entity.as_str())
            .map(|[x, y]| Pos2::new(*x, *y))
    }

    fn save_position(&mut self, entity: &EntityId, position: Pos2) {
        let value = [position.x, position.y];
        if self.state.positions.insert(entity.to_string(), value) != Some(value) {
            self.dirty = true;
        }
    }

    fn load_viewport(&self) -> ViewportState {
        ViewportState {
            pan: Vec2::new(self.state.pan[0], self.state.pan[1]),
            zoom_level: self.state.zoom_level,
        }
    }

    fn save_viewport(&mut self, state: ViewportState) {
        let pan = [state.pan.x, state.pan.y];
        if self.state.pan != pan || self.state.zoom_level != state.zoom_level {
            self.state.pan = pan;
            self.state.zoom_level = state.zoom_level;
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Pos2, Vec2};

    use super::{JsonStore, StoreError, read_state};
    use crate::canvas::host::{EntityId, StateStore, ViewportState};
    use crate::canvas::viewport::default_viewport_state;
    use crate::test_support::{remove_dir_if_exists, temp_path};

    #[test]
    fn missing_file_gives_defaults() {
        let dir = temp_path("store_missing");
        let store = JsonStore::open(&dir.join("state.json"));
        assert_eq!(store.load_viewport(), default_viewport_state());
        assert_eq!(store.load_position(&EntityId::new("A.java")), None);
        assert!(!store.is_dirty());
    }

    #[test]
    fn saved_state_survives_a_reopen() {
        let dir = temp_path("store_roundtrip");
        let path = dir.join("nested/state.json");
        let mut store = JsonStore::open(&path);
        store.save_position(&EntityId::new("A.java"), Pos2::new(12.0, -4.5));
        store.save_viewport(ViewportState {
            pan: Vec2::new(-300.0, 20.0),
            zoom_level: 2,
        });
        assert!(store.is_dirty());
        store.flush().expect("flush");
        assert!(!store.is_dirty());

        let reopened = JsonStore::open(&path);
        assert_eq!(
            reopened.load_position(&EntityId::new("A.java")),
            Some(Pos2::new(12.0, -4.5))
        );
        assert_eq!(reopened.load_viewport().zoom_level, 2);
        assert_eq!(reopened.load_viewport().pan, Vec2::new(-300.0, 20.0));

        remove_dir_if_exists(&dir);
    }

    #[test]
    fn corrupt_file_is_a_parse_error_and_falls_back() {
        let dir = temp_path("store_corrupt");
        std::fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("state.json");
        std::fs::write(&path, "{ not json").expect("write");

        assert!(matches!(read_state(&path), Err(StoreError::Parse { .. })));
        let store = JsonStore::open(&path);
        assert_eq!(store.load_viewport(), default_viewport_state());

        remove_dir_if_exists(&dir);
    }

    #[test]
    fn unchanged_saves_and_unknown_forgets_stay_clean() {
        let dir = temp_path("store_clean");
        let mut store = JsonStore::open(&dir.join("state.json"));
        store.save_viewport(default_viewport_state());
        store.forget(&EntityId::new("A.java"));
        assert!(!store.is_dirty());

        store.save_position(&EntityId::new("A.java"), Pos2::new(1.0, 2.0));
        store.flush().expect("flush");
        store.forget(&EntityId::new("A.java"));
        assert!(store.is_dirty());

        remove_dir_if_exists(&dir);
    }
}
