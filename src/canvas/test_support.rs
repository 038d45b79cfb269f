use std::collections::{BTreeSet, HashMap};

use anyhow::{Result, bail};
use eframe::egui::{ColorImage, Pos2, Vec2, vec2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::host::{EntityId, LiveSurface, Snapshot, StateStore, StructureSource, ViewportState};
use super::viewport::default_viewport_state;
use super::{Canvas, CanvasConfig};

/// A canvas with `names` loaded and every queued step drained.
pub fn loaded_canvas(host: &mut FakeHost, names: &[&str]) -> Canvas {
    let mut canvas = Canvas::with_rng(CanvasConfig::default(), &*host, StdRng::seed_from_u64(42));
    canvas.begin_loading(names.iter().map(|name| EntityId::new(*name)));
    while canvas.run_pending_work(host) {}
    canvas
}

/// In-memory collaborator that records every surface call.
#[derive(Debug)]
pub struct FakeHost {
    pub sizes: HashMap<EntityId, Vec2>,
    pub supertypes: HashMap<EntityId, Vec<EntityId>>,
    pub mounted: BTreeSet<EntityId>,
    pub calls: Vec<String>,
    pub positions: HashMap<EntityId, Pos2>,
    pub viewport: ViewportState,
    pub viewport_saves: usize,
    pub fail_edits: bool,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            sizes: HashMap::new(),
            supertypes: HashMap::new(),
            mounted: BTreeSet::new(),
            calls: Vec::new(),
            positions: HashMap::new(),
            viewport: default_viewport_state(),
            viewport_saves: 0,
            fail_edits: false,
        }
    }
}

impl FakeHost {
    pub fn with_sizes(entries: &[(&str, f32, f32)]) -> Self {
        let mut host = Self::default();
        for (name, width, height) in entries {
            host.sizes.insert(EntityId::new(*name), vec2(*width, *height));
        }
        host
    }

    pub fn declare(&mut self, entity: &str, supertype: &str) {
        self.supertypes
            .insert(EntityId::new(entity), vec![EntityId::new(supertype)]);
    }
}

impl LiveSurface for FakeHost {
    fn mount(&mut self, entity: &EntityId) {
        self.calls.push(format!("mount {entity}"));
        self.mounted.insert(entity.clone());
    }

    fn deactivate(&mut self, entity: &EntityId) {
        self.calls.push(format!("deactivate {entity}"));
    }

    fn unmount(&mut self, entity: &EntityId) {
        self.calls.push(format!("unmount {entity}"));
        self.mounted.remove(entity);
    }

    fn preferred_size(&self, entity: &EntityId) -> Vec2 {
        self.sizes
            .get(entity)
            .copied()
            .unwrap_or(vec2(100.0, 50.0))
    }

    fn rasterize(&mut self, entity: &EntityId, size: Vec2) -> Snapshot {
        self.calls.push(format!("rasterize {entity}"));
        let [width, height] = if self.mounted.contains(entity) {
            [size.x as usize, size.y as usize]
        } else {
            [0, 0]
        };
        Snapshot {
            image: ColorImage::from_rgba_unmultiplied(
                [width, height],
                &vec![255; width * height * 4],
            ),
        }
    }
}

impl StructureSource for FakeHost {
    fn supertypes(&self, entity: &EntityId) -> Vec<EntityId> {
        self.supertypes.get(entity).cloned().unwrap_or_default()
    }

    fn set_supertype(&mut self, entity: &EntityId, supertype: Option<&EntityId>) -> Result<()> {
        if self.fail_edits {
            bail!("edit rejected for {entity}");
        }
        match supertype {
            Some(target) => {
                self.supertypes.insert(entity.clone(), vec![target.clone()]);
            }
            None => {
                self.supertypes.remove(entity);
            }
        }
        Ok(())
    }
}

impl StateStore for FakeHost {
    fn load_position(&self, entity: &EntityId) -> Option<Pos2> {
        self.positions.get(entity).copied()
    }

    fn save_position(&mut self, entity: &EntityId, position: Pos2) {
        self.positions.insert(entity.clone(), position);
    }

    fn load_viewport(&self) -> ViewportState {
        self.viewport
    }

    fn save_viewport(&mut self, state: ViewportState) {
        self.viewport = state;
        self.viewport_saves += 1;
    }
}
