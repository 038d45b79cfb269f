use std::collections::BTreeSet;

use anyhow::Result;
use eframe::egui::{Pos2, Vec2};
use tracing::{debug, trace, warn};

use crate::canvas::{EntityId, LiveSurface, Snapshot, StateStore, StructureSource, ViewportState};
use crate::source::ClassProject;
use crate::store::JsonStore;

use super::raster::MinimapRenderer;

/// Binds the canvas to the project on disk, the state file and the
/// minimap renderer.
pub(super) struct WorkspaceHost {
    pub(super) project: ClassProject,
    pub(super) store: JsonStore,
    pub(super) raster: MinimapRenderer,
    mounted: BTreeSet<EntityId>,
    caret: Option<EntityId>,
    /// Gets the caret back when the current owner goes away.
    caret_before: Option<EntityId>,
}

impl WorkspaceHost {
    pub(super) fn new(project: ClassProject, store: JsonStore) -> Self {
        Self {
            project,
            store,
            raster: MinimapRenderer::default(),
            mounted: BTreeSet::new(),
            caret: None,
            caret_before: None,
        }
    }

    pub(super) fn text(&self, entity: &EntityId) -> &str {
        self.project
            .file(entity)
            .map_or("", |file| file.text.as_str())
    }

    pub(super) fn title(&self, entity: &EntityId) -> String {
        self.project
            .file(entity)
            .map(|file| file.title())
            .unwrap_or_else(|| crate::util::short_name(entity.as_str()).to_owned())
    }

    pub(super) fn is_mounted(&self, entity: &EntityId) -> bool {
        self.mounted.contains(entity)
    }

    pub(super) fn has_caret(&self, entity: &EntityId) -> bool {
        self.caret.as_ref() == Some(entity)
    }

    pub(super) fn flush_store(&mut self) {
        if let Err(err) = self.store.flush() {
            warn!(error = %err, "failed to save canvas state");
        }
    }
}

impl LiveSurface for WorkspaceHost {
    fn mount(&mut self, entity: &EntityId) {
        trace!(entity = %entity, "mount");
        self.mounted.insert(entity.clone());
        if let Some(previous) = self.caret.replace(entity.clone())
            && previous != *entity
        {
            self.caret_before = Some(previous);
        }
    }

    fn deactivate(&mut self, entity: &EntityId) {
        if self.caret_before.as_ref() == Some(entity) {
            self.caret_before = None;
        }
        if self.has_caret(entity) {
            self.caret = self
                .caret_before
                .take()
                .filter(|previous| self.mounted.contains(previous));
        }
    }

    fn unmount(&mut self, entity: &EntityId) {
        trace!(entity = %entity, "unmount");
        self.mounted.remove(entity);
        self.deactivate(entity);
    }

    fn preferred_size(&self, entity: &EntityId) -> Vec2 {
        self.raster.preferred_size(self.text(entity))
    }

    fn rasterize(&mut self, entity: &EntityId, size: Vec2) -> Snapshot {
        if !self.is_mounted(entity) {
            debug!(entity = %entity, "rasterizing an unmounted surface");
        }
        Snapshot {
            image: self.raster.render(self.text(entity), size),
        }
    }
}

impl StructureSource for WorkspaceHost {
    fn supertypes(&self, entity: &EntityId) -> Vec<EntityId> {
        self.project.supertypes(entity)
    }

    fn set_supertype(&mut self, entity: &EntityId, supertype: Option<&EntityId>) -> Result<()> {
        self.project.set_supertype(entity, supertype)
    }
}

impl StateStore for WorkspaceHost {
    fn load_position(&self, entity: &EntityId) -> Option<Pos2> {
        self.store.load_position(entity)
    }

    fn save_position(&mut self, entity: &EntityId, position: Pos2) {
        self.store.save_position(entity, position);
    }

    fn load_viewport(&self) -> ViewportState {
        self.store.load_viewport()
    }

    fn save_viewport(&mut self, state: ViewportState) {
        self.store.save_viewport(state);
    }
}
