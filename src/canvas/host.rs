use std::fmt;

use anyhow::Result;
use eframe::egui::{ColorImage, Pos2, Vec2};

/// Identity of the source entity backing a panel (a project-relative path).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raster capture of a live surface at its unscaled size.
#[derive(Clone)]
pub struct Snapshot {
    pub image: ColorImage,
}

impl Snapshot {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.image.size[0] as f32, self.image.size[1] as f32)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("size", &self.image.size)
            .finish()
    }
}

/// The interactive content surface the host mounts for a Live panel.
pub trait LiveSurface {
    /// Mount the surface and show its caret.
    fn mount(&mut self, entity: &EntityId);
    /// Drop any text selection and hide the caret.
    fn deactivate(&mut self, entity: &EntityId);
    fn unmount(&mut self, entity: &EntityId);
    /// Unscaled size the surface wants for its content.
    fn preferred_size(&self, entity: &EntityId) -> Vec2;
    /// Render the mounted surface into an image of exactly `size` pixels.
    fn rasterize(&mut self, entity: &EntityId, size: Vec2) -> Snapshot;
}

/// Source of structural relationships between entities.
pub trait StructureSource {
    /// Declared supertypes of `entity`, already resolved to entity ids where possible.
    fn supertypes(&self, entity: &EntityId) -> Vec<EntityId>;
    /// Replace the declared supertype of `entity`; `None` removes it.
    fn set_supertype(&mut self, entity: &EntityId, supertype: Option<&EntityId>) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    pub pan: Vec2,
    pub zoom_level: u32,
}

pub trait StateStore {
    fn load_position(&self, entity: &EntityId) -> Option<Pos2>;
    fn save_position(&mut self, entity: &EntityId, position: Pos2);
    fn load_viewport(&self) -> ViewportState;
    fn save_viewport(&mut self, state: ViewportState);
}

/// Everything the canvas needs from whoever embeds it.
pub trait CanvasHost: LiveSurface + StructureSource + StateStore {}

impl<T: LiveSurface + StructureSource + StateStore> CanvasHost for T {}
