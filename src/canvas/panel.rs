use std::collections::BTreeSet;

use eframe::egui::{Pos2, Rect, Vec2};
use tracing::debug;

use super::host::{EntityId, LiveSurface, Snapshot};
use super::viewport::{Viewport, ZoomChange};

/// Generational handle into a [`PanelArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId {
    index: u32,
    generation: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Live,
    Frozen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveOutcome {
    Mounted,
    AlreadyLive,
}

/// Title bar and border sizes at native scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chrome {
    pub title_height: f32,
    pub border_width: f32,
}

impl Chrome {
    fn title(&self, zoom: f32) -> f32 {
        (self.title_height * zoom).floor()
    }

    fn border(&self, zoom: f32) -> f32 {
        (self.border_width * zoom).floor()
    }

    /// Offset of the content area from the panel's top-left corner.
    pub fn content_offset(&self, zoom: f32) -> Vec2 {
        let border = self.border(zoom);
        Vec2::new(border, self.title(zoom) + border)
    }

    /// Extra width and height the chrome adds around the content.
    pub fn extent(&self, zoom: f32) -> Vec2 {
        let border = self.border(zoom);
        Vec2::new(2.0 * border, self.title(zoom) + 2.0 * border)
    }
}

#[derive(Debug)]
pub struct Panel {
    entity: EntityId,
    true_position: Pos2,
    size: Vec2,
    mode: RenderMode,
    chrome: Chrome,
    snapshot: Option<Snapshot>,
    snapshot_revision: u64,
    pub(super) selected: bool,
    pub(super) outgoing: BTreeSet<PanelId>,
    pub(super) incoming: BTreeSet<PanelId>,
    pub(super) layer: usize,
    pub(super) processing: bool,
    pub(super) needs_placement: bool,
}

impl Panel {
    /// Panels start Live with their surface mounted.
    pub fn new(
        entity: EntityId,
        position: Pos2,
        chrome: Chrome,
        surface: &mut impl LiveSurface,
        zoom: f32,
    ) -> Self {
        surface.mount(&entity);
        let mut panel = Self {
            entity,
            true_position: position,
            size: Vec2::ZERO,
            mode: RenderMode::Live,
            chrome,
            snapshot: None,
            snapshot_revision: 0,
            selected: false,
            outgoing: BTreeSet::new(),
            incoming: BTreeSet::new(),
            layer: 0,
            processing: false,
            needs_placement: false,
        };
        panel.refresh_size(surface, zoom);
        panel
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn is_live(&self) -> bool {
        self.mode == RenderMode::Live
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn outgoing(&self) -> &BTreeSet<PanelId> {
        &self.outgoing
    }

    pub fn incoming(&self) -> &BTreeSet<PanelId> {
        &self.incoming
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn snapshot_revision(&self) -> u64 {
        self.snapshot_revision
    }

    pub fn true_position(&self) -> Pos2 {
        self.true_position
    }

    pub fn set_position(&mut self, position: Pos2) {
        self.true_position = position;
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.true_position, self.size)
    }

    pub fn screen_location(&self, viewport: &Viewport) -> Pos2 {
        viewport.world_to_screen(self.true_position).round()
    }

    pub fn screen_rect(&self, viewport: &Viewport) -> Rect {
        Rect::from_min_size(self.screen_location(viewport), self.size)
    }

    pub fn title_rect(&self, viewport: &Viewport) -> Rect {
        let rect = self.screen_rect(viewport);
        let offset = self.chrome.content_offset(viewport.current_zoom());
        Rect::from_min_max(rect.min, Pos2::new(rect.max.x, rect.min.y + offset.y))
    }

    pub fn content_rect(&self, viewport: &Viewport) -> Rect {
        let zoom = viewport.current_zoom();
        let rect = self.screen_rect(viewport);
        Rect::from_min_size(
            rect.min + self.chrome.content_offset(zoom),
            (self.size - self.chrome.extent(zoom)).max(Vec2::ZERO),
        )
    }

    pub fn rescale(&mut self, change: &ZoomChange) {
        self.true_position = change.rescale(self.true_position);
    }

    pub fn to_live(&mut self, surface: &mut impl LiveSurface, zoom: f32) -> LiveOutcome {
        if self.is_live() {
            debug!(entity = %self.entity, "panel already live, refreshing size");
            self.refresh_size(surface, zoom);
            return LiveOutcome::AlreadyLive;
        }

        debug!(entity = %self.entity, "panel to live");
        surface.mount(&self.entity);
        self.mode = RenderMode::Live;
        self.refresh_size(surface, zoom);
        LiveOutcome::Mounted
    }

    /// Capture a snapshot of the live surface and swap it in. Runs the full
    /// capture even when already Frozen.
    pub fn to_frozen(&mut self, surface: &mut impl LiveSurface, zoom: f32) {
        debug!(entity = %self.entity, "panel to frozen");
        self.processing = true;
        surface.deactivate(&self.entity);

        if !self.is_live() {
            surface.mount(&self.entity);
        }
        let unscaled = surface.preferred_size(&self.entity);
        let snapshot = surface.rasterize(&self.entity, unscaled);
        surface.unmount(&self.entity);

        self.snapshot = Some(snapshot);
        self.snapshot_revision += 1;
        self.mode = RenderMode::Frozen;
        self.zoom_changed(zoom);
        self.processing = false;
    }

    /// Frozen panels round-trip through Live so the snapshot reflects new
    /// content. Live panels only resize.
    pub fn refresh_content(&mut self, surface: &mut impl LiveSurface, zoom: f32) {
        match self.mode {
            RenderMode::Live => self.refresh_size(surface, zoom),
            RenderMode::Frozen => {
                self.to_live(surface, zoom);
                self.to_frozen(surface, zoom);
            }
        }
    }

    pub fn zoom_changed(&mut self, zoom: f32) {
        if self.is_live() {
            return;
        }
        if let Some(snapshot) = &self.snapshot {
            self.size = (snapshot.size() * zoom).floor() + self.chrome.extent(zoom);
        }
    }

    pub fn refresh_size(&mut self, surface: &impl LiveSurface, zoom: f32) {
        match self.mode {
            RenderMode::Live => {
                self.size = surface.preferred_size(&self.entity) + self.chrome.extent(zoom);
            }
            RenderMode::Frozen => self.zoom_changed(zoom),
        }
    }

    /// Release the surface before the panel is dropped.
    pub fn dispose(&mut self, surface: &mut impl LiveSurface) {
        if self.is_live() {
            surface.unmount(&self.entity);
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    panel: Option<Panel>,
}

/// Panel storage. Removed slots are reused with a bumped generation so old
/// handles resolve to `None`.
#[derive(Debug, Default)]
pub struct PanelArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    insertion: Vec<PanelId>,
}

impl PanelArena {
    pub fn insert(&mut self, panel: Panel) -> PanelId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation += 1;
                slot.panel = Some(panel);
                PanelId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    panel: Some(panel),
                });
                PanelId {
                    index,
                    generation: 0,
                }
            }
        };
        self.insertion.push(id);
        id
    }

    pub fn remove(&mut self, id: PanelId) -> Option<Panel> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let panel = slot.panel.take()?;
        self.free.push(id.index);
        self.insertion.retain(|other| *other != id);
        Some(panel)
    }

    pub fn get(&self, id: PanelId) -> Option<&Panel> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.panel.as_ref()
    }

    pub fn get_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.panel.as_mut()
    }

    pub fn contains(&self, id: PanelId) -> bool {
        self.get(id).is_some()
    }

    /// Ids in the order panels were added.
    pub fn ids(&self) -> &[PanelId] {
        &self.insertion
    }

    pub fn iter(&self) -> impl Iterator<Item = (PanelId, &Panel)> + '_ {
        self.insertion
            .iter()
            .filter_map(|id| self.get(*id).map(|panel| (*id, panel)))
    }

    pub fn len(&self) -> usize {
        self.insertion.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion.is_empty()
    }

    pub fn find(&self, entity: &EntityId) -> Option<PanelId> {
        self.iter()
            .find(|(_, panel)| panel.entity() == entity)
            .map(|(id, _)| id)
    }
}
