//! The spatial engine: class panels on an unbounded plane, the extends arrows
//! between them, and the pointer model that drives both.

pub mod arrows;
pub mod host;
mod interaction;
pub mod panel;
mod relations;
#[cfg(test)]
pub(crate) mod test_support;
pub mod viewport;
mod work;

use std::collections::HashMap;

use eframe::egui::{Pos2, Rect, Vec2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::layout::{self, LayoutParams};

pub use arrows::{ArrowPath, arrow_head};
pub use host::{CanvasHost, EntityId, LiveSurface, Snapshot, StateStore, StructureSource, ViewportState};
pub use interaction::{EdgeHandle, Gesture};
pub use panel::{Panel, PanelId, RenderMode};
pub use viewport::Viewport;

use interaction::PointerState;
use panel::{Chrome, PanelArena};
use work::WorkQueue;

#[derive(Clone, Debug)]
pub struct CanvasConfig {
    /// Gap between panels at native scale.
    pub spacing: f32,
    pub zoom_base: f32,
    pub max_zoom_level: u32,
    pub wheel_pan_step: f32,
    /// Horizontal stretch of the packing search.
    pub spread_ratio: f32,
    pub radius_steps_per_spacing: f32,
    pub edge_handle_diameter: f32,
    pub click_slop: f32,
    pub title_height: f32,
    pub border_width: f32,
    /// Screen point new layouts grow out from.
    pub layout_origin: Pos2,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            spacing: 100.0,
            zoom_base: 0.5,
            max_zoom_level: 7,
            wheel_pan_step: 60.0,
            spread_ratio: 2.0,
            radius_steps_per_spacing: 20.0,
            edge_handle_diameter: 50.0,
            click_slop: 3.0,
            title_height: 20.0,
            border_width: 5.0,
            layout_origin: Pos2::new(500.0, 500.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanvasEvent {
    PanelCreated(EntityId),
    PanelRemoved(EntityId),
    SelectionChanged(Option<EntityId>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoutedArrow {
    pub from: PanelId,
    pub to: PanelId,
    pub path: ArrowPath,
}

pub struct Canvas {
    config: CanvasConfig,
    panels: PanelArena,
    viewport: Viewport,
    pointer: PointerState,
    work: WorkQueue,
    loading: bool,
    loaded: usize,
    load_total: usize,
    events: Vec<CanvasEvent>,
    repaint: bool,
    rng: StdRng,
}

impl Canvas {
    pub fn new(config: CanvasConfig, store: &impl StateStore) -> Self {
        Self::with_rng(config, store, StdRng::from_entropy())
    }

    pub fn with_rng(config: CanvasConfig, store: &impl StateStore, rng: StdRng) -> Self {
        let viewport = Viewport::new(store.load_viewport(), config.zoom_base, config.max_zoom_level);
        Self {
            config,
            panels: PanelArena::default(),
            viewport,
            pointer: PointerState::default(),
            work: WorkQueue::default(),
            loading: false,
            loaded: 0,
            load_total: 0,
            events: Vec::new(),
            repaint: true,
            rng,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(id)
    }

    pub fn find(&self, entity: &EntityId) -> Option<PanelId> {
        self.panels.find(entity)
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn panels(&self) -> impl Iterator<Item = (PanelId, &Panel)> + '_ {
        self.panels.iter()
    }

    /// Panels back to front.
    pub fn paint_order(&self) -> impl Iterator<Item = (PanelId, &Panel)> + '_ {
        self.pointer
            .order
            .iter()
            .filter_map(|id| self.panels.get(*id).map(|panel| (*id, panel)))
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load_progress(&self) -> (usize, usize) {
        (self.loaded, self.load_total)
    }

    /// True while a panel is mid-transition or freezes are still queued.
    pub fn is_busy(&self) -> bool {
        self.work.has_freeze() || self.panels.iter().any(|(_, panel)| panel.is_processing())
    }

    pub fn take_repaint_request(&mut self) -> bool {
        std::mem::take(&mut self.repaint)
    }

    pub fn drain_events(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.events)
    }

    fn request_repaint(&mut self) {
        self.repaint = true;
    }

    fn chrome(&self) -> Chrome {
        Chrome {
            title_height: self.config.title_height,
            border_width: self.config.border_width,
        }
    }

    fn layout_params(&self, origin: Pos2) -> LayoutParams {
        LayoutParams {
            spacing: self.config.spacing * self.viewport.current_zoom(),
            spread_ratio: self.config.spread_ratio,
            radius_steps_per_spacing: self.config.radius_steps_per_spacing,
            origin,
        }
    }

    /// Runtime creation: the new panel is selected, placed clear of the
    /// others and frozen.
    pub fn add_entity(&mut self, entity: EntityId, host: &mut impl CanvasHost) -> PanelId {
        if let Some(existing) = self.panels.find(&entity) {
            return existing;
        }

        info!(entity = %entity, "adding panel");
        let id = self.create_panel(entity, host);
        self.rebuild_all(&*host);
        if self.panels.get(id).is_some_and(|panel| panel.needs_placement) {
            self.place_unplaced(id, host);
        }
        self.click_panel(id);

        let zoom = self.viewport.current_zoom();
        if let Some(panel) = self.panels.get_mut(id) {
            panel.to_frozen(host, zoom);
        }
        id
    }

    pub fn remove_entity(&mut self, entity: &EntityId, host: &mut impl CanvasHost) {
        let Some(id) = self.panels.find(entity) else {
            return;
        };
        let Some(mut panel) = self.panels.remove(id) else {
            return;
        };
        info!(entity = %entity, "removing panel");
        panel.dispose(host);

        for other in self.panels.ids().to_vec() {
            if let Some(other) = self.panels.get_mut(other) {
                other.outgoing.remove(&id);
                other.incoming.remove(&id);
            }
        }

        if self.pointer.forget(id) {
            self.events.push(CanvasEvent::SelectionChanged(None));
        }
        self.work.forget(id);
        self.renumber_layers();
        self.all_to_frozen(host);

        self.events.push(CanvasEvent::PanelRemoved(entity.clone()));
        self.request_repaint();
    }

    /// The entity's text changed. Frozen panels re-capture via a Live round-trip.
    pub fn content_changed(&mut self, entity: &EntityId, host: &mut impl LiveSurface) {
        let zoom = self.viewport.current_zoom();
        let Some(panel) = self.panels.find(entity).and_then(|id| self.panels.get_mut(id)) else {
            return;
        };
        panel.refresh_content(host, zoom);
        self.request_repaint();
    }

    /// Lay every panel out from scratch.
    pub fn relayout(&mut self, host: &mut impl StateStore) {
        let ids = self.panels.ids().to_vec();
        let index_of = ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect::<HashMap<_, _>>();

        let mut sizes = Vec::with_capacity(ids.len());
        let mut parents = Vec::with_capacity(ids.len());
        for (_, panel) in self.panels.iter() {
            sizes.push(panel.size());
            parents.push(
                panel
                    .outgoing()
                    .iter()
                    .find_map(|target| index_of.get(target).copied()),
            );
        }

        let origin = self.viewport.screen_to_world(self.config.layout_origin);
        let params = self.layout_params(origin);
        let arrangement = layout::arrange(&sizes, &parents, &params, &mut self.rng);
        info!(
            panels = ids.len(),
            roots = arrangement.root_count,
            spacing = params.spacing,
            "laid out all panels"
        );

        for (id, position) in ids.into_iter().zip(arrangement.positions) {
            self.move_panel(id, position, host);
        }
        self.request_repaint();
    }

    /// Every outgoing edge as an arrow between screen rects.
    pub fn arrows(&self) -> Vec<RoutedArrow> {
        let mut arrows = Vec::new();
        for (from, panel) in self.panels.iter() {
            for to in panel.outgoing() {
                let Some(target) = self.panels.get(*to) else {
                    continue;
                };
                arrows.push(RoutedArrow {
                    from,
                    to: *to,
                    path: arrows::route(
                        panel.screen_rect(&self.viewport),
                        target.screen_rect(&self.viewport),
                    ),
                });
            }
        }
        arrows
    }

    fn create_panel(&mut self, entity: EntityId, host: &mut impl CanvasHost) -> PanelId {
        let saved = host.load_position(&entity);
        let position = saved.unwrap_or_else(viewport::world_center);
        let mut panel = Panel::new(
            entity.clone(),
            position,
            self.chrome(),
            host,
            self.viewport.current_zoom(),
        );
        panel.needs_placement = saved.is_none();

        let id = self.panels.insert(panel);
        self.pointer.order.push(id);
        if let Some(panel) = self.panels.get_mut(id) {
            panel.layer = self.pointer.order.len();
        }
        debug!(entity = %entity, saved = saved.is_some(), "panel created");
        self.events.push(CanvasEvent::PanelCreated(entity));
        self.request_repaint();
        id
    }

    fn move_panel(&mut self, id: PanelId, position: Pos2, host: &mut impl StateStore) {
        let Some(panel) = self.panels.get_mut(id) else {
            return;
        };
        panel.set_position(position);
        panel.needs_placement = false;
        host.save_position(panel.entity(), position);
    }

    /// Pack one panel clear of every placed panel, searching out from
    /// their average position.
    fn place_unplaced(&mut self, id: PanelId, host: &mut impl StateStore) {
        let Some(size) = self.panels.get(id).map(Panel::size) else {
            return;
        };

        let placed = self
            .panels
            .iter()
            .filter(|(other, panel)| *other != id && !panel.needs_placement)
            .map(|(_, panel)| panel.rect())
            .collect::<Vec<Rect>>();
        let origin = average_corner(&placed)
            .unwrap_or_else(|| self.viewport.screen_to_world(self.config.layout_origin));

        let params = self.layout_params(origin);
        let position = layout::place_single(size, placed, &params, &mut self.rng);
        debug!(?position, "placed panel without saved position");
        self.move_panel(id, position, host);
        self.request_repaint();
    }

    fn all_to_frozen(&mut self, host: &mut impl LiveSurface) {
        let zoom = self.viewport.current_zoom();
        for id in self.panels.ids().to_vec() {
            if let Some(panel) = self.panels.get_mut(id)
                && panel.is_live()
            {
                panel.to_frozen(host, zoom);
            }
        }
        self.pointer.active = None;
        self.request_repaint();
    }

    fn renumber_layers(&mut self) {
        self.pointer.order.retain(|id| self.panels.contains(*id));
        for (layer, id) in self.pointer.order.iter().enumerate() {
            if let Some(panel) = self.panels.get_mut(*id) {
                panel.layer = layer + 1;
            }
        }
    }
}

fn average_corner(rects: &[Rect]) -> Option<Pos2> {
    if rects.is_empty() {
        return None;
    }
    let sum = rects
        .iter()
        .fold(Vec2::ZERO, |sum, rect| sum + rect.min.to_vec2());
    Some((sum / rects.len() as f32).to_pos2())
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Pos2, Rect, pos2};

    use super::test_support::{FakeHost, loaded_canvas};
    use super::{Canvas, CanvasEvent, EntityId, RenderMode};

    fn screen_rects(canvas: &Canvas) -> Vec<Rect> {
        canvas
            .panels()
            .map(|(_, panel)| panel.screen_rect(canvas.viewport()))
            .collect()
    }

    #[test]
    fn three_unrelated_panels_load_without_overlap_or_arrows() {
        let mut host = FakeHost::with_sizes(&[
            ("A", 300.0, 120.0),
            ("B", 200.0, 90.0),
            ("C", 150.0, 150.0),
        ]);
        let canvas = loaded_canvas(&mut host, &["A", "B", "C"]);

        assert!(!canvas.is_loading());
        assert_eq!(canvas.panel_count(), 3);
        assert!(canvas.arrows().is_empty());
        let rects = screen_rects(&canvas);
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.intersects(*b));
            }
        }
        assert!(canvas.panels().all(|(_, panel)| panel.mode() == RenderMode::Frozen));
        assert_eq!(host.positions.len(), 3);
    }

    #[test]
    fn extends_edge_draws_one_arrow_from_subtype_to_supertype() {
        let mut host = FakeHost::with_sizes(&[("A", 300.0, 120.0), ("B", 200.0, 90.0)]);
        host.declare("A", "B");
        let canvas = loaded_canvas(&mut host, &["A", "B"]);

        let a = canvas.find(&EntityId::new("A")).expect("A loaded");
        let b = canvas.find(&EntityId::new("B")).expect("B loaded");
        let arrows = canvas.arrows();
        assert_eq!(arrows.len(), 1);
        assert_eq!((arrows[0].from, arrows[0].to), (a, b));

        let a_rect = canvas.panel(a).map(|panel| panel.rect()).expect("A rect");
        let b_rect = canvas.panel(b).map(|panel| panel.rect()).expect("B rect");
        assert!(a_rect.top() > b_rect.bottom());
    }

    #[test]
    fn saved_positions_are_kept_and_only_new_panels_are_placed() {
        let mut host = FakeHost::with_sizes(&[("A", 100.0, 100.0), ("B", 100.0, 100.0)]);
        host.positions.insert(EntityId::new("A"), pos2(1000.0, 1000.0));
        let canvas = loaded_canvas(&mut host, &["A", "B"]);

        let a = canvas.find(&EntityId::new("A")).expect("A loaded");
        let b = canvas.find(&EntityId::new("B")).expect("B loaded");
        let a_rect = canvas.panel(a).map(|panel| panel.rect()).expect("A rect");
        let b_rect = canvas.panel(b).map(|panel| panel.rect()).expect("B rect");
        assert_eq!(a_rect.min, pos2(1000.0, 1000.0));
        assert!(!a_rect.expand(100.0).intersects(b_rect.expand(100.0)));
    }

    #[test]
    fn runtime_add_selects_places_and_freezes() {
        let mut host = FakeHost::with_sizes(&[("A", 100.0, 100.0), ("B", 120.0, 60.0)]);
        let mut canvas = loaded_canvas(&mut host, &["A"]);
        canvas.drain_events();

        let id = canvas.add_entity(EntityId::new("B"), &mut host);
        let panel = canvas.panel(id).expect("B added");
        assert!(panel.is_selected());
        assert_eq!(panel.mode(), RenderMode::Frozen);
        assert_ne!(panel.true_position(), super::viewport::world_center());
        assert_eq!(
            canvas.drain_events(),
            vec![
                CanvasEvent::PanelCreated(EntityId::new("B")),
                CanvasEvent::SelectionChanged(Some(EntityId::new("B"))),
            ]
        );

        let again = canvas.add_entity(EntityId::new("B"), &mut host);
        assert_eq!(again, id);
        assert_eq!(canvas.panel_count(), 2);
    }

    #[test]
    fn removing_a_panel_clears_every_reference_to_it() {
        let mut host = FakeHost::with_sizes(&[("A", 100.0, 100.0), ("B", 100.0, 100.0)]);
        host.declare("A", "B");
        host.declare("C", "B");
        let mut canvas = loaded_canvas(&mut host, &["A", "B", "C"]);
        let a = canvas.find(&EntityId::new("A")).expect("A loaded");
        let b = canvas.find(&EntityId::new("B")).expect("B loaded");
        let c = canvas.find(&EntityId::new("C")).expect("C loaded");

        let b_centre = canvas
            .panel(b)
            .map(|panel| panel.screen_rect(canvas.viewport()).center())
            .expect("B rect");
        canvas.pointer_moved(b_centre, &mut host);
        canvas.pointer_pressed(b_centre, eframe::egui::PointerButton::Primary);
        canvas.pointer_released(b_centre, eframe::egui::PointerButton::Primary, &mut host);
        assert_eq!(canvas.selected(), Some(b));
        canvas.drain_events();

        canvas.remove_entity(&EntityId::new("B"), &mut host);

        assert!(canvas.panel(b).is_none());
        assert_eq!(canvas.selected(), None);
        assert_eq!(canvas.hovered(), None);
        assert_eq!(canvas.drag_hovered(), None);
        assert!(canvas.paint_order().all(|(id, _)| id != b));
        for id in [a, c] {
            let panel = canvas.panel(id).expect("survivor");
            assert!(!panel.outgoing().contains(&b));
            assert!(!panel.incoming().contains(&b));
        }
        assert!(canvas.arrows().is_empty());
        assert_eq!(
            canvas.drain_events(),
            vec![
                CanvasEvent::SelectionChanged(None),
                CanvasEvent::PanelRemoved(EntityId::new("B")),
            ]
        );
        assert!(!host.mounted.contains(&EntityId::new("B")));
    }

    #[test]
    fn content_change_recaptures_frozen_panel() {
        let mut host = FakeHost::with_sizes(&[("A", 100.0, 100.0)]);
        let mut canvas = loaded_canvas(&mut host, &["A"]);
        let a = canvas.find(&EntityId::new("A")).expect("A loaded");
        let revision = canvas.panel(a).map(|panel| panel.snapshot_revision());

        host.sizes.insert(EntityId::new("A"), eframe::egui::vec2(100.0, 300.0));
        canvas.content_changed(&EntityId::new("A"), &mut host);

        let panel = canvas.panel(a).expect("A");
        assert_eq!(panel.mode(), RenderMode::Frozen);
        assert_eq!(Some(panel.snapshot_revision()), revision.map(|rev| rev + 1));
        assert_eq!(panel.size().y, 300.0 + 30.0);
        assert!(canvas.take_repaint_request());
    }

    #[test]
    fn relayout_writes_every_position_to_the_store() {
        let mut host = FakeHost::with_sizes(&[("A", 100.0, 100.0), ("B", 100.0, 100.0)]);
        host.positions.insert(EntityId::new("A"), Pos2::ZERO);
        host.positions.insert(EntityId::new("B"), Pos2::ZERO);
        let mut canvas = loaded_canvas(&mut host, &["A", "B"]);

        canvas.relayout(&mut host);
        let a = host.positions[&EntityId::new("A")];
        let b = host.positions[&EntityId::new("B")];
        assert_ne!(a, b);
    }
}
