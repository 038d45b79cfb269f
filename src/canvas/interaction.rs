use eframe::egui::{Modifiers, PointerButton, Pos2, Vec2, vec2};
use tracing::{debug, info};

use super::arrows::ArrowPath;
use super::host::{CanvasHost, LiveSurface, StateStore};
use super::{Canvas, CanvasEvent, PanelId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    DragPanel {
        panel: PanelId,
        press: Pos2,
        start: Pos2,
        moved: bool,
    },
    Pan {
        press: Pos2,
        start_pan: Vec2,
    },
    LinkDrag {
        source: PanelId,
        pointer: Pos2,
    },
}

/// The round affordance on the selected panel used to drag out a link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeHandle {
    pub center: Pos2,
    pub radius: f32,
    pub hovered: bool,
    pub dragging: bool,
}

#[derive(Debug, Default)]
pub(super) struct PointerState {
    pub(super) hovered: Option<PanelId>,
    pub(super) selected: Option<PanelId>,
    pub(super) drag_hovered: Option<PanelId>,
    /// The panel hover made Live.
    pub(super) active: Option<PanelId>,
    /// Back to front.
    pub(super) order: Vec<PanelId>,
    pub(super) gesture: Option<Gesture>,
    pub(super) position: Option<Pos2>,
    press: Option<Pos2>,
    /// Ctrl+wheel notches not yet worth a whole zoom step.
    zoom_notches: f32,
}

impl PointerState {
    /// Drop every reference to `id`. Returns whether it was selected.
    pub(super) fn forget(&mut self, id: PanelId) -> bool {
        for slot in [&mut self.hovered, &mut self.drag_hovered, &mut self.active] {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        self.order.retain(|other| *other != id);
        let involved = match self.gesture {
            Some(Gesture::DragPanel { panel, .. }) => panel == id,
            Some(Gesture::LinkDrag { source, .. }) => source == id,
            _ => false,
        };
        if involved {
            self.gesture = None;
        }

        let was_selected = self.selected == Some(id);
        if was_selected {
            self.selected = None;
        }
        was_selected
    }
}

impl Canvas {
    pub fn hovered(&self) -> Option<PanelId> {
        self.pointer.hovered
    }

    pub fn selected(&self) -> Option<PanelId> {
        self.pointer.selected
    }

    pub fn drag_hovered(&self) -> Option<PanelId> {
        self.pointer.drag_hovered
    }

    pub fn gesture(&self) -> Option<Gesture> {
        self.pointer.gesture
    }

    /// Topmost panel under a screen point.
    pub fn hit_test(&self, screen: Pos2) -> Option<PanelId> {
        self.pointer.order.iter().rev().copied().find(|id| {
            self.panels
                .get(*id)
                .is_some_and(|panel| panel.screen_rect(&self.viewport).contains(screen))
        })
    }

    /// Only shown while zoomed out with a selection.
    pub fn edge_handle(&self) -> Option<EdgeHandle> {
        if self.viewport.is_native_scale() {
            return None;
        }
        let panel = self.panels.get(self.pointer.selected?)?;
        let title = panel.title_rect(&self.viewport);
        let center = panel.screen_rect(&self.viewport).center() + vec2(0.0, title.height() / 2.0);
        let radius = self.config.edge_handle_diameter / 2.0;
        Some(EdgeHandle {
            center,
            radius,
            hovered: self
                .pointer
                .position
                .is_some_and(|pointer| pointer.distance(center) < radius),
            dragging: matches!(self.pointer.gesture, Some(Gesture::LinkDrag { .. })),
        })
    }

    /// The rubber-band arrow while a link is being dragged.
    pub fn link_preview(&self) -> Option<ArrowPath> {
        let Some(Gesture::LinkDrag { pointer, .. }) = self.pointer.gesture else {
            return None;
        };
        let handle = self.edge_handle()?;
        Some(ArrowPath {
            start: handle.center,
            end: pointer,
        })
    }

    pub fn pointer_moved(&mut self, pos: Pos2, host: &mut impl CanvasHost) {
        self.pointer.position = Some(pos);
        let hit = self.hit_test(pos);
        if self.pointer.drag_hovered != hit {
            self.pointer.drag_hovered = hit;
            self.request_repaint();
        }

        match self.pointer.gesture {
            Some(Gesture::DragPanel {
                panel,
                press,
                start,
                moved,
            }) => {
                self.raise(panel);
                let position = start - (press - pos);
                self.move_panel(panel, position, host);
                self.pointer.gesture = Some(Gesture::DragPanel {
                    panel,
                    press,
                    start,
                    moved: moved || press.distance(pos) > self.config.click_slop,
                });
                self.request_repaint();
            }
            Some(Gesture::Pan { press, start_pan }) => {
                self.set_pan(start_pan - (press - pos), host);
                return;
            }
            Some(Gesture::LinkDrag { source, .. }) => {
                self.pointer.gesture = Some(Gesture::LinkDrag {
                    source,
                    pointer: pos,
                });
                self.request_repaint();
                return;
            }
            None => {}
        }

        self.apply_hover(hit, host);
    }

    pub fn pointer_pressed(&mut self, pos: Pos2, button: PointerButton) {
        self.pointer.position = Some(pos);
        match button {
            PointerButton::Primary => {
                self.pointer.press = Some(pos);
                if let Some(handle) = self.edge_handle().filter(|handle| handle.hovered)
                    && let Some(source) = self.pointer.selected
                {
                    debug!(center = ?handle.center, "link drag started");
                    self.pointer.gesture = Some(Gesture::LinkDrag {
                        source,
                        pointer: pos,
                    });
                    self.request_repaint();
                } else if let Some(panel) = self.hit_test(pos) {
                    let start = self
                        .panels
                        .get(panel)
                        .map(|panel| panel.true_position())
                        .unwrap_or_default();
                    self.pointer.gesture = Some(Gesture::DragPanel {
                        panel,
                        press: pos,
                        start,
                        moved: false,
                    });
                }
            }
            PointerButton::Middle => {
                self.pointer.gesture = Some(Gesture::Pan {
                    press: pos,
                    start_pan: self.viewport.pan(),
                });
            }
            _ => {}
        }
    }

    pub fn pointer_released(&mut self, pos: Pos2, button: PointerButton, host: &mut impl CanvasHost) {
        self.pointer.position = Some(pos);
        match (button, self.pointer.gesture) {
            (PointerButton::Middle, Some(Gesture::Pan { .. })) => {
                self.pointer.gesture = None;
            }
            (PointerButton::Primary, Some(Gesture::LinkDrag { source, .. })) => {
                self.pointer.gesture = None;
                self.pointer.press = None;
                if let Some(target) = self.pointer.drag_hovered
                    && self.pointer.selected == Some(source)
                    && target != source
                {
                    self.toggle_extends(source, target, host);
                }
                self.request_repaint();
            }
            (PointerButton::Primary, gesture) => {
                let moved = matches!(gesture, Some(Gesture::DragPanel { moved: true, .. }));
                if matches!(gesture, Some(Gesture::DragPanel { .. })) {
                    self.pointer.gesture = None;
                }
                let press = self.pointer.press.take();
                let is_click = !moved
                    && press.is_some_and(|press| press.distance(pos) <= self.config.click_slop);
                if is_click {
                    match self.hit_test(pos) {
                        Some(panel) => self.click_panel(panel),
                        None => self.click_background(),
                    }
                }
            }
            _ => {}
        }
    }

    /// `notches` is positive when the wheel turns towards the user.
    pub fn wheel(
        &mut self,
        notches: f32,
        modifiers: Modifiers,
        pointer: Pos2,
        host: &mut impl CanvasHost,
    ) -> bool {
        if notches == 0.0 {
            return false;
        }
        if modifiers.command || modifiers.ctrl {
            let pending = self.pointer.zoom_notches;
            let pending = if pending * notches < 0.0 { 0.0 } else { pending };
            let total = pending + notches;
            let steps = total.trunc();
            self.pointer.zoom_notches = total - steps;
            if steps == 0.0 {
                return false;
            }
            self.zoom_by(steps as i32, pointer, host)
        } else {
            let pan = self.viewport.pan() - vec2(0.0, self.config.wheel_pan_step * notches);
            self.set_pan(pan, host);
            true
        }
    }

    /// Step the zoom level about a screen point. Refused while loading or
    /// while any panel is mid-transition.
    pub fn zoom_by(&mut self, delta: i32, anchor: Pos2, host: &mut impl CanvasHost) -> bool {
        if self.loading || self.is_busy() {
            debug!(loading = self.loading, "zoom refused");
            return false;
        }
        let Some(change) = self.viewport.set_zoom_level(delta, anchor) else {
            return false;
        };
        info!(
            level = self.viewport.zoom_level(),
            zoom = change.new_zoom,
            "zoom changed"
        );

        let zoom = change.new_zoom;
        for id in self.panels.ids().to_vec() {
            let Some(panel) = self.panels.get_mut(id) else {
                continue;
            };
            panel.rescale(&change);
            if panel.is_live() {
                panel.to_frozen(host, zoom);
            } else {
                panel.zoom_changed(zoom);
            }
            host.save_position(panel.entity(), panel.true_position());
        }
        self.pointer.active = None;
        host.save_viewport(self.viewport.state());
        self.request_repaint();

        if let Some(pointer) = self.pointer.position {
            let hit = self.hit_test(pointer);
            self.apply_hover(hit, host);
        }
        true
    }

    pub fn set_pan(&mut self, pan: Vec2, host: &mut impl StateStore) {
        self.viewport.set_pan(pan);
        host.save_viewport(self.viewport.state());
        self.request_repaint();
    }

    fn apply_hover(&mut self, hit: Option<PanelId>, host: &mut impl LiveSurface) {
        let zoom = self.viewport.current_zoom();
        let Some(id) = hit else {
            if self.pointer.hovered.take().is_some() {
                self.request_repaint();
            }
            if let Some(previous) = self.pointer.active.take() {
                if let Some(panel) = self.panels.get_mut(previous)
                    && panel.is_live()
                {
                    panel.to_frozen(host, zoom);
                }
                self.request_repaint();
            }
            return;
        };

        if self.pointer.hovered != Some(id) {
            self.pointer.hovered = Some(id);
            self.request_repaint();
        }
        if !self.viewport.is_native_scale() || self.pointer.active == Some(id) {
            return;
        }

        if let Some(previous) = self.pointer.active.take()
            && let Some(panel) = self.panels.get_mut(previous)
        {
            panel.to_frozen(host, zoom);
        }
        if let Some(panel) = self.panels.get_mut(id) {
            panel.to_live(host, zoom);
            self.pointer.active = Some(id);
        }
        self.raise(id);
        self.request_repaint();
    }

    pub(super) fn click_panel(&mut self, id: PanelId) {
        if self.pointer.selected == Some(id) {
            return;
        }
        let Some(entity) = self.panels.get(id).map(|panel| panel.entity().clone()) else {
            return;
        };
        if let Some(previous) = self.pointer.selected.take()
            && let Some(panel) = self.panels.get_mut(previous)
        {
            panel.selected = false;
        }
        if let Some(panel) = self.panels.get_mut(id) {
            panel.selected = true;
        }
        self.pointer.selected = Some(id);
        self.raise(id);
        self.events.push(CanvasEvent::SelectionChanged(Some(entity)));
        self.request_repaint();
    }

    fn click_background(&mut self) {
        let Some(previous) = self.pointer.selected.take() else {
            return;
        };
        if let Some(panel) = self.panels.get_mut(previous) {
            panel.selected = false;
        }
        self.events.push(CanvasEvent::SelectionChanged(None));
        self.request_repaint();
    }

    /// Move `id` to the top of the paint order.
    pub(super) fn raise(&mut self, id: PanelId) {
        if self.pointer.order.last() == Some(&id) || !self.panels.contains(id) {
            return;
        }
        self.pointer.order.retain(|other| *other != id);
        self.pointer.order.push(id);
        self.renumber_layers();
    }
}
