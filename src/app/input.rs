use eframe::egui::{Event, MouseWheelUnit, Rect, Ui, Vec2};

use super::Workspace;

/// Pixel deltas are folded into wheel notches at this rate.
const POINTS_PER_NOTCH: f32 = 50.0;
const LINES_PER_PAGE: f32 = 3.0;

impl Workspace {
    /// Forward raw pointer and wheel events to the canvas in widget-local
    /// coordinates.
    pub(super) fn handle_canvas_input(&mut self, ui: &Ui, rect: Rect) {
        let offset = rect.min.to_vec2();
        let (events, hover) = ui.input(|input| (input.events.clone(), input.pointer.hover_pos()));

        for event in events {
            let engaged = self.canvas.gesture().is_some();
            match event {
                Event::PointerMoved(pos) if engaged || rect.contains(pos) => {
                    self.canvas.pointer_moved(pos - offset, &mut self.host);
                }
                Event::PointerButton {
                    pos,
                    button,
                    pressed: true,
                    ..
                } if rect.contains(pos) => {
                    self.canvas.pointer_pressed(pos - offset, button);
                }
                Event::PointerButton {
                    pos,
                    button,
                    pressed: false,
                    ..
                } if engaged || rect.contains(pos) => {
                    self.canvas.pointer_released(pos - offset, button, &mut self.host);
                }
                Event::MouseWheel {
                    unit,
                    delta,
                    modifiers,
                    ..
                } => {
                    let Some(pointer) = hover.filter(|pos| rect.contains(*pos)) else {
                        continue;
                    };
                    let notches = wheel_notches(unit, delta);
                    self.canvas
                        .wheel(notches, modifiers, pointer - offset, &mut self.host);
                }
                _ => {}
            }
        }
    }
}

/// Positive when the wheel turns towards the user.
fn wheel_notches(unit: MouseWheelUnit, delta: Vec2) -> f32 {
    match unit {
        MouseWheelUnit::Point => -delta.y / POINTS_PER_NOTCH,
        MouseWheelUnit::Line => -delta.y,
        MouseWheelUnit::Page => -delta.y * LINES_PER_PAGE,
    }
}
