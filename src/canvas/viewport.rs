use eframe::egui::{Pos2, Rect, Vec2};

use super::host::ViewportState;

/// Logical edge length of the world plane.
pub const WORLD_SIZE: f32 = 100_000.0;

pub fn world_center() -> Pos2 {
    Pos2::new(WORLD_SIZE / 2.0, WORLD_SIZE / 2.0)
}

pub fn default_viewport_state() -> ViewportState {
    ViewportState {
        pan: Vec2::new(-WORLD_SIZE / 2.0, -WORLD_SIZE / 2.0),
        zoom_level: 0,
    }
}

/// A zoom step, expressed as a scale about a fixed world point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomChange {
    pub old_zoom: f32,
    pub new_zoom: f32,
    pub anchor: Pos2,
}

impl ZoomChange {
    pub fn ratio(&self) -> f32 {
        self.new_zoom / self.old_zoom
    }

    pub fn rescale(&self, point: Pos2) -> Pos2 {
        self.anchor + (point - self.anchor) * self.ratio()
    }
}

/// Pan offset plus discrete zoom. Stored world coordinates are already
/// multiplied by the zoom in effect, so the screen mapping is a translation.
#[derive(Clone, Debug)]
pub struct Viewport {
    pan: Vec2,
    zoom_level: u32,
    current_zoom: f32,
    safety_point: Pos2,
    zoom_base: f32,
    max_level: u32,
}

impl Viewport {
    pub fn new(state: ViewportState, zoom_base: f32, max_level: u32) -> Self {
        let zoom_level = state.zoom_level.min(max_level);
        Self {
            pan: state.pan,
            zoom_level,
            current_zoom: zoom_for_level(zoom_base, zoom_level),
            safety_point: Pos2::ZERO,
            zoom_base,
            max_level,
        }
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            pan: self.pan,
            zoom_level: self.zoom_level,
        }
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: Vec2) {
        self.pan = pan;
    }

    pub fn zoom_level(&self) -> u32 {
        self.zoom_level
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn current_zoom(&self) -> f32 {
        self.current_zoom
    }

    pub fn is_native_scale(&self) -> bool {
        self.current_zoom == 1.0
    }

    pub fn safety_point(&self) -> Pos2 {
        self.safety_point
    }

    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        world + self.pan
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        screen - self.pan
    }

    pub fn world_rect_to_screen(&self, rect: Rect) -> Rect {
        rect.translate(self.pan)
    }

    /// Screen location of a point given in unscaled units, corrected by the
    /// safety point so overlay glyphs follow the content across zooms.
    pub fn overlay_point(&self, native: Vec2) -> Pos2 {
        Pos2::ZERO + native * self.current_zoom + self.pan + self.safety_point.to_vec2()
    }

    /// Step the zoom level by `delta` about `anchor_screen`. Returns `None`
    /// when the clamped level is unchanged.
    pub fn set_zoom_level(&mut self, delta: i32, anchor_screen: Pos2) -> Option<ZoomChange> {
        let requested = i64::from(self.zoom_level) + i64::from(delta);
        let level = requested.clamp(0, i64::from(self.max_level)) as u32;
        if level == self.zoom_level {
            return None;
        }

        let change = ZoomChange {
            old_zoom: self.current_zoom,
            new_zoom: zoom_for_level(self.zoom_base, level),
            anchor: self.screen_to_world(anchor_screen),
        };
        self.zoom_level = level;
        self.current_zoom = change.new_zoom;
        self.safety_point = change.rescale(self.safety_point);
        Some(change)
    }
}

fn zoom_for_level(base: f32, level: u32) -> f32 {
    base.powi(level as i32)
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Pos2, Vec2, pos2, vec2};

    use super::{Viewport, ViewportState, default_viewport_state};

    fn viewport(zoom_level: u32) -> Viewport {
        Viewport::new(
            ViewportState {
                pan: vec2(-300.0, 120.0),
                zoom_level,
            },
            0.5,
            7,
        )
    }

    #[test]
    fn zoom_level_is_clamped_instead_of_rejected() {
        let mut view = viewport(0);
        let change = view.set_zoom_level(100, Pos2::ZERO);
        assert!(change.is_some());
        assert_eq!(view.zoom_level(), 7);
        assert!((view.current_zoom() - 0.5_f32.powi(7)).abs() < f32::EPSILON);

        assert!(view.set_zoom_level(3, Pos2::ZERO).is_none());
        view.set_zoom_level(-100, Pos2::ZERO);
        assert_eq!(view.zoom_level(), 0);
        assert!(view.is_native_scale());
    }

    #[test]
    fn stored_level_above_maximum_is_clamped_on_load() {
        let view = Viewport::new(
            ViewportState {
                pan: Vec2::ZERO,
                zoom_level: 40,
            },
            0.5,
            7,
        );
        assert_eq!(view.zoom_level(), 7);
    }

    #[test]
    fn point_under_anchor_stays_fixed_across_zoom_sequence() {
        let mut view = viewport(2);
        let anchor = pos2(412.0, 233.0);
        let mut tracked = view.screen_to_world(anchor);
        let mut other = tracked + vec2(250.0, -80.0);

        for delta in [1, 1, -2, 3, -1, 100, -100] {
            let before_other_screen = view.world_to_screen(other);
            if let Some(change) = view.set_zoom_level(delta, anchor) {
                tracked = change.rescale(tracked);
                other = change.rescale(other);
                let offset_before = before_other_screen - anchor;
                let offset_after = view.world_to_screen(other) - anchor;
                let expected = offset_before * change.ratio();
                assert!((offset_after - expected).length() < 0.01);
            }
            let screen = view.world_to_screen(tracked);
            assert!((screen - anchor).length() < 0.5, "drifted to {screen:?}");
        }
    }

    #[test]
    fn safety_point_is_rescaled_about_the_anchor() {
        let mut view = viewport(0);
        let anchor = pos2(100.0, 100.0);
        let world_anchor = view.screen_to_world(anchor);
        view.set_zoom_level(1, anchor);
        let expected = world_anchor + (Pos2::ZERO - world_anchor) * 0.5;
        assert!((view.safety_point() - expected).length() < 0.01);
    }

    #[test]
    fn default_state_centres_the_world_on_the_origin() {
        let view = Viewport::new(default_viewport_state(), 0.5, 7);
        let centre = view.world_to_screen(super::world_center());
        assert_eq!(centre, Pos2::ZERO);
    }
}
