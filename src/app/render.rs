use std::collections::HashMap;

use eframe::egui::{
    Align2, Color32, Context, FontId, Painter, Pos2, Rect, Stroke, StrokeKind, TextureHandle,
    TextureOptions, Vec2, pos2, vec2,
};

use crate::canvas::viewport::world_center;
use crate::canvas::{
    ArrowPath, Canvas, EdgeHandle, Gesture, Panel, PanelId, RenderMode, arrow_head,
};

use super::host::WorkspaceHost;

const BACKGROUND: Color32 = Color32::from_rgb(236, 236, 236);
const GRID: Color32 = Color32::from_rgb(224, 224, 224);
const CIRCLE: Color32 = Color32::from_rgb(158, 227, 164);
const CIRCLE_HOVERED: Color32 = Color32::from_rgb(88, 184, 98);
const CIRCLE_GETTING_DRAGGED: Color32 = Color32::from_rgb(83, 83, 83);
const BORDER_SELECTED: Color32 = Color32::from_rgb(33, 142, 130);
const BORDER_UNSELECTED: Color32 = Color32::from_rgb(120, 120, 120);
const DRAG_HANDLE: Color32 = Color32::from_rgb(150, 150, 150);
const DRAG_HANDLE_EDITOR: Color32 = Color32::from_rgb(255, 200, 0);
const ARROW: Color32 = Color32::from_rgb(70, 70, 70);
// Premultiplied: (0,0,0,30), (33,142,130,100), (200,100,0,30).
const OVERLAY_HOVERED: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 30);
const OVERLAY_SELECTED: Color32 = Color32::from_rgba_premultiplied(13, 56, 51, 100);
const OVERLAY_DRAG_ONTO: Color32 = Color32::from_rgba_premultiplied(24, 12, 0, 30);

/// GPU copies of frozen snapshots, refreshed when a panel re-captures.
#[derive(Default)]
pub(super) struct PanelTextures {
    entries: HashMap<PanelId, (u64, TextureHandle)>,
}

impl PanelTextures {
    fn texture(&mut self, ctx: &Context, id: PanelId, panel: &Panel) -> Option<TextureHandle> {
        let snapshot = panel.snapshot()?;
        let revision = panel.snapshot_revision();
        if let Some((cached, handle)) = self.entries.get(&id)
            && *cached == revision
        {
            return Some(handle.clone());
        }
        let handle = ctx.load_texture(
            format!("panel-{}", panel.entity()),
            snapshot.image.clone(),
            TextureOptions::LINEAR,
        );
        self.entries.insert(id, (revision, handle.clone()));
        Some(handle)
    }

    pub(super) fn retain_live(&mut self, canvas: &Canvas) {
        self.entries.retain(|id, _| canvas.panel(*id).is_some());
    }
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = (100.0 * zoom).max(12.0);
    let origin = rect.min + pan;
    let stroke = Stroke::new(1.0, GRID);

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([pos2(x, rect.top()), pos2(x, rect.bottom())], stroke);
        x += step;
    }
    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([pos2(rect.left(), y), pos2(rect.right(), y)], stroke);
        y += step;
    }
}

/// Cross at the centre of the world plane, tracked across zooms.
pub(super) fn draw_origin_marker(painter: &Painter, canvas: &Canvas, offset: Vec2) {
    let viewport = canvas.viewport();
    let centre = viewport.overlay_point(world_center().to_vec2()) + offset;
    let arm = (12.0 * viewport.current_zoom()).max(4.0);
    let stroke = Stroke::new(1.0, DRAG_HANDLE);
    painter.line_segment([centre - vec2(arm, 0.0), centre + vec2(arm, 0.0)], stroke);
    painter.line_segment([centre - vec2(0.0, arm), centre + vec2(0.0, arm)], stroke);
}

pub(super) fn draw_panels(
    painter: &Painter,
    canvas: &Canvas,
    host: &WorkspaceHost,
    textures: &mut PanelTextures,
    offset: Vec2,
) {
    let viewport = canvas.viewport();
    let zoomed_out = !viewport.is_native_scale();
    let link_source = match canvas.gesture() {
        Some(Gesture::LinkDrag { source, .. }) => Some(source),
        _ => None,
    };

    for (id, panel) in canvas.paint_order() {
        let outer = panel.screen_rect(viewport).translate(offset);
        if !painter.clip_rect().intersects(outer) {
            continue;
        }
        let border = if panel.is_selected() {
            BORDER_SELECTED
        } else {
            BORDER_UNSELECTED
        };
        painter.rect_filled(outer, 0.0, border);
        draw_title(painter, canvas, host, panel, offset);

        let content = panel.content_rect(viewport).translate(offset);
        match panel.mode() {
            RenderMode::Frozen => {
                if let Some(texture) = textures.texture(painter.ctx(), id, panel) {
                    painter.image(
                        texture.id(),
                        content,
                        Rect::from_min_max(Pos2::ZERO, pos2(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }
            }
            RenderMode::Live => draw_live_text(painter, host, panel, content),
        }

        if zoomed_out {
            if panel.is_selected() {
                painter.rect_filled(outer, 0.0, OVERLAY_SELECTED);
            }
            if canvas.hovered() == Some(id) {
                painter.rect_filled(outer, 0.0, OVERLAY_HOVERED);
            }
        }
        if link_source.is_some_and(|source| source != id) && canvas.drag_hovered() == Some(id) {
            painter.rect_filled(outer, 0.0, OVERLAY_DRAG_ONTO);
        }
    }
}

fn draw_title(painter: &Painter, canvas: &Canvas, host: &WorkspaceHost, panel: &Panel, offset: Vec2) {
    let title = panel.title_rect(canvas.viewport()).translate(offset);
    let border = canvas.config().border_width * canvas.viewport().current_zoom();
    let text_height = title.height() - border;
    if text_height < 6.0 {
        return;
    }
    let color = if panel.is_live() {
        DRAG_HANDLE_EDITOR
    } else {
        Color32::WHITE
    };
    painter.with_clip_rect(title).text(
        title.left_top() + vec2(border.max(2.0), border / 2.0 + text_height / 2.0),
        Align2::LEFT_CENTER,
        host.title(panel.entity()),
        FontId::proportional(text_height * 0.8),
        color,
    );
}

fn draw_live_text(painter: &Painter, host: &WorkspaceHost, panel: &Panel, content: Rect) {
    let raster = &host.raster;
    painter.rect_filled(content, 0.0, raster.background);
    let clipped = painter.with_clip_rect(content.intersect(painter.clip_rect()));
    let font = FontId::monospace(raster.line_height * 0.85);
    let text = host.text(panel.entity());
    let origin = content.min + Vec2::splat(raster.padding);

    for (row, line) in text.lines().enumerate().take(raster.max_lines) {
        let top = origin.y + row as f32 * raster.line_height;
        if top > content.bottom() {
            break;
        }
        let line = line.replace('\t', &" ".repeat(raster.tab_width));
        clipped.text(
            pos2(origin.x, top),
            Align2::LEFT_TOP,
            line,
            font.clone(),
            Color32::from_rgb(40, 40, 40),
        );
    }

    if host.has_caret(panel.entity()) {
        clipped.line_segment(
            [origin, origin + vec2(0.0, raster.line_height)],
            Stroke::new(1.5, BORDER_SELECTED),
        );
    }
}

pub(super) fn draw_arrows(painter: &Painter, canvas: &Canvas, offset: Vec2) {
    let zoom = canvas.viewport().current_zoom();
    let stroke = Stroke::new((2.0 * zoom).max(1.0), ARROW);
    for arrow in canvas.arrows() {
        let path = ArrowPath {
            start: arrow.path.start + offset,
            end: arrow.path.end + offset,
        };
        draw_arrow(painter, &path, stroke, ARROW);
    }
}

fn draw_arrow(painter: &Painter, path: &ArrowPath, stroke: Stroke, fill: Color32) {
    let Some(head) = arrow_head(path) else {
        return;
    };
    painter.line_segment([path.start, head.base], stroke);
    painter.add(eframe::egui::Shape::convex_polygon(
        vec![head.tip, head.left, head.right],
        fill,
        Stroke::NONE,
    ));
}

pub(super) fn draw_edge_handle(painter: &Painter, canvas: &Canvas, offset: Vec2) {
    let Some(handle) = canvas.edge_handle() else {
        return;
    };
    let center = handle.center + offset;
    painter.circle_filled(center, handle.radius, handle_color(&handle));
    painter.circle_stroke(center, handle.radius, Stroke::new(1.0, DRAG_HANDLE));

    let glyph = ArrowPath {
        start: center + vec2(-15.0, 15.0),
        end: center + vec2(15.0, -15.0),
    };
    draw_arrow(painter, &glyph, Stroke::new(2.0, Color32::WHITE), Color32::WHITE);

    if let Some(preview) = canvas.link_preview() {
        let path = ArrowPath {
            start: preview.start + offset,
            end: preview.end + offset,
        };
        draw_arrow(painter, &path, Stroke::new(2.0, DRAG_HANDLE_EDITOR), DRAG_HANDLE_EDITOR);
    }
}

fn handle_color(handle: &EdgeHandle) -> Color32 {
    match (handle.hovered, handle.dragging) {
        (true, true) => CIRCLE_GETTING_DRAGGED,
        (true, false) => CIRCLE,
        _ => CIRCLE_HOVERED,
    }
}

pub(super) fn draw_load_status(painter: &Painter, canvas: &Canvas, rect: Rect) {
    if !canvas.is_loading() {
        return;
    }
    let (loaded, total) = canvas.load_progress();
    let anchor = rect.left_top() + vec2(12.0, 12.0);
    let galley = painter.layout_no_wrap(
        format!("Loaded {loaded} out of {total}"),
        FontId::proportional(16.0),
        Color32::from_rgb(40, 40, 40),
    );
    let frame = Rect::from_min_size(anchor, galley.size()).expand(6.0);
    painter.rect_filled(frame, 4.0, Color32::from_white_alpha(220));
    painter.rect_stroke(frame, 4.0, Stroke::new(1.0, BORDER_UNSELECTED), StrokeKind::Outside);
    painter.galley(anchor, galley, Color32::from_rgb(40, 40, 40));
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::{CIRCLE, CIRCLE_GETTING_DRAGGED, CIRCLE_HOVERED, handle_color};
    use crate::canvas::EdgeHandle;

    fn handle(hovered: bool, dragging: bool) -> EdgeHandle {
        EdgeHandle {
            center: pos2(0.0, 0.0),
            radius: 25.0,
            hovered,
            dragging,
        }
    }

    #[test]
    fn handle_colour_tracks_hover_and_drag() {
        assert_eq!(handle_color(&handle(true, true)), CIRCLE_GETTING_DRAGGED);
        assert_eq!(handle_color(&handle(true, false)), CIRCLE);
        assert_eq!(handle_color(&handle(false, false)), CIRCLE_HOVERED);
        assert_eq!(handle_color(&handle(false, true)), CIRCLE_HOVERED);
    }
}
