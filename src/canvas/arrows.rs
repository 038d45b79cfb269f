use eframe::egui::{Pos2, Rect};

const HEAD_LENGTH: f32 = 10.0;
const HEAD_HALF_WIDTH: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArrowPath {
    pub start: Pos2,
    pub end: Pos2,
}

/// Triangle at the end of an arrow. The shaft stops at `base`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArrowHead {
    pub tip: Pos2,
    pub left: Pos2,
    pub right: Pos2,
    pub base: Pos2,
}

/// Pick the facing corners or edge midpoints between two boxes.
pub fn route(from: Rect, to: Rect) -> ArrowPath {
    let avg_y = (from.bottom().min(to.bottom()) + from.top().max(to.top())) / 2.0;
    let avg_x = (from.right().min(to.right()) + from.left().max(to.left())) / 2.0;
    let from_below = from.top() > to.bottom();
    let to_below = to.top() > from.bottom();

    let (start, end) = if from.left() > to.right() {
        if from_below {
            (from.left_top(), to.right_bottom())
        } else if to_below {
            (from.left_bottom(), to.right_top())
        } else {
            (Pos2::new(from.left(), avg_y), Pos2::new(to.right(), avg_y))
        }
    } else if to.left() > from.right() {
        if from_below {
            (from.right_top(), to.left_bottom())
        } else if to_below {
            (from.right_bottom(), to.left_top())
        } else {
            (Pos2::new(from.right(), avg_y), Pos2::new(to.left(), avg_y))
        }
    } else if from_below {
        (Pos2::new(avg_x, from.top()), Pos2::new(avg_x, to.bottom()))
    } else {
        (Pos2::new(avg_x, from.bottom()), Pos2::new(avg_x, to.top()))
    };

    ArrowPath { start, end }
}

pub fn arrow_head(path: &ArrowPath) -> Option<ArrowHead> {
    let delta = path.end - path.start;
    let length = delta.length();
    if length == 0.0 {
        return None;
    }

    let along = delta / length;
    let across = along.rot90();
    let base = path.start + along * (length - HEAD_LENGTH);
    Some(ArrowHead {
        tip: path.end,
        left: base + across * HEAD_HALF_WIDTH,
        right: base - across * HEAD_HALF_WIDTH,
        base,
    })
}
