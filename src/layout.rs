use std::f32::consts::TAU;

use eframe::egui::{Pos2, Rect, Vec2, vec2};
use rand::Rng;
use tracing::debug;

/// Tunables for one layout pass, already scaled to the current zoom.
#[derive(Clone, Copy, Debug)]
pub struct LayoutParams {
    pub spacing: f32,
    pub spread_ratio: f32,
    pub radius_steps_per_spacing: f32,
    pub origin: Pos2,
}

#[derive(Debug)]
pub struct Arrangement {
    pub positions: Vec<Pos2>,
    pub root_count: usize,
}

#[derive(Debug)]
struct TreeBox {
    node: usize,
    children: Vec<TreeBox>,
    size: Vec2,
    count: usize,
}

impl TreeBox {
    fn build(node: usize, incoming: &[Vec<usize>], claimed: &mut [bool]) -> Self {
        let mut children = Vec::new();
        let mut count = 1;
        for &child in &incoming[node] {
            if claimed[child] {
                continue;
            }
            claimed[child] = true;
            let child_box = Self::build(child, incoming, claimed);
            count += child_box.count;
            children.push(child_box);
        }
        Self {
            node,
            children,
            size: Vec2::ZERO,
            count,
        }
    }

    /// Lay the subtree out with its top-left corner at `position`, writing
    /// panel positions and recomputing the aggregate size.
    fn place(&mut self, position: Pos2, sizes: &[Vec2], spacing: f32, out: &mut [Pos2]) {
        let own = sizes[self.node];
        if self.children.is_empty() {
            out[self.node] = position;
            self.size = own;
            return;
        }

        let mut x = position.x;
        let mut tallest = 0.0_f32;
        for child in &mut self.children {
            child.place(Pos2::new(x, position.y + own.y + spacing), sizes, spacing, out);
            x += child.size.x + spacing;
            tallest = tallest.max(child.size.y);
        }
        let width = (x - position.x - spacing).max(own.x);
        let mut height = tallest + own.y + spacing;

        let wide_gap = width / 20.0;
        if wide_gap > spacing {
            let mut x = position.x;
            for child in &mut self.children {
                child.place(Pos2::new(x, position.y + own.y + wide_gap), sizes, spacing, out);
                x += child.size.x + spacing;
            }
            height = tallest + own.y + wide_gap;
        }

        self.size = vec2(width, height);
        out[self.node] = Pos2::new(position.x + width / 2.0 - own.x / 2.0, position.y);
    }
}

/// Arrange every node into trees hanging below their supertype, then pack
/// the trees around `params.origin`.
///
/// `parents[i]` is the index of the node `i` extends, if any. Children are
/// visited in index order and the first claim on a node wins, so cycles
/// never place a node twice. Nodes caught in a cycle with no root become
/// roots themselves, in index order.
pub fn arrange<R: Rng + ?Sized>(
    sizes: &[Vec2],
    parents: &[Option<usize>],
    params: &LayoutParams,
    rng: &mut R,
) -> Arrangement {
    let n = sizes.len();
    let mut positions = vec![params.origin; n];
    if n == 0 {
        return Arrangement {
            positions,
            root_count: 0,
        };
    }

    let mut incoming = vec![Vec::new(); n];
    for (child, parent) in parents.iter().enumerate() {
        if let Some(parent) = parent.filter(|parent| *parent < n && *parent != child) {
            incoming[parent].push(child);
        }
    }

    let mut claimed = vec![false; n];
    let mut roots = Vec::new();
    let is_root = |node: usize| parents.get(node).copied().flatten().is_none();
    for node in (0..n).filter(|node| is_root(*node)) {
        claimed[node] = true;
        roots.push(TreeBox::build(node, &incoming, &mut claimed));
    }
    for node in 0..n {
        if !claimed[node] {
            claimed[node] = true;
            roots.push(TreeBox::build(node, &incoming, &mut claimed));
        }
    }

    for root in &mut roots {
        root.place(params.origin, sizes, params.spacing, &mut positions);
    }
    roots.sort_by_key(|root| root.count);

    let root_sizes = roots.iter().map(|root| root.size).collect::<Vec<_>>();
    let corners = pack(&root_sizes, Vec::new(), params, rng);
    for (root, corner) in roots.iter_mut().zip(corners) {
        root.place(corner, sizes, params.spacing, &mut positions);
    }

    debug!(panels = n, roots = roots.len(), "layout pass complete");
    Arrangement {
        positions,
        root_count: roots.len(),
    }
}

/// Find a free spot for one rectangle of `size`, treating every rect in
/// `obstacles` as already placed.
pub fn place_single<R: Rng + ?Sized>(
    size: Vec2,
    obstacles: Vec<Rect>,
    params: &LayoutParams,
    rng: &mut R,
) -> Pos2 {
    pack(&[size], obstacles, params, rng)
        .pop()
        .unwrap_or(params.origin)
}

/// Randomized radial search. Items are tried in order along a fresh random
/// angle each round. A round that places nothing grows the radius.
fn pack<R: Rng + ?Sized>(
    sizes: &[Vec2],
    mut placed: Vec<Rect>,
    params: &LayoutParams,
    rng: &mut R,
) -> Vec<Pos2> {
    let spacing = params.spacing;
    let step = (spacing / params.radius_steps_per_spacing).max(0.01);
    let mut corners = vec![params.origin; sizes.len()];
    let mut pending = (0..sizes.len()).collect::<Vec<_>>();
    let mut radius = 0.0_f32;

    while !pending.is_empty() {
        let angle = rng.gen_range(0.0..TAU);
        let offset = vec2(
            radius * angle.cos() * params.spread_ratio,
            radius * angle.sin(),
        );
        let corner = params.origin + offset;

        let fits = pending.iter().position(|&item| {
            let candidate = Rect::from_min_size(corner, sizes[item]).expand(spacing);
            placed
                .iter()
                .all(|other| !candidate.intersects(other.expand(spacing)))
        });

        match fits {
            Some(slot) => {
                let item = pending.remove(slot);
                corners[item] = corner;
                placed.push(Rect::from_min_size(corner, sizes[item]));
            }
            None => radius += step,
        }
    }

    corners
}
