use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::super::{Link, Node};
use super::Bounds;
use super::quadtree::Cell;

/// A link with both endpoints resolved to node indices and its per-tick weights
/// precomputed from endpoint degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct ResolvedLink {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) rest_length: f32,
    /// Share of the correction taken by the target; the source takes the rest.
    pub(super) bias: f32,
    pub(super) strength: f32,
}

#[derive(Clone, Copy)]
pub(super) struct ChargeParams {
    pub(super) strength: f32,
    pub(super) distance_min: f32,
    pub(super) theta: f32,
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) reach_sq: f32,
}

/// Direction used to split two points that sit on top of each other. Swapping the
/// pair flips the direction so both sides push apart.
fn separation_direction(from: usize, to: usize) -> Vec2 {
    let (low, high) = (from.min(to), from.max(to));
    let angle = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * TAU;
    let direction = vec2(angle.cos(), angle.sin());
    if from <= to { direction } else { -direction }
}

pub(super) fn resolve_links(links: &[Link], node_count: usize) -> Vec<ResolvedLink> {
    let mut degree = vec![0usize; node_count];
    for link in links {
        if link.source < node_count && link.target < node_count && link.source != link.target {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }
    }

    links
        .iter()
        .filter(|link| {
            link.source < node_count && link.target < node_count && link.source != link.target
        })
        .map(|link| {
            let source_degree = degree[link.source] as f32;
            let target_degree = degree[link.target] as f32;
            ResolvedLink {
                source: link.source,
                target: link.target,
                rest_length: link.rest_length,
                bias: source_degree / (source_degree + target_degree),
                strength: 1.0 / source_degree.min(target_degree),
            }
        })
        .collect()
}

/// Relaxes every link towards its rest length. The correction is split by degree,
/// so well-connected endpoints move less.
pub(super) fn apply_links(nodes: &mut [Node], links: &[ResolvedLink], alpha: f32) {
    for link in links {
        let source = &nodes[link.source];
        let target = &nodes[link.target];
        let mut delta =
            (target.world_pos + target.velocity) - (source.world_pos + source.velocity);
        if delta.length_sq() < 1e-12 {
            delta = separation_direction(link.source, link.target) * 1e-3;
        }

        let distance = delta.length();
        let error = (distance - link.rest_length) / distance * alpha * link.strength;
        let correction = delta * error;

        nodes[link.target].velocity -= correction * link.bias;
        nodes[link.source].velocity += correction * (1.0 - link.bias);
    }
}

fn pair_repulsion(index: usize, other: usize, positions: &[Vec2], params: ChargeParams) -> Vec2 {
    let delta = positions[other] - positions[index];
    let distance = delta.length();
    let (direction, distance) = if distance > 1e-6 {
        (delta / distance, distance.max(params.distance_min))
    } else {
        (separation_direction(other, index), params.distance_min)
    };
    direction * (params.strength / distance)
}

fn accumulate_charge(
    cell: &Cell,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    force: &mut Vec2,
) {
    if cell.mass <= 0.0 {
        return;
    }

    if cell.is_leaf() {
        for &other in &cell.points {
            if other != index {
                *force += pair_repulsion(index, other, positions, params);
            }
        }
        return;
    }

    let point = positions[index];
    let delta = cell.centroid - point;
    let distance = delta.length();
    if cell.is_far_from(point, distance, params.theta) {
        *force += (delta / distance)
            * (params.strength * cell.mass / distance.max(params.distance_min));
        return;
    }

    for child in cell.children() {
        accumulate_charge(child, index, positions, params, force);
    }
}

/// Many-body repulsion through the Barnes–Hut tree. `positions` is the snapshot the
/// tree was built from.
pub(super) fn apply_charge(
    root: &Cell,
    nodes: &mut [Node],
    positions: &[Vec2],
    params: ChargeParams,
    alpha: f32,
) {
    for (index, node) in nodes.iter_mut().enumerate() {
        let mut force = Vec2::ZERO;
        accumulate_charge(root, index, positions, params, &mut force);
        node.velocity += force * alpha;
    }
}

pub(super) fn apply_center(nodes: &mut [Node], center: Vec2, strength: f32, alpha: f32) {
    for node in nodes {
        node.velocity += (center - node.world_pos) * (strength * alpha);
    }
}

fn separate(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    movable: &[bool],
    strength: f32,
    corrections: &mut [Vec2],
) {
    let min_distance = radii[from] + radii[to];
    let delta = positions[from] - positions[to];
    let distance_sq = delta.length_sq();
    if distance_sq >= min_distance * min_distance {
        return;
    }

    let distance = distance_sq.sqrt();
    let direction = if distance > 1e-4 {
        delta / distance
    } else {
        separation_direction(from, to)
    };

    let weight_from = radii[to] * radii[to];
    let weight_to = radii[from] * radii[from];
    let (share_from, share_to) = match (movable[from], movable[to]) {
        (true, true) => {
            let total = weight_from + weight_to;
            (weight_from / total, weight_to / total)
        }
        (true, false) => (1.0, 0.0),
        (false, true) => (0.0, 1.0),
        (false, false) => return,
    };

    let overlap = (min_distance - distance) * strength;
    corrections[from] += direction * (overlap * share_from);
    corrections[to] -= direction * (overlap * share_to);
}

/// Dual-tree traversal over overlapping cell pairs, accumulating position corrections.
/// `radii` are collision radii (node radius plus padding).
#[allow(clippy::too_many_arguments)]
pub(super) fn accumulate_collisions(
    cell_a: &Cell,
    cell_b: &Cell,
    same_cell: bool,
    positions: &[Vec2],
    radii: &[f32],
    movable: &[bool],
    params: CollisionParams,
    corrections: &mut [Vec2],
) {
    if cell_a.bounds.gap_sq(cell_b.bounds) > params.reach_sq {
        return;
    }

    if cell_a.is_leaf() && cell_b.is_leaf() {
        if same_cell {
            for (offset, &from) in cell_a.points.iter().enumerate() {
                for &to in &cell_a.points[offset + 1..] {
                    separate(from, to, positions, radii, movable, params.strength, corrections);
                }
            }
        } else {
            for &from in &cell_a.points {
                for &to in &cell_b.points {
                    separate(from, to, positions, radii, movable, params.strength, corrections);
                }
            }
        }
        return;
    }

    if same_cell {
        let children = cell_a.children().collect::<Vec<_>>();
        for (offset, child) in children.iter().enumerate() {
            accumulate_collisions(
                child, child, true, positions, radii, movable, params, corrections,
            );
            for other in &children[offset + 1..] {
                accumulate_collisions(
                    child, other, false, positions, radii, movable, params, corrections,
                );
            }
        }
        return;
    }

    let split_a = if cell_a.is_leaf() {
        false
    } else if cell_b.is_leaf() {
        true
    } else {
        cell_a.bounds.half_extent >= cell_b.bounds.half_extent
    };

    if split_a {
        for child in cell_a.children() {
            accumulate_collisions(
                child, cell_b, false, positions, radii, movable, params, corrections,
            );
        }
    } else {
        for child in cell_b.children() {
            accumulate_collisions(
                cell_a, child, false, positions, radii, movable, params, corrections,
            );
        }
    }
}

/// Soft containment: pulls stray positions back inside `bounds` and trims each free
/// node's velocity so this tick's step lands inside as well.
pub(super) fn contain(nodes: &mut [Node], bounds: Bounds) {
    for node in nodes {
        node.world_pos = bounds.clamp(node.world_pos);
        let predicted = node.world_pos + node.velocity;
        node.velocity += bounds.clamp(predicted) - predicted;
    }
}
