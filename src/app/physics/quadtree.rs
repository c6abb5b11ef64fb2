use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct CellBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl CellBounds {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            if !point.is_finite() {
                return None;
            }
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let center = (min + max) * 0.5;
        let span = (max - min).max_elem().max(1.0);

        Some(Self {
            center,
            half_extent: (span * 0.5) + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.half_extent
            && (point.y - self.center.y).abs() <= self.half_extent
    }

    pub(super) fn width(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Gap between two cells, zero when they touch or overlap.
    pub(super) fn gap_sq(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let dx = ((self.center.x - other.center.x).abs() - reach).max(0.0);
        let dy = ((self.center.y - other.center.y).abs() - reach).max(0.0);
        (dx * dx) + (dy * dy)
    }

    fn quadrant(self, index: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let offset = match index {
            0 => vec2(-quarter, -quarter),
            1 => vec2(quarter, -quarter),
            2 => vec2(-quarter, quarter),
            _ => vec2(quarter, quarter),
        };

        Self {
            center: self.center + offset,
            half_extent: quarter,
        }
    }

    fn quadrant_of(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) + (usize::from(point.y >= self.center.y) * 2)
    }
}

/// One region of the spatial index. Internal cells own no points directly, only
/// the aggregate mass (point count) and centroid of everything below them.
pub(super) struct Cell {
    pub(super) bounds: CellBounds,
    pub(super) centroid: Vec2,
    pub(super) mass: f32,
    pub(super) points: Vec<usize>,
    pub(super) children: [Option<Box<Cell>>; 4],
}

/// Flattened cell outline for the debug overlay.
#[derive(Clone, Copy, Debug)]
pub(in crate::app) struct QuadtreeCell {
    pub center: Vec2,
    pub half_extent: f32,
    pub depth: usize,
    pub is_leaf: bool,
}

impl Cell {
    /// Builds a region quadtree over `positions`. Returns `None` for an empty or non-finite input.
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        let bounds = CellBounds::enclosing(positions)?;
        let points = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::subdivide(bounds, points, positions, 0))
    }

    fn subdivide(bounds: CellBounds, points: Vec<usize>, positions: &[Vec2], depth: usize) -> Self {
        let mass = points.len() as f32;
        let mut centroid = Vec2::ZERO;
        for &point in &points {
            centroid += positions[point];
        }
        if mass > 0.0 {
            centroid /= mass;
        }

        let mut cell = Self {
            bounds,
            centroid,
            mass,
            points,
            children: std::array::from_fn(|_| None),
        };

        if depth >= MAX_DEPTH || cell.points.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets = std::array::from_fn::<Vec<usize>, 4, _>(|_| Vec::new());
        for &point in &cell.points {
            buckets[bounds.quadrant_of(positions[point])].push(point);
        }

        // Coincident points never separate; keep them in one leaf.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                cell.children[quadrant] = Some(Box::new(Self::subdivide(
                    bounds.quadrant(quadrant),
                    bucket,
                    positions,
                    depth + 1,
                )));
            }
        }
        cell.points.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &Cell> {
        self.children.iter().filter_map(|child| child.as_deref())
    }

    /// Barnes–Hut acceptance test: a cell may stand in for all of its points when it is
    /// small relative to its distance from `point` and does not contain `point`.
    pub(super) fn is_far_from(&self, point: Vec2, distance: f32, theta: f32) -> bool {
        self.mass > 1.0
            && !self.bounds.contains(point)
            && distance > 0.0
            && (self.bounds.width() / distance) < theta
    }

    pub(super) fn collect_outlines(&self, depth: usize, out: &mut Vec<QuadtreeCell>) {
        out.push(QuadtreeCell {
            center: self.bounds.center,
            half_extent: self.bounds.half_extent,
            depth,
            is_leaf: self.is_leaf(),
        });

        for child in self.children() {
            child.collect_outlines(depth + 1, out);
        }
    }
}
