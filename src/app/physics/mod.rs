mod forces;
mod quadtree;

use eframe::egui::{Vec2, vec2};

use super::config::LayoutConfig;
use super::{Link, Node};
use forces::{
    ChargeParams, CollisionParams, ResolvedLink, accumulate_collisions, apply_center, apply_charge,
    apply_links, contain, resolve_links,
};
pub(in crate::app) use quadtree::QuadtreeCell;
use quadtree::Cell;

/// Consecutive calm ticks required before a layout counts as settled.
const SETTLE_TICKS: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum Phase {
    Idle,
    Running,
    Cooled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum CoolReason {
    AlphaMin,
    Settled,
    TickLimit,
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum TickOutcome {
    Skipped,
    Advanced,
    Cooled(CoolReason),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct SimulationState {
    pub alpha: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub running: bool,
}

impl SimulationState {
    fn cold(config: &LayoutConfig) -> Self {
        Self {
            alpha: 0.0,
            alpha_min: config.alpha_min,
            alpha_decay: config.alpha_decay,
            velocity_decay: config.velocity_decay,
            running: false,
        }
    }
}

/// Axis-aligned containment box in simulation space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Insets `extent` by `padding` on every side. Padding larger than half the extent
    /// collapses that axis onto its midpoint instead of producing an inverted range.
    pub fn inset(extent: Vec2, padding: Vec2) -> Self {
        let extent = vec2(finite_or_zero(extent.x).max(0.0), finite_or_zero(extent.y).max(0.0));
        let padding = vec2(
            finite_or_zero(padding.x).clamp(0.0, extent.x * 0.5),
            finite_or_zero(padding.y).clamp(0.0, extent.y * 0.5),
        );
        Self {
            min: padding,
            max: extent - padding,
        }
    }

    pub fn clamp(self, point: Vec2) -> Vec2 {
        vec2(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }

    pub fn contains(self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

#[derive(Default)]
struct PhysicsScratch {
    positions: Vec<Vec2>,
    radii: Vec<f32>,
    movable: Vec<bool>,
    corrections: Vec<Vec2>,
}

/// The layout engine. Owns the node and link buffers of the current layout; forces
/// borrow them for the duration of one tick.
pub(in crate::app) struct Simulation {
    config: LayoutConfig,
    nodes: Vec<Node>,
    links: Vec<Link>,
    resolved_links: Vec<ResolvedLink>,
    state: SimulationState,
    phase: Phase,
    bounds: Bounds,
    center: Vec2,
    ticks: u32,
    calm_ticks: u32,
    generation: u64,
    rejected_updates: usize,
    scratch: PhysicsScratch,
}

impl Simulation {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            state: SimulationState::cold(&config),
            config,
            nodes: Vec::new(),
            links: Vec::new(),
            resolved_links: Vec::new(),
            phase: Phase::Idle,
            bounds: Bounds::inset(Vec2::ZERO, Vec2::ZERO),
            center: Vec2::ZERO,
            ticks: 0,
            calm_ticks: 0,
            generation: 0,
            rejected_updates: 0,
            scratch: PhysicsScratch::default(),
        }
    }

    /// Takes effect on the next [`Simulation::start`].
    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = config;
    }

    /// Replaces the whole layout. The previous node buffer is dropped before the new
    /// one is installed, and the generation counter moves on so interaction state
    /// captured against the old buffer can be recognised as stale.
    pub fn start(&mut self, mut nodes: Vec<Node>, links: Vec<Link>, extent: Vec2) {
        self.stop();

        self.bounds = Bounds::inset(extent, self.config.bounds_padding());
        self.center = self.bounds.center();
        for node in &mut nodes {
            node.world_pos = self.bounds.clamp(node.world_pos);
        }
        self.resolved_links = resolve_links(&links, nodes.len());
        self.nodes = nodes;
        self.links = links;
        self.state = SimulationState {
            alpha: 1.0,
            ..SimulationState::cold(&self.config)
        };
        self.ticks = 0;
        self.calm_ticks = 0;
        self.rejected_updates = 0;

        if self.nodes.is_empty() {
            self.cool(CoolReason::Empty);
            return;
        }

        log::info!(
            "layout started: {} nodes, {} links, bounds {:?}..{:?}",
            self.nodes.len(),
            self.resolved_links.len(),
            self.bounds.min,
            self.bounds.max
        );
        self.set_phase(Phase::Running);
    }

    pub fn stop(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.resolved_links.clear();
        self.state.alpha = 0.0;
        self.generation = self.generation.wrapping_add(1);
        self.set_phase(Phase::Idle);
    }

    /// Raises alpha to at least `target` and resumes ticking. Not applicable while idle.
    pub fn reheat(&mut self, target: f32) -> bool {
        if self.phase == Phase::Idle || self.nodes.is_empty() {
            return false;
        }

        let target = target.clamp(0.0, 1.0);
        if self.phase == Phase::Cooled {
            log::debug!("reheating layout from alpha {:.4} to {target}", self.state.alpha);
        }
        self.state.alpha = self.state.alpha.max(target);
        self.ticks = 0;
        self.calm_ticks = 0;
        self.set_phase(Phase::Running);
        true
    }

    /// Fixes a node at `position`, clamped into the containment bounds.
    pub fn pin(&mut self, index: usize, position: Vec2) -> bool {
        if self.phase == Phase::Idle || !position.is_finite() {
            return false;
        }
        let bounds = self.bounds;
        let Some(node) = self.nodes.get_mut(index) else {
            return false;
        };

        let position = bounds.clamp(position);
        node.fx = Some(position.x);
        node.fy = Some(position.y);
        node.world_pos = position;
        node.velocity = Vec2::ZERO;
        true
    }

    /// Releases a pinned node. Its velocity is left alone so it drifts off naturally.
    pub fn unpin(&mut self, index: usize) -> bool {
        let Some(node) = self.nodes.get_mut(index) else {
            return false;
        };
        node.fx = None;
        node.fy = None;
        true
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Skipped;
        }

        let alpha = self.state.alpha;
        let config = self.config;
        self.snapshot();
        let root = Cell::build(&self.scratch.positions);

        apply_links(&mut self.nodes, &self.resolved_links, alpha);

        if let Some(root) = &root {
            apply_charge(
                root,
                &mut self.nodes,
                &self.scratch.positions,
                ChargeParams {
                    strength: config.charge_strength,
                    distance_min: config.charge_distance_min,
                    theta: config.theta,
                },
                alpha,
            );
        }

        apply_center(&mut self.nodes, self.center, config.center_strength, alpha);

        if let Some(root) = &root {
            let max_radius = self.scratch.radii.iter().copied().fold(0.0, f32::max);
            let reach = max_radius * 2.0;
            accumulate_collisions(
                root,
                root,
                true,
                &self.scratch.positions,
                &self.scratch.radii,
                &self.scratch.movable,
                CollisionParams {
                    strength: config.collision_strength,
                    reach_sq: reach * reach,
                },
                &mut self.scratch.corrections,
            );
            for (node, correction) in self.nodes.iter_mut().zip(&self.scratch.corrections) {
                node.world_pos += *correction;
            }
        }

        contain(&mut self.nodes, self.bounds);

        let fastest = self.integrate();
        self.state.alpha *= 1.0 - self.state.alpha_decay;
        self.ticks += 1;

        if self.state.alpha < self.state.alpha_min {
            return self.cool(CoolReason::AlphaMin);
        }

        if self.ticks >= config.max_ticks {
            log::warn!(
                "layout did not cool within {} ticks (alpha {:.4}); stopping",
                config.max_ticks,
                self.state.alpha
            );
            return self.cool(CoolReason::TickLimit);
        }

        if fastest < config.settle_speed {
            self.calm_ticks += 1;
            if self.calm_ticks >= SETTLE_TICKS {
                return self.cool(CoolReason::Settled);
            }
        } else {
            self.calm_ticks = 0;
        }

        TickOutcome::Advanced
    }

    fn snapshot(&mut self) {
        let padding = self.config.collision_padding;
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.radii.clear();
        scratch.movable.clear();
        for node in &self.nodes {
            scratch.positions.push(node.world_pos);
            scratch.radii.push(node.radius + padding);
            scratch.movable.push(!node.is_pinned());
        }
        scratch.corrections.clear();
        scratch.corrections.resize(self.nodes.len(), Vec2::ZERO);
    }

    /// Applies velocity decay and moves every node, returning the fastest free node's
    /// speed. Updates that would leave a node non-finite are discarded for that node.
    fn integrate(&mut self) -> f32 {
        let retain = 1.0 - self.state.velocity_decay;
        let max_speed = self.config.max_speed;
        let bounds = self.bounds;
        let mut fastest = 0.0_f32;
        let mut rejected = 0usize;

        for (node, previous) in self.nodes.iter_mut().zip(&self.scratch.positions) {
            let mut velocity = node.velocity * retain;
            let speed = velocity.length();
            if speed > max_speed {
                velocity *= max_speed / speed;
            }

            let mut position = node.world_pos + velocity;
            if let Some(fx) = node.fx {
                position.x = fx;
                velocity.x = 0.0;
            }
            if let Some(fy) = node.fy {
                position.y = fy;
                velocity.y = 0.0;
            }

            let clamped = bounds.clamp(position);
            if clamped.x != position.x {
                velocity.x = 0.0;
            }
            if clamped.y != position.y {
                velocity.y = 0.0;
            }

            if !clamped.is_finite() || !velocity.is_finite() {
                rejected += 1;
                node.world_pos = *previous;
                node.velocity = Vec2::ZERO;
                continue;
            }

            debug_assert!(bounds.contains(clamped));
            node.world_pos = clamped;
            node.velocity = velocity;
            if !node.is_pinned() {
                fastest = fastest.max(velocity.length());
            }
        }

        if rejected > 0 {
            log::warn!("rejected non-finite update for {rejected} node(s); positions held");
            self.rejected_updates += rejected;
        }
        fastest
    }

    fn cool(&mut self, reason: CoolReason) -> TickOutcome {
        if reason != CoolReason::AlphaMin {
            self.state.alpha = 0.0;
        }
        log::info!("layout cooled after {} ticks ({reason:?})", self.ticks);
        self.set_phase(Phase::Cooled);
        TickOutcome::Cooled(reason)
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.state.running = phase == Phase::Running;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn alpha(&self) -> f32 {
        self.state.alpha
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn rejected_updates(&self) -> usize {
        self.rejected_updates
    }

    pub fn quadtree_cells(&self, cells: &mut Vec<QuadtreeCell>) {
        cells.clear();
        let positions = self.nodes.iter().map(|node| node.world_pos).collect::<Vec<_>>();
        if let Some(root) = Cell::build(&positions) {
            root.collect_outlines(0, cells);
        }
    }

    #[cfg(test)]
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }
}
