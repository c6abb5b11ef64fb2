use eframe::egui::{Pos2, Vec2};

use super::super::Node;
use super::super::config::LayoutConfig;
use super::super::physics::Simulation;

/// Pointer travel, in screen points, below which a press-release pair still counts as a click.
const CLICK_SLOP: f32 = 3.0;
const WHEEL_ZOOM_RATE: f32 = 0.002;

/// Pan/zoom mapping from simulation space to canvas-local screen space:
/// `screen = translate + world * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Viewport {
    pub scale: f32,
    pub translate: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn world_to_screen(self, world: Vec2) -> Pos2 {
        (self.translate + world * self.scale).to_pos2()
    }

    pub fn screen_to_world(self, screen: Pos2) -> Vec2 {
        (screen.to_vec2() - self.translate) / self.scale
    }

    /// Rescales around `anchor` so the world point under it stays put.
    fn zoom_about(&mut self, anchor: Pos2, factor: f32, min_scale: f32, max_scale: f32) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let scale = (self.scale * factor).clamp(min_scale, max_scale);
        if scale == self.scale {
            return false;
        }
        let world = self.screen_to_world(anchor);
        self.scale = scale;
        self.translate = anchor.to_vec2() - world * scale;
        true
    }
}

/// Pointer input in canvas-local screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum PointerEvent {
    Press { pos: Pos2 },
    Move { pos: Pos2 },
    Release { pos: Pos2 },
    /// Positive `delta` zooms in.
    Wheel { pos: Pos2, delta: f32 },
    Pinch { pos: Pos2, factor: f32 },
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum InteractionOutcome {
    Ignored,
    ViewChanged,
    LayoutChanged,
    Activated(usize),
}

#[derive(Clone, Copy, Debug)]
struct DragState {
    node: usize,
    generation: u64,
    grab_offset: Vec2,
    press_pos: Pos2,
    moved: bool,
}

#[derive(Clone, Copy, Debug, Default)]
enum Gesture {
    #[default]
    None,
    Pan {
        last: Pos2,
    },
    Drag(DragState),
}

pub(in crate::app) struct InteractionController {
    viewport: Viewport,
    gesture: Gesture,
    hovered: Option<usize>,
    min_scale: f32,
    max_scale: f32,
    reheat_alpha: f32,
}

impl InteractionController {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            viewport: Viewport::default(),
            gesture: Gesture::None,
            hovered: None,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            reheat_alpha: config.reheat_alpha,
        }
    }

    pub fn set_config(&mut self, config: &LayoutConfig) {
        self.min_scale = config.min_scale;
        self.max_scale = config.max_scale;
        self.reheat_alpha = config.reheat_alpha;
        self.viewport.scale = self.viewport.scale.clamp(self.min_scale, self.max_scale);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, scale: f32, translate: Vec2) -> bool {
        if !scale.is_finite() || !translate.is_finite() {
            return false;
        }
        let viewport = Viewport {
            scale: scale.clamp(self.min_scale, self.max_scale),
            translate,
        };
        let changed = viewport != self.viewport;
        self.viewport = viewport;
        changed
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn dragged(&self) -> Option<usize> {
        match self.gesture {
            Gesture::Drag(drag) => Some(drag.node),
            _ => None,
        }
    }

    /// Drops any gesture in flight without touching the simulation. Used when the node
    /// array it referred to has been replaced.
    pub fn reset(&mut self) {
        self.gesture = Gesture::None;
        self.hovered = None;
    }

    /// Topmost node whose disc contains `pos`, nearest centre first.
    pub fn hit_test(&self, nodes: &[Node], pos: Pos2) -> Option<usize> {
        let world = self.viewport.screen_to_world(pos);
        nodes
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(index, node)| {
                let distance = (node.world_pos - world).length();
                (distance <= node.radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Returns true when the hovered node changed.
    pub fn update_hover(&mut self, nodes: &[Node], pos: Option<Pos2>) -> bool {
        let hovered = match self.gesture {
            Gesture::Drag(drag) => Some(drag.node),
            Gesture::Pan { .. } => None,
            Gesture::None => pos.and_then(|pos| self.hit_test(nodes, pos)),
        };
        let changed = hovered != self.hovered;
        self.hovered = hovered;
        changed
    }

    pub fn handle(&mut self, event: PointerEvent, simulation: &mut Simulation) -> InteractionOutcome {
        match event {
            PointerEvent::Press { pos } => self.press(pos, simulation),
            PointerEvent::Move { pos } => self.pointer_moved(pos, simulation),
            PointerEvent::Release { .. } => self.release(simulation),
            PointerEvent::Wheel { pos, delta } => {
                self.zoom(pos, (delta * WHEEL_ZOOM_RATE).exp2())
            }
            PointerEvent::Pinch { pos, factor } => self.zoom(pos, factor),
            PointerEvent::Cancel => {
                if let Gesture::Drag(drag) = self.gesture
                    && drag.generation == simulation.generation()
                {
                    simulation.unpin(drag.node);
                }
                self.gesture = Gesture::None;
                InteractionOutcome::Ignored
            }
        }
    }

    fn press(&mut self, pos: Pos2, simulation: &mut Simulation) -> InteractionOutcome {
        if !matches!(self.gesture, Gesture::None) {
            return InteractionOutcome::Ignored;
        }

        let Some(node) = self.hit_test(simulation.nodes(), pos) else {
            self.gesture = Gesture::Pan { last: pos };
            return InteractionOutcome::Ignored;
        };

        let anchor = simulation.nodes()[node].world_pos;
        if !simulation.pin(node, anchor) {
            return InteractionOutcome::Ignored;
        }
        simulation.reheat(self.reheat_alpha);
        log::debug!("drag started on node {node} (alpha {:.3})", simulation.alpha());

        self.gesture = Gesture::Drag(DragState {
            node,
            generation: simulation.generation(),
            grab_offset: anchor - self.viewport.screen_to_world(pos),
            press_pos: pos,
            moved: false,
        });
        self.hovered = Some(node);
        InteractionOutcome::LayoutChanged
    }

    fn pointer_moved(&mut self, pos: Pos2, simulation: &mut Simulation) -> InteractionOutcome {
        match &mut self.gesture {
            Gesture::None => InteractionOutcome::Ignored,
            Gesture::Pan { last } => {
                let delta = pos - *last;
                *last = pos;
                if delta == Vec2::ZERO {
                    return InteractionOutcome::Ignored;
                }
                self.viewport.translate += delta;
                InteractionOutcome::ViewChanged
            }
            Gesture::Drag(drag) => {
                if drag.generation != simulation.generation() {
                    log::debug!("discarding drag from a replaced layout");
                    self.gesture = Gesture::None;
                    return InteractionOutcome::Ignored;
                }
                if !drag.moved && pos.distance(drag.press_pos) <= CLICK_SLOP {
                    return InteractionOutcome::Ignored;
                }
                drag.moved = true;

                let target = self.viewport.screen_to_world(pos) + drag.grab_offset;
                if !simulation.pin(drag.node, target) {
                    return InteractionOutcome::Ignored;
                }
                simulation.reheat(self.reheat_alpha);
                InteractionOutcome::LayoutChanged
            }
        }
    }

    fn release(&mut self, simulation: &mut Simulation) -> InteractionOutcome {
        match std::mem::take(&mut self.gesture) {
            Gesture::None | Gesture::Pan { .. } => InteractionOutcome::Ignored,
            Gesture::Drag(drag) => {
                if drag.generation != simulation.generation() {
                    return InteractionOutcome::Ignored;
                }
                simulation.unpin(drag.node);
                log::debug!("drag released on node {}", drag.node);
                if drag.moved {
                    InteractionOutcome::LayoutChanged
                } else {
                    InteractionOutcome::Activated(drag.node)
                }
            }
        }
    }

    fn zoom(&mut self, anchor: Pos2, factor: f32) -> InteractionOutcome {
        if matches!(self.gesture, Gesture::Drag(_)) {
            return InteractionOutcome::Ignored;
        }
        if self
            .viewport
            .zoom_about(anchor, factor, self.min_scale, self.max_scale)
        {
            InteractionOutcome::ViewChanged
        } else {
            InteractionOutcome::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use crate::kg::EntityCategory;

    use super::super::super::Link;
    use super::super::super::physics::Phase;
    use super::*;

    const EXTENT: Vec2 = vec2(800.0, 600.0);

    fn node(id: usize, x: f32, y: f32) -> Node {
        Node {
            id,
            label: format!("n{id}"),
            category: EntityCategory::Event,
            value: None,
            world_pos: vec2(x, y),
            velocity: Vec2::ZERO,
            fx: None,
            fy: None,
            radius: 18.0,
        }
    }

    fn setup() -> (InteractionController, Simulation) {
        let config = LayoutConfig::default();
        let mut simulation = Simulation::new(config);
        simulation.start(
            vec![node(0, 300.0, 300.0), node(1, 500.0, 300.0)],
            vec![Link {
                source: 0,
                target: 1,
                rest_length: 150.0,
                relation: None,
            }],
            EXTENT,
        );
        (InteractionController::new(&config), simulation)
    }

    fn cool(simulation: &mut Simulation) {
        for _ in 0..2_000 {
            simulation.tick();
        }
        assert_eq!(simulation.phase(), Phase::Cooled);
    }

    #[test]
    fn viewport_round_trips_through_inverse() {
        let viewport = Viewport {
            scale: 2.5,
            translate: vec2(-40.0, 15.0),
        };
        let world = vec2(123.0, -7.5);
        let back = viewport.screen_to_world(viewport.world_to_screen(world));
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn click_without_motion_activates() {
        let (mut controller, mut simulation) = setup();
        let at = simulation.nodes()[1].world_pos.to_pos2();

        assert_eq!(
            controller.handle(PointerEvent::Press { pos: at }, &mut simulation),
            InteractionOutcome::LayoutChanged
        );
        assert!(simulation.nodes()[1].is_pinned());
        controller.handle(PointerEvent::Move { pos: at + vec2(1.0, 1.0) }, &mut simulation);
        assert_eq!(
            controller.handle(PointerEvent::Release { pos: at }, &mut simulation),
            InteractionOutcome::Activated(1)
        );
        assert!(!simulation.nodes()[1].is_pinned());
    }

    #[test]
    fn drag_pins_to_pointer_with_grab_offset_and_reheats() {
        let (mut controller, mut simulation) = setup();
        cool(&mut simulation);
        let centre = simulation.nodes()[0].world_pos;
        let press = (centre + vec2(5.0, 0.0)).to_pos2();

        controller.handle(PointerEvent::Press { pos: press }, &mut simulation);
        assert_eq!(simulation.phase(), Phase::Running);
        assert!(simulation.alpha() >= 0.3);
        assert_eq!(simulation.nodes()[0].world_pos, centre);

        let outcome = controller.handle(
            PointerEvent::Move {
                pos: press + vec2(40.0, 20.0),
            },
            &mut simulation,
        );
        assert_eq!(outcome, InteractionOutcome::LayoutChanged);
        let expected = simulation.bounds().clamp(centre + vec2(40.0, 20.0));
        assert!((simulation.nodes()[0].world_pos - expected).length() < 1e-3);

        assert_eq!(
            controller.handle(PointerEvent::Release { pos: press }, &mut simulation),
            InteractionOutcome::LayoutChanged
        );
        assert!(!simulation.nodes()[0].is_pinned());
    }

    #[test]
    fn drag_converts_pointer_through_inverse_viewport() {
        let (mut controller, mut simulation) = setup();
        controller.set_viewport(2.0, vec2(-300.0, -200.0));
        let centre = simulation.nodes()[0].world_pos;
        let press = controller.viewport().world_to_screen(centre);

        controller.handle(PointerEvent::Press { pos: press }, &mut simulation);
        controller.handle(
            PointerEvent::Move {
                pos: press + vec2(20.0, 0.0),
            },
            &mut simulation,
        );
        assert!((simulation.nodes()[0].world_pos - (centre + vec2(10.0, 0.0))).length() < 1e-3);
    }

    #[test]
    fn second_press_during_drag_is_ignored() {
        let (mut controller, mut simulation) = setup();
        let first = simulation.nodes()[0].world_pos.to_pos2();
        let second = simulation.nodes()[1].world_pos.to_pos2();

        controller.handle(PointerEvent::Press { pos: first }, &mut simulation);
        assert_eq!(
            controller.handle(PointerEvent::Press { pos: second }, &mut simulation),
            InteractionOutcome::Ignored
        );
        assert_eq!(controller.dragged(), Some(0));
        assert!(!simulation.nodes()[1].is_pinned());
    }

    #[test]
    fn wheel_zoom_is_clamped_and_keeps_anchor_fixed() {
        let (mut controller, mut simulation) = setup();
        let anchor = pos2(200.0, 150.0);
        let world = controller.viewport().screen_to_world(anchor);

        for _ in 0..50 {
            controller.handle(PointerEvent::Wheel { pos: anchor, delta: 120.0 }, &mut simulation);
        }
        assert_eq!(controller.viewport().scale, 4.0);
        let after = controller.viewport().world_to_screen(world);
        assert!((after - anchor).length() < 1e-2);

        for _ in 0..80 {
            controller.handle(PointerEvent::Pinch { pos: anchor, factor: 0.5 }, &mut simulation);
        }
        assert_eq!(controller.viewport().scale, 0.3);
    }

    #[test]
    fn zoom_and_pan_never_touch_simulation_coordinates() {
        let (mut controller, mut simulation) = setup();
        let before = simulation
            .nodes()
            .iter()
            .map(|node| node.world_pos)
            .collect::<Vec<_>>();

        let empty = pos2(50.0, 50.0);
        controller.handle(PointerEvent::Press { pos: empty }, &mut simulation);
        assert_eq!(
            controller.handle(PointerEvent::Move { pos: pos2(80.0, 90.0) }, &mut simulation),
            InteractionOutcome::ViewChanged
        );
        controller.handle(PointerEvent::Release { pos: pos2(80.0, 90.0) }, &mut simulation);
        assert_eq!(controller.viewport().translate, vec2(30.0, 40.0));
        assert_eq!(
            controller.handle(PointerEvent::Wheel { pos: empty, delta: 200.0 }, &mut simulation),
            InteractionOutcome::ViewChanged
        );

        let after = simulation
            .nodes()
            .iter()
            .map(|node| node.world_pos)
            .collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn wheel_is_ignored_while_dragging() {
        let (mut controller, mut simulation) = setup();
        let at = simulation.nodes()[0].world_pos.to_pos2();
        controller.handle(PointerEvent::Press { pos: at }, &mut simulation);
        assert_eq!(
            controller.handle(PointerEvent::Wheel { pos: at, delta: 300.0 }, &mut simulation),
            InteractionOutcome::Ignored
        );
        assert_eq!(controller.viewport().scale, 1.0);
    }

    #[test]
    fn drag_from_replaced_layout_is_discarded() {
        let (mut controller, mut simulation) = setup();
        let at = simulation.nodes()[0].world_pos.to_pos2();
        controller.handle(PointerEvent::Press { pos: at }, &mut simulation);

        simulation.start(vec![node(0, 100.0, 100.0)], Vec::new(), EXTENT);
        assert_eq!(
            controller.handle(PointerEvent::Move { pos: at + vec2(30.0, 0.0) }, &mut simulation),
            InteractionOutcome::Ignored
        );
        assert_eq!(controller.dragged(), None);
        assert!(!simulation.nodes()[0].is_pinned());
    }

    #[test]
    fn pointer_gone_mid_drag_unpins_and_clears_gesture() {
        let (mut controller, mut simulation) = setup();
        let at = simulation.nodes()[0].world_pos.to_pos2();
        controller.handle(PointerEvent::Press { pos: at }, &mut simulation);
        controller.handle(PointerEvent::Move { pos: at + vec2(40.0, 10.0) }, &mut simulation);
        assert!(simulation.nodes()[0].is_pinned());

        assert_eq!(
            controller.handle(PointerEvent::Cancel, &mut simulation),
            InteractionOutcome::Ignored
        );
        assert_eq!(controller.dragged(), None);
        assert!(!simulation.nodes()[0].is_pinned());

        // A release after the cancel must not activate the node.
        assert_eq!(
            controller.handle(PointerEvent::Release { pos: at }, &mut simulation),
            InteractionOutcome::Ignored
        );
    }

    #[test]
    fn hit_test_uses_node_radius_in_world_space() {
        let (mut controller, simulation) = setup();
        let at = simulation.nodes()[1].world_pos.to_pos2();
        assert_eq!(controller.hit_test(simulation.nodes(), at + vec2(17.5, 0.0)), Some(1));
        assert_eq!(controller.hit_test(simulation.nodes(), at + vec2(0.0, 18.5)), None);

        controller.set_viewport(2.0, vec2(-100.0, 0.0));
        let screen = controller.viewport().world_to_screen(simulation.nodes()[1].world_pos);
        assert_eq!(controller.hit_test(simulation.nodes(), screen + vec2(30.0, 0.0)), Some(1));
        assert_eq!(controller.hit_test(simulation.nodes(), screen + vec2(40.0, 0.0)), None);
    }

    #[test]
    fn hover_follows_hit_test() {
        let (mut controller, simulation) = setup();
        let at = simulation.nodes()[1].world_pos.to_pos2();
        assert!(controller.update_hover(simulation.nodes(), Some(at + vec2(10.0, 0.0))));
        assert_eq!(controller.hovered(), Some(1));
        assert!(!controller.update_hover(simulation.nodes(), Some(at)));
        assert!(controller.update_hover(simulation.nodes(), Some(pos2(0.0, 0.0))));
        assert_eq!(controller.hovered(), None);
    }
}
