use eframe::egui::{Align2, Color32, CornerRadius, FontId, Painter, Pos2, Rect, Stroke, Vec2, vec2};

use crate::util::truncate_label;

use super::super::config::LayoutConfig;
use super::super::physics::{QuadtreeCell, Simulation};
use super::super::render_utils::{
    LABEL_FILL, LABEL_TEXT, LINK_COLOR, MUTED_TEXT, NODE_OUTLINE, category_color, with_opacity,
};
use super::interaction::Viewport;

pub(in crate::app) const EMPTY_TITLE: &str = "No knowledge graph data available";
pub(in crate::app) const EMPTY_HINT: &str = "Upload a file or perform a search to see entities";

const HOVER_RADIUS_FACTOR: f32 = 22.0 / 18.0;
const IDLE_OPACITY: f32 = 0.9;
const LINK_WIDTH: f32 = 1.5;
const LINK_OPACITY: f32 = 0.25;
const LABEL_OFFSET: f32 = 28.0;
const LABEL_HEIGHT: f32 = 18.0;
const LABEL_CHAR_WIDTH: f32 = 7.0;
const LABEL_PADDING: f32 = 10.0;
const LABEL_FONT_SIZE: f32 = 10.0;

/// Backend-neutral draw command in canvas-local screen coordinates.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) enum Primitive {
    Line {
        from: Pos2,
        to: Pos2,
        stroke: Stroke,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Stroke,
    },
    LabelBox {
        rect: Rect,
        fill: Color32,
    },
    Text {
        pos: Pos2,
        text: String,
        size: f32,
        color: Color32,
    },
    Outline {
        rect: Rect,
        stroke: Stroke,
    },
    Placeholder {
        title: String,
        detail: String,
    },
}

/// Per-frame inputs that decide what the scene looks like.
#[derive(Clone, Copy)]
pub(in crate::app) struct SceneInputs<'a> {
    pub viewport: Viewport,
    pub hovered: Option<usize>,
    pub notice: Option<&'a str>,
    pub show_quadtree: bool,
}

/// Turns simulation state into a cached primitive list. The list is rebuilt only after
/// [`RenderAdapter::invalidate`].
pub(in crate::app) struct RenderAdapter {
    label_max_chars: usize,
    primitives: Vec<Primitive>,
    quadtree_cells: Vec<QuadtreeCell>,
    dirty: bool,
    rebuilds: u64,
}

impl RenderAdapter {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            label_max_chars: config.label_max_chars,
            primitives: Vec::new(),
            quadtree_cells: Vec::new(),
            dirty: true,
            rebuilds: 0,
        }
    }

    pub fn set_config(&mut self, config: &LayoutConfig) {
        self.label_max_chars = config.label_max_chars;
        self.dirty = true;
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    #[cfg(test)]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[cfg(test)]
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn frame(&mut self, simulation: &Simulation, inputs: SceneInputs<'_>) -> &[Primitive] {
        if self.dirty {
            self.rebuild(simulation, inputs);
            self.dirty = false;
            self.rebuilds += 1;
            log::trace!(
                "scene rebuild {} produced {} primitives",
                self.rebuilds,
                self.primitives.len()
            );
        }
        &self.primitives
    }

    fn rebuild(&mut self, simulation: &Simulation, inputs: SceneInputs<'_>) {
        self.primitives.clear();
        let nodes = simulation.nodes();
        if nodes.is_empty() {
            self.primitives.push(Primitive::Placeholder {
                title: EMPTY_TITLE.to_owned(),
                detail: inputs.notice.unwrap_or(EMPTY_HINT).to_owned(),
            });
            return;
        }

        let viewport = inputs.viewport;
        let scale = viewport.scale;

        if inputs.show_quadtree {
            simulation.quadtree_cells(&mut self.quadtree_cells);
            for cell in &self.quadtree_cells {
                let half = Vec2::splat(cell.half_extent);
                let alpha = if cell.is_leaf { 110 } else { 55 };
                let width = (1.4 - cell.depth as f32 * 0.09).clamp(0.45, 1.4);
                self.primitives.push(Primitive::Outline {
                    rect: Rect::from_min_max(
                        viewport.world_to_screen(cell.center - half),
                        viewport.world_to_screen(cell.center + half),
                    ),
                    stroke: Stroke::new(width, Color32::from_rgba_unmultiplied(106, 198, 255, alpha)),
                });
            }
        }

        let link_stroke = Stroke::new(LINK_WIDTH * scale, with_opacity(LINK_COLOR, LINK_OPACITY));
        for link in simulation.links() {
            let (Some(source), Some(target)) = (nodes.get(link.source), nodes.get(link.target)) else {
                continue;
            };
            self.primitives.push(Primitive::Line {
                from: viewport.world_to_screen(source.world_pos),
                to: viewport.world_to_screen(target.world_pos),
                stroke: link_stroke,
            });
        }

        for (index, node) in nodes.iter().enumerate() {
            let hovered = inputs.hovered == Some(index);
            let (radius, opacity) = if hovered {
                (node.radius * HOVER_RADIUS_FACTOR, 1.0)
            } else {
                (node.radius, IDLE_OPACITY)
            };
            self.primitives.push(Primitive::Circle {
                center: viewport.world_to_screen(node.world_pos),
                radius: radius * scale,
                fill: with_opacity(category_color(&node.category), opacity),
                stroke: Stroke::new(2.0 * scale, with_opacity(NODE_OUTLINE, opacity)),
            });
        }

        // Labels go last so they sit above every circle.
        for node in nodes {
            let label = truncate_label(&node.label, self.label_max_chars);
            let width = label_box_width(&label);
            let anchor = node.world_pos - vec2(0.0, LABEL_OFFSET);
            let half = vec2(width, LABEL_HEIGHT) * 0.5;
            self.primitives.push(Primitive::LabelBox {
                rect: Rect::from_min_max(
                    viewport.world_to_screen(anchor - half),
                    viewport.world_to_screen(anchor + half),
                ),
                fill: LABEL_FILL,
            });
            self.primitives.push(Primitive::Text {
                pos: viewport.world_to_screen(anchor),
                text: label.into_owned(),
                size: LABEL_FONT_SIZE * scale,
                color: LABEL_TEXT,
            });
        }
    }
}

/// World-space width of the box behind a (possibly truncated) label.
fn label_box_width(label: &str) -> f32 {
    label.chars().count() as f32 * LABEL_CHAR_WIDTH + LABEL_PADDING
}

/// Draws `primitives` onto `painter`, offsetting canvas-local coordinates by `origin`.
pub(in crate::app) fn paint(painter: &Painter, origin: Vec2, primitives: &[Primitive]) {
    for primitive in primitives {
        match primitive {
            Primitive::Line { from, to, stroke } => {
                painter.line_segment([*from + origin, *to + origin], *stroke);
            }
            Primitive::Circle {
                center,
                radius,
                fill,
                stroke,
            } => {
                painter.circle(*center + origin, *radius, *fill, *stroke);
            }
            Primitive::LabelBox { rect, fill } => {
                painter.rect_filled(rect.translate(origin), CornerRadius::same(3), *fill);
            }
            Primitive::Text {
                pos,
                text,
                size,
                color,
            } => {
                painter.text(
                    *pos + origin,
                    Align2::CENTER_CENTER,
                    text,
                    FontId::proportional(*size),
                    *color,
                );
            }
            Primitive::Outline { rect, stroke } => {
                let rect = rect.translate(origin);
                painter.line_segment([rect.left_top(), rect.right_top()], *stroke);
                painter.line_segment([rect.right_top(), rect.right_bottom()], *stroke);
                painter.line_segment([rect.right_bottom(), rect.left_bottom()], *stroke);
                painter.line_segment([rect.left_bottom(), rect.left_top()], *stroke);
            }
            Primitive::Placeholder { title, detail } => {
                let center = painter.clip_rect().center();
                painter.text(
                    center - vec2(0.0, 12.0),
                    Align2::CENTER_CENTER,
                    title,
                    FontId::proportional(18.0),
                    LABEL_TEXT,
                );
                painter.text(
                    center + vec2(0.0, 14.0),
                    Align2::CENTER_CENTER,
                    detail,
                    FontId::proportional(13.6),
                    MUTED_TEXT,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::kg::EntityCategory;

    use super::super::super::render_utils::FALLBACK_COLOR;
    use super::super::super::{Link, Node};
    use super::*;

    fn node(id: usize, label: &str, category: EntityCategory, x: f32, y: f32) -> Node {
        Node {
            id,
            label: label.to_owned(),
            category,
            value: None,
            world_pos: vec2(x, y),
            velocity: Vec2::ZERO,
            fx: None,
            fy: None,
            radius: 18.0,
        }
    }

    fn inputs() -> SceneInputs<'static> {
        SceneInputs {
            viewport: Viewport::default(),
            hovered: None,
            notice: None,
            show_quadtree: false,
        }
    }

    fn simulation() -> Simulation {
        let mut simulation = Simulation::new(LayoutConfig::default());
        simulation.start(
            vec![
                node(0, "Barack Obama", EntityCategory::Person, 300.0, 300.0),
                node(1, "International Business Machines", EntityCategory::Org, 500.0, 300.0),
                node(2, "Zeta", EntityCategory::Other("NORP".to_owned()), 400.0, 400.0),
            ],
            vec![Link {
                source: 0,
                target: 1,
                rest_length: 150.0,
                relation: Some("works_for".to_owned()),
            }],
            vec2(800.0, 600.0),
        );
        simulation
    }

    #[test]
    fn empty_layout_renders_placeholder_only() {
        let mut adapter = RenderAdapter::new(&LayoutConfig::default());
        let mut simulation = Simulation::new(LayoutConfig::default());
        simulation.start(Vec::new(), Vec::new(), vec2(800.0, 600.0));

        let primitives = adapter.frame(&simulation, inputs());
        assert_eq!(
            primitives,
            &[Primitive::Placeholder {
                title: EMPTY_TITLE.to_owned(),
                detail: EMPTY_HINT.to_owned(),
            }]
        );

        adapter.invalidate();
        let primitives = adapter.frame(
            &simulation,
            SceneInputs {
                notice: Some("No nodes found for file abc."),
                ..inputs()
            },
        );
        assert!(matches!(
            &primitives[0],
            Primitive::Placeholder { detail, .. } if detail == "No nodes found for file abc."
        ));
    }

    #[test]
    fn scene_has_lines_circles_and_truncated_labels() {
        let mut adapter = RenderAdapter::new(&LayoutConfig::default());
        let simulation = simulation();
        let primitives = adapter.frame(&simulation, inputs());

        let lines = primitives
            .iter()
            .filter(|primitive| matches!(primitive, Primitive::Line { .. }))
            .count();
        let fills = primitives
            .iter()
            .filter_map(|primitive| match primitive {
                Primitive::Circle { fill, .. } => Some(*fill),
                _ => None,
            })
            .collect::<Vec<_>>();
        let texts = primitives
            .iter()
            .filter_map(|primitive| match primitive {
                Primitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(lines, 1);
        assert_eq!(fills.len(), 3);
        assert_eq!(
            fills[0],
            with_opacity(category_color(&EntityCategory::Person), IDLE_OPACITY)
        );
        assert_eq!(
            fills[2],
            with_opacity(category_color(&EntityCategory::Other("NORP".to_owned())), IDLE_OPACITY)
        );
        assert_eq!(texts, vec!["Barack Obama", "International B...", "Zeta"]);
    }

    #[test]
    fn label_box_tracks_truncated_width_above_node() {
        let mut adapter = RenderAdapter::new(&LayoutConfig::default());
        let simulation = simulation();
        let primitives = adapter.frame(&simulation, inputs());

        let boxes = primitives
            .iter()
            .filter_map(|primitive| match primitive {
                Primitive::LabelBox { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect::<Vec<_>>();
        let centre = simulation.nodes()[1].world_pos;

        assert_eq!(boxes[1].width(), 18.0 * 7.0 + 10.0);
        assert_eq!(boxes[1].height(), LABEL_HEIGHT);
        assert!((boxes[1].center().y - (centre.y - LABEL_OFFSET)).abs() < 1e-3);
        assert!((boxes[1].center().x - centre.x).abs() < 1e-3);
    }

    #[test]
    fn hovered_node_is_enlarged_and_opaque() {
        let mut adapter = RenderAdapter::new(&LayoutConfig::default());
        let simulation = simulation();
        let primitives = adapter.frame(
            &simulation,
            SceneInputs {
                hovered: Some(2),
                ..inputs()
            },
        );
        let circles = primitives
            .iter()
            .filter_map(|primitive| match primitive {
                Primitive::Circle { radius, fill, .. } => Some((*radius, *fill)),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(circles[0].0, 18.0);
        assert!((circles[2].0 - 22.0).abs() < 1e-4);
        assert_eq!(circles[2].1, FALLBACK_COLOR);
    }

    #[test]
    fn viewport_scales_geometry() {
        let mut adapter = RenderAdapter::new(&LayoutConfig::default());
        let simulation = simulation();
        let viewport = Viewport {
            scale: 2.0,
            translate: vec2(10.0, -20.0),
        };
        let primitives = adapter.frame(
            &simulation,
            SceneInputs {
                viewport,
                ..inputs()
            },
        );
        let first_circle = primitives
            .iter()
            .find_map(|primitive| match primitive {
                Primitive::Circle { center, radius, .. } => Some((*center, *radius)),
                _ => None,
            });

        let expected = viewport.world_to_screen(simulation.nodes()[0].world_pos);
        assert_eq!(first_circle, Some((expected, 36.0)));
    }

    #[test]
    fn cached_frame_is_reused_until_invalidated() {
        let mut adapter = RenderAdapter::new(&LayoutConfig::default());
        let mut simulation = simulation();

        adapter.frame(&simulation, inputs());
        adapter.frame(&simulation, inputs());
        assert_eq!(adapter.rebuilds(), 1);

        simulation.tick();
        adapter.invalidate();
        assert!(adapter.is_dirty());
        adapter.frame(&simulation, inputs());
        assert_eq!(adapter.rebuilds(), 2);
        assert!(!adapter.is_dirty());
    }

    #[test]
    fn quadtree_overlay_adds_outlines() {
        let mut adapter = RenderAdapter::new(&LayoutConfig::default());
        let simulation = simulation();
        let primitives = adapter.frame(
            &simulation,
            SceneInputs {
                show_quadtree: true,
                ..inputs()
            },
        );
        assert!(matches!(primitives[0], Primitive::Outline { .. }));
    }
}
