mod build;
mod interaction;
mod view;

use std::time::{Duration, Instant};

use eframe::egui::{Pos2, Vec2};

use crate::kg::{EntityCategory, GraphPayload};

use super::config::LayoutConfig;
use super::physics::{Phase, Simulation, SimulationState, TickOutcome};
pub(in crate::app) use build::BuildReport;
pub(in crate::app) use interaction::{PointerEvent, Viewport};
pub(in crate::app) use view::{Primitive, paint};

use interaction::{InteractionController, InteractionOutcome};
use view::{RenderAdapter, SceneInputs};

/// What the inspection sink receives when a node is activated.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct EntityRef {
    pub id: usize,
    pub key: String,
    pub text: String,
    pub category: EntityCategory,
    pub value: Option<String>,
    pub relations: Vec<RelationRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct RelationRef {
    pub other: String,
    pub relation: Option<String>,
    pub outgoing: bool,
}

type ActivateCallback = Box<dyn FnMut(EntityRef)>;

/// Host-facing surface of the layout engine: owns one simulation at a time together
/// with its interaction state and render cache.
pub(in crate::app) struct GraphCanvas {
    config: LayoutConfig,
    simulation: Simulation,
    interaction: InteractionController,
    renderer: RenderAdapter,
    keys: Vec<String>,
    report: BuildReport,
    notice: Option<String>,
    show_quadtree: bool,
    on_activate: Option<ActivateCallback>,
    last_tick: Duration,
}

impl GraphCanvas {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            simulation: Simulation::new(config),
            interaction: InteractionController::new(&config),
            renderer: RenderAdapter::new(&config),
            config,
            keys: Vec::new(),
            report: BuildReport::default(),
            notice: None,
            show_quadtree: false,
            on_activate: None,
            last_tick: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Engine tunables take effect on the next [`GraphCanvas::start`]; zoom limits and
    /// the label length limit apply immediately.
    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = config;
        self.simulation.set_config(config);
        self.interaction.set_config(&config);
        self.renderer.set_config(&config);
    }

    /// Swaps in a new data set. The running layout, any drag in progress and the render
    /// cache are all discarded before the new layout starts.
    pub fn start(&mut self, payload: &GraphPayload, extent: Vec2) {
        self.interaction.reset();
        let built = build::build(payload, &self.config, extent * 0.5);
        self.keys = built.keys;
        self.report = built.report;
        self.notice = payload.notice.clone();
        self.simulation.start(built.nodes, built.links, extent);
        self.renderer.invalidate();
    }

    pub fn stop(&mut self) {
        self.interaction.reset();
        self.simulation.stop();
        self.keys.clear();
        self.renderer.invalidate();
    }

    pub fn on_activate(&mut self, callback: impl FnMut(EntityRef) + 'static) {
        self.on_activate = Some(Box::new(callback));
    }

    pub fn viewport(&self) -> Viewport {
        self.interaction.viewport()
    }

    pub fn set_viewport(&mut self, scale: f32, translate: Vec2) {
        if self.interaction.set_viewport(scale, translate) {
            self.renderer.invalidate();
        }
    }

    pub fn reset_view(&mut self) {
        self.set_viewport(1.0, Vec2::ZERO);
    }

    /// Feeds one pointer event through the interaction controller. Returns true when the
    /// scene changed.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        match self.interaction.handle(event, &mut self.simulation) {
            InteractionOutcome::Ignored => false,
            InteractionOutcome::ViewChanged | InteractionOutcome::LayoutChanged => {
                self.renderer.invalidate();
                true
            }
            InteractionOutcome::Activated(index) => {
                self.renderer.invalidate();
                if let Some(entity) = self.entity(index) {
                    log::debug!("activated {} ({})", entity.text, entity.category);
                    if let Some(callback) = self.on_activate.as_mut() {
                        callback(entity);
                    }
                }
                true
            }
        }
    }

    pub fn update_hover(&mut self, pos: Option<Pos2>) -> bool {
        let changed = self.interaction.update_hover(self.simulation.nodes(), pos);
        if changed {
            self.renderer.invalidate();
        }
        changed
    }

    pub fn hovered(&self) -> Option<usize> {
        self.interaction.hovered()
    }

    /// Advances the layout by one tick when it is running.
    pub fn step(&mut self) -> TickOutcome {
        let started = Instant::now();
        let outcome = self.simulation.tick();
        if outcome != TickOutcome::Skipped {
            self.last_tick = started.elapsed();
            self.renderer.invalidate();
        }
        outcome
    }

    pub fn reheat(&mut self) -> bool {
        let reheated = self.simulation.reheat(self.config.reheat_alpha);
        if reheated {
            self.renderer.invalidate();
        }
        reheated
    }

    pub fn set_show_quadtree(&mut self, show: bool) {
        if self.show_quadtree != show {
            self.show_quadtree = show;
            self.renderer.invalidate();
        }
    }

    pub fn frame(&mut self) -> &[Primitive] {
        let inputs = SceneInputs {
            viewport: self.interaction.viewport(),
            hovered: self.interaction.hovered(),
            notice: self.notice.as_deref(),
            show_quadtree: self.show_quadtree,
        };
        self.renderer.frame(&self.simulation, inputs)
    }

    /// True while something still moves on its own: a running layout or a drag.
    pub fn is_animating(&self) -> bool {
        self.simulation.is_running() || self.interaction.dragged().is_some()
    }

    pub fn phase(&self) -> Phase {
        self.simulation.phase()
    }

    pub fn state(&self) -> SimulationState {
        self.simulation.state()
    }

    pub fn ticks(&self) -> u32 {
        self.simulation.ticks()
    }

    pub fn last_tick(&self) -> Duration {
        self.last_tick
    }

    pub fn node_count(&self) -> usize {
        self.simulation.nodes().len()
    }

    pub fn link_count(&self) -> usize {
        self.simulation.links().len()
    }

    pub fn report(&self) -> BuildReport {
        self.report
    }

    pub fn rejected_updates(&self) -> usize {
        self.simulation.rejected_updates()
    }

    pub fn entity(&self, index: usize) -> Option<EntityRef> {
        let nodes = self.simulation.nodes();
        let node = nodes.get(index)?;
        let relations = self
            .simulation
            .links()
            .iter()
            .filter_map(|link| {
                let (other, outgoing) = if link.source == index {
                    (link.target, true)
                } else if link.target == index {
                    (link.source, false)
                } else {
                    return None;
                };
                Some(RelationRef {
                    other: nodes.get(other)?.label.clone(),
                    relation: link.relation.clone(),
                    outgoing,
                })
            })
            .collect();

        Some(EntityRef {
            id: node.id,
            key: self.keys.get(index).cloned().unwrap_or_default(),
            text: node.label.clone(),
            category: node.category.clone(),
            value: node.value.clone(),
            relations,
        })
    }
}
