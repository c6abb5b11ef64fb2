use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Vec2};

use crate::kg::{EntityCategory, GraphPayload, GraphSource};

mod config;
mod graph;
mod physics;
mod render_utils;
mod ui;

pub use config::LayoutConfig;
use graph::{EntityRef, GraphCanvas};

/// One entity in the running layout. Positions live in simulation space, where
/// `(0, 0)` is the top-left corner of the drawing area read at start.
#[derive(Clone, Debug)]
pub(in crate::app) struct Node {
    pub id: usize,
    pub label: String,
    pub category: EntityCategory,
    pub value: Option<String>,
    pub world_pos: Vec2,
    pub velocity: Vec2,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
    pub radius: f32,
}

impl Node {
    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }
}

/// Undirected spring between two node ids of the same layout.
#[derive(Clone, Debug, PartialEq)]
pub(in crate::app) struct Link {
    pub source: usize,
    pub target: usize,
    pub rest_length: f32,
    pub relation: Option<String>,
}

type LoadResult = Result<GraphPayload, String>;

pub struct KgCanvasApp {
    source: Arc<dyn GraphSource>,
    config: LayoutConfig,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    payload: GraphPayload,
    canvas: GraphCanvas,
    /// Tunables edited in the controls panel, applied on the next restart.
    pending_config: LayoutConfig,
    needs_start: bool,
    show_quadtree_overlay: bool,
    activation_rx: Receiver<EntityRef>,
    activated: Option<EntityRef>,
    show_fps_bar: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

impl KgCanvasApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        source: Arc<dyn GraphSource>,
        config: LayoutConfig,
    ) -> Self {
        let state = Self::start_load(Arc::clone(&source));
        Self {
            source,
            config,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(source: Arc<dyn GraphSource>) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = source.fetch().map_err(|error| {
                log::error!("failed to load graph from {}: {error:#}", source.describe());
                format!("{error:#}")
            });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(source: Arc<dyn GraphSource>) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(source),
        }
    }

    fn ready(&self, payload: GraphPayload) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(payload, self.config)))
    }
}

impl eframe::App for KgCanvasApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let source_name = self.source.describe();

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => {
                        transition = Some(result);
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(Err("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading knowledge graph from {source_name}..."));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load knowledge graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    retry = ui.button("Retry").clicked();
                });
                if retry {
                    self.state = Self::start_load(Arc::clone(&self.source));
                    return;
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &source_name, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(Arc::clone(&self.source)));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            transition = Some(result);
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(Err("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if let Some(result) = transition {
            self.reload_rx = None;
            match result {
                // A reload keeps the pan/zoom and tuning; only the data is swapped.
                Ok(payload) => {
                    if let AppState::Ready(model) = &mut self.state {
                        model.replace_payload(payload);
                    } else {
                        self.state = self.ready(payload);
                    }
                }
                Err(error) => self.state = AppState::Error(error),
            }
        }
    }
}
