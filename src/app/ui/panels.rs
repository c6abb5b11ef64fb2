use std::collections::VecDeque;
use std::sync::mpsc;

use eframe::egui::{self, Align, Context, Layout, PointerButton, Rect, Sense, Ui};

use crate::kg::GraphPayload;

use super::super::config::LayoutConfig;
use super::super::graph::{GraphCanvas, PointerEvent, paint};
use super::super::render_utils::draw_background;
use super::super::ViewModel;

/// Translates this frame's raw egui input into canvas-local pointer events. Presses
/// only count inside the canvas; moves and releases are always forwarded so a drag
/// that leaves the canvas still ends cleanly.
fn pointer_events(ui: &Ui, rect: Rect, canvas_hovered: bool) -> Vec<PointerEvent> {
    let origin = rect.min.to_vec2();
    ui.input(|input| {
        let mut events = Vec::new();
        for event in &input.events {
            match event {
                egui::Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed,
                    ..
                } => {
                    if !*pressed {
                        events.push(PointerEvent::Release { pos: *pos - origin });
                    } else if rect.contains(*pos) {
                        events.push(PointerEvent::Press { pos: *pos - origin });
                    }
                }
                egui::Event::PointerMoved(pos) => {
                    events.push(PointerEvent::Move { pos: *pos - origin });
                }
                egui::Event::PointerGone => events.push(PointerEvent::Cancel),
                _ => {}
            }
        }

        if canvas_hovered && let Some(pointer) = input.pointer.hover_pos() {
            let pos = pointer - origin;
            let zoom = input.zoom_delta();
            let scroll = input.raw_scroll_delta.y;
            if (zoom - 1.0).abs() > f32::EPSILON {
                events.push(PointerEvent::Pinch { pos, factor: zoom });
            } else if scroll.abs() > f32::EPSILON {
                events.push(PointerEvent::Wheel { pos, delta: scroll });
            }
        }

        events
    })
}

impl ViewModel {
    pub(in crate::app) fn new(payload: GraphPayload, config: LayoutConfig) -> Self {
        let (tx, activation_rx) = mpsc::channel();
        let mut canvas = GraphCanvas::new(config);
        canvas.on_activate(move |entity| {
            let _ = tx.send(entity);
        });

        Self {
            payload,
            canvas,
            pending_config: config,
            needs_start: true,
            show_quadtree_overlay: false,
            activation_rx,
            activated: None,
            show_fps_bar: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
        }
    }

    pub(in crate::app) fn replace_payload(&mut self, payload: GraphPayload) {
        self.canvas.stop();
        self.payload = payload;
        self.activated = None;
        self.needs_start = true;
    }

    pub(in crate::app) fn restart_layout(&mut self) {
        self.canvas.set_config(self.pending_config);
        self.needs_start = true;
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        source_name: &str,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        self.update_fps_counter(ctx);

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("kg-canvas");
                    ui.separator();
                    ui.label(format!("source: {source_name}"));
                    ui.label(format!("entities: {}", self.payload.entities.len()));
                    ui.label(format!("relations: {}", self.payload.relations.len()));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload data"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(fps_text) = self.fps_display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui));
    }

    fn draw_canvas(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        if self.needs_start {
            // The drawing size is read once per data set.
            self.canvas.start(&self.payload, rect.size());
            self.needs_start = false;
        }

        let mut changed = false;
        for event in pointer_events(ui, rect, response.hovered()) {
            changed |= self.canvas.handle_pointer(event);
        }
        let hover = ui
            .input(|input| input.pointer.hover_pos())
            .filter(|pos| rect.contains(*pos))
            .map(|pos| pos - rect.min.to_vec2());
        changed |= self.canvas.update_hover(hover);

        self.canvas.step();

        if self.canvas.hovered().is_some() {
            ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::PointingHand);
        }

        let painter = ui.painter_at(rect);
        draw_background(&painter, rect, self.canvas.viewport());
        paint(&painter, rect.min.to_vec2(), self.canvas.frame());

        while let Ok(entity) = self.activation_rx.try_recv() {
            self.activated = Some(entity);
        }

        if changed || self.canvas.is_animating() {
            ui.ctx().request_repaint();
        }
    }
}
