use std::ops::RangeInclusive;

use eframe::egui::{self, Key, Response, Ui};

use super::super::ViewModel;

const SLIDER_KEY_BASE_RATE: f32 = 10.0;
const SLIDER_KEY_ACCEL_PER_SEC: f32 = 9.0;
const SLIDER_KEY_ACCEL_MAX: f32 = 40.0;

/// Arrow key held on a focused slider and for how long.
#[derive(Clone, Copy, Default)]
struct ArrowHold {
    direction: i8,
    held_secs: f32,
}

fn slider_key_accel_multiplier(held_secs: f32) -> f32 {
    let ramp = held_secs * SLIDER_KEY_ACCEL_PER_SEC;
    (1.0 + ramp + ramp * ramp * 0.15).min(SLIDER_KEY_ACCEL_MAX)
}

/// Holding an arrow key on a focused slider moves it faster the longer it is held.
/// Returns true when the value moved.
fn accelerate_with_arrow_keys(
    ui: &Ui,
    response: &Response,
    value: &mut f32,
    range: &RangeInclusive<f32>,
) -> bool {
    let hold_id = response.id.with("arrow_hold");
    let (dt, direction) = ui.input(|input| {
        let up = input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp);
        let down = input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown);
        (input.stable_dt.min(0.1), up as i8 - down as i8)
    });

    if !response.has_focus() || direction == 0 {
        ui.ctx().data_mut(|data| data.remove::<ArrowHold>(hold_id));
        return false;
    }

    let previous = ui
        .ctx()
        .data(|data| data.get_temp::<ArrowHold>(hold_id))
        .filter(|hold| hold.direction == direction)
        .unwrap_or_default();
    let hold = ArrowHold {
        direction,
        held_secs: previous.held_secs + dt,
    };
    ui.ctx().data_mut(|data| data.insert_temp(hold_id, hold));

    let (min, max) = (*range.start(), *range.end());
    let step = ((max - min) / 200.0).max(0.0005);
    let speed = SLIDER_KEY_BASE_RATE * slider_key_accel_multiplier(hold.held_secs);
    let old_value = *value;
    *value = (*value + f32::from(direction) * step * speed * dt).clamp(min, max);
    ui.ctx().request_repaint();

    (*value - old_value).abs() > f32::EPSILON
}

fn tuning_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    text: &str,
    hint: &str,
) -> bool {
    let response = ui
        .add(
            egui::Slider::new(value, range.clone())
                .text(text)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hint);
    let accelerated = accelerate_with_arrow_keys(ui, &response, value, &range);
    response.changed() || accelerated
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Layout Controls");
        ui.separator();
        ui.add_space(4.0);

        let report = self.canvas.report();
        let state = self.canvas.state();

        egui::Grid::new("layout_stats")
            .num_columns(2)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.label("Entities");
                ui.label(self.canvas.node_count().to_string());
                ui.end_row();

                ui.label("Links");
                ui.label(self.canvas.link_count().to_string());
                ui.end_row();

                ui.label("Dropped relations");
                ui.label(report.dropped_relations().to_string())
                    .on_hover_text(format!(
                        "{} unresolved, {} self-loops, {} malformed",
                        report.unresolved_relations, report.self_loops, report.malformed_relations
                    ));
                ui.end_row();

                ui.label("Phase");
                ui.label(format!("{:?}", self.canvas.phase()));
                ui.end_row();

                ui.label("Alpha");
                ui.label(format!("{:.4} (min {:.4})", state.alpha, state.alpha_min));
                ui.end_row();

                ui.label("Ticks");
                ui.label(self.canvas.ticks().to_string());
                ui.end_row();

                ui.label("Rejected updates");
                ui.label(self.canvas.rejected_updates().to_string());
                ui.end_row();
            });

        if report.synthesized_chain {
            ui.small("No relations supplied; entities are linked in a chain.");
        }

        ui.separator();

        ui.horizontal_wrapped(|ui| {
            if ui
                .add_enabled(self.canvas.node_count() > 0, egui::Button::new("Reheat"))
                .on_hover_text("Raise the simulation temperature so the layout moves again.")
                .clicked()
            {
                self.canvas.reheat();
            }
            if ui
                .button("Restart layout")
                .on_hover_text("Reseed every node and apply the tuning below.")
                .clicked()
            {
                self.restart_layout();
            }
            if ui
                .button("Reset view")
                .on_hover_text("Return to unit zoom with no pan.")
                .clicked()
            {
                self.canvas.reset_view();
            }
        });

        ui.separator();

        if ui
            .checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay")
            .on_hover_text("Draw the Barnes-Hut partitions over the graph canvas.")
            .changed()
        {
            self.canvas.set_show_quadtree(self.show_quadtree_overlay);
        }

        ui.checkbox(&mut self.show_fps_bar, "FPS Display")
            .on_hover_text("Show a live FPS readout in the header.");

        ui.collapsing("Physics tuning", |ui| {
            let config = &mut self.pending_config;
            let mut changed = false;
            changed |= tuning_slider(
                ui,
                &mut config.charge_strength,
                -2000.0..=-50.0,
                "Charge",
                "Many-body strength. More negative pushes nodes further apart.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.link_distance,
                30.0..=400.0,
                "Link distance",
                "Rest length of every relation spring.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.theta,
                0.3..=1.5,
                "Theta",
                "Barnes-Hut accuracy. Lower is exact but slower.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.collision_padding,
                0.0..=80.0,
                "Collision padding",
                "Extra clearance kept around every node.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.velocity_decay,
                0.05..=0.9,
                "Velocity decay",
                "Fraction of velocity removed each tick.",
            );
            if changed {
                log::debug!("pending layout tuning: {config:?}");
            }

            if self.pending_config != *self.canvas.config() {
                ui.add_space(4.0);
                ui.small("Restart the layout to apply these values.");
            }
        });
    }
}
