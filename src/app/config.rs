use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::{Vec2, vec2};
use serde::Deserialize;

/// Every tunable of the layout engine, the interaction controller and the render adapter.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub reheat_alpha: f32,
    pub max_ticks: u32,
    pub settle_speed: f32,
    pub max_speed: f32,
    pub theta: f32,
    pub link_distance: f32,
    pub charge_strength: f32,
    pub charge_distance_min: f32,
    pub center_strength: f32,
    pub collision_padding: f32,
    pub collision_strength: f32,
    pub node_radius: f32,
    pub bounds_padding_x: f32,
    pub bounds_padding_y: f32,
    pub label_max_chars: usize,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            alpha_min: 0.001,
            alpha_decay: 0.0228,
            velocity_decay: 0.4,
            reheat_alpha: 0.3,
            max_ticks: 1200,
            settle_speed: 0.02,
            max_speed: 80.0,
            theta: 0.9,
            link_distance: 150.0,
            charge_strength: -800.0,
            charge_distance_min: 1.0,
            center_strength: 0.1,
            collision_padding: 42.0,
            collision_strength: 0.7,
            node_radius: 18.0,
            bounds_padding_x: 100.0,
            bounds_padding_y: 60.0,
            label_max_chars: 15,
            min_scale: 0.3,
            max_scale: 4.0,
        }
    }
}

impl LayoutConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read layout config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid layout config {}", path.display()))?;
        Ok(config.sanitized())
    }

    /// Pulls out-of-range values back into ranges the engine can run with.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        for (value, fallback) in [
            (&mut self.alpha_min, defaults.alpha_min),
            (&mut self.alpha_decay, defaults.alpha_decay),
            (&mut self.velocity_decay, defaults.velocity_decay),
            (&mut self.reheat_alpha, defaults.reheat_alpha),
            (&mut self.settle_speed, defaults.settle_speed),
            (&mut self.max_speed, defaults.max_speed),
            (&mut self.theta, defaults.theta),
            (&mut self.link_distance, defaults.link_distance),
            (&mut self.charge_strength, defaults.charge_strength),
            (&mut self.charge_distance_min, defaults.charge_distance_min),
            (&mut self.center_strength, defaults.center_strength),
            (&mut self.collision_padding, defaults.collision_padding),
            (&mut self.collision_strength, defaults.collision_strength),
            (&mut self.node_radius, defaults.node_radius),
            (&mut self.bounds_padding_x, defaults.bounds_padding_x),
            (&mut self.bounds_padding_y, defaults.bounds_padding_y),
            (&mut self.min_scale, defaults.min_scale),
            (&mut self.max_scale, defaults.max_scale),
        ] {
            if !value.is_finite() {
                *value = fallback;
            }
        }

        self.alpha_min = self.alpha_min.clamp(1e-6, 0.5);
        self.alpha_decay = self.alpha_decay.clamp(1e-4, 0.5);
        self.velocity_decay = self.velocity_decay.clamp(0.0, 1.0);
        self.reheat_alpha = self.reheat_alpha.clamp(self.alpha_min, 1.0);
        self.max_ticks = self.max_ticks.max(1);
        self.settle_speed = self.settle_speed.max(0.0);
        self.max_speed = self.max_speed.max(1.0);
        self.theta = self.theta.clamp(0.0, 2.0);
        self.link_distance = self.link_distance.max(0.0);
        self.charge_distance_min = self.charge_distance_min.max(0.01);
        self.center_strength = self.center_strength.clamp(0.0, 1.0);
        self.collision_padding = self.collision_padding.max(0.0);
        self.collision_strength = self.collision_strength.clamp(0.0, 1.0);
        self.node_radius = self.node_radius.max(1.0);
        self.bounds_padding_x = self.bounds_padding_x.max(0.0);
        self.bounds_padding_y = self.bounds_padding_y.max(0.0);
        if self.label_max_chars == 0 {
            self.label_max_chars = defaults.label_max_chars;
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) {
            self.min_scale = defaults.min_scale;
            self.max_scale = defaults.max_scale;
        }
        self
    }

    pub fn bounds_padding(&self) -> Vec2 {
        vec2(self.bounds_padding_x, self.bounds_padding_y)
    }
}
