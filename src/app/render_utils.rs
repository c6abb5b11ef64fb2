use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

use crate::kg::EntityCategory;

use super::graph::Viewport;

pub(super) const FALLBACK_COLOR: Color32 = Color32::from_rgb(129, 140, 248);
pub(super) const LINK_COLOR: Color32 = Color32::from_rgb(71, 85, 105);
pub(super) const NODE_OUTLINE: Color32 = Color32::from_rgb(30, 41, 59);
pub(super) const LABEL_FILL: Color32 = Color32::from_rgba_premultiplied(13, 20, 36, 217);
pub(super) const LABEL_TEXT: Color32 = Color32::from_rgb(226, 232, 240);
pub(super) const MUTED_TEXT: Color32 = Color32::from_rgb(148, 163, 184);

pub(super) fn category_color(category: &EntityCategory) -> Color32 {
    match category {
        EntityCategory::Person => Color32::from_rgb(96, 165, 250),
        EntityCategory::Org => Color32::from_rgb(52, 211, 153),
        EntityCategory::Date => Color32::from_rgb(129, 140, 248),
        EntityCategory::Money => Color32::from_rgb(167, 139, 250),
        EntityCategory::Gpe => Color32::from_rgb(34, 211, 238),
        EntityCategory::Cardinal => Color32::from_rgb(251, 146, 60),
        EntityCategory::Product => Color32::from_rgb(244, 114, 182),
        EntityCategory::Event => Color32::from_rgb(251, 191, 36),
        EntityCategory::Loc => Color32::from_rgb(45, 212, 191),
        EntityCategory::Time => Color32::from_rgb(251, 113, 133),
        EntityCategory::Other(_) => FALLBACK_COLOR,
    }
}

pub(super) fn with_opacity(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, viewport: Viewport) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * viewport.scale.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.min + viewport.translate;
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}
