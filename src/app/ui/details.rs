use eframe::egui::{self, RichText, Ui};

use super::super::ViewModel;
use super::super::render_utils::category_color;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Entity Details");
        ui.add_space(6.0);

        let Some(entity) = &self.activated else {
            ui.label("Click a node to inspect the entity behind it.");
            return;
        };

        ui.label(RichText::new(entity.text.as_str()).strong());
        ui.horizontal(|ui| {
            ui.label(RichText::new("●").color(category_color(&entity.category)));
            ui.label(entity.category.label());
        });
        if let Some(value) = &entity.value {
            ui.label(format!("Value: {value}"));
        }
        ui.small(format!("id {} (payload key {})", entity.id, entity.key));
        ui.label(format!("Degree: {}", entity.relations.len()));

        ui.separator();
        ui.label(RichText::new("Relations").strong());
        if entity.relations.is_empty() {
            ui.label("No relations for this entity.");
            return;
        }

        egui::ScrollArea::vertical()
            .id_salt("relations_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for relation in &entity.relations {
                    let verb = relation.relation.as_deref().unwrap_or("related to");
                    let line = if relation.outgoing {
                        format!("{verb} → {}", relation.other)
                    } else {
                        format!("{} {verb} → this", relation.other)
                    };
                    ui.label(line);
                }
            });
    }
}
