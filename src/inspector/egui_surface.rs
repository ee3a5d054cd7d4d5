//! [`UiSurface`] over an `egui::Ui`

use std::collections::HashMap;

use glam::Vec2;

use crate::backend::TextureHandle;
use crate::inspector::ui::{CodeEditor, ImageDesc, Palette, UiSurface};

/// Draws inspector widgets into an `egui::Ui`.
///
/// `textures` maps engine textures to the ids they were registered under with
/// the egui renderer. Unmapped textures fall back to `TextureId::User(raw handle)`.
pub struct EguiSurface<'a> {
    ui: &'a mut egui::Ui,
    textures: &'a HashMap<TextureHandle, egui::TextureId>,
}

impl<'a> EguiSurface<'a> {
    pub fn new(ui: &'a mut egui::Ui, textures: &'a HashMap<TextureHandle, egui::TextureId>) -> Self {
        Self { ui, textures }
    }

    fn texture_id(&self, texture: TextureHandle) -> egui::TextureId {
        self.textures
            .get(&texture)
            .copied()
            .unwrap_or(egui::TextureId::User(texture.raw()))
    }
}

fn color32(rgba: [f32; 4]) -> egui::Color32 {
    let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn vec2(v: Vec2) -> egui::Vec2 {
    egui::vec2(v.x, v.y)
}

impl UiSurface for EguiSurface<'_> {
    fn window(
        &mut self,
        title: &str,
        open: &mut bool,
        size: Option<Vec2>,
        add_contents: &mut dyn FnMut(&mut dyn UiSurface),
    ) {
        let textures = self.textures;
        let mut window = egui::Window::new(title).open(open);
        if let Some(size) = size {
            window = window.default_size(vec2(size));
        }
        let ctx = self.ui.ctx().clone();
        window.show(&ctx, |ui| {
            add_contents(&mut EguiSurface { ui, textures });
        });
    }

    fn collapsing_header(&mut self, label: &str, add_contents: &mut dyn FnMut(&mut dyn UiSurface)) {
        let textures = self.textures;
        egui::CollapsingHeader::new(label)
            .default_open(true)
            .show(self.ui, |ui| {
                add_contents(&mut EguiSurface { ui, textures });
            });
    }

    fn tree_node(
        &mut self,
        id: &str,
        label: &str,
        add_contents: &mut dyn FnMut(&mut dyn UiSurface),
    ) {
        let textures = self.textures;
        egui::CollapsingHeader::new(label)
            .id_source(id)
            .default_open(false)
            .show(self.ui, |ui| {
                add_contents(&mut EguiSurface { ui, textures });
            });
    }

    fn label_value(&mut self, label: &str, value: &str) {
        self.ui.horizontal(|ui| {
            ui.label(format!("{label}:"));
            ui.monospace(value);
        });
    }

    fn text(&mut self, text: &str) {
        self.ui.label(text);
    }

    fn error_text(&mut self, text: &str) {
        let color = self.ui.visuals().error_fg_color;
        self.ui.colored_label(color, text);
    }

    fn separator(&mut self) {
        self.ui.separator();
    }

    fn button(&mut self, label: &str) -> bool {
        self.ui.button(label).clicked()
    }

    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool {
        self.ui.checkbox(value, label).changed()
    }

    fn combo(&mut self, label: &str, items: &[String], selected: &mut Option<usize>) -> bool {
        let mut changed = false;
        let current = selected
            .and_then(|i| items.get(i))
            .map(String::as_str)
            .unwrap_or("");
        egui::ComboBox::from_label(label)
            .selected_text(current)
            .show_ui(self.ui, |ui| {
                for (index, item) in items.iter().enumerate() {
                    if ui
                        .selectable_label(*selected == Some(index), item)
                        .clicked()
                        && *selected != Some(index)
                    {
                        *selected = Some(index);
                        changed = true;
                    }
                }
            });
        changed
    }

    fn image(&mut self, image: &ImageDesc) {
        let texture = egui::load::SizedTexture::new(self.texture_id(image.texture), vec2(image.size));
        let uv = egui::Rect::from_min_max(
            egui::pos2(image.uv_min.x, image.uv_min.y),
            egui::pos2(image.uv_max.x, image.uv_max.y),
        );
        let response = self
            .ui
            .add(egui::Image::new(texture).uv(uv).tint(color32(image.tint)));
        if let Some(border) = image.border {
            self.ui.painter().rect_stroke(
                response.rect,
                0.0,
                egui::Stroke::new(1.0, color32(border)),
            );
        }
    }

    fn plot_lines(&mut self, label: &str, values: &[f32], range: (f32, f32), size: Vec2) {
        self.ui.label(label);
        let (response, painter) = self.ui.allocate_painter(vec2(size), egui::Sense::hover());
        let rect = response.rect;
        painter.rect_filled(rect, 0.0, self.ui.visuals().extreme_bg_color);
        if values.len() < 2 {
            return;
        }

        let (min, max) = range;
        let span = if max > min { max - min } else { 1.0 };
        let step = rect.width() / (values.len() - 1) as f32;
        let points: Vec<egui::Pos2> = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let t = ((v - min) / span).clamp(0.0, 1.0);
                egui::pos2(rect.left() + i as f32 * step, rect.bottom() - t * rect.height())
            })
            .collect();
        let stroke = egui::Stroke::new(1.0, self.ui.visuals().text_color());
        painter.add(egui::Shape::line(points, stroke));
    }

    fn code_editor(&mut self, editor: &mut dyn CodeEditor, size: Vec2) {
        let read_only = editor.is_read_only();
        let palette = editor.palette();
        let text = editor.text_mut();

        let frame = match palette {
            Palette::Dark => egui::Frame::none(),
            Palette::Light => egui::Frame::none().fill(egui::Color32::from_gray(245)),
        };
        frame.show(self.ui, |ui| {
            egui::ScrollArea::vertical()
                .max_height(size.y)
                .show(ui, |ui| {
                    let mut edit = egui::TextEdit::multiline(text)
                        .code_editor()
                        .desired_width(size.x)
                        .interactive(!read_only);
                    if palette == Palette::Light {
                        edit = edit.text_color(egui::Color32::from_gray(20));
                    }
                    ui.add(edit);
                });
        });
    }
}
