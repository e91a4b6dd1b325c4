use egui::{ColorImage, Context, TextureHandle};
use image::RgbImage;

/// The texture holding the frame on screen.
#[derive(Default)]
pub struct FrameView {
    texture: Option<TextureHandle>,
}

impl FrameView {
    pub fn update(&mut self, ctx: &Context, frame: &RgbImage) {
        let color_image = ColorImage::from_rgb(
            [frame.width() as usize, frame.height() as usize],
            frame.as_raw(),
        );
        match self.texture.as_mut() {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture(
                    "current_frame",
                    color_image,
                    egui::TextureOptions::LINEAR,
                ))
            }
        }
    }

    pub fn clear(&mut self) {
        self.texture = None;
    }

    /// Paints the frame letterboxed into the remaining space of `ui`.
    pub fn show(&self, ui: &mut egui::Ui) {
        let (rect, _) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
        ui.painter().rect_filled(rect, 0.0, egui::Color32::from_gray(40));

        let Some(texture) = &self.texture else {
            return;
        };
        let [width, height] = texture.size();
        if width == 0 || height == 0 || rect.height() <= 0.0 {
            return;
        }

        let texture_aspect = width as f32 / height as f32;
        let container_aspect = rect.width() / rect.height();
        let size = if texture_aspect > container_aspect {
            egui::vec2(rect.width(), rect.width() / texture_aspect)
        } else {
            egui::vec2(rect.height() * texture_aspect, rect.height())
        };
        let image_rect = egui::Rect::from_center_size(rect.center(), size);

        ui.painter().image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::Pos2::ZERO, egui::Pos2::new(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }
}
