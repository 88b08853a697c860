use eframe::egui::{self, Align2, Color32, FontId, Pos2, Stroke, StrokeKind};

use super::image_cache::ImageCache;
use super::{Canvas, TextMeasure};
use crate::geometry::{Point, Position, Rect, Size};

impl TextMeasure for egui::Painter {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        self.layout_no_wrap(text.to_string(), FontId::proportional(size), Color32::WHITE)
            .size()
            .x
    }

    fn line_height(&self, size: f32) -> f32 {
        self.layout_no_wrap("Ag".to_string(), FontId::proportional(size), Color32::WHITE)
            .size()
            .y
    }
}

/// Draws into the egui panel covering the window.
pub struct EguiCanvas<'a> {
    painter: &'a egui::Painter,
    images: &'a ImageCache,
    area: egui::Rect,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(painter: &'a egui::Painter, images: &'a ImageCache, area: egui::Rect) -> Self {
        Self {
            painter,
            images,
            area,
        }
    }

    fn pos(&self, p: Point) -> Pos2 {
        self.area.min + egui::vec2(p.x as f32, p.y as f32)
    }

    fn rect(&self, r: Rect) -> egui::Rect {
        egui::Rect::from_min_size(
            self.pos(r.top_left()),
            egui::vec2(r.width as f32, r.height as f32),
        )
    }
}

impl TextMeasure for EguiCanvas<'_> {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        self.painter.text_width(text, size)
    }

    fn line_height(&self, size: f32) -> f32 {
        self.painter.line_height(size)
    }
}

impl Canvas for EguiCanvas<'_> {
    fn clear(&mut self, color: Color32) {
        self.painter.rect_filled(self.area, 0.0, color);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.painter.rect_filled(self.rect(rect), 0.0, color);
    }

    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color32) {
        self.painter.rect_stroke(
            self.rect(rect),
            0.0,
            Stroke::new(width, color),
            StrokeKind::Inside,
        );
    }

    fn circle(&mut self, center: Point, radius: f32, width: f32, color: Color32) {
        let center = self.pos(center);
        if width > 0.0 {
            self.painter
                .circle_stroke(center, radius, Stroke::new(width, color));
        } else {
            self.painter.circle_filled(center, radius, color);
        }
    }

    fn polyline(&mut self, points: &[Point], width: f32, color: Color32) {
        let points: Vec<Pos2> = points.iter().map(|&p| self.pos(p)).collect();
        self.painter
            .add(egui::Shape::line(points, Stroke::new(width, color)));
    }

    fn image(&mut self, page: usize, origin: Position, size: Size, alpha: u8) {
        let Some(texture) = self.images.get_or_load(self.painter.ctx(), page) else {
            return;
        };
        let rect = egui::Rect::from_min_size(
            self.area.min + egui::vec2(origin.x, origin.y),
            egui::vec2(size.width as f32, size.height as f32),
        );
        let tint = Color32::from_rgba_unmultiplied(255, 255, 255, alpha);
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        self.painter.image(texture.id(), rect, uv, tint);
    }

    fn text(&mut self, pos: Point, text: &str, size: f32, color: Color32) {
        self.painter.text(
            self.pos(pos),
            Align2::LEFT_TOP,
            text,
            FontId::proportional(size),
            color,
        );
    }

    fn present(&mut self) {
        // egui shows the frame once `update` returns
    }
}
