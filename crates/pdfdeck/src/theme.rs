use eframe::egui::Color32;

/// Font size of text typed into annotation boxes.
pub const ANNOTATION_TEXT_SIZE: f32 = 18.0;

#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color32,
    pub foreground: Color32,
    /// Overlay that darkens everything outside the spotlight or highlights.
    pub dim: Color32,
    pub help_background: Color32,
    pub popup_background: Color32,
    pub annotation: Color32,
    pub pen: Color32,
    /// Opacity of overview thumbnails other than the focused one.
    pub unfocused_alpha: u8,
    pub body_size: f32,
    pub line_spacing: f32,
    pub box_stroke: f32,
    pub pen_stroke: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color32::BLACK,
            foreground: Color32::WHITE,
            dim: Color32::from_rgba_unmultiplied(0, 0, 0, 150),
            help_background: Color32::from_rgb(75, 75, 75),
            popup_background: Color32::from_rgba_unmultiplied(0, 0, 0, 200),
            annotation: Color32::from_rgb(0, 0, 255),
            pen: Color32::from_rgb(255, 0, 0),
            unfocused_alpha: 100,
            body_size: 24.0,
            line_spacing: 40.0,
            box_stroke: 2.0,
            pen_stroke: 2.0,
        }
    }
}
