pub mod canvas;
pub mod image_cache;
pub mod transition;

use std::time::Instant;

use eframe::egui::Color32;

use crate::annotations::wrap_words;
use crate::geometry::{Point, Position, Rect, Size, centered, dim_regions, fit_to_window, zoom_view};
use crate::session::{Mode, PresentationState, Session, Tool};
use crate::theme::{ANNOTATION_TEXT_SIZE, Theme};

use transition::{Frame, Rest};

pub const HELP_LINES: &[&str] = &[
    "Help Menu:",
    "RIGHT ARROW / PAGE DOWN: Next slide",
    "LEFT ARROW / PAGE UP: Previous slide",
    "UP ARROW: Scroll up (for partial slides)",
    "DOWN ARROW: Scroll down (for partial slides)",
    "Mouse wheel: Next / previous slide, or scroll partial slides",
    "S: Toggle spotlight mode",
    "R: Toggle highlight mode",
    "+ / =: Increase spotlight radius",
    "-: Decrease spotlight radius",
    ".: Toggle black screen",
    "F: Toggle fullscreen",
    "TAB: Toggle overview mode",
    "RETURN: Select slide in overview mode",
    "H: Toggle help menu",
    "Ctrl + Mouse Wheel: Zoom in/out",
    "T: Add text annotation",
    "P: Toggle pen mode for freehand drawing",
    "RETURN: Stop entering text in text annotation box",
    "Ctrl + S: Save annotations",
];

pub const END_MESSAGE: &str = "You have reached the end of the presentation";
pub const INTRO_MESSAGE: &str = "Press 'H' for help";

pub trait TextMeasure {
    fn text_width(&self, text: &str, size: f32) -> f32;
    fn line_height(&self, size: f32) -> f32;
}

/// Drawing surface. Coordinates are window pixels.
pub trait Canvas: TextMeasure {
    fn clear(&mut self, color: Color32);
    fn fill_rect(&mut self, rect: Rect, color: Color32);
    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color32);
    /// Circle outline of `width` centered on `radius`; a zero width fills the disc.
    fn circle(&mut self, center: Point, radius: f32, width: f32, color: Color32);
    fn polyline(&mut self, points: &[Point], width: f32, color: Color32);
    /// Draw page `page` scaled to `size` with its top-left at `origin`.
    fn image(&mut self, page: usize, origin: Position, size: Size, alpha: u8);
    /// Text with its top-left corner at `pos`.
    fn text(&mut self, pos: Point, text: &str, size: f32, color: Color32);
    /// Show what was drawn since the last clear. Only the blocking player calls this.
    #[cfg_attr(not(test), allow(dead_code))]
    fn present(&mut self);
}

/// A page together with the size it is drawn at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideRef {
    pub page: usize,
    pub size: Size,
}

pub fn draw_frame<C: Canvas + ?Sized>(canvas: &mut C, frame: &Frame, prev: SlideRef, next: SlideRef) {
    canvas.clear(Color32::BLACK);
    if let Some(p) = frame.prev {
        canvas.image(prev.page, p.position, prev.size, p.alpha);
    }
    canvas.image(next.page, frame.next.position, next.size, frame.next.alpha);
}

pub fn draw_rest<C: Canvas + ?Sized>(
    canvas: &mut C,
    rest: Rest,
    window: Size,
    prev: SlideRef,
    next: SlideRef,
) {
    canvas.clear(Color32::BLACK);
    match rest {
        Rest::Centered => {
            canvas.image(next.page, next.size.centered_in(window).into(), next.size, 255);
        }
        Rest::Partial {
            prev_slide_position,
            next_slide_position,
        } => {
            let px = centered(prev.size.width, window.width) as f32;
            let nx = centered(next.size.width, window.width) as f32;
            canvas.image(prev.page, Position::new(px, prev_slide_position), prev.size, 255);
            canvas.image(next.page, Position::new(nx, next_slide_position), next.size, 255);
        }
    }
}

/// Draw one frame of the presentation.
pub fn draw_session<C: Canvas + ?Sized>(canvas: &mut C, session: &Session, theme: &Theme, now: Instant) {
    let state = session.state();
    let window = state.window;

    if state.flags.black_screen {
        canvas.clear(Color32::BLACK);
        return;
    }

    if let Some(run) = session.active_run() {
        let prev = SlideRef {
            page: run.from,
            size: session.fitted(run.from),
        };
        let next = SlideRef {
            page: run.to,
            size: session.fitted(run.to),
        };
        let frame = run.frame_at(now, window, prev.size, next.size);
        draw_frame(canvas, &frame, prev, next);
        return;
    }

    match state.mode {
        Mode::Help { .. } => draw_help(canvas, theme),
        Mode::Overview => draw_overview(canvas, session, theme),
        Mode::Ended => draw_centered_text(canvas, window, END_MESSAGE, theme),
        Mode::Normal => {
            draw_page(canvas, session);
            draw_focus_overlay(canvas, state, theme);
            if !state.flags.is_zoomed() {
                draw_annotations(canvas, session, theme);
            }
        }
    }

    if session.intro_visible(now) {
        draw_intro(canvas, window, theme);
    }
}

fn draw_page<C: Canvas + ?Sized>(canvas: &mut C, session: &Session) {
    let state = session.state();
    let window = state.window;
    let page = state.current_page;

    if let Some(layout) = session.partial_layout() {
        let rest = Rest::Partial {
            prev_slide_position: layout.prev_slide_position,
            next_slide_position: layout.next_slide_position,
        };
        let prev = SlideRef {
            page: layout.upper,
            size: session.fitted(layout.upper),
        };
        let next = SlideRef {
            page,
            size: session.fitted(page),
        };
        draw_rest(canvas, rest, window, prev, next);
        return;
    }

    canvas.clear(Color32::BLACK);
    let size = session.fitted(page);
    if state.flags.is_zoomed() {
        let view = zoom_view(size, window, state.flags.zoom_level, state.zoom_pos);
        canvas.image(page, view.origin.into(), view.scaled, 255);
    } else {
        canvas.image(page, size.centered_in(window).into(), size, 255);
    }
}

/// Spotlight or highlight dimming.
fn draw_focus_overlay<C: Canvas + ?Sized>(canvas: &mut C, state: &PresentationState, theme: &Theme) {
    let window = state.window;
    if state.flags.spotlight {
        // A ring wide enough to cover the whole window outside the spotlight
        let width = (window.width + window.height) as f32 * 2.0;
        let radius = state.spotlight_radius as f32 + width / 2.0;
        canvas.circle(state.spotlight_pos, radius, width, theme.dim);
    } else if state.flags.highlight {
        let mut holes = state.highlights.clone();
        holes.extend(state.highlight_preview);
        for r in dim_regions(window, &holes) {
            canvas.fill_rect(r, theme.dim);
        }
    }
}

fn draw_annotations<C: Canvas + ?Sized>(canvas: &mut C, session: &Session, theme: &Theme) {
    let state = session.state();
    let page = state.current_page;
    let store = session.annotations();

    for a in store.texts(page) {
        draw_text_box(canvas, a.rect, &a.text, theme);
    }
    for stroke in store.strokes(page) {
        canvas.polyline(&stroke.points, theme.pen_stroke, theme.pen);
    }

    match &state.tool {
        Tool::DrawingBox { rect: Some(rect), .. } => {
            canvas.stroke_rect(*rect, theme.box_stroke, theme.annotation);
        }
        Tool::EnteringText { rect, text } => {
            canvas.stroke_rect(*rect, theme.box_stroke, theme.annotation);
            draw_text_box(canvas, *rect, text, theme);
        }
        Tool::Dragging { rect, text } => draw_text_box(canvas, *rect, text, theme),
        Tool::Pen { points } if points.len() > 1 => {
            canvas.polyline(points, theme.pen_stroke, theme.pen);
        }
        _ => {}
    }
}

/// Wrapped text inside `rect`. The first line is always drawn; later lines stop at the
/// bottom edge.
fn draw_text_box<C: Canvas + ?Sized>(canvas: &mut C, rect: Rect, text: &str, theme: &Theme) {
    let line_height = canvas.line_height(ANNOTATION_TEXT_SIZE);
    let lines = wrap_words(text, rect.width as f32, |s| {
        canvas.text_width(s, ANNOTATION_TEXT_SIZE)
    });
    let mut y = rect.top as f32;
    for line in &lines {
        canvas.text(
            Point::new(rect.left, y as i32),
            line,
            ANNOTATION_TEXT_SIZE,
            theme.annotation,
        );
        y += line_height;
        if y + line_height > rect.bottom() as f32 {
            break;
        }
    }
}

fn draw_help<C: Canvas + ?Sized>(canvas: &mut C, theme: &Theme) {
    canvas.clear(theme.help_background);
    let mut y = 50.0;
    for line in HELP_LINES {
        canvas.text(Point::new(50, y as i32), line, theme.body_size, theme.foreground);
        y += theme.line_spacing;
    }
}

fn draw_overview<C: Canvas + ?Sized>(canvas: &mut C, session: &Session, theme: &Theme) {
    canvas.clear(theme.background);
    let grid = session.overview_grid();
    let focused = session.state().focused_page;
    for page in 0..session.page_count() {
        let cell = grid.cell_rect(page);
        let size = fit_to_window(session.fitted(page), cell.size());
        let offset = size.centered_in(cell.size());
        let origin = Position::new((cell.left + offset.x) as f32, (cell.top + offset.y) as f32);
        let alpha = if page == focused { 255 } else { theme.unfocused_alpha };
        canvas.image(page, origin, size, alpha);
    }
}

fn draw_centered_text<C: Canvas + ?Sized>(canvas: &mut C, window: Size, text: &str, theme: &Theme) {
    canvas.clear(theme.background);
    let width = canvas.text_width(text, theme.body_size);
    let height = canvas.line_height(theme.body_size);
    let pos = Point::new(
        ((window.width as f32 - width) / 2.0) as i32,
        ((window.height as f32 - height) / 2.0) as i32,
    );
    canvas.text(pos, text, theme.body_size, theme.foreground);
}

fn draw_intro<C: Canvas + ?Sized>(canvas: &mut C, window: Size, theme: &Theme) {
    let popup = Size::new((window.width as f32 * 0.8) as i32, 100);
    let rect = Rect::from_origin(popup.centered_in(window), popup);
    canvas.fill_rect(rect, theme.popup_background);

    let width = canvas.text_width(INTRO_MESSAGE, theme.body_size);
    let height = canvas.line_height(theme.body_size);
    let pos = Point::new(
        rect.left + ((rect.width as f32 - width) / 2.0) as i32,
        rect.top + ((rect.height as f32 - height) / 2.0) as i32,
    );
    canvas.text(pos, INTRO_MESSAGE, theme.body_size, theme.foreground);
}
