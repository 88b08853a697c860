//! Presentation state and input dispatch.
//!
//! A [`Session`] owns everything that changes while presenting: the current page and mode,
//! the overlay flags, the annotation store and the transition in flight. Input is applied
//! through [`Session::handle`], one event at a time, in this order of precedence:
//!
//! 1. once the end screen is shown only a backward key is honoured, mouse input is dropped
//! 2. while a text box is being typed into, every key edits the text
//! 3. `H` toggles help; while help is open nothing else happens
//! 4. everything else (navigation, overview, zoom, overlays, annotation tools)
//!
//! Events arriving while a transition is running are dropped.

pub mod input;
pub mod scroll;

use anyhow::Result;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::annotations::{AnnotationStore, PenStroke, TextAnnotation, fitted_height};
use crate::config::TransitionsConfig;
use crate::geometry::{GridLayout, Letterbox, Point, Rect, Size, fit_to_window};
use crate::render::TextMeasure;
use crate::render::transition::{self, ReversalStrategy, Rest, TransitionRun};
use crate::theme::ANNOTATION_TEXT_SIZE;

use input::{InputEvent, Key, MouseButton};
use scroll::{PartialLayout, ScrollState};

/// How long the "press H" hint stays up after start.
pub const INTRO_POPUP: Duration = Duration::from_secs(3);
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 4.0;
pub const ZOOM_STEP: f32 = 1.25;
pub const MIN_SPOTLIGHT_RADIUS: i32 = 10;
pub const SPOTLIGHT_STEP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Overview,
    /// Help screen, remembering whether it was opened over the overview.
    Help { over_overview: bool },
    /// Past the last page.
    Ended,
}

/// Overlays that combine freely with any mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flags {
    pub zoom_level: f32,
    pub spotlight: bool,
    pub highlight: bool,
    pub black_screen: bool,
    pub fullscreen: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            zoom_level: MIN_ZOOM,
            spotlight: false,
            highlight: false,
            black_screen: false,
            fullscreen: false,
        }
    }
}

impl Flags {
    pub fn is_zoomed(&self) -> bool {
        self.zoom_level > MIN_ZOOM
    }
}

/// Annotation interaction in progress. Only one can be active.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Tool {
    #[default]
    Idle,
    /// Armed by `T`; the box is sized by moving from `start`.
    DrawingBox {
        start: Option<Point>,
        rect: Option<Rect>,
    },
    EnteringText {
        rect: Rect,
        text: String,
    },
    /// A text box picked up with the mouse.
    Dragging {
        rect: Rect,
        text: String,
    },
    Pen {
        points: Vec<Point>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresentationState {
    pub current_page: usize,
    pub mode: Mode,
    pub flags: Flags,
    /// Overview cursor.
    pub focused_page: usize,
    pub zoom_pos: Point,
    pub spotlight_radius: i32,
    pub spotlight_pos: Point,
    pub scroll: ScrollState,
    pub tool: Tool,
    pub highlights: Vec<Rect>,
    pub highlight_start: Option<Point>,
    /// Highlight being dragged out.
    pub highlight_preview: Option<Rect>,
    pub mouse: Point,
    pub window: Size,
}

/// Something only the window system can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    SetFullscreen(bool),
}

pub struct Session {
    state: PresentationState,
    /// Page image sizes as loaded.
    pages: Vec<Size>,
    /// Page sizes fitted to the current window.
    fitted: Vec<Size>,
    /// Window size annotations are saved relative to.
    home_window: Size,
    transitions: TransitionsConfig,
    annotations: AnnotationStore,
    annotations_path: Option<PathBuf>,
    run: Option<TransitionRun>,
    partial: Option<PartialLayout>,
    intro_until: Option<Instant>,
    /// Drop the text event of the key that opened a text box.
    swallow_text: bool,
}

impl Session {
    pub fn new(
        pages: Vec<Size>,
        window: Size,
        transitions: TransitionsConfig,
        annotations: AnnotationStore,
        spotlight_radius: i32,
        now: Instant,
    ) -> Self {
        assert!(!pages.is_empty(), "a deck needs at least one page");
        let fitted = pages.iter().map(|&p| fit_to_window(p, window)).collect();
        Self {
            state: PresentationState {
                current_page: 0,
                mode: Mode::Normal,
                flags: Flags::default(),
                focused_page: 0,
                zoom_pos: Point::default(),
                spotlight_radius: spotlight_radius.clamp(MIN_SPOTLIGHT_RADIUS, window.height.max(MIN_SPOTLIGHT_RADIUS)),
                spotlight_pos: window.center(),
                scroll: ScrollState::default(),
                tool: Tool::Idle,
                highlights: Vec::new(),
                highlight_start: None,
                highlight_preview: None,
                mouse: Point::default(),
                window,
            },
            pages,
            fitted,
            home_window: window,
            transitions,
            annotations,
            annotations_path: None,
            run: None,
            partial: None,
            intro_until: Some(now + INTRO_POPUP),
            swallow_text: false,
        }
    }

    pub fn with_annotations_path(mut self, path: PathBuf) -> Self {
        self.annotations_path = Some(path);
        self
    }

    /// Mark the window as opened fullscreen, so that `F` leaves fullscreen first.
    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.state.flags.fullscreen = fullscreen;
        self
    }

    /// Show `page` without a transition. Out-of-range pages go to the last one.
    pub fn jump_to(&mut self, page: usize) {
        let page = page.min(self.page_count() - 1);
        self.state.current_page = page;
        self.state.focused_page = page;
        self.partial = None;
    }

    pub fn open_overview(&mut self) {
        self.state.focused_page = self.state.current_page;
        self.state.mode = Mode::Overview;
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Size of `page` fitted to the window.
    pub fn fitted(&self, page: usize) -> Size {
        assert!(page < self.fitted.len(), "page {page} out of range");
        self.fitted[page]
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn transitions(&self) -> &TransitionsConfig {
        &self.transitions
    }

    pub fn active_run(&self) -> Option<&TransitionRun> {
        self.run.as_ref()
    }

    /// Stacked layout of the current page, if it was reached by a partial slide.
    pub fn partial_layout(&self) -> Option<&PartialLayout> {
        self.partial
            .as_ref()
            .filter(|l| l.lower == self.state.current_page && self.state.mode == Mode::Normal)
    }

    pub fn intro_visible(&self, now: Instant) -> bool {
        self.intro_until.is_some_and(|until| now < until)
    }

    pub fn overview_grid(&self) -> GridLayout {
        GridLayout::new(self.page_count(), self.state.window)
    }

    /// Whether the next frame should follow shortly even without input.
    pub fn needs_repaint(&self, now: Instant) -> bool {
        self.run.is_some() || self.state.scroll.active || self.intro_visible(now)
    }

    /// Advance time: finish an elapsed transition and apply held-key scrolling.
    pub fn tick(&mut self, now: Instant) {
        if self.run.as_ref().is_some_and(|run| run.is_complete(now)) {
            self.finish_run();
        }
        if self.run.is_none() {
            if let Some(direction) = self.state.scroll.poll(now) {
                self.scroll_partial(direction);
            }
        }
    }

    fn finish_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        let window = self.state.window;
        self.partial = match run.rest(window, self.fitted[run.from]) {
            Rest::Partial { .. } => Some(PartialLayout::resting(
                run.from,
                run.to,
                window.height,
                self.fitted[run.from].height,
            )),
            Rest::Centered => None,
        };
        log::trace!("Transition to slide {} finished", run.to + 1);
    }

    pub fn handle(
        &mut self,
        event: InputEvent,
        now: Instant,
        measure: &dyn TextMeasure,
    ) -> Option<Request> {
        if self.run.is_some() {
            return None;
        }
        let swallow_text = std::mem::take(&mut self.swallow_text);
        match event {
            InputEvent::KeyDown { key, ctrl, text } => {
                return self.on_key_down(key, ctrl, text, now, measure);
            }
            InputEvent::KeyUp { key } => {
                if matches!(key, Key::Up | Key::Down) {
                    self.state.scroll.release();
                }
            }
            InputEvent::Text(text) => {
                if swallow_text {
                    return None;
                }
                if let Tool::EnteringText { .. } = self.state.tool {
                    self.type_text(&text, measure);
                }
            }
            mouse => self.on_mouse(mouse, now),
        }
        None
    }

    fn on_key_down(
        &mut self,
        key: Key,
        ctrl: bool,
        text: Option<String>,
        now: Instant,
        measure: &dyn TextMeasure,
    ) -> Option<Request> {
        if self.state.mode == Mode::Ended && !key.is_back() {
            return None;
        }

        if let Tool::EnteringText { rect, text: current } = &mut self.state.tool {
            match key {
                Key::Enter => {
                    let annotation = TextAnnotation {
                        rect: *rect,
                        text: std::mem::take(current),
                    };
                    self.annotations
                        .add_text(self.state.current_page, annotation);
                    self.state.tool = Tool::Idle;
                }
                Key::Backspace => {
                    current.pop();
                    self.fit_text_box(measure);
                }
                _ => {
                    if let Some(text) = text {
                        self.type_text(&text, measure);
                    }
                }
            }
            return None;
        }

        if key == Key::H {
            self.state.mode = match self.state.mode {
                Mode::Help { over_overview: true } => Mode::Overview,
                Mode::Help { .. } => Mode::Normal,
                Mode::Overview => Mode::Help { over_overview: true },
                _ => Mode::Help { over_overview: false },
            };
            self.intro_until = None;
            self.stop_pen();
            return None;
        }
        if matches!(self.state.mode, Mode::Help { .. }) {
            return None;
        }

        match key {
            k if k.is_forward() => {
                self.state.flags.black_screen = false;
                self.forward(now);
            }
            k if k.is_back() => {
                self.state.flags.black_screen = false;
                self.backward(now);
            }
            Key::F => {
                self.state.flags.fullscreen = !self.state.flags.fullscreen;
                return Some(Request::SetFullscreen(self.state.flags.fullscreen));
            }
            Key::Tab => match self.state.mode {
                Mode::Overview => self.state.mode = Mode::Normal,
                Mode::Normal => self.open_overview(),
                _ => {}
            },
            Key::Enter if self.state.mode == Mode::Overview => {
                self.select_page(self.state.focused_page);
            }
            Key::Up => self.press_scroll(-1),
            Key::Down => self.press_scroll(1),
            Key::S if ctrl => {
                if let Err(e) = self.save_annotations() {
                    log::error!("Could not save annotations: {e:#}");
                }
            }
            Key::S => {
                self.state.flags.spotlight = !self.state.flags.spotlight;
                if self.state.flags.spotlight {
                    self.state.flags.highlight = false;
                }
            }
            Key::R => {
                if self.state.flags.highlight {
                    self.state.highlights.clear();
                }
                self.state.flags.spotlight = false;
                self.state.flags.highlight = !self.state.flags.highlight;
                self.state.highlight_start = None;
                self.state.highlight_preview = None;
            }
            Key::Plus | Key::Equals => {
                if self.state.flags.spotlight {
                    self.state.spotlight_radius = (self.state.spotlight_radius + SPOTLIGHT_STEP)
                        .min(self.state.window.height);
                }
            }
            Key::Minus => {
                if self.state.flags.spotlight {
                    self.state.spotlight_radius = (self.state.spotlight_radius - SPOTLIGHT_STEP)
                        .max(MIN_SPOTLIGHT_RADIUS);
                }
            }
            Key::Period => self.state.flags.black_screen = !self.state.flags.black_screen,
            Key::T => self.arm_text_box(),
            Key::P => self.toggle_pen(),
            _ => {}
        }
        None
    }

    fn on_mouse(&mut self, event: InputEvent, now: Instant) {
        if matches!(self.state.mode, Mode::Ended | Mode::Help { .. }) {
            return;
        }
        match event {
            InputEvent::MouseDown {
                button: MouseButton::Left,
                pos,
            } => self.left_down(pos, now),
            InputEvent::MouseDown {
                button: MouseButton::Right,
                ..
            } => {
                if self.state.mode != Mode::Overview {
                    self.state.flags.black_screen = false;
                    self.backward(now);
                }
            }
            InputEvent::MouseUp {
                button: MouseButton::Left,
                pos,
            } => self.left_up(pos),
            InputEvent::MouseMove { pos, left_down } => self.mouse_moved(pos, left_down),
            InputEvent::Wheel { up, ctrl, pos } => self.wheel(up, ctrl, pos, now),
            _ => {}
        }
    }

    fn left_down(&mut self, pos: Point, now: Instant) {
        self.state.flags.black_screen = false;
        if let Tool::EnteringText { .. } = self.state.tool {
            return;
        }
        if self.state.mode == Mode::Overview {
            if let Some(page) = self.overview_grid().hit(pos) {
                self.select_page(page);
            }
            return;
        }
        if self.state.flags.highlight {
            self.state.highlight_start = Some(pos);
            return;
        }
        if let Tool::Idle = self.state.tool {
            match self.annotations.take_text_at(self.state.current_page, pos) {
                Some(picked) => {
                    self.state.tool = Tool::Dragging {
                        rect: picked.rect,
                        text: picked.text,
                    };
                }
                None => self.forward(now),
            }
            return;
        }
        match &mut self.state.tool {
            Tool::DrawingBox { start, rect } => {
                *start = Some(pos);
                *rect = None;
            }
            Tool::Pen { points } => points.push(pos),
            _ => {}
        }
    }

    fn left_up(&mut self, pos: Point) {
        let page = self.state.current_page;
        match std::mem::take(&mut self.state.tool) {
            Tool::DrawingBox { rect: Some(rect), .. } => {
                self.state.tool = Tool::EnteringText {
                    rect,
                    text: String::new(),
                };
            }
            Tool::DrawingBox { rect: None, .. } => {}
            Tool::Dragging { rect, text } => {
                self.annotations.add_text(page, TextAnnotation { rect, text });
            }
            Tool::Pen { points } => {
                self.annotations.add_stroke(page, PenStroke { points });
                self.state.tool = Tool::Pen { points: Vec::new() };
            }
            other => self.state.tool = other,
        }
        if self.state.flags.highlight {
            if let Some(start) = self.state.highlight_start.take() {
                self.state.highlights.push(Rect::from_corners(start, pos));
                self.state.highlight_preview = None;
            }
        }
    }

    fn mouse_moved(&mut self, pos: Point, left_down: bool) {
        self.state.mouse = pos;
        if self.state.mode == Mode::Overview {
            if let Some(page) = self.overview_grid().hit(pos) {
                self.state.focused_page = page;
            }
        }
        self.state.spotlight_pos = pos;
        if self.state.flags.highlight {
            if let Some(start) = self.state.highlight_start {
                self.state.highlight_preview = Some(Rect::from_corners(start, pos));
            }
        }
        if self.state.flags.is_zoomed() {
            self.state.zoom_pos = pos;
        }
        match &mut self.state.tool {
            Tool::DrawingBox {
                start: Some(start),
                rect,
            } => *rect = Some(Rect::anchored(*start, pos)),
            Tool::Dragging { rect, .. } => {
                rect.left = pos.x;
                rect.top = pos.y;
            }
            Tool::Pen { points } if left_down => points.push(pos),
            _ => {}
        }
    }

    fn wheel(&mut self, up: bool, ctrl: bool, pos: Point, now: Instant) {
        if ctrl {
            self.stop_pen();
            let zoom = &mut self.state.flags.zoom_level;
            *zoom = if up {
                (*zoom * ZOOM_STEP).min(MAX_ZOOM)
            } else {
                (*zoom / ZOOM_STEP).max(MIN_ZOOM)
            };
            self.state.zoom_pos = pos;
            return;
        }
        if self.state.mode == Mode::Overview {
            return;
        }
        if self.partial_layout().is_some() {
            self.scroll_partial(if up { -1 } else { 1 });
        } else {
            self.state.flags.black_screen = false;
            if up {
                self.backward(now);
            } else {
                self.forward(now);
            }
        }
    }

    fn forward(&mut self, now: Instant) {
        let count = self.page_count();
        if self.state.mode == Mode::Overview {
            self.state.focused_page = (self.state.focused_page + 1) % count;
            return;
        }
        let from = self.state.current_page;
        self.state.flags.zoom_level = MIN_ZOOM;
        self.clear_highlights();
        if from + 1 >= count {
            log::debug!("End of presentation after slide {}", from + 1);
            self.state.mode = Mode::Ended;
            self.partial = None;
            self.state.scroll.release();
            return;
        }
        self.state.current_page = from + 1;
        self.start_run(from, from + 1, false, now);
    }

    fn backward(&mut self, now: Instant) {
        let count = self.page_count();
        if self.state.mode == Mode::Overview {
            self.state.focused_page = (self.state.focused_page + count - 1) % count;
            return;
        }
        self.state.flags.zoom_level = MIN_ZOOM;
        self.clear_highlights();
        let (from, to) = if self.state.mode == Mode::Ended {
            self.state.mode = Mode::Normal;
            (count - 1, count - 1)
        } else if self.state.current_page == 0 {
            return;
        } else {
            (self.state.current_page, self.state.current_page - 1)
        };
        self.state.current_page = to;

        let spec = self.transitions.spec_for(to);
        match spec.reversal {
            ReversalStrategy::Invert => self.start_run(from, to, true, now),
            ReversalStrategy::KeepOriginal => {
                // Lay the page out the way arriving at it forward would have
                self.state.scroll.release();
                self.partial = match to.checked_sub(1) {
                    Some(upper) => match transition::rest_layout(
                        spec.kind,
                        self.state.window,
                        self.fitted[upper],
                    ) {
                        Rest::Partial { .. } => Some(PartialLayout::resting(
                            upper,
                            to,
                            self.state.window.height,
                            self.fitted[upper].height,
                        )),
                        Rest::Centered => None,
                    },
                    None => None,
                };
                log::debug!("Slide {} -> {}: shown as arrived", from + 1, to + 1);
            }
            ReversalStrategy::None => {
                self.state.scroll.release();
                self.partial = None;
                log::debug!("Slide {} -> {}: no animation", from + 1, to + 1);
            }
        }
    }

    fn start_run(&mut self, from: usize, to: usize, reverse: bool, now: Instant) {
        let spec = self.transitions.spec_for(to);
        let (kind, duration, reverse) =
            transition::effective(&spec, &self.transitions.general, reverse);
        log::debug!(
            "Slide {} -> {}: {} over {:?}{}",
            from + 1,
            to + 1,
            kind.name(),
            duration,
            if reverse { ", reversed" } else { "" }
        );
        self.partial = None;
        self.state.scroll.release();
        self.run = Some(TransitionRun::new(from, to, kind, duration, reverse, now));
    }

    fn select_page(&mut self, page: usize) {
        self.state.current_page = page;
        self.state.focused_page = page;
        self.state.mode = Mode::Normal;
    }

    fn clear_highlights(&mut self) {
        self.state.highlights.clear();
        self.state.highlight_start = None;
        self.state.highlight_preview = None;
    }

    fn press_scroll(&mut self, direction: i8) {
        if self.partial_layout().is_some() {
            self.state.scroll.press(direction);
        }
    }

    fn scroll_partial(&mut self, direction: i8) {
        let current = self.state.current_page;
        let height = self.state.window.height;
        if let Some(layout) = self.partial.as_mut().filter(|l| l.lower == current) {
            let lower_height = self.fitted[layout.lower].height;
            let moved = layout.step(
                direction,
                height,
                self.fitted[layout.upper].height,
                lower_height,
            );
            if moved && layout.is_closed(height, lower_height) {
                log::debug!("Slide {} scrolled fully into view", current + 1);
            }
        }
    }

    fn arm_text_box(&mut self) {
        self.stop_pen();
        if self.state.mode == Mode::Overview || self.state.flags.is_zoomed() {
            return;
        }
        if let Tool::Dragging { .. } = self.state.tool {
            return;
        }
        let at = self.state.mouse;
        self.state.tool = match self.annotations.take_text_at(self.state.current_page, at) {
            Some(picked) => {
                self.swallow_text = true;
                Tool::EnteringText {
                    rect: picked.rect,
                    text: picked.text,
                }
            }
            None => Tool::DrawingBox {
                start: Some(at),
                rect: None,
            },
        };
    }

    fn toggle_pen(&mut self) {
        if self.state.mode == Mode::Overview || self.state.flags.is_zoomed() {
            return;
        }
        match self.state.tool {
            Tool::Pen { .. } => self.stop_pen(),
            Tool::Dragging { .. } => {}
            _ => self.state.tool = Tool::Pen { points: Vec::new() },
        }
    }

    /// Leave pen mode, keeping a stroke still being drawn.
    fn stop_pen(&mut self) {
        if let Tool::Pen { points } = &mut self.state.tool {
            let points = std::mem::take(points);
            self.annotations
                .add_stroke(self.state.current_page, PenStroke { points });
            self.state.tool = Tool::Idle;
        }
    }

    fn type_text(&mut self, typed: &str, measure: &dyn TextMeasure) {
        if let Tool::EnteringText { text, .. } = &mut self.state.tool {
            text.extend(typed.chars().filter(|c| !c.is_control()));
        }
        self.fit_text_box(measure);
    }

    fn fit_text_box(&mut self, measure: &dyn TextMeasure) {
        if let Tool::EnteringText { rect, text } = &mut self.state.tool {
            rect.height = fitted_height(
                text,
                rect.width as f32,
                measure.line_height(ANNOTATION_TEXT_SIZE),
                |s| measure.text_width(s, ANNOTATION_TEXT_SIZE),
            );
        }
    }

    /// Adapt to a new window size, keeping annotations on the same spot of their page.
    pub fn resize(&mut self, window: Size) {
        let old = self.state.window;
        if window == old || window.is_empty() {
            return;
        }
        log::debug!(
            "Window {}x{} -> {}x{}",
            old.width,
            old.height,
            window.width,
            window.height
        );
        let boxes = letterboxes(&self.pages, old, window);
        self.annotations.rescale(&boxes);

        let (from, to) = boxes(self.state.current_page);
        let map = |p: Point| from.map_point(&to, p);
        match &mut self.state.tool {
            Tool::EnteringText { rect, .. } | Tool::Dragging { rect, .. } => {
                *rect = from.map_rect(&to, *rect);
            }
            Tool::DrawingBox { start, rect } => {
                *start = start.map(map);
                *rect = rect.map(|r| from.map_rect(&to, r));
            }
            Tool::Pen { points } => points.iter_mut().for_each(|p| *p = map(*p)),
            Tool::Idle => {}
        }
        for r in &mut self.state.highlights {
            *r = from.map_rect(&to, *r);
        }
        self.state.highlight_start = self.state.highlight_start.map(map);
        self.state.highlight_preview = None;

        self.state.window = window;
        self.fitted = self.pages.iter().map(|&p| fit_to_window(p, window)).collect();
        if let Some(layout) = &mut self.partial {
            *layout = PartialLayout::resting(
                layout.upper,
                layout.lower,
                window.height,
                self.fitted[layout.upper].height,
            );
        }
        self.state.spotlight_radius = self
            .state
            .spotlight_radius
            .min(window.height)
            .max(MIN_SPOTLIGHT_RADIUS);
    }

    /// Write the annotations, in coordinates of the window the session started with.
    pub fn save_annotations(&self) -> Result<PathBuf> {
        let path = self
            .annotations_path
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No annotations file for this presentation"))?;
        let store = if self.state.window == self.home_window {
            self.annotations.clone()
        } else {
            self.annotations
                .rescaled(letterboxes(&self.pages, self.state.window, self.home_window))
        };
        store.save(&path)?;
        Ok(path)
    }
}

/// For each page, how it is letterboxed in `from` and in `to`. Pages the deck does not
/// have are treated like its last page.
fn letterboxes(pages: &[Size], from: Size, to: Size) -> impl Fn(usize) -> (Letterbox, Letterbox) + '_ {
    move |page| {
        let image = pages
            .get(page)
            .or(pages.last())
            .copied()
            .unwrap_or_default();
        (
            Letterbox::new(from, fit_to_window(image, from)),
            Letterbox::new(to, fit_to_window(image, to)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::transition::{TransitionKind, TransitionSpec};

    struct Mono;

    impl TextMeasure for Mono {
        fn text_width(&self, text: &str, _size: f32) -> f32 {
            text.chars().count() as f32 * 10.0
        }

        fn line_height(&self, _size: f32) -> f32 {
            20.0
        }
    }

    const WINDOW: Size = Size::new(794, 1123);

    struct Harness {
        session: Session,
        now: Instant,
    }

    impl Harness {
        fn new(pages: usize, transitions: TransitionsConfig) -> Self {
            let now = Instant::now();
            let session = Session::new(
                vec![WINDOW; pages],
                WINDOW,
                transitions,
                AnnotationStore::default(),
                100,
                now,
            );
            Self { session, now }
        }

        fn send(&mut self, event: InputEvent) -> Option<Request> {
            self.session.handle(event, self.now, &Mono)
        }

        fn key(&mut self, key: Key) -> Option<Request> {
            self.send(InputEvent::key(key))
        }

        fn typed(&mut self, text: &str) {
            self.send(InputEvent::KeyDown {
                key: Key::Other,
                ctrl: false,
                text: Some(text.to_string()),
            });
        }

        fn click(&mut self, x: i32, y: i32) {
            let pos = Point::new(x, y);
            self.send(InputEvent::MouseDown {
                button: MouseButton::Left,
                pos,
            });
            self.send(InputEvent::MouseUp {
                button: MouseButton::Left,
                pos,
            });
        }

        fn drag(&mut self, from: (i32, i32), to: (i32, i32)) {
            let (a, b) = (Point::new(from.0, from.1), Point::new(to.0, to.1));
            self.send(InputEvent::MouseMove {
                pos: a,
                left_down: false,
            });
            self.send(InputEvent::MouseDown {
                button: MouseButton::Left,
                pos: a,
            });
            let mid = Point::new((a.x + b.x) / 2, (a.y + b.y) / 2);
            self.send(InputEvent::MouseMove {
                pos: mid,
                left_down: true,
            });
            self.send(InputEvent::MouseMove {
                pos: b,
                left_down: true,
            });
            self.send(InputEvent::MouseUp {
                button: MouseButton::Left,
                pos: b,
            });
        }

        /// Let any running transition finish.
        fn settle(&mut self) {
            self.now += Duration::from_secs(5);
            self.session.tick(self.now);
        }

        fn page(&self) -> usize {
            self.session.state().current_page
        }

        fn mode(&self) -> Mode {
            self.session.state().mode
        }
    }

    fn config(json: &str) -> TransitionsConfig {
        TransitionsConfig::from_json(json).unwrap()
    }

    #[test]
    fn test_next_twice_prev_twice() {
        let mut h = Harness::new(
            3,
            config(r#"{"General": {"transition": "fade_in", "transition-duration": "1s", "reversal-strategy": "invert-transition"}}"#),
        );
        h.key(Key::Right);
        h.settle();
        h.key(Key::Right);
        h.settle();
        assert_eq!(h.page(), 2);

        h.key(Key::Left);
        h.settle();
        h.key(Key::Left);
        let run = h.session.active_run().cloned().unwrap();
        assert_eq!((run.from, run.to), (1, 0));
        assert_eq!(run.kind, TransitionKind::FadeIn);
        assert!(run.reverse);
        h.settle();
        assert_eq!(h.page(), 0);
        assert!(h.session.active_run().is_none());
    }

    #[test]
    fn test_backward_from_first_page_is_noop() {
        let mut h = Harness::new(3, TransitionsConfig::default());
        h.key(Key::Left);
        assert_eq!(h.page(), 0);
        assert!(h.session.active_run().is_none());
        h.key(Key::PageUp);
        assert_eq!(h.page(), 0);
    }

    #[test]
    fn test_forward_past_last_page_ends() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.key(Key::Right);
        h.settle();
        h.key(Key::Right);
        assert_eq!(h.mode(), Mode::Ended);
        assert_eq!(h.page(), 1);
        assert!(h.session.active_run().is_none());

        // Only a backward key leaves the end screen
        h.key(Key::Right);
        h.key(Key::Tab);
        h.click(10, 10);
        assert_eq!(h.mode(), Mode::Ended);

        h.key(Key::Left);
        assert_eq!(h.mode(), Mode::Normal);
        assert_eq!(h.page(), 1);
        let run = h.session.active_run().cloned().unwrap();
        assert_eq!((run.from, run.to, run.reverse), (1, 1, true));
    }

    #[test]
    fn test_reversal_none_draws_statically() {
        let mut h = Harness::new(3, config(r#"{"General": {"reversal-strategy": "none"}}"#));
        h.key(Key::Right);
        assert!(h.session.active_run().is_some());
        h.settle();
        h.key(Key::Left);
        assert_eq!(h.page(), 0);
        assert!(h.session.active_run().is_none());
        assert!(h.session.partial_layout().is_none());
    }

    #[test]
    fn test_input_dropped_mid_transition() {
        let mut h = Harness::new(3, TransitionsConfig::default());
        h.key(Key::Right);
        h.key(Key::Right);
        h.key(Key::Period);
        assert_eq!(h.page(), 1);
        assert!(!h.session.state().flags.black_screen);

        h.now += Duration::from_millis(500);
        h.session.tick(h.now);
        assert!(h.session.active_run().is_some());
        h.now += Duration::from_millis(500);
        h.session.tick(h.now);
        assert!(h.session.active_run().is_none());
        h.key(Key::Right);
        assert_eq!(h.page(), 2);
    }

    #[test]
    fn test_partial_sliding_then_scroll() {
        let mut h = Harness::new(
            3,
            config(r#"{"Slide 1": {"transition": "partial_sliding", "transition-duration": "0.5s"}}"#),
        );
        h.key(Key::Right);
        assert_eq!(
            h.session.active_run().map(|r| r.kind),
            Some(TransitionKind::PartialSliding)
        );
        h.settle();
        let layout = *h.session.partial_layout().unwrap();
        assert_eq!(layout.prev_slide_position, -280.75);
        assert_eq!(layout.next_slide_position, 842.25);

        // Wheel down closes the gap one step at a time
        h.send(InputEvent::Wheel {
            up: false,
            ctrl: false,
            pos: Point::default(),
        });
        assert_eq!(h.session.partial_layout().unwrap().next_slide_position, 832.25);
        assert_eq!(h.page(), 1, "wheel scrolls instead of navigating");

        // Held key repeats at most every 100 ms
        h.key(Key::Up);
        h.session.tick(h.now);
        h.session.tick(h.now + Duration::from_millis(50));
        assert_eq!(h.session.partial_layout().unwrap().next_slide_position, 842.25);
        h.session.tick(h.now + Duration::from_millis(150));
        assert_eq!(h.session.partial_layout().unwrap().next_slide_position, 852.25);
        h.send(InputEvent::KeyUp { key: Key::Up });
        h.session.tick(h.now + Duration::from_secs(1));
        assert_eq!(h.session.partial_layout().unwrap().next_slide_position, 852.25);
    }

    #[test]
    fn test_partial_sliding_backward_uses_general() {
        let mut h = Harness::new(
            3,
            config(r#"{"General": {"transition": "pull"}, "Slide 1": {"transition": "partial_sliding"}}"#),
        );
        h.key(Key::Right);
        h.settle();
        h.key(Key::Right);
        h.settle();
        h.key(Key::Left);
        let run = h.session.active_run().cloned().unwrap();
        assert_eq!(run.kind, TransitionKind::Pull);
        assert!(!run.reverse);
        h.settle();
        assert!(h.session.partial_layout().is_none());
    }

    #[test]
    fn test_keep_original_restores_partial_layout() {
        let mut h = Harness::new(
            3,
            config(r#"{"Slide 1": {"transition": "partial_sliding", "reversal-strategy": "keep-original"}}"#),
        );
        h.key(Key::Right);
        h.settle();
        h.key(Key::Right);
        h.settle();
        assert!(h.session.partial_layout().is_none());

        h.key(Key::Left);
        assert!(h.session.active_run().is_none());
        let layout = h.session.partial_layout().unwrap();
        assert_eq!((layout.upper, layout.lower), (0, 1));
        assert_eq!(layout.prev_slide_position, -280.75);
    }

    #[test]
    fn test_help_is_modal() {
        let mut h = Harness::new(3, TransitionsConfig::default());
        assert!(h.session.intro_visible(h.now));
        h.key(Key::H);
        assert!(!h.session.intro_visible(h.now));
        assert_eq!(h.mode(), Mode::Help { over_overview: false });
        h.key(Key::Right);
        h.click(100, 100);
        assert_eq!(h.page(), 0);
        h.key(Key::H);
        assert_eq!(h.mode(), Mode::Normal);

        h.key(Key::Tab);
        h.key(Key::H);
        h.key(Key::H);
        assert_eq!(h.mode(), Mode::Overview);
    }

    #[test]
    fn test_overview_navigation() {
        let mut h = Harness::new(4, TransitionsConfig::default());
        h.key(Key::Tab);
        assert_eq!(h.mode(), Mode::Overview);
        h.key(Key::Left);
        assert_eq!(h.session.state().focused_page, 3);
        h.key(Key::Right);
        h.key(Key::Right);
        assert_eq!(h.session.state().focused_page, 1);
        assert!(h.session.active_run().is_none());
        h.key(Key::Enter);
        assert_eq!(h.mode(), Mode::Normal);
        assert_eq!(h.page(), 1);

        // Click a thumbnail
        h.key(Key::Tab);
        let cell = h.session.overview_grid().cell_rect(2);
        h.click(cell.left + 5, cell.top + 5);
        assert_eq!(h.mode(), Mode::Normal);
        assert_eq!(h.page(), 2);
    }

    #[test]
    fn test_zoom_clamps_and_stops_pen() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.key(Key::P);
        let wheel = |up| InputEvent::Wheel {
            up,
            ctrl: true,
            pos: Point::new(300, 400),
        };
        for _ in 0..10 {
            h.send(wheel(true));
        }
        assert_eq!(h.session.state().flags.zoom_level, MAX_ZOOM);
        assert_eq!(h.session.state().zoom_pos, Point::new(300, 400));
        assert_eq!(h.session.state().tool, Tool::Idle);

        // Annotation tools are unavailable while zoomed
        h.key(Key::T);
        assert_eq!(h.session.state().tool, Tool::Idle);

        for _ in 0..10 {
            h.send(wheel(false));
        }
        assert_eq!(h.session.state().flags.zoom_level, MIN_ZOOM);

        h.send(wheel(true));
        h.key(Key::Right);
        assert_eq!(h.session.state().flags.zoom_level, MIN_ZOOM);
    }

    #[test]
    fn test_spotlight_and_highlight_exclusive() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.key(Key::R);
        h.drag((10, 10), (60, 40));
        assert_eq!(h.session.state().highlights, vec![Rect::new(10, 10, 50, 30)]);
        assert_eq!(h.page(), 0, "highlight drag does not navigate");

        h.key(Key::S);
        let flags = h.session.state().flags;
        assert!(flags.spotlight && !flags.highlight);

        h.key(Key::R);
        h.drag((60, 40), (10, 10));
        assert!(!h.session.state().flags.spotlight);
        assert_eq!(h.session.state().highlights.len(), 2);
        h.key(Key::R);
        assert!(h.session.state().highlights.is_empty());
    }

    #[test]
    fn test_spotlight_starts_centered_then_follows_pointer() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.key(Key::S);
        assert_eq!(h.session.state().spotlight_pos, Point::new(397, 561));

        h.send(InputEvent::MouseMove {
            pos: Point::new(30, 40),
            left_down: false,
        });
        assert_eq!(h.session.state().spotlight_pos, Point::new(30, 40));
    }

    #[test]
    fn test_spotlight_radius_limits() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.key(Key::Plus);
        assert_eq!(h.session.state().spotlight_radius, 100, "only while spotlight is on");
        h.key(Key::S);
        h.key(Key::Equals);
        assert_eq!(h.session.state().spotlight_radius, 110);
        for _ in 0..20 {
            h.key(Key::Minus);
        }
        assert_eq!(h.session.state().spotlight_radius, MIN_SPOTLIGHT_RADIUS);
        for _ in 0..200 {
            h.key(Key::Plus);
        }
        assert_eq!(h.session.state().spotlight_radius, WINDOW.height);
    }

    #[test]
    fn test_black_screen_cleared_by_navigation() {
        let mut h = Harness::new(3, TransitionsConfig::default());
        h.key(Key::Period);
        assert!(h.session.state().flags.black_screen);
        h.key(Key::S);
        assert!(h.session.state().flags.black_screen, "other keys keep it");
        h.key(Key::Right);
        assert!(!h.session.state().flags.black_screen);
        assert_eq!(h.page(), 1);
    }

    #[test]
    fn test_text_box_flow() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.send(InputEvent::MouseMove {
            pos: Point::new(100, 100),
            left_down: false,
        });
        h.key(Key::T);
        h.drag((100, 100), (200, 160));
        assert_eq!(
            h.session.state().tool,
            Tool::EnteringText {
                rect: Rect::new(100, 100, 100, 60),
                text: String::new(),
            }
        );

        h.typed("hello");
        h.typed(" ");
        h.typed("world");
        // Typing swallows navigation keys
        h.send(InputEvent::KeyDown {
            key: Key::Right,
            ctrl: false,
            text: None,
        });
        h.send(InputEvent::KeyDown {
            key: Key::T,
            ctrl: false,
            text: Some("t".into()),
        });
        h.key(Key::Backspace);
        match &h.session.state().tool {
            Tool::EnteringText { rect, text } => {
                assert_eq!(text, "hello world");
                // Two wrapped lines of 20 px
                assert_eq!(rect.height, 40);
            }
            other => panic!("unexpected tool {other:?}"),
        }
        h.key(Key::Enter);
        assert_eq!(h.page(), 0);
        assert_eq!(h.session.state().tool, Tool::Idle);
        let saved = &h.session.annotations().texts(0)[0];
        assert_eq!(saved.text, "hello world");
        assert_eq!(saved.rect, Rect::new(100, 100, 100, 40));

        // T over the box reopens it for editing
        h.send(InputEvent::MouseMove {
            pos: Point::new(110, 110),
            left_down: false,
        });
        h.key(Key::T);
        assert!(matches!(h.session.state().tool, Tool::EnteringText { .. }));
        assert!(h.session.annotations().texts(0).is_empty());
    }

    #[test]
    fn test_reopening_text_box_ignores_the_t_keystroke() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.session.annotations.add_text(
            0,
            TextAnnotation {
                rect: Rect::new(100, 100, 200, 40),
                text: "note".into(),
            },
        );
        h.send(InputEvent::MouseMove {
            pos: Point::new(110, 110),
            left_down: false,
        });
        h.send(InputEvent::KeyDown {
            key: Key::T,
            ctrl: false,
            text: None,
        });
        h.send(InputEvent::Text("t".into()));
        h.send(InputEvent::Text("s".into()));
        match &h.session.state().tool {
            Tool::EnteringText { text, .. } => assert_eq!(text, "notes"),
            other => panic!("unexpected tool {other:?}"),
        }
    }

    #[test]
    fn test_drag_text_box() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.session.annotations.add_text(
            0,
            TextAnnotation {
                rect: Rect::new(100, 100, 80, 20),
                text: "note".into(),
            },
        );
        h.drag((110, 105), (300, 400));
        assert_eq!(h.page(), 0, "picking up a box does not navigate");
        let moved = &h.session.annotations().texts(0)[0];
        assert_eq!(moved.rect, Rect::new(300, 400, 80, 20));
    }

    #[test]
    fn test_pen_strokes() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.key(Key::P);
        h.drag((10, 10), (50, 50));
        h.click(70, 70);
        assert_eq!(h.page(), 0);
        let strokes = h.session.annotations().strokes(0);
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].points.len(), 3);

        // Text tool replaces the pen
        h.key(Key::T);
        assert!(matches!(h.session.state().tool, Tool::DrawingBox { .. }));
        h.key(Key::P);
        assert!(matches!(h.session.state().tool, Tool::Pen { .. }));
        h.key(Key::P);
        assert_eq!(h.session.state().tool, Tool::Idle);
    }

    #[test]
    fn test_click_and_wheel_navigate() {
        let mut h = Harness::new(3, TransitionsConfig::default());
        h.click(10, 10);
        h.settle();
        assert_eq!(h.page(), 1);
        h.send(InputEvent::Wheel {
            up: false,
            ctrl: false,
            pos: Point::default(),
        });
        h.settle();
        assert_eq!(h.page(), 2);
        h.send(InputEvent::MouseDown {
            button: MouseButton::Right,
            pos: Point::default(),
        });
        h.settle();
        assert_eq!(h.page(), 1);
    }

    #[test]
    fn test_fullscreen_request_and_rescale() {
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.session.annotations.add_text(
            0,
            TextAnnotation {
                rect: Rect::new(400, 600, 100, 40),
                text: "centre".into(),
            },
        );
        assert_eq!(h.key(Key::F), Some(Request::SetFullscreen(true)));
        h.session.resize(Size::new(1920, 1080));
        let full = h.session.annotations().texts(0)[0].rect;
        // Image is 763x1080 centered at x = 578
        assert_eq!((full.left, full.top), (962, 577));

        assert_eq!(h.key(Key::F), Some(Request::SetFullscreen(false)));
        h.session.resize(WINDOW);
        let back = h.session.annotations().texts(0)[0].rect;
        assert!((back.left - 400).abs() <= 1 && (back.top - 600).abs() <= 1);
        assert!((back.width - 100).abs() <= 1 && (back.height - 40).abs() <= 1);
    }

    #[test]
    fn test_save_normalises_to_start_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck_annotations.json");
        let mut h = Harness::new(2, TransitionsConfig::default());
        h.session = Session::new(
            vec![WINDOW; 2],
            WINDOW,
            TransitionsConfig::default(),
            AnnotationStore::default(),
            100,
            h.now,
        )
        .with_annotations_path(path.clone());
        h.session.annotations.add_text(
            1,
            TextAnnotation {
                rect: Rect::new(200, 300, 50, 20),
                text: "x".into(),
            },
        );
        h.session.resize(Size::new(1920, 1080));
        h.send(InputEvent::ctrl_key(Key::S));

        let saved = AnnotationStore::load(&path).unwrap();
        let rect = saved.texts(1)[0].rect;
        assert!((rect.left - 200).abs() <= 1 && (rect.top - 300).abs() <= 1);
        // The live store stays in fullscreen coordinates
        assert_ne!(h.session.annotations().texts(1)[0].rect, rect);
    }

    #[test]
    fn test_resize_recomputes_partial_offsets() {
        let mut h = Harness::new(
            2,
            config(r#"{"General": {"transition": "partial_sliding"}}"#),
        );
        h.key(Key::Right);
        h.settle();
        h.session.resize(Size::new(1920, 1080));
        let layout = h.session.partial_layout().unwrap();
        // Fitted page is 763x1080: centered at 0, lifted by 270
        assert_eq!(layout.prev_slide_position, -270.0);
        assert_eq!(layout.next_slide_position, 810.0);
    }

    #[test]
    fn test_default_spec_is_fade_in() {
        let h = Harness::new(2, TransitionsConfig::default());
        assert_eq!(h.session.transitions().spec_for(1), TransitionSpec::default());
    }
}
