use anyhow::Result;
use eframe::egui;
use std::path::PathBuf;
use std::time::Instant;

use crate::annotations::AnnotationStore;
use crate::config::{Config, StartMode, TransitionsConfig};
use crate::geometry::{Point, Size};
use crate::rasterizer;
use crate::render;
use crate::render::canvas::EguiCanvas;
use crate::render::image_cache::ImageCache;
use crate::render::transition::FRAME_INTERVAL;
use crate::session::input::{InputEvent, Key, MouseButton};
use crate::session::{Request, Session};
use crate::theme::Theme;

/// Smooth scrolling distance that counts as one wheel notch.
const WHEEL_NOTCH_POINTS: f32 = 20.0;

struct PresentationApp {
    session: Session,
    images: ImageCache,
    theme: Theme,
    preloaded: bool,
    left_down: bool,
    pointer: Point,
    /// Smooth scrolling not yet turned into a notch.
    wheel_points: f32,
}

impl PresentationApp {
    fn new(session: Session, images: ImageCache) -> Self {
        Self {
            session,
            images,
            theme: Theme::default(),
            preloaded: false,
            left_down: false,
            pointer: Point::default(),
            wheel_points: 0.0,
        }
    }

    /// Translate one egui event, with positions made relative to `origin`.
    fn translate(&mut self, event: &egui::Event, origin: egui::Pos2) -> Option<InputEvent> {
        let point = |pos: egui::Pos2| {
            Point::new(
                (pos.x - origin.x).round() as i32,
                (pos.y - origin.y).round() as i32,
            )
        };
        match event {
            egui::Event::Key {
                key,
                pressed,
                repeat,
                modifiers,
                ..
            } => {
                let key = map_key(*key);
                match (*pressed, *repeat) {
                    // Held arrows scroll on their own timer
                    (true, true) if key != Key::Backspace => None,
                    (true, _) => Some(InputEvent::KeyDown {
                        key,
                        ctrl: modifiers.command,
                        text: None,
                    }),
                    (false, _) => Some(InputEvent::KeyUp { key }),
                }
            }
            egui::Event::Text(text) => Some(InputEvent::Text(text.clone())),
            egui::Event::PointerButton {
                pos,
                button,
                pressed,
                ..
            } => {
                let button = match button {
                    egui::PointerButton::Primary => MouseButton::Left,
                    egui::PointerButton::Secondary => MouseButton::Right,
                    _ => MouseButton::Other,
                };
                if button == MouseButton::Left {
                    self.left_down = *pressed;
                }
                self.pointer = point(*pos);
                Some(if *pressed {
                    InputEvent::MouseDown {
                        button,
                        pos: self.pointer,
                    }
                } else {
                    InputEvent::MouseUp {
                        button,
                        pos: self.pointer,
                    }
                })
            }
            egui::Event::PointerMoved(pos) => {
                self.pointer = point(*pos);
                Some(InputEvent::MouseMove {
                    pos: self.pointer,
                    left_down: self.left_down,
                })
            }
            egui::Event::MouseWheel {
                unit,
                delta,
                modifiers,
            } if delta.y != 0.0 => {
                let up = self.wheel_notch(*unit, delta.y)?;
                Some(InputEvent::Wheel {
                    up,
                    ctrl: modifiers.command,
                    pos: self.pointer,
                })
            }
            _ => None,
        }
    }

    /// Direction of the next whole notch, if `dy` completes one.
    fn wheel_notch(&mut self, unit: egui::MouseWheelUnit, dy: f32) -> Option<bool> {
        if unit != egui::MouseWheelUnit::Point {
            self.wheel_points = 0.0;
            return Some(dy > 0.0);
        }
        if self.wheel_points * dy < 0.0 {
            self.wheel_points = 0.0;
        }
        self.wheel_points += dy;
        if self.wheel_points.abs() < WHEEL_NOTCH_POINTS {
            return None;
        }
        let up = self.wheel_points > 0.0;
        self.wheel_points -= WHEEL_NOTCH_POINTS.copysign(self.wheel_points);
        Some(up)
    }
}

fn map_key(key: egui::Key) -> Key {
    match key {
        egui::Key::ArrowRight => Key::Right,
        egui::Key::ArrowLeft => Key::Left,
        egui::Key::ArrowUp => Key::Up,
        egui::Key::ArrowDown => Key::Down,
        egui::Key::PageUp => Key::PageUp,
        egui::Key::PageDown => Key::PageDown,
        egui::Key::Enter => Key::Enter,
        egui::Key::Tab => Key::Tab,
        egui::Key::Backspace => Key::Backspace,
        egui::Key::F => Key::F,
        egui::Key::S => Key::S,
        egui::Key::R => Key::R,
        egui::Key::T => Key::T,
        egui::Key::P => Key::P,
        egui::Key::H => Key::H,
        egui::Key::Plus => Key::Plus,
        egui::Key::Equals => Key::Equals,
        egui::Key::Minus => Key::Minus,
        egui::Key::Period => Key::Period,
        _ => Key::Other,
    }
}

impl eframe::App for PresentationApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.preloaded {
            self.images.preload(ctx);
            self.preloaded = true;
        }

        let events = ctx.input(|i| i.events.clone());

        // Collect viewport commands to send AFTER the panel closure
        let mut viewport_cmds: Vec<egui::ViewportCommand> = Vec::new();

        let bg = self.theme.background;
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(bg).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let now = Instant::now();
                self.session.resize(Size::new(
                    rect.width().round() as i32,
                    rect.height().round() as i32,
                ));

                let painter = ui.painter();
                for event in &events {
                    let Some(input) = self.translate(event, rect.min) else {
                        continue;
                    };
                    if let Some(Request::SetFullscreen(on)) =
                        self.session.handle(input, now, painter)
                    {
                        viewport_cmds.push(egui::ViewportCommand::Fullscreen(on));
                    }
                }
                self.session.tick(now);

                let mut canvas = EguiCanvas::new(painter, &self.images, rect);
                render::draw_session(&mut canvas, &self.session, &self.theme, now);

                if self.session.needs_repaint(now) {
                    ui.ctx().request_repaint_after(FRAME_INTERVAL);
                }
            });

        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }
    }
}

/// Where to open the presentation, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub config_file: Option<PathBuf>,
    pub fullscreen: bool,
    /// 1-indexed.
    pub slide: Option<usize>,
    pub overview: bool,
}

pub fn run(pdf: PathBuf, start: StartOptions) -> Result<()> {
    let config = Config::load_or_default();
    let transitions = TransitionsConfig::resolve(&pdf, start.config_file.as_deref())?;
    let window = config.window_size();

    let cache_dir = rasterizer::cache_dir_for(&config.cache_dir(), &pdf);
    let pages = rasterizer::default_rasterizer().convert(&pdf, &cache_dir, window)?;
    let images = ImageCache::open(pages)?;
    if images.is_empty() {
        anyhow::bail!("No pages found in {}", pdf.display());
    }
    log::info!("Loaded {} page(s) from {}", images.len(), pdf.display());
    log::debug!("Page sizes: {:?}", images.sizes());

    let annotations_path = AnnotationStore::path_for(&pdf);
    let annotations = AnnotationStore::load(&annotations_path)?;

    let title = format!(
        "pdfdeck - {}",
        pdf.file_name().unwrap_or_default().to_string_lossy()
    );

    // Command line flags override config
    let (initial_slide, initial_overview) = if start.overview {
        (start.slide, true)
    } else if start.slide.is_some() {
        (start.slide, false)
    } else {
        match config.start_mode() {
            StartMode::First => (None, false),
            StartMode::Overview => (None, true),
            StartMode::Slide(n) => (Some(n), false),
        }
    };

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([window.width as f32, window.height as f32])
        .with_title(&title);
    let viewport = if start.fullscreen {
        viewport.with_fullscreen(true)
    } else {
        viewport
    };

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let spotlight_radius = config.spotlight_radius();
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            // +, - and = belong to the spotlight
            cc.egui_ctx.options_mut(|o| o.zoom_with_keyboard = false);

            let mut session = Session::new(
                images.sizes().to_vec(),
                window,
                transitions,
                annotations,
                spotlight_radius,
                Instant::now(),
            )
            .with_annotations_path(annotations_path)
            .with_fullscreen(start.fullscreen);
            if let Some(slide) = initial_slide {
                session.jump_to(slide.saturating_sub(1));
            }
            if initial_overview {
                session.open_overview();
            }
            Ok(Box::new(PresentationApp::new(session, images)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
