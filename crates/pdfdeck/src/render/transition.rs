//! Slide transitions: per-kind interpolation of where the outgoing and incoming slide are
//! drawn, and two ways of driving a run (frame-by-frame from the app, or a blocking loop).

use std::time::{Duration, Instant};

use crate::geometry::{Position, Size, centered};
use crate::render::{Canvas, SlideRef};

/// Interval between frames of a blocking run.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    FadeIn,
    FadeOutSlideIn,
    Pull,
    SwipeLeft,
    SwipeRight,
    PartialSliding,
}

impl TransitionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fade_in" => Some(Self::FadeIn),
            "fade_out_slide_in" => Some(Self::FadeOutSlideIn),
            "pull" => Some(Self::Pull),
            "swipe_left" => Some(Self::SwipeLeft),
            "swipe_right" => Some(Self::SwipeRight),
            "partial_sliding" => Some(Self::PartialSliding),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FadeIn => "fade_in",
            Self::FadeOutSlideIn => "fade_out_slide_in",
            Self::Pull => "pull",
            Self::SwipeLeft => "swipe_left",
            Self::SwipeRight => "swipe_right",
            Self::PartialSliding => "partial_sliding",
        }
    }

    pub fn all() -> &'static [TransitionKind] {
        &[
            Self::FadeIn,
            Self::FadeOutSlideIn,
            Self::Pull,
            Self::SwipeLeft,
            Self::SwipeRight,
            Self::PartialSliding,
        ]
    }
}

/// How a slide is shown when it is reached by navigating backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalStrategy {
    /// Play the transition backward.
    Invert,
    /// Show the forward run's final layout without animating.
    KeepOriginal,
    /// Draw the slide centered, no animation.
    None,
}

impl ReversalStrategy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "invert-transition" | "invert" => Some(Self::Invert),
            "keep-original" | "keep_original" | "keep-original-transition" => {
                Some(Self::KeepOriginal)
            }
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Invert => "invert-transition",
            Self::KeepOriginal => "keep-original",
            Self::None => "none",
        }
    }
}

/// Transition settings for one slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionSpec {
    pub kind: TransitionKind,
    pub duration: Duration,
    pub reversal: ReversalStrategy,
}

impl Default for TransitionSpec {
    fn default() -> Self {
        Self {
            kind: TransitionKind::FadeIn,
            duration: Duration::from_secs(1),
            reversal: ReversalStrategy::Invert,
        }
    }
}

/// Pick the kind, duration and direction actually played for `spec`.
///
/// `partial_sliding` has no backward form: a backward run falls back to `general` played
/// forward, or to `fade_in` when `general` is itself `partial_sliding`.
pub fn effective(
    spec: &TransitionSpec,
    general: &TransitionSpec,
    reverse: bool,
) -> (TransitionKind, Duration, bool) {
    if spec.kind == TransitionKind::PartialSliding && reverse {
        let kind = match general.kind {
            TransitionKind::PartialSliding => TransitionKind::FadeIn,
            other => other,
        };
        (kind, general.duration, false)
    } else {
        (spec.kind, spec.duration, reverse)
    }
}

/// Where and how opaque a slide is drawn in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Position,
    pub alpha: u8,
}

impl Placement {
    fn opaque(x: f32, y: f32) -> Self {
        Self {
            position: Position::new(x, y),
            alpha: 255,
        }
    }
}

/// One animation frame. `prev` is `None` once the outgoing slide is no longer visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub prev: Option<Placement>,
    pub next: Placement,
}

/// Layout a run settles into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rest {
    /// The incoming slide alone, centered.
    Centered,
    /// Both slides stacked, the outgoing one lifted by a quarter of the window.
    Partial {
        prev_slide_position: f32,
        next_slide_position: f32,
    },
}

/// Resting offsets after a forward `partial_sliding` run.
pub fn partial_rest(window_height: i32, prev_height: i32) -> (f32, f32) {
    let prev = centered(prev_height, window_height) as f32 - window_height as f32 / 4.0;
    (prev, prev + prev_height as f32)
}

pub fn rest_layout(kind: TransitionKind, window: Size, prev: Size) -> Rest {
    match kind {
        TransitionKind::PartialSliding => {
            let (prev_slide_position, next_slide_position) = partial_rest(window.height, prev.height);
            Rest::Partial {
                prev_slide_position,
                next_slide_position,
            }
        }
        _ => Rest::Centered,
    }
}

fn lerp(start: f32, end: f32, progress: f32) -> f32 {
    start + (end - start) * progress
}

fn to_alpha(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Placements for `kind` at `progress` (0 at the start, 1 at rest; values past 1 are
/// extrapolated). `prev` and `next` are the already fitted slide sizes.
pub fn frame(
    kind: TransitionKind,
    reverse: bool,
    progress: f32,
    window: Size,
    prev: Size,
    next: Size,
) -> Frame {
    let (w, h) = (window.width as f32, window.height as f32);
    let prev_x = centered(prev.width, window.width) as f32;
    let prev_y = centered(prev.height, window.height) as f32;
    let next_x = centered(next.width, window.width) as f32;
    let next_y = centered(next.height, window.height) as f32;

    match kind {
        TransitionKind::FadeIn => {
            let (from, to) = if reverse { (255.0, 0.0) } else { (0.0, 255.0) };
            let alpha = lerp(from, to, progress);
            let (prev_alpha, next_alpha) = if reverse {
                (alpha, 255.0 - alpha)
            } else {
                (255.0 - alpha, alpha)
            };
            Frame {
                prev: Some(Placement {
                    position: Position::new(prev_x, prev_y),
                    alpha: to_alpha(prev_alpha),
                }),
                next: Placement {
                    position: Position::new(next_x, next_y),
                    alpha: to_alpha(next_alpha),
                },
            }
        }
        TransitionKind::FadeOutSlideIn => {
            let start = if reverse { h } else { -h };
            let alpha = to_alpha(255.0 - 255.0 * progress);
            Frame {
                prev: (alpha > 0).then(|| Placement {
                    position: Position::new(prev_x, prev_y),
                    alpha,
                }),
                next: Placement::opaque(next_x, lerp(start, next_y, progress)),
            }
        }
        TransitionKind::Pull => {
            let start = if reverse { h } else { -h };
            let y_prev = if reverse {
                (-(window.height - prev.height)).div_euclid(2) as f32 + h * progress
            } else {
                prev_y - h * progress
            };
            let visible = y_prev < h && y_prev + prev.height as f32 > 0.0;
            Frame {
                prev: visible.then(|| Placement::opaque(prev_x, y_prev)),
                next: Placement::opaque(next_x, lerp(start, next_y, progress)),
            }
        }
        TransitionKind::SwipeLeft | TransitionKind::SwipeRight => {
            let rightward = (kind == TransitionKind::SwipeRight) != reverse;
            let dir = if rightward { 1.0 } else { -1.0 };
            Frame {
                prev: Some(Placement::opaque(prev_x + dir * w * progress, prev_y)),
                next: Placement::opaque(next_x + dir * w * (progress - 1.0), next_y),
            }
        }
        TransitionKind::PartialSliding => {
            let gap = h - (prev_y + prev.height as f32);
            Frame {
                prev: Some(Placement::opaque(prev_x, prev_y - h / 4.0 * progress)),
                next: Placement::opaque(next_x, h - (h / 4.0 + gap) * progress),
            }
        }
    }
}

/// A transition between two pages that is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRun {
    pub from: usize,
    pub to: usize,
    pub kind: TransitionKind,
    pub duration: Duration,
    pub reverse: bool,
    pub start: Instant,
}

impl TransitionRun {
    pub fn new(
        from: usize,
        to: usize,
        kind: TransitionKind,
        duration: Duration,
        reverse: bool,
        start: Instant,
    ) -> Self {
        assert!(!duration.is_zero(), "transition duration must be positive");
        Self {
            from,
            to,
            kind,
            duration,
            reverse,
            start,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }

    /// Unclamped progress.
    pub fn progress(&self, now: Instant) -> f32 {
        self.elapsed(now).as_secs_f32() / self.duration.as_secs_f32()
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.duration
    }

    pub fn frame_at(&self, now: Instant, window: Size, prev: Size, next: Size) -> Frame {
        frame(self.kind, self.reverse, self.progress(now), window, prev, next)
    }

    /// Layout once the run is over. Backward runs always end centered.
    pub fn rest(&self, window: Size, prev: Size) -> Rest {
        if self.reverse {
            Rest::Centered
        } else {
            rest_layout(self.kind, window, prev)
        }
    }
}

/// Clock for a blocking run.
#[cfg_attr(not(test), allow(dead_code))]
pub trait Ticker {
    fn now(&mut self) -> Instant;
    /// Wait for the next frame.
    fn tick(&mut self);
}

/// Wall clock that sleeps between frames.
#[cfg_attr(not(test), allow(dead_code))]
pub struct SleepTicker {
    pub interval: Duration,
}

impl Ticker for SleepTicker {
    fn now(&mut self) -> Instant {
        Instant::now()
    }

    fn tick(&mut self) {
        std::thread::sleep(self.interval);
    }
}

/// Outcome of a blocking run.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Played {
    pub frames: u32,
    /// Progress of the last animated frame. May exceed 1.
    pub last_progress: f32,
    pub rest: Rest,
}

/// Play a transition to completion, drawing every frame on `canvas`, then draw the rest
/// layout. Nothing else runs until this returns.
#[allow(clippy::too_many_arguments)]
#[cfg_attr(not(test), allow(dead_code))]
pub fn play<C: Canvas + ?Sized, T: Ticker>(
    canvas: &mut C,
    ticker: &mut T,
    prev: SlideRef,
    next: SlideRef,
    window: Size,
    kind: TransitionKind,
    duration: Duration,
    reverse: bool,
) -> Played {
    let run = TransitionRun::new(prev.page, next.page, kind, duration, reverse, ticker.now());
    let mut frames = 0;
    let mut last_progress = 0.0;
    let mut elapsed = Duration::ZERO;

    // Checked before sampling, so the last frame may land past the end
    while elapsed < run.duration {
        let now = ticker.now();
        elapsed = run.elapsed(now);
        last_progress = run.progress(now);
        let f = run.frame_at(now, window, prev.size, next.size);
        super::draw_frame(canvas, &f, prev, next);
        canvas.present();
        frames += 1;
        ticker.tick();
    }

    let rest = run.rest(window, prev.size);
    super::draw_rest(canvas, rest, window, prev, next);
    canvas.present();
    log::trace!(
        "{} finished after {frames} frames (progress {last_progress:.3})",
        kind.name()
    );
    Played {
        frames,
        last_progress,
        rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::{Op, RecordingCanvas};

    /// Virtual clock advancing a fixed step per tick.
    struct StepTicker {
        now: Instant,
        step: Duration,
    }

    impl StepTicker {
        fn new(step_ms: u64) -> Self {
            Self {
                now: Instant::now(),
                step: Duration::from_millis(step_ms),
            }
        }
    }

    impl Ticker for StepTicker {
        fn now(&mut self) -> Instant {
            self.now
        }

        fn tick(&mut self) {
            self.now += self.step;
        }
    }

    const WINDOW: Size = Size::new(794, 1123);

    fn slides(prev: Size, next: Size) -> (SlideRef, SlideRef) {
        (SlideRef { page: 0, size: prev }, SlideRef { page: 1, size: next })
    }

    #[test]
    fn test_names_round_trip() {
        for kind in TransitionKind::all() {
            assert_eq!(TransitionKind::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(TransitionKind::from_name("dissolve"), None);
        assert_eq!(
            ReversalStrategy::from_name("invert"),
            Some(ReversalStrategy::Invert)
        );
        assert_eq!(
            ReversalStrategy::from_name("keep-original-transition"),
            Some(ReversalStrategy::KeepOriginal)
        );
        assert_eq!(ReversalStrategy::from_name("backwards"), None);
    }

    #[test]
    fn test_fade_in_ramps() {
        let s = Size::new(794, 1123);
        let start = frame(TransitionKind::FadeIn, false, 0.0, WINDOW, s, s);
        assert_eq!(start.prev.map(|p| p.alpha), Some(255));
        assert_eq!(start.next.alpha, 0);

        let mid = frame(TransitionKind::FadeIn, false, 0.5, WINDOW, s, s);
        assert_eq!(mid.next.alpha, 127);

        let end = frame(TransitionKind::FadeIn, false, 1.0, WINDOW, s, s);
        assert_eq!(end.next.alpha, 255);
        assert_eq!(end.prev.map(|p| p.alpha), Some(0));
    }

    #[test]
    fn test_fade_in_reverse_matches_forward() {
        let s = Size::new(600, 800);
        for &p in &[0.0, 0.25, 0.5, 1.0] {
            let fwd = frame(TransitionKind::FadeIn, false, p, WINDOW, s, s);
            let back = frame(TransitionKind::FadeIn, true, p, WINDOW, s, s);
            assert_eq!(fwd, back);
        }
    }

    #[test]
    fn test_fade_out_slide_in_enters_from_top() {
        let s = Size::new(794, 1123);
        let start = frame(TransitionKind::FadeOutSlideIn, false, 0.0, WINDOW, s, s);
        assert_eq!(start.next.position.y, -1123.0);
        assert_eq!(start.prev.map(|p| p.alpha), Some(255));

        let end = frame(TransitionKind::FadeOutSlideIn, false, 1.0, WINDOW, s, s);
        assert_eq!(end.next.position.y, 0.0);
        assert!(end.prev.is_none());

        let back = frame(TransitionKind::FadeOutSlideIn, true, 0.0, WINDOW, s, s);
        assert_eq!(back.next.position.y, 1123.0);
    }

    #[test]
    fn test_pull_moves_both_slides() {
        let s = Size::new(794, 1123);
        let mid = frame(TransitionKind::Pull, false, 0.5, WINDOW, s, s);
        assert_eq!(mid.next.position.y, -561.5);
        assert_eq!(mid.prev.map(|p| p.position.y), Some(-561.5));

        let end = frame(TransitionKind::Pull, false, 1.0, WINDOW, s, s);
        assert_eq!(end.next.position.y, 0.0);
        assert!(end.prev.is_none(), "outgoing slide has left the window");

        let back = frame(TransitionKind::Pull, true, 0.5, WINDOW, s, s);
        assert_eq!(back.next.position.y, 561.5);
        assert_eq!(back.prev.map(|p| p.position.y), Some(561.5));
    }

    #[test]
    fn test_swipes_move_in_lockstep() {
        let s = Size::new(794, 1123);
        let right = frame(TransitionKind::SwipeRight, false, 0.25, WINDOW, s, s);
        let prev = right.prev.map(|p| p.position.x).unwrap_or_default();
        assert_eq!(prev, 198.5);
        assert_eq!(right.next.position.x - prev, -794.0);

        let left = frame(TransitionKind::SwipeLeft, false, 0.25, WINDOW, s, s);
        assert_eq!(left.prev.map(|p| p.position.x), Some(-198.5));
        assert_eq!(left.next.position.x, 595.5);

        // Reversing a left swipe moves like a right swipe
        assert_eq!(frame(TransitionKind::SwipeLeft, true, 0.25, WINDOW, s, s), right);

        let done = frame(TransitionKind::SwipeLeft, false, 1.0, WINDOW, s, s);
        assert_eq!(done.next.position.x, 0.0);
    }

    #[test]
    fn test_partial_sliding_positions() {
        let prev = Size::new(794, 600);
        let next = Size::new(794, 600);
        let start = frame(TransitionKind::PartialSliding, false, 0.0, WINDOW, prev, next);
        assert_eq!(start.next.position.y, 1123.0);
        assert_eq!(start.prev.map(|p| p.position.y), Some(261.0));

        let end = frame(TransitionKind::PartialSliding, false, 1.0, WINDOW, prev, next);
        assert_eq!(end.prev.map(|p| p.position.y), Some(-19.75));
        assert_eq!(end.next.position.y, 580.25);
        assert_eq!(partial_rest(1123, 600), (-19.75, 580.25));
    }

    #[test]
    fn test_partial_sliding_reverse_falls_back_to_general() {
        let partial = TransitionSpec {
            kind: TransitionKind::PartialSliding,
            ..TransitionSpec::default()
        };
        let general = TransitionSpec {
            kind: TransitionKind::Pull,
            duration: Duration::from_millis(500),
            reversal: ReversalStrategy::Invert,
        };
        assert_eq!(
            effective(&partial, &general, true),
            (TransitionKind::Pull, Duration::from_millis(500), false)
        );
        assert_eq!(
            effective(&partial, &partial, true),
            (TransitionKind::FadeIn, Duration::from_secs(1), false)
        );
        assert_eq!(
            effective(&partial, &general, false),
            (TransitionKind::PartialSliding, Duration::from_secs(1), false)
        );
    }

    #[test]
    fn test_run_progress_unclamped() {
        let start = Instant::now();
        let run = TransitionRun::new(0, 1, TransitionKind::Pull, Duration::from_secs(1), false, start);
        assert!(!run.is_complete(start + Duration::from_millis(999)));
        assert!(run.is_complete(start + Duration::from_secs(1)));
        assert!(run.progress(start + Duration::from_millis(1500)) > 1.4);
    }

    #[test]
    #[should_panic(expected = "duration must be positive")]
    fn test_zero_duration_rejected() {
        TransitionRun::new(0, 1, TransitionKind::FadeIn, Duration::ZERO, false, Instant::now());
    }

    #[test]
    fn test_play_ends_at_rest() {
        let (prev, next) = slides(Size::new(794, 1123), Size::new(700, 1000));
        for kind in TransitionKind::all().iter().copied().filter(|k| *k != TransitionKind::PartialSliding) {
            let mut canvas = RecordingCanvas::default();
            let mut ticker = StepTicker::new(10);
            let played = play(
                &mut canvas,
                &mut ticker,
                prev,
                next,
                WINDOW,
                kind,
                Duration::from_millis(200),
                false,
            );
            assert_eq!(played.rest, Rest::Centered);
            assert!(played.frames >= 20, "{}: {} frames", kind.name(), played.frames);
            let last = canvas.last_image().unwrap_or_else(|| panic!("{} drew nothing", kind.name()));
            assert_eq!(
                last,
                Op::Image {
                    page: 1,
                    origin: Position::new(47.0, 61.0),
                    size: Size::new(700, 1000),
                    alpha: 255,
                }
            );
        }
    }

    #[test]
    fn test_play_partial_leaves_halfway_offsets() {
        let (prev, next) = slides(Size::new(794, 600), Size::new(794, 600));
        let mut canvas = RecordingCanvas::default();
        let mut ticker = StepTicker::new(10);
        let played = play(
            &mut canvas,
            &mut ticker,
            prev,
            next,
            WINDOW,
            TransitionKind::PartialSliding,
            Duration::from_millis(100),
            false,
        );
        assert_eq!(
            played.rest,
            Rest::Partial {
                prev_slide_position: -19.75,
                next_slide_position: 580.25,
            }
        );
        let images = canvas.images();
        let tail = &images[images.len() - 2..];
        assert_eq!(tail[0].1, Position::new(0.0, -19.75));
        assert_eq!(tail[1].1, Position::new(0.0, 580.25));
    }

    #[test]
    fn test_play_last_frame_may_overshoot() {
        let (prev, next) = slides(Size::new(794, 1123), Size::new(794, 1123));
        let mut canvas = RecordingCanvas::default();
        let mut ticker = StepTicker::new(30);
        let played = play(
            &mut canvas,
            &mut ticker,
            prev,
            next,
            WINDOW,
            TransitionKind::FadeIn,
            Duration::from_secs(1),
            false,
        );
        // Frames at 0, 30, ..., 990, 1020 ms
        assert_eq!(played.frames, 35);
        assert!((played.last_progress - 1.02).abs() < 1e-4);
    }

    #[test]
    fn test_play_clears_before_each_frame() {
        let (prev, next) = slides(Size::new(794, 1123), Size::new(794, 1123));
        let mut canvas = RecordingCanvas::default();
        let mut ticker = StepTicker::new(10);
        let played = play(
            &mut canvas,
            &mut ticker,
            prev,
            next,
            WINDOW,
            TransitionKind::SwipeRight,
            Duration::from_millis(50),
            true,
        );
        let clears = canvas.ops.iter().filter(|op| matches!(op, Op::Clear(_))).count();
        let presents = canvas.ops.iter().filter(|op| matches!(op, Op::Present)).count();
        assert_eq!(clears as u32, played.frames + 1);
        assert_eq!(presents, clears);
    }

    #[test]
    fn test_sleep_ticker_plays_in_real_time() {
        let (prev, next) = slides(Size::new(794, 1123), Size::new(794, 1123));
        let mut canvas = RecordingCanvas::default();
        let mut ticker = SleepTicker {
            interval: Duration::from_millis(1),
        };
        let started = Instant::now();
        let played = play(
            &mut canvas,
            &mut ticker,
            prev,
            next,
            WINDOW,
            TransitionKind::Pull,
            Duration::from_millis(20),
            false,
        );
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(played.frames >= 1);
        assert!(played.last_progress >= 1.0);
    }
}
