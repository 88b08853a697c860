//! Pixel geometry shared by the transition engine, the session and the renderer.
//!
//! Everything here works in window pixels with a top-left origin. Integer types are used
//! wherever a value ends up as a pixel coordinate so that rounding matches what is drawn.

use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Top-left corner that centers `self` inside `outer`.
    pub fn centered_in(self, outer: Size) -> Point {
        Point::new(
            centered(self.width, outer.width),
            centered(self.height, outer.height),
        )
    }

    pub fn center(self) -> Point {
        Point::new(self.width / 2, self.height / 2)
    }

    pub fn scaled(self, factor: f32) -> Size {
        Size::new(
            (self.width as f32 * factor) as i32,
            (self.height as f32 * factor) as i32,
        )
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Offset that centers a span of `inner` pixels inside `outer`, rounded toward negative
/// infinity.
pub fn centered(inner: i32, outer: i32) -> i32 {
    (outer - inner).div_euclid(2)
}

/// A pixel position. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<[i32; 2]> for Point {
    fn from([x, y]: [i32; 2]) -> Self {
        Point::new(x, y)
    }
}

impl From<Point> for [i32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// A fractional position, used for animated placements.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Position {
    fn from(p: Point) -> Self {
        Position::new(p.x as f32, p.y as f32)
    }
}

/// Axis-aligned rectangle stored as left/top/width/height. Serialized as
/// `[left, top, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Normalized rectangle spanned by two drag corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        )
    }

    /// Rectangle anchored at `start` whose size is the absolute drag distance to `end`.
    /// The anchor stays the top-left corner even when dragging up or left.
    pub fn anchored(start: Point, end: Point) -> Self {
        Self::new(
            start.x,
            start.y,
            (start.x - end.x).abs(),
            (start.y - end.y).abs(),
        )
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right() && p.y >= self.top && p.y < self.bottom()
    }

    /// Move the rectangle inside `bounds`. A rectangle larger than `bounds` along an axis
    /// is centered on that axis instead.
    pub fn clamped_within(&self, bounds: Rect) -> Rect {
        let clamp_axis = |start: i32, len: i32, b_start: i32, b_len: i32| {
            if len >= b_len {
                b_start + b_len / 2 - len / 2
            } else if start < b_start {
                b_start
            } else if start + len > b_start + b_len {
                b_start + b_len - len
            } else {
                start
            }
        };
        Rect::new(
            clamp_axis(self.left, self.width, bounds.left, bounds.width),
            clamp_axis(self.top, self.height, bounds.top, bounds.height),
            self.width,
            self.height,
        )
    }
}

impl From<[i32; 4]> for Rect {
    fn from([left, top, width, height]: [i32; 4]) -> Self {
        Rect::new(left, top, width, height)
    }
}

impl From<Rect> for [i32; 4] {
    fn from(r: Rect) -> Self {
        [r.left, r.top, r.width, r.height]
    }
}

/// Scale `image` to the largest size that fits inside `window` while keeping its aspect
/// ratio. Dimensions are truncated toward zero.
pub fn fit_to_window(image: Size, window: Size) -> Size {
    if image.is_empty() {
        return Size::default();
    }
    let (iw, ih) = (image.width as i64, image.height as i64);
    let (ww, wh) = (window.width as i64, window.height as i64);
    if ww * ih <= wh * iw {
        Size::new(window.width, (ih * ww / iw) as i32)
    } else {
        Size::new((iw * wh / ih) as i32, window.height)
    }
}

/// How an image of a given size sits centered inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
    pub window: Size,
    pub image: Size,
}

impl Letterbox {
    pub fn new(window: Size, image: Size) -> Self {
        Self { window, image }
    }

    /// Top-left corner of the centered image.
    pub fn origin(&self) -> Point {
        self.image.centered_in(self.window)
    }

    fn scale_to(&self, other: &Letterbox) -> (f64, f64) {
        let sx = other.image.width as f64 / self.image.width.max(1) as f64;
        let sy = other.image.height as f64 / self.image.height.max(1) as f64;
        (sx, sy)
    }

    /// Map a window point on this letterboxed image to the same relative spot on `other`.
    pub fn map_point(&self, other: &Letterbox, p: Point) -> Point {
        let (sx, sy) = self.scale_to(other);
        let from = self.origin();
        let to = other.origin();
        Point::new(
            ((p.x - from.x) as f64 * sx + to.x as f64).round() as i32,
            ((p.y - from.y) as f64 * sy + to.y as f64).round() as i32,
        )
    }

    /// Map a rectangle: the corner moves like a point, the extent scales per axis.
    pub fn map_rect(&self, other: &Letterbox, r: Rect) -> Rect {
        let (sx, sy) = self.scale_to(other);
        let corner = self.map_point(other, r.top_left());
        Rect::new(
            corner.x,
            corner.y,
            (r.width as f64 * sx).round() as i32,
            (r.height as f64 * sy).round() as i32,
        )
    }
}

/// Thumbnail grid for the overview screen: `⌊√n⌋ + 1` rows and columns with a fixed
/// margin between and around the cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub count: usize,
    pub columns: i32,
    pub cell: Size,
}

pub const GRID_MARGIN: i32 = 10;

impl GridLayout {
    pub fn new(count: usize, window: Size) -> Self {
        let columns = (count as f64).sqrt() as i32 + 1;
        let rows = columns;
        let cell = Size::new(
            (window.width - GRID_MARGIN * (columns + 1)).div_euclid(columns),
            (window.height - GRID_MARGIN * (rows + 1)).div_euclid(rows),
        );
        Self {
            count,
            columns,
            cell,
        }
    }

    pub fn cell_rect(&self, index: usize) -> Rect {
        let col = index as i32 % self.columns;
        let row = index as i32 / self.columns;
        Rect::new(
            GRID_MARGIN + col * (self.cell.width + GRID_MARGIN),
            GRID_MARGIN + row * (self.cell.height + GRID_MARGIN),
            self.cell.width,
            self.cell.height,
        )
    }

    /// Index of the thumbnail under `p`. Cell edges count as inside.
    pub fn hit(&self, p: Point) -> Option<usize> {
        (0..self.count).find(|&i| {
            let r = self.cell_rect(i);
            p.x >= r.left && p.x <= r.right() && p.y >= r.top && p.y <= r.bottom()
        })
    }
}

/// Zoomed view of a slide: the image scaled by the zoom level and drawn so that a
/// window-sized crop centered on the zoom point fills the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomView {
    pub scaled: Size,
    /// Where the scaled image's top-left corner lands in the window.
    pub origin: Point,
}

pub fn zoom_view(image: Size, window: Size, zoom: f32, zoom_pos: Point) -> ZoomView {
    let scaled = image.scaled(zoom);
    let crop = Rect::new(
        (zoom_pos.x as f32 * zoom) as i32 - window.width / 2,
        (zoom_pos.y as f32 * zoom) as i32 - window.height / 2,
        window.width,
        window.height,
    )
    .clamped_within(Rect::from_origin(Point::default(), scaled));
    ZoomView {
        scaled,
        origin: Point::new(-crop.left, -crop.top),
    }
}

/// Rectangles covering `window` minus the union of `holes`, decomposed into horizontal
/// bands. Used to dim everything except highlighted regions.
pub fn dim_regions(window: Size, holes: &[Rect]) -> Vec<Rect> {
    let clip = |r: &Rect| {
        let left = r.left.max(0);
        let top = r.top.max(0);
        let right = r.right().min(window.width);
        let bottom = r.bottom().min(window.height);
        (right > left && bottom > top).then(|| Rect::new(left, top, right - left, bottom - top))
    };
    let holes: Vec<Rect> = holes.iter().filter_map(clip).collect();

    let mut edges = vec![0, window.height];
    for h in &holes {
        edges.push(h.top);
        edges.push(h.bottom());
    }
    edges.sort_unstable();
    edges.dedup();

    let mut out = Vec::new();
    for band in edges.windows(2) {
        let (y0, y1) = (band[0], band[1]);
        let mut spans: Vec<(i32, i32)> = holes
            .iter()
            .filter(|h| h.top <= y0 && h.bottom() >= y1)
            .map(|h| (h.left, h.right()))
            .collect();
        spans.sort_unstable();

        let mut x = 0;
        for (start, end) in spans {
            if start > x {
                out.push(Rect::new(x, y0, start - x, y1 - y0));
            }
            x = x.max(end);
        }
        if x < window.width {
            out.push(Rect::new(x, y0, window.width - x, y1 - y0));
        }
    }
    out
}
