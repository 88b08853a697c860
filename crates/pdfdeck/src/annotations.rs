//! Text boxes and pen strokes drawn over slides, stored per page in window coordinates.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::geometry::{Letterbox, Point, Rect};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub rect: Rect,
    pub text: String,
}

/// A freehand stroke. Serialized as a bare list of `[x, y]` points.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PenStroke {
    pub points: Vec<Point>,
}

impl PenStroke {
    /// Strokes need at least two points to be kept.
    pub fn is_drawable(&self) -> bool {
        self.points.len() > 1
    }
}

/// All annotations of a deck, keyed by page index. The JSON form keys pages by their
/// index written as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationStore {
    #[serde(rename = "text_annotations", default)]
    pub text: BTreeMap<usize, Vec<TextAnnotation>>,
    #[serde(rename = "pen_annotations", default)]
    pub pen: BTreeMap<usize, Vec<PenStroke>>,
}

impl AnnotationStore {
    /// `<stem>_annotations.json` next to the PDF.
    pub fn path_for(pdf: &Path) -> PathBuf {
        let stem = pdf
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        pdf.with_file_name(format!("{stem}_annotations.json"))
    }

    /// Load a saved store. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No saved annotations at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let store: AnnotationStore = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid annotations file {}", path.display()))?;
        log::info!(
            "Loaded {} text boxes and {} pen strokes from {}",
            store.text.values().map(Vec::len).sum::<usize>(),
            store.pen.values().map(Vec::len).sum::<usize>(),
            path.display()
        );
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if self.is_empty() {
            log::info!("Cleared annotations in {}", path.display());
        } else {
            log::info!("Annotations saved to {}", path.display());
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.text.values().all(Vec::is_empty) && self.pen.values().all(Vec::is_empty)
    }

    pub fn texts(&self, page: usize) -> &[TextAnnotation] {
        self.text.get(&page).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn strokes(&self, page: usize) -> &[PenStroke] {
        self.pen.get(&page).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn add_text(&mut self, page: usize, annotation: TextAnnotation) {
        self.text.entry(page).or_default().push(annotation);
    }

    /// Store `stroke` unless it is too short to draw.
    pub fn add_stroke(&mut self, page: usize, stroke: PenStroke) -> bool {
        if !stroke.is_drawable() {
            return false;
        }
        self.pen.entry(page).or_default().push(stroke);
        true
    }

    /// Remove and return the first text box on `page` containing `at`.
    pub fn take_text_at(&mut self, page: usize, at: Point) -> Option<TextAnnotation> {
        let list = self.text.get_mut(&page)?;
        let index = list.iter().position(|a| a.rect.contains(at))?;
        Some(list.remove(index))
    }

    /// Move every coordinate so it keeps its place on the page image. `boxes` gives, for a
    /// page, how that page was laid out before and how it is laid out now.
    pub fn rescale(&mut self, mut boxes: impl FnMut(usize) -> (Letterbox, Letterbox)) {
        for (&page, list) in self.text.iter_mut() {
            let (from, to) = boxes(page);
            for a in list.iter_mut() {
                a.rect = from.map_rect(&to, a.rect);
            }
        }
        for (&page, strokes) in self.pen.iter_mut() {
            let (from, to) = boxes(page);
            for stroke in strokes.iter_mut() {
                for p in stroke.points.iter_mut() {
                    *p = from.map_point(&to, *p);
                }
            }
        }
    }

    pub fn rescaled(&self, boxes: impl FnMut(usize) -> (Letterbox, Letterbox)) -> Self {
        let mut copy = self.clone();
        copy.rescale(boxes);
        copy
    }
}

/// Break `text` into lines no wider than `max_width`. Words are separated by single
/// spaces; a word wider than the box on its own is dropped.
pub fn wrap_words(text: &str, max_width: f32, width_of: impl Fn(&str) -> f32) -> Vec<String> {
    let space = width_of(" ");
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0;
    let mut started = false;

    for word in text.split(' ') {
        let w = width_of(word);
        if w > max_width {
            continue;
        }
        if !started {
            line.push_str(word);
            line_width = w;
            started = true;
        } else if line_width + space + w <= max_width {
            line.push(' ');
            line.push_str(word);
            line_width += space + w;
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
            line_width = w;
        }
    }
    if started {
        lines.push(line);
    }
    lines
}

/// Height a text box needs to show `text` wrapped to its width.
pub fn fitted_height(
    text: &str,
    max_width: f32,
    line_height: f32,
    width_of: impl Fn(&str) -> f32,
) -> i32 {
    (wrap_words(text, max_width, width_of).len() as f32 * line_height).round() as i32
}
