use anyhow::{Context as _, Result};
use eframe::egui::{self, ColorImage, TextureFilter, TextureHandle, TextureOptions};
use rayon::prelude::*;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::geometry::Size;

/// Rasterized pages on disk and the textures uploaded from them.
pub struct ImageCache {
    paths: Vec<PathBuf>,
    sizes: Vec<Size>,
    textures: RefCell<HashMap<usize, TextureHandle>>,
    failed: RefCell<HashSet<usize>>,
}

impl ImageCache {
    /// Index the page images. Only headers are read here; pixels are decoded on upload.
    pub fn open(paths: Vec<PathBuf>) -> Result<Self> {
        let sizes = paths
            .iter()
            .map(|path| {
                let (w, h) = image::image_dimensions(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(Size::new(w as i32, h as i32))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            paths,
            sizes,
            textures: RefCell::new(HashMap::new()),
            failed: RefCell::new(HashSet::new()),
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Natural pixel size of every page.
    pub fn sizes(&self) -> &[Size] {
        &self.sizes
    }

    /// Decode all pages in parallel and upload them, so that no frame stalls on a decode.
    pub fn preload(&self, ctx: &egui::Context) {
        let decoded: Vec<(usize, Result<ColorImage>)> = self
            .paths
            .par_iter()
            .enumerate()
            .map(|(page, path)| (page, decode(path)))
            .collect();

        let mut textures = self.textures.borrow_mut();
        for (page, image) in decoded {
            match image {
                Ok(image) => {
                    textures.insert(page, upload(ctx, page, image));
                }
                Err(e) => {
                    log::warn!("{e:#}");
                    self.failed.borrow_mut().insert(page);
                }
            }
        }
        log::debug!("Uploaded {} page textures", textures.len());
    }

    pub fn get_or_load(&self, ctx: &egui::Context, page: usize) -> Option<TextureHandle> {
        if let Some(texture) = self.textures.borrow().get(&page) {
            return Some(texture.clone());
        }
        if self.failed.borrow().contains(&page) {
            return None;
        }
        let path = self.paths.get(page)?;
        match decode(path) {
            Ok(image) => {
                let texture = upload(ctx, page, image);
                self.textures.borrow_mut().insert(page, texture.clone());
                Some(texture)
            }
            Err(e) => {
                log::warn!("{e:#}");
                self.failed.borrow_mut().insert(page);
                None
            }
        }
    }
}

fn decode(path: &Path) -> Result<ColorImage> {
    let rgba = image::open(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?
        .into_rgba8();
    let (w, h) = rgba.dimensions();
    Ok(ColorImage::from_rgba_unmultiplied(
        [w as usize, h as usize],
        rgba.as_raw(),
    ))
}

fn upload(ctx: &egui::Context, page: usize, image: ColorImage) -> TextureHandle {
    // Pages are rasterized at twice the window size, so they are mostly drawn shrunk
    let options = TextureOptions {
        mipmap_mode: Some(TextureFilter::Linear),
        ..TextureOptions::LINEAR
    };
    ctx.load_texture(format!("page_{page}"), image, options)
}
