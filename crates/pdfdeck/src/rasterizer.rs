//! Turning a PDF into one PNG per page.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::geometry::Size;

/// Pages are rendered at twice the size that fits the window.
#[cfg(any(feature = "pdf", test))]
pub const OVERSAMPLE: f32 = 2.0;

pub trait Rasterizer {
    /// Write every page of `pdf` into `output_dir`, returning the image paths in page order.
    fn convert(&self, pdf: &Path, output_dir: &Path, target: Size) -> Result<Vec<PathBuf>>;
}

pub fn page_path(dir: &Path, page: usize) -> PathBuf {
    dir.join(format!("page_{page}.png"))
}

/// Directory under `cache_root` holding the pages of `pdf`.
pub fn cache_dir_for(cache_root: &Path, pdf: &Path) -> PathBuf {
    let stem = pdf.file_stem().unwrap_or_default();
    cache_root.join(stem)
}

/// Render scale for a page of `page_width` x `page_height` points.
#[cfg(any(feature = "pdf", test))]
pub fn zoom_factor(page_width: f32, page_height: f32, target: Size) -> f32 {
    let sx = target.width as f32 / page_width;
    let sy = target.height as f32 / page_height;
    sx.min(sy) * OVERSAMPLE
}

/// Uses pages rasterized earlier instead of reading the PDF.
pub struct CachedPages;

impl Rasterizer for CachedPages {
    fn convert(&self, pdf: &Path, output_dir: &Path, _target: Size) -> Result<Vec<PathBuf>> {
        let pages: Vec<PathBuf> = (0..)
            .map(|page| page_path(output_dir, page))
            .take_while(|path| path.exists())
            .collect();
        if pages.is_empty() {
            anyhow::bail!(
                "No rasterized pages for {} in {}. Rebuild with `--features pdf` to rasterize PDFs.",
                pdf.display(),
                output_dir.display()
            );
        }
        log::info!(
            "Using {} cached page(s) from {}",
            pages.len(),
            output_dir.display()
        );
        Ok(pages)
    }
}

#[cfg(feature = "pdf")]
pub struct MupdfRasterizer;

#[cfg(feature = "pdf")]
impl Rasterizer for MupdfRasterizer {
    fn convert(&self, pdf: &Path, output_dir: &Path, target: Size) -> Result<Vec<PathBuf>> {
        use mupdf::{Colorspace, Document, Matrix};

        let pdf_err = |e: mupdf::Error| anyhow::anyhow!("{}: {e}", pdf.display());
        let doc = Document::open(pdf.to_string_lossy().as_ref()).map_err(pdf_err)?;
        let count = doc.page_count().map_err(pdf_err)?.max(0) as usize;
        std::fs::create_dir_all(output_dir)?;

        let rgb = Colorspace::device_rgb();
        let mut pages = Vec::with_capacity(count);
        for page_num in 0..count {
            let page = doc.load_page(page_num as i32).map_err(pdf_err)?;
            let bounds = page.bounds().map_err(pdf_err)?;
            let zoom = zoom_factor(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0, target);
            let pixmap = page
                .to_pixmap(&Matrix::new_scale(zoom, zoom), &rgb, false, false)
                .map_err(pdf_err)?;

            let n = pixmap.n() as usize;
            let width = pixmap.width() as usize;
            let height = pixmap.height() as usize;
            let stride = pixmap.stride() as usize;
            let samples = pixmap.samples();
            if n < 3 || width * n > stride || samples.len() < stride * height {
                anyhow::bail!("Unexpected pixmap layout for page {}", page_num + 1);
            }
            let mut rgb_bytes = Vec::with_capacity(width * height * 3);
            for y in 0..height {
                let row = &samples[y * stride..y * stride + width * n];
                for px in row.chunks_exact(n) {
                    rgb_bytes.extend_from_slice(&px[..3]);
                }
            }

            let path = page_path(output_dir, page_num);
            image::save_buffer(
                &path,
                &rgb_bytes,
                width as u32,
                height as u32,
                image::ColorType::Rgb8,
            )?;
            log::debug!("Rasterized page {}/{count} at {zoom:.2}x", page_num + 1);
            pages.push(path);
        }
        log::info!(
            "Rasterized {count} page(s) of {} into {}",
            pdf.display(),
            output_dir.display()
        );
        Ok(pages)
    }
}

/// MuPDF when built with the `pdf` feature, the page cache otherwise.
pub fn default_rasterizer() -> Box<dyn Rasterizer> {
    #[cfg(feature = "pdf")]
    {
        Box::new(MupdfRasterizer)
    }
    #[cfg(not(feature = "pdf"))]
    {
        Box::new(CachedPages)
    }
}
