use colored::Colorize;
use std::path::PathBuf;

use crate::config::Config;
use crate::geometry::Size;
use crate::rasterizer;

pub fn run(
    file: PathBuf,
    output_dir: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("PDF file '{}' does not exist.", file.display());
    }

    let config = Config::load_or_default();
    let window = config.window_size();
    let target = Size::new(
        width.map_or(window.width, |w| w as i32),
        height.map_or(window.height, |h| h as i32),
    );
    if target.is_empty() {
        anyhow::bail!("Target size must be positive, got {}x{}", target.width, target.height);
    }
    let output_dir =
        output_dir.unwrap_or_else(|| rasterizer::cache_dir_for(&config.cache_dir(), &file));

    eprintln!(
        "Rasterizing {} into {} ({}x{})",
        file.display(),
        output_dir.display(),
        target.width,
        target.height,
    );

    let pages = rasterizer::default_rasterizer().convert(&file, &output_dir, target)?;

    eprintln!("{} {} page(s)", "Done.".green().bold(), pages.len());
    Ok(())
}
