use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> anyhow::Result<()> {
    let path = Config::path()?;
    let config = Config::load_or_default();

    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("{}", "(not created yet, showing defaults)".dimmed());
    }
    println!();

    let size = config.window_size();
    let start = config
        .defaults
        .as_ref()
        .and_then(|d| d.start_mode.clone())
        .unwrap_or_else(|| "first".to_string());
    println!("  {:<26} {}", "defaults.window_width".cyan(), size.width);
    println!("  {:<26} {}", "defaults.window_height".cyan(), size.height);
    println!(
        "  {:<26} {}",
        "defaults.spotlight_radius".cyan(),
        config.spotlight_radius()
    );
    println!("  {:<26} {}", "defaults.start_mode".cyan(), start);
    println!(
        "  {:<26} {}",
        "defaults.cache_dir".cyan(),
        config.cache_dir().display()
    );
    Ok(())
}

fn set(key: &str, value: &str) -> anyhow::Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!("{} {key} = {value}", "Set".green().bold());
    println!("{}", format!("Saved to {}", path.display()).dimmed());
    Ok(())
}
