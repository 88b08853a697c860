mod annotations;
mod app;
mod cli;
mod commands;
mod config;
mod geometry;
mod rasterizer;
mod render;
mod session;
mod theme;

use clap::Parser;
use colored::Colorize;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

fn main() {
    let cli = cli::Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.verbose, cli.quiet, cli.no_color);

    if let Err(e) = cli.run() {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool, no_color: bool) {
    let level = if quiet {
        LevelFilter::Warn
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    let color = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    // Already initialised is fine
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, color);
}
