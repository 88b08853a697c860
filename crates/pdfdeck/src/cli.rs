use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::app::StartOptions;

#[derive(Parser)]
#[command(name = "pdfdeck")]
#[command(author, version, about)]
#[command(long_about = "A full-screen PDF presenter with slide transitions and live annotations.\n\n\
    Transitions are read from <name>.json next to the PDF, annotations are saved to\n\
    <name>_annotations.json. Press H while presenting for the key list.\n\n\
    Examples:\n  \
    pdfdeck talk.pdf                          Present talk.pdf in a window\n  \
    pdfdeck talk.pdf --fullscreen             Present fullscreen\n  \
    pdfdeck talk.pdf --config_file fx.json    Use another transition file\n  \
    pdfdeck rasterize talk.pdf                Only rasterize the pages")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// PDF file to present
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Transition configuration (JSON) [default: <pdf-stem>.json]
    #[arg(long = "config_file", value_name = "JSON")]
    pub config_file: Option<PathBuf>,

    /// Start in fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Start on a specific slide (1-indexed)
    #[arg(long)]
    pub slide: Option<usize>,

    /// Start in the overview grid
    #[arg(long)]
    pub overview: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rasterize a PDF into one PNG per page
    Rasterize {
        /// PDF file to rasterize
        file: PathBuf,

        /// Output directory [default: <cache_dir>/<pdf-stem>]
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Target window width in pixels [default: from config]
        #[arg(long)]
        width: Option<u32>,

        /// Target window height in pixels [default: from config]
        #[arg(long)]
        height: Option<u32>,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.window_width, defaults.start_mode)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Rasterize {
                file,
                output_dir,
                width,
                height,
            }) => crate::commands::rasterize::run(file, output_dir, width, height),
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            None => {
                let Some(file) = self.file else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    anyhow::bail!("No PDF file given.");
                };
                if !file.exists() {
                    anyhow::bail!("PDF file '{}' does not exist.", file.display());
                }
                crate::app::run(
                    file,
                    StartOptions {
                        config_file: self.config_file,
                        fullscreen: self.fullscreen,
                        slide: self.slide,
                        overview: self.overview,
                    },
                )
            }
        }
    }
}
