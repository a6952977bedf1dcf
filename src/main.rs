//! duofall: two-player falling-blocks arcade toy in the terminal.

mod app;
mod game;
mod gamepad;
mod input;
mod logging;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use thiserror::Error;
use tracing::{info, warn};

/// Largest board side accepted on the command line.
pub const MAX_BOARD_SIDE: u16 = 40;

/// Validated options that drive the boards and the tick loop.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub rows: u16,
    pub cols: u16,
    pub tick_rate: f64,
    pub spawn_threshold: usize,
    pub spawn_chance: f64,
    pub special_chance: f64,
    pub high_color: bool,
    pub match_clear: bool,
    pub seed: Option<u64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be between 1 and {max}, got {value}")]
    BoardSize { name: &'static str, value: u16, max: u16 },
    #[error("{name} must be a probability in 0.0..=1.0, got {value}")]
    Probability { name: &'static str, value: f64 },
    #[error("tick rate must be a positive number of ticks per second, got {0}")]
    TickRate(f64),
}

fn check_side(name: &'static str, value: u16) -> Result<u16, ConfigError> {
    if (1..=MAX_BOARD_SIDE).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::BoardSize {
            name,
            value,
            max: MAX_BOARD_SIDE,
        })
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Probability { name, value })
    }
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if !(args.tick_rate.is_finite() && args.tick_rate > 0.0) {
            return Err(ConfigError::TickRate(args.tick_rate));
        }
        Ok(Self {
            rows: check_side("rows", args.rows)?,
            cols: check_side("cols", args.cols)?,
            tick_rate: args.tick_rate,
            spawn_threshold: args.spawn_threshold,
            spawn_chance: check_probability("spawn chance", args.spawn_chance)?,
            special_chance: check_probability("special chance", args.special_chance)?,
            high_color: args.high_color,
            match_clear: args.match_clear,
            seed: args.seed,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = GameConfig::from_args(&args).context("invalid options")?;

    logging::init(args.log_file.as_deref())?;
    info!(?config, "starting duofall");

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!("theme not loaded, using defaults: {e}");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });

    let mut app = App::new(&args, config, theme);
    app.run()?;
    info!("bye");
    Ok(())
}

/// Two-player falling-blocks arcade toy in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "duofall",
    version,
    about = "Two-player falling-blocks arcade toy in the terminal. Columns of coloured blocks arrive from the right of each board, fall and stack.",
    long_about = "duofall runs two boards side by side. Every tick each board's blocks fall one row; \
        a board holding too few blocks gets a fresh column in the staging lane right of its grid. \
        Player one shifts every block on their board left or right.\n\n\
        CONTROLS:\n  Left/Right or h/l  Shift player one's blocks (or a gamepad's left stick / D-pad)\n  \
        Enter              Player one ready (gamepad: Start or South)\n  e                  Player two ready\n  \
        P                  Pause\n  Q / Esc / Ctrl-C   Quit\n\n\
        Logs go to a file (see --log-file); set RUST_LOG=debug for more detail."
)]
pub struct Args {
    /// Rows per board.
    #[arg(long, default_value = "12", value_name = "ROWS")]
    pub rows: u16,

    /// Columns per board (the staging lane is extra).
    #[arg(long, default_value = "8", value_name = "COLS")]
    pub cols: u16,

    /// Game ticks per second (fall speed). Frames are drawn at ~60 per second regardless.
    #[arg(long, default_value = "8.0", value_name = "RATE")]
    pub tick_rate: f64,

    /// A board spawns a new column on ticks where it holds fewer blocks than this.
    #[arg(long, default_value = "20", value_name = "N")]
    pub spawn_threshold: usize,

    /// Chance that each row of a new column gets a block.
    #[arg(long, default_value = "0.5", value_name = "P")]
    pub spawn_chance: f64,

    /// Chance that a row left empty by the spawn draw gets a special item instead.
    #[arg(long, default_value = "0.0", value_name = "P")]
    pub special_chance: f64,

    /// Spawn all six colours (red, green, blue, yellow, purple, orange) instead of three.
    #[arg(long)]
    pub high_color: bool,

    /// Remove runs of three or more same-coloured blocks in a row or column.
    #[arg(long)]
    pub match_clear: bool,

    /// Seed for the block spawner, for reproducible games.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]="value").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Skip the ready screen and start immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the fade on cleared blocks.
    #[arg(long)]
    pub no_animation: bool,

    /// Log file. Defaults to duofall.log in the user cache directory.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
