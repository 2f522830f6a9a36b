//! gemtui — match-3 tile puzzle game in the terminal.

mod app;
mod board;
mod game;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use game::EngineOptions;

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let options = EngineOptions {
        rows: args.rows as usize,
        cols: args.cols as usize,
        palette_len: args.colors,
        anim_speed: args.anim_speed,
        match_pause: args.match_pause_ms as f32 / 1000.0,
    };
    let mut app = App::new(args, options, theme);
    app.run()?;
    Ok(())
}

/// Match-3 tile puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "gemtui",
    version,
    about = "Bejeweled-style match-3 puzzle in the terminal. Swap adjacent tiles to line up three of a colour.",
    long_about = "Gemtui is a terminal match-3 puzzle game.\n\n\
        Select a tile, then an adjacent one, to swap them. A swap that lines up three or more \
        same-coloured tiles clears them; the tiles above fall down and fresh ones drop in from \
        the top, chaining further matches. A swap that matches nothing swaps back.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor   Enter/Space  Select / swap\n  Mouse click    Select / swap  R            New board\n  Q / Esc        Quit menu\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme), --seed for a reproducible board."
)]
pub struct Args {
    /// Board height in rows.
    #[arg(short = 'r', long, default_value = "8", value_name = "ROWS", value_parser = clap::value_parser!(u16).range(3..=32))]
    pub rows: u16,

    /// Board width in columns.
    #[arg(short = 'c', long, default_value = "8", value_name = "COLS", value_parser = clap::value_parser!(u16).range(3..=32))]
    pub cols: u16,

    /// Number of tile colours. Fewer colours means more matches and longer chains.
    #[arg(long, default_value = "6", value_name = "N", value_parser = clap::value_parser!(u8).range(3..=8))]
    pub colors: u8,

    /// Seed for the board and refills. Random when not set.
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Tile animation speed: fraction of the remaining distance covered per second.
    #[arg(long, default_value = "10.0", value_name = "SPEED")]
    pub anim_speed: f32,

    /// How long matched tiles stay highlighted before they clear, in ms.
    #[arg(long, default_value = "250", value_name = "MS")]
    pub match_pause_ms: u64,

    /// Disable the match-clear fade effect (tiles still animate their moves).
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,
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
