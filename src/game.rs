//! Engine: turn state machine and cascade resolver around the board.
//!
//! External collaborators drive it with two commands — `activate_cell` from
//! the input layer and `tick` from the frame loop — and read tile snapshots
//! back for rendering. Nothing in here blocks: waiting for animation or for
//! the match-visible pause is a per-tick poll.

use crate::board::{Board, Tile};
use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Engine construction parameters. No process-wide singleton: tests build as
/// many independent instances as they like.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub rows: usize,
    pub cols: usize,
    /// Palette size; at least 3 so rejection sampling can always succeed.
    pub palette_len: u8,
    /// Interpolation speed: fraction of remaining distance covered per second.
    pub anim_speed: f32,
    /// How long matched tiles stay visible before gravity sweeps them
    /// (seconds). Pacing only, no effect on the resulting board.
    pub match_pause: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 8,
            palette_len: 6,
            anim_speed: 10.0,
            match_pause: 0.25,
        }
    }
}

/// Where the turn lifecycle currently is. Activations are accepted in `Idle`
/// only; everywhere else they are dropped, not queued.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    /// A swap was performed; waiting for the exchange animation to settle
    /// before scanning. `reverting` marks the return trip of a failed move.
    AnimatingSwap {
        a: (usize, usize),
        b: (usize, usize),
        reverting: bool,
    },
    /// Cascade in flight: hold the marked tiles on screen, sweep them with
    /// gravity, wait for the fall to settle, rescan, repeat until clean.
    AnimatingCascade { pause_left: f32, falling: bool },
}

/// One game session: a board plus the turn state machine over it.
pub struct Game {
    pub board: Board,
    opts: EngineOptions,
    rng: Pcg32,
    phase: Phase,
    selected: Option<(usize, usize)>,
}

impl Game {
    pub fn new(opts: EngineOptions, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let board = Board::new(opts.rows, opts.cols, opts.palette_len, &mut rng);
        Self {
            board,
            opts,
            rng,
            phase: Phase::Idle,
            selected: None,
        }
    }

    /// Read view for the renderer: all tiles, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.board.tiles()
    }

    /// True while a swap or cascade is in flight or any tile is still gliding
    /// to its cell. While true, activations are dropped.
    pub fn is_animating(&self) -> bool {
        self.phase != Phase::Idle || self.board.is_animating()
    }

    /// Currently selected cell, if any (only ever set while idle).
    pub fn selected(&self) -> Option<(usize, usize)> {
        self.selected
    }

    /// A cell was activated (clicked or cursor-confirmed) at (row, col).
    /// No-op when out of bounds or while input is locked.
    pub fn activate_cell(&mut self, row: usize, col: usize) {
        if self.phase != Phase::Idle {
            return;
        }
        if self.board.get(row, col).is_none() {
            return;
        }
        match self.selected {
            None => self.select(row, col),
            Some(sel) if sel == (row, col) => self.deselect(),
            Some(sel) if is_adjacent(sel, (row, col)) => {
                self.deselect();
                // Both cells were just bounds-checked, so the swap cannot
                // fail; an Err here would be an engine bug, not bad input.
                if self.board.swap(sel, (row, col)).is_ok() {
                    self.phase = Phase::AnimatingSwap {
                        a: sel,
                        b: (row, col),
                        reverting: false,
                    };
                }
            }
            Some(_) => {
                // Not a neighbor: treat it as picking a new tile.
                self.deselect();
                self.select(row, col);
            }
        }
    }

    /// Advance one frame: move every tile's interpolation, then step the turn
    /// state machine. `dt` is seconds since the previous tick, non-negative.
    pub fn tick(&mut self, dt: f32) {
        self.board.update(dt, self.opts.anim_speed);

        self.phase = match self.phase {
            Phase::Idle => Phase::Idle,

            Phase::AnimatingSwap { a, b, reverting } => {
                if self.board.is_animating() {
                    Phase::AnimatingSwap { a, b, reverting }
                } else if reverting {
                    Phase::Idle
                } else if self.board.scan() {
                    Phase::AnimatingCascade {
                        pause_left: self.opts.match_pause,
                        falling: false,
                    }
                } else {
                    // Unsuccessful move: exchange back and wait out the
                    // return trip. Cannot fail for the same reason as above.
                    let _ = self.board.swap(a, b);
                    Phase::AnimatingSwap {
                        a,
                        b,
                        reverting: true,
                    }
                }
            }

            Phase::AnimatingCascade {
                pause_left,
                falling,
            } => {
                if falling {
                    if self.board.is_animating() {
                        Phase::AnimatingCascade {
                            pause_left,
                            falling,
                        }
                    } else if self.board.scan() {
                        // The refill formed new runs: another round.
                        Phase::AnimatingCascade {
                            pause_left: self.opts.match_pause,
                            falling: false,
                        }
                    } else {
                        Phase::Idle
                    }
                } else {
                    let left = pause_left - dt;
                    if left > 0.0 {
                        Phase::AnimatingCascade {
                            pause_left: left,
                            falling: false,
                        }
                    } else {
                        // Pause over: clear the marked tiles and let the
                        // columns fall. Columns are independent, so a single
                        // settle wait covers them all.
                        self.board.apply_gravity(&mut self.rng);
                        Phase::AnimatingCascade {
                            pause_left: 0.0,
                            falling: true,
                        }
                    }
                }
            }
        };
    }

    fn select(&mut self, row: usize, col: usize) {
        self.board.set_selected(row, col, true);
        self.selected = Some((row, col));
    }

    fn deselect(&mut self) {
        if let Some((row, col)) = self.selected.take() {
            self.board.set_selected(row, col, false);
        }
    }

    #[cfg(test)]
    fn with_board(board: Board, opts: EngineOptions, seed: u64) -> Self {
        Self {
            board,
            opts,
            rng: Pcg32::seed_from_u64(seed),
            phase: Phase::Idle,
            selected: None,
        }
    }
}

/// Grid adjacency: Manhattan distance exactly 1.
fn is_adjacent(a: (usize, usize), b: (usize, usize)) -> bool {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1) == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> EngineOptions {
        EngineOptions::default()
    }

    fn color_grid(game: &Game) -> Vec<Vec<u8>> {
        (0..game.board.rows)
            .map(|r| {
                (0..game.board.cols)
                    .map(|c| game.board.get(r, c).unwrap().color)
                    .collect()
            })
            .collect()
    }

    /// Drive ticks until the engine is idle and every tile has settled.
    fn run_until_idle(game: &mut Game) {
        for _ in 0..10_000 {
            if !game.is_animating() {
                return;
            }
            game.tick(0.05);
        }
        panic!("engine did not settle");
    }

    /// 3x3 latin square: no runs, and no swap of two neighbors creates one.
    fn quiet_board() -> Board {
        Board::from_colors(&[vec![0, 1, 2], vec![1, 2, 0], vec![2, 0, 1]], 3)
    }

    /// 8x8 matchless board where swapping (0, 2) with (1, 2) turns the first
    /// three tiles of row 0 into a run of color 0.
    fn primed_board() -> Board {
        let mut colors: Vec<Vec<u8>> = (0..8)
            .map(|r| (0..8).map(|c| ((r + c) % 3) as u8).collect())
            .collect();
        colors[0][1] = 0;
        // Keep (0, 3) off-color so the post-swap run is exactly three long.
        colors[0][3] = 1;
        let mut board = Board::from_colors(&colors, 6);
        assert!(!board.scan(), "primed board must start matchless");
        board
    }

    #[test]
    fn select_toggle_and_reselect() {
        let mut game = Game::with_board(quiet_board(), opts(), 1);
        game.activate_cell(0, 0);
        assert_eq!(game.selected(), Some((0, 0)));
        assert!(game.board.get(0, 0).unwrap().is_selected);

        // Activating the same cell again deselects.
        game.activate_cell(0, 0);
        assert_eq!(game.selected(), None);
        assert!(!game.board.get(0, 0).unwrap().is_selected);

        // A non-adjacent activation replaces the selection, never swaps.
        let before = color_grid(&game);
        game.activate_cell(0, 0);
        game.activate_cell(2, 2);
        assert_eq!(game.selected(), Some((2, 2)));
        assert!(!game.board.get(0, 0).unwrap().is_selected);
        assert!(game.board.get(2, 2).unwrap().is_selected);
        assert_eq!(color_grid(&game), before);
        assert!(!game.is_animating());
    }

    #[test]
    fn activation_out_of_bounds_is_ignored() {
        let mut game = Game::with_board(quiet_board(), opts(), 1);
        game.activate_cell(9, 9);
        assert_eq!(game.selected(), None);
    }

    #[test]
    fn at_most_one_tile_selected() {
        let mut game = Game::with_board(quiet_board(), opts(), 1);
        game.activate_cell(0, 0);
        game.activate_cell(2, 2);
        game.activate_cell(1, 1);
        let selected: Vec<_> = game.tiles().filter(|t| t.is_selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!((selected[0].row, selected[0].col), (1, 1));
    }

    #[test]
    fn no_match_swap_reverts_bit_for_bit() {
        let mut game = Game::with_board(quiet_board(), opts(), 1);
        let before = color_grid(&game);

        game.activate_cell(1, 0);
        game.activate_cell(1, 1);
        assert!(game.is_animating(), "swap should lock input");
        run_until_idle(&mut game);

        assert_eq!(color_grid(&game), before);
        assert_eq!(game.selected(), None);
        assert!(game.tiles().all(|t| !t.is_matched && !t.is_selected));
    }

    #[test]
    fn input_is_dropped_while_animating() {
        let mut game = Game::with_board(quiet_board(), opts(), 1);
        game.activate_cell(1, 0);
        game.activate_cell(1, 1);
        assert!(game.is_animating());

        // Dropped, not queued.
        game.activate_cell(0, 0);
        game.activate_cell(2, 2);
        assert_eq!(game.selected(), None);

        run_until_idle(&mut game);
        assert_eq!(game.selected(), None);
    }

    #[test]
    fn swap_deselects_immediately() {
        let mut game = Game::with_board(primed_board(), opts(), 1);
        game.activate_cell(0, 2);
        game.activate_cell(1, 2);
        assert!(game.tiles().all(|t| !t.is_selected));
    }

    #[test]
    fn matching_swap_cascades_to_a_clean_board() {
        let mut game = Game::with_board(primed_board(), opts(), 42);
        game.activate_cell(0, 2);
        game.activate_cell(1, 2);
        run_until_idle(&mut game);

        // Cell uniqueness and coordinate sync survive the cascade.
        assert_eq!(game.tiles().count(), 64);
        for r in 0..8 {
            for c in 0..8 {
                let tile = game.board.get(r, c).unwrap();
                assert_eq!((tile.row, tile.col), (r, c));
                assert_eq!((tile.visual_x, tile.visual_y), (c as f32, r as f32));
            }
        }
        // Idle matchlessness is restored.
        assert!(!game.board.scan());
        assert!(game.tiles().all(|t| !t.is_matched && !t.is_selected));
    }

    #[test]
    fn matched_tiles_stay_visible_through_the_pause() {
        let mut game = Game::with_board(primed_board(), opts(), 42);
        game.activate_cell(0, 2);
        game.activate_cell(1, 2);

        // Let the swap settle; the scan that follows marks the run and the
        // engine holds it on screen for the match pause.
        for _ in 0..200 {
            game.tick(0.01);
            if game.tiles().any(|t| t.is_matched) {
                break;
            }
        }
        let marked: Vec<_> = game
            .tiles()
            .filter(|t| t.is_matched)
            .map(|t| (t.row, t.col))
            .collect();
        assert_eq!(marked, vec![(0, 0), (0, 1), (0, 2)]);

        // Still marked on the next tick inside the pause window.
        game.tick(0.01);
        assert_eq!(game.tiles().filter(|t| t.is_matched).count(), 3);
    }

    #[test]
    fn tick_with_zero_dt_is_harmless() {
        let mut game = Game::with_board(quiet_board(), opts(), 1);
        game.tick(0.0);
        game.activate_cell(1, 0);
        game.activate_cell(1, 1);
        game.tick(0.0);
        assert!(game.is_animating());
        run_until_idle(&mut game);
        assert!(!game.is_animating());
    }

    #[test]
    fn seeded_games_are_reproducible() {
        let a = Game::new(opts(), 1234);
        let b = Game::new(opts(), 1234);
        let grid = |g: &Game| -> Vec<u8> { g.tiles().map(|t| t.color).collect() };
        assert_eq!(grid(&a), grid(&b));
    }

    #[test]
    fn new_game_starts_settled_and_matchless() {
        let mut game = Game::new(opts(), 99);
        assert!(!game.is_animating());
        assert!(!game.board.scan());
    }

    #[test]
    fn adjacency_is_manhattan_distance_one() {
        assert!(is_adjacent((2, 2), (1, 2)));
        assert!(is_adjacent((2, 2), (2, 3)));
        assert!(!is_adjacent((2, 2), (2, 2)));
        assert!(!is_adjacent((2, 2), (1, 1)));
        assert!(!is_adjacent((2, 2), (4, 2)));
    }
}
