//! Board: tile matrix, match scan, gravity/refill, visual interpolation.

use rand::Rng;
use thiserror::Error;

/// Snap threshold in cell units: once the remaining distance on an axis drops
/// below this, the axis locks onto its target so tiles don't jitter forever.
pub const SNAP_DISTANCE: f32 = 0.02;

/// One colored tile. `row`/`col` are the logical cell; `visual_x`/`visual_y`
/// are the animated position in cell units, converging toward (col, row).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub row: usize,
    pub col: usize,
    /// Palette index. Never changes for the life of the tile.
    pub color: u8,
    pub visual_x: f32,
    pub visual_y: f32,
    /// Set by a scan that found a run; consumed by the next gravity pass.
    pub is_matched: bool,
    pub is_selected: bool,
}

impl Tile {
    fn new(row: usize, col: usize, color: u8) -> Self {
        Self {
            row,
            col,
            color,
            visual_x: col as f32,
            visual_y: row as f32,
            is_matched: false,
            is_selected: false,
        }
    }

    /// Move the visual position toward the cell implied by `row`/`col`,
    /// covering a `speed` fraction of the remaining distance per second.
    /// Returns whether the tile is still in motion on either axis.
    pub fn update(&mut self, dt: f32, speed: f32) -> bool {
        let target_x = self.col as f32;
        let target_y = self.row as f32;
        // Never cover more than the full remaining distance in one step.
        let t = (speed * dt).min(1.0);

        let dx = target_x - self.visual_x;
        if dx.abs() > SNAP_DISTANCE {
            self.visual_x += dx * t;
        } else {
            self.visual_x = target_x;
        }

        let dy = target_y - self.visual_y;
        if dy.abs() > SNAP_DISTANCE {
            self.visual_y += dy * t;
        } else {
            self.visual_y = target_y;
        }

        self.in_motion()
    }

    /// True while the visual position still differs from the logical cell.
    #[inline]
    pub fn in_motion(&self) -> bool {
        self.visual_x != self.col as f32 || self.visual_y != self.row as f32
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("no tile on the board at ({row}, {col})")]
    TileNotOnBoard { row: usize, col: usize },
}

/// The tile matrix. Every cell holds exactly one live tile; empty cells exist
/// only transiently inside [`Board::apply_gravity`].
#[derive(Debug, Clone)]
pub struct Board {
    pub rows: usize,
    pub cols: usize,
    palette_len: u8,
    /// cells[row][col]. The matrix is the single source of truth for logical
    /// position; tiles' stored row/col are kept in sync through `place`.
    cells: Vec<Vec<Tile>>,
}

impl Board {
    /// Fill the matrix row by row, column by column, rejecting any color that
    /// would complete a run of 3 with the two tiles to the left or the two
    /// above. The board is therefore matchless from the start without a scan.
    pub fn new(rows: usize, cols: usize, palette_len: u8, rng: &mut impl Rng) -> Self {
        let mut board = Self {
            rows,
            cols,
            palette_len,
            cells: Vec::with_capacity(rows),
        };
        for r in 0..rows {
            let mut row: Vec<Tile> = Vec::with_capacity(cols);
            for c in 0..cols {
                let left = (c >= 2).then(|| (row[c - 1].color, row[c - 2].color));
                let above = (r >= 2).then(|| (board.cells[r - 1][c].color, board.cells[r - 2][c].color));
                let color = pick_color_no_run(palette_len, left, above, rng);
                row.push(Tile::new(r, c, color));
            }
            board.cells.push(row);
        }
        board
    }

    /// Bounds-checked lookup; `None` for out-of-range coordinates.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<&Tile> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// All tiles in row-major order, stable across calls barring mutation.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().flatten()
    }

    pub(crate) fn set_selected(&mut self, row: usize, col: usize, selected: bool) {
        if let Some(tile) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            tile.is_selected = selected;
        }
    }

    /// The only writer of a tile's stored row/col: moves the tile into the
    /// given matrix slot and syncs its logical coordinates in the same step.
    /// The visual position is left alone so the interpolator animates the move.
    fn place(&mut self, mut tile: Tile, row: usize, col: usize) {
        tile.row = row;
        tile.col = col;
        self.cells[row][col] = tile;
    }

    /// Exchange the tiles at two cells. Purely logical: the swapped tiles keep
    /// their visual positions and glide to the new cells over following ticks.
    pub fn swap(&mut self, a: (usize, usize), b: (usize, usize)) -> Result<(), BoardError> {
        for &(row, col) in &[a, b] {
            if self.get(row, col).is_none() {
                return Err(BoardError::TileNotOnBoard { row, col });
            }
        }
        let tile_a = self.cells[a.0][a.1];
        let tile_b = self.cells[b.0][b.1];
        self.place(tile_a, b.0, b.1);
        self.place(tile_b, a.0, a.1);
        Ok(())
    }

    /// Mark every tile that sits in a horizontal or vertical run of 3 or more
    /// same-colored tiles. Runs longer than 3 are covered by the overlapping
    /// 3-windows; no special casing. Returns whether anything was marked.
    /// Idempotent: rescanning an unchanged board marks the same set.
    pub fn scan(&mut self) -> bool {
        for tile in self.cells.iter_mut().flatten() {
            tile.is_matched = false;
        }
        let mut found = false;

        for r in 0..self.rows {
            for c in 0..self.cols.saturating_sub(2) {
                let color = self.cells[r][c].color;
                if self.cells[r][c + 1].color == color && self.cells[r][c + 2].color == color {
                    for dc in 0..3 {
                        self.cells[r][c + dc].is_matched = true;
                    }
                    found = true;
                }
            }
        }

        for c in 0..self.cols {
            for r in 0..self.rows.saturating_sub(2) {
                let color = self.cells[r][c].color;
                if self.cells[r + 1][c].color == color && self.cells[r + 2][c].color == color {
                    for dr in 0..3 {
                        self.cells[r + dr][c].is_matched = true;
                    }
                    found = true;
                }
            }
        }

        found
    }

    /// Sweep matched tiles and let the rest fall, one column at a time:
    /// survivors keep their relative vertical order and compact to the bottom;
    /// the vacated slots are refilled top-down with fresh random tiles whose
    /// visual position starts above row 0 so they drop into view. All flags
    /// are reset in the process.
    pub fn apply_gravity(&mut self, rng: &mut impl Rng) {
        for c in 0..self.cols {
            let survivors: Vec<Tile> = (0..self.rows)
                .map(|r| self.cells[r][c])
                .filter(|tile| !tile.is_matched)
                .collect();
            let cleared = self.rows - survivors.len();

            for r in 0..cleared {
                let color = rng.random_range(0..self.palette_len);
                let mut tile = Tile::new(r, c, color);
                // Stacked above the top edge, so a column of refills falls in
                // as a group rather than overlapping.
                tile.visual_y = r as f32 - cleared as f32;
                self.place(tile, r, c);
            }
            for (i, mut tile) in survivors.into_iter().enumerate() {
                tile.is_matched = false;
                self.place(tile, cleared + i, c);
            }
        }
    }

    /// Advance every tile's interpolation. Returns whether any tile moved.
    pub fn update(&mut self, dt: f32, speed: f32) -> bool {
        let mut moving = false;
        for tile in self.cells.iter_mut().flatten() {
            moving |= tile.update(dt, speed);
        }
        moving
    }

    /// True while any tile's visual position lags its logical cell.
    pub fn is_animating(&self) -> bool {
        self.tiles().any(Tile::in_motion)
    }

    /// Test constructor: board with the given color layout, visuals settled.
    #[cfg(test)]
    pub(crate) fn from_colors(colors: &[Vec<u8>], palette_len: u8) -> Self {
        let rows = colors.len();
        let cols = colors[0].len();
        let cells = colors
            .iter()
            .enumerate()
            .map(|(r, row)| {
                assert_eq!(row.len(), cols, "ragged color grid");
                row.iter()
                    .enumerate()
                    .map(|(c, &color)| Tile::new(r, c, color))
                    .collect()
            })
            .collect();
        Self {
            rows,
            cols,
            palette_len,
            cells,
        }
    }
}

/// Draw a uniform random color, redrawing while it would complete a run of 3
/// with the pair to the left or the pair above. With a palette of 3 or more
/// colors at most two colors are excluded, so the loop always terminates.
fn pick_color_no_run(
    palette_len: u8,
    left: Option<(u8, u8)>,
    above: Option<(u8, u8)>,
    rng: &mut impl Rng,
) -> u8 {
    loop {
        let color = rng.random_range(0..palette_len);
        let completes_row = left == Some((color, color));
        let completes_col = above == Some((color, color));
        if !completes_row && !completes_col {
            return color;
        }
    }
}
