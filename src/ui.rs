//! Layout and drawing: board, sidebar, quit menu, match-clear fade.

use crate::app::{QuitOption, Screen};
use crate::game::Game;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each tile is two terminal cells wide (glyph + padding) and one tall, which
/// gets the aspect ratio close to square on most fonts.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;

const SIDEBAR_WIDTH: u16 = 22;

/// Duration of the match-clear fade (TachyonFX) in ms; roughly the default
/// match pause so the tiles finish fading as gravity sweeps them.
const MATCH_FADE_MS: u32 = 250;

/// Board size (border included) in terminal cells.
fn board_pixel_size(rows: u16, cols: u16) -> (u16, u16) {
    (cols * CELL_WIDTH + 2, rows * CELL_HEIGHT + 2)
}

/// Centered board and sidebar areas (borders included) for the given frame
/// area. Single source of the layout math: `draw_game`, the mouse path and
/// the match fade all derive their rects from these splits, so rounding of
/// odd leftover rows/columns cannot put them out of step.
fn game_layout(area: Rect, rows: u16, cols: u16) -> (Rect, Rect) {
    let (bw, bh) = board_pixel_size(rows, cols);
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);

    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);

    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert_chunks[1]);
    (inner[0], inner[1])
}

/// Inner board rect (no border) for the given frame area, exposed so mouse
/// clicks can be mapped back to cells.
pub fn board_rect(area: Rect, rows: u16, cols: u16) -> Rect {
    let (board_area, _) = game_layout(area, rows, cols);
    Rect {
        x: board_area.x + 1,
        y: board_area.y + 1,
        width: board_area.width.saturating_sub(2),
        height: board_area.height.saturating_sub(2),
    }
}

/// Map a terminal click position to a board cell, if it hits one.
pub fn cell_at(area: Rect, rows: u16, cols: u16, column: u16, row: u16) -> Option<(usize, usize)> {
    let rect = board_rect(area, rows, cols);
    if column < rect.x || row < rect.y {
        return None;
    }
    let c = (column - rect.x) / CELL_WIDTH;
    let r = (row - rect.y) / CELL_HEIGHT;
    (r < rows && c < cols).then_some((r as usize, c as usize))
}

/// Draw the current screen; the quit menu renders over the frozen board.
/// When matched tiles are on screen and !no_animation, applies the TachyonFX
/// fade and updates `match_effect` / `match_effect_process_time`.
pub fn draw(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    colors: u8,
    cursor: (usize, usize),
    screen: Screen,
    quit_selected: QuitOption,
    match_effect: &mut Option<Effect>,
    match_effect_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    draw_game(frame, game, theme, colors, cursor, area);

    let any_matched = game.tiles().any(|t| t.is_matched);
    if any_matched && !no_animation {
        apply_match_effect(
            frame,
            game,
            theme,
            area,
            match_effect,
            match_effect_process_time,
            now,
        );
    }

    if screen == Screen::QuitMenu {
        draw_quit_menu(frame, theme, quit_selected);
    }
}

/// Draw game: board + sidebar, centered in the terminal.
fn draw_game(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    colors: u8,
    cursor: (usize, usize),
    area: Rect,
) {
    let rows = game.board.rows as u16;
    let cols = game.board.cols as u16;
    let (board_area, sidebar_area) = game_layout(area, rows, cols);

    draw_board(frame, game, theme, cursor, board_area);
    draw_sidebar(frame, game, theme, colors, sidebar_area);
}

fn draw_board(frame: &mut Frame, game: &Game, theme: &Theme, cursor: (usize, usize), area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" gemtui ", theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();

    // Background fill so vacated positions under a falling tile stay themed.
    for y in inner.y..inner.y + inner.height {
        for x in inner.x..inner.x + inner.width {
            buf[(x, y)].set_symbol(" ").set_style(Style::default().bg(theme.bg));
        }
    }

    // Cursor cell backdrop, under the tiles.
    let (cr, cc) = cursor;
    let cx = inner.x + cc as u16 * CELL_WIDTH;
    let cy = inner.y + cr as u16 * CELL_HEIGHT;
    if cx + 1 < inner.x + inner.width && cy < inner.y + inner.height {
        for x in cx..=cx + 1 {
            buf[(x, cy)].set_style(Style::default().bg(theme.div_line));
        }
    }

    // Settled tiles first, moving ones after so a gliding tile always draws
    // over whatever it passes, and the selected tile last.
    let mut tiles: Vec<_> = game.tiles().collect();
    tiles.sort_by_key(|t| (t.in_motion(), t.is_selected));

    for tile in tiles {
        // Round the interpolated position to the nearest terminal cell.
        let vx = tile.visual_x * f32::from(CELL_WIDTH);
        let vy = tile.visual_y * f32::from(CELL_HEIGHT);
        if vy < -0.5 {
            continue; // refill still above the board edge
        }
        let rx = inner.x + vx.round().max(0.0) as u16;
        let ry = inner.y + vy.round().max(0.0) as u16;
        if rx + 1 >= inner.x + inner.width || ry >= inner.y + inner.height {
            continue;
        }

        let color = theme.gem_color(tile.color);
        let glyph = Theme::gem_glyph(tile.color);
        let style = if tile.is_selected {
            Style::default().fg(theme.bg).bg(color).bold()
        } else if tile.is_matched {
            Style::default().fg(color).bg(theme.bg).bold().reversed()
        } else {
            let bg = if (tile.row, tile.col) == cursor && !tile.in_motion() {
                theme.div_line
            } else {
                theme.bg
            };
            Style::default().fg(color).bg(bg)
        };

        buf[(rx, ry)].set_symbol(&glyph.to_string()).set_style(style);
        buf[(rx + 1, ry)].set_symbol(" ").set_style(style);
    }
}

fn draw_sidebar(frame: &mut Frame, game: &Game, theme: &Theme, colors: u8, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Gems (border + title + strip)
            Constraint::Length(1), // gap
            Constraint::Length(9), // Controls
            Constraint::Fill(1),
        ])
        .split(area);

    // --- Gems (own border): the palette in play, with glyphs ---
    let gems_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let gems_inner = gems_block.inner(chunks[0]);
    gems_block.render(chunks[0], frame.buffer_mut());
    let gems_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(gems_inner);
    Paragraph::new(Line::from(Span::styled("Gems", title_style)))
        .render(gems_layout[0], frame.buffer_mut());
    let strip: Vec<Span> = (0..colors)
        .flat_map(|i| {
            [
                Span::styled(
                    Theme::gem_glyph(i).to_string(),
                    Style::default().fg(theme.gem_color(i)),
                ),
                Span::from(" "),
            ]
        })
        .collect();
    Paragraph::new(Line::from(strip)).render(gems_layout[1], frame.buffer_mut());

    // --- Controls (own border) ---
    let controls_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let controls_inner = controls_block.inner(chunks[2]);
    controls_block.render(chunks[2], frame.buffer_mut());
    let state_line = if game.is_animating() {
        Line::from(Span::styled("resolving...", dim_style))
    } else if game.selected().is_some() {
        Line::from(Span::styled("pick a neighbour", dim_style))
    } else {
        Line::from(Span::styled("pick a tile", dim_style))
    };
    let lines = vec![
        Line::from(Span::styled("Controls", title_style)),
        Line::from(vec![
            Span::styled("arrows/hjkl ", title_style),
            Span::styled("move", fg_style),
        ]),
        Line::from(vec![
            Span::styled("enter/space ", title_style),
            Span::styled("swap", fg_style),
        ]),
        Line::from(vec![
            Span::styled("click       ", title_style),
            Span::styled("swap", fg_style),
        ]),
        Line::from(vec![
            Span::styled("r           ", title_style),
            Span::styled("new board", fg_style),
        ]),
        Line::from(vec![
            Span::styled("q           ", title_style),
            Span::styled("quit", fg_style),
        ]),
        state_line,
    ];
    Paragraph::new(ratatui::text::Text::from(lines)).render(controls_inner, frame.buffer_mut());
}

/// Buffer (x, y) positions covered by tiles a scan just marked.
fn matched_buffer_positions(board_rect: Rect, game: &Game) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for tile in game.tiles().filter(|t| t.is_matched) {
        let x0 = board_rect.x + tile.col as u16 * CELL_WIDTH;
        let y0 = board_rect.y + tile.row as u16 * CELL_HEIGHT;
        for bx in x0..(x0 + CELL_WIDTH).min(board_rect.x + board_rect.width) {
            for by in y0..(y0 + CELL_HEIGHT).min(board_rect.y + board_rect.height) {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the match fade and process it (TachyonFX: fade the
/// matched tiles to the background while the engine holds the pause).
fn apply_match_effect(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    area: Rect,
    match_effect: &mut Option<Effect>,
    match_effect_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let rect = board_rect(area, game.board.rows as u16, game.board.cols as u16);
    let delta = match_effect_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *match_effect_process_time = Some(now);

    if match_effect.is_none() {
        let matched_set = matched_buffer_positions(rect, game);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            matched_set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (MATCH_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(rect);
        *match_effect = Some(effect);
    }

    if let Some(effect) = match_effect {
        frame.render_effect(effect, rect, tfx_delta);
    }
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw.min(area.width),
        height: qh.min(area.height),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)]
                .set_symbol(" ")
                .set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::NewBoard, " New Board "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_at_maps_corners_of_the_board() {
        let area = Rect::new(0, 0, 80, 24);
        let rect = board_rect(area, 8, 8);
        assert_eq!(cell_at(area, 8, 8, rect.x, rect.y), Some((0, 0)));
        assert_eq!(cell_at(area, 8, 8, rect.x + 1, rect.y), Some((0, 0)));
        assert_eq!(
            cell_at(area, 8, 8, rect.x + 15, rect.y + 7),
            Some((7, 7))
        );
    }

    #[test]
    fn board_rect_tracks_the_drawn_board_on_odd_leftovers() {
        // Layout hands the odd leftover row/column to the first Fill, so a
        // hand-rolled `/ 2` drifts one cell off the drawn board on odd
        // remainders. Recompute the drawn position via the same splits
        // draw_game performs and require exact agreement.
        for width in 60..=100 {
            for height in 12..=30 {
                let area = Rect::new(0, 0, width, height);
                let (bw, bh) = board_pixel_size(8, 8);
                let horiz = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Fill(1),
                        Constraint::Length(bw + SIDEBAR_WIDTH),
                        Constraint::Fill(1),
                    ])
                    .split(area);
                let vert = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Fill(1),
                        Constraint::Length(bh),
                        Constraint::Fill(1),
                    ])
                    .split(horiz[1]);
                let drawn = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([
                        Constraint::Length(bw),
                        Constraint::Length(SIDEBAR_WIDTH),
                    ])
                    .split(vert[1])[0];

                let rect = board_rect(area, 8, 8);
                assert_eq!(
                    (rect.x, rect.y),
                    (drawn.x + 1, drawn.y + 1),
                    "terminal {width}x{height}"
                );
            }
        }
    }

    #[test]
    fn cell_at_agrees_with_the_drawn_board_on_odd_terminals() {
        // 60x13: both leftovers are odd, the case where mouse mapping used
        // to land one cell off.
        let area = Rect::new(0, 0, 60, 13);
        let rect = board_rect(area, 8, 8);
        assert_eq!(cell_at(area, 8, 8, rect.x, rect.y), Some((0, 0)));
        assert_eq!(cell_at(area, 8, 8, rect.x + 15, rect.y + 7), Some((7, 7)));
        assert_eq!(cell_at(area, 8, 8, rect.x, rect.y.saturating_sub(1)), None);
    }

    #[test]
    fn cell_at_misses_outside_the_board() {
        let area = Rect::new(0, 0, 80, 24);
        let rect = board_rect(area, 8, 8);
        assert_eq!(cell_at(area, 8, 8, 0, 0), None);
        assert_eq!(cell_at(area, 8, 8, rect.x + 16, rect.y), None);
        assert_eq!(cell_at(area, 8, 8, rect.x, rect.y + 8), None);
    }
}
