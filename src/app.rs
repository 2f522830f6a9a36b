//! App: terminal init, main loop, frame timing, key and mouse handling.

use crate::Args;
use crate::game::{EngineOptions, Game};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{
    self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Frame-to-frame dt is clamped so a suspended terminal doesn't make the
/// animation warp when it wakes up.
const MAX_FRAME_DT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    NewBoard,
    Exit,
}

pub struct App {
    args: Args,
    options: EngineOptions,
    theme: Theme,
    game: Game,
    screen: Screen,
    quit_selected: QuitOption,
    /// Keyboard cursor, in board coordinates.
    cursor: (usize, usize),
    last_frame: Instant,
    /// TachyonFX fade for matched tiles (created when a match appears).
    match_effect: Option<Effect>,
    /// Last time we processed the match effect (for delta).
    match_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, options: EngineOptions, theme: Theme) -> Self {
        let seed = args.seed.unwrap_or_else(rand::random);
        let game = Game::new(options.clone(), seed);
        Self {
            args,
            options,
            theme,
            game,
            screen: Screen::Playing,
            quit_selected: QuitOption::Resume,
            cursor: (0, 0),
            last_frame: Instant::now(),
            match_effect: None,
            match_effect_process_time: None,
        }
    }

    fn reset_game(&mut self) {
        // A fresh board keeps an explicit --seed reproducible across restarts
        // by deriving the next seed from it.
        let seed = match self.args.seed {
            Some(s) => {
                let next = s.wrapping_add(1);
                self.args.seed = Some(next);
                next
            }
            None => rand::random(),
        };
        self.game = Game::new(self.options.clone(), seed);
        self.screen = Screen::Playing;
        self.cursor = (0, 0);
        self.match_effect = None;
        self.match_effect_process_time = None;
    }

    fn move_cursor(&mut self, dr: isize, dc: isize) {
        let (r, c) = self.cursor;
        let rows = self.game.board.rows as isize;
        let cols = self.game.board.cols as isize;
        let nr = (r as isize + dr).clamp(0, rows - 1);
        let nc = (c as isize + dc).clamp(0, cols - 1);
        self.cursor = (nr as usize, nc as usize);
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));

        loop {
            let now = Instant::now();
            let dt = now
                .duration_since(self.last_frame)
                .as_secs_f32()
                .min(MAX_FRAME_DT);
            self.last_frame = now;

            // The quit menu freezes the game, animations included.
            if self.screen == Screen::Playing {
                self.game.tick(dt);
            }
            if !self.game.tiles().any(|t| t.is_matched) {
                // The marked tiles are gone, so the fade is stale; the next
                // match builds a fresh effect over its own cells.
                self.match_effect = None;
                self.match_effect_process_time = None;
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.game,
                    &self.theme,
                    self.options.palette_len,
                    self.cursor,
                    self.screen,
                    self.quit_selected,
                    &mut self.match_effect,
                    &mut self.match_effect_process_time,
                    now,
                    self.args.no_animation,
                );
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) => {
                            if key.kind != KeyEventKind::Press {
                                continue;
                            }
                            if self.handle_key(key_to_action(key)) {
                                return Ok(());
                            }
                        }
                        Event::Mouse(MouseEvent {
                            kind: MouseEventKind::Down(MouseButton::Left),
                            column,
                            row,
                            ..
                        }) => {
                            if self.screen == Screen::Playing {
                                self.handle_click(terminal, column, row)?;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_key(&mut self, action: Action) -> bool {
        match self.screen {
            Screen::Playing => match action {
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                Action::Restart => self.reset_game(),
                Action::CursorUp => self.move_cursor(-1, 0),
                Action::CursorDown => self.move_cursor(1, 0),
                Action::CursorLeft => self.move_cursor(0, -1),
                Action::CursorRight => self.move_cursor(0, 1),
                Action::Activate => {
                    let (r, c) = self.cursor;
                    self.game.activate_cell(r, c);
                }
                Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::CursorDown | Action::CursorRight => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::NewBoard,
                        QuitOption::NewBoard => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::CursorUp | Action::CursorLeft => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::NewBoard => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::NewBoard,
                    };
                }
                Action::Activate => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::NewBoard => self.reset_game(),
                    QuitOption::Exit => return true,
                },
                Action::Quit => self.screen = Screen::Playing,
                _ => {}
            },
        }
        false
    }

    /// Map a left click to a board cell; a hit moves the cursor there too, so
    /// mixed mouse and keyboard play stays coherent.
    fn handle_click(
        &mut self,
        terminal: &DefaultTerminal,
        column: u16,
        row: u16,
    ) -> Result<()> {
        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        let rows = self.game.board.rows as u16;
        let cols = self.game.board.cols as u16;
        if let Some((r, c)) = crate::ui::cell_at(area, rows, cols, column, row) {
            self.cursor = (r, c);
            self.game.activate_cell(r, c);
        }
        Ok(())
    }
}
