//! App: terminal init, main loop, tick and key handling.

use crate::game::{GameState, Player};
use crate::gamepad::GamepadHandler;
use crate::input::{Action, KeyState, horizontal_intent, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, CanvasLayout, ClearFlash, View};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

/// ~60 FPS rendering.
const FRAME_DURATION: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Waiting for both players to press start.
    Idle,
    Running,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    layout: CanvasLayout,
    state: GameState,
    screen: Screen,
    paused: bool,
    ready: [bool; 2],
    keys: KeyState,
    gamepad: Option<GamepadHandler>,
    /// Whether the terminal reports key releases; without them each press shifts once.
    release_events: bool,
    no_animation: bool,
    tick_interval: Duration,
    last_tick: Instant,
    clear_flash: Option<ClearFlash>,
}

impl App {
    pub fn new(args: &Args, config: GameConfig, theme: Theme) -> Self {
        let layout = CanvasLayout::new(config.rows, config.cols);
        let state = GameState::new(&config, layout.origins);
        let screen = if args.no_menu {
            Screen::Running
        } else {
            Screen::Idle
        };
        Self {
            tick_interval: Duration::from_secs_f64(1.0 / config.tick_rate),
            config,
            theme,
            layout,
            state,
            screen,
            paused: false,
            ready: [args.no_menu; 2],
            keys: KeyState::default(),
            gamepad: None,
            release_events: false,
            no_animation: args.no_animation,
            last_tick: Instant::now(),
            clear_flash: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{
                LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        enter_alternate_screen(&mut stdout, disable_raw_mode)?;

        // Release events need the kitty keyboard protocol.
        self.release_events = supports_keyboard_enhancement().unwrap_or(false);
        if self.release_events {
            let _ = execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
        } else {
            warn!("terminal does not report key releases; each key press shifts once");
        }

        self.gamepad = Some(GamepadHandler::new());
        self.last_tick = Instant::now();

        let result = match ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout)) {
            Ok(mut terminal) => self.run_loop(&mut terminal),
            Err(e) => Err(e.into()),
        };

        // Restore
        if self.release_events {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let view = View {
                screen: self.screen,
                state: &self.state,
                theme: &self.theme,
                layout: &self.layout,
                paused: self.paused,
                ready: self.ready,
                controller: self
                    .gamepad
                    .as_ref()
                    .and_then(|g| g.controller_name.as_deref()),
                match_clear: self.config.match_clear,
            };
            let flash = &mut self.clear_flash;
            terminal.draw(|f| ui::draw(f, &view, flash, now))?;

            if self.clear_flash.as_ref().is_some_and(ClearFlash::done) {
                self.clear_flash = None;
            }

            let timeout = FRAME_DURATION.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                    }
                }
            }

            let start_pressed = self.gamepad.as_mut().is_some_and(GamepadHandler::poll);
            if start_pressed {
                self.mark_ready(Player::One);
            }

            if self.screen == Screen::Running
                && !self.paused
                && self.last_tick.elapsed() >= self.tick_interval
            {
                self.tick();
            }
        }
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.keys.handle(key);
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match (self.screen, key_to_action(key)) {
            (_, Action::Quit) => return true,
            (Screen::Idle, Action::Ready(player)) => self.mark_ready(player),
            (Screen::Running, Action::Pause) => {
                self.paused = !self.paused;
                info!(paused = self.paused, "pause toggled");
                self.last_tick = Instant::now();
            }
            _ => {}
        }
        false
    }

    fn mark_ready(&mut self, player: Player) {
        if self.screen != Screen::Idle || self.ready[player.index()] {
            return;
        }
        self.ready[player.index()] = true;
        info!(?player, "player ready");
        if self.ready.iter().all(|r| *r) {
            info!("both players ready, starting");
            self.screen = Screen::Running;
            self.last_tick = Instant::now();
        }
    }

    fn tick(&mut self) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick);
        self.last_tick = now;
        trace!(delta_ms = delta.as_millis() as u64, "tick");

        let axis = self.gamepad.as_ref().and_then(GamepadHandler::axis_x);
        let shift = horizontal_intent(axis, &self.keys);
        let report = self.state.tick(shift);
        if self.release_events {
            self.keys.end_tick();
        } else {
            self.keys.release_all();
        }
        if report.has_clears() && !self.no_animation {
            self.clear_flash = Some(ClearFlash::new(report.cleared));
        }
    }
}

/// Switch to the alternate screen. On failure raw mode is turned back off before returning.
fn enter_alternate_screen<W: Write>(
    out: &mut W,
    raw_mode_off: impl FnOnce() -> std::io::Result<()>,
) -> Result<()> {
    if let Err(e) = crossterm::execute!(out, crossterm::terminal::EnterAlternateScreen) {
        let _ = raw_mode_off();
        return Err(e.into());
    }
    Ok(())
}
