//! Layout and drawing: the fixed-size canvas, both boards, ready screen, pause, clear fade.

use crate::app::Screen;
use crate::game::{Block as GameBlock, Board, ClearedCell, GameState, screen_cells};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count};

/// Gap between the canvas border and each board.
const MARGIN_X: u16 = 3;
/// Border row plus the player label row above the boards.
const MARGIN_TOP: u16 = 2;
const CENTER_GAP: u16 = 6;
/// Status row plus the bottom border.
const STATUS_ROWS: u16 = 2;

/// Fade of cleared blocks, in ms.
const CLEAR_FADE_MS: u32 = 350;

/// Fixed-size canvas: board one at the left margin, board two mirrored at the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasLayout {
    pub width: u16,
    pub height: u16,
    /// Board origins relative to the canvas' top-left.
    pub origins: [Position; 2],
}

impl CanvasLayout {
    pub fn new(rows: u16, cols: u16) -> Self {
        let (board_w, board_h) = Board::footprint(rows, cols);
        let width = 2 * (MARGIN_X + board_w) + CENTER_GAP;
        let height = MARGIN_TOP + board_h + STATUS_ROWS;
        Self {
            width,
            height,
            origins: [
                Position::new(MARGIN_X, MARGIN_TOP),
                Position::new(width - MARGIN_X - board_w, MARGIN_TOP),
            ],
        }
    }

    /// Canvas rect centred in `area`, or `None` when the terminal is too small.
    pub fn place(&self, area: Rect) -> Option<Rect> {
        if area.width < self.width || area.height < self.height {
            return None;
        }
        Some(Rect {
            x: area.x + (area.width - self.width) / 2,
            y: area.y + (area.height - self.height) / 2,
            width: self.width,
            height: self.height,
        })
    }
}

/// Blocks removed by a match clear, kept on screen while they fade out.
pub struct ClearFlash {
    cells: [Vec<ClearedCell>; 2],
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl ClearFlash {
    pub fn new(cells: [Vec<ClearedCell>; 2]) -> Self {
        Self {
            cells,
            effect: None,
            last_process: None,
        }
    }

    pub fn done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }
}

/// Everything the renderer reads for one frame.
pub struct View<'a> {
    pub screen: Screen,
    pub state: &'a GameState,
    pub theme: &'a Theme,
    pub layout: &'a CanvasLayout,
    pub paused: bool,
    pub ready: [bool; 2],
    /// Name of the controller driving player one, if any.
    pub controller: Option<&'a str>,
    pub match_clear: bool,
}

pub fn draw(frame: &mut Frame, view: &View, flash: &mut Option<ClearFlash>, now: Instant) {
    let area = frame.area();
    let Some(canvas) = view.layout.place(area) else {
        draw_too_small(frame, view, area);
        return;
    };
    draw_canvas(frame, view, canvas);
    match view.screen {
        Screen::Idle => draw_ready_popup(frame, view, area),
        Screen::Running => {
            if let Some(flash) = flash.as_mut() {
                draw_clear_flash(frame, view, canvas, flash, now);
            }
            if view.paused {
                draw_pause_overlay(frame, view.theme, area);
            }
        }
    }
}

fn board_anchor(canvas: Rect, board: &Board) -> Position {
    Position::new(canvas.x + board.origin.x, canvas.y + board.origin.y)
}

fn draw_canvas(frame: &mut Frame, view: &View, canvas: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title).add_modifier(Modifier::BOLD);
    let hint_style = Style::default().fg(theme.inactive_fg);
    let source = match view.controller {
        Some(name) => format!(" gamepad: {name} "),
        None => " keyboard ".to_string(),
    };
    let buf = frame.buffer_mut();
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(" duofall ", title_style))
        .title_top(Line::from(Span::styled(source, hint_style)).right_aligned())
        .title_bottom(
            Line::from(Span::styled(" ←/→ shift · p pause · q quit ", hint_style)).centered(),
        )
        .render(canvas, buf);

    let canvas_pos = Position::new(canvas.x, canvas.y);
    for (i, board) in view.state.boards.iter().enumerate() {
        let anchor = board_anchor(canvas, board);
        let width = u16::try_from(board.cols + 1)
            .unwrap_or(u16::MAX)
            .saturating_mul(crate::game::CELL_WIDTH);
        let label = Rect::new(anchor.x, anchor.y.saturating_sub(1), width, 1);
        Paragraph::new(Line::from(Span::styled(format!("Player {}", i + 1), title_style)))
            .render(label, buf);

        board.draw(buf, canvas_pos, theme);

        let mut status = vec![Span::styled(
            format!("blocks {}", board.block_count()),
            Style::default().fg(theme.main_fg),
        )];
        if view.match_clear {
            status.push(Span::styled(
                format!("  clr {}", view.state.cleared[i]),
                Style::default().fg(theme.main_fg),
            ));
        }
        let rows = u16::try_from(board.rows).unwrap_or(u16::MAX);
        let status_rect = Rect::new(anchor.x, anchor.y.saturating_add(rows), width, 1)
            .intersection(canvas);
        Paragraph::new(Line::from(status)).render(status_rect, buf);
    }
}

/// Repaint cleared blocks and fade them to the background (TachyonFX).
fn draw_clear_flash(
    frame: &mut Frame,
    view: &View,
    canvas: Rect,
    flash: &mut ClearFlash,
    now: Instant,
) {
    let buf = frame.buffer_mut();
    let mut positions: HashSet<(u16, u16)> = HashSet::new();
    for (board, cells) in view.state.boards.iter().zip(&flash.cells) {
        let anchor = board_anchor(canvas, board);
        for c in cells {
            GameBlock::new(c.color, c.row, c.col).draw(buf, anchor, view.theme);
            positions.extend(screen_cells(anchor, c.row, c.col));
        }
    }

    let delta = flash
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.last_process = Some(now);

    if flash.effect.is_none() {
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(canvas);
        flash.effect = Some(effect);
    }
    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, canvas, TfxDuration::from_millis(delta_ms));
    }

    // Live blocks that fell into a cleared cell stay on top of the ghost.
    let buf = frame.buffer_mut();
    for (board, cells) in view.state.boards.iter().zip(&flash.cells) {
        let anchor = board_anchor(canvas, board);
        let ghosts: HashSet<(i32, i32)> = cells.iter().map(|c| (c.row, c.col)).collect();
        for block in board.blocks().iter().filter(|b| ghosts.contains(&(b.row, b.col))) {
            block.draw(buf, anchor, view.theme);
        }
        for item in board
            .special_items()
            .iter()
            .filter(|i| ghosts.contains(&(i.row, i.col)))
        {
            item.draw(buf, anchor, view.theme);
        }
    }
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_ready_popup(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let popup = centered_popup(area, 40, 9);
    let player_line = |n: usize, keys: &str, ready: bool| {
        let (status, style) = if ready {
            (
                "READY",
                Style::default()
                    .fg(Color::Black)
                    .bg(theme.blocks[1])
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            ("waiting", Style::default().fg(theme.inactive_fg))
        };
        Line::from(vec![
            Span::styled(format!(" Player {n}  {keys:<18}"), Style::default().fg(theme.main_fg)),
            Span::styled(format!(" {status} "), style),
        ])
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Press start ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        player_line(1, "Enter / pad Start", view.ready[0]),
        player_line(2, "e", view.ready[1]),
        Line::from(""),
        Line::from(Span::styled(" Q — Quit ", Style::default().fg(theme.inactive_fg))),
    ];
    let buf = frame.buffer_mut();
    Clear.render(popup, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .style(Style::default().bg(theme.bg)),
        )
        .render(popup, buf);
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let buf = frame.buffer_mut();
    Clear.render(popup, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .style(Style::default().bg(theme.bg)),
        )
        .render(popup, buf);
}

fn draw_too_small(frame: &mut Frame, view: &View, area: Rect) {
    let msg = format!(
        "Terminal too small: need {}x{}, have {}x{}",
        view.layout.width, view.layout.height, area.width, area.height
    );
    let popup = centered_popup(area, area.width, 1);
    Paragraph::new(Line::from(Span::styled(msg, Style::default().fg(view.theme.main_fg))))
        .alignment(Alignment::Center)
        .render(popup, frame.buffer_mut());
}
