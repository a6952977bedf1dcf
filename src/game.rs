//! Game state: two boards of falling blocks, special items, spawning, shifting, match clear.

use crate::GameConfig;
use crate::theme::Theme;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use ratatui::buffer::Buffer;
use ratatui::layout::Position;
use ratatui::style::{Modifier, Style};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Terminal columns per board cell (two columns make a roughly square cell).
pub const CELL_WIDTH: u16 = 2;
/// Terminal rows per board cell.
pub const CELL_HEIGHT: u16 = 1;

/// Shortest same-colour run removed by [`Board::clear_matching_blocks`].
pub const MIN_MATCH_RUN: usize = 3;

const BLOCK_GLYPH: [&str; 2] = ["█", "█"];
const GRID_GLYPH: [&str; 2] = ["·", " "];

/// Block colours. Spawning uses [`BlockColor::BASIC`] unless high-colour mode is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockColor {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Orange,
}

impl BlockColor {
    pub const ALL: [Self; 6] = [
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Yellow,
        Self::Purple,
        Self::Orange,
    ];
    pub const BASIC: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    /// Index into `Theme::blocks`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Kinds of special item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    Bomb,
    Missile,
}

impl SpecialKind {
    pub const ALL: [Self; 2] = [Self::Bomb, Self::Missile];

    fn glyph(self) -> [&'static str; 2] {
        match self {
            Self::Bomb => ["(", ")"],
            Self::Missile => ["/", "\\"],
        }
    }
}

/// Identity of a block or item within one board.
pub type ItemId = u64;

/// Horizontal shift applied to a whole board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    One,
    Two,
}

impl Player {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

/// Screen cells covered by board cell (row, col) when the board's top-left sits at `anchor`.
/// Cells left of or above the screen origin are skipped.
pub fn screen_cells(anchor: Position, row: i32, col: i32) -> impl Iterator<Item = (u16, u16)> {
    let x0 = i32::from(anchor.x) + col * i32::from(CELL_WIDTH);
    let y0 = i32::from(anchor.y) + row * i32::from(CELL_HEIGHT);
    (0..i32::from(CELL_HEIGHT)).flat_map(move |dy| {
        (0..i32::from(CELL_WIDTH)).filter_map(move |dx| {
            let x = u16::try_from(x0 + dx).ok()?;
            let y = u16::try_from(y0 + dy).ok()?;
            Some((x, y))
        })
    })
}

fn paint(buf: &mut Buffer, anchor: Position, row: i32, col: i32, glyph: [&str; 2], style: Style) {
    for (i, (x, y)) in screen_cells(anchor, row, col).enumerate() {
        if let Some(cell) = buf.cell_mut((x, y)) {
            cell.set_symbol(glyph[i % glyph.len()]).set_style(style);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: ItemId,
    pub color: BlockColor,
    pub row: i32,
    pub col: i32,
}

impl Block {
    /// New block; the id is assigned when it is added to a board.
    pub fn new(color: BlockColor, row: i32, col: i32) -> Self {
        Self {
            id: 0,
            color,
            row,
            col,
        }
    }

    /// Fill this block's cell. `anchor` is the board's top-left on screen.
    pub fn draw(&self, buf: &mut Buffer, anchor: Position, theme: &Theme) {
        let style = Style::default()
            .fg(theme.block_color(self.color))
            .bg(theme.bg);
        paint(buf, anchor, self.row, self.col, BLOCK_GLYPH, style);
    }

    /// No bounds check; the board clamps.
    pub fn move_left(&mut self) {
        self.col -= 1;
    }

    pub fn move_right(&mut self) {
        self.col += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialItem {
    pub id: ItemId,
    pub kind: SpecialKind,
    pub row: i32,
    pub col: i32,
}

impl SpecialItem {
    pub fn new(kind: SpecialKind, row: i32, col: i32) -> Self {
        Self {
            id: 0,
            kind,
            row,
            col,
        }
    }

    pub fn draw(&self, buf: &mut Buffer, anchor: Position, theme: &Theme) {
        let style = Style::default()
            .fg(theme.special)
            .bg(theme.bg)
            .add_modifier(Modifier::BOLD);
        paint(buf, anchor, self.row, self.col, self.kind.glyph(), style);
    }
}

/// A cell removed by a match clear, with the colour it had.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearedCell {
    pub row: i32,
    pub col: i32,
    pub color: BlockColor,
}

/// One player's board. Rows grow downwards; `col == cols` is the staging column
/// right of the grid where new columns arrive.
#[derive(Debug, Clone)]
pub struct Board {
    pub rows: i32,
    pub cols: i32,
    /// Top-left of the grid, relative to the canvas.
    pub origin: Position,
    blocks: Vec<Block>,
    special_items: Vec<SpecialItem>,
    next_id: ItemId,
}

impl Board {
    pub fn new(rows: u16, cols: u16, origin: Position) -> Self {
        Self {
            rows: i32::from(rows),
            cols: i32::from(cols),
            origin,
            blocks: Vec::new(),
            special_items: Vec::new(),
            next_id: 1,
        }
    }

    /// Canvas size (width, height) a board occupies: the grid plus its staging column.
    pub fn footprint(rows: u16, cols: u16) -> (u16, u16) {
        ((cols + 1) * CELL_WIDTH, rows * CELL_HEIGHT)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn special_items(&self) -> &[SpecialItem] {
        &self.special_items
    }

    pub fn block_count(&self) -> usize {
        self.blocks().len()
    }

    fn take_id(&mut self) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_block(&mut self, mut block: Block) -> ItemId {
        block.id = self.take_id();
        let id = block.id;
        self.blocks.push(block);
        id
    }

    pub fn add_special_item(&mut self, mut item: SpecialItem) -> ItemId {
        item.id = self.take_id();
        let id = item.id;
        self.special_items.push(item);
        id
    }

    /// Remove a block by identity. Unknown ids are ignored.
    pub fn remove_block(&mut self, id: ItemId) -> Option<Block> {
        let index = self.blocks.iter().position(|b| b.id == id)?;
        Some(self.blocks.remove(index))
    }

    /// Grid, then blocks, then special items; later draws cover earlier ones.
    pub fn draw(&self, buf: &mut Buffer, canvas: Position, theme: &Theme) {
        let anchor = Position::new(
            canvas.x.saturating_add(self.origin.x),
            canvas.y.saturating_add(self.origin.y),
        );
        let grid_style = Style::default().fg(theme.div_line).bg(theme.bg);
        for row in 0..self.rows {
            for col in 0..self.cols {
                paint(buf, anchor, row, col, GRID_GLYPH, grid_style);
            }
        }
        for block in self.blocks() {
            block.draw(buf, anchor, theme);
        }
        for item in self.special_items() {
            item.draw(buf, anchor, theme);
        }
    }

    /// One fall step. Occupancy is snapshotted first, so a block's decision never
    /// depends on blocks that already moved in this pass.
    pub fn update(&mut self) {
        let last_row = self.rows - 1;
        let occupied: HashSet<(i32, i32)> = self.blocks.iter().map(|b| (b.row, b.col)).collect();

        for i in (0..self.blocks.len()).rev() {
            if self.blocks[i].row >= last_row {
                self.blocks.remove(i);
                continue;
            }
            let block = &mut self.blocks[i];
            if !occupied.contains(&(block.row + 1, block.col)) {
                block.row += 1;
            }
        }

        self.special_items.retain_mut(|item| {
            if item.row >= last_row {
                return false;
            }
            item.row += 1;
            true
        });
    }

    pub fn move_blocks_left(&mut self) {
        for block in &mut self.blocks {
            if block.col > 0 {
                block.move_left();
            }
        }
    }

    pub fn move_blocks_right(&mut self) {
        let last_col = self.cols - 1;
        for block in &mut self.blocks {
            if block.col < last_col {
                block.move_right();
            }
        }
    }

    pub fn shift(&mut self, shift: Shift) {
        match shift {
            Shift::Left => self.move_blocks_left(),
            Shift::Right => self.move_blocks_right(),
        }
    }

    /// Spawn a new column in the staging column. Each row gets a block with probability
    /// `chance`; rows left empty get a special item with probability `special_chance`.
    /// Returns the number of blocks added.
    pub fn spawn_column<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        colors: &[BlockColor],
        chance: f64,
        special_chance: f64,
    ) -> usize {
        let col = self.cols;
        let chance = chance.clamp(0.0, 1.0);
        let special_chance = special_chance.clamp(0.0, 1.0);
        let mut added = 0;
        for row in 0..self.rows {
            if rng.random_bool(chance) {
                if let Some(&color) = colors.choose(rng) {
                    self.add_block(Block::new(color, row, col));
                    added += 1;
                }
            } else if special_chance > 0.0 && rng.random_bool(special_chance) {
                if let Some(&kind) = SpecialKind::ALL.choose(rng) {
                    self.add_special_item(SpecialItem::new(kind, row, col));
                }
            }
        }
        added
    }

    /// Remove every in-grid block that is part of a horizontal or vertical run of at least
    /// [`MIN_MATCH_RUN`] same-coloured cells. Staging-column blocks never match. When blocks
    /// overlap, the first one added decides the cell's colour. Returns the cleared cells.
    pub fn clear_matching_blocks(&mut self) -> Vec<ClearedCell> {
        let mut grid: HashMap<(i32, i32), BlockColor> = HashMap::new();
        for block in &self.blocks {
            if (0..self.rows).contains(&block.row) && (0..self.cols).contains(&block.col) {
                grid.entry((block.row, block.col)).or_insert(block.color);
            }
        }

        let mut matched = HashSet::new();
        for row in 0..self.rows {
            collect_runs(&grid, (0..self.cols).map(|col| (row, col)), &mut matched);
        }
        for col in 0..self.cols {
            collect_runs(&grid, (0..self.rows).map(|row| (row, col)), &mut matched);
        }
        if matched.is_empty() {
            return Vec::new();
        }

        let doomed: Vec<ItemId> = self
            .blocks
            .iter()
            .filter(|b| matched.contains(&(b.row, b.col)))
            .map(|b| b.id)
            .collect();
        for id in doomed {
            self.remove_block(id);
        }
        let mut cleared: Vec<ClearedCell> = matched
            .into_iter()
            .filter_map(|(row, col)| {
                grid.get(&(row, col))
                    .map(|&color| ClearedCell { row, col, color })
            })
            .collect();
        cleared.sort_by_key(|c| (c.row, c.col));
        cleared
    }
}

fn collect_runs(
    grid: &HashMap<(i32, i32), BlockColor>,
    line: impl Iterator<Item = (i32, i32)>,
    matched: &mut HashSet<(i32, i32)>,
) {
    let mut run: Vec<(i32, i32)> = Vec::new();
    let mut run_color = None;
    for pos in line {
        let color = grid.get(&pos).copied();
        if color.is_some() && color == run_color {
            run.push(pos);
            continue;
        }
        flush_run(&mut run, matched);
        run_color = color;
        if color.is_some() {
            run.push(pos);
        }
    }
    flush_run(&mut run, matched);
}

fn flush_run(run: &mut Vec<(i32, i32)>, matched: &mut HashSet<(i32, i32)>) {
    if run.len() >= MIN_MATCH_RUN {
        matched.extend(run.drain(..));
    } else {
        run.clear();
    }
}

/// What one tick did, per board.
#[derive(Debug, Default)]
pub struct TickReport {
    pub cleared: [Vec<ClearedCell>; 2],
    pub spawned: [usize; 2],
}

impl TickReport {
    pub fn has_clears(&self) -> bool {
        self.cleared.iter().any(|c| !c.is_empty())
    }
}

/// Both boards plus the spawn rules and random source driving them.
#[derive(Debug)]
pub struct GameState {
    pub boards: [Board; 2],
    /// Cells removed by match clears, per board.
    pub cleared: [u32; 2],
    pub ticks: u64,
    rng: StdRng,
    spawn_colors: &'static [BlockColor],
    spawn_threshold: usize,
    spawn_chance: f64,
    special_chance: f64,
    match_clear: bool,
}

impl GameState {
    pub fn new(config: &GameConfig, origins: [Position; 2]) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let spawn_colors: &'static [BlockColor] = if config.high_color {
            &BlockColor::ALL
        } else {
            &BlockColor::BASIC
        };
        Self {
            boards: origins.map(|origin| Board::new(config.rows, config.cols, origin)),
            cleared: [0; 2],
            ticks: 0,
            rng,
            spawn_colors,
            spawn_threshold: config.spawn_threshold,
            spawn_chance: config.spawn_chance,
            special_chance: config.special_chance,
            match_clear: config.match_clear,
        }
    }

    /// One game step: shift player one's board, advance both boards, clear matches
    /// (when enabled), then top up any board below the spawn threshold.
    pub fn tick(&mut self, shift: Option<Shift>) -> TickReport {
        self.ticks += 1;
        if let Some(shift) = shift {
            self.boards[Player::One.index()].shift(shift);
        }
        for board in &mut self.boards {
            board.update();
        }

        let mut report = TickReport::default();
        if self.match_clear {
            for (i, board) in self.boards.iter_mut().enumerate() {
                let cells = board.clear_matching_blocks();
                if !cells.is_empty() {
                    debug!(board = i + 1, cells = cells.len(), "cleared matching blocks");
                    self.cleared[i] += cells.len() as u32;
                }
                report.cleared[i] = cells;
            }
        }

        for (i, board) in self.boards.iter_mut().enumerate() {
            if board.block_count() < self.spawn_threshold {
                let added = board.spawn_column(
                    &mut self.rng,
                    self.spawn_colors,
                    self.spawn_chance,
                    self.special_chance,
                );
                trace!(
                    tick = self.ticks,
                    board = i + 1,
                    added,
                    total = board.block_count(),
                    "spawned column"
                );
                report.spawned[i] = added;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::layout::Rect;

    fn board(rows: u16, cols: u16) -> Board {
        Board::new(rows, cols, Position::ORIGIN)
    }

    fn positions(board: &Board) -> Vec<(i32, i32)> {
        board.blocks().iter().map(|b| (b.row, b.col)).collect()
    }

    fn config() -> GameConfig {
        GameConfig {
            rows: 12,
            cols: 8,
            tick_rate: 8.0,
            spawn_threshold: 20,
            spawn_chance: 0.5,
            special_chance: 0.0,
            high_color: false,
            match_clear: false,
            seed: Some(7),
        }
    }

    #[test]
    fn block_falls_to_last_row_then_is_removed() {
        let mut b = board(12, 8);
        b.add_block(Block::new(BlockColor::Red, 10, 3));
        b.update();
        assert_eq!(positions(&b), vec![(11, 3)]);
        b.update();
        assert!(b.blocks().is_empty());
    }

    #[test]
    fn upper_block_waits_for_snapshot_occupant() {
        for lower_first in [true, false] {
            let mut b = board(12, 8);
            let (upper, lower) = if lower_first {
                let lower = b.add_block(Block::new(BlockColor::Red, 6, 2));
                (b.add_block(Block::new(BlockColor::Blue, 5, 2)), lower)
            } else {
                let upper = b.add_block(Block::new(BlockColor::Blue, 5, 2));
                (upper, b.add_block(Block::new(BlockColor::Red, 6, 2)))
            };
            b.update();
            let find = |id| b.blocks().iter().find(|x| x.id == id).map(|x| (x.row, x.col));
            assert_eq!(find(lower), Some((7, 2)));
            assert_eq!(find(upper), Some((5, 2)));
        }
    }

    #[test]
    fn block_resting_on_bottom_block_waits_one_tick() {
        let mut b = board(4, 3);
        b.add_block(Block::new(BlockColor::Green, 3, 1));
        b.add_block(Block::new(BlockColor::Green, 2, 1));
        b.update();
        assert_eq!(positions(&b), vec![(2, 1)]);
        b.update();
        assert_eq!(positions(&b), vec![(3, 1)]);
    }

    #[test]
    fn every_block_advances_unless_blocked() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut b = board(12, 8);
        for _ in 0..6 {
            b.spawn_column(&mut rng, &BlockColor::BASIC, 0.5, 0.0);
            b.move_blocks_left();
            b.update();
        }
        let before: Vec<Block> = b.blocks().to_vec();
        let occupied: HashSet<(i32, i32)> = before.iter().map(|x| (x.row, x.col)).collect();
        b.update();
        for old in &before {
            let now = b.blocks().iter().find(|x| x.id == old.id);
            if old.row == 11 {
                assert!(now.is_none());
            } else if occupied.contains(&(old.row + 1, old.col)) {
                assert_eq!(now.map(|x| x.row), Some(old.row));
            } else {
                assert_eq!(now.map(|x| x.row), Some(old.row + 1));
            }
        }
    }

    #[test]
    fn special_items_fall_through_blocks_and_leave_at_bottom() {
        let mut b = board(4, 3);
        b.add_block(Block::new(BlockColor::Red, 2, 0));
        b.add_special_item(SpecialItem::new(SpecialKind::Bomb, 1, 0));
        b.update();
        assert_eq!(b.special_items()[0].row, 2);
        b.update();
        assert_eq!(b.special_items()[0].row, 3);
        b.update();
        assert!(b.special_items().is_empty());
    }

    #[test]
    fn spawn_adds_exactly_the_cells_that_passed_the_draw() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut replay = rng.clone();
        let mut expected = 0;
        for _ in 0..12 {
            if replay.random_bool(0.5) {
                expected += 1;
                let _ = BlockColor::BASIC.choose(&mut replay);
            }
        }

        let mut b = board(12, 8);
        let added = b.spawn_column(&mut rng, &BlockColor::BASIC, 0.5, 0.0);
        assert_eq!(added, expected);
        assert_eq!(b.block_count(), expected);
        assert!(added <= 12);
        assert!(b.blocks().iter().all(|x| x.col == 8));
        assert!(b.blocks().iter().all(|x| BlockColor::BASIC.contains(&x.color)));
    }

    #[test]
    fn spawn_chance_extremes() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut b = board(5, 4);
        assert_eq!(b.spawn_column(&mut rng, &BlockColor::ALL, 0.0, 0.0), 0);
        assert_eq!(b.spawn_column(&mut rng, &BlockColor::ALL, 1.0, 0.0), 5);
        let rows: Vec<i32> = b.blocks().iter().map(|x| x.row).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_spawn_rows_can_hold_special_items() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut b = board(6, 4);
        assert_eq!(b.spawn_column(&mut rng, &BlockColor::BASIC, 0.0, 1.0), 0);
        assert_eq!(b.special_items().len(), 6);
        assert!(b.special_items().iter().all(|i| i.col == 4));
    }

    #[test]
    fn move_left_stops_at_column_zero() {
        let mut b = board(12, 8);
        b.add_block(Block::new(BlockColor::Red, 3, 0));
        b.move_blocks_left();
        assert_eq!(positions(&b), vec![(3, 0)]);
    }

    #[test]
    fn move_right_stops_at_last_column() {
        let mut b = board(12, 8);
        b.add_block(Block::new(BlockColor::Red, 3, 7));
        b.add_block(Block::new(BlockColor::Red, 4, 6));
        b.move_blocks_right();
        assert_eq!(positions(&b), vec![(3, 7), (4, 7)]);
    }

    #[test]
    fn staged_blocks_enter_the_grid_when_shifted_left() {
        let mut b = board(12, 8);
        b.add_block(Block::new(BlockColor::Blue, 0, 8));
        b.move_blocks_right();
        assert_eq!(positions(&b), vec![(0, 8)]);
        b.move_blocks_left();
        assert_eq!(positions(&b), vec![(0, 7)]);
    }

    #[test]
    fn shifting_never_leaves_the_grid() {
        let mut rng = StdRng::seed_from_u64(77);
        let mut b = board(12, 8);
        b.spawn_column(&mut rng, &BlockColor::BASIC, 1.0, 0.0);
        for step in 0..40 {
            if rng.random_bool(0.5) {
                b.move_blocks_left();
            } else {
                b.move_blocks_right();
            }
            if step % 5 == 0 {
                b.update();
            }
            for block in b.blocks() {
                assert!((0..=8).contains(&block.col));
            }
        }
        b.move_blocks_left();
        assert!(b.blocks().iter().all(|x| (0..8).contains(&x.col)));
    }

    #[test]
    fn remove_block_by_identity() {
        let mut b = board(12, 8);
        let a = b.add_block(Block::new(BlockColor::Red, 1, 1));
        let c = b.add_block(Block::new(BlockColor::Red, 1, 1));
        assert_ne!(a, c);
        assert_eq!(b.remove_block(a).map(|x| x.id), Some(a));
        assert_eq!(b.block_count(), 1);
        assert!(b.remove_block(a).is_none());
        assert_eq!(b.block_count(), 1);
    }

    #[test]
    fn clears_horizontal_and_vertical_runs() {
        let mut b = board(6, 5);
        for col in 0..3 {
            b.add_block(Block::new(BlockColor::Red, 5, col));
        }
        b.add_block(Block::new(BlockColor::Green, 5, 3));
        for row in 2..5 {
            b.add_block(Block::new(BlockColor::Blue, row, 4));
        }
        b.add_block(Block::new(BlockColor::Blue, 0, 0));
        b.add_block(Block::new(BlockColor::Blue, 0, 1));

        let cleared = b.clear_matching_blocks();
        let cells: Vec<(i32, i32)> = cleared.iter().map(|c| (c.row, c.col)).collect();
        assert_eq!(cells, vec![(2, 4), (3, 4), (4, 4), (5, 0), (5, 1), (5, 2)]);
        assert_eq!(positions(&b), vec![(5, 3), (0, 0), (0, 1)]);
        assert_eq!(cleared[0].color, BlockColor::Blue);
    }

    #[test]
    fn staging_column_never_matches() {
        let mut b = board(6, 2);
        for row in 0..4 {
            b.add_block(Block::new(BlockColor::Red, row, 2));
        }
        assert!(b.clear_matching_blocks().is_empty());
        assert_eq!(b.block_count(), 4);
    }

    #[test]
    fn overlapping_blocks_match_as_one_cell() {
        let mut b = board(6, 5);
        b.add_block(Block::new(BlockColor::Red, 5, 0));
        b.add_block(Block::new(BlockColor::Blue, 5, 0));
        b.add_block(Block::new(BlockColor::Red, 5, 1));
        b.add_block(Block::new(BlockColor::Red, 5, 2));

        let cleared = b.clear_matching_blocks();
        assert_eq!(cleared.len(), 3);
        assert!(cleared.iter().all(|c| c.color == BlockColor::Red));
        assert_eq!(b.block_count(), 0);
    }

    #[test]
    fn first_added_colour_decides_an_overlapping_cell() {
        let mut b = board(6, 5);
        b.add_block(Block::new(BlockColor::Blue, 5, 0));
        b.add_block(Block::new(BlockColor::Red, 5, 0));
        b.add_block(Block::new(BlockColor::Red, 5, 1));
        b.add_block(Block::new(BlockColor::Red, 5, 2));

        assert!(b.clear_matching_blocks().is_empty());
        assert_eq!(b.block_count(), 4);
    }

    #[test]
    fn draw_layers_grid_blocks_then_items() {
        let theme = Theme::default();
        let mut b = Board::new(3, 3, Position::new(1, 1));
        b.add_block(Block::new(BlockColor::Red, 0, 0));
        b.add_block(Block::new(BlockColor::Blue, 2, 1));
        b.add_special_item(SpecialItem::new(SpecialKind::Bomb, 2, 1));
        let mut buf = Buffer::empty(Rect::new(0, 0, 12, 6));
        b.draw(&mut buf, Position::new(1, 0), &theme);

        // Canvas (1,0) + origin (1,1): cell (0,0) starts at x=2, y=1.
        assert_eq!(buf[(2, 1)].symbol(), "█");
        assert_eq!(buf[(2, 1)].fg, theme.block_color(BlockColor::Red));
        assert_eq!(buf[(4, 1)].symbol(), "·");
        assert_eq!(buf[(4, 3)].symbol(), "(");
        assert_eq!(buf[(5, 3)].symbol(), ")");
        assert_eq!(buf[(0, 0)].symbol(), " ");
    }

    #[test]
    fn draw_clips_cells_outside_the_buffer() {
        let theme = Theme::default();
        let mut b = board(12, 8);
        b.add_block(Block::new(BlockColor::Red, 0, -1));
        b.add_block(Block::new(BlockColor::Red, 11, 8));
        let mut buf = Buffer::empty(Rect::new(0, 0, 4, 2));
        b.draw(&mut buf, Position::ORIGIN, &theme);
        assert_eq!(buf[(0, 0)].symbol(), "·");
    }

    #[test]
    fn tick_shifts_only_player_one() {
        let mut state = GameState::new(&config(), [Position::ORIGIN; 2]);
        for board in &mut state.boards {
            board.add_block(Block::new(BlockColor::Red, 0, 3));
        }
        state.spawn_threshold = 0;
        state.tick(Some(Shift::Left));
        assert_eq!(positions(&state.boards[0]), vec![(1, 2)]);
        assert_eq!(positions(&state.boards[1]), vec![(1, 3)]);
    }

    #[test]
    fn tick_spawns_only_below_threshold() {
        let mut cfg = config();
        cfg.spawn_chance = 1.0;
        let mut state = GameState::new(&cfg, [Position::ORIGIN; 2]);
        let report = state.tick(None);
        assert_eq!(report.spawned, [12, 12]);
        state.spawn_threshold = 12;
        let report = state.tick(None);
        // Bottom-row block fell off, leaving 11 < 12.
        assert_eq!(report.spawned, [12, 12]);
        let report = state.tick(None);
        assert_eq!(report.spawned, [0, 0]);
    }

    #[test]
    fn tick_clears_matches_when_enabled() {
        let mut cfg = config();
        cfg.match_clear = true;
        cfg.spawn_chance = 0.0;
        let mut state = GameState::new(&cfg, [Position::ORIGIN; 2]);
        for col in 0..3 {
            state.boards[1].add_block(Block::new(BlockColor::Green, 9, col));
        }
        let report = state.tick(None);
        assert!(report.has_clears());
        assert_eq!(report.cleared[1].len(), 3);
        assert_eq!(state.cleared, [0, 3]);
        assert_eq!(state.boards[1].block_count(), 0);
    }

    #[test]
    fn seeded_games_are_reproducible() {
        let mut a = GameState::new(&config(), [Position::ORIGIN; 2]);
        let mut b = GameState::new(&config(), [Position::ORIGIN; 2]);
        for _ in 0..25 {
            a.tick(Some(Shift::Left));
            b.tick(Some(Shift::Left));
        }
        assert_eq!(a.boards[0].blocks(), b.boards[0].blocks());
        assert_eq!(a.boards[1].blocks(), b.boards[1].blocks());
    }
}
