//! Key bindings, the pressed-key map, and choosing between keyboard and gamepad.

use crate::game::{Player, Shift};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::{HashMap, HashSet};

/// Stick deflection needed before the gamepad counts as pushed left or right.
pub const AXIS_THRESHOLD: f32 = 0.5;

/// One-shot action from a key press. Horizontal movement is not an action: it is read
/// from the pressed-key map every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ready(Player),
    Pause,
    Quit,
    None,
}

/// Map key event to action. Enter readies player one, `e` readies player two.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    if modifiers == KeyModifiers::CONTROL {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Enter => Action::Ready(Player::One),
        KeyCode::Char('e') => Action::Ready(Player::Two),
        _ => Action::None,
    }
}

/// Pressed state per key, toggled by press and release events, plus every key pressed
/// since the last tick so a tap released between two ticks still counts once.
#[derive(Debug, Default)]
pub struct KeyState {
    pressed: HashMap<KeyCode, bool>,
    tapped: HashSet<KeyCode>,
}

impl KeyState {
    pub fn handle(&mut self, key: KeyEvent) {
        let down = matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat);
        self.pressed.insert(key.code, down);
        if key.kind == KeyEventKind::Press {
            self.tapped.insert(key.code);
        }
    }

    /// Forget taps consumed by the tick that just ran.
    pub fn end_tick(&mut self) {
        self.tapped.clear();
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.get(&code).copied().unwrap_or(false)
    }

    /// Forget every press. Used after each tick when the terminal never reports releases.
    pub fn release_all(&mut self) {
        self.pressed.clear();
        self.tapped.clear();
    }

    /// Left wins when both directions are held.
    pub fn horizontal(&self) -> Option<Shift> {
        let any = |codes: &[KeyCode]| {
            codes
                .iter()
                .any(|c| self.is_pressed(*c) || self.tapped.contains(c))
        };
        if any(&[KeyCode::Left, KeyCode::Char('h')]) {
            Some(Shift::Left)
        } else if any(&[KeyCode::Right, KeyCode::Char('l')]) {
            Some(Shift::Right)
        } else {
            None
        }
    }
}

pub fn axis_to_shift(x: f32) -> Option<Shift> {
    if x < -AXIS_THRESHOLD {
        Some(Shift::Left)
    } else if x > AXIS_THRESHOLD {
        Some(Shift::Right)
    } else {
        None
    }
}

/// A connected gamepad (its axis value is `Some`) replaces the keyboard entirely.
pub fn horizontal_intent(gamepad_axis: Option<f32>, keys: &KeyState) -> Option<Shift> {
    match gamepad_axis {
        Some(x) => axis_to_shift(x),
        None => keys.horizontal(),
    }
}
