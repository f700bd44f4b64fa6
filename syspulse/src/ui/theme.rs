//! Shared UI theme constants.

use ratatui::style::Color;

use crate::alerts::Tier;
use crate::connection::ConnectionState;
use crate::types::AlertLevel;

pub const CPU: Color = Color::Cyan;
pub const MEMORY: Color = Color::Magenta;
pub const DISK: Color = Color::Yellow;
pub const NET_DOWN: Color = Color::Green;
pub const NET_UP: Color = Color::Blue;
pub const MUTED: Color = Color::DarkGray;

pub fn tier_color(t: Tier) -> Color {
    match t {
        Tier::Normal => Color::Green,
        Tier::Warning => Color::Yellow,
        Tier::Critical => Color::Red,
    }
}

pub fn level_color(l: AlertLevel) -> Color {
    match l {
        AlertLevel::Warning => Color::Yellow,
        AlertLevel::Critical => Color::Red,
    }
}

pub fn status_color(s: ConnectionState) -> Color {
    match s {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Error => Color::Red,
        _ => Color::Rgb(255, 152, 0),
    }
}
