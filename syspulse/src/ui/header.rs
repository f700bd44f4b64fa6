//! Top header: host, connection status, last update and backend version.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::connection::ConnectionState;
use crate::monitor::Field;
use crate::ui::display::DisplayState;
use crate::ui::theme::{status_color, MUTED};

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, d: &DisplayState, state: ConnectionState) {
    let host = d.get_or(Field::Host, "waiting for first sample");
    let line = Line::from(vec![
        Span::styled("syspulse", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" v{} — {host} | ", d.get_or(Field::Version, "?"))),
        Span::styled(
            d.get_or(Field::Status, state.label()).to_string(),
            Style::default().fg(status_color(state)),
        ),
        Span::raw(format!(" | updated {}", d.get_or(Field::LastUpdate, "never"))),
        Span::styled("  (press 'q' to quit)", Style::default().fg(MUTED)),
    ]);
    let notice = d.get(Field::Notice).unwrap_or("");
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM).title(notice.to_string())),
        area,
    );
}
