//! Alert panel: thresholds, stats, and the most recent alerts.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::alerts::AlertLog;
use crate::monitor::Field;
use crate::types::{AlertConfig, AlertType};
use crate::ui::display::DisplayState;
use crate::ui::theme::{level_color, MUTED};

pub fn draw_alerts(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    cfg: &AlertConfig,
    log: &AlertLog,
    d: &DisplayState,
) {
    let state = if cfg.enabled { "on" } else { "off" };
    let title = format!(
        "Alerts [{state}] CPU {:.0}% RAM {:.0}% DISK {:.0}%",
        cfg.threshold(AlertType::Cpu),
        cfg.threshold(AlertType::Ram),
        cfg.threshold(AlertType::Disk)
    );

    let mut lines = vec![Line::from(Span::styled(
        d.get_or(Field::AlertSummary, "no alerts yet").to_string(),
        Style::default().fg(MUTED),
    ))];
    let rows = area.height.saturating_sub(3) as usize;
    for a in log.iter_newest_first().take(rows) {
        let style = if a.active {
            Style::default().fg(level_color(a.level)).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(level_color(a.level))
        };
        lines.push(Line::from(vec![
            Span::styled(
                a.timestamp.with_timezone(&chrono::Local).format("%H:%M:%S ").to_string(),
                Style::default().fg(MUTED),
            ),
            Span::styled(a.message.trim_end().to_string(), style),
        ]));
    }

    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}
