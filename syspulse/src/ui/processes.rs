//! Top processes table with per-cell coloring and a sort indicator.

use ratatui::style::Modifier;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Cell, Row, Table},
};

use crate::processes::ProcSortBy;
use crate::types::ProcessInfo;
use crate::ui::util::{human, truncate_middle};

const COLS: [Constraint; 5] = [
    Constraint::Length(8),      // PID
    Constraint::Percentage(40), // Name
    Constraint::Length(8),      // CPU %
    Constraint::Length(8),      // Mem %
    Constraint::Length(10),     // RSS
];

fn pct(v: Option<f64>) -> String {
    v.map(|x| format!("{:>5.1}", x.clamp(0.0, 100.0)))
        .unwrap_or_else(|| "    -".into())
}

pub fn draw_top_processes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    ranked: &[ProcessInfo],
    total: usize,
    sort_by: ProcSortBy,
) {
    let name_width = (area.width as usize * 40 / 100).max(4);
    let rows = ranked.iter().map(|p| {
        let cpu_fg = match p.cpu_percent.unwrap_or(0.0) {
            x if x < 25.0 => Color::Green,
            x if x < 60.0 => Color::Yellow,
            _ => Color::Red,
        };
        let mem_fg = match p.memory_percent.unwrap_or(0.0) {
            x if x < 5.0 => Color::Blue,
            x if x < 20.0 => Color::Magenta,
            _ => Color::Red,
        };
        Row::new(vec![
            Cell::from(p.pid.to_string()).style(Style::default().fg(Color::DarkGray)),
            Cell::from(truncate_middle(&p.name, name_width)),
            Cell::from(pct(p.cpu_percent)).style(Style::default().fg(cpu_fg)),
            Cell::from(pct(p.memory_percent)).style(Style::default().fg(mem_fg)),
            Cell::from(p.memory_rss.map(human).unwrap_or_default()),
        ])
    });

    let (cpu_hdr, mem_hdr) = match sort_by {
        ProcSortBy::CpuDesc => ("CPU % •", "Mem %"),
        ProcSortBy::MemDesc => ("CPU %", "Mem % •"),
    };
    let header = Row::new(vec!["PID", "Name", cpu_hdr, mem_hdr, "RSS"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let table = Table::new(rows, COLS.to_vec())
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Top Processes ({total} total, 'p' to switch)")),
        );
    f.render_widget(table, area);
}
