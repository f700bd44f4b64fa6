//! Usage sparklines fed from history snapshots.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};

use crate::alerts::Tier;
use crate::history::{MetricsHistory, Series};
use crate::ui::theme::tier_color;

/// Latest points that fit inside the bordered area, as sparkline bars.
pub fn visible_points(values: &[f64], area: Rect) -> Vec<u64> {
    let max_points = area.width.saturating_sub(2) as usize;
    let start = values.len().saturating_sub(max_points);
    values[start..].iter().map(|v| v.max(0.0).round() as u64).collect()
}

// Border color follows the alert tier of the latest value.
pub fn draw_usage_spark(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    hist: &MetricsHistory,
    series: Series,
    color: Color,
    tier: Tier,
) {
    let data = visible_points(&hist.snapshot(series), area);
    let spark = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(tier_color(tier)))
                .title(title.to_string()),
        )
        .data(&data)
        .max(100)
        .style(Style::default().fg(color));
    f.render_widget(spark, area);
}

// Network rates have no fixed ceiling; scale to the window peak.
pub fn draw_rate_spark(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    hist: &MetricsHistory,
    series: Series,
    color: Color,
) {
    let data = visible_points(&hist.snapshot(series), area);
    let title = format!(
        "{title} — now: {:.1} | peak: {:.1}",
        hist.latest(series).unwrap_or(0.0),
        hist.peak(series)
    );
    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .style(Style::default().fg(color));
    f.render_widget(spark, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_what_fits() {
        let values = [1.2, 2.6, 3.0, 4.4];
        assert_eq!(visible_points(&values, Rect::new(0, 0, 4, 3)), vec![3, 4]);
        assert_eq!(visible_points(&values, Rect::new(0, 0, 40, 3)), vec![1, 3, 3, 4]);
        assert!(visible_points(&values, Rect::new(0, 0, 1, 3)).is_empty());
    }
}
