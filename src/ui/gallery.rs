use chrono::DateTime;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::App;

/// `updated_at` as a short UTC date; bundled collages carry no timestamp.
pub fn format_updated(updated_at: f64) -> String {
    if updated_at <= 0.0 {
        return "bundled".to_string();
    }
    DateTime::from_timestamp(updated_at as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn render_gallery(app: &App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Collage list
            Constraint::Length(1), // Instructions
        ])
        .split(f.area());

    let title = Paragraph::new(format!("Pick a collage  [{}]", app.source))
        .block(Block::default().borders(Borders::ALL).title("seekr"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let gallery = &app.gallery;
    if gallery.loading || gallery.error.is_some() || gallery.items.is_empty() {
        let (text, style) = if gallery.loading {
            ("Loading gallery...".to_string(), Style::default().fg(Color::Gray))
        } else if let Some(err) = &gallery.error {
            (format!("Gallery unavailable: {err}"), Style::default().fg(Color::Red))
        } else {
            ("No collages yet".to_string(), Style::default().fg(Color::Gray))
        };
        let msg = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .style(style)
            .alignment(Alignment::Center);
        f.render_widget(msg, chunks[1]);
    } else {
        // keep the selection on screen
        let visible = chunks[1].height.saturating_sub(3).max(1) as usize;
        let offset = (gallery.selected + 1).saturating_sub(visible);

        let rows: Vec<Row> = gallery
            .items
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible)
            .map(|(idx, item)| {
                let row = Row::new(vec![
                    Cell::from(item.id.clone()),
                    Cell::from(format_updated(item.updated_at)),
                ]);
                if idx == gallery.selected {
                    row.style(Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD))
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(rows, [Constraint::Min(12), Constraint::Length(18)])
            .header(
                Row::new(vec!["collage", "updated"]).style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            )
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Collages ({}/{})",
                gallery.selected + 1,
                gallery.items.len()
            )));
        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new("↑/↓ select | (enter) play | (r)efresh | (esc) back")
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}
