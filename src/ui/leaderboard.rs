use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use seekr::leaderboard::LeaderboardEntry;

const NAME_WIDTH: u16 = 14;

/// Cuts `name` to at most `max` terminal columns, marking the cut with `…`.
pub fn truncate_name(name: &str, max: usize) -> String {
    if name.width() <= max {
        return name.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in name.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Board table; `highlight` is the 1-based rank of the player's entry.
pub fn render_leaderboard(
    board: &[LeaderboardEntry],
    highlight: Option<usize>,
    area: Rect,
    buf: &mut Buffer,
) {
    let block = Block::default().borders(Borders::ALL).title("Leaderboard");

    if board.is_empty() {
        Paragraph::new("No scores yet")
            .block(block)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    }

    let rows: Vec<Row> = board
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let rank = idx + 1;
            let row = Row::new(vec![
                Cell::from(format!("{rank:>2}")),
                Cell::from(truncate_name(&entry.name, NAME_WIDTH as usize)),
                Cell::from(format!("{:>7.2}s", entry.time)),
            ]);
            if highlight == Some(rank) {
                row.style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(NAME_WIDTH),
            Constraint::Length(8),
        ],
    )
    .header(
        Row::new(vec!["#", "name", "time"]).style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);

    Widget::render(table, area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(buf: &Buffer) -> String {
        buf.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn short_names_are_untouched() {
        assert_eq!(truncate_name("amy", 14), "amy");
        assert_eq!(truncate_name("exactly-14-col", 14), "exactly-14-col");
    }

    #[test]
    fn long_names_are_cut_by_display_width() {
        assert_eq!(truncate_name("abcdefghijklmnop", 6), "abcde…");
        // wide glyphs take two columns each
        assert_eq!(truncate_name("日本語の名前です", 7), "日本語…");
        assert!(truncate_name("日本語の名前です", 7).width() <= 7);
    }

    #[test]
    fn renders_entries_in_order() {
        let board = vec![
            LeaderboardEntry::new("amy", 3.1),
            LeaderboardEntry::new("zed", 12.0),
        ];
        let area = Rect::new(0, 0, 30, 6);
        let mut buf = Buffer::empty(area);

        render_leaderboard(&board, Some(2), area, &mut buf);

        let text = rendered(&buf);
        let amy = text.find("amy").unwrap();
        let zed = text.find("zed").unwrap();
        assert!(amy < zed);
        assert!(text.contains("3.10s"));
        assert!(text.contains("12.00s"));
    }

    #[test]
    fn empty_board_says_so() {
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        render_leaderboard(&[], None, area, &mut buf);
        assert!(rendered(&buf).contains("No scores yet"));
    }
}
