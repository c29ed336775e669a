pub mod gallery;
pub mod leaderboard;
pub mod screen;

use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use seekr::{
    feedback,
    game::{CountdownStage, GameSession, Phase},
    geometry::{HintArrow, Point, Surface, CELL_HEIGHT, CELL_WIDTH},
    leaderboard::rank_by_time,
    placement::Placement,
};

use crate::App;

const SIDE_PANEL_WIDTH: u16 = 30;
const SWATCH_ROWS: u16 = 3;

const PALETTE: [Color; 8] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::LightRed,
    Color::LightGreen,
];
const FILLS: [&str; 4] = ["█", "▓", "▒", "░"];

/// Screen regions of the play screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayLayout {
    pub header: Rect,
    pub board: Rect,
    pub side: Rect,
    pub status: Rect,
    pub legend: Rect,
}

pub fn play_layout(area: Rect) -> PlayLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),    // collage + side panel
            Constraint::Length(1), // status
            Constraint::Length(1), // legend
        ])
        .split(area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(rows[1]);

    PlayLayout {
        header: rows[0],
        board: cols[0],
        side: cols[1],
        status: rows[2],
        legend: rows[3],
    }
}

/// Where the collage goes for a frame of this size, if it fits at all.
pub fn surface_for(area: Rect) -> Option<Surface> {
    let board = play_layout(area).board;
    Surface::fit(board.x, board.y, board.width, board.height)
}

/// Fill glyph and colour standing in for a photo.
pub fn swatch(image: usize) -> (&'static str, Style) {
    let fill = FILLS[(image / PALETTE.len()) % FILLS.len()];
    (fill, Style::default().fg(PALETTE[image % PALETTE.len()]))
}

/// Eight-way arrow head for an angle measured clockwise from the +x axis
/// (screen y grows downwards).
pub fn arrow_glyph(angle_degrees: f64) -> &'static str {
    const HEADS: [&str; 8] = ["→", "↘", "↓", "↙", "←", "↖", "↑", "↗"];
    let idx = ((angle_degrees.rem_euclid(360.0) + 22.5) / 45.0).floor() as usize % HEADS.len();
    HEADS[idx]
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let now = Instant::now();
        let session = &self.session;
        let layout = play_layout(area);

        render_header(self, now, layout.header, buf);

        match self.surface {
            Some(surface) => render_surface(self, &surface, buf),
            None => {
                Paragraph::new(Span::styled(
                    "Terminal too small, please resize",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(layout.board, buf);
            }
        }

        render_side_panel(session, layout.side, buf);

        let status = match (session.status(), session.phase()) {
            (Some(status), _) => Span::styled(
                status.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            (None, Phase::Active) => Span::raw(feedback::LOOK_FOR_TARGET),
            (None, _) => Span::raw(""),
        };
        Paragraph::new(status)
            .alignment(Alignment::Center)
            .render(layout.status, buf);

        Paragraph::new(Span::styled(
            "(s)tart / (h)int / arrows+enter or mouse to pick / (g)allery / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(layout.legend, buf);

        if let Some(prompt) = session.name_prompt() {
            render_name_prompt(session, &prompt.input, prompt.rejected, area, buf);
        } else if self.show_result {
            render_result(session, area, buf);
        }
    }
}

fn render_header(app: &App, now: Instant, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let time = match session.result() {
        Some(result) => result.time,
        None => session.elapsed_secs(),
    };

    let hints: String = (0..session.max_hints())
        .map(|i| if i < session.hints_remaining() { '●' } else { '○' })
        .collect();
    let hint_state = match session.cooldown_progress(now) {
        Some(progress) if session.phase() == Phase::Active => {
            format!(" {:>3.0}%", progress * 100.0)
        }
        _ => String::new(),
    };

    let mut spans = vec![
        Span::styled("seekr ", bold.fg(Color::Magenta)),
        Span::styled(session.collage_id().unwrap_or("-").to_string(), bold),
        Span::styled(format!("  {}  ", session.phase()), dim),
        Span::styled(format!("{:.2}s", time), bold),
        Span::raw("  hints "),
        Span::styled(hints, Style::default().fg(Color::Yellow)),
        Span::styled(hint_state, dim),
    ];
    if session.penalty_secs() > 0.0 {
        spans.push(Span::styled(
            format!("  +{:.0}s", session.penalty_secs()),
            Style::default().fg(Color::Red),
        ));
    }
    spans.push(Span::styled(format!("  [{}]", app.source), dim));

    Paragraph::new(Line::from(spans)).render(area, buf);
}

fn render_surface(app: &App, surface: &Surface, buf: &mut Buffer) {
    let session = &app.session;
    let rect = Rect::new(surface.left, surface.top, surface.cols, surface.rows);

    Block::default()
        .style(Style::default().fg(Color::DarkGray))
        .render(rect, buf);

    match session.phase() {
        Phase::Idle => {
            let text = if session.is_loading() {
                "Loading collage..."
            } else if session.is_ready() {
                "Press s to start"
            } else if session.collage_id().is_some() {
                "This collage cannot be played, press g to pick another"
            } else {
                "Press g to pick a collage"
            };
            render_banner(text, Style::default().add_modifier(Modifier::BOLD), rect, buf);
        }
        Phase::Countdown => {
            let text = match session.countdown() {
                Some(CountdownStage::Step(n)) => n.to_string(),
                Some(CountdownStage::Go) => "GO!".to_string(),
                None => String::new(),
            };
            render_banner(
                &text,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                rect,
                buf,
            );
        }
        Phase::Active | Phase::Finished => {
            let highlighted = session.highlighted();
            for (idx, placement) in session.placements().iter().enumerate() {
                let (fill, mut style) = swatch(placement.image);
                if highlighted == Some(idx) {
                    style = style.bg(Color::White).add_modifier(Modifier::BOLD);
                }
                draw_placement(surface, placement, fill, style, buf);
            }
            if let Some(arrow) = session.hint_arrow() {
                draw_arrow(surface, &arrow, buf);
            }
            if session.phase() == Phase::Active {
                if let Some((col, row)) = app.cursor {
                    if let Some(cell) = buf.cell_mut((col, row)) {
                        cell.set_symbol("+");
                        cell.set_style(
                            Style::default()
                                .fg(Color::White)
                                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
                        );
                    }
                }
            }
        }
    }
}

fn render_banner(text: &str, style: Style, rect: Rect, buf: &mut Buffer) {
    let line = Rect::new(rect.x, rect.y + rect.height / 2, rect.width, 1);
    Paragraph::new(Span::styled(text.to_string(), style))
        .alignment(Alignment::Center)
        .render(line, buf);
}

fn draw_placement(surface: &Surface, placement: &Placement, fill: &str, style: Style, buf: &mut Buffer) {
    for (col, row) in placement.cells(surface) {
        if let Some(cell) = buf.cell_mut((col, row)) {
            cell.set_symbol(fill);
            cell.set_style(style);
        }
    }
}

fn draw_arrow(surface: &Surface, arrow: &HintArrow, buf: &mut Buffer) {
    let tip = arrow.tip();
    let steps = (arrow.length / CELL_WIDTH.min(CELL_HEIGHT)).ceil().max(1.0) as usize;
    let shaft = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);

    for i in 0..steps {
        let t = i as f64 / steps as f64;
        let p = Point::new(
            arrow.origin.x + (tip.x - arrow.origin.x) * t,
            arrow.origin.y + (tip.y - arrow.origin.y) * t,
        );
        let (col, row) = surface.local_to_cell(p);
        if let Some(cell) = buf.cell_mut((col, row)) {
            cell.set_symbol("•");
            cell.set_style(shaft);
        }
    }

    let (col, row) = surface.local_to_cell(tip);
    if let Some(cell) = buf.cell_mut((col, row)) {
        cell.set_symbol(arrow_glyph(arrow.angle_degrees));
        cell.set_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    }
}

fn render_side_panel(session: &GameSession, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(SWATCH_ROWS + 3), // target swatch + label
            Constraint::Min(3),                  // leaderboard
        ])
        .split(area);

    let block = Block::default().borders(Borders::ALL).title("Target");
    let inner = block.inner(chunks[0]);
    block.render(chunks[0], buf);

    match session.target_image() {
        Some(target) => {
            let image = session
                .images()
                .iter()
                .position(|img| img.is_target)
                .unwrap_or_default();
            let (fill, style) = swatch(image);
            let width = inner.width.min(SWATCH_ROWS * 2) as usize;
            let mut lines: Vec<Line> = (0..SWATCH_ROWS)
                .map(|_| Line::from(Span::styled(fill.repeat(width), style)))
                .collect();
            lines.push(Line::from(Span::styled(
                target.label().to_string(),
                Style::default().add_modifier(Modifier::DIM),
            )));
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .render(inner, buf);
        }
        None => {
            Paragraph::new("no collage loaded")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray))
                .render(inner, buf);
        }
    }

    let highlight = session
        .result()
        .filter(|result| result.submitted)
        .and_then(|result| result.rank);
    leaderboard::render_leaderboard(session.leaderboard(), highlight, chunks[1], buf);
}

fn render_name_prompt(session: &GameSession, input: &str, rejected: bool, area: Rect, buf: &mut Buffer) {
    let popup = centered_rect(44, 8, area);
    Clear.render(popup, buf);

    let time = session.result().map(|r| r.time).unwrap_or_default();
    let mut lines = vec![
        Line::from(Span::styled(
            format!("Found it in {:.2}s!", time),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "Would rank #{} on this board",
            rank_by_time(session.leaderboard(), time)
        )),
        Line::from(vec![
            Span::raw("Name: "),
            Span::styled(format!("{input}▏"), Style::default().add_modifier(Modifier::BOLD)),
        ]),
    ];
    if rejected {
        lines.push(Line::from(Span::styled(
            feedback::NAME_REQUIRED,
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "(enter) submit / (esc) skip",
        Style::default().add_modifier(Modifier::ITALIC),
    )));

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Submit score"))
        .alignment(Alignment::Center)
        .render(popup, buf);
}

fn render_result(session: &GameSession, area: Rect, buf: &mut Buffer) {
    let Some(result) = session.result() else {
        return;
    };
    let popup = centered_rect(44, 7, area);
    Clear.render(popup, buf);

    let rank = if session.is_submitting() {
        "submitting...".to_string()
    } else if result.submitted {
        result
            .rank
            .map(|rank| format!("#{rank}"))
            .unwrap_or_else(|| "N/A".to_string())
    } else {
        feedback::SCORE_NOT_SUBMITTED.to_string()
    };

    let lines = vec![
        Line::from(Span::styled(
            format!("{:.2}s", result.time),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("hints used: {}", result.hints_used)),
        Line::from(format!("rank: {rank}")),
        Line::from(Span::styled(
            "(s) play again / (g)allery / (esc) close",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Found it!"))
        .alignment(Alignment::Center)
        .render(popup, buf);
}
