use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState,
    },
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, BarMode, Screen};
use crate::catalog::Recitation;
use crate::notice::Level;
use crate::player::{RepeatMode, Transport};
use crate::theme::Theme;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

// ── Format helpers ─────────────────────────────────────────────────

pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".into();
    }
    let total = seconds as u64;
    let m = total / 60;
    let s = total % 60;
    format!("{}:{:02}", m, s)
}

/// Cut `s` to at most `max` terminal columns, ending in an ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w + 1 > max {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}

fn spinner_frame() -> &'static str {
    let tick = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 100;
    SPINNER[(tick % SPINNER.len() as u128) as usize]
}

fn transport_icon(transport: Transport) -> &'static str {
    match transport {
        Transport::Idle => "○",
        Transport::Loading => spinner_frame(),
        Transport::Playing => "▶",
        Transport::Paused => "⏸",
    }
}

fn volume_icon(volume: f64) -> &'static str {
    if volume == 0.0 {
        "🔇"
    } else if volume < 0.5 {
        "🔉"
    } else {
        "🔊"
    }
}

fn repeat_span(mode: RepeatMode, th: &Theme) -> Span<'static> {
    match mode {
        RepeatMode::None => Span::styled("↻ Off", Style::default().fg(th.dim)),
        RepeatMode::Surah => Span::styled("↻ Surah", Style::default().fg(th.green).bold()),
        RepeatMode::Verse => Span::styled("↻¹ Verse", Style::default().fg(th.yellow).bold()),
        RepeatMode::Selection => {
            Span::styled("↻÷ Selection", Style::default().fg(th.yellow).bold())
        }
    }
}

/// The recitation the bar shows: the current one, or the one being started.
fn bar_recitation(app: &App) -> Option<&Recitation> {
    app.player.current().or_else(|| {
        app.player
            .pending_selection()
            .and_then(|i| app.player.catalog().get(i))
    })
}

fn bar_height(app: &App) -> u16 {
    if bar_recitation(app).is_none() {
        return 0;
    }
    match app.bar {
        BarMode::Full => 6,
        BarMode::Minimized => 3,
        BarMode::Closed => 0,
    }
}

// ── Drawing ────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();
    f.render_widget(Block::default().style(Style::default().bg(app.theme.surface)), size);

    if let Screen::NotFound(id) = &app.screen {
        let id = id.clone();
        draw_not_found(f, size, app, &id);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(bar_height(app)),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(f, chunks[0], app);
    draw_recitation_list(f, chunks[1], app);
    match app.bar {
        BarMode::Full => draw_player_bar(f, chunks[2], app),
        BarMode::Minimized => draw_mini_bar(f, chunks[2], app),
        BarMode::Closed => app.progress_bar_area = None,
    }
    draw_status_bar(f, chunks[3], app);

    if app.show_help {
        draw_help_overlay(f, size, &app.theme);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let th = &app.theme;
    let title = " ☪ Tilawa · مشغل التلاوات ";
    let state_str = match app.player.transport() {
        Transport::Idle => " ○ idle ".to_string(),
        Transport::Loading => format!(" {} loading ", spinner_frame()),
        Transport::Playing => " ● playing ".to_string(),
        Transport::Paused => " ⏸ paused ".to_string(),
    };
    let state_color = match app.player.transport() {
        Transport::Playing => th.green,
        Transport::Paused | Transport::Loading => th.yellow,
        Transport::Idle => th.dim,
    };
    let pad_len = area
        .width
        .saturating_sub(title.width() as u16 + state_str.width() as u16) as usize;

    let header = Line::from(vec![
        Span::styled(title, Style::default().fg(th.accent).bold()),
        Span::styled(" ".repeat(pad_len), Style::default().bg(th.surface_light)),
        Span::styled(state_str, Style::default().fg(state_color).bold()),
    ]);
    f.render_widget(
        Paragraph::new(header).style(Style::default().bg(th.surface_light)),
        area,
    );
}

fn draw_recitation_list(f: &mut Frame, area: Rect, app: &mut App) {
    let th = app.theme;
    let state = app.player.state();
    let pending = app.player.pending_selection();
    let max_width = area.width.saturating_sub(8) as usize;

    let items: Vec<ListItem> = app
        .player
        .catalog()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let is_active = state.current == Some(i);
            let prefix = if pending == Some(i) {
                format!("{} ", spinner_frame())
            } else if is_active && state.is_playing {
                "▶ ".to_string()
            } else if is_active {
                "⏸ ".to_string()
            } else {
                "  ".to_string()
            };
            let style = if is_active {
                Style::default().fg(th.green)
            } else {
                Style::default().fg(th.text)
            };
            let dim_style = if is_active {
                Style::default().fg(th.green)
            } else {
                Style::default().fg(th.text_dim)
            };

            let meta = format!("  {} · {} verses", r.reciter.name, r.surah.verse_count);
            let name = format!("{} {}", r.surah.name, r.surah.localized_name);
            let name_max = max_width.saturating_sub(meta.width() + 2);

            ListItem::new(Line::from(vec![
                Span::styled(prefix, style),
                Span::styled(truncate(&name, name_max), style.bold()),
                Span::styled(meta, dim_style),
            ]))
        })
        .collect();

    let total = items.len();
    let block = Block::default()
        .title(Span::styled(
            format!(" Recitations ({}) ", total),
            Style::default().fg(th.text_dim).bold(),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(th.accent))
        .style(Style::default().bg(th.surface));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(th.highlight_bg)
                .fg(th.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    f.render_stateful_widget(list, area, &mut app.list_state);

    let inner_height = area.height.saturating_sub(2) as usize;
    if total > inner_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_style(Style::default().fg(th.accent))
            .track_style(Style::default().fg(th.border));
        let mut scrollbar_state =
            ScrollbarState::new(total).position(app.list_state.selected().unwrap_or(0));
        let scroll_area = Rect {
            x: area.x,
            y: area.y + 1,
            width: area.width,
            height: area.height.saturating_sub(2),
        };
        f.render_stateful_widget(scrollbar, scroll_area, &mut scrollbar_state);
    }
}

fn progress_line(app: &App, width: u16) -> Line<'static> {
    let th = &app.theme;
    let state = app.player.state();
    let duration = state.duration.unwrap_or(0.0);
    let pos_str = format_time(state.current_time);
    let dur_str = format_time(duration);

    let bar_width = width.saturating_sub(pos_str.len() as u16 + dur_str.len() as u16 + 6) as usize;
    let ratio = if duration > 0.0 {
        (state.current_time / duration).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (ratio * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled + 1);
    // Seeking is disabled while loading; the bar is drawn dim.
    let fill_color = if state.loading { th.dim } else { th.accent };

    Line::from(vec![
        Span::styled(format!("  {} ", pos_str), Style::default().fg(th.text_dim)),
        Span::styled("━".repeat(filled), Style::default().fg(fill_color)),
        Span::styled("●", Style::default().fg(th.text).bold()),
        Span::styled("╌".repeat(empty), Style::default().fg(th.dim)),
        Span::styled(format!(" {} ", dur_str), Style::default().fg(th.text_dim)),
    ])
}

fn draw_player_bar(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(r) = bar_recitation(app) else {
        app.progress_bar_area = None;
        return;
    };
    let th = app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(th.border))
        .title(Span::styled(" Now Playing ", Style::default().fg(th.text_dim).bold()))
        .title_bottom(Line::from(Span::styled(" z minimize · x close ", Style::default().fg(th.dim))).right_aligned())
        .style(Style::default().bg(th.surface));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let title = Line::from(vec![
        Span::styled(format!(" {} ", r.surah.localized_name), Style::default().fg(th.text).bold()),
        Span::styled(format!("{} ", r.surah.name), Style::default().fg(th.text)),
        Span::styled(format!("({})", r.surah.english_name), Style::default().fg(th.text_dim)),
        Span::styled("  ·  ", Style::default().fg(th.dim)),
        Span::styled(r.reciter.local_name().to_string(), Style::default().fg(th.text_dim)),
    ]);
    f.render_widget(Paragraph::new(title), rows[0]);

    let progress = progress_line(app, rows[1].width);
    f.render_widget(Paragraph::new(progress), rows[1]);
    app.progress_bar_area = Some(rows[1]);

    f.render_widget(Paragraph::new(controls_line(app)), rows[2]);
}

fn controls_line(app: &App) -> Line<'static> {
    let th = &app.theme;
    let state = app.player.state();
    let transport = app.player.transport();

    let mut spans = vec![Span::raw("  ")];
    spans.push(repeat_span(state.repeat_mode, th));
    spans.push(Span::raw("   "));

    let volume_pct = (state.volume * 100.0).round() as usize;
    let bar_width = 10;
    let filled = (volume_pct * bar_width) / 100;
    let vol_color = if volume_pct == 0 { th.red } else { th.accent };
    spans.push(Span::styled(
        format!("{} ", volume_icon(state.volume)),
        Style::default().fg(vol_color),
    ));
    spans.push(Span::styled("█".repeat(filled), Style::default().fg(vol_color)));
    spans.push(Span::styled(
        "░".repeat(bar_width - filled),
        Style::default().fg(th.dim),
    ));
    spans.push(Span::styled(
        format!(" {}%", volume_pct),
        Style::default().fg(th.text_dim),
    ));

    spans.push(Span::raw("    "));
    let transport_color = match transport {
        Transport::Playing => th.green,
        Transport::Loading => th.yellow,
        _ => th.text_dim,
    };
    spans.push(Span::styled("⏮ ", Style::default().fg(th.text_dim)));
    spans.push(Span::styled("↺ ", Style::default().fg(th.text_dim)));
    spans.push(Span::styled(
        format!("{} ", transport_icon(transport)),
        Style::default().fg(transport_color).bold(),
    ));
    spans.push(Span::styled("⏭", Style::default().fg(th.text_dim)));

    spans.push(Span::raw("    "));
    spans.push(Span::styled(
        "⤓ d  ☰ o  ⇪ s",
        Style::default().fg(th.dim),
    ));
    Line::from(spans)
}

fn draw_mini_bar(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(r) = bar_recitation(app) else {
        app.progress_bar_area = None;
        return;
    };
    let th = app.theme;
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(th.border))
        .style(Style::default().bg(th.surface));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let transport = app.player.transport();
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", transport_icon(transport)),
            Style::default().fg(th.accent).bold(),
        ),
        Span::styled(r.surah.localized_name.clone(), Style::default().fg(th.text).bold()),
        Span::styled(" · ", Style::default().fg(th.dim)),
        Span::styled(r.reciter.local_name().to_string(), Style::default().fg(th.text_dim)),
    ]);
    f.render_widget(Paragraph::new(line), rows[0]);

    let progress = progress_line(app, rows[1].width);
    f.render_widget(Paragraph::new(progress), rows[1]);
    app.progress_bar_area = Some(rows[1]);
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let th = &app.theme;
    let (text, color) = match &app.status {
        Some((notice, _)) => {
            let color = match notice.level {
                Level::Info => th.text_dim,
                Level::Success => th.green,
                Level::Error => th.red,
            };
            (notice.text.clone(), color)
        }
        None => ("Ready · ? for help".to_string(), th.dim),
    };
    let icon = transport_icon(app.player.transport());
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {}  {} ", icon, text),
            Style::default().fg(color),
        )))
        .style(Style::default().bg(th.surface_light)),
        area,
    );
}

fn draw_not_found(f: &mut Frame, area: Rect, app: &App, id: &str) {
    let th = &app.theme;
    let width = 50.min(area.width.saturating_sub(4));
    let height = 9.min(area.height);
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    let popup = Rect::new(x, y, width, height);

    let lines = vec![
        Line::from(Span::styled("404", Style::default().fg(th.accent).bold())).centered(),
        Line::from(""),
        Line::from(Span::styled("الصفحة غير موجودة", Style::default().fg(th.text))).centered(),
        Line::from(Span::styled(
            format!("No recitation with id \"{}\"", truncate(id, 24)),
            Style::default().fg(th.text_dim),
        ))
        .centered(),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(th.accent).bold()),
            Span::styled("  back to the recitations →", Style::default().fg(th.text_dim)),
        ])
        .centered(),
    ];
    f.render_widget(Paragraph::new(lines), popup);
}

fn draw_help_overlay(f: &mut Frame, area: Rect, theme: &Theme) {
    let th = theme;
    let width = 52.min(area.width.saturating_sub(4));
    let height = 30.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    let popup = Rect::new(x, y, width, height);

    f.render_widget(Clear, popup);

    let block = Block::default()
        .title(Span::styled(
            " Keyboard Shortcuts ",
            Style::default().fg(th.accent).bold(),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(th.accent))
        .style(Style::default().bg(th.surface));

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let sections: Vec<(&str, Vec<(&str, &str)>)> = vec![
        (
            "PLAYBACK",
            vec![
                ("Enter", "Play selected / toggle current"),
                ("Space", "Play / Pause"),
                ("n  p", "Next / Previous"),
                ("r", "Replay from start"),
                ("v", "Repeat (off → surah → verse → selection)"),
            ],
        ),
        (
            "AUDIO",
            vec![
                ("+ / -", "Volume up / down (±5%)"),
                ("m", "Mute / Unmute"),
                ("← / →", "Seek back / forward 10s"),
            ],
        ),
        (
            "NAVIGATION",
            vec![
                ("j / k / ↑↓", "Move up / down"),
                ("g / G", "Top / Bottom"),
            ],
        ),
        (
            "RECITATION",
            vec![
                ("d", "Download"),
                ("o", "Add to playlist"),
                ("s", "Share"),
            ],
        ),
        (
            "OTHER",
            vec![
                ("z / F2", "Minimize player"),
                ("x", "Close player"),
                ("t", "Cycle theme"),
                ("?", "Toggle this help"),
                ("q", "Quit"),
            ],
        ),
    ];

    let mut lines: Vec<Line> = Vec::new();
    for (i, (title, keys)) in sections.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            *title,
            Style::default().fg(th.accent).bold(),
        )));
        for (key, desc) in keys {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<14}", key),
                    Style::default().fg(th.text).bold(),
                ),
                Span::styled(*desc, Style::default().fg(th.text_dim)),
            ]));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}
