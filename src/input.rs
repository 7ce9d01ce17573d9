use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, Screen};

// ── Event handling ─────────────────────────────────────────────────

pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl+C always force-quits regardless of screen
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    if let Screen::NotFound(_) = app.screen {
        handle_not_found_key(app, key);
        return;
    }

    if app.show_help && key.code != KeyCode::Char('?') {
        app.show_help = false;
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = !app.show_help,

        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::PageDown => app.move_selection(10),
        KeyCode::PageUp => app.move_selection(-10),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Enter => app.play_highlighted(),

        KeyCode::Char(' ') => app.toggle_play_pause(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.next(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.previous(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.replay(),
        KeyCode::Left => app.seek_by(-10.0),
        KeyCode::Right => app.seek_by(10.0),
        KeyCode::Char('+') | KeyCode::Char('=') => app.volume_up(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.volume_down(),
        KeyCode::Char('m') | KeyCode::Char('M') => app.toggle_mute(),
        KeyCode::Char('v') | KeyCode::Char('V') => app.cycle_repeat(),

        KeyCode::Char('d') | KeyCode::Char('D') => app.download(),
        KeyCode::Char('o') | KeyCode::Char('O') => app.add_to_playlist(),
        KeyCode::Char('s') | KeyCode::Char('S') => app.share(),

        KeyCode::Char('z') | KeyCode::Char('Z') | KeyCode::F(2) => app.toggle_minimized(),
        KeyCode::Char('x') | KeyCode::Char('X') => app.close_bar(),
        KeyCode::Char('t') | KeyCode::Char('T') => app.cycle_theme(),
        _ => {}
    }
}

fn handle_not_found_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Esc | KeyCode::Backspace => app.back_to_library(),
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        _ => {}
    }
}

pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.show_help || app.screen != Screen::Library {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.move_selection(3),
        MouseEventKind::ScrollUp => app.move_selection(-3),
        MouseEventKind::Down(MouseButton::Left) => {
            let Some(bar_area) = app.progress_bar_area else {
                return;
            };
            if mouse.row == bar_area.y
                && mouse.column >= bar_area.x
                && mouse.column < bar_area.x + bar_area.width
                && bar_area.width > 0
            {
                let ratio = (mouse.column - bar_area.x) as f64 / bar_area.width as f64;
                app.seek_ratio(ratio);
            }
        }
        _ => {}
    }
}
