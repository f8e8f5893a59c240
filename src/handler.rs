use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

const WHEEL_LINES: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any state
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        KeyCode::PageUp => {
            app.scroll_up(app.half_page());
            return;
        }
        KeyCode::PageDown => {
            app.scroll_down(app.half_page());
            return;
        }
        KeyCode::Up => {
            app.scroll_up(1);
            return;
        }
        KeyCode::Down => {
            app.scroll_down(1);
            return;
        }
        _ => {}
    }

    // Input box is read-only while a reply is outstanding
    if app.is_loading() {
        return;
    }

    handle_draft_editing(app, key);
}

fn handle_draft_editing(app: &mut App, key: KeyEvent) {
    let cursor = app.cursor;
    let char_count = app.session.draft().chars().count();

    match key.code {
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => {
            if cursor > 0 {
                app.session.edit_draft(|draft| {
                    let byte_pos = char_to_byte_index(draft, cursor - 1);
                    draft.remove(byte_pos);
                });
                app.cursor -= 1;
            }
        }
        KeyCode::Delete => {
            if cursor < char_count {
                app.session.edit_draft(|draft| {
                    let byte_pos = char_to_byte_index(draft, cursor);
                    draft.remove(byte_pos);
                });
            }
        }
        KeyCode::Left => {
            app.cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            app.cursor = (cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = char_count;
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.session.set_draft(String::new());
            app.cursor = 0;
        }
        KeyCode::Char(c) => {
            app.session.edit_draft(|draft| {
                let byte_pos = char_to_byte_index(draft, cursor);
                draft.insert(byte_pos, c);
            });
            app.cursor += 1;
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .is_some_and(|area| point_in_rect(mouse.column, mouse.row, area));
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(WHEEL_LINES),
        MouseEventKind::ScrollUp => app.scroll_up(WHEEL_LINES),
        _ => {}
    }
}
