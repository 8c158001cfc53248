use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, Overlay};
use crate::tui::AppEvent;

const PAGE: u16 = 10;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Line editing shared by the message field and the API key prompt.
/// Returns false for keys that are not editing keys.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(text.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = text.chars().count(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Chat(event) => app.handle_chat_event(event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.overlay {
        Overlay::ApiKey => handle_api_key_input(app, key),
        Overlay::ColorPicker => handle_color_picker(app, key),
        Overlay::None => handle_chat_input(app, key),
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_api_key_input(),
        KeyCode::Enter => app.save_api_key(),
        _ => {
            edit_line(&mut app.api_key_input, &mut app.api_key_input_cursor, key);
        }
    }
}

fn handle_color_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_color_picker(),
        KeyCode::Enter | KeyCode::Char(' ') => app.select_highlighted_color(),
        KeyCode::Left | KeyCode::Char('h') => app.picker.move_left(),
        KeyCode::Right | KeyCode::Char('l') => app.picker.move_right(),
        KeyCode::Up | KeyCode::Char('k') => app.picker.move_up(),
        KeyCode::Down | KeyCode::Char('j') => app.picker.move_down(),
        _ => {}
    }
}

fn handle_chat_input(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Enter => app.press_primary(),
        KeyCode::Esc => {
            app.chat.cancel();
        }
        KeyCode::Char('o') if ctrl => app.open_color_picker(),
        KeyCode::Char('k') if ctrl => app.open_api_key_input(),
        KeyCode::PageUp => app.scroll_up(PAGE),
        KeyCode::PageDown => app.scroll_down(PAGE),
        _ => {
            edit_line(&mut app.input, &mut app.input_cursor, key);
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;
    let hit = |area: Option<Rect>| area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if app.overlay == Overlay::None && hit(app.chat_area) => {
            app.scroll_down(3);
        }
        MouseEventKind::ScrollUp if app.overlay == Overlay::None && hit(app.chat_area) => {
            app.scroll_up(3);
        }
        MouseEventKind::Down(MouseButton::Left) => match app.overlay {
            Overlay::ColorPicker => {
                if let Some(idx) = app.swatch_areas.iter().position(|r| point_in_rect(x, y, *r)) {
                    app.picker.highlight(idx);
                    app.select_highlighted_color();
                } else if !hit(app.sheet_area) {
                    // Clicking the backdrop dismisses the sheet
                    app.close_color_picker();
                }
            }
            Overlay::None => {
                if hit(app.plus_area) {
                    app.open_color_picker();
                } else if hit(app.send_area) {
                    app.press_primary();
                }
            }
            Overlay::ApiKey => {}
        },
        _ => {}
    }
}
