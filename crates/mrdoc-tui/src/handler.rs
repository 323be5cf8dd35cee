use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use mrdoc_core::{Dispatch, Provider, UPLOAD_PROMPT};

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Cursor editing shared by every single-line input
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) {
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
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_query_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if app.show_api_key_input {
        handle_api_key_input(app, key);
    } else if app.show_provider_picker {
        handle_provider_picker(app, key);
    } else if app.show_model_picker {
        handle_model_picker(app, key);
    } else {
        match app.input_mode {
            InputMode::Normal => handle_normal_mode(app, key).await,
            InputMode::Editing => handle_editing_mode(app, key),
        }
    }
    Ok(())
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_api_key_input = false;
            app.api_key_input.clear();
            app.api_key_input_cursor = 0;
        }
        KeyCode::Enter => app.submit_api_key(),
        _ => edit_line(&mut app.api_key_input, &mut app.api_key_input_cursor, key),
    }
}

fn handle_provider_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_provider_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.provider_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.provider_picker_nav_up(),
        KeyCode::Enter => {
            let chosen = app
                .provider_picker_state
                .selected()
                .and_then(|i| Provider::all().get(i).copied());
            match chosen {
                Some(provider) => app.choose_provider(provider),
                None => app.show_provider_picker = false,
            }
        }
        _ => {}
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

async fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.query_cursor = app.query_input.chars().count();
        }

        KeyCode::Char('u') => {
            if app.awaiting_image() {
                app.focus = FocusPane::Upload;
                app.input_mode = InputMode::Editing;
                app.upload_cursor = app.upload_input.chars().count();
            }
        }

        // Tab cycles: Chat -> Input -> Upload (while open) -> Chat
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Chat => FocusPane::Input,
                FocusPane::Input if app.awaiting_image() => FocusPane::Upload,
                FocusPane::Input | FocusPane::Upload => FocusPane::Chat,
            };
        }

        KeyCode::Char('j') | KeyCode::Down => {
            app.query_scroll = app.query_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.query_scroll = app.query_scroll.saturating_sub(1);
        }
        KeyCode::Char('g') => app.query_scroll = 0,
        KeyCode::Char('G') => app.scroll_query_to_bottom(),

        KeyCode::Char('M') => app.open_model_picker().await,
        KeyCode::Char('P') => app.open_provider_picker(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Tab => {
            if app.focus == FocusPane::Input && app.awaiting_image() {
                app.focus = FocusPane::Upload;
                app.upload_cursor = app.upload_input.chars().count();
            } else {
                app.focus = FocusPane::Input;
                app.query_cursor = app.query_input.chars().count();
            }
        }
        KeyCode::Enter => match app.focus {
            FocusPane::Upload => submit_upload(app),
            _ => submit_question(app),
        },
        _ => match app.focus {
            FocusPane::Upload => edit_line(&mut app.upload_input, &mut app.upload_cursor, key),
            _ => edit_line(&mut app.query_input, &mut app.query_cursor, key),
        },
    }
}

/// Send the typed line through the consultation.
/// Refused while a reply is still outstanding.
fn submit_question(app: &mut App) {
    if app.query_input.trim().is_empty() || app.query_task.is_some() {
        return;
    }

    let question = std::mem::take(&mut app.query_input);
    app.query_cursor = 0;
    app.notice = None;

    match app.consultation.begin_turn(&question) {
        Dispatch::AwaitImage => {
            app.set_notice(UPLOAD_PROMPT);
            app.focus = FocusPane::Upload;
            app.upload_cursor = app.upload_input.chars().count();
        }
        Dispatch::Respond(pending) => {
            app.query_loading = true;
            app.input_mode = InputMode::Normal;
            app.query_task = Some(tokio::spawn(pending.resolve()));
        }
    }

    app.scroll_query_to_bottom();
}

/// Queue the typed path; the main loop examines it after the next draw
fn submit_upload(app: &mut App) {
    let raw = app.upload_input.trim();
    if raw.is_empty() || !app.awaiting_image() {
        return;
    }

    app.pending_upload = Some(expand_path(raw));
    app.upload_input.clear();
    app.upload_cursor = 0;
    app.input_mode = InputMode::Normal;
    app.set_notice("Analyzing image...");
}

/// Strip the quotes terminals add to dropped files and expand a leading `~`
fn expand_path(raw: &str) -> PathBuf {
    let unquoted = raw.trim_matches(|c| c == '\'' || c == '"');
    match (unquoted.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(unquoted),
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.query_scroll = app.query_scroll.saturating_add(3),
        MouseEventKind::ScrollUp => app.query_scroll = app.query_scroll.saturating_sub(3),
        _ => {}
    }
}
