use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use mrdoc_core::{ChatTurn, Provider, TurnRole};

use crate::app::{App, FocusPane, InputMode};

pub const TITLE: &str = "Mr Doctor";
pub const WELCOME: &str =
    "Welcome to the virtual disease diagnosis club. Tell me about your health issues.";
pub const INPUT_PLACEHOLDER: &str = "Input text here (e.g., 'I need image identification')";
pub const UPLOAD_TITLE: &str = " Upload an image for diagnosis (jpg, jpeg, png) ";

const USER_COLOR: Color = Color::Rgb(255, 165, 0);
const ASSISTANT_COLOR: Color = Color::Red;

/// Render **bold** spans; everything else is literal
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if end == 0 {
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after[2..];
            continue;
        }
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }
    Line::from(spans)
}

/// Transcript in turn order, each turn followed by a blank line
pub fn transcript_lines(turns: &[ChatTurn], loading: bool, frame: u8) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for turn in turns {
        match turn.role {
            TurnRole::Human => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(USER_COLOR).add_modifier(Modifier::BOLD),
                )));
                lines.extend(turn.content.lines().map(|l| Line::from(l.to_string())));
            }
            TurnRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "MrDoc:",
                    Style::default().fg(ASSISTANT_COLOR).add_modifier(Modifier::BOLD),
                )));
                lines.extend(turn.content.lines().map(parse_markdown_line));
            }
        }
        lines.push(Line::default());
    }

    if loading {
        lines.push(Line::from(Span::styled(
            "MrDoc:",
            Style::default().fg(ASSISTANT_COLOR).add_modifier(Modifier::BOLD),
        )));
        // Cycles through ".", "..", "..."
        let dots = ".".repeat(frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, welcome_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    frame.render_widget(
        Paragraph::new(Span::styled(WELCOME, Style::default().fg(Color::Gray))),
        welcome_area,
    );

    if app.show_upload_panel() {
        let [chat_area, upload_area] =
            Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
                .areas(body_area);
        render_chat(app, frame, chat_area);
        render_upload_panel(app, frame, upload_area);
    } else {
        render_chat(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);

    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", TITLE), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{}: {} ", app.current_provider.display_name(), app.selected_model),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(
        Paragraph::new(title).style(Style::default().bg(Color::DarkGray)),
        area,
    );
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, notice_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);
    app.query_chat_height = chat_area.height.saturating_sub(2);
    app.query_chat_width = chat_area.width.saturating_sub(2);

    let border_color = if app.focus == FocusPane::Chat {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversation ");

    let chat_text = if app.transcript_is_empty() && !app.query_loading {
        Text::from(Span::styled(
            "Describe your symptoms to get started...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(transcript_lines(
            app.consultation.session().turns(),
            app.query_loading,
            app.animation_frame,
        ))
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.query_scroll, 0));
    frame.render_widget(chat, chat_area);

    if let Some(notice) = &app.notice {
        let style = if notice.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Green)
        };
        frame.render_widget(Paragraph::new(Span::styled(notice.text.clone(), style)), notice_area);
    }

    let editing = app.focus == FocusPane::Input && app.input_mode == InputMode::Editing;
    render_line_input(
        frame,
        input_area,
        " Message ",
        &app.query_input,
        app.query_cursor,
        INPUT_PLACEHOLDER,
        app.focus == FocusPane::Input,
        editing,
    );
}

fn render_upload_panel(app: &App, frame: &mut Frame, area: Rect) {
    let (path_area, result_area) = if app.awaiting_image() {
        let [path_area, result_area] =
            Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(area);
        (Some(path_area), result_area)
    } else {
        (None, area)
    };

    if let Some(path_area) = path_area {
        let editing = app.focus == FocusPane::Upload && app.input_mode == InputMode::Editing;
        render_line_input(
            frame,
            path_area,
            UPLOAD_TITLE,
            &app.upload_input,
            app.upload_cursor,
            "Path to an image file",
            app.focus == FocusPane::Upload,
            editing,
        );
    }

    let mut lines: Vec<Line> = Vec::new();
    if app.pending_upload.is_some() {
        lines.push(Line::from(Span::styled(
            "Analyzing image...",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }
    if let Some(upload) = &app.last_upload {
        lines.push(Line::from(Span::styled(
            "Uploaded Image.",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!(
            "{} ({}x{})",
            upload.name, upload.width, upload.height
        )));
        lines.push(Line::default());
    }
    if let Some(diagnosis) = &app.diagnosis {
        lines.extend(diagnosis.lines().into_iter().map(Line::from));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Type the path of a photo and press Enter.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Diagnosis ");
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        result_area,
    );
}

#[allow(clippy::too_many_arguments)]
fn render_line_input(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    text: &str,
    cursor: usize,
    placeholder: &str,
    focused: bool,
    editing: bool,
) {
    let border_color = if editing {
        Color::Yellow
    } else if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    };

    let content = if text.is_empty() && !editing {
        Span::styled(placeholder.to_string(), Style::default().fg(Color::DarkGray))
    } else {
        let visible: String = text.chars().skip(scroll_offset).take(inner_width).collect();
        Span::styled(visible, Style::default().fg(USER_COLOR))
    };
    frame.render_widget(Paragraph::new(content).block(block), area);

    if editing {
        let cursor_x = (cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDITING ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let hints = match app.input_mode {
        InputMode::Editing => " Enter send  Esc stop editing  Tab switch input",
        InputMode::Normal if app.awaiting_image() => {
            " i message  u upload  Tab focus  j/k scroll  P provider  M model  q quit"
        }
        InputMode::Normal => " i message  Tab focus  j/k scroll  P provider  M model  q quit",
    };

    let footer = Line::from(vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn picker_highlight() -> Style {
    Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 40, app.available_models.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == &app.selected_model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(picker_highlight())
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let providers = Provider::all();
    let popup_area = centered(area, 45, providers.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Provider ");

    let items: Vec<ListItem> = providers
        .iter()
        .map(|provider| {
            let key_source = app.key_source(*provider);
            let is_current = *provider == app.current_provider;
            let status = match key_source {
                Some("env") => "(env var)",
                Some("config") => "(configured)",
                Some("local") => "(local)",
                _ => "(needs key)",
            };
            let prefix = if is_current { "* " } else { "  " };
            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if key_source.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(format!("{}{} {}", prefix, provider.display_name(), status)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(picker_highlight())
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, popup_area, &mut app.provider_picker_state);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 60, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Enter API Key for {} ", Provider::Gemini.display_name()));
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Paste your API key below. Press Enter to save, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 2));

    let input_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);
    frame.render_widget(
        Paragraph::new(mask_key(&app.api_key_input)).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    let cursor_x = app.api_key_input_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

/// Show only the last four characters of a secret
fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let last_four: String = key.chars().skip(count - 4).collect();
    format!("{}...{}", "*".repeat((count - 4).min(20)), last_four)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_transcript_labels_and_spacing() {
        let turns = vec![
            ChatTurn::human("I have a headache"),
            ChatTurn::assistant("How long has it lasted?"),
        ];
        let lines = transcript_lines(&turns, false, 0);
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(
            text,
            vec!["You:", "I have a headache", "", "MrDoc:", "How long has it lasted?", ""]
        );
        assert_eq!(lines[0].spans[0].style.fg, Some(USER_COLOR));
        assert_eq!(lines[3].spans[0].style.fg, Some(ASSISTANT_COLOR));
    }

    #[test]
    fn test_thinking_indicator_animates() {
        let lines = transcript_lines(&[], true, 2);
        assert_eq!(plain(&lines[0]), "MrDoc:");
        assert_eq!(plain(&lines[1]), "Thinking...");
    }

    #[test]
    fn test_bold_spans() {
        let line = parse_markdown_line("Drink **plenty** of water");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "plenty");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));

        let unclosed = parse_markdown_line("a **b");
        assert_eq!(plain(&unclosed), "a **b");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key("abcdefgh"), "****...efgh");
    }
}
