use crate::{
    app::{App, DialogChoice, InputMode, InputPurpose, LogLevel, ToastLevel},
    config::WindowGeometry,
    library::Entry,
};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, size as terminal_size, EnterAlternateScreen,
        LeaveAlternateScreen, SetSize,
    },
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, TableState},
};
use std::{
    io,
    ops::Range,
    time::{Duration, Instant},
};

const LOG_PANEL_HEIGHT: u16 = 12;

#[derive(Clone)]
struct Theme {
    accent: Color,
    accent_soft: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
    log_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(120, 190, 255),
            accent_soft: Color::Rgb(70, 110, 160),
            border: Color::Rgb(65, 75, 90),
            text: Color::Rgb(220, 230, 240),
            muted: Color::Rgb(135, 145, 155),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            header_bg: Color::Rgb(22, 28, 36),
            log_bg: Color::Rgb(16, 20, 26),
        }
    }

    fn block(&self, title: &'static str) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: &'static str) -> Block<'static> {
        self.block(title).padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
    }

    // Trace lines cycle through these by nesting depth.
    fn depth_color(&self, depth: usize) -> Color {
        match depth % 4 {
            0 => self.accent,
            1 => self.success,
            2 => self.warning,
            _ => self.muted,
        }
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let geometry = WindowGeometry::load(&app.geometry_path());
    let _ = execute!(stdout, SetSize(geometry.width, geometry.height));
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    let closing = terminal_size()
        .ok()
        .map(|(width, height)| WindowGeometry { width, height });
    let shutdown = app.shutdown(closing);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.and(shutdown)
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key)?;
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    if app.dialog.is_some() {
        return handle_dialog_mode(app, key);
    }

    let mode = std::mem::replace(&mut app.input_mode, InputMode::Normal);
    match mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing {
            prompt,
            mut buffer,
            purpose,
        } => handle_input_mode(app, key, &mut buffer, purpose, prompt),
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H') => {
            app.dialog_choice_left();
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Tab => {
            app.dialog_choice_right();
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.dialog_set_choice(DialogChoice::Yes);
        }
        KeyCode::Char('n') | KeyCode::Char('N') => {
            app.dialog_set_choice(DialogChoice::No);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            app.dialog_confirm();
        }
        KeyCode::Esc => {
            app.dialog_set_choice(DialogChoice::No);
            app.dialog_confirm();
        }
        _ => {}
    }
    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Up if shift => app.move_selected_up(),
        KeyCode::Down if shift => app.move_selected_down(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),
        KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Enter => app.run_selected(),
        KeyCode::Char('R') => {
            app.run_all();
        }
        KeyCode::Char('c') => app.toggle_all(),
        KeyCode::Char('n') => app.add_new_script(),
        KeyCode::Char('e') => app.toggle_edit_mode(),
        KeyCode::Char('u') => app.move_selected_up(),
        KeyCode::Char('d') => app.move_selected_down(),
        KeyCode::Char('t') => app.move_selected_top(),
        KeyCode::Char('b') => app.move_selected_bottom(),
        KeyCode::Char('s') => app.request_sort(),
        KeyCode::Char('m') => app.move_checked_to_top(),
        KeyCode::Char('r') | KeyCode::F(2) => app.begin_rename(),
        KeyCode::Char('y') => app.copy_log_to_clipboard(),
        KeyCode::PageUp => app.scroll_log_up(3),
        KeyCode::PageDown => app.scroll_log_down(3),
        _ => {}
    }
    Ok(())
}

fn handle_input_mode(
    app: &mut App,
    key: KeyEvent,
    buffer: &mut String,
    purpose: InputPurpose,
    prompt: String,
) -> Result<()> {
    let mut keep_editing = true;
    match key.code {
        KeyCode::Esc => {
            app.cancel_input();
            keep_editing = false;
        }
        KeyCode::Enter => {
            let value = buffer.trim().to_string();
            app.input_mode = InputMode::Normal;
            keep_editing = false;
            if let Err(err) = app.handle_submit(purpose.clone(), value) {
                app.status = format!("Action failed: {err}");
                app.log_error(format!("Action failed: {err}"));
            }
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                return Ok(());
            }
            buffer.push(c);
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        _ => {}
    }

    if keep_editing {
        app.input_mode = InputMode::Editing {
            prompt,
            buffer: buffer.clone(),
            purpose,
        };
    }

    Ok(())
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.size();
    let theme = Theme::new();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(LOG_PANEL_HEIGHT),
        ])
        .split(area);

    let edit_mode = app.list.edit_mode();
    let mut title_line = vec![
        Span::styled(
            "ScriptDeck",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            app.list.dir().display().to_string(),
            Style::default().fg(theme.muted),
        ),
    ];
    if edit_mode {
        title_line.push(Span::styled(
            "  EDIT",
            Style::default().fg(theme.warning).add_modifier(Modifier::BOLD),
        ));
    }
    if app.debug_enabled() {
        title_line.push(Span::styled(
            "  DEBUG",
            Style::default().fg(theme.muted).add_modifier(Modifier::BOLD),
        ));
    }
    let mut counts_line = vec![
        Span::styled("Scripts: ", Style::default().fg(theme.muted)),
        Span::styled(app.list.len().to_string(), Style::default().fg(theme.text)),
        Span::raw("   "),
        Span::styled("Checked: ", Style::default().fg(theme.muted)),
        Span::styled(
            app.list.enabled_count().to_string(),
            Style::default().fg(theme.success).add_modifier(Modifier::BOLD),
        ),
    ];
    if edit_mode {
        counts_line.push(Span::raw("   "));
        counts_line.push(Span::styled("Next sort: ", Style::default().fg(theme.muted)));
        counts_line.push(Span::styled(
            app.list.next_sort_direction().label(),
            Style::default().fg(theme.text),
        ));
    }
    let header = Paragraph::new(vec![
        Line::from(title_line),
        Line::from(""),
        Line::from(counts_line),
    ])
    .style(Style::default().bg(theme.header_bg))
    .alignment(Alignment::Center);
    frame.render_widget(header, chunks[0]);

    let rows = build_rows(app, &theme);
    if rows.is_empty() {
        let empty = Paragraph::new("No scripts yet. Press n to create one.")
            .style(Style::default().fg(theme.muted))
            .block(theme.panel("Scripts"))
            .alignment(Alignment::Center);
        frame.render_widget(empty, chunks[1]);
    } else {
        let table = Table::new(
            rows,
            [
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(10),
            ],
        )
        .header(
            Row::new(vec![Cell::from("On"), Cell::from("No."), Cell::from("Script")])
                .style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
        )
        .column_spacing(1)
        .block(theme.panel("Scripts"))
        .highlight_style(
            Style::default()
                .bg(theme.accent_soft)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">");

        let mut state = TableState::default();
        state.select(app.list.selected());
        frame.render_stateful_widget(table, chunks[1], &mut state);
    }

    let status_block = theme.panel("Status");
    let status_inner = status_block.inner(chunks[2]);
    frame.render_widget(status_block, chunks[2]);
    draw_status(frame, app, &theme, status_inner);

    let log_block = theme.panel("Log").style(Style::default().bg(theme.log_bg));
    let log_inner = log_block.inner(chunks[3]);
    let log = Paragraph::new(log_lines(app, &theme, log_inner.height as usize))
        .style(Style::default().fg(theme.text).bg(theme.log_bg))
        .block(log_block);
    frame.render_widget(log, chunks[3]);

    if app.dialog.is_some() {
        draw_dialog(frame, app, &theme);
    }
    draw_toast(frame, app, &theme, chunks[1]);
}

fn build_rows(app: &App, theme: &Theme) -> Vec<Row<'static>> {
    let renaming = match &app.input_mode {
        InputMode::Editing {
            purpose: InputPurpose::RenameEntry { id },
            buffer,
            ..
        } => Some((*id, buffer.as_str())),
        InputMode::Normal => None,
    };

    app.list
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let editing = renaming
                .filter(|(id, _)| *id == entry.id)
                .map(|(_, buffer)| buffer);
            row_for_entry(index, entry, editing, theme)
        })
        .collect()
}

fn row_for_entry(index: usize, entry: &Entry, editing: Option<&str>, theme: &Theme) -> Row<'static> {
    let (enabled_text, enabled_style) = if entry.enabled {
        ("[x]", Style::default().fg(theme.success))
    } else {
        ("[ ]", Style::default().fg(theme.muted))
    };
    let name_cell = if let Some(buffer) = editing {
        Cell::from(format!("{buffer}_")).style(
            Style::default()
                .fg(theme.warning)
                .add_modifier(Modifier::UNDERLINED),
        )
    } else if entry.has_pending_rename() {
        Cell::from(Line::from(vec![
            Span::styled(entry.display_name.clone(), Style::default().fg(theme.warning)),
            Span::styled(
                format!("  ({})", entry.filename),
                Style::default().fg(theme.muted),
            ),
        ]))
    } else {
        Cell::from(entry.display_name.clone())
    };
    Row::new(vec![
        Cell::from(enabled_text.to_string()).style(enabled_style),
        Cell::from(format!("{:03}", index + 1)).style(Style::default().fg(theme.muted)),
        name_cell,
    ])
}

// Left side carries the status or the rename prompt, right side the key hint.
fn status_parts(app: &App) -> (String, &'static str) {
    match &app.input_mode {
        InputMode::Normal => (app.status.clone(), app.hint()),
        InputMode::Editing { prompt, buffer, .. } => {
            (format!("{prompt}: {buffer}"), "Enter confirm | Esc cancel")
        }
    }
}

fn draw_status(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let (left, hint) = status_parts(app);
    let hint_width = (hint.chars().count() as u16).min(area.width / 2);
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(hint_width)])
        .split(area);
    let (left_area, hint_area) = (parts[0], parts[1]);
    let left_style = if matches!(app.input_mode, InputMode::Editing { .. }) {
        Style::default().fg(theme.warning)
    } else {
        Style::default().fg(theme.text)
    };
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Status: ", Style::default().fg(theme.muted)),
            Span::styled(left, left_style),
        ])),
        left_area,
    );
    frame.render_widget(
        Paragraph::new(hint)
            .style(Style::default().fg(theme.muted))
            .alignment(Alignment::Right),
        hint_area,
    );
}

/// Slice of the log shown in a panel `height` rows tall, `scroll` rows up
/// from the newest entry.
fn visible_log_range(total: usize, height: usize, scroll: usize) -> Range<usize> {
    if height == 0 {
        return 0..0;
    }
    let end = total.saturating_sub(scroll.min(total.saturating_sub(height)));
    end.saturating_sub(height)..end
}

fn log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if app.logs.is_empty() {
        return vec![Line::from(Span::styled(
            "Nothing logged yet.",
            Style::default().fg(theme.muted),
        ))];
    }

    app.logs[visible_log_range(app.logs.len(), height, app.log_scroll)]
        .iter()
        .map(|entry| {
            let (marker, marker_color, text_color) = match entry.level {
                LogLevel::Info => ("INFO ", theme.accent, theme.text),
                LogLevel::Warn => ("WARN ", theme.warning, theme.text),
                LogLevel::Error => ("ERROR", theme.error, theme.error),
                LogLevel::Trace => ("TRACE", theme.muted, theme.depth_color(entry.depth)),
            };
            Line::from(vec![
                Span::styled(marker, Style::default().fg(marker_color)),
                Span::raw(format!(" {}", "    ".repeat(entry.depth))),
                Span::styled(entry.message.clone(), Style::default().fg(text_color)),
            ])
        })
        .collect()
}

// Centers a `width` x `height` box inside `area`, shrinking it to fit.
fn popup_area(area: Rect, width: u16, height: u16, top: Option<u16>) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = match top {
        Some(offset) => area.y + offset.min(area.height - height),
        None => area.y + (area.height - height) / 2,
    };
    Rect::new(x, y, width, height)
}

fn popup_block(border: Color, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.header_bg))
}

fn draw_dialog(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let button = |label: &str, chosen: bool, fill: Color| {
        let style = if chosen {
            Style::default()
                .fg(Color::Black)
                .bg(fill)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        Span::styled(format!("[ {label} ]"), style)
    };
    let yes = dialog.choice == DialogChoice::Yes;

    let mut lines = vec![
        Line::from(Span::styled(
            dialog.title.clone(),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(dialog.message.lines().map(|line| Line::from(line.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        button(&dialog.yes_label, yes, theme.accent),
        Span::raw("  "),
        button(&dialog.no_label, !yes, theme.warning),
    ]));

    let widest = dialog
        .message
        .lines()
        .chain(std::iter::once(dialog.title.as_str()))
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0) as u16;
    let area = popup_area(
        frame.size(),
        (widest + 6).max(36),
        lines.len() as u16 + 2,
        None,
    );

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .block(popup_block(theme.accent_soft, theme))
            .style(Style::default().fg(theme.text))
            .alignment(Alignment::Center),
        area,
    );
}

fn mode_toast(app: &App) -> Option<(String, ToastLevel)> {
    if app.dialog.is_some() {
        return None;
    }

    match &app.input_mode {
        InputMode::Editing {
            buffer,
            purpose: InputPurpose::RenameEntry { id },
            ..
        } => {
            let original = app
                .list
                .index_of(*id)
                .and_then(|index| app.list.get(index))
                .map(|entry| entry.filename.clone())
                .unwrap_or_default();
            let name = if buffer.trim().is_empty() {
                "<new name>"
            } else {
                buffer.as_str()
            };
            Some((
                format!("Renaming \"{original}\" -> \"{name}\" | Enter confirm | Esc cancel"),
                ToastLevel::Info,
            ))
        }
        InputMode::Normal => None,
    }
}

fn render_toast(frame: &mut Frame<'_>, theme: &Theme, body_area: Rect, message: &str, level: ToastLevel) {
    let room = body_area.width.saturating_sub(6) as usize;
    let text = if message.chars().count() > room {
        let mut cut: String = message.chars().take(room.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        message.to_string()
    };
    let border = match level {
        ToastLevel::Info => theme.accent,
        ToastLevel::Warn => theme.warning,
        ToastLevel::Error => theme.error,
    };
    let area = popup_area(body_area, text.chars().count() as u16 + 4, 3, Some(1));

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(text)
            .block(popup_block(border, theme))
            .style(Style::default().fg(theme.text))
            .alignment(Alignment::Center),
        area,
    );
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    if let Some((message, level)) = mode_toast(app) {
        render_toast(frame, theme, body_area, &message, level);
        return;
    }

    let Some(toast) = app.toast.as_ref() else {
        return;
    };
    if toast.expires_at <= Instant::now() {
        return;
    }

    render_toast(frame, theme, body_area, &toast.message, toast.level);
}
