use crate::app::{App, DOWNLOAD_PROMPT, QUERY_PROMPT};
use crate::config::ColorScheme;
use crate::constants::{MENU_PREFIX_WIDTH, STATUS_BAR_HEIGHT, URL_BAR_HEIGHT};
use crate::menu::{self, MenuLine};
use crate::models::{InputMode, ItemType, LineEditor};
use crate::status::split_warning;
use crate::url_codec;
use crate::view;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
};
use unicode_width::UnicodeWidthStr;

fn screen_layout(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(URL_BAR_HEIGHT),    // URL bar
                Constraint::Min(0),                    // Content area
                Constraint::Length(STATUS_BAR_HEIGHT), // Status bar
            ]
            .as_ref(),
        )
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// `text` cut or padded with spaces to exactly `width` columns.
fn fit(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(width);
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.extend(std::iter::repeat_n(' ', width - used));
    out
}

pub fn ui(f: &mut Frame, app: &App) {
    let [url_area, content_area, status_area] = screen_layout(f.area());

    // 1. URL BAR
    if app.input_mode == InputMode::EditingUrl {
        render_url_bar(f, &app.colors, url_area, None, Some(&app.editor));
    } else {
        render_url_bar(f, &app.colors, url_area, Some(&app.current_url()), None);
    }

    // 2. CONTENT
    f.render_widget(Block::default().style(app.colors.text), content_area);
    let mut selected_url = None;
    if let Some(node) = app.current() {
        let is_menu = node.location.item_type.is_menu();
        if node.cache.is_some() && is_menu {
            selected_url = render_menu(f, app, content_area);
        } else if node.cache.is_some() && node.location.item_type.is_displayable() {
            render_text(f, app, content_area, node.view.scroll_offset);
        }
    }

    // 3. STATUS BAR
    match app.input_mode {
        InputMode::SaveAs => render_prompt(f, &app.colors, status_area, DOWNLOAD_PROMPT, &app.editor),
        InputMode::Query => render_prompt(f, &app.colors, status_area, QUERY_PROMPT, &app.editor),
        _ => {
            let message = if app.status_line.is_empty() {
                selected_url.unwrap_or_default()
            } else {
                app.status_line.clone()
            };
            render_status(f, &app.colors, status_area, &message);
        }
    }
}

/// Screen shown while a fetch is running.
pub fn draw_loading(f: &mut Frame, colors: &ColorScheme, url: &str, message: &str) {
    let [url_area, content_area, status_area] = screen_layout(f.area());
    render_url_bar(f, colors, url_area, Some(url), None);
    f.render_widget(Block::default().style(colors.text), content_area);
    render_status(f, colors, status_area, message);
}

fn render_url_bar(
    f: &mut Frame,
    colors: &ColorScheme,
    area: Rect,
    url: Option<&str>,
    editor: Option<&LineEditor>,
) {
    let inner = usize::from(area.width.saturating_sub(2));
    let shown = match (url, editor) {
        (_, Some(editor)) => {
            let offset = editor.display_offset(inner);
            let visible: String = editor.text.chars().skip(offset).collect();
            let cursor_x = area.x + 1 + (editor.cursor - offset) as u16;
            f.set_cursor_position(Position::new(cursor_x.min(area.right().saturating_sub(2)), area.y));
            visible
        }
        (Some(url), None) => url.to_string(),
        (None, None) => String::new(),
    };
    let line = Line::from(vec![
        Span::styled("[", colors.url_bar_deco),
        Span::styled(fit(&shown, inner), colors.url_bar),
        Span::styled("]", colors.url_bar_deco),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn render_status(f: &mut Frame, colors: &ColorScheme, area: Rect, message: &str) {
    let (text, is_warning) = split_warning(message);
    let style = if is_warning {
        colors.status_warn
    } else {
        colors.status_info
    };
    let line = Line::from(Span::styled(fit(text, usize::from(area.width)), style));
    f.render_widget(Paragraph::new(line), area);
}

fn render_prompt(f: &mut Frame, colors: &ColorScheme, area: Rect, prompt: &str, editor: &LineEditor) {
    let prompt_width = prompt.width();
    let field = usize::from(area.width).saturating_sub(prompt_width);
    let offset = editor.display_offset(field);
    let visible: String = editor.text.chars().skip(offset).collect();
    let line = Line::from(vec![
        Span::styled(prompt.to_string(), colors.status_info),
        Span::styled(fit(&visible, field), colors.status_info),
    ]);
    f.render_widget(Paragraph::new(line), area);
    let cursor_x = area.x + (prompt_width + editor.cursor - offset) as u16;
    f.set_cursor_position(Position::new(cursor_x.min(area.right().saturating_sub(1)), area.y));
}

fn menu_line<'a>(line: &MenuLine<'a>, selected: bool, colors: &ColorScheme, width: usize) -> Line<'a> {
    let prefix_style = if selected {
        colors.menu_current
    } else {
        colors.menu_type
    };
    let text_style = if selected {
        colors.menu_current
    } else if line.item_type == ItemType::INFO {
        colors.text
    } else if line.item_type == ItemType::ERROR {
        colors.menu_error
    } else if line.is_selectable() {
        colors.menu_selectable
    } else {
        colors.text
    };

    let prefix = if line.continuation {
        Some("   ")
    } else {
        line.item_type.label()
    };
    let mut spans = Vec::with_capacity(2);
    let mut text_width = width;
    if let Some(label) = prefix {
        spans.push(Span::styled(format!("{label} "), prefix_style));
        text_width = width.saturating_sub(MENU_PREFIX_WIDTH);
    }
    spans.push(Span::styled(fit(line.text, text_width), text_style));
    Line::from(spans)
}

/// Draw the current menu; returns the URL of the selected entry.
fn render_menu(f: &mut Frame, app: &App, area: Rect) -> Option<String> {
    let node = app.current()?;
    let text = menu::decode(node.cache.as_deref().unwrap_or_default());
    let page = menu::explode(&text, usize::from(app.cols), app.limits.max_menu_lines);
    let view = view::menu_view(&page, node.view);
    let width = usize::from(area.width);

    let lines: Vec<Line> = page
        .lines
        .iter()
        .enumerate()
        .skip(view.scroll_offset)
        .take(usize::from(area.height))
        .map(|(idx, line)| menu_line(line, view.selected_line == Some(idx), &app.colors, width))
        .collect();
    f.render_widget(Paragraph::new(lines).style(app.colors.text), area);

    view.selected_line
        .and_then(|idx| page.lines.get(idx))
        .and_then(MenuLine::location)
        .map(|loc| url_codec::build_bounded(&loc, app.limits.max_url_len))
}

fn render_text(f: &mut Frame, app: &App, area: Rect, first_line: usize) {
    let width = usize::from(area.width);
    let lines: Vec<Line> = app
        .text_lines()
        .into_iter()
        .skip(first_line)
        .take(usize::from(area.height))
        .map(|l| Line::from(Span::styled(fit(&l, width), Style::default())))
        .collect();
    f.render_widget(Paragraph::new(lines).style(app.colors.text), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::Location;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> App {
        let config = Config {
            bookmarks_file: Some(dir.path().join("bookmarks")),
            ..Config::default()
        };
        let mut app = App::from_config(&config).unwrap();
        app.resize(40, 6);
        app
    }

    fn row(terminal: &Terminal<TestBackend>, y: u16) -> String {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.width)
            .map(|x| buffer[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn menu_renders_labels_and_selected_url() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open(Location::gopher("example.org", 70, ItemType::DIRECTORY, ""));
        app.history.top_mut().unwrap().cache =
            Some(b"iWelcome\n0About\t/about.txt\texample.org\t70\n".to_vec());

        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal.draw(|f| ui(f, &app)).unwrap();

        assert!(row(&terminal, 0).starts_with("[gopher://example.org"));
        assert!(row(&terminal, 0).ends_with(']'));
        assert!(row(&terminal, 1).starts_with("Welcome"));
        assert!(row(&terminal, 2).starts_with("TXT About"));
        assert!(row(&terminal, 5).starts_with("gopher://example.org/0/about.txt"));
        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(4, 2)].style().bg, app.colors.menu_current.bg);
    }

    #[test]
    fn warning_uses_warning_colors() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.status_line = "!Connection error!".to_string();

        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal.draw(|f| ui(f, &app)).unwrap();

        assert!(row(&terminal, 5).starts_with("Connection error!"));
        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(0, 5)].style().bg, app.colors.status_warn.bg);
    }

    #[test]
    fn text_document_is_wrapped() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open(Location::gopher("example.org", 70, ItemType::TEXT, "/t"));
        app.history.top_mut().unwrap().cache =
            Some(b"one two three four five six seven eight nine ten\n.\n".to_vec());

        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal.draw(|f| ui(f, &app)).unwrap();

        assert!(row(&terminal, 1).starts_with("one two three"));
        assert!(row(&terminal, 2).trim_end().ends_with("ten"));
        assert_eq!(row(&terminal, 3).trim(), "");
    }

    #[test]
    fn save_prompt_shows_suggested_name() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.input_mode = InputMode::SaveAs;
        app.editor = LineEditor::new("pkg.tar.gz", 64);

        let mut terminal = Terminal::new(TestBackend::new(40, 6)).unwrap();
        terminal.draw(|f| ui(f, &app)).unwrap();

        assert!(row(&terminal, 5).starts_with("Download as: pkg.tar.gz"));
    }

    #[test]
    fn loading_screen() {
        let colors = ColorScheme::default();
        let mut terminal = Terminal::new(TestBackend::new(40, 4)).unwrap();
        terminal
            .draw(|f| draw_loading(f, &colors, "gopher://example.org", "Resolving 'example.org'..."))
            .unwrap();
        assert!(row(&terminal, 0).starts_with("[gopher://example.org"));
        assert!(row(&terminal, 3).starts_with("Resolving 'example.org'..."));
    }
}
