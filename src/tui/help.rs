use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Anywhere:"),
        key_line("Ctrl-C", 6, "Quit"),
        key_line("Esc", 9, "Cancel the running analysis"),
        key_line("Tab", 9, "Switch between link and report"),
        Line::from(""),
        Line::from("Link field:"),
        key_line("Enter", 7, "Analyze repository"),
        key_line("Ctrl-U", 6, "Clear the field"),
        Line::from(""),
        Line::from("Report:"),
        key_line("↑/↓", 9, "Scroll (j/k, PgUp/PgDn, g/G)"),
        key_line("p", 11, "Export PDF"),
        key_line("w", 11, "Export Word (.docx)"),
        key_line("m", 11, "Export Markdown"),
        key_line("y", 11, "Copy exported path to clipboard"),
        key_line("i", 11, "Edit repository link"),
        key_line("?", 11, "Show this help"),
        key_line("q", 11, "Quit"),
        Line::from(""),
        Line::from("Press any key to close."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
