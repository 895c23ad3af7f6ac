//! Custom widgets for the TUI

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use regex::Regex;
use std::sync::OnceLock;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::shimmer::{shimmer_spans, AnimatedDots};
use super::theme::Theme;
use crate::session::Status;

struct InlinePatterns {
    bold: Regex,
    italic: Regex,
    code: Regex,
}

static INLINE_PATTERNS: OnceLock<InlinePatterns> = OnceLock::new();

fn inline_patterns() -> &'static InlinePatterns {
    INLINE_PATTERNS.get_or_init(|| InlinePatterns {
        bold: Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"),
        italic: Regex::new(r"\*([^*]+?)\*").expect("valid italic regex"),
        code: Regex::new(r"`([^`]+?)`").expect("valid code regex"),
    })
}

/// Style `**bold**`, `*italic*` and `` `code` `` inside one line
fn parse_markdown(text: &str, base_style: Style) -> Vec<Span<'static>> {
    let patterns = inline_patterns();
    let rules: [(&Regex, Style); 3] = [
        (&patterns.bold, base_style.add_modifier(Modifier::BOLD)),
        (&patterns.code, Theme::code()),
        (&patterns.italic, base_style.add_modifier(Modifier::ITALIC)),
    ];

    let mut spans = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let earliest = rules
            .iter()
            .filter_map(|(regex, style)| regex.captures(remaining).map(|caps| (caps, *style)))
            .min_by_key(|(caps, _)| caps.get(0).map_or(usize::MAX, |m| m.start()));

        let Some((caps, style)) = earliest else {
            spans.push(Span::styled(remaining.to_string(), base_style));
            break;
        };
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            spans.push(Span::styled(remaining.to_string(), base_style));
            break;
        };

        if whole.start() > 0 {
            spans.push(Span::styled(remaining[..whole.start()].to_string(), base_style));
        }
        spans.push(Span::styled(inner.as_str().to_string(), style));
        remaining = &remaining[whole.end()..];
    }

    if spans.is_empty() {
        spans.push(Span::styled(String::new(), base_style));
    }
    spans
}

/// Wrap a long string into multiple lines, respecting unicode width
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 || text.width() <= max_width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for c in text.chars() {
        let char_width = c.width().unwrap_or(1);
        if current_width + char_width > max_width && !current_line.is_empty() {
            lines.push(std::mem::take(&mut current_line));
            current_width = 0;
        }
        current_line.push(c);
        current_width += char_width;
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }
    lines
}

/// A message in the conversation pane
#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    /// A failed request; shown once, never sent back to the orchestrator
    Error,
    System,
}

impl Message {
    fn new(role: MessageRole, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content.into())
    }

    pub fn error(reason: impl AsRef<str>) -> Self {
        Self::new(MessageRole::Error, format!("Error: {}", reason.as_ref()))
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content.into())
    }
}

/// Header bar with title and working directory
pub struct HeaderBar<'a> {
    pub title: &'a str,
    pub project: &'a str,
    pub status: Status,
    pub spinner_frame: usize,
}

impl Widget for HeaderBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 1 {
            return;
        }

        let mut title_spans = vec![Span::styled("◆ ", Theme::accent())];
        if self.status == Status::Thinking {
            title_spans.extend(shimmer_spans(self.title, self.spinner_frame));
        } else {
            title_spans.push(Span::styled(self.title, Theme::title()));
        }
        buf.set_line(area.x + 1, area.y, &Line::from(title_spans), area.width.saturating_sub(2));

        let project_str = format!("📁 {} ", self.project);
        let project_len = project_str.width() as u16;
        let project_x = area.x + area.width.saturating_sub(project_len + 1);
        buf.set_span(
            project_x,
            area.y,
            &Span::styled(project_str, Theme::muted()),
            project_len + 1,
        );
    }
}

/// Status line reflecting the session status
pub struct StatusBar {
    pub status: Status,
    pub spinner_frame: usize,
}

impl Widget for StatusBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let line = match self.status {
            Status::Thinking => Line::from(vec![
                Span::styled(
                    format!("{} ", AnimatedDots::new(self.spinner_frame).current()),
                    Theme::accent(),
                ),
                Span::styled(self.status.label(), Theme::accent()),
            ]),
            Status::Connected => Line::from(vec![
                Span::styled("● ", Theme::success()),
                Span::styled(self.status.label(), Theme::dim()),
            ]),
        };
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));
    }
}

/// Single-line input box; greyed out while a request is in flight
pub struct InputBox<'a> {
    pub content: &'a str,
    pub enabled: bool,
}

impl Widget for InputBox<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.enabled {
            Theme::border_focused()
        } else {
            Theme::border()
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(Span::styled(" Message ", Theme::muted()));

        let inner = block.inner(area);
        block.render(area, buf);

        let (display_text, style) = if !self.enabled && self.content.is_empty() {
            ("Waiting for the orchestrator...", Theme::muted())
        } else if self.content.is_empty() {
            ("Type your message... (Enter to send, Ctrl+C to quit)", Theme::muted())
        } else if self.enabled {
            (self.content, Theme::text())
        } else {
            (self.content, Theme::dim())
        };

        Paragraph::new(display_text)
            .style(style)
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}

/// Help bar showing key bindings
pub struct HelpBar;

impl Widget for HelpBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bindings = [
            ("Enter", "Send"),
            ("↑↓", "History"),
            ("PgUp/PgDn", "Scroll"),
            ("Ctrl+U", "Clear"),
            ("Ctrl+C", "Quit"),
        ];

        let mut spans = vec![Span::raw(" ")];
        for (i, (key, desc)) in bindings.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", Theme::muted()));
            }
            spans.push(Span::styled(*key, Theme::key()));
            spans.push(Span::styled(format!(" {}", desc), Theme::key_desc()));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

/// Render a single message to lines for display
/// max_width: terminal width for text wrapping (0 = no wrapping)
pub fn render_message_lines(msg: &Message, max_width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let content_width = max_width.saturating_sub(4);

    if msg.role == MessageRole::System {
        let style = Theme::dim().add_modifier(Modifier::ITALIC);
        for wrapped in wrap_text(&msg.content, content_width) {
            lines.push(Line::from(vec![Span::raw("  "), Span::styled(wrapped, style)]));
        }
        lines.push(Line::from(""));
        return lines;
    }

    let (badge_text, badge_style) = match msg.role {
        MessageRole::User => (" You ", Theme::user_badge()),
        MessageRole::Assistant => (" Assistant ", Theme::assistant_badge()),
        MessageRole::Error => (" Error ", Theme::error_badge()),
        MessageRole::System => ("", Theme::dim()),
    };
    lines.push(Line::from(vec![
        Span::styled(badge_text, badge_style),
        Span::styled(format!(" {}", msg.timestamp), Theme::muted()),
    ]));

    let content_style = match msg.role {
        MessageRole::Error => Theme::error(),
        _ => Theme::text(),
    };
    let formatted = msg.role == MessageRole::Assistant;
    let mut in_code_block = false;

    for content_line in msg.content.lines() {
        if formatted && content_line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }

        for (i, wrapped) in wrap_text(content_line, content_width).into_iter().enumerate() {
            let indent = if i == 0 { "  " } else { "    " };
            let mut spans = vec![Span::raw(indent)];
            if in_code_block {
                spans.push(Span::styled(wrapped, Theme::code()));
            } else if formatted {
                spans.extend(parse_markdown(&wrapped, content_style));
            } else {
                spans.push(Span::styled(wrapped, content_style));
            }
            lines.push(Line::from(spans));
        }
    }

    lines.push(Line::from(""));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_markdown_bold_and_code() {
        let spans = parse_markdown("run **now** with `mcphost`", Style::default());
        let texts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, vec!["run ", "now", " with ", "mcphost"]);
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_markdown_plain_text() {
        let spans = parse_markdown("nothing special", Style::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].content, "nothing special");
    }

    #[test]
    fn test_wrap_text_by_width() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_text("你好世界", 4), vec!["你好", "世界"]);
    }

    #[test]
    fn test_code_fence_hidden() {
        let msg = Message::assistant("Run:\n```\nsystemctl status\n```");
        let lines = render_message_lines(&msg, 80);
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert!(texts.iter().any(|t| t == "  systemctl status"));
        assert!(!texts.iter().any(|t| t.contains("```")));
    }

    #[test]
    fn test_error_message_prefixed() {
        let msg = Message::error("mcphost exited with code 1");
        assert_eq!(msg.content, "Error: mcphost exited with code 1");
        let lines = render_message_lines(&msg, 80);
        assert_eq!(line_text(&lines[0]).split(' ').nth(1), Some("Error"));
    }
}
