//! Main TUI application

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyEventKind, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Margin, Rect},
    text::Line,
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame, Terminal,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::input::{InputAction, InputState};
use super::theme::Theme;
use super::widgets::{render_message_lines, HeaderBar, HelpBar, InputBox, Message, StatusBar};
use crate::bridge::{Bridge, ProcessBridge};
use crate::session::{Outcome, SessionController};
use crate::{ChatError, Result};

/// Lines moved per scroll step
const SCROLL_STEP: usize = 3;

/// Everything the event loop mutates apart from the terminal
pub(crate) struct ChatView {
    pub(crate) input: InputState,
    pub(crate) messages: Vec<Message>,
    pub(crate) scroll_offset: usize,
    pub(crate) session: SessionController,
}

impl ChatView {
    pub(crate) fn new(greeting: Message) -> Self {
        Self {
            input: InputState::new(),
            messages: vec![greeting],
            scroll_offset: 0,
            session: SessionController::new(),
        }
    }

    /// Start a request for `text`, returning the prompt to send.
    ///
    /// Blank input and input typed while a request is in flight are ignored.
    pub(crate) fn submit(&mut self, text: &str) -> Option<String> {
        match self.session.begin(text) {
            Ok(prompt) => {
                self.messages.push(Message::user(text.trim()));
                self.input.commit();
                self.scroll_offset = 0;
                Some(prompt)
            }
            Err(ChatError::EmptyInput) | Err(ChatError::Busy) => None,
            Err(e) => {
                self.messages.push(Message::error(e.to_string()));
                None
            }
        }
    }

    pub(crate) fn settle(&mut self, result: Result<String>) {
        let message = match self.session.settle(result) {
            Outcome::Reply(text) => Message::assistant(text),
            Outcome::Failure(reason) => Message::error(reason),
        };
        self.messages.push(message);
        self.scroll_offset = 0;
    }
}

/// Application state
pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    view: ChatView,
    bridge: ProcessBridge,
    /// The in-flight orchestrator run, if any
    pending: Option<JoinHandle<Result<String>>>,
    project_name: String,
    spinner_frame: usize,
    should_quit: bool,
}

impl App {
    pub fn new(project_name: String, bridge: ProcessBridge) -> io::Result<Self> {
        enable_raw_mode()?;
        // No App exists yet, so Drop will not restore the terminal
        let terminal = restore_on_err(Self::enter_terminal(), || {
            let _ = execute!(
                io::stdout(),
                crossterm::event::DisableMouseCapture,
                LeaveAlternateScreen
            );
            let _ = disable_raw_mode();
        })?;

        let greeting = Message::system(format!(
            "Connected to {} in {}",
            bridge.program(),
            bridge.working_dir().display()
        ));

        Ok(Self {
            terminal,
            view: ChatView::new(greeting),
            bridge,
            pending: None,
            project_name,
            spinner_frame: 0,
            should_quit: false,
        })
    }

    fn enter_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, crossterm::event::EnableMouseCapture)?;
        Terminal::new(CrosstermBackend::new(stdout))
    }

    /// Submit `text` as if it had been typed and sent
    pub fn submit(&mut self, text: &str) {
        if let Some(prompt) = self.view.submit(text) {
            let bridge = self.bridge.clone();
            self.pending = Some(tokio::spawn(async move { bridge.invoke(&prompt).await }));
        }
    }

    /// Run the main event loop
    pub async fn run(&mut self) -> io::Result<()> {
        let poll_timeout = Duration::from_millis(16);
        let spinner_interval = Duration::from_millis(80);
        let mut last_spinner_update = Instant::now();

        while !self.should_quit {
            self.check_pending().await;

            if last_spinner_update.elapsed() >= spinner_interval {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                last_spinner_update = Instant::now();
            }

            self.draw()?;

            if event::poll(poll_timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_input(key),
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::ScrollUp => self.scroll_up(),
                        MouseEventKind::ScrollDown => self.scroll_down(),
                        _ => {}
                    },
                    _ => {}
                }
            }
        }

        info!("Leaving chat");
        Ok(())
    }

    /// Settle the request once its task has finished
    async fn check_pending(&mut self) {
        if !self.pending.as_ref().is_some_and(|handle| handle.is_finished()) {
            return;
        }
        if let Some(handle) = self.pending.take() {
            let result = handle
                .await
                .unwrap_or_else(|e| Err(ChatError::Task(e.to_string())));
            self.view.settle(result);
        }
    }

    fn handle_input(&mut self, key: event::KeyEvent) {
        match self.view.input.handle_key(key) {
            InputAction::Submit(text) => {
                if self.view.session.can_submit() {
                    self.submit(&text);
                } else {
                    debug!("Ignoring Enter while a request is in flight");
                }
            }
            InputAction::Quit => self.should_quit = true,
            InputAction::ScrollUp => self.scroll_up(),
            InputAction::ScrollDown => self.scroll_down(),
            InputAction::None => {}
        }
    }

    fn scroll_up(&mut self) {
        self.view.scroll_offset = self.view.scroll_offset.saturating_add(SCROLL_STEP);
    }

    fn scroll_down(&mut self) {
        self.view.scroll_offset = self.view.scroll_offset.saturating_sub(SCROLL_STEP);
    }

    fn draw(&mut self) -> io::Result<()> {
        let view = &self.view;
        let project_name = &self.project_name;
        let spinner_frame = self.spinner_frame;
        let status = view.session.status();
        let enabled = view.session.can_submit();

        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1), // Header
                    Constraint::Length(1), // Status
                    Constraint::Min(6),    // Conversation
                    Constraint::Length(3), // Input
                    Constraint::Length(1), // Help
                ])
                .split(f.area());

            f.render_widget(
                HeaderBar {
                    title: "mcphost chat",
                    project: project_name,
                    status,
                    spinner_frame,
                },
                chunks[0],
            );
            f.render_widget(StatusBar { status, spinner_frame }, chunks[1]);

            Self::render_messages(f, chunks[2], &view.messages, view.scroll_offset);

            f.render_widget(
                InputBox {
                    content: &view.input.buffer,
                    enabled,
                },
                chunks[3],
            );
            if enabled {
                let cursor_x = chunks[3].x + 1 + view.input.cursor_display_width() as u16;
                f.set_cursor_position((
                    cursor_x.min(chunks[3].x + chunks[3].width.saturating_sub(2)),
                    chunks[3].y + 1,
                ));
            }

            f.render_widget(HelpBar, chunks[4]);
        })?;

        Ok(())
    }

    fn render_messages(f: &mut Frame, area: Rect, messages: &[Message], scroll_offset: usize) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border())
            .title_top(Line::styled(" Conversation ", Theme::muted()));

        let inner = block.inner(area);
        f.render_widget(block, area);

        let all_lines: Vec<Line> = messages
            .iter()
            .flat_map(|msg| render_message_lines(msg, inner.width as usize))
            .collect();

        // Offset counts lines up from the bottom
        let total_lines = all_lines.len();
        let visible_height = inner.height as usize;
        let max_scroll = total_lines.saturating_sub(visible_height);
        let actual_scroll = scroll_offset.min(max_scroll);
        let start = max_scroll - actual_scroll;

        let visible: Vec<Line> = all_lines
            .into_iter()
            .skip(start)
            .take(visible_height)
            .collect();
        f.render_widget(Paragraph::new(visible).wrap(Wrap { trim: false }), inner);

        if total_lines > visible_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");
            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(start);
            f.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }
}

/// Run `restore` when terminal setup failed, then hand the result back
fn restore_on_err<T>(result: io::Result<T>, restore: impl FnOnce()) -> io::Result<T> {
    if result.is_err() {
        restore();
    }
    result
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            crossterm::event::DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = self.terminal.show_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionState, Status};
    use crate::tui::widgets::MessageRole;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn view_with_input(text: &str) -> ChatView {
        let mut view = ChatView::new(Message::system("ready"));
        for c in text.chars() {
            view.input.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        view
    }

    #[test]
    fn test_submit_clears_input_and_shows_user_message() {
        let mut view = view_with_input("list roles");
        let text = view.input.buffer.clone();

        let prompt = view.submit(&text);

        assert_eq!(prompt.as_deref(), Some("User: list roles"));
        assert!(view.input.buffer.is_empty());
        assert_eq!(view.messages.last().map(|m| m.role), Some(MessageRole::User));
        assert_eq!(view.session.status(), Status::Thinking);
    }

    #[test]
    fn test_submit_while_thinking_keeps_draft() {
        let mut view = view_with_input("first");
        view.submit("first");
        view.input.handle_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));

        assert_eq!(view.submit("x"), None);
        assert_eq!(view.input.buffer, "x");
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.session.state(), SessionState::Awaiting);
    }

    #[test]
    fn test_blank_submit_ignored() {
        let mut view = view_with_input("   ");
        assert_eq!(view.submit("   "), None);
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.session.state(), SessionState::Idle);
    }

    #[test]
    fn test_failure_shown_once_as_error() {
        let mut view = view_with_input("hi");
        view.submit("hi");
        view.settle(Err(ChatError::Task("task was cancelled".to_string())));

        let last = view.messages.last().unwrap();
        assert_eq!(last.role, MessageRole::Error);
        assert_eq!(last.content, "Error: request task failed: task was cancelled");
        assert_eq!(view.session.transcript().len(), 1);
        assert_eq!(view.session.status(), Status::Connected);
    }

    #[test]
    fn test_failed_setup_restores_terminal() {
        let mut restored = false;
        let result: io::Result<()> = restore_on_err(
            Err(io::Error::new(io::ErrorKind::Unsupported, "not a tty")),
            || restored = true,
        );
        assert!(restored);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::Unsupported);

        let mut restored = false;
        assert_eq!(restore_on_err(Ok(7), || restored = true).unwrap(), 7);
        assert!(!restored);
    }

    #[test]
    fn test_reply_shown_and_recorded() {
        let mut view = view_with_input("hi");
        view.submit("hi");
        view.settle(Ok("Hello there".to_string()));

        let last = view.messages.last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert_eq!(last.content, "Hello there");
        assert_eq!(view.session.transcript().len(), 2);
        assert!(view.session.can_submit());
    }
}
