//! Activity animations shown while a request is in flight
//!
//! Both animations are driven by the event loop's spinner frame, so a given
//! frame always renders the same way.

use ratatui::style::Style;
use ratatui::text::Span;

use super::theme::Theme;

/// Characters on each side of the highlight that stay undimmed
const GLOW_RADIUS: usize = 1;

/// Index of the highlighted character at `frame`.
///
/// The highlight walks to the end of the text and back, one character per
/// frame, without pausing on either end.
fn highlight_position(len: usize, frame: usize) -> usize {
    if len < 2 {
        return 0;
    }
    let cycle = 2 * (len - 1);
    let step = frame % cycle;
    if step < len {
        step
    } else {
        cycle - step
    }
}

fn style_for_distance(distance: usize) -> Style {
    match distance {
        0 => Theme::title(),
        d if d <= GLOW_RADIUS => Theme::accent(),
        _ => Theme::muted(),
    }
}

/// Title with a highlight bouncing across it
pub fn shimmer_spans(text: &str, frame: usize) -> Vec<Span<'static>> {
    let chars: Vec<char> = text.chars().collect();
    let head = highlight_position(chars.len(), frame);

    chars
        .iter()
        .enumerate()
        .map(|(i, ch)| Span::styled(ch.to_string(), style_for_distance(i.abs_diff(head))))
        .collect()
}

/// Braille spinner
pub struct AnimatedDots {
    frame: usize,
}

impl AnimatedDots {
    const FRAMES: &'static [&'static str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

    pub fn new(frame: usize) -> Self {
        Self { frame }
    }

    pub fn current(&self) -> &'static str {
        Self::FRAMES[self.frame % Self::FRAMES.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn head_index(spans: &[Span<'_>]) -> Option<usize> {
        spans.iter().position(|s| s.style == Theme::title())
    }

    #[test]
    fn test_spinner_wraps() {
        assert_eq!(AnimatedDots::new(0).current(), AnimatedDots::new(10).current());
    }

    #[test]
    fn test_shimmer_keeps_every_char() {
        let spans = shimmer_spans("mcphost", 3);
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "mcphost");
        assert!(shimmer_spans("", 3).is_empty());
    }

    #[test]
    fn test_highlight_bounces() {
        let positions: Vec<usize> = (0..9).map(|frame| highlight_position(4, frame)).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 2, 1, 0, 1, 2]);
        assert_eq!(highlight_position(1, 5), 0);
        assert_eq!(highlight_position(0, 5), 0);
    }

    #[test]
    fn test_shimmer_styles_follow_frame() {
        let spans = shimmer_spans("chat", 2);
        assert_eq!(head_index(&spans), Some(2));
        assert_eq!(spans[1].style, Theme::accent());
        assert_eq!(spans[3].style, Theme::accent());
        assert_eq!(spans[0].style, Theme::muted());

        assert_eq!(head_index(&shimmer_spans("chat", 4)), Some(2));
        assert_eq!(shimmer_spans("chat", 1), shimmer_spans("chat", 7));
    }
}
