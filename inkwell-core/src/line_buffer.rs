//! Typed text, wrapped into fixed-width physical lines.
//!
//! Wrapping is per character: a character that would push the current line
//! past `max_line_width` starts a new line and is carried onto it. Each
//! committed line remembers whether it ended in a soft (wrap) break or a hard
//! (Enter) break, so the unwrapped logical character stream can always be
//! reconstructed from the tail.

use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    text: String,
    /// `true` when this line was ended by wrapping rather than Enter.
    soft_break: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    lines: VecDeque<Line>,
    current: String,
    current_len: usize,
    max_line_width: usize,
    max_lines_visible: usize,
}

impl LineBuffer {
    /// Both limits are clamped to at least 1.
    pub fn new(max_line_width: usize, max_lines_visible: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            current: String::new(),
            current_len: 0,
            max_line_width: max_line_width.max(1),
            max_lines_visible: max_lines_visible.max(1),
        }
    }

    /// Committed lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.text.as_str())
    }

    pub fn current_line(&self) -> &str {
        &self.current
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.current.is_empty()
    }

    /// Characters across committed lines plus the current line. Line breaks
    /// are not counted.
    pub fn char_count(&self) -> usize {
        self.lines.iter().map(|l| l.text.chars().count()).sum::<usize>() + self.current_len
    }

    /// Append one character. `'\n'` commits the line; any other control
    /// character is refused. Returns whether the buffer changed.
    pub fn append_char(&mut self, c: char) -> bool {
        if c == '\n' {
            self.append_newline();
            return true;
        }
        if c.is_control() {
            return false;
        }

        if self.current_len + 1 > self.max_line_width {
            self.commit(true);
        }
        self.current.push(c);
        self.current_len += 1;
        true
    }

    /// Commit the current line and start an empty one.
    pub fn append_newline(&mut self) {
        self.commit(false);
    }

    /// Remove one logical character. Returns whether anything was removed.
    pub fn backspace(&mut self) -> bool {
        self.pop_char().is_some()
    }

    /// Remove and return the last logical character. A hard line break comes
    /// back as `'\n'`. Soft breaks are not characters and are rejoined.
    pub fn pop_char(&mut self) -> Option<char> {
        if let Some(c) = self.current.pop() {
            self.current_len -= 1;
            if self.current.is_empty()
                && self.lines.back().is_some_and(|l| l.soft_break)
            {
                self.uncommit();
            }
            return Some(c);
        }

        if self.lines.is_empty() {
            return None;
        }
        self.uncommit();
        Some('\n')
    }

    /// The last `n` chars of the unwrapped stream, hard breaks as `'\n'`.
    /// Shorter when the retained text is shorter.
    pub fn logical_tail(&self, n: usize) -> String {
        let mut rev: Vec<char> = Vec::with_capacity(n);
        rev.extend(self.current.chars().rev().take(n));

        for line in self.lines.iter().rev() {
            if rev.len() >= n {
                break;
            }
            if !line.soft_break {
                rev.push('\n');
            }
            let room = n.saturating_sub(rev.len());
            rev.extend(line.text.chars().rev().take(room));
        }

        rev.truncate(n);
        rev.into_iter().rev().collect()
    }

    /// The whole retained text, unwrapped.
    pub fn logical_text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
            if !line.soft_break {
                out.push('\n');
            }
        }
        out.push_str(&self.current);
        out
    }

    /// Physical lines for display, oldest first, current line last.
    pub fn render_text(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| l.text.clone())
            .chain(std::iter::once(self.current.clone()))
            .collect()
    }

    pub fn reset(&mut self) {
        self.lines.clear();
        self.current.clear();
        self.current_len = 0;
    }

    fn commit(&mut self, soft_break: bool) {
        self.lines.push_back(Line {
            text: std::mem::take(&mut self.current),
            soft_break,
        });
        self.current_len = 0;
        while self.lines.len() > self.max_lines_visible {
            self.lines.pop_front();
        }
    }

    fn uncommit(&mut self) {
        if let Some(line) = self.lines.pop_back() {
            self.current_len = line.text.chars().count();
            self.current = line.text;
        }
    }
}
