//! Display renderers.
//!
//! [`TerminalDisplay`] paints frames onto a terminal the way the panel shows
//! them: typing from the top-left, the clock face pushed to the bottom with
//! the attribution beneath it. [`LogDisplay`] writes frames to the log for
//! headless runs.

use std::io::Write;

use crossterm::{cursor, queue, style, terminal};

use inkwell_core::{DisplayFrame, DisplayRenderer, FrameKind, RenderError};

/// Columns left blank on the left edge.
pub const LEFT_MARGIN: u16 = 2;
/// Rows left blank under the clock face.
pub const BOTTOM_MARGIN: u16 = 1;

/// A line of text placed on a terminal row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub row: u16,
    pub col: u16,
    pub text: String,
}

/// Where each line of `frame` goes on a `cols` x `rows` screen. Lines that
/// don't fit are dropped from the top, so the newest text stays visible.
pub fn layout_frame(frame: &DisplayFrame, cols: u16, rows: u16) -> Vec<PlacedLine> {
    let width = usize::from(cols.saturating_sub(LEFT_MARGIN));
    let mut body: Vec<String> = frame.lines.clone();

    let usable_rows = match frame.kind {
        FrameKind::Typing => rows,
        FrameKind::Clock => {
            if let Some(caption) = frame.attribution.as_ref().map(|a| a.caption()) {
                if !caption.is_empty() {
                    body.push(String::new());
                    body.push(format!("- {caption}"));
                }
            }
            rows.saturating_sub(BOTTOM_MARGIN)
        }
    };

    let visible = usize::from(usable_rows).min(body.len());
    let skip = body.len() - visible;
    let first_row = match frame.kind {
        FrameKind::Typing => 0,
        FrameKind::Clock => usable_rows - visible as u16,
    };

    body.into_iter()
        .skip(skip)
        .enumerate()
        .filter(|(_, text)| !text.is_empty())
        .map(|(i, text)| PlacedLine {
            row: first_row + i as u16,
            col: LEFT_MARGIN,
            text: text.chars().take(width).collect(),
        })
        .collect()
}

/// Paints frames onto a terminal through crossterm.
pub struct TerminalDisplay<W: Write + Send> {
    out: W,
    /// Fixed screen size; `None` asks the terminal on every frame.
    size: Option<(u16, u16)>,
}

impl TerminalDisplay<std::io::Stdout> {
    pub fn stdout() -> Result<Self, RenderError> {
        let mut out = std::io::stdout();
        crossterm::execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { out, size: None })
    }
}

impl<W: Write + Send> TerminalDisplay<W> {
    pub fn with_size(out: W, cols: u16, rows: u16) -> Self {
        Self {
            out,
            size: Some((cols, rows)),
        }
    }

    fn screen_size(&self) -> Result<(u16, u16), RenderError> {
        match self.size {
            Some(size) => Ok(size),
            None => Ok(terminal::size()?),
        }
    }
}

impl<W: Write + Send> DisplayRenderer for TerminalDisplay<W> {
    fn render(&mut self, frame: &DisplayFrame) -> Result<(), RenderError> {
        let (cols, rows) = self.screen_size()?;
        queue!(self.out, terminal::Clear(terminal::ClearType::All))?;
        for line in layout_frame(frame, cols, rows) {
            queue!(
                self.out,
                cursor::MoveTo(line.col, line.row),
                style::Print(line.text)
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Drop for TerminalDisplay<W> {
    fn drop(&mut self) {
        if self.size.is_none() {
            let _ = crossterm::execute!(self.out, cursor::Show, terminal::LeaveAlternateScreen);
        }
    }
}

/// Headless renderer: every frame goes to the log.
#[derive(Debug, Default)]
pub struct LogDisplay {
    frames: u64,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl DisplayRenderer for LogDisplay {
    fn render(&mut self, frame: &DisplayFrame) -> Result<(), RenderError> {
        self.frames += 1;
        let caption = frame.attribution.as_ref().map(|a| a.caption());
        match frame.kind {
            FrameKind::Clock => tracing::info!(
                time = %frame.time.map(|t| t.to_string()).unwrap_or_default(),
                caption = caption.as_deref().unwrap_or(""),
                "\n{}",
                frame.lines.join("\n")
            ),
            FrameKind::Typing => tracing::info!(
                lines = frame.lines.len(),
                current = frame.lines.last().map(String::as_str).unwrap_or(""),
                "Typing"
            ),
        }
        Ok(())
    }
}
