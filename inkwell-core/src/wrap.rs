//! Word wrapping for quote text on the clock face.
//!
//! Greedy fill at word boundaries. Words longer than the line are broken at
//! character boundaries. Widths are counted in `char`s; the panel font is
//! monospaced.

/// Wrap `text` into lines of at most `width` chars. Runs of whitespace
/// collapse to a single space; explicit newlines are treated as spaces.
/// Returns an empty `Vec` for blank input.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = word.chars().count();

        if word_width > width {
            // Fill the remainder of the current line, then hard-break.
            let mut chars = word.chars().peekable();
            if current_width > 0 && current_width + 1 < width {
                current.push(' ');
                current_width += 1;
            } else if current_width > 0 {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            while chars.peek().is_some() {
                if current_width == width {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                if let Some(c) = chars.next() {
                    current.push(c);
                    current_width += 1;
                }
            }
            continue;
        }

        let needed = if current_width == 0 {
            word_width
        } else {
            current_width + 1 + word_width
        };

        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
        if current_width > 0 {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += word_width;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
