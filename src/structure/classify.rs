use super::document::{Inline, Paragraph, Run};

pub const DEFAULT_TERMINAL_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

pub trait RunClassifier: Sync {
    fn is_heading_run(&self, run: &Run) -> bool;
}

/// Bold runs open a section unless they read like the end of a sentence,
/// which is how emphasised words inside prose usually look.
#[derive(Debug, Clone)]
pub struct BoldRunClassifier {
    terminal_punctuation: Vec<char>,
}

impl BoldRunClassifier {
    pub fn new(terminal_punctuation: Vec<char>) -> Self {
        Self {
            terminal_punctuation,
        }
    }
}

impl Default for BoldRunClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINAL_PUNCTUATION.to_vec())
    }
}

impl RunClassifier for BoldRunClassifier {
    fn is_heading_run(&self, run: &Run) -> bool {
        if !run.is_bold {
            return false;
        }

        let trimmed = run.text.trim();
        match trimmed.chars().last() {
            Some(last) => !self.terminal_punctuation.contains(&last),
            None => false,
        }
    }
}

/// Merges the paragraph's leading bold runs into one run. Whitespace-only runs
/// are absorbed whatever their formatting. Returns the merged run and the
/// index of the first inline after it.
pub fn leading_bold_span(paragraph: &Paragraph) -> Option<(Run, usize)> {
    let mut text = String::new();
    let mut italic = true;
    let mut saw_bold = false;
    let mut end = 0usize;

    for inline in &paragraph.inlines {
        let Inline::Run(run) = inline else {
            break;
        };

        if run.is_bold {
            saw_bold = true;
            italic &= run.is_italic;
        } else if !run.text.trim().is_empty() {
            break;
        }

        text.push_str(&run.text);
        end += 1;
    }

    if !saw_bold || text.trim().is_empty() {
        return None;
    }

    Some((
        Run {
            text,
            is_bold: true,
            is_italic: italic,
        },
        end,
    ))
}

pub fn parse_terminal_punctuation(raw: &str) -> Vec<char> {
    let mut marks = Vec::new();
    for ch in raw.chars().filter(|ch| !ch.is_whitespace()) {
        if !marks.contains(&ch) {
            marks.push(ch);
        }
    }
    marks
}
