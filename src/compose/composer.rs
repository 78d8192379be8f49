use super::diacritic::{combine, Diacritic};

/// Three-position caps key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapsState {
    #[default]
    Off,
    /// Uppercase the next letter only
    OneShot,
    Locked,
}

impl CapsState {
    /// State after one press of the caps key.
    pub fn next(self) -> Self {
        match self {
            CapsState::Off => CapsState::OneShot,
            CapsState::OneShot => CapsState::Locked,
            CapsState::Locked => CapsState::Off,
        }
    }

    pub fn apply(self, letter: &str) -> String {
        match self {
            CapsState::Off => letter.to_lowercase(),
            CapsState::OneShot | CapsState::Locked => letter.to_uppercase(),
        }
    }

    /// State after a letter has been committed.
    pub fn after_letter(self) -> Self {
        match self {
            CapsState::OneShot => CapsState::Off,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Letters,
    Symbols,
}

/// What the keyboard should do to the text field after a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Nothing to write yet
    None,
    Commit(String),
    /// Delete `delete` characters before the cursor, then commit `text`
    Replace { delete: usize, text: String },
}

impl Edit {
    /// Applies the edit to a plain text buffer whose cursor is at the end.
    pub fn apply_to(&self, buffer: &mut String) {
        match self {
            Edit::None => {}
            Edit::Commit(text) => buffer.push_str(text),
            Edit::Replace { delete, text } => {
                for _ in 0..*delete {
                    buffer.pop();
                }
                buffer.push_str(text);
            }
        }
    }
}

/// Key-handling state of the letter layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComposerState {
    pub caps: CapsState,
    /// Diacritic waiting for the next letter
    pub pending: Option<Diacritic>,
}

impl ComposerState {
    pub fn press_letter(self, letter: &str) -> (Self, Edit) {
        let cased = self.caps.apply(letter);
        let text = match self.pending {
            Some(diacritic) => combine(&cased, diacritic),
            None => cased,
        };

        let next = ComposerState {
            caps: self.caps.after_letter(),
            pending: None,
        };
        (next, Edit::Commit(text))
    }

    /// `prev_char` is the character right before the cursor, if any. Anything
    /// but a space is replaced by its combined form; otherwise the diacritic
    /// waits for the next letter.
    pub fn press_diacritic(self, diacritic: Diacritic, prev_char: Option<char>) -> (Self, Edit) {
        match prev_char {
            Some(c) if c != ' ' => {
                let text = combine(c.encode_utf8(&mut [0; 4]), diacritic);
                let next = ComposerState { pending: None, ..self };
                (next, Edit::Replace { delete: 1, text })
            }
            _ => {
                let next = ComposerState { pending: Some(diacritic), ..self };
                (next, Edit::None)
            }
        }
    }

    pub fn press_caps(self) -> Self {
        ComposerState { caps: self.caps.next(), ..self }
    }

    pub fn switch_layout(self, layout: Layout) -> Self {
        match layout {
            Layout::Symbols => ComposerState { caps: CapsState::Off, ..self },
            Layout::Letters => self,
        }
    }
}

/// The last `limit` characters of `text`, the window handed to the predictor
/// on every space press.
pub fn preceding_text(text: &str, limit: usize) -> &str {
    let count = text.chars().count();
    if count <= limit {
        return text;
    }
    match text.char_indices().nth(count - limit) {
        Some((start, _)) => &text[start..],
        None => "",
    }
}
