use std::fmt;
use std::str::FromStr;

/// Dead-key marks offered on the letter layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diacritic {
    Acute,
    Grave,
    Diaeresis,
    Tilde,
    Circumflex,
}

impl Diacritic {
    pub const ALL: [Diacritic; 5] = [
        Diacritic::Acute,
        Diacritic::Grave,
        Diacritic::Diaeresis,
        Diacritic::Tilde,
        Diacritic::Circumflex,
    ];

    /// The combining mark on its own, without the dotted circle.
    pub fn mark(&self) -> char {
        match self {
            Diacritic::Acute => '\u{0301}',
            Diacritic::Grave => '\u{0300}',
            Diacritic::Diaeresis => '\u{0308}',
            Diacritic::Tilde => '\u{0303}',
            Diacritic::Circumflex => '\u{0302}',
        }
    }

    /// Key label as shown on the keyboard, e.g. "◌́".
    pub fn label(&self) -> String {
        format!("\u{25CC}{}", self.mark())
    }
}

impl fmt::Display for Diacritic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Diacritic {
    type Err = String;

    /// Accepts a key label with or without the leading dotted circle.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mark = s.strip_prefix('\u{25CC}').unwrap_or(s);
        let mut chars = mark.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Diacritic::ALL
                .into_iter()
                .find(|d| d.mark() == c)
                .ok_or_else(|| format!("Unknown diacritic: {}", s)),
            _ => Err(format!("Unknown diacritic: {}", s)),
        }
    }
}

/// Applies `diacritic` to `letter`. Pairs without a precomposed form come
/// back unchanged; the table is case-sensitive.
pub fn combine(letter: &str, diacritic: Diacritic) -> String {
    let combined = match (diacritic, letter) {
        (Diacritic::Acute, "a") => "á",
        (Diacritic::Acute, "e") => "é",
        (Diacritic::Acute, "i") => "í",
        (Diacritic::Acute, "o") => "ó",
        (Diacritic::Acute, "u") => "ú",
        (Diacritic::Acute, "ü") => "ǘ",

        (Diacritic::Grave, "a") => "à",
        (Diacritic::Grave, "e") => "è",
        (Diacritic::Grave, "i") => "ì",
        (Diacritic::Grave, "o") => "ò",
        (Diacritic::Grave, "u") => "ù",
        (Diacritic::Grave, "ü") => "ǜ",

        (Diacritic::Diaeresis, "a") => "ä",
        (Diacritic::Diaeresis, "e") => "ë",
        (Diacritic::Diaeresis, "i") => "ï",
        (Diacritic::Diaeresis, "o") => "ö",
        (Diacritic::Diaeresis, "u") => "ü",
        (Diacritic::Diaeresis, "ú") => "ǘ",
        (Diacritic::Diaeresis, "ù") => "ǜ",

        (Diacritic::Tilde, "a") => "ã",
        (Diacritic::Tilde, "n") => "ñ",
        (Diacritic::Tilde, "o") => "õ",

        (Diacritic::Circumflex, "s") => "ŝ",
        (Diacritic::Circumflex, "g") => "ĝ",

        _ => letter,
    };
    combined.to_string()
}
