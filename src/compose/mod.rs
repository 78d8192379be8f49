//! Key handling for the letter layout: caps state, dead-key diacritics and
//! the text window handed to the predictor.

mod composer;
mod diacritic;

pub use composer::{preceding_text, CapsState, ComposerState, Edit, Layout};
pub use diacritic::{combine, Diacritic};
