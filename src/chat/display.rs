use comfy_table::{Table, Cell, ContentArrangement, Attribute, CellAlignment};
use colored::*;

use crate::predictor::{Candidate, ModelInfo, UNKNOWN_WORD};

fn header(text: &str) -> Cell {
    Cell::new(text).fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold)
}

/// Shows the ranked candidates, numbered for `pick`.
pub fn display_candidates(candidates: &[Candidate], elapsed_ms: f64) {
    if candidates.is_empty() {
        println!("{}", "No candidates returned".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![header("#"), header("Word"), header("Score")])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for (i, candidate) in candidates.iter().enumerate() {
        let word_color = if candidate.word == UNKNOWN_WORD {
            comfy_table::Color::DarkGrey
        } else {
            comfy_table::Color::Green
        };
        table.add_row(vec![
            Cell::new(i + 1).fg(comfy_table::Color::White).set_alignment(CellAlignment::Center),
            Cell::new(&candidate.word).fg(word_color),
            Cell::new(format!("{:.4}", candidate.score))
                .fg(comfy_table::Color::Blue)
                .set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{}", table);
    println!("{}", format!("Predicted in {:.2} ms", elapsed_ms).bright_black());
}

pub fn display_model_info(info: &ModelInfo) {
    let mut table = Table::new();
    table
        .set_header(vec![header("Property"), header("Value")])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut rows = vec![
        ("Architecture".to_string(), info.architecture.clone()),
        (
            "Model".to_string(),
            info.model_path.clone().unwrap_or_else(|| "(in memory)".to_string()),
        ),
        ("Sequence length".to_string(), info.max_len.to_string()),
        ("Output width".to_string(), info.vocab_size.to_string()),
        ("Vocabulary words".to_string(), info.vocabulary_words.to_string()),
    ];
    for (key, value) in &info.hyperparameters {
        rows.push((key.clone(), value.to_string()));
    }
    rows.push((
        "Loaded at".to_string(),
        info.loaded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ));

    for (key, value) in rows {
        table.add_row(vec![
            Cell::new(key).fg(comfy_table::Color::Yellow),
            Cell::new(value).fg(comfy_table::Color::White),
        ]);
    }

    println!("\n{}", table);
}
