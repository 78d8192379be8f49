use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use tracing::info;

use super::model::{LstmConfig, LstmModel};
use super::tokenizer::normalize;
use super::{MAX_LEN, TOP_K};

/// Paths and sizes of a freshly written demo model/vocabulary pair.
#[derive(Debug, Clone)]
pub struct DemoArtifacts {
    pub model_path: PathBuf,
    pub vocabulary_path: PathBuf,
    /// Output width of the model, to be used as `predictor.vocab_size`
    pub vocab_size: usize,
}

/// Frequency-ranked word indices: 1 is the most frequent word, ties go to
/// the word seen first.
pub fn build_vocabulary(corpus: &str) -> Vec<(String, u32)> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut seen = 0usize;

    for line in corpus.lines() {
        for word in normalize(line).split(' ').filter(|w| !w.is_empty()) {
            let entry = counts.entry(word.to_string()).or_insert_with(|| {
                seen += 1;
                (0, seen)
            });
            entry.0 += 1;
        }
    }

    let mut words: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    words.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

    words
        .into_iter()
        .enumerate()
        .map(|(i, (word, _))| (word, i as u32 + 1))
        .collect()
}

/// Writes `word_index.json` and an untrained `prediction_model.gguf` into
/// `out_dir`, sized to the vocabulary found in `corpus`.
pub fn write_demo_artifacts(
    corpus: &str,
    out_dir: &Path,
    embedding_length: usize,
    hidden_size: usize,
    seed: u64,
) -> Result<DemoArtifacts, Box<dyn Error + Send + Sync>> {
    let vocabulary = build_vocabulary(corpus);
    if vocabulary.len() < TOP_K {
        return Err(format!(
            "Corpus has {} distinct words, at least {} are needed",
            vocabulary.len(),
            TOP_K
        )
        .into());
    }

    fs::create_dir_all(out_dir)?;

    let mut mapping = Map::new();
    for (word, index) in &vocabulary {
        mapping.insert(word.clone(), Value::from(*index));
    }
    let vocabulary_path = out_dir.join("word_index.json");
    fs::write(&vocabulary_path, serde_json::to_string_pretty(&Value::Object(mapping))?)?;

    let config = LstmConfig {
        context_length: MAX_LEN,
        vocab_size: vocabulary.len() + 1,
        embedding_length,
        hidden_size,
    };
    let model = LstmModel::random(config, &mut StdRng::seed_from_u64(seed));
    let model_path = out_dir.join("prediction_model.gguf");
    model.save(&model_path)?;

    info!(
        "Wrote demo artifacts to {}: {} words, embedding {}, hidden {}",
        out_dir.display(),
        vocabulary.len(),
        embedding_length,
        hidden_size
    );

    Ok(DemoArtifacts {
        model_path,
        vocabulary_path,
        vocab_size: config.vocab_size,
    })
}
