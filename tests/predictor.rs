use std::fs;
use std::sync::{Arc, Mutex};

use ndarray::{Array2, ArrayView2};
use rand::SeedableRng;

use nextword::gguf::{GGUFReader, GGUFValue};
use nextword::predictor::{
    write_demo_artifacts, Candidate, ForwardPass, InferenceEngine, LstmConfig, LstmModel,
    PredictionError, Predictor, Tokenizer, VocabularyTable, MAX_LEN, TOP_K, UNKNOWN_WORD,
};

const CORPUS: &str = "the cat sat on the mat\n\
                      the dog sat on the log\n\
                      a cat and a dog met on the mat";

/// Returns the same scores for every input and records what it was given.
struct ScriptedModel {
    input_len: usize,
    scores: Vec<f32>,
    seen: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl ScriptedModel {
    fn new(input_len: usize, scores: Vec<f32>) -> (Self, Arc<Mutex<Vec<Vec<f32>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let model = Self { input_len, scores, seen: Arc::clone(&seen) };
        (model, seen)
    }
}

impl ForwardPass for ScriptedModel {
    fn architecture(&self) -> &str {
        "scripted"
    }

    fn input_len(&self) -> usize {
        self.input_len
    }

    fn output_len(&self) -> usize {
        self.scores.len()
    }

    fn forward(&self, input: ArrayView2<'_, f32>) -> Result<Array2<f32>, PredictionError> {
        self.seen.lock().unwrap().push(input.iter().copied().collect());
        Ok(Array2::from_shape_vec((1, self.scores.len()), self.scores.clone()).unwrap())
    }
}

fn three_word_vocabulary() -> VocabularyTable {
    VocabularyTable::from_json(r#"{"the": 1, "cat": 2, "sat": 3}"#).unwrap()
}

fn pairs(candidates: &[Candidate]) -> Vec<(&str, f32)> {
    candidates.iter().map(|c| (c.word.as_str(), c.score)).collect()
}

#[test]
fn test_fixed_scores_are_ranked_by_vocabulary_index() {
    let (model, seen) = ScriptedModel::new(MAX_LEN, vec![0.1, 0.9, 0.5, 0.05]);
    let engine = InferenceEngine::with_model(Box::new(model), MAX_LEN, 4).unwrap();
    let predictor = Predictor::new(three_word_vocabulary(), engine).unwrap();

    let candidates = predictor.predict("The cat").unwrap();
    assert_eq!(pairs(&candidates), vec![("the", 0.9), ("cat", 0.5), ("sat", 0.05)]);

    let inputs = seen.lock().unwrap();
    assert_eq!(inputs.len(), 1);
    let mut expected = vec![0.0; MAX_LEN - 2];
    expected.extend([1.0, 2.0]);
    assert_eq!(inputs[0], expected);
}

#[test]
fn test_long_input_keeps_most_recent_tokens() {
    let (model, seen) = ScriptedModel::new(MAX_LEN, vec![0.1, 0.2, 0.3, 0.4]);
    let engine = InferenceEngine::with_model(Box::new(model), MAX_LEN, 4).unwrap();
    let predictor = Predictor::new(three_word_vocabulary(), engine).unwrap();

    // 57 "the" followed by "cat sat sat"
    let mut words = vec!["the"; 57];
    words.extend(["cat", "sat", "sat"]);
    predictor.predict(&words.join(" ")).unwrap();

    let inputs = seen.lock().unwrap();
    let input = &inputs[0];
    assert_eq!(input.len(), MAX_LEN);
    assert_eq!(&input[MAX_LEN - 3..], &[2.0, 3.0, 3.0]);
    assert!(input[..MAX_LEN - 3].iter().all(|&t| t == 1.0));
}

#[test]
fn test_vocabulary_smaller_than_output_yields_placeholder() {
    // indices 4 and 5 have no word, but the vocabulary still spans the width
    let vocabulary = VocabularyTable::from_json(r#"{"the": 1, "cat": 2, "end": 5}"#).unwrap();
    let (model, _) = ScriptedModel::new(4, vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.05]);
    let engine = InferenceEngine::with_model(Box::new(model), 4, 6).unwrap();
    let predictor = Predictor::new(vocabulary, engine).unwrap();

    let candidates = predictor.predict("").unwrap();
    assert_eq!(
        pairs(&candidates),
        vec![(UNKNOWN_WORD, 0.4), (UNKNOWN_WORD, 0.3), ("cat", 0.2)]
    );
}

#[test]
fn test_mismatched_index_space_is_a_load_error() {
    let (model, _) = ScriptedModel::new(MAX_LEN, vec![0.2; 10]);
    let engine = InferenceEngine::with_model(Box::new(model), MAX_LEN, 10).unwrap();

    match Predictor::new(three_word_vocabulary(), engine) {
        Err(PredictionError::ResourceLoad(msg)) => assert!(msg.contains("index space")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("mismatched widths were accepted"),
    }
}

#[test]
fn test_vocabulary_too_small_for_top_k() {
    let vocabulary = VocabularyTable::from_json(r#"{"the": 1, "cat": 2}"#).unwrap();
    let (model, _) = ScriptedModel::new(MAX_LEN, vec![0.2; 3]);
    let engine = InferenceEngine::with_model(Box::new(model), MAX_LEN, 3).unwrap();

    assert!(matches!(
        Predictor::new(vocabulary, engine),
        Err(PredictionError::ResourceLoad(_))
    ));
}

#[test]
fn test_configured_width_must_match_model() {
    let (model, _) = ScriptedModel::new(MAX_LEN, vec![0.25; 4]);
    assert!(matches!(
        InferenceEngine::with_model(Box::new(model), MAX_LEN, 5),
        Err(PredictionError::ResourceLoad(_))
    ));

    let (model, _) = ScriptedModel::new(10, vec![0.25; 4]);
    assert!(matches!(
        InferenceEngine::with_model(Box::new(model), MAX_LEN, 4),
        Err(PredictionError::ResourceLoad(_))
    ));
}

#[test]
fn test_empty_text_encodes_to_all_sentinels() {
    let tokenizer = Tokenizer::new(Arc::new(three_word_vocabulary()), MAX_LEN);
    let sequence = tokenizer.encode("");
    assert_eq!(sequence.len(), MAX_LEN);
    assert!(sequence.as_slice().iter().all(|&t| t == 0));
}

#[test]
fn test_scaffolded_artifacts_predict_cold_start() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = write_demo_artifacts(CORPUS, dir.path(), 8, 6, 11).unwrap();

    let predictor = Predictor::load(
        &artifacts.model_path,
        &artifacts.vocabulary_path,
        MAX_LEN,
        artifacts.vocab_size,
    )
    .unwrap();

    let candidates = predictor.predict("").unwrap();
    assert_eq!(candidates.len(), TOP_K);
    for candidate in &candidates {
        assert_ne!(candidate.word, UNKNOWN_WORD);
        assert!((0.0..=1.0).contains(&candidate.score));
    }
    assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));

    // a second call over the same text gives the same answer
    assert_eq!(predictor.predict("").unwrap(), candidates);

    let info = predictor.info();
    assert_eq!(info.architecture, "nextword-lstm");
    assert_eq!(info.max_len, MAX_LEN);
    assert_eq!(info.vocab_size, artifacts.vocab_size);
    assert_eq!(info.hyperparameters.get("hidden_size"), Some(&6));
}

#[test]
fn test_scaffolded_vocabulary_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = write_demo_artifacts(CORPUS, dir.path(), 4, 4, 1).unwrap();

    let vocabulary = VocabularyTable::load(&artifacts.vocabulary_path).unwrap();
    assert_eq!(vocabulary.lookup_index("the"), Some(1));
    assert_eq!(vocabulary.lookup_word(1), Some("the"));
    assert_eq!(vocabulary.index_space(), artifacts.vocab_size);

    for word in ["cat", "sat", "on", "mat", "dog", "log", "a", "and", "met"] {
        let index = vocabulary.lookup_index(word).unwrap();
        assert_eq!(vocabulary.lookup_word(index), Some(word));
    }
}

#[test]
fn test_model_file_carries_declared_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = write_demo_artifacts(CORPUS, dir.path(), 5, 7, 2).unwrap();

    let bytes = fs::read(&artifacts.model_path).unwrap();
    let reader = GGUFReader::from_bytes(&bytes).unwrap();
    assert_eq!(
        reader.get_metadata_value("general.architecture").unwrap(),
        GGUFValue::String("nextword-lstm".to_string())
    );
    assert_eq!(reader.get_metadata_usize("nextword.context_length").unwrap(), MAX_LEN);
    assert_eq!(reader.get_metadata_usize("nextword.vocab_size").unwrap(), artifacts.vocab_size);

    let output = reader.get_tensor_by_name("output.weight").unwrap();
    assert_eq!(output.shape(), vec![artifacts.vocab_size, 7]);
}

#[test]
fn test_wrong_configured_length_fails_on_real_model() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = write_demo_artifacts(CORPUS, dir.path(), 4, 4, 5).unwrap();

    let result = Predictor::load(
        &artifacts.model_path,
        &artifacts.vocabulary_path,
        MAX_LEN + 1,
        artifacts.vocab_size,
    );
    assert!(matches!(result, Err(PredictionError::ResourceLoad(_))));
}

#[test]
fn test_saved_model_loads_with_same_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = LstmConfig {
        context_length: 6,
        vocab_size: 9,
        embedding_length: 3,
        hidden_size: 2,
    };
    let model = LstmModel::random(config, &mut rand::rngs::StdRng::seed_from_u64(4));
    let path = dir.path().join("m.gguf");
    model.save(&path).unwrap();

    assert_eq!(LstmModel::load(&path).unwrap().config(), config);
}

#[test]
fn test_corrupt_model_header_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = write_demo_artifacts(CORPUS, dir.path(), 4, 4, 9).unwrap();

    // valid magic and version, then one metadata key claiming ~2^63 bytes
    let mut header = Vec::new();
    header.extend_from_slice(b"GGUF");
    header.extend_from_slice(&3u32.to_le_bytes());
    header.extend_from_slice(&0u64.to_le_bytes());
    header.extend_from_slice(&1u64.to_le_bytes());
    header.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
    header.extend_from_slice(b"general.architecture");
    fs::write(&artifacts.model_path, &header).unwrap();

    assert!(matches!(
        LstmModel::load(&artifacts.model_path),
        Err(PredictionError::ResourceLoad(_))
    ));
    let result = Predictor::load(
        &artifacts.model_path,
        &artifacts.vocabulary_path,
        MAX_LEN,
        artifacts.vocab_size,
    );
    assert!(matches!(result, Err(PredictionError::ResourceLoad(_))));
}

#[test]
fn test_missing_artifacts_are_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let result = Predictor::load(
        dir.path().join("missing.gguf"),
        dir.path().join("missing.json"),
        MAX_LEN,
        4,
    );
    assert!(matches!(result, Err(PredictionError::ResourceLoad(_))));
}
