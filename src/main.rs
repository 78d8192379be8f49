use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::{Cell, ContentArrangement, Table};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use nextword::chat;
use nextword::compose::preceding_text;
use nextword::config::{LoggingConfig, Settings};
use nextword::gguf::GGUFReader;
use nextword::predictor::{write_demo_artifacts, Predictor, VocabularyTable};
use nextword::server::ApiServer;

#[derive(Parser, Debug)]
#[command(name = "nextword")]
#[command(about = "Next-word prediction for a software keyboard")]
struct Cli {
    /// Directory holding default.toml and an optional local.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the server and an interactive session against it
    Run,
    /// Start only the server
    Serve,
    /// Start only the interactive session
    Chat,
    /// Predict once for TEXT without a server
    Predict { text: String },
    /// Summarize the configured model and vocabulary
    Inspect,
    /// Write a demo vocabulary and an untrained model built from a corpus
    Scaffold {
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "32")]
        embedding: usize,
        #[arg(long, default_value = "64")]
        hidden: usize,
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::RollingFileAppender::new(
        tracing_appender::rolling::Rotation::DAILY,
        &config.directory,
        "nextword",
    );

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        // Disable ANSI colors for cleaner log files
        .with_ansi(false)
        .with_line_number(true)
        .with_file(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(false)
        .with_env_filter(EnvFilter::new(&config.level))
        .init();

    let full_log_path = fs::canonicalize(&config.directory)?;
    info!("Log directory: {}", full_log_path.display());
    Ok(guard)
}

fn load_predictor(settings: &Settings) -> Result<Predictor> {
    Predictor::from_config(&settings.predictor).with_context(|| {
        format!(
            "Loading {} and {}",
            settings.predictor.model_path.display(),
            settings.predictor.vocabulary_path.display()
        )
    })
}

fn inspect(settings: &Settings) -> Result<()> {
    let bytes = fs::read(&settings.predictor.model_path)
        .with_context(|| format!("Reading {}", settings.predictor.model_path.display()))?;
    let reader = GGUFReader::from_bytes(&bytes)?;

    println!("{} {} (GGUF v{})", "Model:".cyan(), settings.predictor.model_path.display(), reader.version);
    for (key, (type_name, value)) in &reader.metadata {
        println!("  {} [{}] = {}", key.yellow(), type_name, value);
    }

    let mut table = Table::new();
    table
        .set_header(vec!["Tensor", "Shape", "Type", "Elements"])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    for tensor in &reader.tensors {
        table.add_row(vec![
            Cell::new(&tensor.name),
            Cell::new(format!("{:?}", tensor.shape())),
            Cell::new(format!("{:?}", tensor.data_type)),
            Cell::new(
                tensor
                    .element_count()
                    .map_or_else(|| "overflow".to_string(), |n| n.to_string()),
            ),
        ]);
    }
    println!("{}", table);

    let vocabulary = VocabularyTable::load(&settings.predictor.vocabulary_path)?;
    println!(
        "{} {} ({} words, index space {}, configured width {})",
        "Vocabulary:".cyan(),
        settings.predictor.vocabulary_path.display(),
        vocabulary.len(),
        vocabulary.index_space(),
        settings.predictor.vocab_size
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(dir) => Settings::from_dir(dir)?,
        None => Settings::new()?,
    };

    let _guard = init_logging(&settings.logging)?;
    info!("nextword starting: {:?}", cli.command);

    match cli.command {
        Command::Run => {
            let predictor = load_predictor(&settings)?;
            let server = ApiServer::from_config(predictor, &settings.server);

            tokio::spawn(async move {
                if let Err(e) = server.start().await {
                    eprintln!("Server error: {}", e);
                }
            });

            // Give the server a moment to start
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            chat::chat_loop(&settings).await.map_err(|e| anyhow!(e))?;
        }
        Command::Serve => {
            let predictor = load_predictor(&settings)?;
            let server = ApiServer::from_config(predictor, &settings.server);
            println!("Serving on http://{}:{}", settings.server.host, settings.server.port);
            server.start().await.map_err(|e| anyhow!(e))?;
        }
        Command::Chat => {
            chat::chat_loop(&settings).await.map_err(|e| anyhow!(e))?;
        }
        Command::Predict { text } => {
            let predictor = load_predictor(&settings)?;
            let window = preceding_text(&text, settings.predictor.context_chars);
            for (i, candidate) in predictor.predict(window)?.iter().enumerate() {
                println!("{}. {} {}", i + 1, candidate.word.green(), format!("{:.4}", candidate.score).bright_black());
            }
        }
        Command::Inspect => inspect(&settings)?,
        Command::Scaffold { corpus, out, embedding, hidden, seed } => {
            let text = fs::read_to_string(&corpus)
                .with_context(|| format!("Reading corpus {}", corpus.display()))?;
            let artifacts = write_demo_artifacts(&text, &out, embedding, hidden, seed)
                .map_err(|e| anyhow!(e))?;

            println!("{} {}", "Model:".cyan(), artifacts.model_path.display());
            println!("{} {}", "Vocabulary:".cyan(), artifacts.vocabulary_path.display());
            println!(
                "Point predictor.model_path and predictor.vocabulary_path at these files and set predictor.vocab_size = {}",
                artifacts.vocab_size
            );
        }
    }

    Ok(())
}
