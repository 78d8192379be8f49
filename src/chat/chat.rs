use std::error::Error;
use std::io::Write;
use rustyline::DefaultEditor;

use crate::config::Settings;
use crate::predictor::Candidate;
use super::command_handlers::{
    ChatContext,
    handle_model_info,
    handle_pick,
    handle_predict,
    handle_reset,
    handle_typed_text,
};

const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const BRIGHT_CYAN: &str = "\x1b[96m";
const RESET: &str = "\x1b[0m";

fn print_help() {
    println!("\n{CYAN}nextword Commands{RESET}");
    println!("{BRIGHT_CYAN}{}{RESET}", "=".repeat(60));
    println!("{GREEN}exit, bye, quit{RESET} - Exit the session");
    println!("{GREEN}help{RESET}            - Show this help message");
    println!("{GREEN}clear{RESET}           - Clear the screen");
    println!("{GREEN}reset{RESET}           - Empty the text buffer");
    println!("{GREEN}model{RESET}           - Show the loaded model and vocabulary");
    println!("{GREEN}pick <1-3>{RESET}      - Append a suggested word to the text");
    println!("Anything else is appended to the text, followed by a space.");
    println!();
}

pub async fn chat_loop(settings: &Settings) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting prediction session");
    print_help();

    let mut rl = DefaultEditor::new()?;
    let client = reqwest::Client::new();
    let server_url = format!("http://{}:{}", settings.server.host, settings.server.port);

    let mut buffer = String::new();
    let mut last_candidates: Vec<Candidate> = Vec::new();

    let mut context = ChatContext {
        client: &client,
        server_url: &server_url,
        buffer: &mut buffer,
        context_chars: settings.predictor.context_chars,
        last_candidates: &mut last_candidates,
    };

    // cold start suggestions for an empty field
    handle_predict(&mut context).await;

    loop {
        match rl.readline("> ") {
            Ok(input) => {
                let input_trimmed = input.trim();
                if input_trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input_trimmed);

                let command_lowercase = input_trimmed.to_lowercase();
                match command_lowercase.as_str() {
                    "exit" | "bye" | "quit" => {
                        println!("Goodbye!");
                        break;
                    }
                    "help" => print_help(),
                    "clear" => {
                        print!("\x1B[2J\x1B[1;1H");
                        std::io::stdout().flush()?;
                    }
                    "reset" => handle_reset(&mut context),
                    "model" => handle_model_info(&context).await,
                    cmd if cmd.starts_with("pick ") => {
                        handle_pick(&mut context, &input_trimmed["pick ".len()..]).await
                    }
                    _ => handle_typed_text(&mut context, input_trimmed).await,
                }
            }
            Err(_) => {
                println!("Goodbye!");
                break;
            }
        }
    }
    Ok(())
}
