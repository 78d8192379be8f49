// Table rendering for candidates and model info
mod display;

// The read-eval loop
mod chat;

mod command_handlers;

pub use chat::chat_loop;
