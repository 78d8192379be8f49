pub mod routes;
pub mod types;
mod server;

pub use server::ApiServer;
