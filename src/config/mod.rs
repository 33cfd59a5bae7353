mod server;

pub use server::{SECRET_KEY_FILE, ServerConfig};
