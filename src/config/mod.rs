pub mod email;
pub mod llm;
pub mod settings;

pub use settings::{load_feeds, Settings};
