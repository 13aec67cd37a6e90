//! Command handlers for the crimestat CLI.

pub mod chat;
pub mod context;
pub mod search;
pub mod summary;

pub use chat::ChatCommand;
pub use context::ContextCommand;
pub use search::SearchCommand;
pub use summary::SummaryCommand;
