pub mod composer;
pub mod engine;
pub mod feed;
pub mod history;
pub mod signal_store;

pub use composer::SignalComposer;
pub use engine::Engine;
pub use feed::{FeedAction, FeedConnection, FeedError, IngestError, TickFeed};
pub use history::{HistoryError, HistoryStore};
pub use signal_store::SignalStore;
