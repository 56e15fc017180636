pub mod dispatcher;
pub mod folder;
pub mod settle;
pub mod stats;

pub use dispatcher::{DispatchOutcome, WatchDispatcher};
pub use folder::{IgnoreFilter, WatchedFolder};
pub use settle::{await_write_finish, SettleOptions};
pub use stats::{DispatchCounts, DispatchStats, SessionReport};
