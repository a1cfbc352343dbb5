pub mod frame;
pub mod history;

pub use frame::{format_frame, DASHBOARD_TARGET};
pub use history::{HistoryStore, AGGREGATE_KEY};
