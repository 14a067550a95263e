// ── Result storage ──

mod history;

pub use history::ResultHistory;
