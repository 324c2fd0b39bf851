// libs/reminder-cell/src/services/mod.rs

pub mod dispatcher;

pub use dispatcher::{ReminderDispatcher, ReminderScheduler};
