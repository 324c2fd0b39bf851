// libs/reminder-cell/src/lib.rs

//! # Reminder Cell
//!
//! Sends the pre-session reminder when a consultation enters its imminent
//! window. A background scheduler sweeps the session store, claims the
//! window transition on the session before notifying, and so delivers at
//! most one reminder per appointment regardless of how often the sweep
//! runs. Operators can force a resend past the claim.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Reminder Cell                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ReminderScheduler (interval sweep)                         │
//! │  └── ReminderDispatcher                                     │
//! │      ├── SessionStore (phase per appointment)               │
//! │      ├── AppointmentDirectory (times, participants)         │
//! │      └── Notifier (patient + provider)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP Endpoints                                             │
//! │  ├── POST /{appointment_id}/resend                          │
//! │  └── GET  /health                                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use models::{templates, ReminderError, SweepSummary};

pub use services::{ReminderDispatcher, ReminderScheduler};

pub use router::reminder_routes;
