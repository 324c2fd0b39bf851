// libs/session-cell/src/services/phase.rs
//
// Pure consultation-phase arithmetic. Everything here is a function of its
// arguments; callers supply `now` so the same code path serves live requests,
// background sweeps and tests.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Session, SessionError, SessionPhase};

/// Fallback when the appointment record carries no duration.
pub const DEFAULT_DURATION_MINUTES: i64 = 30;

/// Compute the phase of a consultation relative to its appointment slot.
///
/// The timeline is split into four half-open intervals:
/// `[-inf, start - window)` upcoming, `[start - window, start)` imminent,
/// `[start, start + duration)` active, `[start + duration, +inf)` ended.
/// Every instant lands in exactly one interval and later instants never map
/// to an earlier phase.
pub fn evaluate(
    start_time: DateTime<Utc>,
    duration_minutes: Option<i64>,
    now: DateTime<Utc>,
    imminent_window_minutes: i64,
) -> Result<SessionPhase, SessionError> {
    let duration = duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    if duration <= 0 {
        return Err(SessionError::Validation {
            message: format!("appointment duration must be positive, got {}", duration),
        });
    }
    if imminent_window_minutes < 0 {
        return Err(SessionError::Validation {
            message: format!(
                "imminent window must not be negative, got {}",
                imminent_window_minutes
            ),
        });
    }

    let window_open = start_time - Duration::minutes(imminent_window_minutes);
    let end_time = start_time + Duration::minutes(duration);

    let phase = if now < window_open {
        SessionPhase::Upcoming
    } else if now < start_time {
        SessionPhase::Imminent
    } else if now < end_time {
        SessionPhase::Active
    } else {
        SessionPhase::Ended
    };

    Ok(phase)
}

/// Phase of a stored session: an explicit end is sticky and wins over the
/// clock, otherwise defer to [`evaluate`].
pub fn effective(
    session: &Session,
    start_time: DateTime<Utc>,
    duration_minutes: Option<i64>,
    now: DateTime<Utc>,
    imminent_window_minutes: i64,
) -> Result<SessionPhase, SessionError> {
    if session.ended_explicitly {
        return Ok(SessionPhase::Ended);
    }
    evaluate(start_time, duration_minutes, now, imminent_window_minutes)
}
