//! crates/tahfiz_core/src/session.rs
//!
//! The timed-session state machine and the series rules that govern how
//! many sessions may exist for a parent entry.
//!
//! A session is Running when created, may bounce between Running and
//! Paused, and ends in Completed. Completed is terminal. There is no
//! background timer: [`StudySession::check`] is the only path to
//! completion and must be invoked by a caller (poll or explicit check).
//! It is idempotent and safe to call redundantly.
//!
//! All elapsed/pause arithmetic is in whole seconds; the planned duration
//! is stored in minutes and converted at the comparison.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{DomainError, SessionKind, StudySession};

/// Fixed planned length of a new-memorization session.
pub const ZIYADAH_SESSION_MINUTES: u32 = 25;
/// Fixed planned length of a murajaah session.
pub const MURAJAAH_SESSION_MINUTES: u32 = 25;
/// The planned lengths a per-entry revision session may choose from.
pub const REVISION_SESSION_MINUTES: [u32; 4] = [10, 15, 20, 25];

/// Ziyadah sessions allowed per entry per local calendar day.
pub const MAX_DAILY_ZIYADAH_SESSIONS: u32 = 4;
/// Revision sessions allowed per entry over its lifetime.
pub const MAX_REVISION_SESSIONS: u32 = 5;

/// Outcome of a pause toggle, for caller-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseChange {
    Paused,
    Resumed,
}

impl StudySession {
    /// Creates a Running session starting at `now`.
    pub fn start(
        user_id: Uuid,
        kind: SessionKind,
        entry_id: Option<Uuid>,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> StudySession {
        StudySession {
            id: Uuid::new_v4(),
            user_id,
            kind,
            entry_id,
            start_time: now,
            end_time: None,
            duration_minutes,
            completed: false,
            is_paused: false,
            pause_started_at: None,
            total_pause_seconds: 0,
            rating: None,
        }
    }

    /// Seconds of actual study time: wall-clock elapsed minus accumulated
    /// pause time, minus any pause still open at `now`.
    pub fn effective_elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.start_time).num_seconds();
        let open_pause = self
            .pause_started_at
            .map(|p| (now - p).num_seconds())
            .unwrap_or(0);
        elapsed - self.total_pause_seconds - open_pause
    }

    /// Pauses a running session or resumes a paused one.
    ///
    /// Resuming adds the closed pause window to `total_pause_seconds`.
    /// Fails on a completed session.
    pub fn toggle_pause(&mut self, now: DateTime<Utc>) -> Result<PauseChange, DomainError> {
        if self.completed {
            return Err(DomainError::SessionCompleted);
        }
        if self.is_paused {
            let pause_started = self.pause_started_at.take().unwrap_or(now);
            self.total_pause_seconds += (now - pause_started).num_seconds();
            self.is_paused = false;
            Ok(PauseChange::Resumed)
        } else {
            self.is_paused = true;
            self.pause_started_at = Some(now);
            Ok(PauseChange::Paused)
        }
    }

    /// Lazily evaluates completion: if the effective elapsed time has
    /// reached the planned duration and the session is not paused, it
    /// transitions to Completed with `end_time = now`.
    ///
    /// Returns `true` only on the transition, so the caller can apply the
    /// parent entry's completion side effect exactly once. A no-op on an
    /// already-completed session.
    pub fn check(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed || self.is_paused {
            return false;
        }
        if self.effective_elapsed_seconds(now) >= i64::from(self.duration_minutes) * 60 {
            self.completed = true;
            self.end_time = Some(now);
            true
        } else {
            false
        }
    }

    /// Marks the session completed at `now` regardless of elapsed time
    /// (used when the owning entry is finished early). Closes an open
    /// pause first so the completed-implies-not-paused invariant holds.
    pub fn force_complete(&mut self, now: DateTime<Utc>) {
        if self.completed {
            return;
        }
        if self.is_paused {
            let pause_started = self.pause_started_at.take().unwrap_or(now);
            self.total_pause_seconds += (now - pause_started).num_seconds();
            self.is_paused = false;
        }
        self.completed = true;
        self.end_time = Some(now);
    }
}

/// Validates the chosen revision-session length.
pub fn validate_revision_duration(minutes: u32) -> Result<(), DomainError> {
    if REVISION_SESSION_MINUTES.contains(&minutes) {
        Ok(())
    } else {
        Err(DomainError::InvalidDuration(minutes))
    }
}

/// Gate for starting a new ziyadah session, applied after the entry's open
/// session (if any) has been run through [`StudySession::check`].
///
/// A session that is genuinely in progress (not completed, not paused)
/// blocks; a paused one does not. The daily cap counts sessions completed
/// for the entry within the current local day.
pub fn ensure_ziyadah_slot(
    open: Option<&StudySession>,
    completed_today: u32,
) -> Result<(), DomainError> {
    if let Some(session) = open {
        if !session.completed && !session.is_paused {
            return Err(DomainError::SessionInProgress);
        }
    }
    if completed_today >= MAX_DAILY_ZIYADAH_SESSIONS {
        return Err(DomainError::SessionLimitExceeded(
            MAX_DAILY_ZIYADAH_SESSIONS,
        ));
    }
    Ok(())
}

/// Gate for starting a per-entry revision session: the parent entry must be
/// finished and the lifetime cap not yet reached.
pub fn ensure_revision_slot(parent_completed: bool, existing: u32) -> Result<(), DomainError> {
    if !parent_completed {
        return Err(DomainError::PrematureRevision);
    }
    if existing >= MAX_REVISION_SESSIONS {
        return Err(DomainError::SessionLimitExceeded(MAX_REVISION_SESSIONS));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn session(duration_minutes: u32) -> StudySession {
        StudySession::start(
            Uuid::new_v4(),
            SessionKind::Ziyadah,
            Some(Uuid::new_v4()),
            duration_minutes,
            t0(),
        )
    }

    #[test]
    fn completes_exactly_at_the_planned_duration() {
        let mut s = session(25);
        assert!(!s.check(t0() + Duration::minutes(24)));
        assert!(!s.completed);

        let due = t0() + Duration::minutes(25);
        assert!(s.check(due));
        assert!(s.completed);
        assert_eq!(s.end_time, Some(due));

        // Re-checking is a no-op and does not move end_time.
        assert!(!s.check(due + Duration::minutes(5)));
        assert_eq!(s.end_time, Some(due));
    }

    #[test]
    fn pausing_shifts_the_completion_deadline() {
        let mut s = session(25);
        s.toggle_pause(t0() + Duration::minutes(10)).unwrap();
        s.toggle_pause(t0() + Duration::minutes(15)).unwrap();
        assert_eq!(s.total_pause_seconds, 5 * 60);

        // Due at T0+30 after a 5-minute pause.
        assert!(!s.check(t0() + Duration::minutes(27)));
        assert!(s.check(t0() + Duration::minutes(30)));
    }

    #[test]
    fn an_open_pause_blocks_completion_and_counts_toward_pause_time() {
        let mut s = session(25);
        s.toggle_pause(t0() + Duration::minutes(10)).unwrap();

        // Paused sessions never complete, no matter how late the check.
        assert!(!s.check(t0() + Duration::hours(3)));
        assert!(!s.completed);

        // The open pause window is excluded from effective elapsed time.
        assert_eq!(
            s.effective_elapsed_seconds(t0() + Duration::minutes(40)),
            10 * 60
        );
    }

    #[test]
    fn pause_toggle_fails_once_completed() {
        let mut s = session(25);
        assert!(s.check(t0() + Duration::minutes(25)));
        assert!(matches!(
            s.toggle_pause(t0() + Duration::minutes(26)),
            Err(DomainError::SessionCompleted)
        ));
    }

    #[test]
    fn force_complete_closes_an_open_pause() {
        let mut s = session(25);
        s.toggle_pause(t0() + Duration::minutes(5)).unwrap();
        s.force_complete(t0() + Duration::minutes(8));
        assert!(s.completed);
        assert!(!s.is_paused);
        assert_eq!(s.total_pause_seconds, 3 * 60);
    }

    #[test]
    fn series_rejects_a_running_blocker_but_not_a_paused_one() {
        let mut running = session(25);
        assert!(matches!(
            ensure_ziyadah_slot(Some(&running), 0),
            Err(DomainError::SessionInProgress)
        ));

        running.toggle_pause(t0() + Duration::minutes(1)).unwrap();
        assert!(ensure_ziyadah_slot(Some(&running), 0).is_ok());
    }

    #[test]
    fn series_enforces_the_daily_cap() {
        assert!(ensure_ziyadah_slot(None, 3).is_ok());
        assert!(matches!(
            ensure_ziyadah_slot(None, 4),
            Err(DomainError::SessionLimitExceeded(4))
        ));
    }

    #[test]
    fn revision_requires_a_finished_parent_and_honors_the_lifetime_cap() {
        assert!(matches!(
            ensure_revision_slot(false, 0),
            Err(DomainError::PrematureRevision)
        ));
        assert!(ensure_revision_slot(true, 4).is_ok());
        assert!(matches!(
            ensure_revision_slot(true, 5),
            Err(DomainError::SessionLimitExceeded(5))
        ));
    }

    #[test]
    fn revision_durations_are_a_fixed_menu() {
        for m in REVISION_SESSION_MINUTES {
            assert!(validate_revision_duration(m).is_ok());
        }
        assert!(matches!(
            validate_revision_duration(30),
            Err(DomainError::InvalidDuration(30))
        ));
    }
}
