//! Prediction session state machine
//!
//! A session progresses COLLECTING_DATA → ANALYZING → COMPLETED → LOCKED.
//! FAILED is reachable from COLLECTING_DATA and ANALYZING. LOCKED and FAILED
//! are terminal.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Default collection window length in days
pub const DEFAULT_WINDOW_DAYS: u32 = 16;

/// Session workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created; waiting for analysis
    CollectingData,
    /// Adapters and combiner running
    Analyzing,
    /// Prediction persisted
    Completed,
    /// Published and frozen
    Locked,
    /// Run aborted; kept for inspection
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::CollectingData => "collecting_data",
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Completed => "completed",
            SessionStatus::Locked => "locked",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Locked | SessionStatus::Failed)
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (CollectingData, Analyzing)
                | (CollectingData, Failed)
                | (Analyzing, Completed)
                | (Analyzing, Failed)
                | (Completed, Locked)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = lucky_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collecting_data" => Ok(SessionStatus::CollectingData),
            "analyzing" => Ok(SessionStatus::Analyzing),
            "completed" => Ok(SessionStatus::Completed),
            "locked" => Ok(SessionStatus::Locked),
            "failed" => Ok(SessionStatus::Failed),
            other => Err(lucky_common::Error::InvalidInput(format!(
                "Unknown session status: {}",
                other
            ))),
        }
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid session transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

/// Status transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub session_id: Uuid,
    pub old_status: SessionStatus,
    pub new_status: SessionStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// Inclusive date range of records analyzed for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CollectionWindow {
    /// `[draw_date - days, draw_date - 1 day]`
    pub fn for_draw_date(draw_date: NaiveDate, days: u32) -> Self {
        let days = days.max(1);
        Self {
            start: draw_date - Duration::days(i64::from(days)),
            end: draw_date - Duration::days(1),
        }
    }
}

/// One end-to-end prediction run for a target draw date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSession {
    pub id: Uuid,
    pub for_draw_date: NaiveDate,
    pub collection_window: CollectionWindow,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    /// Analysis start
    pub start_time: Option<DateTime<Utc>>,
    /// Completion or failure time
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between start and end
    pub processing_time: Option<f64>,
    pub total_data_points: usize,
    pub failure_reason: Option<String>,
}

impl PredictionSession {
    pub fn new(for_draw_date: NaiveDate, window_days: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            for_draw_date,
            collection_window: CollectionWindow::for_draw_date(for_draw_date, window_days),
            status: SessionStatus::CollectingData,
            created_at: Utc::now(),
            start_time: None,
            end_time: None,
            processing_time: None,
            total_data_points: 0,
            failure_reason: None,
        }
    }

    /// Move to `new_status` if the state machine allows it
    pub fn transition_to(&mut self, new_status: SessionStatus) -> Result<StatusTransition, TransitionError> {
        if !self.status.can_transition_to(new_status) {
            return Err(TransitionError {
                from: self.status,
                to: new_status,
            });
        }

        let transition = StatusTransition {
            session_id: self.id,
            old_status: self.status,
            new_status,
            transitioned_at: Utc::now(),
        };
        self.status = new_status;

        match new_status {
            SessionStatus::Analyzing => {
                self.start_time = Some(transition.transitioned_at);
            }
            SessionStatus::Completed | SessionStatus::Failed => {
                self.finish_at(transition.transitioned_at);
            }
            _ => {}
        }

        Ok(transition)
    }

    /// Record completion statistics and move to COMPLETED
    pub fn complete(&mut self, total_data_points: usize) -> Result<StatusTransition, TransitionError> {
        let transition = self.transition_to(SessionStatus::Completed)?;
        self.total_data_points = total_data_points;
        Ok(transition)
    }

    /// Record the failure reason and move to FAILED
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<StatusTransition, TransitionError> {
        let transition = self.transition_to(SessionStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(transition)
    }

    fn finish_at(&mut self, end: DateTime<Utc>) {
        self.end_time = Some(end);
        if let Some(start) = self.start_time {
            let elapsed = (end - start).num_microseconds().unwrap_or(0).max(0);
            self.processing_time = Some(elapsed as f64 / 1_000_000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_collection_window() {
        let window = CollectionWindow::for_draw_date(date(2024, 3, 16), DEFAULT_WINDOW_DAYS);
        assert_eq!(window.start, date(2024, 2, 29));
        assert_eq!(window.end, date(2024, 3, 15));
    }

    #[test]
    fn test_new_session_is_collecting() {
        let session = PredictionSession::new(date(2024, 3, 16), DEFAULT_WINDOW_DAYS);
        assert_eq!(session.status, SessionStatus::CollectingData);
        assert!(session.start_time.is_none());
        assert!(session.processing_time.is_none());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut session = PredictionSession::new(date(2024, 3, 16), DEFAULT_WINDOW_DAYS);

        session.transition_to(SessionStatus::Analyzing).unwrap();
        assert!(session.start_time.is_some());

        session.complete(42).unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.total_data_points, 42);
        assert!(session.end_time.is_some());
        assert!(session.processing_time.unwrap() >= 0.0);

        let transition = session.transition_to(SessionStatus::Locked).unwrap();
        assert_eq!(transition.old_status, SessionStatus::Completed);
        assert!(session.status.is_terminal());
    }

    #[test]
    fn test_status_never_moves_backwards() {
        let mut session = PredictionSession::new(date(2024, 3, 16), DEFAULT_WINDOW_DAYS);
        session.transition_to(SessionStatus::Analyzing).unwrap();
        session.complete(0).unwrap();

        let err = session.transition_to(SessionStatus::Analyzing).unwrap_err();
        assert_eq!(err.from, SessionStatus::Completed);
        assert_eq!(err.to, SessionStatus::Analyzing);

        // Completed sessions cannot fail
        assert!(session.fail("late").is_err());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut session = PredictionSession::new(date(2024, 3, 16), DEFAULT_WINDOW_DAYS);
        session.fail("record source offline").unwrap();

        assert_eq!(session.failure_reason.as_deref(), Some("record source offline"));
        assert!(session.status.is_terminal());
        assert!(session.transition_to(SessionStatus::Analyzing).is_err());
        assert!(session.transition_to(SessionStatus::Locked).is_err());
    }

    #[test]
    fn test_status_names_parse() {
        for status in [
            SessionStatus::CollectingData,
            SessionStatus::Analyzing,
            SessionStatus::Completed,
            SessionStatus::Locked,
            SessionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
    }
}
