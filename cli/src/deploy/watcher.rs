//! Terminal-outcome tracking for one deployment
//!
//! The channel and the safety timer are independent event sources that can
//! legitimately both fire; the watcher is the single-use latch that lets
//! exactly one of them decide the outcome.

use crate::deploy::channel::ChannelEvent;

/// The one outcome produced per deploy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentOutcome {
    /// The sentinel reported a successful build.
    Success,

    /// The sentinel reported failure, or the upload itself was rejected.
    Failure,

    /// The channel closed before a sentinel arrived. The server-side
    /// deployment is presumed to continue; this is not a deploy failure.
    StreamDisconnected,

    /// No sentinel within the safety bound.
    StreamTimedOut,

    /// The channel never subscribed in time; the deploy was still triggered
    /// but runs unobserved.
    ChannelUnavailable,
}

impl DeploymentOutcome {
    /// Process exit status for this outcome. Only a failed deployment (or a
    /// rejected upload) is non-zero; losing sight of a running deployment
    /// is not an error.
    pub fn exit_code(&self) -> u8 {
        match self {
            DeploymentOutcome::Failure => 1,
            _ => 0,
        }
    }
}

/// Single-use latch over the streaming phase.
///
/// Consumes channel events and the safety-timer firing; yields at most one
/// outcome, ever. Ordinary lines are counted for the timeout banner but
/// never transition state.
#[derive(Debug, Default)]
pub struct StreamWatcher {
    outcome: Option<DeploymentOutcome>,
    lines: u64,
}

impl StreamWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ordinary log lines observed.
    pub fn lines_seen(&self) -> u64 {
        self.lines
    }

    /// Whether a terminal outcome has been reached.
    pub fn finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Feed one channel event. Returns the terminal outcome the first time
    /// a terminal event is seen, `None` for every event after that.
    pub fn on_event(&mut self, event: &ChannelEvent) -> Option<DeploymentOutcome> {
        if self.outcome.is_some() {
            return None;
        }

        match event {
            ChannelEvent::Ended { success: true } => self.latch(DeploymentOutcome::Success),
            ChannelEvent::Ended { success: false } => self.latch(DeploymentOutcome::Failure),
            ChannelEvent::Closed | ChannelEvent::Failed(_) => {
                self.latch(DeploymentOutcome::StreamDisconnected)
            }
            ChannelEvent::Line(_) => {
                self.lines += 1;
                None
            }
            ChannelEvent::Subscribed => None,
        }
    }

    /// The safety timer fired.
    pub fn on_timeout(&mut self) -> Option<DeploymentOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        self.latch(DeploymentOutcome::StreamTimedOut)
    }

    fn latch(&mut self, outcome: DeploymentOutcome) -> Option<DeploymentOutcome> {
        self.outcome = Some(outcome);
        Some(outcome)
    }
}

/// Best-effort display classification for a log line. Affects coloring
/// only; the control flow never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
    /// The final completion line; rendered bolder than ordinary successes.
    Milestone,
    Error,
    Warning,
    Progress,
    Success,
    Plain,
}

pub fn classify_line(line: &str) -> LogSeverity {
    if line.contains("Deployment Complete") {
        LogSeverity::Milestone
    } else if line.contains("Error")
        || line.contains("FAILURE")
        || line.contains("failed")
        || line.contains("FATAL")
    {
        LogSeverity::Error
    } else if line.contains("Warning") || line.contains("warning") {
        LogSeverity::Warning
    } else if line.contains("Starting")
        || line.contains("Creating")
        || line.contains("Pulling")
        || line.contains("Waiting")
    {
        LogSeverity::Progress
    } else if line.contains("ready")
        || line.contains("Complete")
        || line.contains("Success")
        || line.contains("successfully")
    {
        LogSeverity::Success
    } else {
        LogSeverity::Plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_sentinel() {
        let mut w = StreamWatcher::new();
        assert_eq!(
            w.on_event(&ChannelEvent::Ended { success: true }),
            Some(DeploymentOutcome::Success)
        );
        assert!(w.finished());
    }

    #[test]
    fn test_failure_sentinel() {
        let mut w = StreamWatcher::new();
        assert_eq!(
            w.on_event(&ChannelEvent::Ended { success: false }),
            Some(DeploymentOutcome::Failure)
        );
    }

    #[test]
    fn test_lines_never_transition() {
        let mut w = StreamWatcher::new();
        for _ in 0..3 {
            assert_eq!(w.on_event(&ChannelEvent::Line("building".into())), None);
        }
        assert_eq!(w.lines_seen(), 3);
        assert!(!w.finished());
    }

    #[test]
    fn test_close_is_disconnect_not_failure() {
        let mut w = StreamWatcher::new();
        let outcome = w.on_event(&ChannelEvent::Closed).unwrap();
        assert_eq!(outcome, DeploymentOutcome::StreamDisconnected);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_transport_error_is_disconnect() {
        let mut w = StreamWatcher::new();
        assert_eq!(
            w.on_event(&ChannelEvent::Failed("reset".into())),
            Some(DeploymentOutcome::StreamDisconnected)
        );
    }

    #[test]
    fn test_latch_fires_exactly_once() {
        // A close racing the safety timer must not double-finish.
        let mut w = StreamWatcher::new();
        assert!(w.on_event(&ChannelEvent::Closed).is_some());
        assert_eq!(w.on_timeout(), None);
        assert_eq!(w.on_event(&ChannelEvent::Ended { success: true }), None);
        assert_eq!(w.on_event(&ChannelEvent::Closed), None);
    }

    #[test]
    fn test_timer_first_then_events_ignored() {
        let mut w = StreamWatcher::new();
        assert_eq!(w.on_timeout(), Some(DeploymentOutcome::StreamTimedOut));
        assert_eq!(w.on_timeout(), None);
        assert_eq!(w.on_event(&ChannelEvent::Ended { success: false }), None);
    }

    #[test]
    fn test_lines_after_finish_not_counted() {
        let mut w = StreamWatcher::new();
        w.on_event(&ChannelEvent::Line("one".into()));
        w.on_event(&ChannelEvent::Closed);
        w.on_event(&ChannelEvent::Line("late".into()));
        assert_eq!(w.lines_seen(), 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DeploymentOutcome::Success.exit_code(), 0);
        assert_eq!(DeploymentOutcome::Failure.exit_code(), 1);
        assert_eq!(DeploymentOutcome::StreamDisconnected.exit_code(), 0);
        assert_eq!(DeploymentOutcome::StreamTimedOut.exit_code(), 0);
        assert_eq!(DeploymentOutcome::ChannelUnavailable.exit_code(), 0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify_line("Build failed: exit 1"), LogSeverity::Error);
        // The completion line outranks the generic "Complete" success match.
        assert_eq!(
            classify_line("Deployment Complete"),
            LogSeverity::Milestone
        );
        assert_eq!(classify_line("Stage Complete"), LogSeverity::Success);
        assert_eq!(classify_line("Warning: deprecated"), LogSeverity::Warning);
        assert_eq!(classify_line("Pulling image..."), LogSeverity::Progress);
        assert_eq!(classify_line("Container ready"), LogSeverity::Success);
        assert_eq!(classify_line("npm install"), LogSeverity::Plain);
    }
}
