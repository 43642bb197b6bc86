use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Start,
    Stop,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Start => write!(f, "start"),
            Mode::Stop => write!(f, "stop"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    StartedOk,
    /// Launched fine but the connectivity probe could not confirm it
    /// (client absent or no round trip before the deadline).
    StartedUnverified,
    StartFailed,
    AlreadyAbsent,
    StoppedOk,
    StopFailed,
}

impl UnitOutcome {
    pub fn tag(&self) -> &'static str {
        match self {
            UnitOutcome::StartedOk => "started-ok",
            UnitOutcome::StartedUnverified => "started-unverified",
            UnitOutcome::StartFailed => "start-failed",
            UnitOutcome::AlreadyAbsent => "already-absent",
            UnitOutcome::StoppedOk => "stopped-ok",
            UnitOutcome::StopFailed => "stop-failed",
        }
    }

    /// Only explicit start/stop failures count against the run; probe
    /// verdicts never do.
    pub fn is_failure(&self) -> bool {
        matches!(self, UnitOutcome::StartFailed | UnitOutcome::StopFailed)
    }
}

impl fmt::Display for UnitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Per-unit result of one orchestration pass. Never persisted.
#[derive(Debug, Clone)]
pub struct UnitStatus {
    pub unit: String,
    pub outcome: UnitOutcome,
    pub detail: Option<String>,
}

impl UnitStatus {
    pub fn new(unit: &str, outcome: UnitOutcome) -> Self {
        Self {
            unit: unit.to_string(),
            outcome,
            detail: None,
        }
    }

    pub fn with_detail(unit: &str, outcome: UnitOutcome, detail: impl Into<String>) -> Self {
        Self {
            unit: unit.to_string(),
            outcome,
            detail: Some(detail.into()),
        }
    }
}

/// Aggregate of one `start-all` or `stop-all` invocation.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub mode: Mode,
    pub statuses: Vec<UnitStatus>,
    pub ok: bool,
}

impl RunSummary {
    pub fn summarize(mode: Mode, statuses: Vec<UnitStatus>) -> Self {
        let ok = statuses.iter().all(|s| !s.outcome.is_failure());
        Self { mode, statuses, ok }
    }

    pub fn failed_units(&self) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|s| s.outcome.is_failure())
            .map(|s| s.unit.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_ok_when_no_failures() {
        let summary = RunSummary::summarize(
            Mode::Start,
            vec![
                UnitStatus::new("adsim_ioc", UnitOutcome::StartedOk),
                UnitStatus::new("gp_ioc", UnitOutcome::StartedUnverified),
            ],
        );
        assert!(summary.ok);
        assert!(summary.failed_units().is_empty());
    }

    #[test]
    fn summary_fails_on_start_failure() {
        let summary = RunSummary::summarize(
            Mode::Start,
            vec![
                UnitStatus::new("adsim_ioc", UnitOutcome::StartedOk),
                UnitStatus::new("gp_ioc", UnitOutcome::StartFailed),
            ],
        );
        assert!(!summary.ok);
        assert_eq!(summary.failed_units(), vec!["gp_ioc"]);
    }

    #[test]
    fn absent_units_do_not_fail_a_stop_pass() {
        let summary = RunSummary::summarize(
            Mode::Stop,
            vec![
                UnitStatus::new("adsim_ioc", UnitOutcome::AlreadyAbsent),
                UnitStatus::new("gp_ioc", UnitOutcome::StoppedOk),
            ],
        );
        assert!(summary.ok);
    }

    #[test]
    fn outcome_tags_are_stable() {
        assert_eq!(UnitOutcome::StartedOk.tag(), "started-ok");
        assert_eq!(UnitOutcome::StartedUnverified.tag(), "started-unverified");
        assert_eq!(UnitOutcome::StartFailed.tag(), "start-failed");
        assert_eq!(UnitOutcome::AlreadyAbsent.tag(), "already-absent");
        assert_eq!(UnitOutcome::StoppedOk.tag(), "stopped-ok");
        assert_eq!(UnitOutcome::StopFailed.tag(), "stop-failed");
    }
}
