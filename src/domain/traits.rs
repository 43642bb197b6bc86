use super::{LaunchSpec, UnitStatus};
use anyhow::Result;
use std::time::Duration;

/// Verdict of one best-effort connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Round trip completed within the deadline.
    Confirmed,
    /// No Channel Access client on this host. Not evidence the IOC is
    /// broken, so reported separately from a failed probe.
    Unavailable,
    /// Client present but no round trip before the deadline; the IOC may
    /// simply still be initializing.
    TimedOut,
}

/// Trait for container runtime operations
pub trait ContainerRuntime: Send + Sync {
    /// Whether the runtime itself is usable on this host.
    fn is_available(&self) -> bool;

    /// Whether a container with this name exists, running or exited.
    fn exists(&self, name: &str) -> Result<bool>;

    /// Whether a container with this name is currently running.
    fn is_running(&self, name: &str) -> Result<bool>;

    /// Stop a running container.
    fn stop(&self, name: &str) -> Result<()>;

    /// Remove a registered container instance.
    fn remove(&self, name: &str) -> Result<()>;

    /// Whether the image is present locally.
    fn image_present(&self, image: &str) -> Result<bool>;

    /// Fetch an image.
    fn pull(&self, image: &str) -> Result<()>;

    /// Launch a container detached, auto-removing on exit.
    fn run_detached(&self, spec: &LaunchSpec) -> Result<()>;
}

/// Trait for the post-start connectivity check. The probe is advisory:
/// every verdict is non-fatal to the pass that requested it.
pub trait ChannelProber: Send + Sync {
    fn is_available(&self) -> bool;

    /// Attempt one round trip against `pv`, bounded by `timeout`.
    fn probe(&self, pv: &str, timeout: Duration) -> ProbeResult;
}

/// Receives per-unit results as the pass produces them, so an operator
/// watching interactively sees progress before the summary.
pub trait EventSink {
    fn unit_status(&mut self, status: &UnitStatus);
}
