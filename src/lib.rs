pub mod cli;
pub mod domain;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
// In a real production crate, we might use a feature flag "test-utils"
pub mod test_support;

pub use domain::{
    ChannelProber, ContainerRuntime, EventSink, IocKind, IocUnit, LaunchSpec, Mode, ProbeResult,
    Registry, RunSummary, Settings, UnitOutcome, UnitStatus,
};
pub use infra::{CagetProber, PodmanAdapter};
pub use services::LifecycleController;
