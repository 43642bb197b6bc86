mod ioc;
mod status;
pub mod traits;

pub use ioc::{
    DEFAULT_IMAGE, DesiredState, IocKind, IocUnit, LaunchSpec, Registry, Settings,
};
pub use status::{Mode, RunSummary, UnitOutcome, UnitStatus};
pub use traits::{ChannelProber, ContainerRuntime, EventSink, ProbeResult};
