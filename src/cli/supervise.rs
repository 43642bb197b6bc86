use crate::domain::{
    ContainerRuntime, EventSink, Mode, Registry, RunSummary, Settings, UnitOutcome, UnitStatus,
};
use crate::infra::config;
use crate::infra::{CagetProber, PodmanAdapter};
use crate::services::LifecycleController;
use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// Wires the production adapters to the controller for one CLI invocation.
pub struct Supervisor {
    registry: Registry,
    controller: LifecycleController,
    runtime: Arc<dyn ContainerRuntime>,
}

impl Supervisor {
    pub fn new(config_dir: &Path) -> Result<Self> {
        let (registry, settings) = config::load(config_dir)?;
        Ok(Self::with_runtime(
            registry,
            settings,
            Arc::new(PodmanAdapter::new()),
        ))
    }

    fn with_runtime(
        registry: Registry,
        settings: Settings,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        let prober = CagetProber::detect();
        let controller = LifecycleController::new(runtime.clone(), prober, settings);
        Self {
            registry,
            controller,
            runtime,
        }
    }

    pub fn start_all(&self, sink: &mut dyn EventSink) -> Result<RunSummary> {
        self.controller.run_all(&self.registry, Mode::Start, sink)
    }

    pub fn stop_all(&self, sink: &mut dyn EventSink) -> Result<RunSummary> {
        self.controller.run_all(&self.registry, Mode::Stop, sink)
    }

    /// Read-only state report, one line per registry unit.
    pub fn status(&self) -> Result<()> {
        println!("📦 Demo IOC status:");

        for unit in self.registry.units() {
            let state = if self.runtime.is_running(&unit.name)? {
                "running"
            } else if self.runtime.exists(&unit.name)? {
                "stopped"
            } else {
                "absent"
            };

            println!("- {:<12} | {}", unit.name, state);
        }

        Ok(())
    }
}

/// Prints one line per unit as the pass proceeds.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn unit_status(&mut self, status: &UnitStatus) {
        let icon = match status.outcome {
            UnitOutcome::StartedOk | UnitOutcome::StoppedOk | UnitOutcome::AlreadyAbsent => "✅",
            UnitOutcome::StartedUnverified => "⚠️ ",
            UnitOutcome::StartFailed | UnitOutcome::StopFailed => "❌",
        };

        match &status.detail {
            Some(detail) => println!("{icon} {}: {} ({detail})", status.unit, status.outcome),
            None => println!("{icon} {}: {}", status.unit, status.outcome),
        }
    }
}

pub fn start_all(config_dir: &Path) -> Result<ExitCode> {
    let supervisor = Supervisor::new(config_dir)?;
    let summary = supervisor.start_all(&mut ConsoleSink)?;

    if summary.ok {
        println!(
            "🎉 all demo IOCs are up ({} unit(s)); run stop-all when you are done",
            summary.statuses.len()
        );
    } else {
        println!(
            "❌ {} of {} unit(s) failed to start: {}",
            summary.failed_units().len(),
            summary.statuses.len(),
            summary.failed_units().join(", ")
        );
    }

    Ok(exit_code(&summary))
}

pub fn stop_all(config_dir: &Path) -> Result<ExitCode> {
    let supervisor = Supervisor::new(config_dir)?;
    let summary = supervisor.stop_all(&mut ConsoleSink)?;

    if summary.ok {
        println!("✅ all demo IOCs stopped");
    } else {
        println!(
            "❌ {} of {} unit(s) failed to stop: {}",
            summary.failed_units().len(),
            summary.statuses.len(),
            summary.failed_units().join(", ")
        );
    }

    Ok(exit_code(&summary))
}

pub fn status(config_dir: &Path) -> Result<ExitCode> {
    let supervisor = Supervisor::new(config_dir)?;
    supervisor.status()?;
    Ok(ExitCode::SUCCESS)
}

fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
