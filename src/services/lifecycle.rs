use crate::domain::{
    ChannelProber, ContainerRuntime, DesiredState, EventSink, IocUnit, LaunchSpec, Mode,
    ProbeResult, Registry, RunSummary, Settings, UnitOutcome, UnitStatus,
};
use anyhow::{Result, bail};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Sequences cleanup, launch, settle, and verification for every unit in
/// the registry, one unit at a time. Runtime commands share the host
/// network namespace, so there is never more than one in flight.
///
/// If the supervising process itself is interrupted mid-unit, whatever
/// was already started stays in that state; there is no rollback. Run
/// `stop-all` to get back to a clean slate.
pub struct LifecycleController {
    runtime: Arc<dyn ContainerRuntime>,
    prober: Arc<dyn ChannelProber>,
    settings: Settings,
}

impl LifecycleController {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        prober: Arc<dyn ChannelProber>,
        settings: Settings,
    ) -> Self {
        Self {
            runtime,
            prober,
            settings,
        }
    }

    /// One orchestration pass over the whole registry. A unit failure is
    /// recorded and the pass moves on; only a missing container runtime
    /// aborts the run before any unit is touched.
    pub fn run_all(
        &self,
        registry: &Registry,
        mode: Mode,
        sink: &mut dyn EventSink,
    ) -> Result<RunSummary> {
        if !self.runtime.is_available() {
            bail!("podman is not available on this host; install podman or add it to PATH");
        }

        info!("{} pass over {} unit(s)", mode, registry.units().len());

        let mut statuses = Vec::with_capacity(registry.units().len());

        for unit in registry.units() {
            let status = match mode {
                Mode::Stop => self.stop_unit(unit),
                Mode::Start => match unit.desired {
                    DesiredState::Running => self.start_unit(unit),
                    DesiredState::Stopped => self.stop_unit(unit),
                },
            };

            sink.unit_status(&status);
            statuses.push(status);
        }

        Ok(RunSummary::summarize(mode, statuses))
    }

    /// Stops and removes any instance of the unit, running or exited.
    /// Idempotent: a second call on the same unit reports `already-absent`.
    pub fn ensure_stopped(&self, unit: &IocUnit) -> Result<UnitOutcome> {
        let mut acted = false;

        if self.runtime.is_running(&unit.name)? {
            info!("stopping {}", unit.name);
            self.runtime.stop(&unit.name)?;
            acted = true;
        }

        if self.runtime.exists(&unit.name)? {
            debug!("removing registered instance of {}", unit.name);
            self.runtime.remove(&unit.name)?;
            acted = true;
        }

        Ok(if acted {
            UnitOutcome::StoppedOk
        } else {
            UnitOutcome::AlreadyAbsent
        })
    }

    /// Launches the unit detached and returns as soon as the runtime
    /// accepts it; readiness is the prober's concern, not ours.
    pub fn ensure_started(&self, unit: &IocUnit) -> Result<()> {
        let image = &self.settings.image;

        if !self.runtime.image_present(image)? {
            info!("image {image} not present locally, pulling");
            if let Err(e) = self.runtime.pull(image) {
                bail!("image {image} is not available locally and could not be pulled: {e:#}");
            }
        }

        let spec = LaunchSpec {
            name: &unit.name,
            image,
            prefix: &unit.prefix,
            command: unit.kind.command(),
        };

        info!("launching {} ({})", unit.name, spec.command);
        self.runtime.run_detached(&spec)
    }

    /// Best-effort connectivity check against the unit kind's canonical PV.
    pub fn verify(&self, unit: &IocUnit) -> ProbeResult {
        let pv = unit.probe_pv();
        let result = self.prober.probe(&pv, self.settings.probe_timeout);

        match result {
            ProbeResult::Confirmed => info!("{} answered on {pv}", unit.name),
            ProbeResult::Unavailable => {
                debug!("no probe client, skipping verification of {}", unit.name)
            }
            ProbeResult::TimedOut => warn!(
                "{pv} did not answer within {:?}; {} may still be initializing",
                self.settings.probe_timeout, unit.name
            ),
        }

        result
    }

    fn start_unit(&self, unit: &IocUnit) -> UnitStatus {
        // Stale instances from a previous pass hold the container name and
        // the host-network ports, so they go first.
        if let Err(e) = self.ensure_stopped(unit) {
            warn!("could not clear stale instance of {}: {e:#}", unit.name);
            return UnitStatus::with_detail(
                &unit.name,
                UnitOutcome::StartFailed,
                format!("could not clear stale instance: {e:#}"),
            );
        }

        if let Err(e) = self.ensure_started(unit) {
            return UnitStatus::with_detail(&unit.name, UnitOutcome::StartFailed, format!("{e:#}"));
        }

        if !self.settings.settle.is_zero() {
            debug!(
                "waiting {:?} for {} to initialize",
                self.settings.settle, unit.name
            );
            thread::sleep(self.settings.settle);
        }

        match self.verify(unit) {
            ProbeResult::Confirmed => UnitStatus::new(&unit.name, UnitOutcome::StartedOk),
            ProbeResult::Unavailable => UnitStatus::with_detail(
                &unit.name,
                UnitOutcome::StartedUnverified,
                "no Channel Access client on this host",
            ),
            ProbeResult::TimedOut => UnitStatus::with_detail(
                &unit.name,
                UnitOutcome::StartedUnverified,
                format!(
                    "{} did not answer within {:?}",
                    unit.probe_pv(),
                    self.settings.probe_timeout
                ),
            ),
        }
    }

    fn stop_unit(&self, unit: &IocUnit) -> UnitStatus {
        match self.ensure_stopped(unit) {
            Ok(outcome) => UnitStatus::new(&unit.name, outcome),
            Err(e) => {
                warn!("failed to stop {}: {e:#}", unit.name);
                UnitStatus::with_detail(&unit.name, UnitOutcome::StopFailed, format!("{e:#}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IocKind, IocUnit};
    use crate::test_support::{MockProber, MockRuntime, RecordingSink};
    use std::time::Duration;

    fn test_settings() -> Settings {
        Settings {
            settle: Duration::ZERO,
            probe_timeout: Duration::from_millis(10),
            ..Settings::default()
        }
    }

    fn create_test_controller() -> (LifecycleController, Arc<MockRuntime>, Arc<MockProber>) {
        let runtime = Arc::new(MockRuntime::new());
        let prober = Arc::new(MockProber::new());
        let controller =
            LifecycleController::new(runtime.clone(), prober.clone(), test_settings());
        (controller, runtime, prober)
    }

    fn gp_unit() -> IocUnit {
        IocUnit::new("gp_ioc", IocKind::Gp, "gp:")
    }

    #[test]
    fn ensure_stopped_on_running_unit() {
        let (controller, runtime, _) = create_test_controller();
        runtime.add_container("gp_ioc", true);

        let outcome = controller.ensure_stopped(&gp_unit()).unwrap();

        assert_eq!(outcome, UnitOutcome::StoppedOk);
        assert!(!runtime.container_exists("gp_ioc"));
        let commands = runtime.get_commands();
        assert!(commands.contains(&"stop:gp_ioc".to_string()));
        assert!(commands.contains(&"remove:gp_ioc".to_string()));
    }

    #[test]
    fn ensure_stopped_removes_exited_instance() {
        let (controller, runtime, _) = create_test_controller();
        runtime.add_container("gp_ioc", false);

        let outcome = controller.ensure_stopped(&gp_unit()).unwrap();

        assert_eq!(outcome, UnitOutcome::StoppedOk);
        let commands = runtime.get_commands();
        assert!(!commands.contains(&"stop:gp_ioc".to_string()));
        assert!(commands.contains(&"remove:gp_ioc".to_string()));
    }

    #[test]
    fn ensure_stopped_twice_reports_already_absent() {
        let (controller, runtime, _) = create_test_controller();
        runtime.add_container("gp_ioc", true);

        let first = controller.ensure_stopped(&gp_unit()).unwrap();
        let second = controller.ensure_stopped(&gp_unit()).unwrap();

        assert_eq!(first, UnitOutcome::StoppedOk);
        assert_eq!(second, UnitOutcome::AlreadyAbsent);
    }

    #[test]
    fn ensure_started_pulls_missing_image() {
        let (controller, runtime, _) = create_test_controller();
        runtime.set_image_missing(crate::domain::DEFAULT_IMAGE);

        controller.ensure_started(&gp_unit()).unwrap();

        let commands = runtime.get_commands();
        assert!(
            commands
                .iter()
                .any(|c| c.starts_with("pull:"))
        );
        assert!(commands.contains(&"run:gp_ioc".to_string()));
        assert!(runtime.get_running("gp_ioc"));
    }

    #[test]
    fn ensure_started_reports_unpullable_image() {
        let (controller, runtime, _) = create_test_controller();
        runtime.set_image_missing(crate::domain::DEFAULT_IMAGE);
        runtime.set_fail_on("pull");

        let err = controller.ensure_started(&gp_unit()).unwrap_err();

        assert!(err.to_string().contains("could not be pulled"));
        assert!(!runtime.get_commands().contains(&"run:gp_ioc".to_string()));
    }

    #[test]
    fn verify_maps_probe_results() {
        let (controller, _, prober) = create_test_controller();
        let unit = gp_unit();

        prober.set_default(ProbeResult::Confirmed);
        assert_eq!(controller.verify(&unit), ProbeResult::Confirmed);

        prober.set_default(ProbeResult::TimedOut);
        assert_eq!(controller.verify(&unit), ProbeResult::TimedOut);

        assert!(prober.probed_pvs().iter().all(|pv| pv == "gp:m1.DESC"));
    }

    #[test]
    fn run_all_requires_the_runtime() {
        let (controller, runtime, _) = create_test_controller();
        runtime.set_unavailable();
        let mut sink = RecordingSink::new();

        let result = controller.run_all(&Registry::demo(), Mode::Start, &mut sink);

        assert!(result.is_err());
        assert!(runtime.get_commands().is_empty());
        assert!(sink.statuses.is_empty());
    }

    #[test]
    fn start_pass_skips_units_desired_stopped() {
        let (controller, runtime, _) = create_test_controller();
        let mut parked = IocUnit::new("adsim_ioc", IocKind::Adsim, "adsim:");
        parked.desired = DesiredState::Stopped;
        let registry = Registry::new(vec![parked, gp_unit()]).unwrap();
        let mut sink = RecordingSink::new();

        let summary = controller.run_all(&registry, Mode::Start, &mut sink).unwrap();

        assert!(summary.ok);
        assert_eq!(summary.statuses[0].outcome, UnitOutcome::AlreadyAbsent);
        assert_eq!(summary.statuses[1].outcome, UnitOutcome::StartedOk);
        assert!(!runtime.get_commands().contains(&"run:adsim_ioc".to_string()));
    }

    #[test]
    fn events_stream_in_registry_order() {
        let (controller, _, _) = create_test_controller();
        let mut sink = RecordingSink::new();

        controller
            .run_all(&Registry::demo(), Mode::Start, &mut sink)
            .unwrap();

        let seen: Vec<&str> = sink.statuses.iter().map(|s| s.unit.as_str()).collect();
        assert_eq!(seen, vec!["adsim_ioc", "gp_ioc"]);
    }
}
