use crate::domain::{
    ChannelProber, ContainerRuntime, EventSink, LaunchSpec, ProbeResult, UnitStatus,
};
use anyhow::{Result, bail};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MockContainer {
    pub running: bool,
    pub image: String,
    pub prefix: String,
}

/// In-memory stand-in for the podman runtime. Records every call in
/// order; failures can be scripted per operation (`"stop"`) or per
/// operation and target (`"run:gp_ioc"`).
pub struct MockRuntime {
    containers: RwLock<HashMap<String, MockContainer>>,
    missing_images: RwLock<HashSet<String>>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<HashSet<String>>,
    available: RwLock<bool>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            missing_images: RwLock::new(HashSet::new()),
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(HashSet::new()),
            available: RwLock::new(true),
        }
    }

    pub fn add_container(&self, name: &str, running: bool) {
        self.containers.write().unwrap().insert(
            name.to_string(),
            MockContainer {
                running,
                image: String::new(),
                prefix: String::new(),
            },
        );
    }

    pub fn set_fail_on(&self, operation: &str) {
        self.fail_on.write().unwrap().insert(operation.to_string());
    }

    pub fn set_unavailable(&self) {
        *self.available.write().unwrap() = false;
    }

    pub fn set_image_missing(&self, image: &str) {
        self.missing_images
            .write()
            .unwrap()
            .insert(image.to_string());
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn container_exists(&self, name: &str) -> bool {
        self.containers.read().unwrap().contains_key(name)
    }

    pub fn get_running(&self, name: &str) -> bool {
        self.containers
            .read()
            .unwrap()
            .get(name)
            .map(|c| c.running)
            .unwrap_or(false)
    }

    pub fn get_container(&self, name: &str) -> Option<MockContainer> {
        self.containers.read().unwrap().get(name).cloned()
    }

    pub fn running_count(&self) -> usize {
        self.containers
            .read()
            .unwrap()
            .values()
            .filter(|c| c.running)
            .count()
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str, target: &str) -> Result<()> {
        let fail_on = self.fail_on.read().unwrap();
        if fail_on.contains(operation) || fail_on.contains(&format!("{operation}:{target}")) {
            bail!("mock failure on: {operation}:{target}");
        }
        Ok(())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for MockRuntime {
    fn is_available(&self) -> bool {
        *self.available.read().unwrap()
    }

    fn exists(&self, name: &str) -> Result<bool> {
        self.record_command(&format!("exists:{}", name));
        self.check_fail("exists", name)?;

        Ok(self.containers.read().unwrap().contains_key(name))
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        self.record_command(&format!("is_running:{}", name));
        self.check_fail("is_running", name)?;

        Ok(self.get_running(name))
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.record_command(&format!("stop:{}", name));
        self.check_fail("stop", name)?;

        if let Some(container) = self.containers.write().unwrap().get_mut(name) {
            container.running = false;
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.record_command(&format!("remove:{}", name));
        self.check_fail("remove", name)?;

        self.containers.write().unwrap().remove(name);
        Ok(())
    }

    fn image_present(&self, image: &str) -> Result<bool> {
        self.record_command(&format!("image_present:{}", image));
        self.check_fail("image_present", image)?;

        Ok(!self.missing_images.read().unwrap().contains(image))
    }

    fn pull(&self, image: &str) -> Result<()> {
        self.record_command(&format!("pull:{}", image));
        self.check_fail("pull", image)?;

        self.missing_images.write().unwrap().remove(image);
        Ok(())
    }

    fn run_detached(&self, spec: &LaunchSpec) -> Result<()> {
        self.record_command(&format!("run:{}", spec.name));
        self.check_fail("run", spec.name)?;

        self.containers.write().unwrap().insert(
            spec.name.to_string(),
            MockContainer {
                running: true,
                image: spec.image.to_string(),
                prefix: spec.prefix.to_string(),
            },
        );
        Ok(())
    }
}

/// Scripted prober: a default verdict plus per-PV overrides, with every
/// probed PV recorded.
pub struct MockProber {
    default: RwLock<ProbeResult>,
    results: RwLock<HashMap<String, ProbeResult>>,
    probes: RwLock<Vec<String>>,
}

impl MockProber {
    pub fn new() -> Self {
        Self {
            default: RwLock::new(ProbeResult::Confirmed),
            results: RwLock::new(HashMap::new()),
            probes: RwLock::new(Vec::new()),
        }
    }

    pub fn set_default(&self, result: ProbeResult) {
        *self.default.write().unwrap() = result;
    }

    pub fn set_result(&self, pv: &str, result: ProbeResult) {
        self.results.write().unwrap().insert(pv.to_string(), result);
    }

    pub fn probed_pvs(&self) -> Vec<String> {
        self.probes.read().unwrap().clone()
    }
}

impl Default for MockProber {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelProber for MockProber {
    fn is_available(&self) -> bool {
        *self.default.read().unwrap() != ProbeResult::Unavailable
    }

    fn probe(&self, pv: &str, _timeout: Duration) -> ProbeResult {
        self.probes.write().unwrap().push(pv.to_string());

        self.results
            .read()
            .unwrap()
            .get(pv)
            .copied()
            .unwrap_or(*self.default.read().unwrap())
    }
}

/// Sink that keeps the streamed statuses for assertions.
pub struct RecordingSink {
    pub statuses: Vec<UnitStatus>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            statuses: Vec::new(),
        }
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn unit_status(&mut self, status: &UnitStatus) {
        self.statuses.push(status.clone());
    }
}
