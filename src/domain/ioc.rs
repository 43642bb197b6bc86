use anyhow::{Result, bail};
use serde::Deserialize;
use std::time::Duration;

/// Image shared by every demo IOC kind; the kind token selects the IOC
/// the container actually boots.
pub const DEFAULT_IMAGE: &str = "ghcr.io/bcda-aps/epics-podman:latest";

pub const DEFAULT_SETTLE_SECONDS: u64 = 5;
pub const DEFAULT_PROBE_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IocKind {
    /// Area-detector simulator (camera PVs under `<prefix>cam1:`).
    Adsim,
    /// General-purpose synApps IOC (motors, scalers, calcs).
    Gp,
}

impl IocKind {
    /// Command token passed to the container entrypoint.
    pub fn command(&self) -> &'static str {
        match self {
            IocKind::Adsim => "adsim",
            IocKind::Gp => "gp",
        }
    }

    /// Suffix of the PV every IOC of this kind is known to serve.
    pub fn probe_suffix(&self) -> &'static str {
        match self {
            IocKind::Adsim => "cam1:Acquire",
            IocKind::Gp => "m1.DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IocUnit {
    pub name: String,
    pub kind: IocKind,
    /// EPICS prefix bound into the container environment. Immutable once
    /// the registry is built.
    pub prefix: String,
    #[serde(default)]
    pub desired: DesiredState,
}

impl IocUnit {
    pub fn new(name: &str, kind: IocKind, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            prefix: prefix.to_string(),
            desired: DesiredState::Running,
        }
    }

    /// PV used for the post-start connectivity probe.
    pub fn probe_pv(&self) -> String {
        format!("{}{}", self.prefix, self.kind.probe_suffix())
    }
}

/// Ordered, read-only set of units to supervise. Order matters: a later
/// unit may reuse host-network state a stale earlier instance still holds.
#[derive(Debug, Clone)]
pub struct Registry {
    units: Vec<IocUnit>,
}

impl Registry {
    pub fn new(units: Vec<IocUnit>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();

        for unit in &units {
            validate_unit_name(&unit.name)?;

            if !seen.insert(unit.name.clone()) {
                bail!("duplicate IOC name '{}' in registry", unit.name);
            }

            if unit.prefix.is_empty() {
                bail!("IOC '{}' has an empty EPICS prefix", unit.name);
            }

            if !unit.prefix.ends_with(':') {
                bail!(
                    "EPICS prefix '{}' for IOC '{}' must end with ':'",
                    unit.prefix,
                    unit.name
                );
            }
        }

        Ok(Self { units })
    }

    /// The registry the tutorial ships with: the area-detector simulator
    /// first, then the general-purpose IOC.
    pub fn demo() -> Self {
        Self {
            units: vec![
                IocUnit::new("adsim_ioc", IocKind::Adsim, "adsim:"),
                IocUnit::new("gp_ioc", IocKind::Gp, "gp:"),
            ],
        }
    }

    pub fn units(&self) -> &[IocUnit] {
        &self.units
    }
}

fn validate_unit_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("empty IOC name in registry");
    }

    let first_char = match name.chars().next() {
        Some(c) => c,
        None => bail!("empty IOC name in registry"),
    };
    if !first_char.is_alphanumeric() {
        bail!("IOC name '{}' must start with a letter or digit", name);
    }

    for c in name.chars() {
        if !c.is_alphanumeric() && c != '_' && c != '.' && c != '-' {
            bail!("IOC name '{}' contains invalid character '{}'", name, c);
        }
    }

    Ok(())
}

/// Everything the launch command needs, borrowed from the unit and the
/// run settings.
#[derive(Debug, Clone)]
pub struct LaunchSpec<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub prefix: &'a str,
    pub command: &'a str,
}

/// Run-wide knobs with code-side defaults; the config file may override.
#[derive(Debug, Clone)]
pub struct Settings {
    pub image: String,
    /// Wait after a successful launch before probing, so the IOC's own
    /// startup has a chance to finish. Heuristic, not a guarantee.
    pub settle: Duration,
    pub probe_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            settle: Duration::from_secs(DEFAULT_SETTLE_SECONDS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECONDS),
        }
    }
}
