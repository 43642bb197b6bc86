use crate::domain::{IocUnit, Registry, Settings};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "iocsim.toml";

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../../config/default_iocsim.toml");

pub fn default_config_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/root"))
        .join(".config/iocsim")
}

/// Expands a leading `~` so the flag and the env var both accept
/// home-relative paths.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy().into_owned();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

pub fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    fs::create_dir_all(config_dir).with_context(|| format!("creating {:?}", config_dir))
}

/// Writes the commented default config, never overwriting an existing one.
pub fn install_default_config(config_dir: &Path) -> Result<()> {
    ensure_config_dir(config_dir)?;

    let target = config_dir.join(CONFIG_FILE_NAME);
    if target.exists() {
        return Ok(());
    }

    fs::write(&target, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("writing template to {:?}", target))
}

/// On-disk shape of `iocsim.toml`. `[[ioc]]` tables are ordered, which is
/// why the registry is an array rather than a name-keyed map.
#[derive(Deserialize, Debug, Default)]
struct FileConfig {
    image: Option<String>,
    settle_seconds: Option<u64>,
    probe_timeout_seconds: Option<u64>,
    #[serde(default, rename = "ioc")]
    iocs: Vec<IocUnit>,
}

/// Loads registry and settings from `<config_dir>/iocsim.toml`, falling
/// back to the built-in demo registry and defaults when the file (or an
/// individual field) is absent.
pub fn load(config_dir: &Path) -> Result<(Registry, Settings)> {
    let path = config_dir.join(CONFIG_FILE_NAME);

    if !path.exists() {
        debug!("no config at {:?}, using built-in demo registry", path);
        return Ok((Registry::demo(), Settings::default()));
    }

    let content = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
    let file: FileConfig =
        toml::from_str(&content).with_context(|| format!("parsing {:?}", path))?;

    let registry = if file.iocs.is_empty() {
        Registry::demo()
    } else {
        Registry::new(file.iocs).with_context(|| format!("validating {:?}", path))?
    };

    let defaults = Settings::default();
    let settings = Settings {
        image: file.image.unwrap_or(defaults.image),
        settle: file
            .settle_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.settle),
        probe_timeout: file
            .probe_timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(defaults.probe_timeout),
    };

    Ok((registry, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DesiredState, IocKind};

    fn write_config(dir: &Path, content: &str) {
        fs::write(dir.join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn missing_config_falls_back_to_demo_registry() {
        let dir = tempfile::tempdir().unwrap();

        let (registry, settings) = load(dir.path()).unwrap();

        assert_eq!(registry.units().len(), 2);
        assert_eq!(registry.units()[0].name, "adsim_ioc");
        assert_eq!(settings.settle, Duration::from_secs(5));
    }

    #[test]
    fn parses_full_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
image = "localhost/epics-podman:dev"
settle_seconds = 1
probe_timeout_seconds = 2

[[ioc]]
name = "gp_ioc"
kind = "gp"
prefix = "bl1:"

[[ioc]]
name = "adsim_ioc"
kind = "adsim"
prefix = "bl1ad:"
desired = "stopped"
"#,
        );

        let (registry, settings) = load(dir.path()).unwrap();

        assert_eq!(settings.image, "localhost/epics-podman:dev");
        assert_eq!(settings.settle, Duration::from_secs(1));
        assert_eq!(settings.probe_timeout, Duration::from_secs(2));

        let units = registry.units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "gp_ioc");
        assert_eq!(units[0].kind, IocKind::Gp);
        assert_eq!(units[0].prefix, "bl1:");
        assert_eq!(units[1].desired, DesiredState::Stopped);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "settle_seconds = 2\n");

        let (registry, settings) = load(dir.path()).unwrap();

        assert_eq!(registry.units().len(), 2);
        assert_eq!(settings.settle, Duration::from_secs(2));
        assert_eq!(settings.image, crate::domain::DEFAULT_IMAGE);
    }

    #[test]
    fn rejects_bad_prefix() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[[ioc]]
name = "gp_ioc"
kind = "gp"
prefix = "gp"
"#,
        );

        assert!(load(dir.path()).is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[[ioc]]
name = "x_ioc"
kind = "xspress"
prefix = "x:"
"#,
        );

        assert!(load(dir.path()).is_err());
    }

    #[test]
    fn installs_template_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(CONFIG_FILE_NAME);

        install_default_config(dir.path()).unwrap();
        assert!(target.exists());

        // The installed template must itself be loadable.
        let (registry, _) = load(dir.path()).unwrap();
        assert_eq!(registry.units().len(), 2);

        fs::write(&target, "settle_seconds = 9\n").unwrap();
        install_default_config(dir.path()).unwrap();
        let (_, settings) = load(dir.path()).unwrap();
        assert_eq!(settings.settle, Duration::from_secs(9));
    }

    #[test]
    fn expands_tilde_paths() {
        let home = std::env::var("HOME").unwrap();
        let expanded = expand_path(Path::new("~/.config/iocsim"));
        assert_eq!(expanded, PathBuf::from(home).join(".config/iocsim"));
    }
}
