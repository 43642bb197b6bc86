use crate::domain::{ContainerRuntime, LaunchSpec};
use anyhow::{Context, Result, bail};
use std::ffi::OsStr;
use std::process::{Command, ExitStatus, Stdio};

pub struct PodmanAdapter;

impl PodmanAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PodmanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for PodmanAdapter {
    fn is_available(&self) -> bool {
        Command::new("podman")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(podman_quiet_status(
            ["container", "exists", name],
            &format!("checking whether container {name} exists"),
        )?
        .success())
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        let output = Command::new("podman")
            .args([
                "container",
                "inspect",
                name,
                "--format",
                "{{.State.Running}}",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .with_context(|| format!("checking state of container {name}"))?;

        if !output.status.success() {
            return Ok(false);
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim() == "true")
    }

    fn stop(&self, name: &str) -> Result<()> {
        podman(["stop", name], &format!("stopping container {name}"))
    }

    fn remove(&self, name: &str) -> Result<()> {
        podman(["rm", "-f", name], &format!("removing container {name}"))
    }

    fn image_present(&self, image: &str) -> Result<bool> {
        Ok(podman_quiet_status(
            ["image", "exists", image],
            &format!("checking for local image {image}"),
        )?
        .success())
    }

    fn pull(&self, image: &str) -> Result<()> {
        podman(["pull", image], &format!("pulling image {image}"))
    }

    fn run_detached(&self, spec: &LaunchSpec) -> Result<()> {
        let prefix_env = format!("PREFIX={}", spec.prefix);
        // IOCs find each other over Channel Access broadcasts, so every
        // instance shares the host network namespace.
        let output = Command::new("podman")
            .args([
                "run",
                "-d",
                "--rm",
                "--net=host",
                "--name",
                spec.name,
                "-e",
                &prefix_env,
                spec.image,
                spec.command,
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("launching container {}", spec.name))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "podman run for {} returned status {:?}: {}",
                spec.name,
                output.status.code(),
                stderr.trim()
            );
        }

        Ok(())
    }
}

fn podman<I, S>(args: I, context: &str) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let status = podman_status(args, context)?;
    ensure_success(status, context)
}

fn podman_status<I, S>(args: I, context: &str) -> Result<ExitStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new("podman")
        .args(args.into_iter().map(|item| item.as_ref().to_os_string()))
        .stdout(Stdio::null())
        .status()
        .with_context(|| context.to_string())
}

/// Like `podman_status` but with stderr discarded too, for existence
/// checks where a non-zero status is an answer rather than an error.
fn podman_quiet_status<I, S>(args: I, context: &str) -> Result<ExitStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new("podman")
        .args(args.into_iter().map(|item| item.as_ref().to_os_string()))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| context.to_string())
}

fn ensure_success(status: ExitStatus, context: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    bail!("podman returned status {:?} ({context})", status)
}
