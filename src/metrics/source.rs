//! Access to the vnstat command-line tool.

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A report vnstat can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportView {
    Json,
    Monthly,
    Summary,
    Daily,
    Hourly,
    Weekly,
    Yearly,
    Top,
    Oneline,
}

impl ReportView {
    /// Command-line flags selecting this report.
    pub fn args(self) -> &'static [&'static str] {
        match self {
            Self::Json => &["--json"],
            Self::Monthly => &["-m"],
            Self::Summary => &[],
            Self::Daily => &["-d"],
            Self::Hourly => &["-h"],
            Self::Weekly => &["-w"],
            Self::Yearly => &["-y"],
            Self::Top => &["-t"],
            Self::Oneline => &["--oneline"],
        }
    }
}

/// Something that can produce vnstat reports.
///
/// Every call is an independent read; implementations must tolerate
/// concurrent callers through `&self`.
pub trait SnapshotSource: Send + Sync {
    /// Produce the raw bytes of a report.
    fn fetch(&self, view: ReportView) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Produce the JSON report, rejecting output that is not valid JSON.
    fn fetch_json(&self) -> impl Future<Output = Result<Vec<u8>>> + Send {
        async move {
            let raw = self.fetch(ReportView::Json).await?;
            serde_json::from_slice::<serde::de::IgnoredAny>(&raw)
                .map_err(|e| ExporterError::malformed_output(e.to_string()))?;
            Ok(raw)
        }
    }
}

/// Runs the `vnstat` binary as a subprocess.
#[derive(Debug, Clone)]
pub struct VnstatCommand {
    binary: String,
    interface: Option<String>,
}

impl Default for VnstatCommand {
    fn default() -> Self {
        Self {
            binary: "vnstat".to_string(),
            interface: None,
        }
    }
}

impl VnstatCommand {
    /// Query all interfaces using `vnstat` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict reports to one interface; an empty name means all interfaces.
    pub fn with_interface(mut self, interface: Option<String>) -> Self {
        self.interface = interface.filter(|name| !name.is_empty());
        self
    }

    /// Use a different executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Fail unless `vnstat --version` runs successfully.
    pub async fn check_installed(&self) -> Result<()> {
        let status = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| ExporterError::source_unavailable(e.to_string()))?;

        if status.success() {
            Ok(())
        } else {
            Err(ExporterError::source_unavailable(format!(
                "`{} --version` exited with {}",
                self.binary, status
            )))
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.binary);
        command.args(args);
        if let Some(interface) = &self.interface {
            command.args(["-i", interface.as_str()]);
        }
        command.stdin(Stdio::null()).kill_on_drop(true);

        debug!("Running {} {:?}", self.binary, args);
        let output = command.output().await.map_err(|e| {
            ExporterError::source_unavailable(format!("failed to spawn {}: {}", self.binary, e))
        })?;

        if !output.status.success() {
            return Err(ExporterError::execution_failed(
                output.status.to_string(),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(output.stdout)
    }
}

impl SnapshotSource for VnstatCommand {
    async fn fetch(&self, view: ReportView) -> Result<Vec<u8>> {
        self.run(view.args()).await
    }
}
