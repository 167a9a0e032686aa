//! Acceleration capability probe
//!
//! The host reports which conversion backends can run on this machine. The
//! report only decides which backend choices are offered; it never takes
//! part in document edits, and a failed probe degrades to CPU only.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::warn;

use crate::config::ZenzaiBackend;

/// Backends the host can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub cpu: bool,
    pub cuda: bool,
    pub vulkan: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::cpu_only()
    }
}

impl Capabilities {
    pub fn cpu_only() -> Self {
        Self {
            cpu: true,
            cuda: false,
            vulkan: false,
        }
    }

    pub fn supports(&self, backend: ZenzaiBackend) -> bool {
        match backend {
            ZenzaiBackend::Cpu => self.cpu,
            ZenzaiBackend::Cuda => self.cuda,
            ZenzaiBackend::Vulkan => self.vulkan,
        }
    }

    /// Backend choices to offer, in display order
    pub fn selectable_backends(&self) -> Vec<ZenzaiBackend> {
        ZenzaiBackend::ALL
            .iter()
            .copied()
            .filter(|backend| self.supports(*backend))
            .collect()
    }
}

pub trait CapabilityProbe: Send + Sync {
    fn probe_capabilities(&self) -> impl Future<Output = anyhow::Result<Capabilities>> + Send;
}

/// A probe that always reports the same capabilities
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProbe(pub Capabilities);

impl CapabilityProbe for StaticProbe {
    async fn probe_capabilities(&self) -> anyhow::Result<Capabilities> {
        Ok(self.0)
    }
}

/// Probe, falling back to CPU only when the probe fails
pub async fn probe_or_cpu_only<P: CapabilityProbe>(probe: &P) -> Capabilities {
    match probe.probe_capabilities().await {
        Ok(capabilities) => capabilities,
        Err(e) => {
            warn!(error = %e, "capability probe failed, offering CPU backend only");
            Capabilities::cpu_only()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProbe;

    impl CapabilityProbe for FailingProbe {
        async fn probe_capabilities(&self) -> anyhow::Result<Capabilities> {
            Err(anyhow::anyhow!("no driver"))
        }
    }

    #[test]
    fn test_selectable_backends() {
        let capabilities = Capabilities {
            cpu: true,
            cuda: false,
            vulkan: true,
        };
        assert_eq!(
            capabilities.selectable_backends(),
            vec![ZenzaiBackend::Cpu, ZenzaiBackend::Vulkan]
        );
        assert_eq!(Capabilities::cpu_only().selectable_backends(), vec![ZenzaiBackend::Cpu]);
    }

    #[tokio::test]
    async fn test_failed_probe_degrades_to_cpu_only() {
        assert_eq!(probe_or_cpu_only(&FailingProbe).await, Capabilities::cpu_only());
    }

    #[tokio::test]
    async fn test_static_probe() {
        let all = Capabilities {
            cpu: true,
            cuda: true,
            vulkan: true,
        };
        assert_eq!(probe_or_cpu_only(&StaticProbe(all)).await, all);
    }
}
