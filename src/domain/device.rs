// ============================================================
// Layer 3 — ComputeDevice
// ============================================================
// Where tensors live. The application layer maps this onto a
// concrete burn backend (NdArray on CPU, Wgpu on the default
// GPU adapter).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cpu,
    #[default]
    Wgpu,
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Cpu  => write!(f, "cpu"),
            ComputeDevice::Wgpu => write!(f, "wgpu"),
        }
    }
}

impl FromStr for ComputeDevice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu"          => Ok(ComputeDevice::Cpu),
            "wgpu" | "gpu" => Ok(ComputeDevice::Wgpu),
            other          => anyhow::bail!("unknown device '{other}' (expected cpu or wgpu)"),
        }
    }
}
