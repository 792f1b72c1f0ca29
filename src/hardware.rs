//! Hardware detection for GPU/CPU classification.
//!
//! Queries Ollama `/api/ps` to determine whether the served model runs on
//! GPU or CPU. Reported by `/health`; Ollama exposes no raw device list,
//! so the device count is the number of GPU-resident model instances.

use serde::{Deserialize, Serialize};

use crate::pipeline::ollama::LlmClient;

/// GPU availability classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuTier {
    /// All model layers in VRAM.
    FullGpu,
    /// Some layers in VRAM, rest on CPU.
    PartialGpu,
    /// No VRAM allocated, pure CPU inference.
    CpuOnly,
}

impl std::fmt::Display for GpuTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullGpu => write!(f, "Full GPU"),
            Self::PartialGpu => write!(f, "Partial GPU"),
            Self::CpuOnly => write!(f, "CPU only"),
        }
    }
}

/// Hardware profile detected from Ollama's running models.
///
/// Conservative: defaults to CPU-only if detection fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub gpu_available: bool,
    /// Running model instances with VRAM allocated.
    pub device_count: usize,
    /// Total VRAM allocated to loaded models (bytes). 0 = CPU-only.
    pub vram_bytes: u64,
    /// Total model size in memory (bytes).
    pub total_model_bytes: u64,
}

impl HardwareProfile {
    pub fn gpu_tier(&self) -> GpuTier {
        if self.total_model_bytes == 0 || self.vram_bytes == 0 {
            GpuTier::CpuOnly
        } else if self.vram_bytes >= self.total_model_bytes {
            GpuTier::FullGpu
        } else {
            GpuTier::PartialGpu
        }
    }

    /// Conservative fallback when detection fails.
    pub fn cpu_fallback() -> Self {
        Self {
            gpu_available: false,
            device_count: 0,
            vram_bytes: 0,
            total_model_bytes: 0,
        }
    }
}

/// Detect hardware profile by querying Ollama `/api/ps`.
///
/// Falls back to `HardwareProfile::cpu_fallback()` if Ollama is unreachable
/// or no models are currently loaded.
pub fn detect_hardware(client: &dyn LlmClient) -> HardwareProfile {
    match client.list_running_models() {
        Ok(models) if !models.is_empty() => {
            let total_size: u64 = models.iter().map(|m| m.size).sum();
            let total_vram: u64 = models.iter().map(|m| m.size_vram).sum();
            let device_count = models.iter().filter(|m| m.size_vram > 0).count();

            let profile = HardwareProfile {
                gpu_available: total_vram > 0,
                device_count,
                vram_bytes: total_vram,
                total_model_bytes: total_size,
            };

            tracing::debug!(
                gpu_tier = %profile.gpu_tier(),
                vram_mb = total_vram / 1_000_000,
                total_mb = total_size / 1_000_000,
                models = models.len(),
                "Hardware profile detected"
            );

            profile
        }
        Ok(_) => HardwareProfile::cpu_fallback(),
        Err(e) => {
            tracing::warn!(error = %e, "Hardware detection failed, assuming CPU");
            HardwareProfile::cpu_fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ollama::MockLlmClient;
    use crate::pipeline::ollama_types::RunningModelInfo;

    fn running(size: u64, size_vram: u64) -> RunningModelInfo {
        RunningModelInfo {
            name: "medgemma:4b".into(),
            size,
            size_vram,
        }
    }

    #[test]
    fn full_gpu_when_vram_covers_model() {
        let client = MockLlmClient::new("").with_running(vec![running(100, 100)]);
        let profile = detect_hardware(&client);
        assert!(profile.gpu_available);
        assert_eq!(profile.device_count, 1);
        assert_eq!(profile.gpu_tier(), GpuTier::FullGpu);
    }

    #[test]
    fn partial_gpu_when_split() {
        let client = MockLlmClient::new("").with_running(vec![running(100, 40)]);
        assert_eq!(detect_hardware(&client).gpu_tier(), GpuTier::PartialGpu);
    }

    #[test]
    fn cpu_only_when_no_vram() {
        let client = MockLlmClient::new("").with_running(vec![running(100, 0)]);
        let profile = detect_hardware(&client);
        assert!(!profile.gpu_available);
        assert_eq!(profile.device_count, 0);
        assert_eq!(profile.gpu_tier(), GpuTier::CpuOnly);
    }

    #[test]
    fn nothing_running_falls_back_to_cpu() {
        let client = MockLlmClient::new("");
        let profile = detect_hardware(&client);
        assert!(!profile.gpu_available);
        assert_eq!(profile.gpu_tier(), GpuTier::CpuOnly);
    }
}
