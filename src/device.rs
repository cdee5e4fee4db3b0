// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Hardware device hints for ONNX Runtime sessions.
//!
//! `Auto` registers whichever accelerators were compiled in and lets the
//! runtime fall back to CPU; `Cpu` forces standard compute. The pipeline
//! defaults the detector to `Auto` and the pose model to `Cpu` so a laptop
//! GPU is not saturated by two sessions.

use std::fmt;
use std::str::FromStr;

/// Compute device hint for a model session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// Use an accelerator when one is available, otherwise CPU.
    #[default]
    Auto,
    /// Force CPU execution.
    Cpu,
    /// NVIDIA GPU via the CUDA execution provider.
    Cuda(usize),
    /// Apple Silicon via the `CoreML` execution provider.
    CoreMl,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(idx) => write!(f, "cuda:{idx}"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

/// Error returned when a device string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParseError(pub String);

impl fmt::Display for DeviceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid device '{}', expected one of: auto, cpu, cuda[:N], coreml",
            self.0
        )
    }
}

impl std::error::Error for DeviceParseError {}

impl FromStr for Device {
    type Err = DeviceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "auto" => return Ok(Self::Auto),
            "cpu" => return Ok(Self::Cpu),
            "cuda" | "gpu" => return Ok(Self::Cuda(0)),
            // "mps" is accepted as an alias so configs written for the
            // Python tooling keep working on Apple hardware.
            "coreml" | "mps" => return Ok(Self::CoreMl),
            _ => {}
        }
        if let Some(rest) = lower.strip_prefix("cuda:") {
            let idx = parse_device_index(rest, &lower)?;
            return Ok(Self::Cuda(idx));
        }
        Err(DeviceParseError(lower))
    }
}

fn parse_device_index(raw: &str, original: &str) -> Result<usize, DeviceParseError> {
    raw.parse::<usize>()
        .map_err(|_| DeviceParseError(original.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_display() {
        assert_eq!(Device::Auto.to_string(), "auto");
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda(1).to_string(), "cuda:1");
        assert_eq!(Device::CoreMl.to_string(), "coreml");
    }

    #[test]
    fn test_device_from_str() {
        assert_eq!("auto".parse::<Device>().unwrap(), Device::Auto);
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:2".parse::<Device>().unwrap(), Device::Cuda(2));
        assert_eq!("coreml".parse::<Device>().unwrap(), Device::CoreMl);
        assert_eq!("mps".parse::<Device>().unwrap(), Device::CoreMl);
        assert_eq!("CUDA:0".parse::<Device>().unwrap(), Device::Cuda(0));
    }

    #[test]
    fn test_device_from_str_invalid() {
        assert!("tpu".parse::<Device>().is_err());
        assert!("cuda:x".parse::<Device>().is_err());
        let err = "npu".parse::<Device>().unwrap_err();
        assert!(err.to_string().contains("invalid device 'npu'"));
    }

    #[test]
    fn test_device_default() {
        assert_eq!(Device::default(), Device::Auto);
    }
}
