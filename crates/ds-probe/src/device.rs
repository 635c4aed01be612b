use std::fmt;

/// The class of compute device a benchmark runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// NVIDIA discrete GPU via the CUDA driver.
    Cuda,
    /// Apple-silicon integrated GPU via Metal.
    Metal,
    /// Host CPU.
    Cpu,
}

impl DeviceKind {
    /// Lowercase identifier, matching backend names.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Cuda => "cuda",
            DeviceKind::Metal => "metal",
            DeviceKind::Cpu => "cpu",
        }
    }

    /// Uppercase form used in report headings ("CUDA Time: ...").
    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceKind::Cuda => "CUDA",
            DeviceKind::Metal => "METAL",
            DeviceKind::Cpu => "CPU",
        }
    }

    /// Returns true for non-CPU devices.
    pub fn is_accelerator(&self) -> bool {
        !matches!(self, DeviceKind::Cpu)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(DeviceKind::Cuda.to_string(), "cuda");
        assert_eq!(DeviceKind::Metal.to_string(), "metal");
        assert_eq!(DeviceKind::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(DeviceKind::Cuda.display_name(), "CUDA");
        assert_eq!(DeviceKind::Cpu.display_name(), "CPU");
    }

    #[test]
    fn test_is_accelerator() {
        assert!(DeviceKind::Cuda.is_accelerator());
        assert!(DeviceKind::Metal.is_accelerator());
        assert!(!DeviceKind::Cpu.is_accelerator());
    }
}
