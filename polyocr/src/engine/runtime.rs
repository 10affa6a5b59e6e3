use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Execution backend: a named combination of device and inference library.
///
/// The set is closed. Anything else is rejected when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InferenceBackend {
    PaddleCpu,
    OpenVino,
    OnnxCpu,
    PaddleLite,
    PaddleGpu,
    PaddleGpuTensorRt,
    OnnxGpu,
    TensorRt,
}

impl InferenceBackend {
    pub const ALL: [InferenceBackend; 8] = [
        Self::PaddleCpu,
        Self::OpenVino,
        Self::OnnxCpu,
        Self::PaddleLite,
        Self::PaddleGpu,
        Self::PaddleGpuTensorRt,
        Self::OnnxGpu,
        Self::TensorRt,
    ];

    /// Name used in preset documents, CLI arguments and update requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaddleCpu => "Paddle_CPU",
            Self::OpenVino => "Open_VINO",
            Self::OnnxCpu => "ONNX_CPU",
            Self::PaddleLite => "Paddle_Lite",
            Self::PaddleGpu => "Paddle_GPU",
            Self::PaddleGpuTensorRt => "Paddle_GPU_Tensor_RT",
            Self::OnnxGpu => "ONNX_GPU",
            Self::TensorRt => "Tensor_RT",
        }
    }
}

impl fmt::Display for InferenceBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InferenceBackend {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.as_str() == s)
            .ok_or_else(|| OcrError::UnknownBackend(s.to_string()))
    }
}

impl TryFrom<String> for InferenceBackend {
    type Error = OcrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InferenceBackend> for String {
    fn from(backend: InferenceBackend) -> Self {
        backend.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendLibrary {
    Paddle,
    OpenVino,
    OnnxRuntime,
    PaddleLite,
    TensorRt,
}

/// Extra switches some backends need on top of device + library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub collect_trt_shape: bool,
    pub enable_trt: bool,
}

/// Fully specified execution configuration handed to the inference engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub backend: InferenceBackend,
    pub device: Device,
    pub library: BackendLibrary,
    pub flags: RuntimeFlags,
    /// `None` leaves the library default in place.
    pub cpu_threads: Option<u32>,
    /// Input-shape hint `(name, dims)`; `-1` marks a dynamic dimension.
    pub input_shape: Option<(String, [i64; 4])>,
}

impl RuntimeConfig {
    /// Copy of this config carrying the dynamic detection input shape that
    /// OpenVINO needs. Other backends are returned unchanged.
    pub fn for_detection(&self) -> Self {
        let mut config = self.clone();
        if self.backend == InferenceBackend::OpenVino {
            config.input_shape = Some(("x".to_string(), [1, 3, -1, -1]));
        }
        config
    }
}

/// Map a backend and thread count to the runtime configuration.
///
/// Threads are only pinned when `cpu_threads > 0`, and never for
/// `ONNX_CPU`: overriding its thread pool is unstable, so it keeps the
/// library default.
pub fn build(backend: InferenceBackend, cpu_threads: u32) -> RuntimeConfig {
    let (device, library, flags) = match backend {
        InferenceBackend::PaddleCpu => (Device::Cpu, BackendLibrary::Paddle, RuntimeFlags::default()),
        InferenceBackend::OpenVino => (Device::Cpu, BackendLibrary::OpenVino, RuntimeFlags::default()),
        InferenceBackend::OnnxCpu => (Device::Cpu, BackendLibrary::OnnxRuntime, RuntimeFlags::default()),
        InferenceBackend::PaddleLite => (Device::Cpu, BackendLibrary::PaddleLite, RuntimeFlags::default()),
        InferenceBackend::PaddleGpu => (Device::Gpu, BackendLibrary::Paddle, RuntimeFlags::default()),
        InferenceBackend::PaddleGpuTensorRt => (
            Device::Gpu,
            BackendLibrary::Paddle,
            RuntimeFlags {
                collect_trt_shape: true,
                enable_trt: true,
            },
        ),
        InferenceBackend::OnnxGpu => (Device::Gpu, BackendLibrary::OnnxRuntime, RuntimeFlags::default()),
        InferenceBackend::TensorRt => (Device::Gpu, BackendLibrary::TensorRt, RuntimeFlags::default()),
    };

    let cpu_threads = (cpu_threads > 0 && backend != InferenceBackend::OnnxCpu).then_some(cpu_threads);

    RuntimeConfig {
        backend,
        device,
        library,
        flags,
        cpu_threads,
        input_shape: None,
    }
}

/// Same as [`build`] for a backend given by name.
pub fn build_from_name(name: &str, cpu_threads: u32) -> Result<RuntimeConfig, OcrError> {
    Ok(build(name.parse()?, cpu_threads))
}
