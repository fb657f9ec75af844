//! Tensor backend used by the command line driver, chosen by cargo feature.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        /// Backend the metrics are computed on.
        pub type SelectedBackend = burn::backend::Cuda;
        /// Human readable backend name.
        pub const BACKEND_NAME: &str = "CUDA (NVIDIA GPU)";
    } else if #[cfg(feature = "wgpu")] {
        /// Backend the metrics are computed on.
        pub type SelectedBackend = burn::backend::Wgpu;
        /// Human readable backend name.
        pub const BACKEND_NAME: &str = "WGPU (GPU)";
    } else {
        /// Backend the metrics are computed on.
        pub type SelectedBackend = burn::backend::NdArray;
        /// Human readable backend name.
        pub const BACKEND_NAME: &str = "NdArray (CPU)";
    }
}

/// Device of the selected backend.
pub type SelectedDevice = <SelectedBackend as burn::tensor::backend::Backend>::Device;

/// Creates the default device of the selected backend.
pub fn create_device() -> SelectedDevice {
    Default::default()
}
