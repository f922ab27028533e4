//! The compute backend selected at build time

use burn::backend::Autodiff;

#[cfg(feature = "tch")]
mod selected {
    use burn::backend::{libtorch::LibTorchDevice, LibTorch};

    /// LibTorch, on the first CUDA device when requested
    pub type Backend = LibTorch;

    /// The device to run on
    pub fn device(cuda: bool) -> LibTorchDevice {
        if cuda {
            LibTorchDevice::Cuda(0)
        } else {
            LibTorchDevice::Cpu
        }
    }
}

#[cfg(not(feature = "tch"))]
mod selected {
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    /// The pure Rust CPU backend
    pub type Backend = NdArray;

    /// The device to run on. CUDA needs the `tch` feature.
    pub fn device(cuda: bool) -> NdArrayDevice {
        if cuda {
            log::warn!("CUDA requested but this build has no GPU backend; running on the CPU");
        }

        NdArrayDevice::Cpu
    }
}

pub use selected::{device, Backend};

/// The backend used for training
pub type TrainingBackend = Autodiff<Backend>;
