// Error types
//
// Fatal renderer conditions and frame-protocol violations. Everything else
// travels as anyhow::Error with context attached.

use ash::vk;
use thiserror::Error;

use crate::renderer::{FramePhase, RendererApi};

/// Conditions that stop renderer initialization. None of these have a
/// fallback path, so the entry point logs them and exits.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("failed to find GPUs with Vulkan support")]
    NoDevices,

    #[error("failed to find a suitable GPU")]
    NoSuitableDevice,

    #[error("failed to create logical device: {0}")]
    DeviceCreation(vk::Result),

    #[error("no presentation surface is available")]
    NoSurface,

    #[error("surface reports no supported formats")]
    NoSurfaceFormats,

    #[error("failed to create swapchain: {0}")]
    SwapchainCreation(vk::Result),

    #[error("failed to create image view for swapchain image {index}: {result}")]
    ImageViewCreation { index: usize, result: vk::Result },

    #[error("renderer API {0:?} is not supported")]
    UnsupportedApi(RendererApi),
}

/// A frame entry point was called out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("cannot move frame from {from:?} to {to:?}")]
    InvalidTransition { from: FramePhase, to: FramePhase },
}
