// Backend module - Vulkan implementation of the renderer
//
// Design: Thin wrapper around ash, each GPU object owned by a type whose
// Drop releases it. Wrappers hold an Arc<VulkanDevice> so the device
// outlives everything created from it.

pub mod context;
pub mod device;
pub mod render_pass;
pub mod renderer;
pub mod swapchain;
pub mod sync;

pub use context::VulkanContext;
pub use device::VulkanDevice;
pub use render_pass::RenderTargets;
pub use renderer::VulkanRenderer;
pub use swapchain::Swapchain;
pub use sync::FrameSynchronizer;
