// Vulkan Device - Core GPU interface
//
// Responsibilities:
// - Physical device selection (first device with graphics + present queues
//   and anisotropic filtering)
// - Logical device + one queue per unique family

use anyhow::Result;
use ash::vk;
use std::collections::BTreeSet;
use std::ffi::CStr;
use std::sync::Arc;

use super::VulkanContext;
use crate::error::RendererError;

/// Queue families a device offers for graphics work and presentation.
/// The two may be the same family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Scan `families` in order, taking the first graphics-capable and the
    /// first present-capable family. Families without queues never count.
    pub fn find(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> bool,
    ) -> Self {
        let mut indices = Self::default();

        for (index, family) in families.iter().enumerate() {
            let index = index as u32;
            if family.queue_count == 0 {
                continue;
            }

            if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(index);
            }
            if indices.present.is_none() && supports_present(index) {
                indices.present = Some(index);
            }
            if indices.is_complete() {
                break;
            }
        }

        indices
    }

    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Resolved families without duplicates, in ascending order
    pub fn unique_families(&self) -> Vec<u32> {
        [self.graphics, self.present]
            .into_iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Capability snapshot of one enumerated GPU
#[derive(Debug, Clone, Copy)]
pub struct DeviceCandidate<D> {
    pub handle: D,
    pub queue_families: QueueFamilyIndices,
    pub sampler_anisotropy: bool,
}

impl<D> DeviceCandidate<D> {
    pub fn is_suitable(&self) -> bool {
        self.queue_families.is_complete() && self.sampler_anisotropy
    }
}

/// Graphics and present families of a selected device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedQueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl ResolvedQueueFamilies {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// First suitable candidate in enumeration order. No scoring beyond the
/// suitability predicate.
pub fn select_first_suitable<D>(
    candidates: impl IntoIterator<Item = DeviceCandidate<D>>,
) -> Option<(D, ResolvedQueueFamilies)> {
    candidates.into_iter().find_map(|candidate| {
        log::info!(
            "Device suitability: QueueComplete = {}, Anisotropy = {}",
            candidate.queue_families.is_complete(),
            candidate.sampler_anisotropy
        );

        match candidate.queue_families {
            QueueFamilyIndices {
                graphics: Some(graphics),
                present: Some(present),
            } if candidate.sampler_anisotropy => {
                Some((candidate.handle, ResolvedQueueFamilies { graphics, present }))
            }
            _ => None,
        }
    })
}

pub fn vendor_name(vendor_id: u32) -> &'static str {
    match vendor_id {
        0x1022 => "AMD",
        0x10DE => "NVIDIA",
        0x8086 => "Intel",
        0x106B => "Apple",
        _ => "Unknown Vendor",
    }
}

pub fn device_type_name(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        vk::PhysicalDeviceType::CPU => "CPU",
        vk::PhysicalDeviceType::OTHER => "Other",
        _ => "Unknown",
    }
}

/// Vulkan device wrapper with automatic cleanup
pub struct VulkanDevice {
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,
    pub queue_families: ResolvedQueueFamilies,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,

    // Dropped after the logical device
    pub context: Arc<VulkanContext>,
}

impl VulkanDevice {
    /// Pick a GPU and create the logical device with its queues
    pub fn new(context: Arc<VulkanContext>) -> Result<Arc<Self>> {
        let (physical_device, queue_families) = Self::pick_physical_device(&context)?;

        let properties = unsafe {
            context.instance.get_physical_device_properties(physical_device)
        };
        Self::log_device_info(&properties);

        let device = Self::create_logical_device(&context.instance, physical_device, queue_families)?;

        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };

        log::info!("Logical device created");

        Ok(Arc::new(Self {
            device,
            physical_device,
            queue_families,
            graphics_queue,
            present_queue,
            context,
        }))
    }

    fn pick_physical_device(
        context: &VulkanContext,
    ) -> Result<(vk::PhysicalDevice, ResolvedQueueFamilies)> {
        let devices = unsafe { context.instance.enumerate_physical_devices() }?;

        if devices.is_empty() {
            return Err(RendererError::NoDevices.into());
        }
        log::info!("Device Count: {}", devices.len());

        let candidates = devices.into_iter().map(|device| {
            let families = unsafe {
                context.instance.get_physical_device_queue_family_properties(device)
            };
            let features = unsafe { context.instance.get_physical_device_features(device) };

            DeviceCandidate {
                handle: device,
                queue_families: QueueFamilyIndices::find(&families, |index| {
                    context.supports_present(device, index)
                }),
                sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
            }
        });

        select_first_suitable(candidates).ok_or_else(|| RendererError::NoSuitableDevice.into())
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_families: ResolvedQueueFamilies,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let unique_families = QueueFamilyIndices {
            graphics: Some(queue_families.graphics),
            present: Some(queue_families.present),
        }
        .unique_families();

        let queue_create_infos: Vec<_> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect();

        let mut extensions = vec![ash::extensions::khr::Swapchain::name().as_ptr()];
        if Self::has_portability_subset(instance, physical_device) {
            extensions.push(vk::KhrPortabilitySubsetFn::name().as_ptr());
        }

        let features = vk::PhysicalDeviceFeatures {
            sampler_anisotropy: vk::TRUE,
            ..Default::default()
        };

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = unsafe {
            instance.create_device(physical_device, &create_info, None)
        }
        .map_err(RendererError::DeviceCreation)?;

        Ok(device)
    }

    /// Portability implementations require this extension to be enabled
    fn has_portability_subset(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> bool {
        let available = unsafe { instance.enumerate_device_extension_properties(physical_device) }
            .unwrap_or_default();

        available.iter().any(|extension| {
            let name = unsafe { CStr::from_ptr(extension.extension_name.as_ptr()) };
            name == vk::KhrPortabilitySubsetFn::name()
        })
    }

    fn log_device_info(properties: &vk::PhysicalDeviceProperties) {
        log::info!("Vulkan Info:");
        log::info!(
            "  API Version: {}.{}.{}",
            vk::api_version_major(properties.api_version),
            vk::api_version_minor(properties.api_version),
            vk::api_version_patch(properties.api_version)
        );
        log::info!("  Device Vendor: {}", vendor_name(properties.vendor_id));
        log::info!(
            "  Device Name: {}",
            unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy()
        );
        log::info!("  Device Type: {}", device_type_name(properties.device_type));
        log::info!("  Driver Version: {}", properties.driver_version);
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }?;
        Ok(())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");

        let _ = self.wait_idle();

        unsafe {
            self.device.destroy_device(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags, queue_count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count,
            ..Default::default()
        }
    }

    fn candidate(
        handle: &'static str,
        graphics: Option<u32>,
        present: Option<u32>,
        sampler_anisotropy: bool,
    ) -> DeviceCandidate<&'static str> {
        DeviceCandidate {
            handle,
            queue_families: QueueFamilyIndices { graphics, present },
            sampler_anisotropy,
        }
    }

    #[test]
    fn graphics_and_present_may_share_a_family() {
        let families = [
            family(vk::QueueFlags::TRANSFER, 1),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE, 4),
        ];

        let indices = QueueFamilyIndices::find(&families, |index| index == 1);

        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(1));
        assert_eq!(indices.unique_families(), [1]);
    }

    #[test]
    fn split_families_are_both_kept() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 1),
            family(vk::QueueFlags::COMPUTE, 1),
        ];

        let indices = QueueFamilyIndices::find(&families, |index| index == 1);

        assert!(indices.is_complete());
        assert_eq!(indices.unique_families(), [0, 1]);
    }

    #[test]
    fn empty_families_never_count() {
        let families = [
            family(vk::QueueFlags::GRAPHICS, 0),
            family(vk::QueueFlags::GRAPHICS, 2),
        ];

        let indices = QueueFamilyIndices::find(&families, |_| true);

        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(1));
    }

    #[test]
    fn missing_present_support_is_incomplete() {
        let families = [family(vk::QueueFlags::GRAPHICS, 1)];

        let indices = QueueFamilyIndices::find(&families, |_| false);

        assert!(!indices.is_complete());
        assert_eq!(indices.unique_families(), [0]);
    }

    #[test]
    fn selection_skips_partially_capable_devices() {
        let candidates = [
            candidate("no-anisotropy", Some(0), Some(0), false),
            candidate("no-present", Some(0), None, true),
            candidate("no-graphics", None, Some(1), true),
            candidate("good", Some(0), Some(2), true),
            candidate("also-good", Some(0), Some(0), true),
        ];
        let suitable: Vec<_> = candidates.iter().map(|c| c.is_suitable()).collect();
        assert_eq!(suitable, [false, false, false, true, true]);

        let (chosen, families) = select_first_suitable(candidates).unwrap();

        assert_eq!(chosen, "good");
        assert_eq!(families, ResolvedQueueFamilies { graphics: 0, present: 2 });
        assert!(!families.is_shared());
    }

    #[test]
    fn no_suitable_device_selects_nothing() {
        let candidates = [
            candidate("a", Some(0), Some(0), false),
            candidate("b", None, None, true),
        ];

        assert!(select_first_suitable(candidates).is_none());
        assert!(select_first_suitable(Vec::<DeviceCandidate<u8>>::new()).is_none());
    }

    #[test]
    fn vendor_and_type_names() {
        assert_eq!(vendor_name(0x10DE), "NVIDIA");
        assert_eq!(vendor_name(0x1234), "Unknown Vendor");
        assert_eq!(device_type_name(vk::PhysicalDeviceType::DISCRETE_GPU), "Discrete GPU");
    }
}
