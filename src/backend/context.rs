// Vulkan Context - instance-level objects
//
// Responsibilities:
// - Loader entry + instance creation (window-system extensions, validation)
// - Debug messenger (failure is logged, not fatal)
// - Presentation surface (failure is logged, not fatal)

use anyhow::{Context, Result};
use ash::{vk, Entry};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use std::ffi::{c_char, CStr, CString};

/// Native handles needed to create a presentation surface
pub type NativeHandles = (RawDisplayHandle, RawWindowHandle);

/// Instance-level Vulkan state with automatic cleanup
pub struct VulkanContext {
    pub instance: ash::Instance,
    pub surface_loader: ash::extensions::khr::Surface,
    /// `None` when surface creation failed; device selection then finds no
    /// present-capable queue family.
    pub surface: Option<vk::SurfaceKHR>,
    debug_utils: Option<(ash::extensions::ext::DebugUtils, vk::DebugUtilsMessengerEXT)>,
    _entry: Entry,
}

impl VulkanContext {
    /// Create instance, debug messenger and surface
    ///
    /// # Arguments
    /// * `app_name` - Application name reported to the driver
    /// * `handles` - Native window handles, if the window has any
    /// * `enable_validation` - Enable Vulkan validation layers (debug only)
    pub fn new(app_name: &str, handles: Option<NativeHandles>, enable_validation: bool) -> Result<Self> {
        log::info!("Creating Vulkan instance: {}", app_name);

        let entry = unsafe { Entry::load() }
            .context("Failed to load Vulkan library. Is Vulkan installed?")?;

        let display_handle = handles.map(|(display, _)| display);
        let instance = Self::create_instance(&entry, app_name, display_handle, enable_validation)?;
        log::info!("Vulkan instance created");

        let debug_utils = if enable_validation {
            match Self::setup_debug_messenger(&entry, &instance) {
                Ok(debug_utils) => Some(debug_utils),
                Err(e) => {
                    log::error!("Vulkan: Failed to setup debug messenger: {:#}", e);
                    None
                }
            }
        } else {
            None
        };

        let surface_loader = ash::extensions::khr::Surface::new(&entry, &instance);
        let surface = match handles {
            Some((display, window)) => {
                match unsafe { ash_window::create_surface(&entry, &instance, display, window, None) } {
                    Ok(surface) => Some(surface),
                    Err(e) => {
                        log::error!("Error creating window surface: {}", e);
                        None
                    }
                }
            }
            None => {
                log::error!("Error creating window surface: window has no native handle");
                None
            }
        };

        Ok(Self {
            instance,
            surface_loader,
            surface,
            debug_utils,
            _entry: entry,
        })
    }

    fn create_instance(
        entry: &Entry,
        app_name: &str,
        display_handle: Option<RawDisplayHandle>,
        enable_validation: bool,
    ) -> Result<ash::Instance> {
        let app_name_cstr = CString::new(app_name)?;
        let engine_name = CString::new("Noctis")?;

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        // Window-system extensions for this platform
        let mut extensions: Vec<*const c_char> = match display_handle {
            Some(display) => ash_window::enumerate_required_extensions(display)
                .context("Failed to query window-system extensions")?
                .to_vec(),
            None => Vec::new(),
        };

        if enable_validation {
            extensions.push(ash::extensions::ext::DebugUtils::name().as_ptr());
        }

        let mut flags = vk::InstanceCreateFlags::empty();
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            // MoltenVK is only enumerated through the portability extension
            extensions.push(vk::KhrPortabilityEnumerationFn::name().as_ptr());
            extensions.push(vk::KhrGetPhysicalDeviceProperties2Fn::name().as_ptr());
            flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
        }

        let layer_names = if enable_validation {
            vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::builder()
            .flags(flags)
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .context("Failed to create Vulkan instance")?;

        Ok(instance)
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(ash::extensions::ext::DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::extensions::ext::DebugUtils::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe {
            debug_utils.create_debug_utils_messenger(&create_info, None)
        }?;

        Ok((debug_utils, messenger))
    }

    /// Whether queue family `index` of `physical_device` can present to our surface
    pub fn supports_present(&self, physical_device: vk::PhysicalDevice, index: u32) -> bool {
        let Some(surface) = self.surface else {
            return false;
        };

        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, index, surface)
        }
        .unwrap_or_else(|e| {
            log::warn!("Present support query failed for family {}: {}", index, e);
            false
        })
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan instance...");

        unsafe {
            if let Some(surface) = self.surface.take() {
                self.surface_loader.destroy_surface(surface, None);
            }

            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}
