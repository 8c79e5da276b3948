// SPDX-License-Identifier: CEPL-1.0
//! Presentation surface: the swapchain, its colour views and the shared depth
//! attachment.
use std::rc::Rc;

use ash::vk;
use tandem_core::{RenderError, RenderResult};
use tandem_render::{RenderSize, VulkanSettings};
use tracing::info;

use crate::api::DeviceApi;
use crate::device::Device;
use crate::memory::find_memory_type;

pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// Returns the supported entry whose format matches `requested`, keeping the
/// colour space the driver pairs with it.
pub fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
    requested: vk::Format,
) -> RenderResult<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| f.format == requested)
        .ok_or_else(|| RenderError::unavailable("surface format", format!("{requested:?}")).report())
}

/// Current extent, or the configured size clamped to the surface limits when
/// the surface leaves it to the swapchain.
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, size: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }
    vk::Extent2D {
        width: size
            .width
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: size
            .height
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// FIFO, opaque, one layer. `families` is `[graphics, present]`; the images
/// are shared concurrently only when the two differ.
pub fn swapchain_create_info<'a>(
    surface: vk::SurfaceKHR,
    caps: &vk::SurfaceCapabilitiesKHR,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    frame_count: u32,
    families: &'a [u32; 2],
) -> vk::SwapchainCreateInfoKHR<'a> {
    let info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(frame_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .pre_transform(caps.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(vk::PresentModeKHR::FIFO)
        .clipped(true);
    if families[0] == families[1] {
        info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
    } else {
        info.image_sharing_mode(vk::SharingMode::CONCURRENT)
            .queue_family_indices(families)
    }
}

/// The driver may hand back more images than `min_image_count`; the frame
/// loop indexes per-image resources by image and needs exactly `frame_count`.
pub fn check_image_count(images: &[vk::Image], frame_count: u32) -> RenderResult<()> {
    if images.len() != frame_count as usize {
        return Err(RenderError::state(format!(
            "swapchain created {} images, {frame_count} configured",
            images.len()
        ))
        .report());
    }
    Ok(())
}

pub struct Swapchain {
    api: Rc<dyn DeviceApi>,
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl Swapchain {
    pub fn new(
        device: &Rc<Device>,
        settings: &VulkanSettings,
        size: RenderSize,
    ) -> RenderResult<Self> {
        let caps = device.surface_capabilities()?;
        let requested = vk::Format::from_raw(settings.surface_format);
        let surface_format = choose_surface_format(&device.surface_formats()?, requested)?;
        let extent = choose_extent(&caps, size);

        let families = [device.graphics_queue().family, device.present_queue().family];
        let info = swapchain_create_info(
            device.surface(),
            &caps,
            surface_format,
            extent,
            settings.frame_count,
            &families,
        );

        let handle = device.create_swapchain(&info)?;
        let api: Rc<dyn DeviceApi> = device.clone();
        let images = match api.swapchain_images(handle) {
            Ok(images) => images,
            Err(e) => {
                api.destroy_swapchain(handle);
                return Err(RenderError::native("vkGetSwapchainImagesKHR", e).report());
            }
        };
        let this = Self::from_parts(api, handle, images, surface_format.format, extent);
        check_image_count(&this.images, settings.frame_count)?;
        info!(
            "vk: swapchain {:?} / {:?}, extent {}x{}, {} images",
            surface_format.format,
            surface_format.color_space,
            extent.width,
            extent.height,
            this.images.len()
        );
        Ok(this)
    }

    /// Takes ownership of an already created swapchain.
    pub fn from_parts(
        api: Rc<dyn DeviceApi>,
        handle: vk::SwapchainKHR,
        images: Vec<vk::Image>,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Self {
        Self {
            api,
            handle,
            images,
            format,
            extent,
        }
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        if self.handle != vk::SwapchainKHR::null() {
            self.api.destroy_swapchain(self.handle);
        }
    }
}

fn view_info(
    image: vk::Image,
    format: vk::Format,
    aspect: vk::ImageAspectFlags,
) -> vk::ImageViewCreateInfo<'static> {
    vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: aspect,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
}

pub fn create_color_view(
    api: &dyn DeviceApi,
    image: vk::Image,
    format: vk::Format,
) -> RenderResult<vk::ImageView> {
    api.create_image_view(&view_info(image, format, vk::ImageAspectFlags::COLOR))
        .map_err(|e| RenderError::native("vkCreateImageView", e).report())
}

/// Framebuffer with the colour view as attachment 0 and depth as attachment 1.
pub fn create_framebuffer(
    api: &dyn DeviceApi,
    render_pass: vk::RenderPass,
    color: vk::ImageView,
    depth: vk::ImageView,
    extent: vk::Extent2D,
) -> RenderResult<vk::Framebuffer> {
    let attachments = [color, depth];
    let info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);
    api.create_framebuffer(&info)
        .map_err(|e| RenderError::native("vkCreateFramebuffer", e).report())
}

/// Device-local depth attachment shared by every framebuffer.
pub struct DepthImage {
    api: Rc<dyn DeviceApi>,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
}

impl DepthImage {
    pub fn new(api: Rc<dyn DeviceApi>, extent: vk::Extent2D) -> RenderResult<Self> {
        let info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let image = api
            .create_image(&info)
            .map_err(|e| RenderError::native("vkCreateImage", e).report())?;
        let mut this = Self {
            api,
            image,
            memory: vk::DeviceMemory::null(),
            view: vk::ImageView::null(),
        };

        let req = this.api.image_memory_requirements(image);
        let type_index = find_memory_type(
            &this.api.memory_properties(),
            req.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        this.memory = this
            .api
            .allocate_memory(req.size, type_index)
            .map_err(|e| RenderError::native("vkAllocateMemory", e).report())?;
        this.api
            .bind_image_memory(image, this.memory)
            .map_err(|e| RenderError::native("vkBindImageMemory", e).report())?;
        this.view = this
            .api
            .create_image_view(&view_info(image, DEPTH_FORMAT, vk::ImageAspectFlags::DEPTH))
            .map_err(|e| RenderError::native("vkCreateImageView", e).report())?;
        Ok(this)
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }
}

impl Drop for DepthImage {
    fn drop(&mut self) {
        if self.view != vk::ImageView::null() {
            self.api.destroy_image_view(self.view);
        }
        if self.image != vk::Image::null() {
            self.api.destroy_image(self.image);
        }
        if self.memory != vk::DeviceMemory::null() {
            self.api.free_memory(self.memory);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeDevice};
    use ash::vk::Handle;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    #[test]
    fn configured_format_is_taken_with_its_colour_space() {
        let formats = [
            format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(
                vk::Format::B8G8R8A8_UNORM,
                vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
            ),
        ];
        let picked = choose_surface_format(&formats, vk::Format::from_raw(44)).unwrap();
        assert_eq!(picked.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(picked.color_space, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT);
    }

    #[test]
    fn unsupported_format_is_unavailable() {
        let formats = [format(vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
        let err = choose_surface_format(&formats, vk::Format::B8G8R8A8_UNORM).unwrap_err();
        assert!(matches!(err, RenderError::Unavailable { kind: "surface format", .. }));
    }

    #[test]
    fn undefined_extent_falls_back_to_clamped_size() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1024,
                height: 768,
            },
            min_image_extent: vk::Extent2D {
                width: 1,
                height: 1,
            },
            max_image_extent: vk::Extent2D {
                width: 700,
                height: 4096,
            },
            ..Default::default()
        };
        let size = RenderSize {
            width: 800,
            height: 600,
        };
        assert_eq!(choose_extent(&caps, size), caps.current_extent);

        caps.current_extent = vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        };
        assert_eq!(
            choose_extent(&caps, size),
            vk::Extent2D {
                width: 700,
                height: 600
            }
        );
    }

    #[test]
    fn depth_image_releases_view_image_then_memory() {
        let fake = FakeDevice::new();
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let depth = DepthImage::new(fake.api(), extent).unwrap();
        let (image, memory, view) = (depth.image, depth.memory, depth.view);
        fake.clear_calls();
        drop(depth);
        assert_eq!(
            fake.calls(),
            vec![
                Call::DestroyImageView(view),
                Call::DestroyImage(image),
                Call::FreeMemory(memory),
            ]
        );
    }

    #[test]
    fn depth_image_failure_releases_partial_state() {
        let fake = FakeDevice::new();
        fake.fail_on("bind_image_memory");
        let extent = vk::Extent2D {
            width: 4,
            height: 4,
        };
        assert!(DepthImage::new(fake.api(), extent).is_err());
        let calls = fake.calls();
        assert!(matches!(calls[calls.len() - 2], Call::DestroyImage(_)));
        assert!(matches!(calls[calls.len() - 1], Call::FreeMemory(_)));
    }

    #[test]
    fn swapchain_drop_destroys_handle() {
        let fake = FakeDevice::new();
        let api = fake.api();
        let handle = vk::SwapchainKHR::from_raw(7);
        let images = api.swapchain_images(handle).unwrap();
        let swapchain = Swapchain::from_parts(
            api,
            handle,
            images,
            vk::Format::B8G8R8A8_UNORM,
            vk::Extent2D {
                width: 8,
                height: 8,
            },
        );
        assert_eq!(swapchain.image_count(), 2);
        drop(swapchain);
        assert_eq!(fake.calls(), vec![Call::DestroySwapchain(handle)]);
    }

    fn create_info_for<'a>(families: &'a [u32; 2]) -> vk::SwapchainCreateInfoKHR<'a> {
        let caps = vk::SurfaceCapabilitiesKHR {
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        };
        swapchain_create_info(
            vk::SurfaceKHR::from_raw(3),
            &caps,
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            vk::Extent2D {
                width: 800,
                height: 600,
            },
            2,
            families,
        )
    }

    #[test]
    fn shared_family_gives_exclusive_images() {
        let families = [1, 1];
        let info = create_info_for(&families);
        assert_eq!(info.image_sharing_mode, vk::SharingMode::EXCLUSIVE);
        assert_eq!(info.queue_family_index_count, 0);
        assert_eq!(info.min_image_count, 2);
        assert_eq!(info.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(info.image_usage, vk::ImageUsageFlags::COLOR_ATTACHMENT);
        assert_eq!(info.composite_alpha, vk::CompositeAlphaFlagsKHR::OPAQUE);
        assert_eq!(info.clipped, vk::TRUE);
    }

    #[test]
    fn split_families_share_images_concurrently() {
        let families = [0, 2];
        let info = create_info_for(&families);
        assert_eq!(info.image_sharing_mode, vk::SharingMode::CONCURRENT);
        assert_eq!(info.queue_family_index_count, 2);
        let indices = unsafe { std::slice::from_raw_parts(info.p_queue_family_indices, 2) };
        assert_eq!(indices, &[0, 2]);
    }

    #[test]
    fn image_count_must_match_frame_count() {
        let images: Vec<vk::Image> = (1..=3).map(vk::Image::from_raw).collect();
        assert!(check_image_count(&images, 3).is_ok());
        let err = check_image_count(&images, 2).unwrap_err();
        assert!(matches!(err, RenderError::State(_)), "{err}");
        assert!(check_image_count(&images[..1], 2).is_err());
    }
}
