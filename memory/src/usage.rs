//! Usage flags and creation info for resources requested from the allocator.

bitflags! {
    /// Buffer usage flags.
    /// Bit values match `VkBufferUsageFlagBits`.
    #[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
    pub struct BufferUsage: u32 {
        /// Buffer can be the destination of transfer commands.
        const TRANSFER_DST = 0x00000002;

        /// Buffer can back a uniform buffer descriptor.
        const UNIFORM = 0x00000010;

        /// Buffer can back a storage buffer descriptor.
        const STORAGE = 0x00000020;
    }
}

bitflags! {
    /// Image usage flags.
    /// Bit values match `VkImageUsageFlagBits`.
    #[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
    pub struct ImageUsage: u32 {
        /// Image can be the destination of transfer commands.
        const TRANSFER_DST = 0x00000002;

        /// Image can be sampled from shaders.
        const SAMPLED = 0x00000004;

        /// Image can be read and written from shaders.
        const STORAGE = 0x00000008;
    }
}

/// Formats prism creates images with.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageFormat {
    Rgba8Unorm,
    Rgba8Srgb,
    Bgra8Unorm,
    R32Sfloat,
    Rgba16Sfloat,
    Rgba32Sfloat,
}

impl ImageFormat {
    /// Size of a single texel in bytes.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            ImageFormat::Rgba8Unorm | ImageFormat::Rgba8Srgb | ImageFormat::Bgra8Unorm => 4,
            ImageFormat::R32Sfloat => 4,
            ImageFormat::Rgba16Sfloat => 8,
            ImageFormat::Rgba32Sfloat => 16,
        }
    }
}

/// Creation info for a 2D image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageInfo {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: ImageFormat,
    /// How the image will be used.
    pub usage: ImageUsage,
}

impl ImageInfo {
    /// Number of bytes a full upload of the image takes.
    pub fn data_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.format.bytes_per_pixel() as u64
    }

    /// Data of an image filled with one color.
    /// Color bytes are repeated to fill texels wider than four bytes.
    pub fn solid(&self, color: [u8; 4]) -> Vec<u8> {
        let texel: Vec<u8> = color
            .iter()
            .cycle()
            .take(self.format.bytes_per_pixel() as usize)
            .cloned()
            .collect();
        texel.repeat((self.width * self.height) as usize)
    }
}

impl Default for ImageInfo {
    fn default() -> Self {
        ImageInfo {
            width: 64,
            height: 64,
            format: ImageFormat::Rgba8Unorm,
            usage: ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn solid_fill_matches_data_size() {
        let info = ImageInfo {
            width: 2,
            height: 3,
            ..ImageInfo::default()
        };
        let data = info.solid([255, 0, 255, 255]);
        assert_eq!(data.len() as u64, info.data_size());
        assert_eq!(&data[4..8], &[255, 0, 255, 255]);

        let wide = ImageInfo {
            format: ImageFormat::Rgba16Sfloat,
            ..info
        };
        assert_eq!(wide.solid([1, 2, 3, 4]).len() as u64, wide.data_size());
    }
}
