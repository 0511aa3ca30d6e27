//! Raw video frames pulled from a bound track, and their decoding to images

use crate::error::{Error, Result};
use bytes::Bytes;
use image::{DynamicImage, ImageBuffer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Motion JPEG (compressed, recommended for high resolution)
    Mjpeg,
    /// YUYV 4:2:2 (uncompressed, better compatibility)
    Yuyv,
    /// RGB24 (uncompressed, high bandwidth)
    Rgb24,
}

impl PixelFormat {
    /// Canonical string representation for configuration files
    pub fn as_str(self) -> &'static str {
        match self {
            PixelFormat::Mjpeg => "mjpeg",
            PixelFormat::Yuyv => "yuyv",
            PixelFormat::Rgb24 => "rgb24",
        }
    }
}

impl FromStr for PixelFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mjpeg" | "mjpg" => Ok(PixelFormat::Mjpeg),
            "yuyv" => Ok(PixelFormat::Yuyv),
            "rgb" | "rgb24" => Ok(PixelFormat::Rgb24),
            other => Err(Error::Config(format!(
                "Unknown pixel format '{other}'. Use mjpeg, yuyv, or rgb24"
            ))),
        }
    }
}

/// One captured frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Layout of `data`
    pub format: PixelFormat,
    /// Raw buffer as delivered by the device
    pub data: Bytes,
}

impl Frame {
    /// Decode the raw buffer into an image
    pub fn to_image(&self) -> Result<DynamicImage> {
        match self.format {
            PixelFormat::Mjpeg => {
                image::load_from_memory_with_format(&self.data, image::ImageFormat::Jpeg)
                    .map_err(|e| Error::Image(format!("MJPEG decode failed: {}", e)))
            }
            PixelFormat::Yuyv => self.yuyv_to_rgb(),
            PixelFormat::Rgb24 => ImageBuffer::from_raw(self.width, self.height, self.data.to_vec())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| Error::Image("RGB24 buffer too small for frame size".to_string())),
        }
    }

    /// Decode and write the frame; the image format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let image = self.to_image()?;
        image.save(path)?;
        tracing::info!(
            path = %path.display(),
            width = self.width,
            height = self.height,
            "Saved preview frame"
        );
        Ok(())
    }

    fn yuyv_to_rgb(&self) -> Result<DynamicImage> {
        let width = self.width as usize;
        let height = self.height as usize;
        if width == 0 || height == 0 {
            return Err(Error::Image("YUYV frame has no pixels".to_string()));
        }
        let yuyv = &self.data[..];
        let mut rgb = vec![0u8; width * height * 3];

        for (row, out) in rgb.chunks_exact_mut(width * 3).enumerate() {
            let line = match yuyv.get(row * width * 2..(row + 1) * width * 2) {
                Some(line) => line,
                None => break,
            };

            for (pair, px) in line.chunks_exact(4).zip(out.chunks_exact_mut(6)) {
                let u = pair[1] as i32 - 128;
                let v = pair[3] as i32 - 128;
                let (r0, g0, b0) = yuv_to_rgb(pair[0] as i32, u, v);
                let (r1, g1, b1) = yuv_to_rgb(pair[2] as i32, u, v);
                px.copy_from_slice(&[r0, g0, b0, r1, g1, b1]);
            }
        }

        ImageBuffer::from_raw(self.width, self.height, rgb)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| Error::Image("Failed to create RGB image from YUYV".to_string()))
    }
}

fn yuv_to_rgb(y: i32, u: i32, v: i32) -> (u8, u8, u8) {
    let r = (y + ((v * 1436) >> 10)).clamp(0, 255) as u8;
    let g = (y - ((u * 352 + v * 731) >> 10)).clamp(0, 255) as u8;
    let b = (y + ((u * 1814) >> 10)).clamp(0, 255) as u8;
    (r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_from_str() {
        assert_eq!("MJPEG".parse::<PixelFormat>().unwrap(), PixelFormat::Mjpeg);
        assert_eq!("yuyv".parse::<PixelFormat>().unwrap(), PixelFormat::Yuyv);
        assert_eq!("rgb".parse::<PixelFormat>().unwrap(), PixelFormat::Rgb24);
        assert!("invalid".parse::<PixelFormat>().is_err());
    }

    #[test]
    fn test_rgb24_decode() {
        let frame = Frame {
            width: 2,
            height: 1,
            format: PixelFormat::Rgb24,
            data: Bytes::from_static(&[255, 0, 0, 0, 255, 0]),
        };
        let image = frame.to_image().unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 255, 0]);
    }

    #[test]
    fn test_rgb24_short_buffer() {
        let frame = Frame {
            width: 4,
            height: 4,
            format: PixelFormat::Rgb24,
            data: Bytes::from_static(&[0; 3]),
        };
        assert!(matches!(frame.to_image(), Err(Error::Image(_))));
    }

    #[test]
    fn test_yuyv_grey_decode() {
        // Neutral chroma: every pixel comes out as its luma value.
        let frame = Frame {
            width: 2,
            height: 1,
            format: PixelFormat::Yuyv,
            data: Bytes::from_static(&[100, 128, 200, 128]),
        };
        let image = frame.to_image().unwrap().to_rgb8();
        assert_eq!(image.get_pixel(0, 0).0, [100, 100, 100]);
        assert_eq!(image.get_pixel(1, 0).0, [200, 200, 200]);
    }
}
