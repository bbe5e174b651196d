use anyhow::{Result, anyhow, ensure};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPackedImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgba, yuyv422_to_rgba,
};
use zune_jpeg::{
    JpegDecoder,
    zune_core::{bytestream::ZCursor, colorspace::ColorSpace, options::DecoderOptions},
};

#[derive(Debug)]
pub struct RgbaFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Pixel layouts a capture device can hand us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Nv12,
    Yuyv,
    Mjpeg,
    Rgb,
    Bgr,
    Gray,
}

#[cfg(feature = "camera-nokhwa")]
impl From<nokhwa::utils::FrameFormat> for PixelLayout {
    fn from(format: nokhwa::utils::FrameFormat) -> Self {
        use nokhwa::utils::FrameFormat;
        match format {
            FrameFormat::NV12 => PixelLayout::Nv12,
            FrameFormat::YUYV => PixelLayout::Yuyv,
            FrameFormat::MJPEG => PixelLayout::Mjpeg,
            FrameFormat::RAWRGB => PixelLayout::Rgb,
            FrameFormat::RAWBGR => PixelLayout::Bgr,
            FrameFormat::GRAY => PixelLayout::Gray,
        }
    }
}

#[cfg(feature = "camera-nokhwa")]
pub fn convert_camera_frame(buffer: &nokhwa::Buffer) -> Result<RgbaFrame> {
    let resolution = buffer.resolution();
    to_rgba(
        buffer.source_frame_format().into(),
        buffer.buffer(),
        resolution.width_x,
        resolution.height_y,
    )
}

pub fn to_rgba(layout: PixelLayout, data: &[u8], width: u32, height: u32) -> Result<RgbaFrame> {
    let rgba = match layout {
        PixelLayout::Nv12 => nv12_to_rgba(data, width, height)?,
        PixelLayout::Yuyv => yuyv_to_rgba(data, width, height)?,
        PixelLayout::Mjpeg => return mjpeg_to_rgba(data),
        PixelLayout::Rgb => packed_to_rgba(data, width, height, Packing::Rgb)?,
        PixelLayout::Bgr => packed_to_rgba(data, width, height, Packing::Bgr)?,
        PixelLayout::Gray => packed_to_rgba(data, width, height, Packing::Gray)?,
    };

    Ok(RgbaFrame {
        rgba,
        width,
        height,
    })
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn nv12_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let y_len = pixel_count(width, height);
    let uv_len = y_len / 2;
    ensure!(
        data.len() >= y_len + uv_len,
        "NV12 buffer too small: got {}, expected {}",
        data.len(),
        y_len + uv_len
    );

    let image = YuvBiPlanarImage {
        y_plane: &data[..y_len],
        y_stride: width,
        uv_plane: &data[y_len..y_len + uv_len],
        uv_stride: width,
        width,
        height,
    };

    let mut rgba = vec![0u8; y_len * 4];
    yuv_nv12_to_rgba(
        &image,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12→RGBA failed: {err:?}"))?;

    Ok(rgba)
}

fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let expected = pixel_count(width, height) * 2;
    ensure!(
        data.len() >= expected,
        "YUYV buffer too small: got {}, expected {}",
        data.len(),
        expected
    );

    let packed = YuvPackedImage {
        yuy: data,
        yuy_stride: width * 2,
        width,
        height,
    };

    let mut rgba = vec![0u8; pixel_count(width, height) * 4];
    yuyv422_to_rgba(
        &packed,
        &mut rgba,
        width * 4,
        YuvRange::Full,
        YuvStandardMatrix::Bt709,
    )
    .map_err(|err| anyhow!("YUYV422→RGBA failed: {err:?}"))?;

    Ok(rgba)
}

// MJPEG frames carry their own dimensions; trust the decoder over the driver.
fn mjpeg_to_rgba(data: &[u8]) -> Result<RgbaFrame> {
    let options = DecoderOptions::default().jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(ZCursor::new(data), options);
    let rgba = decoder
        .decode()
        .map_err(|err| anyhow!("MJPEG decode failed: {err:?}"))?;
    let info = decoder
        .info()
        .ok_or_else(|| anyhow!("MJPEG decoder returned no image info"))?;

    let width = u32::try_from(info.width).map_err(|_| anyhow!("MJPEG width out of range"))?;
    let height = u32::try_from(info.height).map_err(|_| anyhow!("MJPEG height out of range"))?;
    let expected = pixel_count(width, height) * 4;
    ensure!(
        rgba.len() >= expected,
        "MJPEG decode produced too few bytes: got {}, expected {}",
        rgba.len(),
        expected
    );

    Ok(RgbaFrame {
        rgba,
        width,
        height,
    })
}

#[derive(Clone, Copy)]
enum Packing {
    Rgb,
    Bgr,
    Gray,
}

impl Packing {
    fn bytes_per_pixel(self) -> usize {
        match self {
            Packing::Rgb | Packing::Bgr => 3,
            Packing::Gray => 1,
        }
    }
}

fn packed_to_rgba(data: &[u8], width: u32, height: u32, packing: Packing) -> Result<Vec<u8>> {
    let bpp = packing.bytes_per_pixel();
    let expected = pixel_count(width, height) * bpp;
    ensure!(
        data.len() >= expected,
        "packed buffer too small: got {}, expected {}",
        data.len(),
        expected
    );

    let mut rgba = vec![0u8; pixel_count(width, height) * 4];
    rgba.par_chunks_mut(4)
        .zip(data[..expected].par_chunks_exact(bpp))
        .for_each(|(dst, src)| {
            let [r, g, b] = match packing {
                Packing::Rgb => [src[0], src[1], src[2]],
                Packing::Bgr => [src[2], src[1], src[0]],
                Packing::Gray => [src[0], src[0], src[0]],
            };
            dst.copy_from_slice(&[r, g, b, 255]);
        });

    Ok(rgba)
}
