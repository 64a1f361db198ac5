// SYNOID Native Pictures
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Still-image re-encoding with the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageFormat, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use super::geometry::Geometry;
use crate::error::{ForgeError, ForgeResult, IoContext};
use crate::forge::request::{extension_of, has_extension};

/// Targets that cannot carry transparency.
const OPAQUE_TARGETS: &[&str] = &["jpg", "jpeg", "bmp"];

pub const ICON_SIZE: u32 = 256;

/// Composite onto a white background.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as f32 / 255.0;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

fn format_for(output: &Path) -> ForgeResult<ImageFormat> {
    ImageFormat::from_path(output)
        .map_err(|_| ForgeError::config(format!("unsupported image target {}", output.display())))
}

fn write_jpeg(img: &RgbImage, output: &Path, quality: u8) -> ForgeResult<()> {
    let file = File::create(output).io_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    encoder.encode_image(img)?;
    Ok(())
}

/// Re-encode `input` into the format implied by `output`'s extension.
pub fn convert_file(input: &Path, output: &Path, jpeg_quality: u8, target_ext: &str) -> ForgeResult<()> {
    let img = image::open(input)?;
    let target = target_ext.to_ascii_lowercase();

    if target == "ico" {
        let icon = img.resize_exact(ICON_SIZE, ICON_SIZE, imageops::FilterType::Lanczos3);
        icon.save_with_format(output, ImageFormat::Ico)?;
    } else if OPAQUE_TARGETS.contains(&target.as_str()) {
        let rgb = if img.color().has_alpha() {
            flatten_on_white(&img)
        } else {
            img.to_rgb8()
        };
        if target == "bmp" {
            rgb.save_with_format(output, ImageFormat::Bmp)?;
        } else {
            write_jpeg(&rgb, output, jpeg_quality)?;
        }
    } else {
        img.save_with_format(output, format_for(Path::new(&format!("x.{}", target)))?)?;
    }

    info!("[NATIVE] Image {} → {}", input.display(), output.display());
    Ok(())
}

pub fn resize_file(input: &Path, output: &Path, geometry: &Geometry) -> ForgeResult<()> {
    let src = image::open(input)?.to_rgb8();
    let shaped = geometry.apply(&src);
    if has_extension(output, &["jpg", "jpeg"]) {
        write_jpeg(&shaped, output, 95)?;
    } else {
        shaped.save_with_format(output, format_for(Path::new(&format!("x.{}", extension_of(output))))?)?;
    }
    Ok(())
}
