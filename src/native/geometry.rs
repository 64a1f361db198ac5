// SYNOID Native Geometry
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Stretch / fit / crop placement math, and its application to RGB frames
// with the `image` crate. Matches the classical filter graphs.

use image::{imageops, RgbImage};

use crate::forge::request::{Anchor, ResizeMode, ResizeParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub mode: ResizeMode,
    pub anchor: Anchor,
}

/// Where a scaled source lands. For Fit the offset is the padding on the
/// canvas; for Crop it is the top-left corner of the window in the scaled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub scaled_w: u32,
    pub scaled_h: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl From<&ResizeParams> for Geometry {
    fn from(p: &ResizeParams) -> Self {
        Self {
            width: p.width,
            height: p.height,
            mode: p.mode,
            anchor: p.anchor,
        }
    }
}

impl Geometry {
    pub fn placement(&self, src_w: u32, src_h: u32) -> Placement {
        let (tw, th) = (self.width.max(1), self.height.max(1));
        let (sw, sh) = (src_w.max(1) as f64, src_h.max(1) as f64);

        match self.mode {
            ResizeMode::Stretch => Placement { scaled_w: tw, scaled_h: th, offset_x: 0, offset_y: 0 },
            ResizeMode::Fit => {
                let ratio = (tw as f64 / sw).min(th as f64 / sh);
                let scaled_w = ((sw * ratio).round() as u32).clamp(1, tw);
                let scaled_h = ((sh * ratio).round() as u32).clamp(1, th);
                Placement {
                    scaled_w,
                    scaled_h,
                    offset_x: (tw - scaled_w) / 2,
                    offset_y: (th - scaled_h) / 2,
                }
            }
            ResizeMode::Crop => {
                let ratio = (tw as f64 / sw).max(th as f64 / sh);
                let scaled_w = ((sw * ratio).round() as u32).max(tw);
                let scaled_h = ((sh * ratio).round() as u32).max(th);
                let (offset_x, offset_y) = match self.anchor {
                    Anchor::TopLeft => (0, 0),
                    Anchor::BottomRight => (scaled_w - tw, scaled_h - th),
                    Anchor::Center => ((scaled_w - tw) / 2, (scaled_h - th) / 2),
                };
                Placement { scaled_w, scaled_h, offset_x, offset_y }
            }
        }
    }

    /// Produce a `width`×`height` frame. Fit pads with black.
    pub fn apply(&self, src: &RgbImage) -> RgbImage {
        let p = self.placement(src.width(), src.height());
        let scaled = if (p.scaled_w, p.scaled_h) == src.dimensions() {
            src.clone()
        } else {
            imageops::resize(src, p.scaled_w, p.scaled_h, imageops::FilterType::Triangle)
        };

        match self.mode {
            ResizeMode::Stretch => scaled,
            ResizeMode::Fit => {
                let mut canvas = RgbImage::new(self.width.max(1), self.height.max(1));
                imageops::replace(&mut canvas, &scaled, p.offset_x as i64, p.offset_y as i64);
                canvas
            }
            ResizeMode::Crop => {
                imageops::crop_imm(&scaled, p.offset_x, p.offset_y, self.width, self.height).to_image()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(width: u32, height: u32, mode: ResizeMode, anchor: Anchor) -> Geometry {
        Geometry { width, height, mode, anchor }
    }

    #[test]
    fn fit_letterboxes_wide_source() {
        let g = geometry(800, 600, ResizeMode::Fit, Anchor::Center);
        let p = g.placement(1600, 900);
        assert_eq!((p.scaled_w, p.scaled_h), (800, 450));
        assert_eq!((p.offset_x, p.offset_y), (0, 75));
    }

    #[test]
    fn fit_pillarboxes_tall_source() {
        let g = geometry(1920, 1080, ResizeMode::Fit, Anchor::Center);
        let p = g.placement(1080, 1920);
        assert_eq!(p.scaled_h, 1080);
        let pad = 1920 - p.scaled_w;
        assert!((p.offset_x as i64 * 2 - pad as i64).abs() <= 1);
    }

    #[test]
    fn crop_center_offsets() {
        let g = geometry(640, 640, ResizeMode::Crop, Anchor::Center);
        let p = g.placement(1920, 1080);
        assert_eq!(p.scaled_h, 640);
        assert_eq!(p.offset_x, (p.scaled_w - 640) / 2);
        assert_eq!(p.offset_y, 0);
    }

    #[test]
    fn crop_bottom_right_offsets() {
        let g = geometry(100, 100, ResizeMode::Crop, Anchor::BottomRight);
        let p = g.placement(400, 200);
        assert_eq!((p.scaled_w, p.scaled_h), (200, 100));
        assert_eq!((p.offset_x, p.offset_y), (100, 0));
    }

    #[test]
    fn apply_produces_exact_target() {
        let src = RgbImage::from_pixel(160, 90, image::Rgb([200, 10, 10]));
        for mode in [ResizeMode::Stretch, ResizeMode::Fit, ResizeMode::Crop] {
            let out = geometry(80, 60, mode, Anchor::Center).apply(&src);
            assert_eq!(out.dimensions(), (80, 60), "{:?}", mode);
        }
    }

    #[test]
    fn fit_padding_is_black() {
        let src = RgbImage::from_pixel(160, 90, image::Rgb([255, 255, 255]));
        let out = geometry(80, 60, ResizeMode::Fit, Anchor::Center).apply(&src);
        assert_eq!(out.get_pixel(40, 0), &image::Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(40, 30), &image::Rgb([255, 255, 255]));
    }
}
