//! Resize engine: target-box math and Lanczos3 resampling of [`RawImage`]s.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, Rgb, Rgba};

use crate::codec::{MAX_WEBP_DIMENSION, PixelLayout, RawImage};
use crate::error::{ConvertError, Result};

/// Compute the output size for `src` given an optional `target` box.
///
/// With `lock_aspect` the source is scaled uniformly to fit inside the box,
/// so one axis may come out smaller than the target. Without it the target
/// is used as-is. Both axes of the result are at least 1.
pub fn fit_dimensions(
    src: (u32, u32),
    target: Option<(u32, u32)>,
    lock_aspect: bool,
) -> Result<(u32, u32)> {
    let Some((target_w, target_h)) = target else {
        return Ok(src);
    };

    if target_w == 0 || target_h == 0 {
        return Err(ConvertError::InvalidDimensions {
            width: target_w,
            height: target_h,
        });
    }

    if !lock_aspect {
        return Ok((target_w, target_h));
    }

    let (src_w, src_h) = src;
    if src_w == 0 || src_h == 0 {
        return Err(ConvertError::InvalidDimensions {
            width: src_w,
            height: src_h,
        });
    }

    let scale = (target_w as f64 / src_w as f64).min(target_h as f64 / src_h as f64);
    let new_w = ((src_w as f64 * scale).round() as u32).clamp(1, target_w);
    let new_h = ((src_h as f64 * scale).round() as u32).clamp(1, target_h);

    Ok((new_w, new_h))
}

/// Resize `image` according to `target` and `lock_aspect`.
///
/// Returns the input untouched when there is no target or the computed size
/// equals the current one. A computed size past the WebP limit fails with
/// `EncodeFailed` before any pixel buffer is allocated.
pub fn resize(image: RawImage, target: Option<(u32, u32)>, lock_aspect: bool) -> Result<RawImage> {
    let (new_w, new_h) = fit_dimensions(image.dimensions(), target, lock_aspect)?;

    if (new_w, new_h) == image.dimensions() {
        return Ok(image);
    }

    if new_w > MAX_WEBP_DIMENSION || new_h > MAX_WEBP_DIMENSION {
        return Err(ConvertError::encode(format!(
            "resize target {new_w}x{new_h} exceeds the WebP limit of {MAX_WEBP_DIMENSION}px per side"
        )));
    }

    log::debug!(
        "Resizing image from {}x{} to {}x{}",
        image.width(),
        image.height(),
        new_w,
        new_h
    );

    match image.layout() {
        PixelLayout::Rgb => resample::<Rgb<u8>>(image, new_w, new_h),
        PixelLayout::Rgba => resample::<Rgba<u8>>(image, new_w, new_h),
    }
}

fn resample<P>(image: RawImage, new_w: u32, new_h: u32) -> Result<RawImage>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (width, height) = image.dimensions();
    let layout = image.layout();

    let buffer: ImageBuffer<P, Vec<u8>> = ImageBuffer::from_raw(width, height, image.into_bytes())
        .ok_or_else(|| ConvertError::decode("Pixel buffer does not match image dimensions"))?;

    let resized = imageops::resize(&buffer, new_w, new_h, FilterType::Lanczos3);
    RawImage::new(new_w, new_h, layout, resized.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RawImage {
        let data = (0..width * height)
            .flat_map(|i| {
                let v = (i % 256) as u8;
                [v, v.wrapping_mul(3), 255 - v]
            })
            .collect();
        RawImage::new(width, height, PixelLayout::Rgb, data).unwrap()
    }

    #[test]
    fn no_target_is_identity() {
        assert_eq!(fit_dimensions((640, 480), None, true).unwrap(), (640, 480));
        let img = gradient(8, 6);
        let out = resize(img.clone(), None, false).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn exact_target_ignores_proportions() {
        assert_eq!(
            fit_dimensions((640, 480), Some((100, 300)), false).unwrap(),
            (100, 300)
        );
        let out = resize(gradient(16, 8), Some((5, 20)), false).unwrap();
        assert_eq!(out.dimensions(), (5, 20));
        assert_eq!(out.as_bytes().len(), 5 * 20 * 3);
    }

    #[test]
    fn locked_aspect_fits_inside_box() {
        // width-bound
        assert_eq!(
            fit_dimensions((1920, 1080), Some((800, 800)), true).unwrap(),
            (800, 450)
        );
        // height-bound
        assert_eq!(
            fit_dimensions((1000, 2000), Some((800, 500)), true).unwrap(),
            (250, 500)
        );
        // upscaling is allowed when the box is larger
        assert_eq!(
            fit_dimensions((100, 50), Some((400, 400)), true).unwrap(),
            (400, 200)
        );
    }

    #[test]
    fn locked_aspect_property_holds_over_a_grid() {
        for &src in &[(1u32, 1u32), (3, 7), (640, 480), (1024, 17), (5000, 3)] {
            for &target in &[(1u32, 1u32), (10, 10), (33, 250), (800, 600), (7, 4000)] {
                let (w, h) = fit_dimensions(src, Some(target), true).unwrap();
                assert!(w >= 1 && h >= 1);
                assert!(w <= target.0 && h <= target.1, "{src:?} -> {target:?} gave {w}x{h}");

                // one axis touches the box, the other stays within a pixel of the ideal ratio
                let ideal_h = w as f64 * src.1 as f64 / src.0 as f64;
                let ideal_w = h as f64 * src.0 as f64 / src.1 as f64;
                assert!(
                    (ideal_h - h as f64).abs() <= 1.0 || (ideal_w - w as f64).abs() <= 1.0,
                    "{src:?} -> {target:?} gave {w}x{h}"
                );
            }
        }
    }

    #[test]
    fn tiny_results_never_collapse_to_zero() {
        assert_eq!(
            fit_dimensions((10_000, 10), Some((100, 100)), true).unwrap(),
            (100, 1)
        );
    }

    #[test]
    fn zero_target_is_rejected() {
        assert!(matches!(
            fit_dimensions((10, 10), Some((0, 10)), false),
            Err(ConvertError::InvalidDimensions { width: 0, height: 10 })
        ));
        assert!(matches!(
            resize(gradient(4, 4), Some((4, 0)), true),
            Err(ConvertError::InvalidDimensions { width: 4, height: 0 })
        ));
    }

    #[test]
    fn same_size_skips_resampling() {
        let img = gradient(20, 10);
        let out = resize(img.clone(), Some((40, 10)), true).unwrap();
        assert_eq!(out, img);
        let out = resize(img.clone(), Some((20, 10)), false).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn rgba_layout_survives_resampling() {
        let img = RawImage::new(6, 6, PixelLayout::Rgba, vec![200; 6 * 6 * 4]).unwrap();
        let out = resize(img, Some((3, 3)), true).unwrap();
        assert_eq!(out.layout(), PixelLayout::Rgba);
        assert_eq!(out.as_bytes().len(), 3 * 3 * 4);
    }

    #[test]
    fn targets_past_the_webp_limit_fail_before_resampling() {
        let err = resize(gradient(4, 4), Some((u32::MAX, u32::MAX)), false).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::EncodeFailed);

        let err = resize(gradient(4, 4), Some((20_000, 20_000)), true).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::EncodeFailed);

        let edge = MAX_WEBP_DIMENSION;
        assert_eq!(fit_dimensions((4, 4), Some((edge, edge)), true).unwrap(), (edge, edge));
    }
}
