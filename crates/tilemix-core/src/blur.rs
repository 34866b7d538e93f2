// crates/tilemix-core/src/blur.rs
//
// Optional post-processing pass over a reassembled frame. The Gaussian
// itself comes from the `image` crate; this module only bridges the Frame
// byte grid to it and translates the classic odd kernel-size knob into the
// sigma that filter expects.

use crate::frame::Frame;

/// Default kernel size for the softening pass (matches the 41-tap look of
/// the original mosaic renderers).
pub const DEFAULT_BLUR_KERNEL: u32 = 41;

/// Kernel size → Gaussian sigma, using the same rule OpenCV applies when
/// only a kernel size is given: `0.3·((k−1)·0.5 − 1) + 0.8`.
fn sigma_for_kernel(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Blur `frame` with a symmetric Gaussian of the given kernel size.
/// Dimension-preserving and tolerant of any frame size the shuffle can
/// produce; a kernel of 0 or 1 is a pass-through.
pub fn blur_frame(frame: &Frame, kernel: u32) -> Frame {
    if kernel <= 1 || frame.width == 0 || frame.height == 0 {
        return frame.clone();
    }
    let Some(img) = image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
    else {
        // Can't happen while Frame's length invariant holds; degrade to a copy.
        return frame.clone();
    };
    let blurred = image::imageops::blur(&img, sigma_for_kernel(kernel));
    Frame::new(frame.width, frame.height, blurred.into_raw())
}
