use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};

use crate::shared::frame::Frame;

/// Per-frame pipeline applied to everything the loader emits.
///
/// Channel reduction runs before resizing so the resize filter only has one
/// plane to work on. Frames keep their source index.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTransform {
    target_size: Option<(u32, u32)>,
    grayscale: bool,
}

impl FrameTransform {
    pub fn new(target_size: Option<(u32, u32)>, grayscale: bool) -> Self {
        Self {
            target_size,
            grayscale,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.target_size.is_none() && !self.grayscale
    }

    pub fn apply(&self, frame: Frame) -> Frame {
        if self.is_identity() {
            return frame;
        }

        let index = frame.index();
        let (width, height) = (frame.width(), frame.height());
        let reduce = self.grayscale && frame.channels() == 3;
        let resize = self
            .target_size
            .filter(|&size| size != (width, height));

        match (frame.channels(), reduce) {
            (3, true) => {
                let rgb = RgbImage::from_raw(width, height, frame.into_data())
                    .expect("Frame data length must match dimensions");
                let gray = imageops::grayscale(&rgb);
                gray_frame(resize_gray(gray, resize), index)
            }
            (3, false) => match resize {
                Some((w, h)) => {
                    let rgb = RgbImage::from_raw(width, height, frame.into_data())
                        .expect("Frame data length must match dimensions");
                    let resized = imageops::resize(&rgb, w, h, FilterType::Triangle);
                    Frame::new(resized.into_raw(), w, h, 3, index)
                }
                None => frame,
            },
            (1, _) => match resize {
                Some(_) => {
                    let gray = GrayImage::from_raw(width, height, frame.into_data())
                        .expect("Frame data length must match dimensions");
                    gray_frame(resize_gray(gray, resize), index)
                }
                None => frame,
            },
            _ => frame,
        }
    }
}

fn resize_gray(gray: GrayImage, size: Option<(u32, u32)>) -> GrayImage {
    match size {
        Some((w, h)) => imageops::resize(&gray, w, h, FilterType::Triangle),
        None => gray,
    }
}

fn gray_frame(gray: GrayImage, index: usize) -> Frame {
    let (w, h) = gray.dimensions();
    Frame::new(gray.into_raw(), w, h, 1, index)
}
