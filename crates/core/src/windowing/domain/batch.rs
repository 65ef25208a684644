use ndarray::{Array4, ArrayView4, Axis};

use crate::shared::frame::Frame;
use crate::shared::loader_error::LoaderError;

/// An ordered run of transformed frames.
///
/// Holds `batch_size` frames except, possibly, at the end of a pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    frames: Vec<Frame>,
}

impl Batch {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.frames.iter().map(Frame::index).collect()
    }

    /// `[batch, height, width, channels]`, taken from the first frame.
    pub fn shape(&self) -> [usize; 4] {
        match self.frames.first() {
            Some(frame) => {
                let (h, w, c) = frame.shape();
                [self.frames.len(), h, w, c]
            }
            None => [0, 0, 0, 0],
        }
    }

    /// Splits off the last frame as a prediction target.
    pub fn split_next_frame(mut self) -> Option<(Batch, Frame)> {
        let target = self.frames.pop()?;
        Some((self, target))
    }

    pub fn to_array(&self) -> Result<Array4<f32>, LoaderError> {
        let mut buffer = Array4::<f32>::zeros(self.shape());
        self.fill_array(&mut buffer)?;
        Ok(buffer)
    }

    /// Copies pixel values into a caller-owned buffer so it can be reused
    /// across batches.
    pub fn fill_array(&self, buffer: &mut Array4<f32>) -> Result<(), LoaderError> {
        let expected = self.shape();
        if buffer.shape() != &expected[..] {
            return Err(LoaderError::BufferShape {
                expected,
                actual: buffer.shape().to_vec(),
            });
        }

        for (frame, mut slot) in self.frames.iter().zip(buffer.axis_iter_mut(Axis(0))) {
            let (h, w, c) = frame.shape();
            if [h, w, c][..] != expected[1..] {
                return Err(LoaderError::BufferShape {
                    expected,
                    actual: vec![expected[0], h, w, c],
                });
            }
            slot.iter_mut()
                .zip(frame.data())
                .for_each(|(dst, &src)| *dst = src as f32);
        }
        Ok(())
    }
}

impl From<Vec<Frame>> for Batch {
    fn from(frames: Vec<Frame>) -> Self {
        Self::new(frames)
    }
}

/// Turns a float buffer back into frames, rounding and clipping each value
/// to `[0, 255]`. Frames are numbered from `first_index`.
pub fn frames_from_array(buffer: ArrayView4<'_, f32>, first_index: usize) -> Vec<Frame> {
    let (_, h, w, c) = buffer.dim();
    buffer
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(i, slot)| {
            let data = slot.iter().map(|&v| to_pixel(v)).collect();
            Frame::new(data, w as u32, h as u32, c as u8, first_index + i)
        })
        .collect()
}

fn to_pixel(value: f32) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::s;

    fn batch(indices: &[usize], w: u32, h: u32, c: u8) -> Batch {
        indices
            .iter()
            .map(|&i| Frame::filled(i as u8, w, h, c, i))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_shape_is_batch_height_width_channels() {
        assert_eq!(batch(&[0, 1, 2], 4, 2, 3).shape(), [3, 2, 4, 3]);
        assert_eq!(Batch::default().shape(), [0, 0, 0, 0]);
    }

    #[test]
    fn test_to_array_copies_pixels_in_order() {
        let array = batch(&[5, 9], 3, 2, 1).to_array().unwrap();
        assert_eq!(array.shape(), &[2, 2, 3, 1]);
        assert_relative_eq!(array[[0, 1, 2, 0]], 5.0);
        assert_relative_eq!(array[[1, 0, 0, 0]], 9.0);
    }

    #[test]
    fn test_fill_array_reuses_buffer() {
        let mut buffer = Array4::<f32>::from_elem((2, 2, 2, 3), -1.0);
        batch(&[1, 2], 2, 2, 3).fill_array(&mut buffer).unwrap();
        assert!(buffer.slice(s![0, .., .., ..]).iter().all(|&v| v == 1.0));
        assert!(buffer.slice(s![1, .., .., ..]).iter().all(|&v| v == 2.0));

        batch(&[7, 8], 2, 2, 3).fill_array(&mut buffer).unwrap();
        assert_relative_eq!(buffer[[1, 1, 1, 2]], 8.0);
    }

    #[test]
    fn test_fill_array_rejects_wrong_buffer_shape() {
        let mut buffer = Array4::<f32>::zeros((3, 2, 2, 3));
        let err = batch(&[1, 2], 2, 2, 3).fill_array(&mut buffer).unwrap_err();
        match err {
            LoaderError::BufferShape { expected, actual } => {
                assert_eq!(expected, [2, 2, 2, 3]);
                assert_eq!(actual, vec![3, 2, 2, 3]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mixed_geometry_is_rejected() {
        let frames = vec![Frame::filled(0, 2, 2, 3, 0), Frame::filled(0, 2, 2, 1, 1)];
        assert!(Batch::new(frames).to_array().is_err());
    }

    #[test]
    fn test_split_next_frame_takes_last_as_target() {
        let (context, target) = batch(&[3, 4, 5, 6], 1, 1, 1).split_next_frame().unwrap();
        assert_eq!(context.indices(), vec![3, 4, 5]);
        assert_eq!(target.index(), 6);
        assert!(Batch::default().split_next_frame().is_none());
    }

    #[test]
    fn test_frames_from_array_rounds_and_clips() {
        let mut buffer = Array4::<f32>::zeros((2, 1, 2, 1));
        buffer[[0, 0, 0, 0]] = -12.0;
        buffer[[0, 0, 1, 0]] = 300.0;
        buffer[[1, 0, 0, 0]] = 127.6;
        buffer[[1, 0, 1, 0]] = f32::NAN;

        let frames = frames_from_array(buffer.view(), 10);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data(), &[0, 255]);
        assert_eq!(frames[1].data(), &[128, 0]);
        assert_eq!(frames[1].index(), 11);
        assert_eq!(frames[0].shape(), (1, 2, 1));
    }
}
