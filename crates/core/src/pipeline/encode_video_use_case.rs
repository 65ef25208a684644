use std::time::Instant;

use ndarray::{concatenate, ArrayD, ArrayViewD, Axis, IxDyn};

use crate::model::domain::batch_model::Autoencoder;
use crate::shared::loader_error::LoaderError;
use crate::windowing::video_loader::VideoLoader;

use super::pass_logger::{NullPassLogger, PassLogger};
use super::reconstruct_video_use_case::elapsed_ms;

/// Encodes a loader's whole window and returns the latent codes of every
/// batch concatenated along the batch axis.
///
/// Uses the same contiguous pass as [`super::reconstruct_video_use_case::ReconstructVideoUseCase`].
pub struct EncodeVideoUseCase {
    autoencoder: Box<dyn Autoencoder>,
    logger: Box<dyn PassLogger>,
}

impl EncodeVideoUseCase {
    pub fn new(autoencoder: Box<dyn Autoencoder>, logger: Option<Box<dyn PassLogger>>) -> Self {
        Self {
            autoencoder,
            logger: logger.unwrap_or_else(|| Box::new(NullPassLogger)),
        }
    }

    pub fn execute(&mut self, loader: &mut VideoLoader) -> Result<ArrayD<f32>, LoaderError> {
        let plan = loader.plan().non_overlapping();
        let total = plan.span_frames.div_ceil(plan.batch_size);

        let mut latents: Vec<ArrayD<f32>> = Vec::with_capacity(total);
        for item in loader.contiguous_pass()? {
            let input = item.into_batch().to_array()?;
            let batch = latents.len();

            let start = Instant::now();
            let latent = self
                .autoencoder
                .encode(input)
                .map_err(|source| LoaderError::Model { batch, source })?;
            self.logger.timing("encode", elapsed_ms(start));

            latents.push(latent);
            self.logger.progress(latents.len(), total);
        }

        if latents.is_empty() {
            return Ok(ArrayD::zeros(IxDyn(&[0])));
        }

        let views: Vec<ArrayViewD<'_, f32>> = latents.iter().map(|l| l.view()).collect();
        let codes = concatenate(Axis(0), &views).map_err(|e| LoaderError::Model {
            batch: latents.len() - 1,
            source: Box::new(e),
        })?;

        self.logger.info(&format!(
            "Encoded {} frames into latent shape {:?}",
            codes.len_of(Axis(0)),
            codes.shape()
        ));
        self.logger.summary();
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::infrastructure::memory_source::MemorySource;
    use crate::windowing::loader_config::LoaderConfig;
    use approx::assert_relative_eq;
    use ndarray::{Array2, Array4, Ix2};
    use std::path::Path;

    /// Latent row per frame holding its first pixel. Successive calls use
    /// the listed widths so mismatches can be provoked.
    struct FirstPixelEncoder {
        widths: Vec<usize>,
        calls: usize,
    }

    impl Autoencoder for FirstPixelEncoder {
        fn encode(&mut self, batch: Array4<f32>) -> Result<ArrayD<f32>, Box<dyn std::error::Error>> {
            let width = self.widths[self.calls.min(self.widths.len() - 1)];
            self.calls += 1;
            let n = batch.len_of(Axis(0));
            let mut latent = Array2::zeros((n, width));
            for i in 0..n {
                latent[[i, 0]] = batch[[i, 0, 0, 0]];
            }
            Ok(latent.into_dyn())
        }

        fn decode(&mut self, _latent: ArrayD<f32>) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
            Err("decoder not used".into())
        }
    }

    fn loader(count: usize, config: LoaderConfig) -> VideoLoader {
        let source = MemorySource::numbered(count, 2, 2, 1, 25.0);
        VideoLoader::open(Box::new(source), Path::new("clip.mp4"), config).unwrap()
    }

    #[test]
    fn test_latents_concatenated_in_pass_order() {
        let encoder = FirstPixelEncoder {
            widths: vec![3],
            calls: 0,
        };
        let mut use_case = EncodeVideoUseCase::new(Box::new(encoder), None);
        let mut loader = loader(12, LoaderConfig::new(4).with_random_order(true));

        let codes = use_case
            .execute(&mut loader)
            .unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap();
        assert_eq!(codes.dim(), (12, 3));
        for i in 0..12 {
            assert_relative_eq!(codes[[i, 0]], i as f32);
        }
    }

    #[test]
    fn test_inconsistent_latents_are_model_error() {
        let encoder = FirstPixelEncoder {
            widths: vec![3, 2],
            calls: 0,
        };
        let mut use_case = EncodeVideoUseCase::new(Box::new(encoder), None);
        let mut loader = loader(8, LoaderConfig::new(4));
        assert!(matches!(
            use_case.execute(&mut loader),
            Err(LoaderError::Model { .. })
        ));
    }

    #[test]
    fn test_empty_window_has_no_latents() {
        let encoder = FirstPixelEncoder {
            widths: vec![3],
            calls: 0,
        };
        let mut use_case = EncodeVideoUseCase::new(Box::new(encoder), None);
        let mut loader = loader(8, LoaderConfig::new(4).with_start_frame(8));
        assert_eq!(use_case.execute(&mut loader).unwrap().len(), 0);
    }
}
