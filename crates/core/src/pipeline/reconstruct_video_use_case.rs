use std::time::Instant;

use ndarray::{concatenate, Array4, ArrayView4, Axis};

use crate::model::domain::batch_model::BatchModel;
use crate::shared::loader_error::LoaderError;
use crate::windowing::video_loader::VideoLoader;

use super::frame_metrics::RmsAccumulator;
use super::pass_logger::{NullPassLogger, PassLogger};

/// The model's output for a whole window, batch axis first, plus the RMS
/// difference to the input frames (`-1.0` if the model changed the shape).
pub struct Reconstruction {
    pub output: Array4<f32>,
    pub error: f64,
    pub batches: usize,
}

/// Feeds every batch of a loader's window through a [`BatchModel`] and
/// stitches the outputs back together in pass order.
///
/// Always runs a contiguous pass: no shuffling, no overlap, no skipping,
/// regardless of the loader's configuration.
pub struct ReconstructVideoUseCase {
    model: Box<dyn BatchModel>,
    logger: Box<dyn PassLogger>,
}

impl ReconstructVideoUseCase {
    pub fn new(model: Box<dyn BatchModel>, logger: Option<Box<dyn PassLogger>>) -> Self {
        Self {
            model,
            logger: logger.unwrap_or_else(|| Box::new(NullPassLogger)),
        }
    }

    pub fn execute(&mut self, loader: &mut VideoLoader) -> Result<Reconstruction, LoaderError> {
        let plan = loader.plan().non_overlapping();
        let total = plan.span_frames.div_ceil(plan.batch_size);
        let descriptor = loader.descriptor().clone();

        let mut outputs = Vec::with_capacity(total);
        let mut rms = RmsAccumulator::default();
        let mut pass = loader.contiguous_pass()?;

        loop {
            let load_start = Instant::now();
            let Some(item) = pass.next() else {
                break;
            };
            let input = item.into_batch().to_array()?;
            self.logger.timing("load", elapsed_ms(load_start));

            let batch = outputs.len();
            let model_start = Instant::now();
            let output = self
                .model
                .apply(input.clone())
                .map_err(|source| LoaderError::Model { batch, source })?;
            self.logger.timing("model", elapsed_ms(model_start));

            let batch_rms = rms.add(input.view(), output.view());
            self.logger.metric("rms", batch_rms);
            outputs.push(output);
            self.logger.progress(outputs.len(), total);
        }
        drop(pass);

        let output = if outputs.is_empty() {
            Array4::zeros((
                0,
                descriptor.output_height() as usize,
                descriptor.output_width() as usize,
                descriptor.output_channels() as usize,
            ))
        } else {
            let views: Vec<ArrayView4<'_, f32>> = outputs.iter().map(|o| o.view()).collect();
            concatenate(Axis(0), &views).map_err(|e| LoaderError::Model {
                batch: outputs.len() - 1,
                source: Box::new(e),
            })?
        };

        self.logger.info(&format!(
            "Reconstructed {} frames in {} batches",
            output.len_of(Axis(0)),
            outputs.len()
        ));
        self.logger.summary();

        Ok(Reconstruction {
            output,
            error: rms.value(),
            batches: outputs.len(),
        })
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
