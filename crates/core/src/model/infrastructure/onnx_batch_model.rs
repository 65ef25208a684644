use std::path::Path;

use ndarray::{Array4, ArrayD, Axis, Ix4};

use crate::model::domain::batch_model::{Autoencoder, BatchModel};

use super::execution_provider::{preferred_execution_providers, provider_label};

/// A [`BatchModel`] backed by a single ONNX graph with one input and one
/// output.
///
/// With `channels_first` the batch is handed to the graph as
/// `[batch, channels, height, width]` and the output is converted back.
pub struct OnnxBatchModel {
    session: ort::session::Session,
    channels_first: bool,
}

impl OnnxBatchModel {
    pub fn new(model_path: &Path, channels_first: bool) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: load_session(model_path)?,
            channels_first,
        })
    }
}

impl BatchModel for OnnxBatchModel {
    fn apply(&mut self, batch: Array4<f32>) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
        let expected = batch.len_of(Axis(0));
        let input = to_model_layout(batch, self.channels_first);
        let output = run_session(&mut self.session, input.into_dyn())?.into_dimensionality::<Ix4>()?;
        let output = from_model_layout(output, self.channels_first);
        check_batch_axis(expected, output.len_of(Axis(0)))?;
        Ok(output)
    }
}

/// An [`Autoencoder`] made of separate encoder and decoder graphs.
///
/// Built with [`OnnxAutoencoder::encoder_only`] it can only encode.
pub struct OnnxAutoencoder {
    encoder: ort::session::Session,
    decoder: Option<ort::session::Session>,
    channels_first: bool,
}

impl OnnxAutoencoder {
    pub fn new(
        encoder_path: &Path,
        decoder_path: &Path,
        channels_first: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            encoder: load_session(encoder_path)?,
            decoder: Some(load_session(decoder_path)?),
            channels_first,
        })
    }

    pub fn encoder_only(
        encoder_path: &Path,
        channels_first: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            encoder: load_session(encoder_path)?,
            decoder: None,
            channels_first,
        })
    }
}

impl Autoencoder for OnnxAutoencoder {
    fn encode(&mut self, batch: Array4<f32>) -> Result<ArrayD<f32>, Box<dyn std::error::Error>> {
        let expected = batch.len_of(Axis(0));
        let input = to_model_layout(batch, self.channels_first);
        let latent = run_session(&mut self.encoder, input.into_dyn())?;
        check_batch_axis(expected, latent.shape().first().copied().unwrap_or(0))?;
        Ok(latent)
    }

    fn decode(&mut self, latent: ArrayD<f32>) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
        let decoder = self.decoder.as_mut().ok_or("No decoder loaded")?;
        let output = run_session(decoder, latent)?.into_dimensionality::<Ix4>()?;
        Ok(from_model_layout(output, self.channels_first))
    }
}

fn load_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    log::info!(
        "Loaded model {} ({} execution provider)",
        model_path.display(),
        provider_label()
    );
    Ok(session)
}

fn run_session(
    session: &mut ort::session::Session,
    input: ArrayD<f32>,
) -> Result<ArrayD<f32>, Box<dyn std::error::Error>> {
    let input_value = ort::value::Tensor::from_array(input)?;
    let outputs = session.run(ort::inputs![input_value])?;
    if outputs.len() == 0 {
        return Err("Model produced no outputs".into());
    }
    let array = outputs[0].try_extract_array::<f32>()?;
    Ok(array.to_owned())
}

fn check_batch_axis(expected: usize, actual: usize) -> Result<(), Box<dyn std::error::Error>> {
    if expected != actual {
        return Err(format!("Model returned {actual} items for a batch of {expected}").into());
    }
    Ok(())
}

fn to_model_layout(batch: Array4<f32>, channels_first: bool) -> Array4<f32> {
    if channels_first {
        batch.permuted_axes([0, 3, 1, 2]).as_standard_layout().into_owned()
    } else {
        batch
    }
}

fn from_model_layout(batch: Array4<f32>, channels_first: bool) -> Array4<f32> {
    if channels_first {
        batch.permuted_axes([0, 2, 3, 1]).as_standard_layout().into_owned()
    } else {
        batch
    }
}
