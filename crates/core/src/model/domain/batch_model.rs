use ndarray::{Array4, ArrayD};

/// Transforms a whole batch in one call.
///
/// Input and output use the `[batch, height, width, channels]` layout. The
/// output batch axis must match the input's; the other axes may differ.
pub trait BatchModel: Send {
    fn apply(&mut self, batch: Array4<f32>) -> Result<Array4<f32>, Box<dyn std::error::Error>>;
}

/// A model split into an encoder and a decoder.
///
/// The latent layout is whatever the encoder produces, as long as its first
/// axis is the batch axis.
pub trait Autoencoder: Send {
    fn encode(&mut self, batch: Array4<f32>) -> Result<ArrayD<f32>, Box<dyn std::error::Error>>;

    fn decode(&mut self, latent: ArrayD<f32>) -> Result<Array4<f32>, Box<dyn std::error::Error>>;
}

/// Runs an [`Autoencoder`] end to end as a [`BatchModel`].
pub struct EncodeDecode<A> {
    autoencoder: A,
}

impl<A: Autoencoder> EncodeDecode<A> {
    pub fn new(autoencoder: A) -> Self {
        Self { autoencoder }
    }

    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.autoencoder
    }
}

impl<A: Autoencoder> BatchModel for EncodeDecode<A> {
    fn apply(&mut self, batch: Array4<f32>) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
        let latent = self.autoencoder.encode(batch)?;
        self.autoencoder.decode(latent)
    }
}
