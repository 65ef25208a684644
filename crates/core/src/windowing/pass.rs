use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;
use crate::windowing::domain::batch::Batch;
use crate::windowing::domain::batch_cursor::{BatchCursor, CursorState};
use crate::windowing::domain::frame_transform::FrameTransform;

/// What a pass yields per step.
#[derive(Clone, Debug, PartialEq)]
pub enum LoaderItem {
    Batch(Batch),
    /// Predict-next-frame mode: every frame but the last, and the last.
    NextFrame { context: Batch, target: Frame },
}

impl LoaderItem {
    /// The full run of frames, with a split item put back together.
    pub fn into_batch(self) -> Batch {
        match self {
            LoaderItem::Batch(batch) => batch,
            LoaderItem::NextFrame { context, target } => {
                let mut frames = context.into_frames();
                frames.push(target);
                Batch::new(frames)
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LoaderItem::Batch(batch) => batch.len(),
            LoaderItem::NextFrame { context, .. } => context.len() + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One iteration over a loader's window.
///
/// Holds the loader's source open for as long as it runs. The source is
/// released as soon as the cursor is exhausted, or when the pass is dropped.
pub struct Pass<'a> {
    source: &'a mut Box<dyn FrameSource>,
    transform: FrameTransform,
    cursor: BatchCursor,
    predict_next_frame: bool,
    source_open: bool,
    emitted: usize,
}

impl<'a> Pass<'a> {
    pub(crate) fn new(
        source: &'a mut Box<dyn FrameSource>,
        transform: FrameTransform,
        cursor: BatchCursor,
        predict_next_frame: bool,
    ) -> Self {
        Self {
            source,
            transform,
            cursor,
            predict_next_frame,
            source_open: true,
            emitted: 0,
        }
    }

    /// Batches emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.state() == CursorState::Exhausted
    }

    fn release(&mut self) {
        if self.source_open {
            self.source.close();
            self.source_open = false;
            log::debug!("Pass released source after {} batches", self.emitted);
        }
    }
}

impl Iterator for Pass<'_> {
    type Item = LoaderItem;

    fn next(&mut self) -> Option<LoaderItem> {
        let batch = self.cursor.next_batch(self.source.as_mut(), &self.transform);
        if self.is_exhausted() {
            self.release();
        }
        let batch = batch?;
        self.emitted += 1;

        if self.predict_next_frame {
            let (context, target) = batch.split_next_frame()?;
            Some(LoaderItem::NextFrame { context, target })
        } else {
            Some(LoaderItem::Batch(batch))
        }
    }
}

impl Drop for Pass<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
