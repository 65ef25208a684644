use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;
use crate::windowing::domain::batch::Batch;
use crate::windowing::domain::frame_transform::FrameTransform;
use crate::windowing::domain::window_plan::WindowPlan;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    Ready,
    Running,
    Exhausted,
}

/// Walks a frame order against a seekable source, one batch at a time.
///
/// Each step starts from the tail retained from the previous batch
/// (`batch_size - stride` frames), then seeks and reads fresh indices until
/// the batch is full. After every read the next `skip_frame` indices of the
/// order are dropped without touching the source.
///
/// Any seek or read failure, including end of stream, ends the pass and
/// drops the batch being built. The cursor does not own the source and
/// never closes it.
#[derive(Debug)]
pub struct BatchCursor {
    plan: WindowPlan,
    state: CursorState,
    frame_order: Vec<usize>,
    position: usize,
    retained_tail: Vec<Frame>,
    advanced: usize,
}

impl BatchCursor {
    pub fn new(plan: WindowPlan) -> Self {
        Self {
            plan,
            state: CursorState::Ready,
            frame_order: Vec::new(),
            position: 0,
            retained_tail: Vec::new(),
            advanced: 0,
        }
    }

    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Source positions consumed so far, skipped ones included.
    pub fn advanced(&self) -> usize {
        self.advanced
    }

    /// Begins a pass over `frame_order`, discarding whatever state a
    /// previous pass left behind.
    pub fn start(&mut self, frame_order: Vec<usize>) {
        log::debug!(
            "Starting pass over {} indices (batch {}, stride {}, skip {})",
            frame_order.len(),
            self.plan.batch_size,
            self.plan.stride,
            self.plan.skip_frame
        );
        self.frame_order = frame_order;
        self.position = 0;
        self.retained_tail.clear();
        self.advanced = 0;
        self.state = CursorState::Running;
    }

    pub fn next_batch(
        &mut self,
        source: &mut dyn FrameSource,
        transform: &FrameTransform,
    ) -> Option<Batch> {
        if self.state != CursorState::Running {
            return None;
        }

        let mut frames = std::mem::take(&mut self.retained_tail);
        let retained = frames.len();

        while frames.len() < self.plan.batch_size {
            let Some(&index) = self.frame_order.get(self.position) else {
                break;
            };
            self.position += 1;

            let frame = match read_at(source, index) {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::debug!("Source ended before frame {index}, dropping partial batch");
                    self.exhaust();
                    return None;
                }
                Err(e) => {
                    log::warn!("Reading frame {index} failed, ending pass: {e}");
                    self.exhaust();
                    return None;
                }
            };

            self.position = (self.position + self.plan.skip_frame).min(self.frame_order.len());
            self.advanced += self.plan.skip_frame + 1;
            frames.push(transform.apply(frame));
        }

        if frames.len() == retained {
            self.exhaust();
            return None;
        }

        if self.advanced >= self.plan.span_frames || self.position >= self.frame_order.len() {
            self.exhaust();
        } else {
            let keep = self.plan.retained_len().min(frames.len());
            self.retained_tail = frames[frames.len() - keep..].to_vec();
        }

        Some(Batch::new(frames))
    }

    fn exhaust(&mut self) {
        if self.state != CursorState::Exhausted {
            log::debug!(
                "Pass exhausted after {} of {} source positions",
                self.advanced,
                self.plan.span_frames
            );
        }
        self.state = CursorState::Exhausted;
        self.retained_tail.clear();
    }
}

fn read_at(
    source: &mut dyn FrameSource,
    index: usize,
) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
    source.seek(index)?;
    source.read()
}
