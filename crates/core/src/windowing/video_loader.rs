use std::path::{Path, PathBuf};

use crate::shared::constants::DEFAULT_SAMPLE_SEED;
use crate::shared::frame::Frame;
use crate::shared::loader_error::LoaderError;
use crate::shared::source_descriptor::SourceDescriptor;
use crate::video::domain::frame_source::FrameSource;
use crate::windowing::domain::batch::Batch;
use crate::windowing::domain::batch_cursor::BatchCursor;
use crate::windowing::domain::frame_order;
use crate::windowing::domain::frame_transform::FrameTransform;
use crate::windowing::domain::window_plan::WindowPlan;
use crate::windowing::loader_config::LoaderConfig;
use crate::windowing::pass::Pass;

/// Batches frames out of one video according to a [`LoaderConfig`].
///
/// The source is opened once at construction to read its metadata and then
/// released; every pass or sampling call reopens it for its own duration.
/// A pass borrows the loader mutably, so one loader runs one pass at a time.
pub struct VideoLoader {
    source: Box<dyn FrameSource>,
    path: PathBuf,
    config: LoaderConfig,
    descriptor: SourceDescriptor,
    plan: WindowPlan,
    transform: FrameTransform,
}

impl VideoLoader {
    pub fn open(
        mut source: Box<dyn FrameSource>,
        path: &Path,
        config: LoaderConfig,
    ) -> Result<Self, LoaderError> {
        config.validate()?;

        let metadata = source.open(path).map_err(LoaderError::Source)?;
        source.close();

        let descriptor = SourceDescriptor::new(&metadata, config.target_size, config.grayscale);
        let plan = WindowPlan::resolve(&config, &descriptor)?;
        let transform = FrameTransform::new(config.target_size, config.grayscale);

        log::info!(
            "Opened {} ({}, {} frames at {:.2} fps, {:.1}s), window {}..{}",
            path.display(),
            metadata.codec,
            descriptor.total_frames,
            descriptor.fps,
            metadata.duration_seconds(),
            plan.start_frame,
            plan.start_frame + plan.span_frames
        );

        Ok(Self {
            source,
            path: path.to_path_buf(),
            config,
            descriptor,
            plan,
            transform,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    /// Window length in seconds at the rounded native rate.
    pub fn duration(&self) -> f64 {
        self.plan.duration_seconds(self.descriptor.whole_fps())
    }

    /// Starts a pass using the configured order, overlap and skip.
    pub fn pass(&mut self) -> Result<Pass<'_>, LoaderError> {
        let plan = self.plan;
        let random_order = self.config.random_order;
        let predict = self.config.predict_next_frame;
        self.start_pass(plan, random_order, predict)
    }

    /// A sequential pass of back-to-back batches: no shuffling, no overlap,
    /// no skipping, no prediction split.
    pub fn contiguous_pass(&mut self) -> Result<Pass<'_>, LoaderError> {
        let plan = self.plan.non_overlapping();
        self.start_pass(plan, false, false)
    }

    fn start_pass(
        &mut self,
        plan: WindowPlan,
        random_order: bool,
        predict_next_frame: bool,
    ) -> Result<Pass<'_>, LoaderError> {
        self.source.open(&self.path).map_err(LoaderError::Source)?;

        let mut cursor = BatchCursor::new(plan);
        cursor.start(frame_order::for_pass(plan.frame_range(), random_order));
        Ok(Pass::new(
            &mut self.source,
            self.transform,
            cursor,
            predict_next_frame,
        ))
    }

    /// Every frame of the window in source order, stopping quietly at the
    /// first failed read.
    pub fn all_frames(&mut self) -> Result<Batch, LoaderError> {
        let range = self.plan.frame_range();
        self.with_source(|source, transform| {
            let mut frames = Vec::with_capacity(range.len());
            if range.is_empty() {
                return frames;
            }
            if let Err(e) = source.seek(range.start) {
                log::warn!("Seeking to frame {} failed: {e}", range.start);
                return frames;
            }
            while frames.len() < range.len() {
                match next_frame(source) {
                    Some(frame) => frames.push(transform.apply(frame)),
                    None => break,
                }
            }
            frames
        })
        .map(Batch::new)
    }

    /// A reproducible random subset of the window, read in source order.
    ///
    /// Picks `floor(span * ratio)` distinct frames. Skip and overlap settings
    /// do not apply. A failed read ends the scan and keeps what was read.
    pub fn random_frames(&mut self, ratio: f64, seed: Option<u64>) -> Result<Batch, LoaderError> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(LoaderError::InvalidSampleRatio(ratio));
        }
        let seed = seed.unwrap_or(DEFAULT_SAMPLE_SEED);
        let selected = frame_order::seeded_subset(self.plan.frame_range(), ratio, seed);
        let (Some(&first), Some(&last)) = (selected.first(), selected.last()) else {
            return Ok(Batch::default());
        };

        log::debug!(
            "Sampling {} frames between {first} and {last} (seed {seed})",
            selected.len()
        );

        self.with_source(|source, transform| {
            let mut frames = Vec::with_capacity(selected.len());
            if let Err(e) = source.seek(first) {
                log::warn!("Seeking to frame {first} failed: {e}");
                return frames;
            }
            for index in first..=last {
                let Some(frame) = next_frame(source) else {
                    break;
                };
                if selected.contains(&index) {
                    frames.push(transform.apply(frame));
                }
            }
            frames
        })
        .map(Batch::new)
    }

    fn with_source<T>(
        &mut self,
        f: impl FnOnce(&mut dyn FrameSource, &FrameTransform) -> T,
    ) -> Result<T, LoaderError> {
        self.source.open(&self.path).map_err(LoaderError::Source)?;
        let result = f(self.source.as_mut(), &self.transform);
        self.source.close();
        Ok(result)
    }
}

fn next_frame(source: &mut dyn FrameSource) -> Option<Frame> {
    match source.read() {
        Ok(frame) => frame,
        Err(e) => {
            log::warn!("Frame read failed, stopping early: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::video_metadata::VideoMetadata;
    use crate::video::infrastructure::memory_source::MemorySource;
    use crate::windowing::pass::LoaderItem;
    use approx::assert_relative_eq;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Tracker {
        is_open: bool,
        opens: usize,
        closes: usize,
    }

    struct TrackingSource {
        inner: MemorySource,
        tracker: Arc<Mutex<Tracker>>,
        fail_open: bool,
    }

    impl FrameSource for TrackingSource {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("cannot open".into());
            }
            let mut t = self.tracker.lock().unwrap();
            t.is_open = true;
            t.opens += 1;
            self.inner.open(path)
        }

        fn seek(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>> {
            self.inner.seek(index)
        }

        fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            self.inner.read()
        }

        fn close(&mut self) {
            let mut t = self.tracker.lock().unwrap();
            if t.is_open {
                t.closes += 1;
            }
            t.is_open = false;
            self.inner.close();
        }
    }

    fn tracked(source: MemorySource) -> (Box<dyn FrameSource>, Arc<Mutex<Tracker>>) {
        let tracker = Arc::new(Mutex::new(Tracker::default()));
        let boxed = Box::new(TrackingSource {
            inner: source,
            tracker: tracker.clone(),
            fail_open: false,
        });
        (boxed, tracker)
    }

    fn loader(count: usize, config: LoaderConfig) -> (VideoLoader, Arc<Mutex<Tracker>>) {
        let (source, tracker) = tracked(MemorySource::numbered(count, 4, 4, 3, 25.0));
        let loader = VideoLoader::open(source, Path::new("clip.mp4"), config).unwrap();
        (loader, tracker)
    }

    fn batch_indices(loader: &mut VideoLoader) -> Vec<Vec<usize>> {
        loader
            .pass()
            .unwrap()
            .map(|item| item.into_batch().indices())
            .collect()
    }

    #[test]
    fn test_open_reads_metadata_then_releases_source() {
        let (loader, tracker) = loader(100, LoaderConfig::new(8));
        let t = tracker.lock().unwrap();
        assert_eq!(t.opens, 1);
        assert!(!t.is_open);
        assert_eq!(loader.descriptor().total_frames, 100);
        assert_eq!(loader.plan().span_frames, 96);
        assert_eq!(loader.path(), Path::new("clip.mp4"));
    }

    #[test]
    fn test_open_failure_is_source_error() {
        let source = Box::new(TrackingSource {
            inner: MemorySource::numbered(8, 2, 2, 1, 25.0),
            tracker: Arc::new(Mutex::new(Tracker::default())),
            fail_open: true,
        });
        let result = VideoLoader::open(source, Path::new("missing.mp4"), LoaderConfig::new(8));
        match result {
            Err(e) => assert!(matches!(e, LoaderError::Source(_))),
            Ok(_) => panic!("expected a source error"),
        }
    }

    #[test]
    fn test_invalid_config_fails_before_touching_source() {
        let (source, tracker) = tracked(MemorySource::numbered(8, 2, 2, 1, 25.0));
        let result = VideoLoader::open(source, Path::new("clip.mp4"), LoaderConfig::new(8).with_stride(3));
        match result {
            Err(e) => assert!(e.is_configuration()),
            Ok(_) => panic!("expected a configuration error"),
        }
        assert_eq!(tracker.lock().unwrap().opens, 0);
    }

    #[test]
    fn test_pass_yields_contiguous_batches() {
        let (mut loader, _) = loader(40, LoaderConfig::new(8));
        let batches = batch_indices(&mut loader);
        assert_eq!(batches.len(), 5);
        assert_eq!(batches[0], (0..8).collect::<Vec<_>>());
        assert_eq!(batches[4], (32..40).collect::<Vec<_>>());
    }

    #[test]
    fn test_pass_emits_transformed_frames() {
        let config = LoaderConfig::new(4).with_grayscale(true).with_target_size(2, 2);
        let (mut loader, _) = loader(8, config);
        let item = loader.pass().unwrap().next().unwrap();
        assert_eq!(item.into_batch().shape(), [4, 2, 2, 1]);
        assert_eq!(loader.descriptor().output_channels(), 1);
    }

    #[test]
    fn test_pass_releases_source_when_exhausted() {
        let (mut loader, tracker) = loader(16, LoaderConfig::new(8));
        let mut pass = loader.pass().unwrap();
        assert!(tracker.lock().unwrap().is_open);

        while pass.next().is_some() {}
        assert!(pass.is_exhausted());
        assert_eq!(pass.emitted(), 2);
        assert!(!tracker.lock().unwrap().is_open);
    }

    #[test]
    fn test_abandoned_pass_releases_source() {
        let (mut loader, tracker) = loader(64, LoaderConfig::new(8));
        {
            let mut pass = loader.pass().unwrap();
            assert!(pass.next().is_some());
        }
        let t = tracker.lock().unwrap();
        assert!(!t.is_open);
        assert_eq!(t.opens, 2);
        assert_eq!(t.closes, 2);
    }

    #[test]
    fn test_short_source_releases_source_quietly() {
        let (source, tracker) = tracked(MemorySource::numbered(32, 2, 2, 1, 25.0).with_readable_frames(12));
        let mut loader = VideoLoader::open(source, Path::new("clip.mp4"), LoaderConfig::new(8)).unwrap();
        let mut pass = loader.pass().unwrap();

        assert_eq!(pass.next().map(|item| item.len()), Some(8));
        assert!(pass.next().is_none());
        assert!(!tracker.lock().unwrap().is_open);
    }

    #[test]
    fn test_predict_mode_splits_last_frame() {
        let config = LoaderConfig::new(4).with_predict_next_frame(true);
        let (mut loader, _) = loader(8, config);
        let items: Vec<LoaderItem> = loader.pass().unwrap().collect();
        assert_eq!(items.len(), 2);
        for item in items {
            match item {
                LoaderItem::NextFrame { context, target } => {
                    assert_eq!(context.len(), 3);
                    assert_eq!(target.index(), context.indices()[2] + 1);
                }
                LoaderItem::Batch(_) => panic!("expected a split item"),
            }
        }
    }

    #[test]
    fn test_predict_mode_keeps_overlap_on_full_batch() {
        let config = LoaderConfig::new(4)
            .with_stride(2)
            .with_predict_next_frame(true);
        let (mut loader, _) = loader(8, config);
        let batches = batch_indices(&mut loader);
        assert_eq!(batches[0], vec![0, 1, 2, 3]);
        assert_eq!(batches[1], vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_fresh_pass_reproduces_first_batch() {
        let (mut loader, _) = loader(24, LoaderConfig::new(8).with_stride(4));
        let first = batch_indices(&mut loader);
        let second = batch_indices(&mut loader);
        assert_eq!(first, second);
    }

    #[test]
    fn test_random_order_covers_window_once() {
        let (mut loader, _) = loader(32, LoaderConfig::new(8).with_random_order(true));
        let mut indices: Vec<usize> = batch_indices(&mut loader).concat();
        indices.sort_unstable();
        assert_eq!(indices, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_contiguous_pass_ignores_overlap_skip_and_prediction() {
        let config = LoaderConfig::new(4)
            .with_stride(1)
            .with_skip_frame(2)
            .with_predict_next_frame(true);
        let (mut loader, _) = loader(12, config);
        let items: Vec<LoaderItem> = loader.contiguous_pass().unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| matches!(item, LoaderItem::Batch(_))));
        assert_eq!(items[2].clone().into_batch().indices(), vec![8, 9, 10, 11]);
    }

    #[test]
    fn test_start_and_duration_bound_the_pass() {
        let config = LoaderConfig::new(4)
            .with_start_frame(10)
            .with_duration_frames(8);
        let (mut loader, _) = loader(100, config);
        let batches = batch_indices(&mut loader);
        assert_eq!(batches, vec![(10..14).collect::<Vec<_>>(), (14..18).collect()]);
    }

    #[test]
    fn test_all_frames_reads_whole_window() {
        let (mut loader, tracker) = loader(20, LoaderConfig::new(8).with_start_frame(2));
        let batch = loader.all_frames().unwrap();
        assert_eq!(batch.indices(), (2..18).collect::<Vec<_>>());
        assert!(!tracker.lock().unwrap().is_open);
    }

    #[test]
    fn test_all_frames_stops_at_short_source() {
        let (source, _) = tracked(MemorySource::numbered(32, 2, 2, 1, 25.0).with_readable_frames(11));
        let mut loader = VideoLoader::open(source, Path::new("clip.mp4"), LoaderConfig::new(8)).unwrap();
        assert_eq!(loader.all_frames().unwrap().len(), 11);
    }

    #[test]
    fn test_random_frames_is_reproducible_and_ordered() {
        let (mut loader, tracker) = loader(200, LoaderConfig::new(8));
        let first = loader.random_frames(0.1, None).unwrap();
        let second = loader.random_frames(0.1, Some(DEFAULT_SAMPLE_SEED)).unwrap();

        assert_eq!(first.len(), 20);
        assert_eq!(first.indices(), second.indices());
        assert!(first.indices().windows(2).all(|w| w[0] < w[1]));
        assert!(!tracker.lock().unwrap().is_open);
    }

    #[test]
    fn test_random_frames_content_matches_index() {
        let (mut loader, _) = loader(50, LoaderConfig::new(5));
        let batch = loader.random_frames(0.5, Some(3)).unwrap();
        for frame in batch.frames() {
            assert_eq!(frame.data()[0] as usize, frame.index());
        }
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-0.5)]
    #[case::above_one(1.5)]
    #[case::nan(f64::NAN)]
    fn test_random_frames_rejects_bad_ratio(#[case] ratio: f64) {
        let (mut loader, _) = loader(16, LoaderConfig::new(8));
        let err = loader.random_frames(ratio, None).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidSampleRatio(_)));
    }

    #[test]
    fn test_duration_uses_rounded_rate() {
        let (source, _) = tracked(MemorySource::numbered(100, 2, 2, 1, 24.7));
        let loader = VideoLoader::open(source, Path::new("clip.mp4"), LoaderConfig::new(10)).unwrap();
        assert_relative_eq!(loader.duration(), 100.0 / 25.0);
    }
}
