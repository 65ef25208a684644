use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

/// Forward gaps up to this many frames are decoded through instead of seeking.
const FORWARD_DECODE_LIMIT: usize = 48;

/// Decodes frames via ffmpeg-next (libavformat + libavcodec).
///
/// Seeking jumps to the nearest keyframe at or before the target and decodes
/// forward, discarding frames until the requested index. Frame numbers are
/// derived from presentation timestamps, so every [`Frame`] carries its real
/// position in the stream. Output is always RGB24 at native resolution.
pub struct FfmpegSource {
    state: Option<DecodeState>,
}

// Safety: FfmpegSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegSource {}

impl FfmpegSource {
    pub fn new() -> Self {
        Self { state: None }
    }
}

impl Default for FfmpegSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegSource {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.state = None;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let time_base = stream.time_base();
        let start_time = stream.start_time();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let fps = rational_to_f64(stream.rate())
            .or_else(|| rational_to_f64(stream.avg_frame_rate()))
            .unwrap_or(0.0);

        let total_frames = if stream.frames() > 0 {
            stream.frames() as usize
        } else {
            estimate_frame_count(ictx.duration(), fps)
        };

        let width = decoder.width();
        let height = decoder.height();
        let metadata = VideoMetadata {
            width,
            height,
            channels: 3,
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.state = Some(DecodeState {
            ictx,
            decoder,
            scaler,
            video_stream_index,
            time_base,
            start_time: if start_time == i64::MIN { 0 } else { start_time },
            fps: if fps > 0.0 { fps } else { 1.0 },
            width,
            height,
            next_index: 0,
            eof_sent: false,
        });

        log::debug!(
            "Opened {} ({width}x{height}, {fps:.2} fps, {total_frames} frames)",
            path.display()
        );
        Ok(metadata)
    }

    fn seek(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>> {
        self.state
            .as_mut()
            .ok_or("FfmpegSource: not opened")?
            .seek(index)
    }

    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        self.state
            .as_mut()
            .ok_or("FfmpegSource: not opened")?
            .read()
    }

    fn close(&mut self) {
        self.state = None;
    }
}

/// Everything that lives between `open` and `close`.
struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    time_base: ffmpeg_next::Rational,
    start_time: i64,
    fps: f64,
    width: u32,
    height: u32,
    /// Smallest frame number `read` may return.
    next_index: usize,
    eof_sent: bool,
}

impl DecodeState {
    fn seek(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>> {
        if index >= self.next_index && index - self.next_index <= FORWARD_DECODE_LIMIT {
            self.next_index = index;
            return Ok(());
        }

        let timestamp = frame_number_to_seek_timestamp(index, self.fps);
        self.ictx.seek(timestamp, ..timestamp)?;
        self.decoder.flush();
        self.eof_sent = false;
        self.next_index = index;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let number = decoded
                    .timestamp()
                    .or(decoded.pts())
                    .map(|pts| {
                        pts_to_frame_number(pts - self.start_time, self.time_base, self.fps)
                    })
                    .unwrap_or(self.next_index);
                if number < self.next_index {
                    continue;
                }

                let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
                self.scaler.run(&decoded, &mut rgb_frame)?;
                let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
                self.next_index = number + 1;
                return Ok(Some(Frame::new(
                    pixels,
                    self.width,
                    self.height,
                    3,
                    number,
                )));
            }

            if self.eof_sent {
                return Ok(None);
            }

            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        log::debug!("Skipping undecodable packet: {e}");
                    }
                }
                None => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
            }
        }
    }
}

fn rational_to_f64(rate: ffmpeg_next::Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    } else {
        None
    }
}

/// Container duration is in AV_TIME_BASE units (microseconds).
fn estimate_frame_count(duration: i64, fps: f64) -> usize {
    if duration <= 0 || fps <= 0.0 {
        return 0;
    }
    (duration as f64 / 1_000_000.0 * fps).round() as usize
}

fn pts_to_frame_number(pts: i64, time_base: ffmpeg_next::Rational, fps: f64) -> usize {
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    (seconds * fps).round().max(0.0) as usize
}

/// `Input::seek` with no stream index expects AV_TIME_BASE (microseconds).
fn frame_number_to_seek_timestamp(frame_number: usize, fps: f64) -> i64 {
    (frame_number as f64 / fps * 1_000_000.0) as i64
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the per-row padding ffmpeg may add.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}
