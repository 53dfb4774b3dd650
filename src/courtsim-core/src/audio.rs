//! Audio clips and the shared playback handle.
//!
//! `Playback` is the single playback resource for a simulation. Only the
//! controller binds a source to it, one clip at a time; `hold`/`release`
//! suspend and continue mid-clip without losing position, and `halt`
//! discards the current source for good.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::SimError;

/// Playback advances in slices of this much audio time; holds and halts
/// take effect at slice boundaries.
const SLICE: Duration = Duration::from_millis(100);

/// Silence inserted between clips in the session recording.
const CLIP_GAP_SECS: f32 = 0.3;

/// A synthesized (or placeholder) audio clip: mono f32 samples.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// How a `play` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The clip played to its end.
    Finished,
    /// The handle was halted; the remainder of the clip was discarded.
    Halted,
}

#[derive(Default)]
struct Progress {
    /// Sample offset within the clip currently bound, if any.
    offset: usize,
    recording: Vec<f32>,
    recording_rate: u32,
}

/// The shared playback handle.
pub struct Playback {
    held: AtomicBool,
    halted: AtomicBool,
    resume: Notify,
    progress: Mutex<Progress>,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}

impl Playback {
    pub fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            resume: Notify::new(),
            progress: Mutex::new(Progress::default()),
        }
    }

    /// Play one clip to completion, honoring hold/release/halt.
    ///
    /// The clip is consumed in short slices of audio time. Before each
    /// slice the handle parks while held (waking on `release` or `halt`)
    /// and returns early when halted. Position is retained across a
    /// hold, so release continues from the held offset. The current
    /// source is cleared on every exit path.
    pub async fn play(&self, clip: &AudioClip) -> PlaybackOutcome {
        let slice_samples =
            ((clip.sample_rate as f64 * SLICE.as_secs_f64()) as usize).max(1);

        {
            let mut progress = self.progress.lock().unwrap();
            progress.offset = 0;
            if !progress.recording.is_empty() {
                let gap = (CLIP_GAP_SECS * clip.sample_rate as f32) as usize;
                progress.recording.extend(std::iter::repeat_n(0.0, gap));
            }
            progress.recording_rate = clip.sample_rate;
        }

        loop {
            while self.held.load(Ordering::SeqCst) && !self.halted.load(Ordering::SeqCst) {
                self.resume.notified().await;
            }

            if self.halted.load(Ordering::SeqCst) {
                self.clear_source();
                return PlaybackOutcome::Halted;
            }

            let offset = self.progress.lock().unwrap().offset;
            if offset >= clip.samples.len() {
                break;
            }
            let end = (offset + slice_samples).min(clip.samples.len());

            let slice_time = Duration::from_secs_f64(
                (end - offset) as f64 / clip.sample_rate as f64,
            );
            tokio::time::sleep(slice_time).await;

            let mut progress = self.progress.lock().unwrap();
            progress.recording.extend_from_slice(&clip.samples[offset..end]);
            progress.offset = end;
        }

        self.clear_source();
        PlaybackOutcome::Finished
    }

    fn clear_source(&self) {
        self.progress.lock().unwrap().offset = 0;
    }

    /// Suspend playback, keeping the current position.
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Continue from the held position.
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.resume.notify_one();
    }

    /// Discard the current source; no resume is possible afterwards.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        self.held.store(false, Ordering::SeqCst);
        self.resume.notify_one();
    }

    /// Re-arm the handle for a new run.
    pub fn reset(&self) {
        self.halted.store(false, Ordering::SeqCst);
        self.held.store(false, Ordering::SeqCst);
        self.clear_source();
    }

    /// Audio time already played of the clip currently bound.
    pub fn position(&self) -> Duration {
        let progress = self.progress.lock().unwrap();
        if progress.recording_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(progress.offset as f64 / progress.recording_rate as f64)
    }

    /// Take the session recording accumulated so far.
    pub fn take_recording(&self) -> AudioClip {
        let mut progress = self.progress.lock().unwrap();
        let rate = if progress.recording_rate == 0 {
            22_050
        } else {
            progress.recording_rate
        };
        AudioClip::new(std::mem::take(&mut progress.recording), rate)
    }
}

/// Save mono f32 samples to a 16-bit PCM WAV file.
pub fn write_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), SimError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path.as_ref(), spec)
        .map_err(|e| SimError::AudioError(format!("Failed to create WAV: {}", e)))?;

    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = if clamped < 0.0 {
            (clamped * 32768.0) as i16
        } else {
            (clamped * 32767.0) as i16
        };
        writer
            .write_sample(value)
            .map_err(|e| SimError::AudioError(format!("Failed to write WAV: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| SimError::AudioError(format!("Failed to finalize WAV: {}", e)))
}

/// Generate filename for a saved session.
pub fn session_filename(scenario: &str) -> String {
    let sanitized: String = scenario
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let truncated: String = sanitized.chars().take(50).collect();

    format!("Courtsim - {}.wav", truncated.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn clip_secs(secs: f64) -> AudioClip {
        let rate = 1_000;
        AudioClip::new(vec![0.5; (secs * rate as f64) as usize], rate)
    }

    #[test]
    fn test_clip_duration() {
        let clip = clip_secs(2.0);
        assert_eq!(clip.duration(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_runs_to_completion() {
        let playback = Playback::new();
        let outcome = playback.play(&clip_secs(1.0)).await;
        assert_eq!(outcome, PlaybackOutcome::Finished);
        // Source cleared on exit.
        assert_eq!(playback.position(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_retains_position_and_release_continues() {
        let playback = Arc::new(Playback::new());
        let p = Arc::clone(&playback);
        let task = tokio::spawn(async move { p.play(&clip_secs(1.0)).await });

        tokio::time::sleep(Duration::from_millis(300)).await;
        playback.hold();

        // Let any slice in flight at the hold drain, then the position
        // must be frozen somewhere inside the clip.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let held_at = playback.position();
        assert!(held_at >= Duration::from_millis(200));
        assert!(held_at < Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(playback.position(), held_at);

        playback.release();
        let outcome = task.await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_discards_source() {
        let playback = Arc::new(Playback::new());
        let p = Arc::clone(&playback);
        let task = tokio::spawn(async move { p.play(&clip_secs(10.0)).await });

        tokio::time::sleep(Duration::from_millis(250)).await;
        playback.halt();
        let outcome = task.await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Halted);
        assert_eq!(playback.position(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_wakes_a_held_player() {
        let playback = Arc::new(Playback::new());
        let p = Arc::clone(&playback);
        let task = tokio::spawn(async move { p.play(&clip_secs(10.0)).await });

        tokio::time::sleep(Duration::from_millis(200)).await;
        playback.hold();
        playback.halt();
        let outcome = task.await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Halted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_accumulates_with_gap() {
        let playback = Playback::new();
        playback.play(&clip_secs(1.0)).await;
        playback.play(&clip_secs(1.0)).await;

        let recording = playback.take_recording();
        let gap = (CLIP_GAP_SECS * 1_000.0) as usize;
        assert_eq!(recording.samples.len(), 1_000 + gap + 1_000);
        // Gap between the clips is silence.
        assert_eq!(recording.samples[1_000], 0.0);

        // Taking the recording drains it.
        assert!(playback.take_recording().samples.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_rearms_after_halt() {
        let playback = Playback::new();
        playback.halt();
        assert_eq!(playback.play(&clip_secs(1.0)).await, PlaybackOutcome::Halted);

        playback.reset();
        assert_eq!(playback.play(&clip_secs(1.0)).await, PlaybackOutcome::Finished);
    }

    #[test]
    fn test_session_filename() {
        assert_eq!(
            session_filename("Opening Statements?"),
            "Courtsim - Opening Statements_.wav"
        );
        let long = "A".repeat(100);
        assert!(session_filename(&long).len() < 70);
    }

    #[test]
    fn test_session_filename_truncates_on_char_boundaries() {
        // Multibyte alphanumerics survive sanitization; truncation must
        // not split one.
        let name = "é".repeat(60);
        assert_eq!(
            session_filename(&name),
            format!("Courtsim - {}.wav", "é".repeat(50))
        );
    }
}
