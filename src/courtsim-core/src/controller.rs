//! Simulation controller.
//!
//! Owns the run state machine, drives the turn sequence (scripted or
//! generated), serializes synthesis and playback one turn at a time, and
//! publishes lifecycle events for UI consumers. Construct one instance
//! per session and share it via `Arc`; there is no global instance.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::audio::{AudioClip, Playback};
use crate::events::{EventBus, SimulationEvent};
use crate::generation::TurnGenerator;
use crate::participant::Participant;
use crate::recognition::SpeechRecognizer;
use crate::scenario::{DialogueLine, sorted_lines};
use crate::synthesis::SpeechSynthesizer;

/// Hard cap on generated turns per run, bounding generation cost.
pub const MAX_AI_TURNS: usize = 12;

/// Where turns come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueMode {
    /// A fixed, pre-authored line sequence, replayed once per run.
    Scripted,
    /// Turns generated live from accumulated history, up to
    /// [`MAX_AI_TURNS`].
    Ai,
}

/// Read-only snapshot of the controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSnapshot {
    pub turn_index: usize,
    pub playing: bool,
    pub paused: bool,
    pub mode: DialogueMode,
}

/// Drives one simulation session.
pub struct SimulationController {
    events: EventBus,
    playback: Playback,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    generator: Arc<dyn TurnGenerator>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,

    playing: AtomicBool,
    paused: AtomicBool,
    turn_index: AtomicUsize,
    mode: Mutex<DialogueMode>,
    history: Mutex<Vec<String>>,

    /// Wakes the pause wait on resume and stop.
    wake: Notify,
    /// Cancels a pending user-speech recognition.
    speech_cancel: Notify,
}

impl SimulationController {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        generator: Arc<dyn TurnGenerator>,
    ) -> Self {
        Self {
            events: EventBus::new(),
            playback: Playback::new(),
            synthesizer,
            generator,
            recognizer: None,
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            turn_index: AtomicUsize::new(0),
            mode: Mutex::new(DialogueMode::Scripted),
            history: Mutex::new(Vec::new()),
            wake: Notify::new(),
            speech_cancel: Notify::new(),
        }
    }

    /// Enable live user speech input for AI-mode user turns.
    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Event surface consumed by the UI layer.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run one simulation to completion or cancellation.
    ///
    /// Silently a no-op when `participants` is empty or scripted mode
    /// has no lines; absence of further events is the only signal.
    pub async fn run(
        &self,
        mode: DialogueMode,
        participants: &[Participant],
        lines: Option<&[DialogueLine]>,
    ) {
        if participants.is_empty() {
            warn!("run requested without participants; ignoring");
            return;
        }

        match mode {
            DialogueMode::Scripted => {
                let script = lines.map(sorted_lines).unwrap_or_default();
                if script.is_empty() {
                    warn!("scripted run requested without lines; ignoring");
                    return;
                }
                self.begin_run(mode);
                self.run_scripted(&script, participants).await;
            }
            DialogueMode::Ai => {
                self.begin_run(mode);
                self.run_ai(participants).await;
            }
        }
    }

    fn begin_run(&self, mode: DialogueMode) {
        *self.mode.lock().unwrap() = mode;
        self.turn_index.store(0, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
        self.history.lock().unwrap().clear();
        self.playback.reset();
        self.events.emit(&SimulationEvent::Start { mode });
    }

    /// Suspend the run. Strictly idempotent: only an actual transition
    /// holds playback and emits `Pause`.
    pub fn pause(&self) {
        if !self.playing.load(Ordering::SeqCst) {
            return;
        }
        if self
            .paused
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.playback.hold();
            self.events.emit(&SimulationEvent::Pause);
        }
    }

    /// Continue from a pause. Idempotent: a no-op unless paused.
    pub fn resume(&self) {
        if self
            .paused
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.playback.release();
            self.wake.notify_one();
            self.events.emit(&SimulationEvent::Resume);
        }
    }

    /// Cancel the run. The current source is discarded, every waiter is
    /// woken, and the loop exits at its next checkpoint; no further
    /// lines start and no `Complete` fires.
    pub fn stop(&self) {
        let was_playing = self.playing.swap(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.playback.halt();
        self.wake.notify_one();
        self.speech_cancel.notify_waiters();
        if was_playing {
            self.events.emit(&SimulationEvent::Stop);
        }
    }

    /// Cancel a pending user-speech recognition without stopping the
    /// run; the user turn ends without a transcript.
    pub fn stop_user_speech(&self) {
        self.speech_cancel.notify_waiters();
    }

    pub fn state(&self) -> RunSnapshot {
        RunSnapshot {
            turn_index: self.turn_index.load(Ordering::SeqCst),
            playing: self.playing.load(Ordering::SeqCst),
            paused: self.paused.load(Ordering::SeqCst),
            mode: *self.mode.lock().unwrap(),
        }
    }

    /// Dialogue history of the current (or last) run, in turn order.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap().clone()
    }

    /// Audio of everything played so far this session.
    pub fn session_recording(&self) -> AudioClip {
        self.playback.take_recording()
    }

    /// Park while paused, waking on resume or stop. Returns whether the
    /// run is still live.
    async fn wait_while_paused(&self) -> bool {
        while self.paused.load(Ordering::SeqCst) && self.playing.load(Ordering::SeqCst) {
            self.wake.notified().await;
        }
        self.playing.load(Ordering::SeqCst)
    }

    async fn run_scripted(&self, script: &[DialogueLine], participants: &[Participant]) {
        for (index, line) in script.iter().enumerate() {
            if !self.playing.load(Ordering::SeqCst) {
                break;
            }
            if !self.wait_while_paused().await {
                break;
            }

            let Some(participant) = participants.iter().find(|p| p.role == line.role) else {
                debug!(role = line.role.display_name(), line = %line.id, "no participant for role; skipping line");
                continue;
            };

            self.turn_index.store(index, Ordering::SeqCst);
            self.speak(&line.text, participant).await;
        }

        self.finish_run();
    }

    async fn run_ai(&self, participants: &[Participant]) {
        let mut turn = 0;
        while turn < MAX_AI_TURNS {
            if !self.playing.load(Ordering::SeqCst) {
                break;
            }
            if !self.wait_while_paused().await {
                break;
            }

            let participant = &participants[turn % participants.len()];
            self.turn_index.store(turn, Ordering::SeqCst);

            if participant.role.is_user() {
                self.user_turn(participant).await;
            } else {
                let context = participant.role.context_hints();
                let history = self.history();
                let text = self
                    .generator
                    .generate(participant, &context, &history)
                    .await;

                // A stop that landed during generation discards the result.
                if !self.playing.load(Ordering::SeqCst) {
                    break;
                }

                self.history
                    .lock()
                    .unwrap()
                    .push(format!("{}: {}", participant.display_name, text));
                self.speak(&text, participant).await;
            }

            turn += 1;
        }

        self.finish_run();
    }

    /// A user slot: collect one live transcript instead of generating
    /// and synthesizing. The user's own voice is the audio, so playback
    /// is skipped entirely.
    async fn user_turn(&self, participant: &Participant) {
        let Some(recognizer) = self.recognizer.as_ref() else {
            warn!("speech recognition unavailable; skipping user turn");
            self.events.emit(&SimulationEvent::UserSpeechError {
                reason: "speech recognition is not available".to_string(),
            });
            return;
        };

        // Register interest in cancellation before announcing the turn,
        // so a cancel issued from inside a `UserSpeechStart` handler is
        // not lost.
        let cancelled = self.speech_cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();

        self.events.emit(&SimulationEvent::UserSpeechStart);

        let result = tokio::select! {
            result = recognizer.recognize() => Some(result),
            _ = &mut cancelled => None,
        };

        match result {
            Some(Ok(transcript)) => {
                self.history
                    .lock()
                    .unwrap()
                    .push(format!("{}: {}", participant.display_name, transcript));
                self.events
                    .emit(&SimulationEvent::UserSpeechRecognized { transcript });
            }
            Some(Err(e)) => {
                warn!(error = %e, "speech recognition failed");
                self.events.emit(&SimulationEvent::UserSpeechError {
                    reason: e.to_string(),
                });
            }
            // Recognition explicitly stopped; the slot ends without a
            // transcript.
            None => {}
        }

        self.events.emit(&SimulationEvent::UserSpeechStop);
    }

    /// Speak one turn: synthesize, bind to the shared playback handle,
    /// await the end of audio. The only code path that touches playback,
    /// never invoked concurrently. A halt mid-clip still completes the
    /// turn (`LineEnd` fires on every exit path).
    async fn speak(&self, text: &str, participant: &Participant) {
        self.events.emit(&SimulationEvent::LineStart {
            text: text.to_string(),
            speaker: participant.role,
            participant_name: participant.display_name.clone(),
        });

        let clip = self.synthesizer.synthesize(text, &participant.voice_id).await;
        let _ = self.playback.play(&clip).await;

        self.events.emit(&SimulationEvent::LineEnd {
            speaker: participant.role,
        });
    }

    /// Natural exhaustion emits `Complete`; a run ended by `stop` has
    /// already cleared `playing` and stays silent.
    fn finish_run(&self) {
        if self.playing.swap(false, Ordering::SeqCst) {
            self.events.emit(&SimulationEvent::Complete);
        }
    }
}
