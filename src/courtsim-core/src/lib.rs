//! Courtsim Core Library
//!
//! Simulates a multi-party courtroom scene: sequences turns among the
//! cast, renders each turn as synthesized speech, and exposes a
//! play/pause/stop control surface with optional AI-generated turns and
//! live user speech input.

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod generation;
pub mod participant;
pub mod recognition;
pub mod scenario;
pub mod synthesis;

pub use audio::{AudioClip, Playback, PlaybackOutcome};
pub use config::{SimConfig, default_config};
pub use controller::{DialogueMode, MAX_AI_TURNS, RunSnapshot, SimulationController};
pub use error::SimError;
pub use events::{EventBus, EventKind, SimulationEvent, Subscription};
pub use generation::{MockGenerator, OpenAiGenerator, TurnGenerator};
pub use participant::{Participant, Role};
pub use recognition::{ChannelRecognizer, RecognitionError, SpeechRecognizer};
pub use scenario::{DialogueLine, Scenario, sorted_lines};
pub use synthesis::{ElevenLabsSynthesizer, SpeechSynthesizer, placeholder_clip};
