//! Live speech input for the user role.
//!
//! Recognition is single-shot: the controller starts it for a user turn,
//! it resolves with one transcript or an error, and it never restarts on
//! its own.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("speech recognition is not available")]
    Unavailable,

    #[error("speech recognition failed: {0}")]
    Failed(String),
}

/// Single-shot speech-to-text for the user role.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Wait for one recognized transcript.
    async fn recognize(&self) -> Result<String, RecognitionError>;
}

/// Recognizer fed through a channel.
///
/// The front-end pushes transcripts into the sender (the CLI forwards
/// typed input; a real deployment would push microphone transcripts). A
/// closed channel means the capability is gone.
pub struct ChannelRecognizer {
    receiver: Mutex<mpsc::Receiver<String>>,
}

impl ChannelRecognizer {
    pub fn new() -> (Self, mpsc::Sender<String>) {
        let (sender, receiver) = mpsc::channel(8);
        (
            Self {
                receiver: Mutex::new(receiver),
            },
            sender,
        )
    }
}

#[async_trait]
impl SpeechRecognizer for ChannelRecognizer {
    async fn recognize(&self) -> Result<String, RecognitionError> {
        self.receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or(RecognitionError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_recognizer_yields_one_transcript() {
        let (recognizer, sender) = ChannelRecognizer::new();
        sender.send("Not guilty, your honor.".to_string()).await.unwrap();
        assert_eq!(
            recognizer.recognize().await,
            Ok("Not guilty, your honor.".to_string())
        );
    }

    #[tokio::test]
    async fn test_closed_channel_is_unavailable() {
        let (recognizer, sender) = ChannelRecognizer::new();
        drop(sender);
        assert_eq!(
            recognizer.recognize().await,
            Err(RecognitionError::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_transcripts_arrive_in_order() {
        let (recognizer, sender) = ChannelRecognizer::new();
        sender.send("First.".to_string()).await.unwrap();
        sender.send("Second.".to_string()).await.unwrap();
        assert_eq!(recognizer.recognize().await.unwrap(), "First.");
        assert_eq!(recognizer.recognize().await.unwrap(), "Second.");
    }
}
