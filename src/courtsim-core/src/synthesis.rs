//! Speech synthesis adapter.
//!
//! Converts one line of text plus a voice id into a playable clip. Every
//! failure path degrades to a locally generated placeholder tone so the
//! turn loop always has something to play.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::audio::AudioClip;

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";

/// Sample rate of both the placeholder tone and the PCM output requested
/// from the remote service.
pub const SYNTHESIS_SAMPLE_RATE: u32 = 22_050;

/// Turns text into playable audio. Infallible by contract: adapters must
/// return a usable clip (degraded if need be) rather than an error.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> AudioClip;
}

/// ElevenLabs-backed synthesizer with a local placeholder fallback.
pub struct ElevenLabsSynthesizer {
    api_key: Option<String>,
    api_url: String,
    client: reqwest::Client,
}

impl ElevenLabsSynthesizer {
    /// `api_key = None` keeps the adapter fully offline: every request
    /// yields the placeholder tone.
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!("ElevenLabs API key not configured; using placeholder audio");
        }

        Self {
            api_key,
            api_url: ELEVENLABS_API_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the adapter at a different endpoint (self-hosted proxies).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn request_speech(
        &self,
        text: &str,
        voice_id: &str,
        api_key: &str,
    ) -> Result<AudioClip, String> {
        // Raw PCM avoids a decoder: 16-bit little-endian mono.
        let url = format!(
            "{}/text-to-speech/{}?output_format=pcm_22050",
            self.api_url, voice_id
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&json!({
                "text": text,
                "model_id": "eleven_monolingual_v1",
                "voice_settings": { "stability": 0.5, "similarity_boost": 0.5 },
            }))
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("API returned {}", status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("body read failed: {}", e))?;
        if bytes.len() < 2 {
            return Err("empty audio body".to_string());
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        Ok(AudioClip::new(samples, SYNTHESIS_SAMPLE_RATE))
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> AudioClip {
        let Some(api_key) = self.api_key.as_deref() else {
            return placeholder_clip(text);
        };

        if voice_id.trim().is_empty() {
            warn!("voice id missing; using placeholder audio");
            return placeholder_clip(text);
        }

        match self.request_speech(text, voice_id, api_key).await {
            Ok(clip) => {
                debug!(voice_id, "synthesized speech remotely");
                clip
            }
            Err(reason) => {
                warn!(%reason, "speech synthesis failed; using placeholder audio");
                placeholder_clip(text)
            }
        }
    }
}

/// Deterministic placeholder tone: a decaying 440 Hz sine whose duration
/// scales with the text length, never shorter than two seconds.
pub fn placeholder_clip(text: &str) -> AudioClip {
    let duration = (text.len() as f64 / 15.0).max(2.0);
    let num_samples = (duration * SYNTHESIS_SAMPLE_RATE as f64) as usize;

    let samples = (0..num_samples)
        .map(|i| {
            let t = i as f64 / SYNTHESIS_SAMPLE_RATE as f64;
            ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 0.1 * (-t).exp()) as f32
        })
        .collect();

    AudioClip::new(samples, SYNTHESIS_SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_placeholder_duration_floor() {
        let clip = placeholder_clip("Yes.");
        assert_eq!(clip.duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_placeholder_duration_scales_with_length() {
        let text = "a".repeat(150);
        let clip = placeholder_clip(&text);
        assert_eq!(clip.duration(), Duration::from_secs(10));
    }

    #[test]
    fn test_placeholder_is_deterministic() {
        let a = placeholder_clip("Order in the court.");
        let b = placeholder_clip("Order in the court.");
        assert_eq!(a.samples, b.samples);
        assert_eq!(a.sample_rate, SYNTHESIS_SAMPLE_RATE);
    }

    #[test]
    fn test_placeholder_amplitude_bounded() {
        let clip = placeholder_clip("The defense rests.");
        assert!(clip.samples.iter().all(|s| s.abs() <= 0.1));
    }

    #[tokio::test]
    async fn test_missing_key_degrades_to_placeholder() {
        let synth = ElevenLabsSynthesizer::new(None);
        let clip = synth.synthesize("Court is now in session.", "voice").await;
        assert_eq!(clip.samples, placeholder_clip("Court is now in session.").samples);
    }

    #[tokio::test]
    async fn test_blank_key_treated_as_missing() {
        let synth = ElevenLabsSynthesizer::new(Some("   ".to_string()));
        let clip = synth.synthesize("Objection.", "voice").await;
        assert_eq!(clip.samples, placeholder_clip("Objection.").samples);
    }

    #[tokio::test]
    async fn test_empty_voice_id_degrades_to_placeholder() {
        let synth = ElevenLabsSynthesizer::new(Some("key".to_string()));
        let clip = synth.synthesize("Objection sustained.", "").await;
        assert_eq!(clip.samples, placeholder_clip("Objection sustained.").samples);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades_to_placeholder() {
        let synth = ElevenLabsSynthesizer::new(Some("key".to_string()))
            .with_api_url("http://127.0.0.1:9/v1");
        let clip = synth.synthesize("Please proceed.", "voice").await;
        assert_eq!(clip.samples, placeholder_clip("Please proceed.").samples);
    }
}
