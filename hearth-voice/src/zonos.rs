//! Zonos TTS client over the Gradio HTTP API.
//!
//! One synthesis is four requests:
//! 1. `POST /gradio_api/upload`: multipart speaker sample, answers with the
//!    server-side path.
//! 2. `POST /gradio_api/call/generate_audio`: `{"data": [...]}` in the
//!    endpoint's positional order, answers with an `event_id`.
//! 3. `GET /gradio_api/call/generate_audio/{event_id}`: server-sent events;
//!    the `complete` event carries `[audio_file, seed]`.
//! 4. `GET` the audio file URL.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use hearth_core::config::VoiceConfig;
use rand::Rng;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::emotion::EmotionProfile;
use crate::error::{Result, VoiceError};
use crate::service::{AudioPayload, SpeechSynthesisService, SynthesisRequest, SynthesizedAudio};

/// Seed sent when seeds are not randomized.
pub const FIXED_SEED: u64 = 420;

/// Generation settings that do not vary per request.
#[derive(Debug, Clone)]
pub struct ZonosSettings {
    /// Model to run.
    pub model_choice: String,
    /// Language code.
    pub language: String,
    /// Send a fresh random seed with every request.
    pub randomize_seed: bool,
}

impl From<&VoiceConfig> for ZonosSettings {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            model_choice: config.model_choice.clone(),
            language: config.language.clone(),
            randomize_seed: config.randomize_seed,
        }
    }
}

/// A file reference as Gradio returns it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileData {
    /// Server-side path.
    pub path: String,
    /// Download URL, when the server provides one.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventId {
    event_id: String,
}

/// HTTP client for a Zonos Gradio server.
#[derive(Debug, Clone)]
pub struct ZonosClient {
    http: Client,
    base_url: String,
    settings: ZonosSettings,
}

impl ZonosClient {
    /// Client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceError::RequestFailed`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, settings: ZonosSettings, timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            settings,
        })
    }

    /// Client configured from the `[voice]` section.
    ///
    /// # Errors
    ///
    /// See [`ZonosClient::new`].
    pub fn from_config(config: &VoiceConfig) -> Result<Self> {
        Self::new(&config.base_url, ZonosSettings::from(config), config.request_timeout_ms)
    }

    fn pick_seed(&self) -> u64 {
        if self.settings.randomize_seed {
            rand::thread_rng().gen_range(0..=u64::from(u32::MAX))
        } else {
            FIXED_SEED
        }
    }

    async fn upload(&self, speaker: &Path) -> Result<String> {
        let bytes = tokio::fs::read(speaker).await?;
        let file_name = speaker
            .file_name()
            .map_or_else(|| "speaker".to_string(), |n| n.to_string_lossy().into_owned());
        let form = Form::new().part("files", Part::bytes(bytes).file_name(file_name));

        let resp = self
            .http
            .post(format!("{}/gradio_api/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(VoiceError::UploadFailed(format!("HTTP {}", resp.status())));
        }
        let paths: Vec<String> = resp.json().await?;
        paths
            .into_iter()
            .next()
            .ok_or_else(|| VoiceError::UploadFailed("server returned no path".into()))
    }

    async fn start(&self, data: Value) -> Result<String> {
        let resp = self
            .http
            .post(format!("{}/gradio_api/call/generate_audio", self.base_url))
            .json(&json!({ "data": data }))
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(VoiceError::RequestFailed(format!("HTTP {status}: {body}")));
        }
        let id: EventId = resp.json().await?;
        Ok(id.event_id)
    }

    async fn await_result(&self, event_id: &str) -> Result<(FileData, Option<u64>)> {
        let body = self
            .http
            .get(format!(
                "{}/gradio_api/call/generate_audio/{event_id}",
                self.base_url
            ))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_completion(&body)
    }

    async fn download(&self, file: &FileData) -> Result<Vec<u8>> {
        let url = file
            .url
            .clone()
            .unwrap_or_else(|| format!("{}/gradio_api/file={}", self.base_url, file.path));
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesisService for ZonosClient {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<SynthesizedAudio> {
        let profile = EmotionProfile::for_label(request.emotion);
        let seed = self.pick_seed();
        debug!(
            speaker = %request.speaker_reference.display(),
            emotion = profile.name,
            seed,
            "Requesting Zonos synthesis"
        );

        let speaker_path = self.upload(request.speaker_reference).await?;
        let data = generate_audio_data(&self.settings, request.text, &speaker_path, &profile, seed);
        let event_id = self.start(data).await?;
        let (file, reported_seed) = self.await_result(&event_id).await?;
        let bytes = self.download(&file).await?;

        Ok(SynthesizedAudio {
            payload: AudioPayload::Bytes(bytes),
            seed: reported_seed.unwrap_or(seed),
        })
    }
}

/// Positional inputs of the `generate_audio` endpoint.
///
/// The seed is chosen client-side, so server-side randomization is off.
#[must_use]
pub fn generate_audio_data(
    settings: &ZonosSettings,
    text: &str,
    speaker_path: &str,
    profile: &EmotionProfile,
    seed: u64,
) -> Value {
    let [e1, e2, e3, e4, e5, e6, e7, e8] = profile.weights;
    json!([
        settings.model_choice,
        text,
        settings.language,
        { "path": speaker_path, "meta": { "_type": "gradio.FileData" } },
        null,
        e1, e2, e3, e4, e5, e6, e7, e8,
        0.78,
        24000,
        profile.pitch_std,
        profile.speaking_rate,
        4,
        false,
        2,
        0.15,
        seed,
        false,
        ["emotion"],
    ])
}

/// Extract `[audio_file, seed]` from a Gradio event stream.
///
/// # Errors
///
/// [`VoiceError::GenerationFailed`] for an `error` event or a stream that
/// ends without `complete`, [`VoiceError::ParseError`] for malformed data.
pub fn parse_completion(stream: &str) -> Result<(FileData, Option<u64>)> {
    let mut event = "";
    for line in stream.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        match event {
            "complete" => {
                let values: Vec<Value> = serde_json::from_str(data.trim())?;
                let file = values
                    .first()
                    .cloned()
                    .ok_or_else(|| VoiceError::ParseError("empty completion data".into()))?;
                let file: FileData = serde_json::from_value(file)?;
                let seed = values.get(1).and_then(Value::as_u64);
                return Ok((file, seed));
            }
            "error" => {
                warn!(data = data.trim(), "Zonos reported a generation error");
                return Err(VoiceError::GenerationFailed(data.trim().to_string()));
            }
            _ => {}
        }
    }
    Err(VoiceError::GenerationFailed(
        "event stream ended without a result".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ZonosSettings {
        ZonosSettings::from(&VoiceConfig::default())
    }

    #[test]
    fn payload_follows_endpoint_order() {
        let profile = EmotionProfile::named("sad");
        let data = generate_audio_data(&settings(), "Go.", "/tmp/gradio/jace.mp3", &profile, 7);
        let arr = data.as_array().expect("array");
        assert_eq!(arr.len(), 24);
        assert_eq!(arr[0], "Zyphra/Zonos-v0.1-transformer");
        assert_eq!(arr[1], "Go.");
        assert_eq!(arr[2], "en-us");
        assert_eq!(arr[3]["path"], "/tmp/gradio/jace.mp3");
        assert_eq!(arr[3]["meta"]["_type"], "gradio.FileData");
        assert!(arr[4].is_null());
        assert!((arr[6].as_f64().expect("e2") - 0.8).abs() < 1e-6);
        assert_eq!(arr[16], 10.0);
        assert_eq!(arr[21], 7);
        assert_eq!(arr[23], json!(["emotion"]));
    }

    #[test]
    fn parses_complete_event() {
        let stream = "event: generating\ndata: null\n\n\
                      event: complete\n\
                      data: [{\"path\": \"/tmp/out.wav\", \"url\": \"http://h/file=/tmp/out.wav\"}, 1234]\n\n";
        let (file, seed) = parse_completion(stream).expect("complete");
        assert_eq!(file.path, "/tmp/out.wav");
        assert_eq!(file.url.as_deref(), Some("http://h/file=/tmp/out.wav"));
        assert_eq!(seed, Some(1234));
    }

    #[test]
    fn error_event_is_generation_failure() {
        let stream = "event: error\ndata: null\n\n";
        assert!(matches!(
            parse_completion(stream),
            Err(VoiceError::GenerationFailed(_))
        ));
    }

    #[test]
    fn truncated_stream_is_generation_failure() {
        assert!(matches!(
            parse_completion("event: heartbeat\ndata: null\n"),
            Err(VoiceError::GenerationFailed(_))
        ));
    }

    #[test]
    fn fixed_seed_when_not_randomized() {
        let client = ZonosClient::new(
            "http://127.0.0.1:7860/",
            ZonosSettings {
                randomize_seed: false,
                ..settings()
            },
            1_000,
        )
        .expect("client");
        assert_eq!(client.pick_seed(), FIXED_SEED);
        assert_eq!(client.base_url, "http://127.0.0.1:7860");
    }
}
