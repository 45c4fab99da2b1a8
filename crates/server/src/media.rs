//! Multipart Endpoints
//!
//! Uploads of audio and images. Each form carries one `file` part plus
//! plain text fields; field names are accepted in camelCase and snake_case.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

use chat_gateway_core::{
    AudioInput, Capability, ConversationHistory, ConversationTurn, ImageInput, LanguageCode,
};
use chat_gateway_pipeline::{PipelineInput, Utterance};

use crate::http::{conversation_response, observe_outcome, within_deadline, HistoryEntry};
use crate::metrics::{record_capability_latency, record_request, record_request_latency};
use crate::rate_limit::{quota_headers, ClientId};
use crate::state::AppState;
use crate::ServerError;

const FILE_FIELD: &str = "file";
const DEFAULT_AUDIO_MIME: &str = "audio/wav";
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug)]
struct UploadedFile {
    bytes: Vec<u8>,
    content_type: Option<String>,
    file_name: Option<String>,
}

/// A parsed multipart form
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, ServerError> {
        let mut multipart =
            multipart.map_err(|rejection| ServerError::InvalidRequest(rejection.body_text()))?;
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::InvalidRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == FILE_FIELD {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
                form.file = Some(UploadedFile {
                    bytes: bytes.to_vec(),
                    content_type,
                    file_name,
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// First non-blank value among the given field names
    fn field(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
    }

    /// The upload as audio; empty when no file was sent
    fn take_audio(&mut self) -> AudioInput {
        match self.file.take() {
            Some(file) => {
                let audio = AudioInput::new(
                    file.bytes,
                    file.content_type.unwrap_or_else(|| DEFAULT_AUDIO_MIME.to_string()),
                );
                match file.file_name {
                    Some(name) => audio.with_file_name(name),
                    None => audio,
                }
            }
            None => AudioInput::new(Vec::new(), DEFAULT_AUDIO_MIME),
        }
    }

    /// The upload as an image; empty when no file was sent
    fn take_image(&mut self) -> ImageInput {
        match self.file.take() {
            Some(file) => ImageInput::new(
                file.bytes,
                file.content_type.unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
            ),
            None => ImageInput::new(Vec::new(), DEFAULT_IMAGE_MIME),
        }
    }

    fn language(&self, names: &[&str]) -> Option<LanguageCode> {
        self.field(names).map(LanguageCode::new)
    }

    /// `history` field holding the chat client's JSON message list
    fn history(&self) -> Result<ConversationHistory, ServerError> {
        match self.field(&["history"]) {
            Some(raw) => {
                let entries: Vec<HistoryEntry> = serde_json::from_str(raw)
                    .map_err(|e| ServerError::InvalidRequest(format!("Invalid history: {}", e)))?;
                Ok(entries.into_iter().map(ConversationTurn::from).collect())
            }
            None => Ok(ConversationHistory::new()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscribeResponse {
    transcript: String,
    language_code: LanguageCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f64>,
    remaining: u32,
}

/// Speech-to-text endpoint
///
/// POST /api/transcribe (multipart: `file`, `languageCode`, `model`)
pub async fn transcribe(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let started = Instant::now();
    record_request("transcribe");
    let metered = within_deadline(state.request_deadline(), async {
        let mut form = UploadForm::read(multipart).await?;
        let audio = form.take_audio();
        let language = form
            .language(&["languageCode", "language_code"])
            .unwrap_or_else(|| LanguageCode::new(""));

        state
            .orchestrator
            .speech()
            .transcribe(&client, &audio, &language, form.field(&["model"]))
            .await
            .map_err(|e| ServerError::from_core(Capability::Stt, e))
    })
    .await?;

    record_capability_latency(Capability::Stt, started.elapsed());
    record_request_latency("transcribe", started.elapsed());

    let response = TranscribeResponse {
        transcript: metered.value.text,
        language_code: metered.value.language_code,
        duration_seconds: metered.value.duration_seconds,
        remaining: metered.quota.remaining,
    };
    Ok((quota_headers(&metered.quota), Json(response)))
}

/// Image analysis endpoint
///
/// POST /api/analyze-image (multipart: `file`, `prompt`, `selectedLanguage`)
pub async fn analyze_image(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let started = Instant::now();
    record_request("analyze_image");
    let outcome = within_deadline(state.request_deadline(), async {
        let mut form = UploadForm::read(multipart).await?;
        let image = form.take_image();
        let prompt = form.field(&["prompt"]).map(str::to_string);
        let language = form
            .language(&["selectedLanguage", "selected_language", "languageCode"])
            .unwrap_or_else(|| state.orchestrator.options().pivot.clone());

        state
            .orchestrator
            .run(&client, PipelineInput::image(image, prompt, language))
            .await
            .map_err(|e| ServerError::from_core(Capability::Vision, e))
    })
    .await?;

    observe_outcome("analyze_image", started, &outcome);
    Ok(conversation_response(outcome))
}

/// Voice message endpoint: transcribe, then the full chat pipeline
///
/// POST /api/chat/voice (multipart: `file`, `languageCode`, `history`, `model`)
pub async fn voice_chat(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let started = Instant::now();
    record_request("chat_voice");
    let outcome = within_deadline(state.request_deadline(), async {
        let mut form = UploadForm::read(multipart).await?;
        let audio = form.take_audio();
        let history = form.history()?;
        let language = form
            .language(&["languageCode", "language_code", "selectedLanguage"])
            .unwrap_or_else(|| state.orchestrator.options().pivot.clone());

        let mut input = PipelineInput::voice(audio, history, language);
        if let Utterance::Voice { model, .. } = &mut input.utterance {
            *model = form.field(&["model"]).map(str::to_string);
        }
        if let Some(synthesize) = form.field(&["synthesize"]) {
            input = input.with_synthesis(!synthesize.eq_ignore_ascii_case("false"));
        }

        state
            .orchestrator
            .run(&client, input)
            .await
            .map_err(|e| ServerError::from_core(Capability::Chat, e))
    })
    .await?;

    observe_outcome("chat_voice", started, &outcome);
    Ok(conversation_response(outcome))
}
