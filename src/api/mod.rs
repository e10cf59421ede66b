use crate::error::ApiError;
use crate::session::sequence::{ChatReply, Sequence, SequenceId, UploadReport};
use crate::session::{CreatedSession, History, SessionId};
use reqwest::{multipart, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base_url: &Url, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}/{path}", self.base))?)
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.error);
        Err(ApiError::Backend {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn create_session(&self) -> Result<SessionId, ApiError> {
        let url = self.endpoint("chat/")?;
        debug!(%url, "creating session");
        let response = self.http.post(url).send().await?;
        let created: CreatedSession = Self::decode(response).await?;
        Ok(created.session_id)
    }

    pub async fn history(&self, session: SessionId) -> Result<History, ApiError> {
        let url = self.endpoint(&format!("chat/{session}/history"))?;
        debug!(%url, "fetching history");
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    pub async fn send_message(&self, session: SessionId, text: &str) -> Result<ChatReply, ApiError> {
        let url = self.endpoint(&format!("chat/{session}/message"))?;
        debug!(%url, "sending message");
        let response = self
            .http
            .post(url)
            .json(&json!({ "message": text }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn enhance_context(&self, session: SessionId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("chat/{session}/rag"))?;
        debug!(%url, "enhancing context");
        let response = self.http.post(url).json(&json!({})).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn generate_sequences(
        &self,
        session: SessionId,
        context: &Map<String, Value>,
    ) -> Result<Vec<Sequence>, ApiError> {
        let url = self.endpoint(&format!("sequence/{session}/generate"))?;
        debug!(%url, "generating sequences");
        let response = self
            .http
            .post(url)
            .json(&json!({ "context": context }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn modify_sequences(
        &self,
        session: SessionId,
        instruction: &str,
    ) -> Result<Vec<Sequence>, ApiError> {
        let url = self.endpoint(&format!("sequence/{session}/modify"))?;
        debug!(%url, "modifying sequences");
        let response = self
            .http
            .post(url)
            .json(&json!({ "instruction": instruction }))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn list_sequences(&self, session: SessionId) -> Result<Vec<Sequence>, ApiError> {
        let url = self.endpoint(&format!("sequence/{session}"))?;
        debug!(%url, "listing sequences");
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    pub async fn update_sequence(
        &self,
        id: SequenceId,
        content: &str,
    ) -> Result<Option<Sequence>, ApiError> {
        let url = self.endpoint(&format!("sequence/{id}"))?;
        debug!(%url, "updating sequence");
        let response = self
            .http
            .put(url)
            .json(&json!({ "content": content }))
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&body).ok())
    }

    pub async fn upload_document(
        &self,
        file_name: String,
        mime: &mime::Mime,
        bytes: Vec<u8>,
    ) -> Result<UploadReport, ApiError> {
        let url = self.endpoint("documents/upload")?;
        debug!(%url, file_name = %file_name, "uploading document");
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.as_ref())?;
        let form = multipart::Form::new().part("file", part);
        let response = self.http.post(url).multipart(form).send().await?;
        Self::decode(response).await
    }
}
