//! `QuestApi` over HTTP/JSON.

mod mapping;
mod wire;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use quest_core::model::{
    AssessmentOutcome, ClassAnalytics, ClassroomId, Level, MistakeEntry, MistakeScope, Progress,
    Question, SpendReceipt,
};
use quest_core::session::SubmissionPayload;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::{BackendError, QuestApi};
use wire::{
    AnalyticsBody, ClassroomsBody, GenerateBody, GenerateRequest, MistakeBody, ProgressBody,
    SpendBody, SpendRequest, SubmitBody,
};

/// Default base URL of the quest backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    base_url: Url,
    timeout: Duration,
}

impl HttpConfig {
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if `base_url` does not parse or
    /// cannot carry a path.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        Ok(Self { base_url, timeout })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Build `<base>/api/<segments…>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                BackendError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().clone();
        if !status.is_success() {
            warn!("backend {url} answered {status}");
            return Err(BackendError::Status(status));
        }
        let body = response.text().await?;
        debug!("backend {url} answered {} bytes", body.len());
        serde_json::from_str(&body).map_err(|e| BackendError::Malformed(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        self.fetch(self.client.get(url)).await
    }
}

#[async_trait]
impl QuestApi for HttpBackend {
    async fn progress(&self, classroom: &ClassroomId) -> Result<Progress, BackendError> {
        let body: ProgressBody = self.get(&["progress", classroom.as_str()]).await?;
        Ok(mapping::map_progress(body))
    }

    async fn generate_assessment(
        &self,
        classroom: &ClassroomId,
        level: Level,
    ) -> Result<Vec<Question>, BackendError> {
        let url = self.endpoint(&["assessment", "generate"])?;
        let request = GenerateRequest {
            session_id: classroom.as_str(),
            level: level.value(),
        };
        let body: GenerateBody = self.fetch(self.client.post(url).json(&request)).await?;
        if let Some(reason) = body.error.filter(|e| !e.trim().is_empty()) {
            return Err(BackendError::Rejected(reason));
        }
        Ok(mapping::map_questions(body.questions.unwrap_or_default())?)
    }

    async fn spend_xp(
        &self,
        classroom: &ClassroomId,
        amount: u32,
    ) -> Result<SpendReceipt, BackendError> {
        let url = self.endpoint(&["spend_xp"])?;
        let request = SpendRequest {
            session_id: classroom.as_str(),
            amount,
        };
        let body: SpendBody = self.fetch(self.client.post(url).json(&request)).await?;
        Ok(mapping::map_receipt(body))
    }

    async fn submit_assessment(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<AssessmentOutcome, BackendError> {
        let url = self.endpoint(&["assessment", "submit"])?;
        let request = mapping::submit_request(payload);
        let body: SubmitBody = self.fetch(self.client.post(url).json(&request)).await?;
        mapping::map_outcome(body)
    }

    async fn list_classrooms(&self) -> Result<Vec<ClassroomId>, BackendError> {
        let body: ClassroomsBody = self.get(&["classrooms"]).await?;
        Ok(mapping::map_classrooms(body.classrooms.unwrap_or_default()))
    }

    async fn analytics(&self, classroom: &ClassroomId) -> Result<ClassAnalytics, BackendError> {
        let body: AnalyticsBody = self
            .get(&["teacher", "analytics", classroom.as_str()])
            .await?;
        Ok(mapping::map_analytics(body))
    }

    async fn mistakes(&self, scope: &MistakeScope) -> Result<Vec<MistakeEntry>, BackendError> {
        let body: Vec<MistakeBody> = self.get(&["mistakes", scope.as_segment()]).await?;
        Ok(mapping::map_mistakes(body))
    }
}
