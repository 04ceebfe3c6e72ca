//! Product analytics events sent to PostHog.

use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    SignupCompleted,
    LoginCompleted,
    ProfileViewed,
    ProfileEdited,
    ProjectAdded,
    ProjectEdited,
    ProjectDeleted,
    SocialLinkAdded,
}

impl Event {
    pub fn name(self) -> &'static str {
        match self {
            Event::SignupCompleted => "signup_completed",
            Event::LoginCompleted => "login_completed",
            Event::ProfileViewed => "profile_viewed",
            Event::ProfileEdited => "profile_edited",
            Event::ProjectAdded => "project_added",
            Event::ProjectEdited => "project_edited",
            Event::ProjectDeleted => "project_deleted",
            Event::SocialLinkAdded => "social_link_added",
        }
    }
}

#[derive(Debug, Serialize)]
struct CapturePayload<'a> {
    api_key: &'a str,
    event: &'static str,
    distinct_id: &'a str,
    properties: Map<String, Value>,
    timestamp: String,
}

#[derive(Clone)]
pub struct Analytics {
    client: Client,
    api_key: Option<String>,
    host: String,
}

impl Analytics {
    pub fn new(api_key: Option<String>, host: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            host: host.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, "")
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn capture_url(&self) -> String {
        format!("{}/capture/", self.host)
    }

    /// Queues `event` in the background. Without an API key this does nothing.
    pub fn capture(&self, event: Event, distinct_id: &str, properties: Value) {
        let Some(api_key) = self.api_key.clone() else {
            return;
        };
        let properties = match properties {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        let client = self.client.clone();
        let url = self.capture_url();
        let distinct_id = distinct_id.to_string();

        tokio::spawn(async move {
            let payload = CapturePayload {
                api_key: &api_key,
                event: event.name(),
                distinct_id: &distinct_id,
                properties,
                timestamp: chrono::Utc::now().to_rfc3339(),
            };
            match client.post(&url).json(&payload).send().await {
                Ok(res) if res.status().is_success() => {
                    tracing::debug!("Captured {} for {}", event.name(), distinct_id)
                }
                Ok(res) => tracing::warn!("Analytics rejected {}: {}", event.name(), res.status()),
                Err(e) => tracing::warn!("Analytics unreachable: {}", e),
            }
        });
    }
}
