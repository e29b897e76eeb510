//! Remote providers reached through a Dabbu-style files API server
//!
//! Every operation maps onto one (or, for fetch, two) HTTP requests:
//!
//! | operation | request                                                        |
//! |-----------|----------------------------------------------------------------|
//! | list      | `GET  …/data/{backend}/{folder}?exportType=view`               |
//! | fetch     | `GET  …/data/{backend}/{folder}/{name}?exportType=media`, then `GET contentURI` |
//! | store     | `POST …/data/{backend}/{folder}/{name}` (multipart `content`)  |
//! | delete    | `DELETE …/data/{backend}/{folder}[/{name}]`                    |
//!
//! The folder is sent as a single encoded segment, so `/a/b` travels as `%2Fa%2Fb`.

use super::{AuthState, ProviderAdapter, ProviderError, ProviderResult, ProviderSettings, Prompter};
use crate::{FileEntry, LocalHandle, RemotePath, Scratch};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::io::AsyncWriteExt;

const API_ROOT: [&str; 3] = ["dabbu", "v1", "api"];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HttpConfig {
    server: String,
    backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    content: Option<T>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProviderList {
    #[serde(default)]
    providers: Vec<String>,
}

/// Entry as the server reports it; numbers and times arrive in loose shapes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    name: String,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    size: Value,
    #[serde(default)]
    created_at_time: Value,
    #[serde(default)]
    last_modified_time: Value,
    #[serde(default, rename = "contentURI")]
    content_uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

impl WireEntry {
    fn into_entry(self, folder: &RemotePath) -> FileEntry {
        let path = folder.join(&self.name);
        let entry = if self.kind == "folder" {
            FileEntry::folder(path)
        } else {
            FileEntry::file(path, lenient_size(&self.size))
        };

        let mut entry = entry.with_times(
            lenient_time(&self.created_at_time),
            lenient_time(&self.last_modified_time),
        );
        entry.content_locator = self.content_uri;
        entry.mime_type = self.mime_type;
        entry
    }
}

fn lenient_size(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn lenient_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Extension added to exported documents (Docs → docx, Sheets → xlsx, ...)
fn export_extension(mime_type: Option<&str>) -> &'static str {
    match mime_type {
        Some("application/vnd.google-apps.document") => ".docx",
        Some("application/vnd.google-apps.spreadsheet") => ".xlsx",
        Some("application/vnd.google-apps.presentation") => ".pptx",
        Some("application/vnd.google-apps.drawing") => ".png",
        Some("application/vnd.google-apps.script+json") => ".json",
        _ => "",
    }
}

fn transport(err: reqwest::Error) -> ProviderError {
    if err.is_decode() {
        ProviderError::Rejected(format!("malformed response: {}", err))
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Turn a non-success status into the matching error
async fn check(response: Response, target: &str) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound(target.to_string()));
    }

    let message = response
        .json::<Envelope<Value>>()
        .await
        .ok()
        .and_then(|envelope| envelope.error)
        .map(|error| error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.to_string());
    Err(ProviderError::Rejected(format!("{}: {}", target, message)))
}

fn build_client(settings: &ProviderSettings) -> Client {
    Client::builder()
        .timeout(settings.request_timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to a default HTTP client: {}", e);
            Client::new()
        })
}

pub struct HttpProvider {
    client: Client,
    default_server: String,
    config: Option<HttpConfig>,
}

impl HttpProvider {
    pub fn unconfigured(settings: &ProviderSettings) -> Self {
        Self {
            client: build_client(settings),
            default_server: settings.default_server.clone(),
            config: None,
        }
    }

    pub fn from_auth(auth: &AuthState, settings: &ProviderSettings) -> ProviderResult<Self> {
        let config: HttpConfig = auth.to_config()?;
        Ok(Self {
            config: Some(config),
            ..Self::unconfigured(settings)
        })
    }

    fn config(&self) -> ProviderResult<&HttpConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| ProviderError::Setup("drive is not connected to a server".into()))
    }

    fn api_url(server: &str, tail: &[&str]) -> ProviderResult<Url> {
        let mut url = Url::parse(server)
            .map_err(|e| ProviderError::Setup(format!("invalid server address {}: {}", server, e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Setup(format!("invalid server address {}", server)))?
            .pop_if_empty()
            .extend(API_ROOT)
            .extend(tail);
        Ok(url)
    }

    fn data_url(&self, folder: &RemotePath, name: Option<&str>) -> ProviderResult<Url> {
        let config = self.config()?;
        let mut tail = vec!["data", config.backend.as_str(), folder.trimmed()];
        tail.extend(name);
        Self::api_url(&config.server, &tail)
    }

    fn authorized(&self, request: RequestBuilder) -> ProviderResult<RequestBuilder> {
        Ok(match &self.config()?.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    async fn enabled_providers(&self, server: &str) -> ProviderResult<Vec<String>> {
        let url = Self::api_url(server, &["providers"])?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        let response = check(response, server).await?;
        let envelope: Envelope<ProviderList> = response.json().await.map_err(transport)?;
        Ok(envelope.content.map(|c| c.providers).unwrap_or_default())
    }
}

#[async_trait(?Send)]
impl ProviderAdapter for HttpProvider {
    fn id(&self) -> &str {
        "http"
    }

    async fn initialize(
        &mut self,
        drive_name: &str,
        prompter: &mut dyn Prompter,
    ) -> ProviderResult<AuthState> {
        let default_server = self.default_server.clone();
        let server = prompter.ask("Enter the address of the files API server", Some(&default_server))?;
        let server = server.trim().trim_end_matches('/').to_string();

        let providers = self
            .enabled_providers(&server)
            .await
            .map_err(|e| ProviderError::Setup(format!("could not reach {}: {}", server, e)))?;
        if providers.is_empty() {
            return Err(ProviderError::Setup(format!("{} has no providers enabled", server)));
        }

        prompter.note(&format!("Providers enabled on {}: {}", server, providers.join(", ")));
        let backend = prompter.ask(
            &format!("Which provider should {} use?", drive_name),
            providers.first().map(String::as_str),
        )?;
        let backend = backend.trim().replace(' ', "_").to_lowercase();
        if !providers.contains(&backend) {
            return Err(ProviderError::Setup(format!("{} is not enabled on {}", backend, server)));
        }

        let token = prompter.ask(
            &format!("Paste an access token for {} (leave empty if none is needed)", backend),
            Some(""),
        )?;
        let token = Some(token.trim().to_string()).filter(|t| !t.is_empty());

        let config = HttpConfig { server, backend, token };
        tracing::info!("Drive {} uses {} on {}", drive_name, config.backend, config.server);
        let auth = AuthState::from_config(&config)?;
        self.config = Some(config);
        Ok(auth)
    }

    async fn list(&self, path: &RemotePath) -> ProviderResult<Vec<FileEntry>> {
        let mut url = self.data_url(path, None)?;
        url.query_pairs_mut().append_pair("exportType", "view");

        let request = self.authorized(self.client.get(url))?;
        let response = request.send().await.map_err(transport)?;
        let response = check(response, path.as_str()).await?;
        let envelope: Envelope<Vec<WireEntry>> = response.json().await.map_err(transport)?;

        let folder = RemotePath::new(path.trimmed());
        Ok(envelope
            .content
            .unwrap_or_default()
            .into_iter()
            .map(|wire| wire.into_entry(&folder))
            .collect())
    }

    async fn fetch(
        &self,
        folder: &RemotePath,
        file_name: &str,
        scratch: &Scratch,
    ) -> ProviderResult<LocalHandle> {
        let remote = folder.join(file_name);
        let mut url = self.data_url(folder, Some(file_name))?;
        url.query_pairs_mut().append_pair("exportType", "media");

        let request = self.authorized(self.client.get(url))?;
        let response = request.send().await.map_err(transport)?;
        let response = check(response, remote.as_str()).await?;
        let envelope: Envelope<WireEntry> = response.json().await.map_err(transport)?;
        let wire = envelope
            .content
            .ok_or_else(|| ProviderError::NotFound(remote.to_string()))?;
        if wire.kind == "folder" {
            return Err(ProviderError::IsAFolder(remote.to_string()));
        }

        let uri = wire
            .content_uri
            .as_deref()
            .ok_or_else(|| ProviderError::Rejected(format!("{} has no downloadable content", remote)))?;
        let server = Url::parse(&self.config()?.server)
            .map_err(|e| ProviderError::Setup(e.to_string()))?;
        let content_url = Url::parse(uri)
            .or_else(|_| server.join(uri))
            .map_err(|e| ProviderError::Rejected(format!("bad content address {}: {}", uri, e)))?;

        let local_name = format!("{}{}", file_name, export_extension(wire.mime_type.as_deref()));
        let local = scratch.allocate(&local_name)?;

        let request = self.authorized(self.client.get(content_url))?;
        let response = request.send().await.map_err(transport)?;
        let mut response = check(response, remote.as_str()).await?;

        let mut file = tokio::fs::File::create(&local).await?;
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!("Fetched {} into {:?}", remote, local);
        Ok(LocalHandle::single(local))
    }

    async fn store(&self, folder: &RemotePath, file_name: &str, local: &Path) -> ProviderResult<()> {
        let remote = folder.join(file_name);
        let data = tokio::fs::read(local).await?;
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("content", part);

        let url = self.data_url(folder, Some(file_name))?;
        let request = self.authorized(self.client.post(url).multipart(form))?;
        let response = request.send().await.map_err(transport)?;
        check(response, remote.as_str()).await?;
        Ok(())
    }

    async fn delete(&self, folder: &RemotePath, file_name: Option<&str>) -> ProviderResult<()> {
        let remote = match file_name {
            Some(name) => folder.join(name),
            None => folder.clone(),
        };
        let url = self.data_url(folder, file_name)?;
        let request = self.authorized(self.client.delete(url))?;
        let response = request.send().await.map_err(transport)?;
        check(response, remote.as_str()).await?;
        Ok(())
    }
}
