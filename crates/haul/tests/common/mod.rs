//! In-memory artifact service speaking the client's wire protocol.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use futures_util::stream;
use haul::{
    ArtifactClient, ArtifactDescriptor, ArtifactState, ClientConfig, HttpClient, PackageFormat, RetrySettings,
};
use haul_transfer::{Body, Headers, Method, Request, Response, TransportError};
use haul_verify::{Checksum, ChecksumAlgorithm};

pub const BASE_URL: &str = "http://artifacts.test";

/// A request as the service saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method:   Method,
    pub path:     String,
    pub query:    Vec<(String, String)>,
    pub headers:  Headers,
    pub body_len: u64,
}

impl Seen {
    pub fn header(&self, name: &str) -> Option<&str> { self.headers.get(name) }
}

/// Canned failure served instead of the next request.
#[derive(Debug, Clone)]
pub enum Fault {
    Status(u16),
    Transport(TransportError),
}

#[derive(Debug, Clone)]
struct Stored {
    descriptor: ArtifactDescriptor,
    content:    Bytes,
}

#[derive(Debug, Default)]
struct State {
    artifacts:        Vec<Stored>,
    next_id:          u32,
    requests:         Vec<Seen>,
    faults:           VecDeque<Fault>,
    tamper_content:   bool,
    truncations:      u32,
    misreports:       u32,
    loop_cursor:      bool,
}

#[derive(Debug, Default)]
pub struct MockService {
    state: Mutex<State>,
}

impl MockService {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    fn state(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap_or_else(|e| e.into_inner()) }

    pub fn fail_next(&self, faults: impl IntoIterator<Item = Fault>) { self.state().faults.extend(faults); }

    /// Flip a byte of every content response.
    pub fn tamper_content(&self) { self.state().tamper_content = true; }

    /// Cut the next `times` content responses in half.
    pub fn truncate_content(&self, times: u32) { self.state().truncations += times; }

    /// Record a wrong digest for the next `times` uploads.
    pub fn misreport_digest(&self, times: u32) { self.state().misreports += times; }

    /// Hand out the same cursor forever.
    pub fn loop_cursor(&self) { self.state().loop_cursor = true; }

    pub fn requests(&self) -> Vec<Seen> { self.state().requests.clone() }

    pub fn request_count(&self) -> usize { self.state().requests.len() }

    pub fn content_of(&self, id: &str) -> Option<Bytes> {
        self.state()
            .artifacts
            .iter()
            .find(|stored| stored.descriptor.id == id)
            .map(|stored| stored.content.clone())
    }

    /// Store an artifact directly. `digest` defaults to the digest of
    /// `content`.
    pub fn seed(&self, name: &str, content: &[u8], tweak: impl FnOnce(&mut ArtifactDescriptor)) -> ArtifactDescriptor {
        let mut state = self.state();
        let mut descriptor = state.new_descriptor(name, content.len() as u64);
        descriptor.digest = Some(ChecksumAlgorithm::Sha256.digest(content));
        tweak(&mut descriptor);
        state.artifacts.push(Stored {
            descriptor: descriptor.clone(),
            content:    Bytes::copy_from_slice(content),
        });
        descriptor
    }

    fn handle(&self, request: &Request) -> Result<Response, TransportError> {
        let body = match &request.body {
            Body::Empty => Bytes::new(),
            Body::Bytes(bytes) => bytes.clone(),
            Body::File { path, .. } => {
                Bytes::from(std::fs::read(path).map_err(|err| TransportError::io(err.to_string()))?)
            }
        };

        let mut state = self.state();
        state.requests.push(Seen {
            method:   request.method,
            path:     request.path.clone(),
            query:    request.query.clone(),
            headers:  request.headers.clone(),
            body_len: body.len() as u64,
        });

        match state.faults.pop_front() {
            Some(Fault::Status(status)) => return Ok(Response::new(status).with_body(format!("injected {status}"))),
            Some(Fault::Transport(err)) => return Err(err),
            None => {}
        }

        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        let response = match (request.method, segments.as_slice()) {
            (Method::Post, ["artifacts"]) => state.create(request, body),
            (Method::Get, ["artifacts"]) => state.page(request),
            (Method::Get, ["artifacts", id]) => match state.find(id) {
                Some(stored) => json(200, &stored.descriptor),
                None => Response::new(404).with_body("no such artifact"),
            },
            (Method::Get, ["artifacts", id, "content"]) => match state.find(id).map(|s| s.content.clone()) {
                Some(content) => {
                    let mut content = content.to_vec();
                    if state.tamper_content && !content.is_empty() {
                        content[0] ^= 0xff;
                    }
                    if state.truncations > 0 {
                        state.truncations -= 1;
                        content.truncate(content.len() / 2);
                    }
                    chunked(content)
                }
                None => Response::new(404),
            },
            (Method::Delete, ["artifacts", id]) => {
                let before = state.artifacts.len();
                state.artifacts.retain(|stored| stored.descriptor.id != *id);
                Response::new(if state.artifacts.len() < before { 204 } else { 404 })
            }
            _ => Response::new(400).with_body("unknown route"),
        };
        Ok(response)
    }
}

impl HttpClient for MockService {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> { self.handle(request) }
}

impl State {
    fn new_descriptor(&mut self, name: &str, size: u64) -> ArtifactDescriptor {
        self.next_id += 1;
        ArtifactDescriptor {
            id:            format!("art-{}", self.next_id),
            name:          name.to_string(),
            size_in_bytes: size,
            created_at:    epoch() + ChronoDuration::seconds(i64::from(self.next_id)),
            expires_at:    None,
            state:         ArtifactState::Active,
            digest:        None,
            format:        PackageFormat::Raw,
        }
    }

    fn find(&self, id: &str) -> Option<&Stored> { self.artifacts.iter().find(|stored| stored.descriptor.id == id) }

    fn create(&mut self, request: &Request, body: Bytes) -> Response {
        let Some(name) = request.headers.get("x-artifact-name").map(str::to_string) else {
            return Response::new(400).with_body("missing x-artifact-name");
        };
        if self.artifacts.iter().any(|stored| stored.descriptor.name == name) {
            return Response::new(409).with_body("artifact exists");
        }

        let mut descriptor = self.new_descriptor(&name, body.len() as u64);
        descriptor.format = request
            .headers
            .get("x-artifact-format")
            .and_then(|tag| tag.parse().ok())
            .unwrap_or_default();
        if let Some(days) = request.headers.get("x-artifact-retention-days").and_then(|d| d.parse().ok()) {
            descriptor.expires_at = Some(descriptor.created_at + ChronoDuration::days(days));
        }
        descriptor.digest = Some(if self.misreports > 0 {
            self.misreports -= 1;
            ChecksumAlgorithm::Sha256.digest(b"something else")
        } else {
            ChecksumAlgorithm::Sha256.digest(&body)
        });

        self.artifacts.push(Stored {
            descriptor: descriptor.clone(),
            content:    body,
        });
        json(201, &descriptor)
    }

    fn page(&self, request: &Request) -> Response {
        let per_page: usize = request.query_value("per_page").and_then(|n| n.parse().ok()).unwrap_or(100);
        let start: usize = request.query_value("cursor").and_then(|c| c.parse().ok()).unwrap_or(0);

        let artifacts: Vec<&ArtifactDescriptor> = self
            .artifacts
            .iter()
            .skip(start)
            .take(per_page)
            .map(|stored| &stored.descriptor)
            .collect();
        let next_cursor = if self.loop_cursor {
            Some(start.to_string()).filter(|_| start > 0).or_else(|| Some(per_page.to_string()))
        } else {
            Some(start + per_page).filter(|next| *next < self.artifacts.len()).map(|n| n.to_string())
        };

        json(200, &serde_json::json!({ "artifacts": artifacts, "next_cursor": next_cursor }))
    }
}

fn json(status: u16, value: &impl serde::Serialize) -> Response {
    Response::new(status)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_vec(value).unwrap_or_default())
}

/// Serve content in small chunks so readers see a real stream.
fn chunked(content: Vec<u8>) -> Response {
    let chunks: Vec<Result<Bytes, TransportError>> = content.chunks(7).map(|c| Ok(Bytes::copy_from_slice(c))).collect();
    Response::new(200).with_stream(Box::pin(stream::iter(chunks)))
}

pub fn epoch() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() }

/// Fast backoff so retries stay cheap in real time.
pub fn config() -> ClientConfig {
    ClientConfig::new(BASE_URL).retry(RetrySettings {
        max_attempts:  3,
        base_delay_ms: 10,
        max_delay_ms:  40,
        deadline_secs: None,
    })
}

pub fn client(service: &Arc<MockService>) -> ArtifactClient<Arc<MockService>> { client_with(service, config()) }

pub fn client_with(service: &Arc<MockService>, config: ClientConfig) -> ArtifactClient<Arc<MockService>> {
    ArtifactClient::new(Arc::clone(service), config).unwrap()
}

pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

pub fn sha256(data: &[u8]) -> Checksum { ChecksumAlgorithm::Sha256.digest(data) }
