//! HTTP call path against an already-running generation service.
//!
//! Black-box counterpart to the in-process path: plain synchronous
//! request/response, no retry or timeout policy. The reply's
//! `Content-Type` header is mapped to a [`ContentKind`], which selects
//! the comparison path downstream.

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;

use mediaproof_snapshot::ContentKind;

use crate::request::GenerationRequest;

/// Environment variable naming the service host (`host:port`).
pub const HOST_ENV_VAR: &str = "GENERATION_HOST";

const DEFAULT_HOST: &str = "localhost:5000";

/// Errors from the HTTP call path.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed, {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("request has no `{0}` attachment")]
    MissingAttachment(&'static str),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A completed service reply, ready for snapshot comparison.
#[derive(Debug)]
pub struct HttpReply {
    pub status: u16,
    pub content_kind: ContentKind,
    pub body: Vec<u8>,
}

/// Blocking client for the generation service's REST surface.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base: String,
    client: Client,
}

impl HttpClient {
    /// Client for an explicit `host:port`.
    pub fn new(host: impl AsRef<str>) -> Self {
        Self {
            base: format!("http://{}", host.as_ref()),
            client: Client::new(),
        }
    }

    /// Client for the host named by `GENERATION_HOST`, defaulting to a
    /// local address.
    pub fn from_env() -> Self {
        let host = std::env::var(HOST_ENV_VAR).unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::new(host)
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `GET /v1/engines/list`
    pub fn list_engines(&self) -> Result<HttpReply, HttpError> {
        let url = format!("{}/v1/engines/list", self.base);
        self.execute(self.client.get(url))
    }

    /// `POST /v1/generation/{engine}/text-to-image` (JSON body).
    pub fn text_to_image(
        &self,
        engine: &str,
        request: &GenerationRequest,
    ) -> Result<HttpReply, HttpError> {
        let url = format!("{}/v1/generation/{engine}/text-to-image", self.base);
        self.execute(
            self.client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "image/png")
                .json(&request.json_body()),
        )
    }

    /// `POST /v1/generation/{engine}/image-to-image` (multipart).
    pub fn image_to_image(
        &self,
        engine: &str,
        request: &GenerationRequest,
    ) -> Result<HttpReply, HttpError> {
        let url = format!("{}/v1/generation/{engine}/image-to-image", self.base);
        self.post_multipart(url, request)
    }

    /// `POST /v1/generation/{engine}/image-to-image/masking` (multipart).
    pub fn masking(
        &self,
        engine: &str,
        request: &GenerationRequest,
    ) -> Result<HttpReply, HttpError> {
        let url = format!(
            "{}/v1/generation/{engine}/image-to-image/masking",
            self.base
        );
        self.post_multipart(url, request)
    }

    /// `POST /v1/generation/{engine}/image-to-image/upscale` (multipart,
    /// image attached under `image` rather than `init_image`).
    pub fn upscale(
        &self,
        engine: &str,
        image: &[u8],
        width: Option<u32>,
    ) -> Result<HttpReply, HttpError> {
        let url = format!(
            "{}/v1/generation/{engine}/image-to-image/upscale",
            self.base
        );
        let mut form = Form::new();
        if let Some(width) = width {
            form = form.text("width", width.to_string());
        }
        form = form.part(
            "image",
            Part::bytes(image.to_vec())
                .file_name("image.png")
                .mime_str("image/png")?,
        );
        self.execute(self.client.post(url).header(ACCEPT, "image/png").multipart(form))
    }

    fn post_multipart(
        &self,
        url: String,
        request: &GenerationRequest,
    ) -> Result<HttpReply, HttpError> {
        let init_image = request
            .init_image
            .as_deref()
            .ok_or(HttpError::MissingAttachment("init_image"))?;

        let mut form = Form::new();
        for (name, value) in request.form_fields() {
            form = form.text(name, value);
        }
        form = form.part(
            "init_image",
            Part::bytes(init_image.to_vec())
                .file_name("init_image.png")
                .mime_str("image/png")?,
        );

        self.execute(self.client.post(url).header(ACCEPT, "image/png").multipart(form))
    }

    fn execute(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<HttpReply, HttpError> {
        let response = request.send()?;
        let status = response.status().as_u16();
        let content_kind = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ContentKind::from_header)
            .unwrap_or_else(|| ContentKind::Unsupported(String::new()));
        let body = response.bytes()?.to_vec();

        if status != 200 {
            return Err(HttpError::RequestFailed {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(HttpReply {
            status,
            content_kind,
            body,
        })
    }
}
