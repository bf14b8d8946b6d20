use crate::request::{Body, Part, PartContent, Request, Response};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part as FormPart};
use reqwest::Client;
use std::io::Read;
use tracing::debug;

/// Anything that can carry a [`Request`] to a server and bring back a [`Response`].
///
/// Errors are returned untouched by the retry engine, so callers can
/// `downcast_ref` to whatever type the transport produced.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &mut Request) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &mut Request) -> Result<Response> {
        (**self).send(request).await
    }
}

/// Adapts a plain closure into a transport.
pub struct FnTransport<F> {
    handler: F,
}

impl<F> FnTransport<F>
where
    F: Fn(&mut Request) -> Result<Response> + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> Transport for FnTransport<F>
where
    F: Fn(&mut Request) -> Result<Response> + Send + Sync,
{
    async fn send(&self, request: &mut Request) -> Result<Response> {
        (self.handler)(request)
    }
}

/// Sends requests over HTTP with a shared [`reqwest::Client`].
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn form_part(part: &mut Part) -> Result<FormPart> {
    let bytes = match &mut part.content {
        PartContent::Bytes(bytes) => bytes.clone(),
        PartContent::Stream(stream) => {
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf)?;
            buf
        }
    };

    let mut form_part = FormPart::bytes(bytes);
    if let Some(filename) = &part.filename {
        form_part = form_part.file_name(filename.clone());
    }
    if let Some(content_type) = &part.content_type {
        form_part = form_part.mime_str(content_type)?;
    }
    Ok(form_part)
}

fn build_form(parts: &mut [Part]) -> Result<Form> {
    let mut form = Form::new();
    for part in parts.iter_mut() {
        let name = part.name.clone();
        form = form.part(name, form_part(part)?);
    }
    Ok(form)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &mut Request) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());

        builder = match &mut request.body {
            Body::Empty => builder,
            Body::Bytes(bytes) => builder.body(bytes.clone()),
            Body::Text(text) => builder.body(text.clone()),
            Body::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        debug!("HTTP request: {} {}", request.method, request.url);

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!("HTTP response status: {}", status);

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
