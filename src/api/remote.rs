//! Purpose: Provide a blocking HTTP client for a running bloglist server.
//! Exports: `RemoteClient`.
//! Role: Mirrors the four collection operations over the wire; pairs with
//! `BlogStore` the way a remote collaborator pairs with a local one.
//! Invariants: Server error envelopes translate back into `Error` values.
//! Invariants: Identifiers travel as plain text; the server decides whether
//! they are well formed.

use crate::core::entry::BlogEntry;
use crate::core::error::{Error, ErrorKind};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

#[derive(Clone, Debug)]
pub struct RemoteClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    kind: String,
    message: String,
    #[serde(default)]
    field: Option<String>,
}

impl RemoteClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, Error> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid server url")
                .with_hint("Use a base url like http://127.0.0.1:3003.")
                .with_source(err)
        })?;
        Ok(Self {
            base_url,
            agent: ureq::agent(),
        })
    }

    pub fn health(&self) -> Result<(), Error> {
        self.agent
            .get(self.endpoint("/healthz")?.as_str())
            .call()
            .map_err(map_ureq_error)?;
        Ok(())
    }

    pub fn list_entries(&self) -> Result<Vec<BlogEntry>, Error> {
        let response = self
            .agent
            .get(self.endpoint("/blogs")?.as_str())
            .call()
            .map_err(map_ureq_error)?;
        decode_body(response)
    }

    pub fn create_entry(&self, candidate: &Value) -> Result<BlogEntry, Error> {
        let response = self
            .agent
            .post(self.endpoint("/blogs")?.as_str())
            .send_json(candidate)
            .map_err(map_ureq_error)?;
        decode_body(response)
    }

    pub fn update_entry(&self, id: &str, replacement: &Value) -> Result<BlogEntry, Error> {
        let response = self
            .agent
            .put(self.entry_endpoint(id)?.as_str())
            .send_json(replacement)
            .map_err(map_ureq_error)?;
        decode_body(response)
    }

    pub fn delete_entry(&self, id: &str) -> Result<(), Error> {
        self.agent
            .delete(self.entry_endpoint(id)?.as_str())
            .call()
            .map_err(map_ureq_error)?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url.join(path).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to build request url")
                .with_source(err)
        })
    }

    fn entry_endpoint(&self, id: &str) -> Result<Url, Error> {
        self.endpoint(&format!("/blogs/{id}"))
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(response: ureq::Response) -> Result<T, Error> {
    response.into_json().map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response body")
            .with_source(err)
    })
}

fn map_ureq_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(status, response) => match response.into_json::<ErrorEnvelope>() {
            Ok(envelope) => {
                let mut error = Error::new(kind_from_name(&envelope.error.kind, status))
                    .with_message(envelope.error.message);
                if let Some(field) = envelope.error.field {
                    error = error.with_field(field);
                }
                error
            }
            Err(_) => Error::new(kind_from_status(status))
                .with_message(format!("server returned status {status}")),
        },
        ureq::Error::Transport(transport) => {
            Error::new(ErrorKind::Io).with_message(format!("request failed: {transport}"))
        }
    }
}

fn kind_from_name(name: &str, status: u16) -> ErrorKind {
    match name {
        "Usage" => ErrorKind::Usage,
        "Validation" => ErrorKind::Validation,
        "NotFound" => ErrorKind::NotFound,
        "Busy" => ErrorKind::Busy,
        "Permission" => ErrorKind::Permission,
        "Corrupt" => ErrorKind::Corrupt,
        "Io" => ErrorKind::Io,
        "Internal" => ErrorKind::Internal,
        _ => kind_from_status(status),
    }
}

fn kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 => ErrorKind::Usage,
        403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        423 => ErrorKind::Busy,
        _ => ErrorKind::Internal,
    }
}
