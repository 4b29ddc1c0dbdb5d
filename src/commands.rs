use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{DbError, Store};
use crate::parser::{percent_decode, Method, Request};

/// A request decoded into a store call.
#[derive(Debug, PartialEq)]
pub enum Command {
    Hello,
    Keys,
    Remove(String),
    SetTtl { key: String, seconds: i64 },
    Set { key: String, value: String },
    Get(String),
    Push { key: String, values: Vec<String> },
    Pop(String),
    Hset { key: String, field: String, value: String },
    Hget { key: String, field: String },
}

#[derive(Debug, PartialEq, Error)]
pub enum CommandError {
    #[error("Not Found")]
    NotFound,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Unsupported Media Type")]
    UnsupportedMediaType,
    #[error("{0}")]
    BadRequest(String),
}

impl CommandError {
    pub fn status(&self) -> u16 {
        match self {
            CommandError::NotFound => 404,
            CommandError::MethodNotAllowed => 405,
            CommandError::UnsupportedMediaType => 415,
            CommandError::BadRequest(_) => 400,
        }
    }
}

#[derive(Deserialize)]
struct TtlBody {
    #[serde(default)]
    value: i64,
}

#[derive(Deserialize)]
struct SetBody {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct PushBody {
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: Vec<String>,
}

#[derive(Deserialize)]
struct HsetBody {
    #[serde(default)]
    key: String,
    #[serde(default)]
    field: String,
    #[serde(default)]
    value: String,
}

fn decode<T: DeserializeOwned>(request: &Request) -> Result<T, CommandError> {
    let is_json = request
        .header("content-type")
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"));
    if !is_json {
        return Err(CommandError::UnsupportedMediaType);
    }
    serde_json::from_slice(&request.body).map_err(|e| CommandError::BadRequest(e.to_string()))
}

fn require_key(key: String) -> Result<String, CommandError> {
    if key.is_empty() {
        return Err(CommandError::BadRequest("key must not be empty".to_string()));
    }
    Ok(key)
}

impl Command {
    pub fn from_request(request: &Request) -> Result<Self, CommandError> {
        let segments: Vec<String> = request
            .path
            .trim_start_matches('/')
            .split('/')
            .map(percent_decode)
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        let (expected, command) = match segments.as_slice() {
            [""] => (Method::Get, Some(Command::Hello)),
            ["keys"] => (Method::Get, Some(Command::Keys)),
            ["remove", key] => (Method::Delete, Some(Command::Remove(key.to_string()))),
            ["ttl", _] | ["set"] | ["push"] | ["hset"] => (Method::Post, None),
            ["get", key] => (Method::Get, Some(Command::Get(key.to_string()))),
            ["pop", key] => (Method::Get, Some(Command::Pop(key.to_string()))),
            ["hget", key, field] => (
                Method::Get,
                Some(Command::Hget {
                    key: key.to_string(),
                    field: field.to_string(),
                }),
            ),
            _ => return Err(CommandError::NotFound),
        };
        if request.method != expected {
            return Err(CommandError::MethodNotAllowed);
        }
        if let Some(command) = command {
            return Ok(command);
        }

        // the remaining routes carry a json body
        match segments.as_slice() {
            ["ttl", key] => {
                let body: TtlBody = decode(request)?;
                Ok(Command::SetTtl {
                    key: key.to_string(),
                    seconds: body.value,
                })
            }
            ["set"] => {
                let body: SetBody = decode(request)?;
                Ok(Command::Set {
                    key: require_key(body.key)?,
                    value: body.value,
                })
            }
            ["push"] => {
                let body: PushBody = decode(request)?;
                Ok(Command::Push {
                    key: require_key(body.key)?,
                    values: body.value,
                })
            }
            ["hset"] => {
                let body: HsetBody = decode(request)?;
                Ok(Command::Hset {
                    key: require_key(body.key)?,
                    field: body.field,
                    value: body.value,
                })
            }
            _ => Err(CommandError::NotFound),
        }
    }

    pub fn execute(self, store: &Store) -> Response {
        match self {
            Command::Hello => Response::text(200, "Hello, World!"),
            Command::Keys => Response::value(store.keys()),
            Command::Remove(key) => {
                store.remove(&key);
                Response::ok()
            }
            Command::SetTtl { key, seconds } => {
                let ttl_ms = seconds.saturating_mul(1000);
                Response::from_result(store.set_ttl(&key, ttl_ms).map(|()| "ok"))
            }
            Command::Set { key, value } => {
                store.set(key, value);
                Response::ok()
            }
            Command::Get(key) => Response::from_result(store.get(&key)),
            Command::Push { key, values } => {
                Response::from_result(store.push(&key, values).map(|()| "ok"))
            }
            Command::Pop(key) => Response::from_result(store.pop(&key)),
            Command::Hset { key, field, value } => {
                Response::from_result(store.hset(&key, field, value).map(|()| "ok"))
            }
            Command::Hget { key, field } => Response::from_result(store.hget(&key, &field)),
        }
    }
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

const JSON: &str = "application/json; charset=UTF-8";

impl Response {
    fn json<T: Serialize>(status: u16, envelope: &Envelope<T>) -> Self {
        // Envelope holds only strings and lists of strings
        let mut body = serde_json::to_vec(envelope).unwrap_or_default();
        body.push(b'\n');
        Self {
            status,
            content_type: JSON,
            body,
        }
    }

    pub fn value<T: Serialize>(value: T) -> Self {
        Self::json(
            200,
            &Envelope {
                value: Some(value),
                error: None,
            },
        )
    }

    pub fn ok() -> Self {
        Self::value("ok")
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json::<()>(
            status,
            &Envelope {
                value: None,
                error: Some(message.into()),
            },
        )
    }

    pub fn text(status: u16, text: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=UTF-8",
            body: text.as_bytes().to_vec(),
        }
    }

    fn from_result<T: Serialize>(result: Result<T, DbError>) -> Self {
        match result {
            Ok(value) => Self::value(value),
            Err(e) => Self::error(500, e.to_string()),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            415 => "Unsupported Media Type",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            _ => "Unknown",
        }
    }

    /// Serializes the response as an HTTP/1.1 message.
    pub fn to_bytes(&self, keep_alive: bool) -> Vec<u8> {
        let connection = if keep_alive { "keep-alive" } else { "close" };
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
            connection
        )
        .into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

impl From<CommandError> for Response {
    fn from(e: CommandError) -> Self {
        Response::error(e.status(), e.to_string())
    }
}
