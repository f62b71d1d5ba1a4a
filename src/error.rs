use reqwest::StatusCode;
use serde::Deserialize;

/// Errors returned by [`Client`](crate::Client) and the configuration loader.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid credentials, unreadable config file, or a bad base URL.
    #[error("configuration error: {0}")]
    Config(String),

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request itself could not be assembled.
    #[error("failed to build request: {0}")]
    Request(#[source] reqwest::Error),

    /// Connection, DNS, TLS or timeout failure.
    #[error("could not connect to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("API request failed: HTTP {status} for url ({url}){}", fmt_message(.message))]
    HttpStatus {
        status: StatusCode,
        url: String,
        body: String,
        message: Option<String>,
    },

    /// The server answered 2xx but the body is not valid JSON.
    #[error("failed to parse API JSON (url={url}, status={status}): {source}")]
    Decode {
        url: String,
        status: StatusCode,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request payload could not be serialized.
    #[error("failed to encode request payload: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpStatus { status, .. } | Error::Decode { status, .. } => Some(*status),
            Error::Transport { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport { source, .. } if source.is_timeout())
    }

    pub(crate) fn from_status(status: StatusCode, url: &str, body: String) -> Self {
        let message = serde_json::from_str::<FrappeErrorResponse>(&body)
            .ok()
            .and_then(|e| e.summary());
        Error::HttpStatus {
            status,
            url: url.to_string(),
            body,
            message,
        }
    }
}

fn fmt_message(message: &Option<String>) -> String {
    match message {
        Some(m) => format!("\n{}", m),
        None => String::new(),
    }
}

/// Error payload produced by Frappe for failed requests.
#[derive(Debug, Default, Deserialize)]
struct FrappeErrorResponse {
    #[serde(default)]
    exc_type: Option<String>,
    #[serde(default)]
    exception: Option<String>,
    #[serde(default)]
    message: Option<serde_json::Value>,
    // JSON-encoded list whose items are themselves JSON-encoded objects.
    #[serde(default, rename = "_server_messages")]
    server_messages: Option<String>,
    #[serde(default, rename = "_error_message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerMessage {
    #[serde(default)]
    message: Option<String>,
}

impl FrappeErrorResponse {
    fn summary(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();

        match (&self.exception, &self.exc_type) {
            (Some(exception), _) if !exception.trim().is_empty() => {
                parts.push(exception.trim().to_string())
            }
            (_, Some(kind)) if !kind.trim().is_empty() => parts.push(kind.trim().to_string()),
            _ => {}
        }

        if let Some(raw) = &self.server_messages {
            for msg in decode_server_messages(raw) {
                if !parts.contains(&msg) {
                    parts.push(msg);
                }
            }
        }

        if let Some(msg) = &self.error_message {
            if !msg.trim().is_empty() {
                parts.push(msg.trim().to_string());
            }
        }

        if let Some(serde_json::Value::String(msg)) = &self.message {
            if !msg.trim().is_empty() {
                parts.push(msg.trim().to_string());
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

fn decode_server_messages(raw: &str) -> Vec<String> {
    let Ok(items) = serde_json::from_str::<Vec<String>>(raw) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            serde_json::from_str::<ServerMessage>(item)
                .ok()
                .and_then(|m| m.message)
                .or_else(|| Some(item.clone()))
        })
        .filter(|m| !m.trim().is_empty())
        .collect()
}
