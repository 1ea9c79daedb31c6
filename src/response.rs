//! Standard response envelope: `{"ok": 1, "err": "", "data": {...}}` or `{"ok": 0, "err": "<code>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: u8,
    pub err: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Envelope {
    pub fn success(data: Map<String, Value>) -> Self {
        Envelope {
            ok: 1,
            err: String::new(),
            data: Some(data),
        }
    }

    pub fn failure(code: &str) -> Self {
        Envelope {
            ok: 0,
            err: code.to_string(),
            data: None,
        }
    }
}

pub fn success(status: StatusCode, data: Map<String, Value>) -> (StatusCode, Json<Envelope>) {
    (status, Json(Envelope::success(data)))
}

pub fn failure(
    status: StatusCode,
    code: &str,
    data: Option<Map<String, Value>>,
) -> (StatusCode, Json<Envelope>) {
    let mut body = Envelope::failure(code);
    body.data = data;
    (status, Json(body))
}

/// Successful dispatch result: status plus the `data` object of the envelope.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub data: Map<String, Value>,
}

impl Reply {
    pub fn new(status: StatusCode) -> Self {
        Reply {
            status,
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        success(self.status, self.data).into_response()
    }
}
