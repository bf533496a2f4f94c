// Per-request handle passed to controller handlers

use crate::{HttpRequest, HttpResponse, Result};
use serde::Serialize;

/// Request and response handles for one handler invocation.
///
/// `response` starts out as an empty `200 OK`; a handler that wants to shape
/// the response itself fills it in and returns [`Exchange::respond`].
#[derive(Debug)]
pub struct Exchange {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

impl Exchange {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            response: HttpResponse::ok(),
        }
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.request.query(name)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.param(name)
    }

    /// Send the response built on this exchange
    pub fn respond(self) -> Reply {
        Reply::Response(self.response)
    }

    /// Serialize `value` into the exchange response and send it
    pub fn send<T: Serialize>(mut self, value: &T) -> Result<Reply> {
        let status = self.response.status;
        self.response = self.response.with_json(value)?.with_status(status);
        Ok(self.respond())
    }

    /// Pass the request on to the next matching route
    pub fn next(self) -> Reply {
        Reply::Next
    }
}

/// What a handler produced
#[derive(Debug)]
pub enum Reply {
    /// A response the handler built itself
    Response(HttpResponse),
    /// A value to serialize as the body of a `200 OK`
    Json(serde_json::Value),
    /// Nothing to send; answered with `204 No Content`
    Empty,
    /// Continue with the next route matching the request
    Next,
}

impl Reply {
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Reply::Json(serde_json::to_value(value)?))
    }
}

impl From<HttpResponse> for Reply {
    fn from(response: HttpResponse) -> Self {
        Reply::Response(response)
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Reply::Json(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}
