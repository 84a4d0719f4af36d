//! Api request descriptors
//!
//! An [`ApiRequest`] is an immutable description of one asynchronous resource
//! operation: which logical api target, which endpoint, which normalization
//! schema, and which lifecycle labels the resulting actions carry. Guards
//! build descriptors; the execution middleware interprets them. Descriptors
//! never perform work themselves.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Schema;

/// Correlation fields attached to a descriptor and echoed verbatim on every
/// lifecycle action produced for it.
pub type Meta = serde_json::Map<String, Value>;

/// The request/success/failure label triple for one resource operation.
///
/// Labels double as action names for reducers, logging, and log filtering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    request: Cow<'static, str>,
    success: Cow<'static, str>,
    failure: Cow<'static, str>,
}

impl Lifecycle {
    /// Build a lifecycle from static label strings, usable in `const` items.
    pub const fn from_static(
        request: &'static str,
        success: &'static str,
        failure: &'static str,
    ) -> Self {
        Self {
            request: Cow::Borrowed(request),
            success: Cow::Borrowed(success),
            failure: Cow::Borrowed(failure),
        }
    }

    /// The REQUEST label.
    pub fn request(&self) -> &str {
        &self.request
    }

    /// The SUCCESS label.
    pub fn success(&self) -> &str {
        &self.success
    }

    /// The FAILURE label.
    pub fn failure(&self) -> &str {
        &self.failure
    }
}

/// HTTP-shaped method of a descriptor. Reads default to GET.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Uppercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Immutable descriptor of one asynchronous resource operation.
///
/// Constructed once by a guard, then cloned onto every lifecycle action so
/// reducers can route on its labels and correlation fields. Fields are
/// private; builder methods consume and return the descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    lifecycle: Lifecycle,
    target: String,
    endpoint: String,
    schema: Schema,
    #[serde(default)]
    method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    meta: Meta,
}

impl ApiRequest {
    /// Describe an operation on `endpoint` of the logical `target` api.
    /// The method defaults to GET.
    ///
    /// `endpoint` may be a path relative to the target's base url, or a full
    /// continuation url taken from a pagination cursor.
    pub fn new(
        target: impl Into<String>,
        endpoint: impl Into<String>,
        schema: Schema,
        lifecycle: Lifecycle,
    ) -> Self {
        Self {
            lifecycle,
            target: target.into(),
            endpoint: endpoint.into(),
            schema,
            method: Method::Get,
            body: None,
            meta: Meta::new(),
        }
    }

    /// Override the method (writes use [`Method::Put`]).
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Attach a JSON body (serialized entity for writes).
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a correlation field, echoed verbatim on lifecycle actions.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Lifecycle labels for the resulting actions.
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Logical api target identifier.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Endpoint path or full continuation url.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Normalization schema for the response.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Request body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// All correlation fields.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// A correlation field as a string, when present and a string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// Key identifying this request for in-flight deduplication.
    ///
    /// Two descriptors collide exactly when they would issue the same
    /// network operation.
    pub fn fingerprint(&self) -> String {
        format!("{} {} {}", self.method.as_str(), self.target, self.endpoint)
    }
}
