//! Transport-agnostic request descriptors replayed by the refresh coordinator.

// self
use crate::_prelude::*;

/// HTTP methods issued by the marketplace client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request payload kept in replayable form.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// JSON document sent as `application/json`.
	Json(serde_json::Value),
	/// Pre-encoded bytes with an explicit content type (e.g. multipart forms).
	Raw {
		/// Value for the `content-type` header.
		content_type: String,
		/// Encoded payload.
		bytes: Vec<u8>,
	},
}

/// Descriptor for an outbound API call.
///
/// The descriptor owns everything needed to rebuild the wire request, so a call that failed
/// authentication can be replayed with a fresh token. The `retried` flag guards against refresh
/// loops: a descriptor that already went through one refresh is never queued again.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL, or an absolute `http(s)` URL.
	pub path: String,
	/// Query pairs appended after path resolution.
	pub query: Vec<(String, String)>,
	/// Extra headers; names are stored lowercase.
	pub headers: BTreeMap<String, String>,
	/// Request payload.
	pub body: RequestBody,
	retried: bool,
}
impl ApiRequest {
	/// Creates a descriptor for the provided method and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: RequestBody::Empty,
			retried: false,
		}
	}

	/// Shorthand for a `GET` descriptor.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` descriptor.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` descriptor.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` descriptor.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` descriptor.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Appends a query pair.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets a header, replacing any previous value for the same name.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Attaches a JSON body.
	pub fn json(mut self, value: impl Into<serde_json::Value>) -> Self {
		self.body = RequestBody::Json(value.into());

		self
	}

	/// Serializes `value` into a JSON body.
	pub fn json_from<T>(self, value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let value = serde_json::to_value(value)
			.map_err(|source| crate::error::ConfigError::InvalidBody { source })?;

		Ok(self.json(value))
	}

	/// Attaches a pre-encoded body.
	pub fn raw(mut self, content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		self.body = RequestBody::Raw { content_type: content_type.into(), bytes: bytes.into() };

		self
	}

	/// Marks the descriptor as already retried once.
	pub fn mark_retried(mut self) -> Self {
		self.retried = true;

		self
	}

	/// Returns `true` once the descriptor has been through a refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn set_retried(&mut self) {
		self.retried = true;
	}
}
