//! Request pipeline: turns an [`ApiRequest`] into a [`PreparedRequest`] carrying the current
//! bearer credential.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	error::ConfigError,
	http::{PreparedBody, PreparedRequest},
	request::{ApiRequest, RequestBody},
	store::TokenStore,
};

/// Lowercase name of the credential header.
pub const AUTHORIZATION: &str = "authorization";

/// Resolves, encodes, and authenticates a request.
///
/// The access token comes from `token` when the coordinator replays a request with the token its
/// refresh produced, otherwise from the store. Without a token the request goes out
/// unauthenticated; the server decides whether the endpoint needs one.
pub(crate) fn prepare(
	config: &ClientConfig,
	store: &dyn TokenStore,
	request: &ApiRequest,
	token: Option<&TokenSecret>,
) -> Result<PreparedRequest> {
	let mut prepared = prepare_unauthenticated(config, request)?;
	let token = match token {
		Some(token) => Some(token.clone()),
		None => store.access_token(),
	};

	if let Some(token) = token {
		prepared.headers.insert(AUTHORIZATION.into(), token.bearer());
	}

	Ok(prepared)
}

/// Resolves and encodes a request without consulting the token store.
pub(crate) fn prepare_unauthenticated(
	config: &ClientConfig,
	request: &ApiRequest,
) -> Result<PreparedRequest> {
	let url = resolve_url(&config.base_url, request)?;
	let body = encode_body(&request.body)?;

	Ok(PreparedRequest {
		method: request.method,
		url,
		headers: request.headers.clone(),
		body,
		timeout: config.request_timeout_std(),
	})
}

fn resolve_url(base: &Url, request: &ApiRequest) -> Result<Url> {
	let path = request.path.as_str();
	let invalid = |source| ConfigError::InvalidUrl { path: path.to_owned(), source };
	let mut url = if path.starts_with("http://") || path.starts_with("https://") {
		Url::parse(path).map_err(invalid)?
	} else {
		base.join(path.trim_start_matches('/')).map_err(invalid)?
	};

	if !request.query.is_empty() {
		url.query_pairs_mut().extend_pairs(request.query.iter());
	}

	Ok(url)
}

fn encode_body(body: &RequestBody) -> Result<Option<PreparedBody>> {
	match body {
		RequestBody::Empty => Ok(None),
		RequestBody::Json(value) => {
			let bytes =
				serde_json::to_vec(value).map_err(|source| ConfigError::InvalidBody { source })?;

			Ok(Some(PreparedBody { content_type: "application/json".into(), bytes }))
		},
		RequestBody::Raw { content_type, bytes } =>
			Ok(Some(PreparedBody { content_type: content_type.clone(), bytes: bytes.clone() })),
	}
}
