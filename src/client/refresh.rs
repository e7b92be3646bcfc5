//! Refresh coordination with single-flight episodes and replay of stalled requests.
//!
//! When a request fails with HTTP 401, [`ApiClient::send`] hands it to the coordinator. The
//! first failure of an episode lazily creates a shared refresh future and parks it in the
//! client's refresh slot; every failure that arrives while the slot is occupied subscribes to
//! the same future instead of issuing another refresh call. The future stores the new pair (or
//! clears the store) and empties the slot before resolving, so each subscriber then either
//! replays its request once with the new access token or returns the 401 it received.
//!
//! The shared future is driven by whichever subscriber polls it, so dropping one caller never
//! stalls the others.

mod metrics;

pub use self::metrics::RefreshMetrics;

// std
use std::sync::Weak;
// crates.io
use futures_util::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::{TokenPair, TokenSecret},
	client::{ApiClient, execute_checked, pipeline},
	config::ClientConfig,
	error::FailureClass,
	http::{ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::ApiRequest,
	store::{CompareAndSwapOutcome, TokenStore},
};

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

const SUPERSEDED: &str = "session changed while the refresh was in flight";

/// Outcome broadcast to every subscriber of a refresh episode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The refresh endpoint issued a new access token, already written to the store.
	Renewed(TokenSecret),
	/// No new token is available: the refresh failed and its session was cleared, or the
	/// session was replaced or ended while the refresh was in flight.
	Rejected {
		/// HTTP status from the refresh endpoint, when one was received.
		status: Option<u16>,
		/// Human-readable failure summary.
		reason: String,
	},
}

/// Coordinator slot shared by every clone of a client.
#[derive(Default)]
pub(crate) struct RefreshState(Mutex<RefreshSlot>);
impl RefreshState {
	/// Returns the in-flight refresh, or installs the one built by `start`.
	///
	/// The boolean is `true` when this call started a new episode.
	fn join_or_start<F>(&self, start: F) -> (SharedRefresh, bool)
	where
		F: FnOnce(u64) -> BoxFuture<'static, RefreshOutcome>,
	{
		let mut slot = self.0.lock();

		if let Some(inflight) = &slot.inflight {
			return (inflight.clone(), false);
		}

		slot.episode += 1;

		let shared = start(slot.episode).shared();

		slot.inflight = Some(shared.clone());

		(shared, true)
	}

	/// Tears the episode down so the next failure starts a fresh refresh.
	fn settle(&self, episode: u64) {
		let mut slot = self.0.lock();

		if slot.episode == episode {
			slot.inflight = None;
		}
	}

	fn is_refreshing(&self) -> bool {
		self.0.lock().inflight.is_some()
	}
}

#[derive(Default)]
struct RefreshSlot {
	episode: u64,
	inflight: Option<SharedRefresh>,
}

#[derive(Deserialize)]
struct RefreshResponse {
	access: String,
	#[serde(default)]
	refresh: Option<String>,
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Exchanges the stored refresh token for a new access token.
	///
	/// Joins the in-flight refresh when one exists, so this never adds a second refresh call to
	/// an episode. Without a stored refresh token the session is cleared and
	/// [`Error::MissingRefreshToken`] is returned.
	pub async fn refresh_access_token(&self) -> Result<TokenSecret> {
		let Some(refresh) = self.store.refresh_token() else {
			self.end_session();

			return Err(Error::MissingRefreshToken);
		};

		match self.await_refresh(refresh).await {
			RefreshOutcome::Renewed(access) => Ok(access),
			RefreshOutcome::Rejected { status, reason } =>
				Err(Error::RefreshRejected { status, reason }),
		}
	}

	/// Returns `true` while a refresh episode is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.refresh_state.is_refreshing()
	}

	/// Handles a failed first attempt of `request`.
	pub(crate) async fn recover(&self, mut request: ApiRequest, err: Error) -> Result<ApiResponse> {
		let class = FailureClass::of(&err, request.is_retried());

		if class != FailureClass::ExpiredCredential {
			report(class, &request);

			return Err(err);
		}

		request.set_retried();

		let Some(refresh) = self.store.refresh_token() else {
			self.end_session();
			report(FailureClass::RefreshExhausted, &request);

			return Err(err);
		};

		report(class, &request);

		match self.await_refresh(refresh).await {
			RefreshOutcome::Renewed(access) =>
				self.dispatch(&request, Some(&access)).await.inspect_err(|replay_err| {
					report(FailureClass::of(replay_err, true), &request);
				}),
			RefreshOutcome::Rejected { .. } => {
				report(FailureClass::RefreshRejected, &request);

				Err(err)
			},
		}
	}

	async fn await_refresh(&self, refresh: TokenSecret) -> RefreshOutcome {
		let (shared, started) = self
			.refresh_state
			.join_or_start(|episode| self.refresh_episode(episode, refresh));

		if !started {
			self.refresh_metrics.record_join();
		}

		shared.await
	}

	/// Builds the episode's refresh future.
	///
	/// The future owns clones of the transport, store, and config plus a weak handle to the
	/// coordinator slot; the slot holds the future, so a strong handle would form a cycle.
	fn refresh_episode(
		&self,
		episode: u64,
		refresh: TokenSecret,
	) -> BoxFuture<'static, RefreshOutcome> {
		const KIND: FlowKind = FlowKind::Refresh;

		let transport = self.transport.clone();
		let store = self.store.clone();
		let config = self.config.clone();
		let metrics = self.refresh_metrics.clone();
		let state = Arc::downgrade(&self.refresh_state);
		let span = FlowSpan::new(KIND, "refresh_episode");

		async move {
			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
			metrics.record_attempt();

			let exchange = exchange_refresh_token(transport.as_ref(), &config, &refresh);
			let result = span.instrument(exchange).await;

			obs::record_result(KIND, &result);

			let outcome = match result {
				Ok(response) => {
					let access = TokenSecret::new(response.access);
					let pair = TokenPair::refreshed(
						refresh.clone(),
						access.clone(),
						response.refresh.map(TokenSecret::new),
					);

					match store.replace_if_refresh(&refresh, pair) {
						Ok(CompareAndSwapOutcome::Updated) => {
							metrics.record_success();

							RefreshOutcome::Renewed(access)
						},
						// Logged out or logged in again while the call was in flight.
						Ok(outcome) => {
							obs::trace_refresh_superseded(episode, outcome);
							metrics.record_failure();

							RefreshOutcome::Rejected { status: None, reason: SUPERSEDED.into() }
						},
						Err(e) => {
							obs::trace_ignored_failure("refresh_store_set", &e);
							metrics.record_success();

							RefreshOutcome::Renewed(access)
						},
					}
				},
				Err(err) => {
					match store.clear_if_refresh(&refresh) {
						Ok(CompareAndSwapOutcome::Updated) => (),
						Ok(outcome) => obs::trace_refresh_superseded(episode, outcome),
						Err(e) => obs::trace_ignored_failure("clear_session", &e),
					}

					metrics.record_failure();

					RefreshOutcome::Rejected { status: err.status(), reason: err.to_string() }
				},
			};

			settle(&state, episode);

			match &outcome {
				RefreshOutcome::Renewed(_) => obs::trace_refresh_settled(episode, true, None),
				RefreshOutcome::Rejected { reason, .. } =>
					obs::trace_refresh_settled(episode, false, Some(reason)),
			}

			outcome
		}
		.boxed()
	}

	pub(crate) fn end_session(&self) {
		clear_store(self.store.as_ref());
	}
}

async fn exchange_refresh_token<T>(
	transport: &T,
	config: &ClientConfig,
	refresh: &TokenSecret,
) -> Result<RefreshResponse>
where
	T: ?Sized + HttpTransport,
{
	let request = ApiRequest::post(config.endpoints.refresh.as_str())
		.json(serde_json::json!({ "refresh": refresh.expose() }));
	let mut prepared = pipeline::prepare_unauthenticated(config, &request)?;

	prepared.timeout = config.refresh_timeout_std();

	execute_checked(transport, prepared).await?.json()
}

fn settle(state: &Weak<RefreshState>, episode: u64) {
	if let Some(state) = state.upgrade() {
		state.settle(episode);
	}
}

fn clear_store(store: &dyn TokenStore) {
	if let Err(e) = store.clear() {
		obs::trace_ignored_failure("clear_session", &e);
	}
}

fn report(class: FailureClass, request: &ApiRequest) {
	obs::record_auth_failure(class);
	obs::trace_auth_failure(class, request.method, &request.path);
}
