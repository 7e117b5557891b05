//! Single-flight access-token refresh with a queue of waiting requests.
//!
//! A [`RefreshCoordinator`] owns the `refreshing` flag and the pending waiter queue behind one
//! lock. The first caller that observes an authentication failure while the flag is clear becomes
//! the initiator and receives a [`RefreshLease`]; every caller arriving while the flag is set
//! receives a [`RefreshWaiter`] instead. Settling the lease clears the flag and fans the shared
//! outcome out to every waiter in arrival order. A lease dropped before settling (the initiating
//! future was cancelled) settles the cycle with [`Error::RefreshAbandoned`], so the flag can never
//! stay set and waiters are never stranded.

mod metrics;
mod remote;

pub use metrics::RefreshMetrics;
pub use remote::HttpTokenRefresher;

// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	obs::{self, FlowKind, FlowOutcome},
};

/// Outcome shared by every participant of one refresh cycle.
pub type SharedOutcome = Result<TokenSecret, Arc<Error>>;

/// Boxed future returned by [`TokenRefresher::refresh_access_token`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenSecret>> + 'a + Send>>;

/// Exchanges the refresh credential for a new access token.
///
/// Implementations are expected to persist the new token before resolving so requests issued
/// after the cycle settles pick it up from the store.
pub trait TokenRefresher
where
	Self: Send + Sync,
{
	/// Performs one refresh call.
	fn refresh_access_token(&self) -> RefreshFuture<'_>;
}

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	queue: Vec<oneshot::Sender<SharedOutcome>>,
}

/// Coordinates at most one in-flight refresh and the requests waiting on it.
#[derive(Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Joins the current refresh cycle or starts a new one.
	///
	/// The flag check and its mutation happen inside a single critical section.
	pub fn enter(&self) -> RefreshTurn<'_> {
		let mut state = self.state.lock();

		if state.refreshing {
			let (sender, receiver) = oneshot::channel();

			state.queue.push(sender);
			drop(state);
			self.metrics.record_queued();
			obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Queued);

			RefreshTurn::Wait(RefreshWaiter(receiver))
		} else {
			state.refreshing = true;
			drop(state);
			self.metrics.record_attempt();
			obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Attempt);

			RefreshTurn::Lead(RefreshLease { coordinator: self, settled: false })
		}
	}

	/// Runs `refresher` if no refresh is in flight, otherwise waits for the in-flight one.
	///
	/// Every participant of the cycle observes the same outcome; failures surface as
	/// [`Error::RefreshFailed`] wrapping the shared error.
	pub async fn refresh_with<R>(&self, refresher: &R) -> Result<TokenSecret>
	where
		R: ?Sized + TokenRefresher,
	{
		match self.enter() {
			RefreshTurn::Lead(lease) => {
				let outcome = refresher.refresh_access_token().await.map_err(Arc::new);

				lease.settle(outcome).map_err(Error::RefreshFailed)
			},
			RefreshTurn::Wait(waiter) => waiter.wait().await,
		}
	}

	/// Returns `true` while a refresh cycle is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.state.lock().refreshing
	}

	/// Returns the number of requests currently waiting on the in-flight refresh.
	pub fn pending(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Returns the refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	fn settle(&self, outcome: &SharedOutcome) {
		let waiters = {
			let mut state = self.state.lock();

			state.refreshing = false;

			std::mem::take(&mut state.queue)
		};

		match outcome {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Failure);
			},
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(waiters = waiters.len(), success = outcome.is_ok(), "refresh settled");

		for waiter in waiters {
			// A waiter whose caller went away has dropped its receiver.
			let _ = waiter.send(outcome.clone());
		}
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &state.refreshing)
			.field("pending", &state.queue.len())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Role assigned by [`RefreshCoordinator::enter`].
#[derive(Debug)]
pub enum RefreshTurn<'a> {
	/// The caller started the cycle and must settle it.
	Lead(RefreshLease<'a>),
	/// The caller joined an in-flight cycle.
	Wait(RefreshWaiter),
}

/// Obligation to settle the refresh cycle the holder started.
pub struct RefreshLease<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl RefreshLease<'_> {
	/// Clears the refresh flag and releases every waiter with `outcome`, returning it.
	pub fn settle(mut self, outcome: SharedOutcome) -> SharedOutcome {
		self.settled = true;
		self.coordinator.settle(&outcome);

		outcome
	}
}
impl Debug for RefreshLease<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshLease").field("settled", &self.settled).finish()
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if !self.settled {
			self.coordinator.settle(&Err(Arc::new(Error::RefreshAbandoned)));
		}
	}
}

/// Handle for a request suspended until the in-flight refresh settles.
#[derive(Debug)]
pub struct RefreshWaiter(oneshot::Receiver<SharedOutcome>);
impl RefreshWaiter {
	/// Waits for the cycle to settle and returns the refreshed token or the shared failure.
	pub async fn wait(self) -> Result<TokenSecret> {
		match self.0.await {
			Ok(Ok(token)) => Ok(token),
			Ok(Err(err)) => Err(Error::RefreshFailed(err)),
			Err(oneshot::Canceled) => Err(Error::RefreshAbandoned),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn status_error(status: u16) -> Arc<Error> {
		Arc::new(Error::Status { path: "/members/refresh-token".into(), status, body: String::new() })
	}

	#[tokio::test]
	async fn first_entrant_leads_and_later_entrants_wait() {
		let coordinator = RefreshCoordinator::default();
		let lease = match coordinator.enter() {
			RefreshTurn::Lead(lease) => lease,
			RefreshTurn::Wait(_) => panic!("The first entrant must lead the refresh."),
		};
		let waiters: Vec<_> = (0..2)
			.map(|_| match coordinator.enter() {
				RefreshTurn::Wait(waiter) => waiter,
				RefreshTurn::Lead(_) => panic!("Entrants during a refresh must wait."),
			})
			.collect();

		assert!(coordinator.is_refreshing());
		assert_eq!(coordinator.pending(), 2);

		let outcome = lease.settle(Ok(TokenSecret::new("fresh")));

		assert!(outcome.is_ok());
		assert!(!coordinator.is_refreshing());
		assert_eq!(coordinator.pending(), 0);

		for waiter in waiters {
			let token = waiter.wait().await.expect("Waiters should receive the refreshed token.");

			assert_eq!(token.expose(), "fresh");
		}

		assert_eq!(coordinator.metrics().attempts(), 1);
		assert_eq!(coordinator.metrics().successes(), 1);
		assert_eq!(coordinator.metrics().queued(), 2);
	}

	#[tokio::test]
	async fn failure_is_shared_with_every_waiter() {
		let coordinator = RefreshCoordinator::default();
		let RefreshTurn::Lead(lease) = coordinator.enter() else {
			panic!("The first entrant must lead the refresh.");
		};
		let RefreshTurn::Wait(waiter) = coordinator.enter() else {
			panic!("The second entrant must wait.");
		};
		let shared = status_error(401);

		lease.settle(Err(shared.clone())).expect_err("Lead should observe the failure.");

		match waiter.wait().await {
			Err(Error::RefreshFailed(err)) => assert!(Arc::ptr_eq(&err, &shared)),
			other => panic!("Unexpected waiter outcome: {other:?}."),
		}

		assert_eq!(coordinator.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn dropped_lease_abandons_cycle_and_resets_flag() {
		let coordinator = RefreshCoordinator::default();
		let RefreshTurn::Lead(lease) = coordinator.enter() else {
			panic!("The first entrant must lead the refresh.");
		};
		let RefreshTurn::Wait(waiter) = coordinator.enter() else {
			panic!("The second entrant must wait.");
		};

		drop(lease);

		assert!(!coordinator.is_refreshing());

		match waiter.wait().await {
			Err(Error::RefreshFailed(err)) => assert!(matches!(*err, Error::RefreshAbandoned)),
			other => panic!("Unexpected waiter outcome: {other:?}."),
		}

		assert!(
			matches!(coordinator.enter(), RefreshTurn::Lead(_)),
			"A new cycle must start after an abandoned one."
		);
	}

	#[tokio::test]
	async fn queue_does_not_leak_across_cycles() {
		let coordinator = RefreshCoordinator::default();
		let RefreshTurn::Lead(first) = coordinator.enter() else {
			panic!("The first entrant must lead the refresh.");
		};
		let RefreshTurn::Wait(_abandoned_waiter) = coordinator.enter() else {
			panic!("The second entrant must wait.");
		};

		first.settle(Err(status_error(500))).expect_err("First cycle fails.");

		let RefreshTurn::Lead(second) = coordinator.enter() else {
			panic!("A settled cycle must let the next entrant lead.");
		};

		assert_eq!(coordinator.pending(), 0);

		second.settle(Ok(TokenSecret::new("second"))).expect("Second cycle succeeds.");

		assert_eq!(coordinator.metrics().attempts(), 2);
	}
}
