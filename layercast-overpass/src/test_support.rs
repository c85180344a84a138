//! Test doubles and helpers shared by the unit and behaviour tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use async_trait::async_trait;

use crate::source::{FetchOutcome, OverpassSource};

/// A source that replays queued outcomes and records the queries it saw.
#[derive(Debug, Default)]
pub struct StubSource {
    outcomes: RefCell<VecDeque<FetchOutcome>>,
    queries: RefCell<Vec<String>>,
}

impl StubSource {
    /// A stub that replays `outcomes` in order.
    #[must_use]
    pub fn new(outcomes: impl IntoIterator<Item = FetchOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into_iter().collect()),
            queries: RefCell::new(Vec::new()),
        }
    }

    /// A stub that answers every query with HTTP 200 and `body`.
    #[must_use]
    pub fn with_body(body: impl Into<Vec<u8>>) -> Self {
        Self::new([FetchOutcome::Ok {
            body: body.into(),
            status: 200,
        }])
    }

    /// The queries issued so far, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

#[async_trait(?Send)]
impl OverpassSource for StubSource {
    fn endpoint(&self) -> &str {
        "stub://overpass"
    }

    async fn fetch(&self, query: &str) -> FetchOutcome {
        self.queries.borrow_mut().push(query.to_owned());
        self.outcomes.borrow_mut().pop_front().unwrap_or_else(|| {
            FetchOutcome::TransportError {
                url: "stub://overpass".to_owned(),
                message: "stub exhausted".to_owned(),
            }
        })
    }
}

/// A source whose fetch never completes, for exercising deadlines.
#[derive(Debug, Default)]
pub struct PendingSource;

#[async_trait(?Send)]
impl OverpassSource for PendingSource {
    fn endpoint(&self) -> &str {
        "stub://pending"
    }

    async fn fetch(&self, _query: &str) -> FetchOutcome {
        std::future::pending().await
    }
}

/// Drive `future` to completion on a single-threaded runtime.
///
/// # Panics
///
/// Panics when the runtime cannot be built, which only happens when the
/// process is out of resources.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build single-threaded runtime")
        .block_on(future)
}
