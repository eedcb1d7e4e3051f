//! Scripted collaborators for driving the coordinators through exact
//! interleavings.
//!
//! A [`Gate`] parks the calling collaborator method until the test lets it
//! through. Dropping the gate's controller opens it for good, so a test that
//! loses track of a worker can never hang on it.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use autolist_core::{
    CollaboratorError, Collaborators, ExecutionContext, ListId, ListItem, MemberKey,
    MembershipTransaction, MembershipWriter, MemoryMembershipStore, MemoryPortfolio,
    PortfolioSource, Principal, ProjectList, SessionContextFactory, UpdaterConfig,
};
use autolist_updater::AutoListUpdater;

/// How long a "must stay blocked" check watches before accepting.
pub const PROBE: Duration = Duration::from_millis(100);
/// Upper bound for anything a test expects to happen.
pub const WAIT: Duration = Duration::from_secs(10);

/// Poll `condition` until it holds; panics after [`WAIT`].
pub fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn keys(names: &[&str]) -> BTreeSet<MemberKey> {
    names.iter().map(|n| MemberKey::from(*n)).collect()
}

/// `count` zero-padded member names, so sorted order matches numeric order.
pub fn members(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("p{i:04}")).collect()
}

pub fn author() -> Principal {
    Principal::new("alice")
}

pub fn favourites() -> ProjectList {
    ProjectList::new("favourites", "Favourites", author())
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Collaborator side of a gate. Open until [`Gate::arm`] is called.
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<Mutex<Option<Arc<GateShared>>>>,
}

struct GateShared {
    entered: Mutex<Sender<usize>>,
    proceed: Mutex<Receiver<()>>,
    calls: AtomicUsize,
}

/// Test side of a gate.
pub struct GateControl {
    entered: Receiver<usize>,
    proceed: Sender<()>,
}

impl Gate {
    /// Arm the gate; every subsequent pass parks until released.
    pub fn arm(&self) -> GateControl {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (proceed_tx, proceed_rx) = mpsc::channel();
        *self.inner.lock() = Some(Arc::new(GateShared {
            entered: Mutex::new(entered_tx),
            proceed: Mutex::new(proceed_rx),
            calls: AtomicUsize::new(0),
        }));
        GateControl {
            entered: entered_rx,
            proceed: proceed_tx,
        }
    }

    fn pass(&self) {
        let shared = self.inner.lock().clone();
        let Some(shared) = shared else { return };
        let n = shared.calls.fetch_add(1, Ordering::AcqRel);
        if shared.entered.lock().send(n).is_err() {
            return;
        }
        // A dropped controller opens the gate.
        let _ = shared.proceed.lock().recv();
    }
}

impl GateControl {
    /// Wait for the next caller to park at the gate; returns its call index.
    pub fn entered(&self) -> usize {
        self.entered
            .recv_timeout(WAIT)
            .expect("a caller should reach the gate")
    }

    /// `true` if nobody reached the gate within `probe`.
    pub fn stays_closed_for(&self, probe: Duration) -> bool {
        matches!(
            self.entered.recv_timeout(probe),
            Err(RecvTimeoutError::Timeout)
        )
    }

    /// Let one parked caller through.
    pub fn release_one(&self) {
        self.proceed.send(()).expect("gate open");
    }
}

// ---------------------------------------------------------------------------
// Scripted portfolio
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedPortfolio {
    pub inner: MemoryPortfolio,
    pub members_gate: Gate,
    pub filter_gate: Gate,
    pub fail_reads: Mutex<bool>,
    pub filter_calls: AtomicUsize,
}

impl ScriptedPortfolio {
    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    fn check(&self) -> Result<(), CollaboratorError> {
        if *self.fail_reads.lock() {
            return Err(CollaboratorError::PortfolioUnavailable(
                "scripted outage".to_string(),
            ));
        }
        Ok(())
    }
}

impl PortfolioSource for ScriptedPortfolio {
    fn portfolio_members(
        &self,
        ctx: &ExecutionContext,
        list: &ListId,
    ) -> Result<BTreeSet<MemberKey>, CollaboratorError> {
        self.members_gate.pass();
        self.check()?;
        self.inner.portfolio_members(ctx, list)
    }

    fn filter_members_by_portfolio(
        &self,
        ctx: &ExecutionContext,
        list: &ListId,
        keys: &BTreeSet<MemberKey>,
    ) -> Result<BTreeSet<MemberKey>, CollaboratorError> {
        self.filter_calls.fetch_add(1, Ordering::AcqRel);
        self.filter_gate.pass();
        self.check()?;
        self.inner.filter_members_by_portfolio(ctx, list, keys)
    }
}

// ---------------------------------------------------------------------------
// Scripted membership store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedStore {
    pub inner: MemoryMembershipStore,
    pub create_gate: Gate,
    /// 0-based index of the `create_items` call that should fail.
    pub fail_create_call: Mutex<Option<usize>>,
    pub create_calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn fail_create_call(&self, index: usize) {
        *self.fail_create_call.lock() = Some(index);
    }
}

struct ScriptedTransaction<'a> {
    store: &'a ScriptedStore,
    inner: Box<dyn MembershipTransaction + 'a>,
}

impl MembershipTransaction for ScriptedTransaction<'_> {
    fn delete_items_by_list(&mut self, list: &ListId) -> Result<usize, CollaboratorError> {
        self.inner.delete_items_by_list(list)
    }

    fn delete_items_by_keys_and_list(
        &mut self,
        keys: &BTreeSet<MemberKey>,
        list: &ListId,
    ) -> Result<usize, CollaboratorError> {
        self.inner.delete_items_by_keys_and_list(keys, list)
    }

    fn create_items(&mut self, items: &[ListItem]) -> Result<(), CollaboratorError> {
        let call = self.store.create_calls.fetch_add(1, Ordering::AcqRel);
        self.store.create_gate.pass();
        if *self.store.fail_create_call.lock() == Some(call) {
            return Err(CollaboratorError::Write(format!("scripted failure on call {call}")));
        }
        self.inner.create_items(items)
    }

    fn items_by_keys_and_list(
        &mut self,
        keys: &BTreeSet<MemberKey>,
        list: &ListId,
    ) -> Result<Vec<ListItem>, CollaboratorError> {
        self.inner.items_by_keys_and_list(keys, list)
    }

    fn commit(self: Box<Self>) -> Result<(), CollaboratorError> {
        self.inner.commit()
    }
}

impl MembershipWriter for ScriptedStore {
    fn begin<'a>(
        &'a self,
        ctx: &ExecutionContext,
    ) -> Result<Box<dyn MembershipTransaction + 'a>, CollaboratorError> {
        let inner = self.inner.begin(ctx)?;
        Ok(Box::new(ScriptedTransaction { store: self, inner }))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub portfolio: Arc<ScriptedPortfolio>,
    pub store: Arc<ScriptedStore>,
    pub contexts: Arc<SessionContextFactory>,
    pub list: ProjectList,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            portfolio: Arc::new(ScriptedPortfolio::default()),
            store: Arc::new(ScriptedStore::default()),
            contexts: Arc::new(SessionContextFactory::new()),
            list: favourites(),
        }
    }

    pub fn with_members<S: AsRef<str>>(self, names: &[S]) -> Self {
        self.portfolio
            .inner
            .set_members(&self.list.id, names.iter().map(|n| n.as_ref().to_string()));
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.portfolio.clone(),
            self.store.clone(),
            self.contexts.clone(),
        )
    }

    pub fn updater(&self, config: UpdaterConfig) -> AutoListUpdater {
        AutoListUpdater::new(self.list.clone(), self.collaborators(), &config)
            .expect("valid config")
    }

    pub fn stored_members(&self) -> BTreeSet<MemberKey> {
        self.store.inner.members(&self.list.id)
    }

    pub fn stored_count(&self) -> usize {
        self.store.inner.items(&self.list.id).len()
    }

    pub fn seed(&self, names: &[&str]) {
        let items = names
            .iter()
            .enumerate()
            .map(|(i, n)| ListItem::new(self.list.id.clone(), (*n).into(), Some(i as u64)))
            .collect();
        self.store.inner.seed(&self.list.id, items);
    }
}
