//! Marshaling of secret requests onto the owning thread
//!
//! One thread owns the [`SecretService`]. Any thread may hold a cloned
//! [`Dispatcher`] and either post fire-and-forget jobs or make blocking
//! calls that return once the owner has executed the request and sent the
//! whole result back. A call made on the owner thread runs inline.
//!
//! # Lifecycle
//!
//! Calls fail with `SecretError::NotReady` until an [`OwnerLoop`] attaches a
//! service, and again after [`Dispatcher::shutdown`]. Requests still queued
//! at shutdown are dropped and their callers receive `NotReady`.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, info_span, warn};

use super::cancel::CancellationToken;
use super::service::{CommitReport, SecretService};
use crate::error::{CommitError, SecretError, SecretResult};
use crate::models::{ConnectionId, ConnectionProfile, SecretKind, WindowHandle};
use crate::tracing::span_names;

/// Interval at which a blocked caller re-checks for teardown
const TEARDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(50);

const STATE_PENDING: u8 = 0;
const STATE_READY: u8 = 1;
const STATE_TORN_DOWN: u8 = 2;

// The service attached on this thread, if this thread is an owner
thread_local! {
    static OWNER_SERVICE: RefCell<Option<SecretService>> = const { RefCell::new(None) };
}

type Job = Box<dyn FnOnce(&mut SecretService) + Send>;

enum Message {
    Job(Job),
    Shutdown(mpsc::SyncSender<()>),
}

struct Shared {
    state: AtomicU8,
    owner: OnceLock<ThreadId>,
    token: OnceLock<CancellationToken>,
}

impl Shared {
    fn state(&self) -> u8 {
        self.state.load(Ordering::SeqCst)
    }

    fn is_owner_thread(&self) -> bool {
        self.owner.get() == Some(&thread::current().id())
    }
}

fn not_ready(reason: &str) -> SecretError {
    SecretError::NotReady(reason.to_string())
}

/// Runs `f` against the service attached to the current thread
fn with_owner_service<R>(
    f: impl FnOnce(&mut SecretService) -> SecretResult<R>,
) -> SecretResult<R> {
    OWNER_SERVICE.with(|cell| {
        let mut guard = cell.try_borrow_mut().map_err(|_| {
            SecretError::Unexpected("re-entrant secret call on the owner thread".to_string())
        })?;
        let service = guard
            .as_mut()
            .ok_or_else(|| not_ready("secret service is not attached"))?;
        f(service)
    })
}

/// Cloneable handle for reaching the owning thread
#[derive(Clone)]
pub struct Dispatcher {
    sender: Sender<Message>,
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Creates a dispatcher and the loop its owner thread must run
    #[must_use]
    pub fn new() -> (Self, OwnerLoop) {
        let (sender, receiver) = mpsc::channel();
        let shared = Arc::new(Shared {
            state: AtomicU8::new(STATE_PENDING),
            owner: OnceLock::new(),
            token: OnceLock::new(),
        });
        (
            Self {
                sender,
                shared: Arc::clone(&shared),
            },
            OwnerLoop { receiver, shared },
        )
    }

    /// Spawns a dedicated owner thread running `service`
    ///
    /// The service is attached before this returns, so calls made right
    /// after succeed.
    ///
    /// # Errors
    /// Returns `SecretError::Unexpected` if the thread cannot be spawned.
    pub fn spawn_owner(service: SecretService) -> SecretResult<(Self, JoinHandle<()>)> {
        let (dispatcher, owner_loop) = Self::new();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let handle = thread::Builder::new()
            .name("connkeep-secrets".to_string())
            .spawn(move || {
                let attached = owner_loop.attach(service);
                let ok = attached.is_ok();
                let _ = ready_tx.send(attached);
                if ok {
                    owner_loop.run();
                }
            })
            .map_err(|e| SecretError::Unexpected(format!("failed to spawn owner thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| SecretError::Unexpected("owner thread exited during start".to_string()))??;
        Ok((dispatcher, handle))
    }

    /// Returns true if the owner is attached and not torn down
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.shared.state() == STATE_READY
    }

    /// Returns true once the dispatcher has been shut down
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.shared.state() == STATE_TORN_DOWN
    }

    /// Returns true if the current thread is the owner
    #[must_use]
    pub fn is_owner_thread(&self) -> bool {
        self.shared.is_owner_thread()
    }

    fn ensure_ready(&self) -> SecretResult<()> {
        match self.shared.state() {
            STATE_READY => Ok(()),
            STATE_PENDING => Err(not_ready("secret owner thread has not started")),
            _ => Err(not_ready("secret owner thread has shut down")),
        }
    }

    /// Queues a job for the owner and returns immediately
    ///
    /// The job runs after everything this thread queued before it, even
    /// when posted from the owner thread itself.
    ///
    /// # Errors
    /// `NotReady` if the owner is not running.
    pub fn post<F>(&self, job: F) -> SecretResult<()>
    where
        F: FnOnce(&mut SecretService) + Send + 'static,
    {
        self.ensure_ready()?;
        self.sender
            .send(Message::Job(Box::new(job)))
            .map_err(|_| not_ready("secret owner thread has stopped"))
    }

    /// Runs `f` on the owner and waits for its result
    ///
    /// On the owner thread `f` runs inline. Otherwise the caller blocks
    /// until the owner has executed `f` and sent the result back.
    ///
    /// # Errors
    /// `NotReady` if the owner is not running or shuts down before running
    /// `f`; otherwise whatever `f` returns.
    pub fn call<R, F>(&self, f: F) -> SecretResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut SecretService) -> SecretResult<R> + Send + 'static,
    {
        let inline = self.is_owner_thread();
        let _span = info_span!(span_names::DISPATCH_CALL, inline).entered();
        self.ensure_ready()?;

        if inline {
            return with_owner_service(f);
        }

        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        let job: Job = Box::new(move |service| {
            if reply_tx.send(f(service)).is_err() {
                debug!("Caller went away before the reply was sent");
            }
        });
        self.sender
            .send(Message::Job(job))
            .map_err(|_| not_ready("secret owner thread has stopped"))?;
        self.wait_reply(&reply_rx)
    }

    fn wait_reply<R>(&self, reply_rx: &Receiver<SecretResult<R>>) -> SecretResult<R> {
        loop {
            match reply_rx.recv_timeout(TEARDOWN_CHECK_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(not_ready("request dropped at shutdown"));
                }
                Err(RecvTimeoutError::Timeout) if self.is_torn_down() => {
                    // A reply may have landed between the timeout and the check
                    return reply_rx
                        .try_recv()
                        .unwrap_or_else(|_| Err(not_ready("request dropped at shutdown")));
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    /// Returns a connection's secret from cache, reauthentication and store
    ///
    /// # Errors
    /// See [`SecretService::get_secret`].
    pub fn get_secret(
        &self,
        connection_id: &ConnectionId,
        kind: SecretKind,
        owner: WindowHandle,
    ) -> SecretResult<SecretString> {
        let connection_id = connection_id.clone();
        self.call(move |service| service.get_secret(&connection_id, kind, owner))
    }

    /// Asks the user for a secret
    ///
    /// # Errors
    /// See [`SecretService::prompt_for_secret`].
    pub fn prompt_for_secret(
        &self,
        connection_name: &str,
        kind: SecretKind,
        owner: WindowHandle,
    ) -> SecretResult<SecretString> {
        let connection_name = connection_name.to_string();
        self.call(move |service| service.prompt_for_secret(&connection_name, kind, owner))
    }

    /// Returns a connection's secret, prompting when none is available
    ///
    /// # Errors
    /// See [`SecretService::resolve_secret`].
    pub fn resolve_secret(
        &self,
        connection_id: &ConnectionId,
        kind: SecretKind,
        owner: WindowHandle,
    ) -> SecretResult<SecretString> {
        let connection_id = connection_id.clone();
        self.call(move |service| service.resolve_secret(&connection_id, kind, owner))
    }

    /// Drops a cached secret
    ///
    /// # Errors
    /// See [`SecretService::clear_cached_secret`].
    pub fn clear_cached_secret(
        &self,
        connection_id: &ConnectionId,
        kind: SecretKind,
    ) -> SecretResult<()> {
        let connection_id = connection_id.clone();
        self.call(move |service| service.clear_cached_secret(&connection_id, kind))
    }

    /// Runs the editor commit pass on the owner
    ///
    /// # Errors
    /// `CommitError::Connection` for the first failing connection, or
    /// `CommitError::Dispatch` if the pass could not reach the owner.
    pub fn commit_edits(
        &self,
        current: Vec<ConnectionProfile>,
        baseline: Vec<ConnectionProfile>,
    ) -> Result<CommitReport, CommitError> {
        self.call(move |service| Ok(service.commit_edits(&current, &baseline)))?
    }

    /// Cancels any pending biometric wait and tears the owner down
    ///
    /// Wipes the session cache exactly once. Blocks until the owner has
    /// finished unless called from the owner thread, where it runs inline.
    /// Later calls are no-ops.
    pub fn shutdown(&self) {
        if let Some(token) = self.shared.token.get() {
            token.cancel();
        }
        if self.shared.state() != STATE_READY {
            self.shared.state.store(STATE_TORN_DOWN, Ordering::SeqCst);
            return;
        }

        if self.is_owner_thread() {
            teardown(&self.shared);
            return;
        }

        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        if self.sender.send(Message::Shutdown(ack_tx)).is_err() {
            self.shared.state.store(STATE_TORN_DOWN, Ordering::SeqCst);
            return;
        }
        if ack_rx.recv().is_err() {
            debug!("Owner loop stopped before acknowledging shutdown");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.shared.state())
            .field("owner", &self.shared.owner.get())
            .finish_non_exhaustive()
    }
}

/// Marks the dispatcher torn down and shuts the attached service down
///
/// Must run on the owner thread. The service is detached on the first
/// successful run, so repeating it is harmless.
fn teardown(shared: &Shared) {
    shared.state.store(STATE_TORN_DOWN, Ordering::SeqCst);
    OWNER_SERVICE.with(|cell| match cell.try_borrow_mut() {
        Ok(mut guard) => {
            if let Some(mut service) = guard.take() {
                service.shutdown();
            }
        }
        Err(_) => debug!("Shutdown requested from inside a secret call; finishing once it returns"),
    });
}

/// Owner-side endpoint of a [`Dispatcher`]
pub struct OwnerLoop {
    receiver: Receiver<Message>,
    shared: Arc<Shared>,
}

impl OwnerLoop {
    /// Makes the current thread the owner of `service`
    ///
    /// # Errors
    /// `InvalidArgument` if this loop was already attached, or if the
    /// current thread already owns another service.
    pub fn attach(&self, service: SecretService) -> SecretResult<()> {
        let occupied = OWNER_SERVICE.with(|cell| cell.borrow().is_some());
        if occupied {
            return Err(SecretError::InvalidArgument(
                "this thread already owns a secret service".to_string(),
            ));
        }
        if self.shared.owner.set(thread::current().id()).is_err() {
            return Err(SecretError::InvalidArgument(
                "owner loop is already attached".to_string(),
            ));
        }

        let _ = self.shared.token.set(service.cancellation_token());
        OWNER_SERVICE.with(|cell| *cell.borrow_mut() = Some(service));
        self.shared.state.store(STATE_READY, Ordering::SeqCst);
        debug!(thread = ?thread::current().id(), "Secret owner attached");
        Ok(())
    }

    /// Services requests until shutdown or until every dispatcher is dropped
    ///
    /// Call on the thread that attached the service.
    pub fn run(self) {
        if !self.shared.is_owner_thread() {
            warn!("Owner loop run off the owner thread; requests will not be served");
            return;
        }
        while let Ok(message) = self.receiver.recv() {
            if !self.handle(message) {
                break;
            }
        }
        teardown(&self.shared);
        self.drain();
    }

    /// Services queued requests without blocking; returns how many ran
    ///
    /// For hosts that pump their own event loop on the owner thread.
    pub fn pump(&self) -> usize {
        if !self.shared.is_owner_thread() {
            return 0;
        }
        let mut served = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(message) => {
                    served += 1;
                    if !self.handle(message) {
                        teardown(&self.shared);
                        self.drain();
                        break;
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        served
    }

    /// Executes one message; returns false after a shutdown
    fn handle(&self, message: Message) -> bool {
        match message {
            Message::Job(job) => {
                if self.shared.state() == STATE_TORN_DOWN {
                    return false;
                }
                OWNER_SERVICE.with(|cell| match cell.try_borrow_mut() {
                    Ok(mut guard) => match guard.as_mut() {
                        Some(service) => job(service),
                        None => debug!("Dropping request for a detached service"),
                    },
                    Err(_) => warn!("Dropping request queued while the service is busy"),
                });
                // A job may have shut the dispatcher down from the owner thread
                self.shared.state() != STATE_TORN_DOWN
            }
            Message::Shutdown(ack) => {
                teardown(&self.shared);
                let _ = ack.send(());
                false
            }
        }
    }

    /// Drops whatever is still queued; blocked callers get `NotReady`
    fn drain(&self) {
        let mut dropped = 0_usize;
        while let Ok(message) = self.receiver.try_recv() {
            if let Message::Shutdown(ack) = message {
                let _ = ack.send(());
            }
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Dropped requests queued at shutdown");
        }
    }
}

impl std::fmt::Debug for OwnerLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerLoop")
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}
