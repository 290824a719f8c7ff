//! Scripted doubles for the daemon client and connector.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use sluice_rpc::{Connector, RemoteClient, RpcError, RpcResult};

/// A single call observed by [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Remote method name.
    pub method: String,
    /// Positional arguments as sent.
    pub args: Vec<Value>,
}

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<RpcResult<Value>>>,
    sticky: HashMap<String, Value>,
    calls: Vec<RecordedCall>,
}

/// [`RemoteClient`] that replays scripted replies per method.
///
/// Queued replies are consumed in order; once a method's queue is empty the
/// sticky stub (if any) answers. Unscripted calls fail with a remote error.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<Script>,
}

impl ScriptedClient {
    /// Empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue a successful reply for the next call to `method`.
    pub fn reply(&self, method: &str, value: Value) -> &Self {
        self.push(method, Ok(value))
    }

    /// Queue a failure for the next call to `method`.
    pub fn fail(&self, method: &str, error: RpcError) -> &Self {
        self.push(method, Err(error))
    }

    /// Queue a lost-connection failure for the next call to `method`.
    pub fn connection_lost(&self, method: &str) -> &Self {
        self.fail(method, lost_connection(method))
    }

    /// Answer every call to `method` with `value` once queued replies run out.
    pub fn stub(&self, method: &str, value: Value) -> &Self {
        self.script().sticky.insert(method.to_string(), value);
        self
    }

    /// Every call observed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script().calls.clone()
    }

    /// Argument lists of the calls made to `method`, in order.
    #[must_use]
    pub fn calls_to(&self, method: &str) -> Vec<Vec<Value>> {
        self.script()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .map(|call| call.args.clone())
            .collect()
    }

    /// Forget recorded calls while keeping the script.
    pub fn clear_calls(&self) {
        self.script().calls.clear();
    }

    fn push(&self, method: &str, outcome: RpcResult<Value>) -> &Self {
        self.script()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(outcome);
        self
    }
}

#[async_trait]
impl RemoteClient for ScriptedClient {
    async fn call(&self, method: &str, args: Vec<Value>) -> RpcResult<Value> {
        let mut script = self.script();
        script.calls.push(RecordedCall {
            method: method.to_string(),
            args,
        });
        if let Some(outcome) = script
            .queued
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return outcome;
        }
        script
            .sticky
            .get(method)
            .cloned()
            .ok_or_else(|| RpcError::Remote {
                method: method.to_string(),
                exception: "ScriptedClientError".to_string(),
                message: "no reply scripted".to_string(),
            })
    }
}

/// Build the error a real client reports after a failed reconnect.
#[must_use]
pub fn lost_connection(method: &str) -> RpcError {
    RpcError::ConnectionLost {
        method: method.to_string(),
        source: Box::new(RpcError::Io {
            operation: "read_header",
            source: io::Error::new(io::ErrorKind::UnexpectedEof, "daemon closed the socket"),
        }),
    }
}

/// [`Connector`] that refuses a configured number of attempts before handing
/// out a shared [`ScriptedClient`].
pub struct ScriptedConnector {
    client: Arc<ScriptedClient>,
    refusals: AtomicUsize,
    attempts: AtomicUsize,
    reject_credentials: bool,
}

impl ScriptedConnector {
    /// Connector that succeeds on the first attempt.
    #[must_use]
    pub fn new(client: Arc<ScriptedClient>) -> Self {
        Self {
            client,
            refusals: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            reject_credentials: false,
        }
    }

    /// Refuse the first `count` attempts as if the daemon were not listening.
    #[must_use]
    pub fn refuse_times(self, count: usize) -> Self {
        self.refusals.store(count, Ordering::SeqCst);
        self
    }

    /// Fail every attempt (after any refusals) with an authentication error.
    #[must_use]
    pub const fn reject_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    /// Number of `connect` calls observed.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Client handed out on successful connects.
    #[must_use]
    pub fn client(&self) -> Arc<ScriptedClient> {
        Arc::clone(&self.client)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> RpcResult<Arc<dyn RemoteClient>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if refused {
            return Err(RpcError::ConnectionRefused {
                address: self.address(),
            });
        }
        if self.reject_credentials {
            return Err(RpcError::AuthenticationFailed {
                username: "localclient".to_string(),
                exception: "BadLoginError".to_string(),
                message: "Password does not match".to_string(),
            });
        }
        let client: Arc<dyn RemoteClient> = self.client();
        Ok(client)
    }

    fn address(&self) -> String {
        "deluge.test:58846".to_string()
    }
}
