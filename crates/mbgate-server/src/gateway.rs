use std::cell::{Cell, RefCell};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::time::Duration;

use mbgate_frame::{Request, Response};
use mbgate_transport::{GatewayListener, ReadyNotifier, DEFAULT_BACKLOG, DEFAULT_PORT};
use tokio::task::{JoinSet, LocalSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::connection::{Connection, ConnectionId};
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::store::RegisterStore;

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion)
/// does not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Startup parameters for a [`Gateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Number of holding registers, `1..=65536`.
    pub register_count: usize,
    /// Interface address to listen on.
    pub bind_ip: IpAddr,
    /// TCP port; `0` picks an ephemeral port.
    pub port: u16,
    /// Listen backlog depth.
    pub backlog: u32,
    /// Set `TCP_NODELAY` on accepted connections.
    pub nodelay: bool,
    /// Supervisor to notify once the gateway is serving.
    pub notify: Option<ReadyNotifier>,
}

impl GatewayConfig {
    /// Defaults for a store of `register_count` registers.
    pub fn new(register_count: usize) -> Self {
        Self {
            register_count,
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            nodelay: true,
            notify: None,
        }
    }

    /// The socket address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }
}

/// Counters collected while serving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Connections accepted since startup.
    pub accepted: u64,
    /// Connections currently open.
    pub active: u64,
    /// Requests answered (success or exception).
    pub requests: u64,
    /// Requests answered with an exception.
    pub exceptions: u64,
    /// Connections closed because of a malformed frame.
    pub malformed: u64,
}

/// State shared by the accept loop and every connection task.
///
/// Only touched from the single reactor thread, and the store is borrowed
/// only for the duration of a synchronous dispatch.
#[derive(Debug)]
pub(crate) struct Shared {
    store: RefCell<RegisterStore>,
    accepted: Cell<u64>,
    active: Cell<u64>,
    requests: Cell<u64>,
    exceptions: Cell<u64>,
    malformed: Cell<u64>,
}

impl Shared {
    fn new(store: RegisterStore) -> Self {
        Self {
            store: RefCell::new(store),
            accepted: Cell::new(0),
            active: Cell::new(0),
            requests: Cell::new(0),
            exceptions: Cell::new(0),
            malformed: Cell::new(0),
        }
    }

    pub(crate) fn dispatch(&self, request: &Request) -> Response {
        let response = dispatch(&mut self.store.borrow_mut(), request);
        bump(&self.requests);
        if response.is_exception() {
            bump(&self.exceptions);
        }
        response
    }

    pub(crate) fn record_malformed(&self) {
        bump(&self.malformed);
    }

    fn opened(&self) -> ConnectionId {
        bump(&self.accepted);
        bump(&self.active);
        ConnectionId(self.accepted.get())
    }

    fn closed(&self) {
        self.active.set(self.active.get().saturating_sub(1));
    }

    fn stats(&self) -> GatewayStats {
        GatewayStats {
            accepted: self.accepted.get(),
            active: self.active.get(),
            requests: self.requests.get(),
            exceptions: self.exceptions.get(),
            malformed: self.malformed.get(),
        }
    }
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

/// A Modbus TCP gateway: one register store served to many clients from a
/// single-threaded reactor.
///
/// Each connection runs as a local task, so a slow or stalled client never
/// holds up the others, while every store access still happens on one thread.
pub struct Gateway {
    listener: GatewayListener,
    shared: Rc<Shared>,
    notify: Option<ReadyNotifier>,
}

impl Gateway {
    /// Allocate the store and bind the listening socket.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: GatewayConfig) -> Result<Self> {
        let store = RegisterStore::new(config.register_count)?;
        let listener = GatewayListener::bind_with_backlog(config.socket_addr(), config.backlog)?
            .with_nodelay(config.nodelay);

        info!(
            registers = store.len(),
            addr = %listener.local_addr(),
            "gateway bound"
        );

        Ok(Self {
            listener,
            shared: Rc::new(Shared::new(store)),
            notify: config.notify,
        })
    }

    /// The address the gateway is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Current counters.
    pub fn stats(&self) -> GatewayStats {
        self.shared.stats()
    }

    /// Copy of the register store.
    pub fn snapshot(&self) -> Vec<u16> {
        self.shared.store.borrow().snapshot()
    }

    /// Serve clients until `shutdown` is cancelled.
    ///
    /// On return every connection has been closed. Accept failures are
    /// logged and do not end the loop.
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<GatewayStats> {
        LocalSet::new().run_until(self.accept_loop(shutdown)).await;

        let stats = self.stats();
        info!(
            accepted = stats.accepted,
            requests = stats.requests,
            exceptions = stats.exceptions,
            malformed = stats.malformed,
            "gateway stopped"
        );
        Ok(stats)
    }

    async fn accept_loop(&self, shutdown: CancellationToken) {
        let mut connections = JoinSet::new();

        self.notify_ready();
        info!(addr = %self.local_addr(), "gateway serving");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(open = connections.len(), "shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let id = self.shared.opened();
                        info!(connection = %id, %peer, "client connected");

                        let shared = Rc::clone(&self.shared);
                        let token = shutdown.child_token();
                        connections.spawn_local(async move {
                            let conn = Connection::new(id, peer, stream, Rc::clone(&shared));
                            let reason = conn.run(token).await;
                            shared.closed();
                            info!(connection = %id, %peer, %reason, "client disconnected");
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        tokio::select! {
                            _ = shutdown.cancelled() => {}
                            _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                        }
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(err) = joined {
                        error!(error = %err, "connection task failed");
                    }
                }
            }
        }

        // Connection tasks hold child tokens, so they all observe the
        // cancellation and finish promptly.
        while let Some(joined) = connections.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "connection task failed");
            }
        }
        debug!("all connections released");
    }

    fn notify_ready(&self) {
        let Some(notifier) = &self.notify else {
            return;
        };
        match notifier.notify_ready() {
            Ok(()) => info!(socket = notifier.path(), "readiness reported"),
            Err(err) => warn!(socket = notifier.path(), error = %err, "readiness notification failed"),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("local_addr", &self.local_addr())
            .field("stats", &self.stats())
            .finish()
    }
}
