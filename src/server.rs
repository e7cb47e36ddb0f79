use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::Result;
use chrono::Utc;
use tokio::{
    io::{AsyncBufRead, BufReader},
    net::{tcp::OwnedWriteHalf, TcpListener, TcpStream},
    select,
    sync::mpsc,
};
use tracing::{debug, info, warn};

use crate::{
    message::{read_envelope, write_envelope, Envelope, Kind},
    registry::Registry,
};

/// Accepts TCP connections and relays chat envelopes between them.
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl Server {
    pub fn new(listener: TcpListener) -> Self {
        Self {
            listener,
            registry: Arc::new(Registry::new()),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until the `shutdown` future completes. Sessions
    /// spawned for accepted connections keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, registry } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    info!("server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept(accept_result, &registry).await;
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

/// Registers an accepted connection and announces the join before the
/// session task starts, so identities and join notices follow accept order.
async fn handle_accept(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    registry: &Arc<Registry>,
) {
    match result {
        Ok((stream, peer)) => {
            let (identity, outbox) = registry.add().await;
            info!(%identity, %peer, "client connected");
            registry
                .broadcast(Envelope::system(format!("User [{identity}] joined")), &identity)
                .await;
            spawn_session(stream, peer, identity, outbox, registry);
        }
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_session(
    stream: TcpStream,
    peer: SocketAddr,
    identity: String,
    outbox: mpsc::Receiver<Envelope>,
    registry: &Arc<Registry>,
) {
    let registry = Arc::clone(registry);
    tokio::spawn(async move {
        run_session(stream, peer, identity, outbox, registry).await;
    });
}

/// Drives one connection from registration to teardown. The inbound read
/// loop runs here; the outbound drain runs on its own task and ends once
/// the registry entry, and with it the queue's send half, is gone.
async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    identity: String,
    outbox: mpsc::Receiver<Envelope>,
    registry: Arc<Registry>,
) {
    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let drain = tokio::spawn(drain_outbound(outbox, writer, identity.clone()));

    run_inbound(&registry, &mut reader, &identity).await;

    registry.remove(&identity).await;
    registry
        .broadcast(Envelope::system(format!("User [{identity}] left")), &identity)
        .await;
    info!(%identity, %peer, "client disconnected");

    // The read half drops here; the drain task owns the write half and
    // closes it after emptying the queue.
    let _ = drain.await;
}

/// Inbound loop: decode, stamp, fan out. EOF and decode errors both mean
/// the peer is gone; there is no distinction and no recovery.
async fn run_inbound<R>(registry: &Registry, reader: &mut R, identity: &str)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_envelope(reader).await {
            Ok(Some(mut envelope)) => {
                envelope.from = identity.to_string();
                envelope.timestamp = Utc::now();
                envelope.kind = Kind::Message;
                registry.broadcast(envelope, identity).await;
            }
            Ok(None) => break,
            Err(err) => {
                debug!(%identity, error = ?err, "read failed, treating peer as gone");
                break;
            }
        }
    }
}

/// Outbound drain: writes queued envelopes until the queue closes. A write
/// error ends only the drain; teardown stays with the inbound loop, which
/// sees the same dead socket.
async fn drain_outbound(
    mut outbox: mpsc::Receiver<Envelope>,
    mut writer: OwnedWriteHalf,
    identity: String,
) {
    while let Some(envelope) = outbox.recv().await {
        if let Err(err) = write_envelope(&mut writer, &envelope).await {
            debug!(%identity, error = ?err, "write failed, stopping outbound drain");
            break;
        }
    }
}
