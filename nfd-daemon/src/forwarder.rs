//! Built-in forwarding subsystem.
//!
//! Owns the transport listeners described by `face_system` and validates `tables` and
//! `authorizations`. Packet processing belongs to the linked daemon; connections and
//! datagrams that reach these listeners are logged and dropped.

use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpListener as StdTcpListener, UdpSocket as StdUdpSocket};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nfd_core::{
    nfd_log_debug, nfd_log_info, nfd_log_init, nfd_log_trace, nfd_log_warn, ConfigTree, Error,
    Result,
};
use serde::Deserialize;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;

use crate::context::IoHandle;
use crate::keychain::KeyChain;
use crate::subsystem::Subsystem;

nfd_log_init!("Forwarder");

const MAX_DATAGRAM: usize = 8800;

/// `tables` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TablesSection {
    /// Content store capacity in packets.
    pub cs_max_packets: u64,
    /// Name prefix => strategy name.
    pub strategy_choice: BTreeMap<String, String>,
}

/// `face_system` section. A missing protocol section disables that listener.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FaceSystemSection {
    #[allow(missing_docs)]
    pub tcp: Option<TcpSection>,
    #[allow(missing_docs)]
    pub udp: Option<UdpSection>,
}

/// `face_system.tcp` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TcpSection {
    /// Listening port; 0 picks an ephemeral one.
    pub port: u16,
}

/// `face_system.udp` section.
#[derive(Debug, Clone, Deserialize)]
pub struct UdpSection {
    /// Listening port; 0 picks an ephemeral one.
    pub port: u16,
    /// Seconds before an idle unicast face is closed.
    #[serde(default)]
    pub idle_timeout: u64,
    /// Seconds between keep-alives.
    #[serde(default)]
    pub keep_alive_interval: u64,
    /// Whether multicast faces are wanted.
    #[serde(default)]
    pub mcast: bool,
}

/// `authorizations` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthorizationsSection {
    #[allow(missing_docs)]
    pub authorize: Option<AuthorizeSection>,
}

/// One `authorize` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeSection {
    /// Certificate file name, or `any`.
    pub certfile: String,
    /// Management modules the certificate may use.
    #[serde(default)]
    pub privileges: Vec<String>,
}

/// Forwarding subsystem: binds the configured listeners and serves them on the loop.
pub struct Forwarder {
    tables: TablesSection,
    faces: FaceSystemSection,
    authorizations: AuthorizationsSection,
    keychain: Arc<KeyChain>,
    tcp: Option<StdTcpListener>,
    udp: Option<StdUdpSocket>,
    tcp_addr: Option<SocketAddr>,
    udp_addr: Option<SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
}

impl Forwarder {
    /// Read and validate the forwarder sections. Nothing is bound yet.
    pub fn from_config(config: &ConfigTree, keychain: Arc<KeyChain>) -> Result<Self> {
        let tables: TablesSection = config.section_as("tables")?;
        for (prefix, strategy) in &tables.strategy_choice {
            if !prefix.starts_with('/') || !strategy.starts_with('/') {
                return Err(Error::subsystem_init(format!(
                    "tables.strategy_choice: '{prefix}' = '{strategy}' is not a name"
                )));
            }
        }
        let faces: FaceSystemSection = config.section_as("face_system")?;
        let authorizations: AuthorizationsSection = config.section_as("authorizations")?;

        Ok(Self {
            tables,
            faces,
            authorizations,
            keychain,
            tcp: None,
            udp: None,
            tcp_addr: None,
            udp_addr: None,
            tasks: Vec::new(),
        })
    }

    /// Bound TCP address, once initialized.
    pub fn tcp_local_addr(&self) -> Option<SocketAddr> {
        self.tcp_addr
    }

    /// Bound UDP address, once initialized.
    pub fn udp_local_addr(&self) -> Option<SocketAddr> {
        self.udp_addr
    }

    /// Parsed `tables` section.
    pub fn tables(&self) -> &TablesSection {
        &self.tables
    }
}

fn bind_error(what: &str, port: u16, e: std::io::Error) -> Error {
    Error::subsystem_init(format!("cannot bind {what} listener on port {port}: {e}"))
}

#[async_trait]
impl Subsystem for Forwarder {
    fn name(&self) -> &str {
        "Forwarder"
    }

    fn initialize(&mut self) -> Result<()> {
        nfd_log_info!(
            "cs_max_packets={} strategies={} key={}",
            self.tables.cs_max_packets,
            self.tables.strategy_choice.len(),
            self.keychain.key_id()
        );
        if let Some(authorize) = &self.authorizations.authorize {
            nfd_log_debug!(
                "authorize certfile={} privileges={:?}",
                authorize.certfile,
                authorize.privileges
            );
        }

        if let Some(tcp) = &self.faces.tcp {
            let listener = StdTcpListener::bind(("0.0.0.0", tcp.port))
                .map_err(|e| bind_error("tcp", tcp.port, e))?;
            listener.set_nonblocking(true)?;
            let addr = listener.local_addr()?;
            nfd_log_info!("tcp listener on {addr}");
            self.tcp_addr = Some(addr);
            self.tcp = Some(listener);
        }

        if let Some(udp) = &self.faces.udp {
            let socket = StdUdpSocket::bind(("0.0.0.0", udp.port))
                .map_err(|e| bind_error("udp", udp.port, e))?;
            socket.set_nonblocking(true)?;
            let addr = socket.local_addr()?;
            nfd_log_info!(
                "udp channel on {addr} idle_timeout={}s keep_alive={}s",
                udp.idle_timeout,
                udp.keep_alive_interval
            );
            if udp.mcast {
                nfd_log_warn!("udp multicast faces are not handled by this forwarder");
            }
            self.udp_addr = Some(addr);
            self.udp = Some(socket);
        }
        Ok(())
    }

    fn attach(&mut self, io: &IoHandle) -> Result<()> {
        if let Some(listener) = self.tcp.take() {
            let listener = TcpListener::from_std(listener)?;
            self.tasks.push(io.spawn(accept_loop(listener)));
        }
        if let Some(socket) = self.udp.take() {
            let socket = UdpSocket::from_std(socket)?;
            self.tasks.push(io.spawn(recv_loop(socket)));
        }
        Ok(())
    }

    async fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        self.tcp = None;
        self.udp = None;
        nfd_log_info!("forwarder stopped");
    }
}

async fn accept_loop(listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                nfd_log_debug!("tcp connection from {peer}");
                drop(stream);
            }
            Err(e) => {
                nfd_log_warn!("tcp accept failed: {e}");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

async fn recv_loop(socket: UdpSocket) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, peer)) => nfd_log_trace!("udp datagram of {len} bytes from {peer}"),
            Err(e) => {
                nfd_log_warn!("udp receive failed: {e}");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}
