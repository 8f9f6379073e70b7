//! Serial lines simulated over UDP.
//!
//! Each simulated tty is a UDP socket on a local port that sends every byte
//! of a SLIP frame as its own datagram to a remote port, paced to the
//! configured line rate. The set of ttys comes from a `simconfig` file:
//!
//! ```text
//! # my-udp-port other-udp-port other-host
//! 1234 4521 localhost
//! 1235 4522 10.0.0.7
//! ```
//!
//! Valid lines are numbered tty 0, 1, 2, ... in order; invalid lines are
//! reported and skipped.

use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    net::UdpSocket,
    sync::{
        broadcast::{self, Receiver, Sender},
        Mutex,
    },
};

use super::slip::{self, Decoder};
use super::{Delivery, Error, Result, Transport};

/// Line rate of the simulated serial ports, in bits per second.
pub const DEFAULT_BAUD: u32 = 9600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtyDefinition {
    /// The UDP port this tty listens on.
    pub local_port: u16,
    /// The UDP port of the tty at the other end of the line.
    pub remote_port: u16,
    /// Host name or dotted address of the other end.
    pub remote_host: String,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseTtyError {
    #[error("no number given for the remote port")]
    NoRemotePort,
    #[error("malformed port {0:?}")]
    MalformedPort(String),
    #[error("no remote host given")]
    NoHost,
}

impl TtyDefinition {
    /// Parse one simconfig line. Blank lines and comments yield `None`.
    pub fn try_parse(raw_line: &str) -> std::result::Result<Option<Self>, ParseTtyError> {
        let line = match raw_line.find('#') {
            Some(comment) => &raw_line[..comment],
            None => raw_line,
        };
        let mut split = line.split_whitespace();

        let local_port = match split.next() {
            Some(raw) => parse_port(raw)?,
            None => return Ok(None),
        };
        let remote_port = parse_port(split.next().ok_or(ParseTtyError::NoRemotePort)?)?;
        let remote_host = split.next().ok_or(ParseTtyError::NoHost)?.to_string();

        Ok(Some(TtyDefinition {
            local_port,
            remote_port,
            remote_host,
        }))
    }
}

fn parse_port(raw: &str) -> std::result::Result<u16, ParseTtyError> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ParseTtyError::MalformedPort(raw.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimConfig {
    pub ttys: Vec<TtyDefinition>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseSimConfigError {
    #[error("could not open simconfig {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to read simconfig: {0}")]
    ReadLine(std::io::Error),
}

impl SimConfig {
    pub fn try_parse<B>(reader: B) -> std::result::Result<SimConfig, ParseSimConfigError>
    where
        B: BufRead,
    {
        let mut ttys = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(ParseSimConfigError::ReadLine)?;
            match TtyDefinition::try_parse(&line) {
                Ok(Some(tty)) => ttys.push(tty),
                Ok(None) => {}
                Err(e) => log::warn!(
                    "line {} of simconfig, {}, ignoring ({})",
                    line_no + 1,
                    e,
                    line.trim()
                ),
            }
        }
        Ok(SimConfig { ttys })
    }

    pub fn parse_from_path<P: AsRef<Path>>(
        path: P,
    ) -> std::result::Result<SimConfig, ParseSimConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ParseSimConfigError::Open {
            path: path.display().to_string(),
            source,
        })?;
        SimConfig::try_parse(BufReader::new(file))
    }
}

struct Tty {
    local_port: u16,
    remote: SocketAddr,
    sock: Arc<UdpSocket>,
    // Frames on one line must not interleave.
    send_lock: Mutex<()>,
}

impl fmt::Display for Tty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "udp {} -> {}", self.local_port, self.remote)
    }
}

pub struct SimLinkLayer {
    ttys: Vec<Tty>,
    byte_delay: Duration,
    listener_sub: Mutex<Option<Sender<Delivery>>>,
}

impl SimLinkLayer {
    /// Open the first `count` usable ttys of `config`.
    ///
    /// Lines whose host cannot be resolved are skipped, as are any ttys past
    /// `count`. Failing to bind a local port is an error. A `baud` of 0
    /// disables pacing.
    pub async fn bind(config: &SimConfig, count: usize, baud: u32) -> Result<Self> {
        let mut ttys = Vec::with_capacity(count);

        for def in &config.ttys {
            if ttys.len() == count {
                break;
            }

            log::info!("Resolving host name {}", def.remote_host);
            let remote = match tokio::net::lookup_host((def.remote_host.as_str(), def.remote_port))
                .await
            {
                Ok(mut addrs) => addrs.find(|a| a.is_ipv4()),
                Err(e) => {
                    log::warn!("Cannot resolve {}: {}", def.remote_host, e);
                    None
                }
            };
            let remote = match remote {
                Some(remote) => remote,
                None => {
                    log::warn!(
                        "Host {} unknown, ignoring tty on port {}",
                        def.remote_host,
                        def.local_port
                    );
                    continue;
                }
            };

            let sock = UdpSocket::bind(SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                def.local_port,
            ))
            .await?;

            let tty = Tty {
                local_port: def.local_port,
                remote,
                sock: Arc::new(sock),
                send_lock: Mutex::new(()),
            };
            log::info!("tty {}: {}", ttys.len(), tty);
            ttys.push(tty);
        }

        Ok(Self {
            ttys,
            byte_delay: byte_delay(baud),
            listener_sub: Mutex::new(None),
        })
    }
}

fn byte_delay(baud: u32) -> Duration {
    if baud == 0 {
        Duration::ZERO
    } else {
        Duration::from_nanos(8 * 1_000_000_000 / u64::from(baud))
    }
}

#[async_trait]
impl Transport for SimLinkLayer {
    fn num_interfaces(&self) -> usize {
        self.ttys.len()
    }

    fn describe(&self, interface: usize) -> Option<String> {
        self.ttys.get(interface).map(|tty| tty.to_string())
    }

    async fn send(&self, interface: usize, packet: &[u8]) -> Result<()> {
        let tty = self
            .ttys
            .get(interface)
            .ok_or(Error::NoInterface(interface))?;
        let framed = slip::frame(packet)?;

        let _guard = tty.send_lock.lock().await;
        for byte in framed {
            if !self.byte_delay.is_zero() {
                tokio::time::sleep(self.byte_delay).await;
            }
            if tty.sock.send_to(&[byte], tty.remote).await? != 1 {
                return Err(Error::ShortWrite(interface));
            }
        }

        Ok(())
    }

    /// The first call starts one receive task per tty; later calls share
    /// their output.
    async fn listen(&self) -> Receiver<Delivery> {
        let mut sub = self.listener_sub.lock().await;
        if let Some(ref sub_handle) = *sub {
            return sub_handle.subscribe();
        }

        let (tx, rx) = broadcast::channel(100);

        for (interface, tty) in self.ttys.iter().enumerate() {
            let sock = tty.sock.clone();
            let sender = tx.clone();
            tokio::spawn(async move {
                let mut decoder = Decoder::new();
                let mut buf = [0; 2048];
                loop {
                    let sz = match sock.recv_from(&mut buf).await {
                        Ok((sz, _)) => sz,
                        Err(e)
                            if matches!(
                                e.kind(),
                                std::io::ErrorKind::ConnectionRefused
                                    | std::io::ErrorKind::ConnectionReset
                            ) =>
                        {
                            continue
                        }
                        Err(e) => {
                            log::error!("Receive on tty {} failed: {}", interface, e);
                            break;
                        }
                    };
                    for &byte in &buf[..sz] {
                        if let Some(bytes) = decoder.push(byte) {
                            if sender.send(Delivery { interface, bytes }).is_err() {
                                log::error!("No receiver for packet from tty {}", interface);
                            }
                        }
                    }
                }
            });
        }

        *sub = Some(tx);
        rx
    }
}
