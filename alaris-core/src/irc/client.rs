//! src/irc/client.rs

use std::io;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, split};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tokio_native_tls::TlsConnector;
use tracing::{debug, error, info};

use alaris_common::models::UserIdentity;
use alaris_common::traits::IrcConnection;

use crate::config::BotConfig;

/// Minimal representation of a parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub tags: Option<String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
    pub trailing: Option<String>,
}

impl IrcMessage {
    pub fn parse(line: &str) -> Self {
        let mut rest = line.trim();
        let mut tags = None;
        let mut prefix = None;
        let mut params = Vec::new();
        let mut trailing = None;

        // 1) tags
        if rest.starts_with('@') {
            match rest.split_once(' ') {
                Some((t, r)) => {
                    tags = Some(t.to_string());
                    rest = r;
                }
                None => {
                    return Self { tags: Some(rest.to_string()), prefix, command: String::new(), params, trailing };
                }
            }
        }

        // 2) prefix
        if let Some(stripped) = rest.strip_prefix(':') {
            match stripped.split_once(' ') {
                Some((p, r)) => {
                    prefix = Some(p.to_string());
                    rest = r;
                }
                None => {
                    return Self { tags, prefix: Some(stripped.to_string()), command: String::new(), params, trailing };
                }
            }
        }

        // 3) command
        let (command, rest) = rest.split_once(' ').unwrap_or((rest, ""));

        // 4) params and trailing
        let middle = if let Some(t) = rest.strip_prefix(':') {
            trailing = Some(t.to_string());
            ""
        } else if let Some((before, t)) = rest.split_once(" :") {
            trailing = Some(t.to_string());
            before
        } else {
            rest
        };
        params.extend(middle.split_whitespace().map(str::to_string));

        Self { tags, prefix, command: command.to_uppercase(), params, trailing }
    }

    pub fn sender(&self) -> Option<UserIdentity> {
        self.prefix.as_deref().map(UserIdentity::from_prefix)
    }
}

/// Higher-level event from the IRC read loop.
#[derive(Debug, Clone)]
pub struct IrcIncomingEvent {
    pub command: String,
    pub sender: Option<UserIdentity>,
    /// First parameter (the target, for PRIVMSG/JOIN/PART).
    pub target: Option<String>,
    pub params: Vec<String>,
    pub text: Option<String>,
    pub raw_line: String,
}

impl From<(&str, IrcMessage)> for IrcIncomingEvent {
    fn from((raw, msg): (&str, IrcMessage)) -> Self {
        Self {
            sender: msg.sender(),
            target: msg.params.first().cloned(),
            command: msg.command,
            params: msg.params,
            text: msg.trailing,
            raw_line: raw.to_string(),
        }
    }
}

/// Removes CR/LF so a value can't smuggle extra protocol lines.
pub fn sanitize(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Cloneable write side of a connection; what command handlers talk to.
#[derive(Clone)]
pub struct IrcHandle {
    outgoing: mpsc::UnboundedSender<String>,
    nickname: Arc<RwLock<String>>,
}

impl IrcHandle {
    pub fn new(outgoing: mpsc::UnboundedSender<String>, nickname: &str) -> Self {
        Self {
            outgoing,
            nickname: Arc::new(RwLock::new(nickname.to_string())),
        }
    }

    pub fn send_raw_line(&self, line: &str) {
        if self.outgoing.send(sanitize(line)).is_err() {
            debug!("Dropping outgoing line; writer has stopped");
        }
    }

    pub fn set_nickname(&self, nickname: &str) {
        *self.nickname.write() = nickname.to_string();
        self.send_raw_line(&format!("NICK {nickname}"));
    }
}

impl IrcConnection for IrcHandle {
    /// Multi-line text is sent as one PRIVMSG per line.
    fn send_message(&self, channel: &str, text: &str) {
        let channel = sanitize(channel);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.send_raw_line(&format!("PRIVMSG {} :{}", channel, line));
        }
    }

    fn join_channel(&self, channel: &str) {
        self.send_raw_line(&format!("JOIN {}", channel));
    }

    fn part_channel(&self, channel: &str) {
        self.send_raw_line(&format!("PART {}", channel));
    }

    fn nickname(&self) -> String {
        self.nickname.read().clone()
    }
}

/// Low-level IRC client over TCP or TLS.
pub struct IrcClient {
    handle: IrcHandle,

    /// Taken by whoever consumes incoming events.
    pub incoming: Option<mpsc::UnboundedReceiver<IrcIncomingEvent>>,

    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl IrcClient {
    /// Connects, registers (PASS/NICK/USER) and spawns the read/write tasks.
    pub async fn connect(config: &BotConfig) -> io::Result<Self> {
        let tcp = TcpStream::connect((config.server.as_str(), config.port))
            .await
            .map_err(|e| io::Error::other(format!("TCP connect error: {e}")))?;

        if config.tls {
            let native_connector = native_tls::TlsConnector::new()
                .map_err(|e| io::Error::other(format!("TLSConnector::new() => {e}")))?;
            let connector = TlsConnector::from(native_connector);
            let tls_stream = connector
                .connect(&config.server, tcp)
                .await
                .map_err(|e| io::Error::other(format!("TLS connect() => {e}")))?;
            Ok(Self::start(tls_stream, config))
        } else {
            Ok(Self::start(tcp, config))
        }
    }

    /// Runs the client over an already established stream.
    pub fn start<S>(stream: S, config: &BotConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = split(stream);
        let (tx_outgoing, rx_outgoing) = mpsc::unbounded_channel::<String>();
        let (tx_incoming, rx_incoming) = mpsc::unbounded_channel::<IrcIncomingEvent>();

        let write_task = tokio::spawn(Self::writer_loop(write_half, rx_outgoing));

        let handle = IrcHandle::new(tx_outgoing.clone(), &config.nickname);
        if let Some(pass) = &config.password {
            handle.send_raw_line(&format!("PASS {}", pass));
        }
        handle.send_raw_line(&format!("NICK {}", config.nickname));
        handle.send_raw_line(&format!("USER {} 0 * :{}", config.username, config.realname));

        let read_task = tokio::spawn(Self::reader_loop(read_half, tx_incoming, tx_outgoing));

        Self {
            handle,
            incoming: Some(rx_incoming),
            read_task,
            write_task,
        }
    }

    pub fn handle(&self) -> IrcHandle {
        self.handle.clone()
    }

    async fn reader_loop<R>(
        read_half: R,
        tx_incoming: mpsc::UnboundedSender<IrcIncomingEvent>,
        tx_outgoing: mpsc::UnboundedSender<String>,
    )
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(read_half);
        let mut line_buffer = String::new();

        loop {
            line_buffer.clear();
            match reader.read_line(&mut line_buffer).await {
                Ok(0) => {
                    info!("(IrcClient) read_loop => EOF");
                    break;
                }
                Ok(_) => {
                    let line = line_buffer.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("<< {}", line);

                    let parsed = IrcMessage::parse(line);
                    if parsed.command == "PING" {
                        let token = parsed
                            .trailing
                            .clone()
                            .or_else(|| parsed.params.first().cloned())
                            .unwrap_or_default();
                        tx_outgoing.send(format!("PONG :{}", token)).ok();
                        debug!("Auto PONG -> {}", token);
                        continue;
                    }

                    if tx_incoming.send(IrcIncomingEvent::from((line, parsed))).is_err() {
                        debug!("(IrcClient) nobody is listening for incoming events");
                    }
                }
                Err(e) => {
                    error!("(IrcClient) read error => {:?}", e);
                    break;
                }
            }
        }

        info!("(IrcClient) reader_loop ended.");
    }

    async fn writer_loop<W>(write_half: W, mut rx_outgoing: mpsc::UnboundedReceiver<String>)
    where
        W: AsyncWrite + Unpin,
    {
        let mut writer = BufWriter::new(write_half);

        while let Some(line) = rx_outgoing.recv().await {
            debug!(">> {}", line);
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                error!("writer error => {:?}", e);
                break;
            }
            if let Err(e) = writer.write_all(b"\r\n").await {
                error!("writer error => {:?}", e);
                break;
            }
            if let Err(e) = writer.flush().await {
                error!("writer flush error => {:?}", e);
                break;
            }
        }

        info!("(IrcClient) writer_loop ended.");
    }

    /// Sends QUIT and aborts the read/write tasks.
    pub fn shutdown(self, reason: &str) {
        self.handle.send_raw_line(&format!("QUIT :{}", reason));
        self.read_task.abort();
        self.write_task.abort();
    }
}
