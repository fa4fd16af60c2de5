//! Scripted in-memory sockets for engine tests.

use std::collections::VecDeque;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::cancel::CancellationToken;
use crate::error::SocketError;
use crate::net::{PollResult, Socket, SocketFactory, SocketWaker, TlsOptions};
use crate::types::ProgressCallback;

/// Behaviour of one scripted connection.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    /// Bytes the "server" sends.
    pub(crate) response: Vec<u8>,
    pub(crate) refuse_connect: bool,
    pub(crate) fail_write: bool,
    /// Block at end of input until the token fires instead of reporting EOF.
    pub(crate) stall_at_end: bool,
}

impl Script {
    pub(crate) fn reply(response: impl AsRef<[u8]>) -> Self {
        Script {
            response: response.as_ref().to_vec(),
            ..Default::default()
        }
    }
}

/// What a scripted socket saw.
#[derive(Debug, Clone, Default)]
pub(crate) struct Transcript {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) tls: bool,
    pub(crate) sent: Vec<u8>,
}

impl Transcript {
    pub(crate) fn request_text(&self) -> String {
        String::from_utf8_lossy(&self.sent).into_owned()
    }
}

pub(crate) struct ScriptedSocket {
    script: Script,
    pos: usize,
    connected: bool,
    transcript: Arc<Mutex<Transcript>>,
    waker: SocketWaker,
}

impl ScriptedSocket {
    fn new(script: Script, tls: bool) -> (Self, Arc<Mutex<Transcript>>) {
        let transcript = Arc::new(Mutex::new(Transcript {
            tls,
            ..Default::default()
        }));
        let socket = ScriptedSocket {
            script,
            pos: 0,
            connected: false,
            transcript: transcript.clone(),
            waker: SocketWaker::default(),
        };
        (socket, transcript)
    }

    /// A socket that is already connected and will read `response`.
    pub(crate) fn connected(response: &[u8]) -> Self {
        let (mut socket, _) = Self::new(Script::reply(response), false);
        socket.connected = true;
        socket
    }

    fn remaining(&self) -> &[u8] {
        &self.script.response[self.pos..]
    }

    fn wait_for_more(&self, token: &CancellationToken) -> Result<(), SocketError> {
        if !self.script.stall_at_end {
            return Err(SocketError::Closed);
        }
        loop {
            token.check()?;
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Socket for ScriptedSocket {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        token: &CancellationToken,
    ) -> Result<(), SocketError> {
        token.check()?;
        {
            let mut transcript = self.transcript.lock();
            transcript.host = host.to_string();
            transcript.port = port;
        }
        if self.script.refuse_connect {
            return Err(SocketError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        self.connected = true;
        Ok(())
    }

    fn write_all(&mut self, data: &[u8], token: &CancellationToken) -> Result<(), SocketError> {
        token.check()?;
        if !self.connected {
            return Err(SocketError::NotConnected);
        }
        if self.script.fail_write {
            return Err(SocketError::Closed);
        }
        self.transcript.lock().sent.extend_from_slice(data);
        Ok(())
    }

    fn read_line(&mut self, token: &CancellationToken) -> Result<String, SocketError> {
        token.check()?;
        if !self.connected {
            return Err(SocketError::NotConnected);
        }
        match self.remaining().iter().position(|&b| b == b'\n') {
            Some(end) => {
                let mut line = &self.remaining()[..end];
                if line.last() == Some(&b'\r') {
                    line = &line[..line.len() - 1];
                }
                let line = String::from_utf8_lossy(line).into_owned();
                self.pos += end + 1;
                Ok(line)
            }
            None => {
                self.pos = self.script.response.len();
                self.wait_for_more(token)?;
                Err(SocketError::Closed)
            }
        }
    }

    fn read_bytes(
        &mut self,
        len: usize,
        progress: Option<&ProgressCallback>,
        token: &CancellationToken,
    ) -> Result<Bytes, SocketError> {
        token.check()?;
        if !self.connected {
            return Err(SocketError::NotConnected);
        }
        let available = self.remaining().len().min(len);
        let data = Bytes::copy_from_slice(&self.remaining()[..available]);
        self.pos += available;
        if let Some(on_progress) = progress {
            if available > 0 && !on_progress(available as u64, len as u64) {
                return Err(SocketError::Aborted);
            }
        }
        if available < len {
            self.wait_for_more(token)?;
            return Err(SocketError::Closed);
        }
        Ok(data)
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn poll(&mut self, _timeout: Option<Duration>) -> PollResult {
        if self.waker.take() {
            PollResult::Woken
        } else if !self.connected {
            PollResult::Closed
        } else if self.remaining().is_empty() {
            PollResult::Timeout
        } else {
            PollResult::Readable
        }
    }

    fn waker(&self) -> SocketWaker {
        self.waker.clone()
    }
}

/// Hands out one scripted socket per `create` call, in order.
#[derive(Default)]
pub(crate) struct ScriptedFactory {
    scripts: Mutex<VecDeque<Script>>,
    transcripts: Mutex<Vec<Arc<Mutex<Transcript>>>>,
    refuse: bool,
}

impl ScriptedFactory {
    pub(crate) fn new(scripts: impl IntoIterator<Item = Script>) -> Arc<Self> {
        Arc::new(ScriptedFactory {
            scripts: Mutex::new(scripts.into_iter().collect()),
            ..Default::default()
        })
    }

    /// A factory whose `create` always fails.
    pub(crate) fn refusing() -> Arc<Self> {
        Arc::new(ScriptedFactory {
            refuse: true,
            ..Default::default()
        })
    }

    /// Transcripts of every socket created so far.
    pub(crate) fn transcripts(&self) -> Vec<Transcript> {
        self.transcripts.lock().iter().map(|t| t.lock().clone()).collect()
    }

    pub(crate) fn created(&self) -> usize {
        self.transcripts.lock().len()
    }
}

impl SocketFactory for ScriptedFactory {
    fn create(
        &self,
        use_tls: bool,
        _existing: Option<TcpStream>,
        _tls: &TlsOptions,
    ) -> Result<Box<dyn Socket>, SocketError> {
        if self.refuse {
            return Err(SocketError::Tls("no certificates available".to_string()));
        }
        let script = self.scripts.lock().pop_front().unwrap_or_default();
        let (socket, transcript) = ScriptedSocket::new(script, use_tls);
        self.transcripts.lock().push(transcript);
        Ok(Box::new(socket))
    }
}
