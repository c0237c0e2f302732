use std::io::Write;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::domain::Transport;
use crate::error::MirrorError;
use crate::ftp::FtpSession;
use crate::https::HttpsSession;

/// A connected, anonymous view of the remote working directory.
///
/// Implementations are used strictly one call at a time.
pub trait RemoteSession {
    /// Streams `remote_path`, relative to the working directory, into `sink`
    /// and returns the number of bytes written.
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, MirrorError>;

    fn close(&mut self) -> Result<(), MirrorError>;
}

impl<S: RemoteSession + ?Sized> RemoteSession for Box<S> {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, MirrorError> {
        (**self).retrieve(remote_path, sink)
    }

    fn close(&mut self) -> Result<(), MirrorError> {
        (**self).close()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Connected,
    Closed,
}

/// Owns a connected session and closes it exactly once, on `close` or on drop.
pub struct Session<S: RemoteSession> {
    inner: S,
    state: SessionState,
}

impl<S: RemoteSession> Session<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S: RemoteSession> RemoteSession for Session<S> {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, MirrorError> {
        if self.state == SessionState::Closed {
            return Err(MirrorError::SessionClosed);
        }
        self.inner.retrieve(remote_path, sink)
    }

    fn close(&mut self) -> Result<(), MirrorError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        debug!("closing remote session");
        self.inner.close()
    }
}

impl<S: RemoteSession> Drop for Session<S> {
    fn drop(&mut self) {
        if self.state == SessionState::Connected {
            if let Err(err) = self.close() {
                warn!("failed to close remote session: {err}");
            }
        }
    }
}

/// Opens an anonymous session on `config.host` and changes into
/// `config.remote_dir`.
pub fn connect(config: &RemoteConfig) -> Result<Session<Box<dyn RemoteSession>>, MirrorError> {
    let inner: Box<dyn RemoteSession> = match config.transport {
        Transport::Ftp => Box::new(FtpSession::connect(config)?),
        Transport::Https => Box::new(HttpsSession::connect(config)?),
    };
    Ok(Session::new(inner))
}
