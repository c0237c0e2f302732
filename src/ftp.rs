use std::io::{self, Write};

use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::MirrorError;
use crate::remote::RemoteSession;

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Anonymous FTP session. No timeout is set; the socket defaults apply.
pub struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    pub fn connect(config: &RemoteConfig) -> Result<Self, MirrorError> {
        let connection_error = |err: suppaftp::FtpError| MirrorError::Connection {
            host: config.host.clone(),
            message: err.to_string(),
        };

        debug!(host = %config.host, port = config.port, "opening ftp session");
        let mut stream =
            FtpStream::connect((config.host.as_str(), config.port)).map_err(connection_error)?;
        stream
            .login(ANONYMOUS_USER, ANONYMOUS_PASSWORD)
            .map_err(connection_error)?;
        if !config.remote_dir.is_empty() {
            stream.cwd(&config.remote_dir).map_err(connection_error)?;
        }
        stream
            .transfer_type(FileType::Binary)
            .map_err(connection_error)?;
        Ok(Self { stream })
    }
}

impl RemoteSession for FtpSession {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, MirrorError> {
        let transfer_error = |message: String| MirrorError::Transfer {
            path: remote_path.to_string(),
            message,
        };

        let mut data = self
            .stream
            .retr_as_stream(remote_path)
            .map_err(|err| transfer_error(err.to_string()))?;
        let written = io::copy(&mut data, sink).map_err(|err| transfer_error(err.to_string()))?;
        self.stream
            .finalize_retr_stream(data)
            .map_err(|err| transfer_error(err.to_string()))?;
        Ok(written)
    }

    fn close(&mut self) -> Result<(), MirrorError> {
        self.stream
            .quit()
            .map_err(|err| MirrorError::Transfer {
                path: "QUIT".to_string(),
                message: err.to_string(),
            })
    }
}
