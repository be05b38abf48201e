//! Transport bindings.
//!
//! The engine only needs a duplex byte stream; these helpers build a
//! [`Session`] over the three stream sources in common use: an embedded
//! child process, a unix domain socket, and a TCP endpoint.

use std::ffi::OsStr;
use std::io;
#[cfg(unix)]
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio::net::ToSocketAddrs;
use tokio::process::{Child, Command};
use tracing::warn;

use remora_core::Session;

/// Launch the editor as an embedded child and wire its stdio as the
/// duplex stream.
///
/// Stderr is forwarded line-by-line to the log. The child is killed if
/// it is still running when dropped.
pub async fn spawn_editor(program: impl AsRef<OsStr>) -> io::Result<(Arc<Session>, Child)> {
    let mut child = Command::new(program)
        .args(["--embed", "--headless"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdin not captured"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdout not captured"))?;
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "remora::editor_stderr", "{line}");
            }
        });
    }

    Ok((Arc::new(Session::new(stdout, stdin)), child))
}

/// Connect to an editor listening on a unix domain socket.
#[cfg(unix)]
pub async fn connect_unix(path: impl AsRef<Path>) -> io::Result<Arc<Session>> {
    let stream = UnixStream::connect(path).await?;
    let (reader, writer) = stream.into_split();
    Ok(Arc::new(Session::new(reader, writer)))
}

/// Connect to an editor listening on a TCP endpoint.
pub async fn connect_tcp(addr: impl ToSocketAddrs) -> io::Result<Arc<Session>> {
    let stream = TcpStream::connect(addr).await?;
    let (reader, writer) = stream.into_split();
    Ok(Arc::new(Session::new(reader, writer)))
}
