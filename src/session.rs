//! Full-duplex session connection: lazy salt exchange plus the framed
//! reader/writer pair, over any duplex byte transport.
//!
//! [`SnellConnection::new`] splits the transport into independent read
//! and write halves (via [`tokio::io::split`]) so a caller may drive
//! `read`/`write` from two different tasks concurrently, matching the
//! half-duplex independence the framing layer requires: nothing here
//! shares mutable state between the two halves except the transport
//! itself. Transport-level operations that aren't specific to either
//! direction — addresses and shutdown/deadlines — are passed through on
//! both halves; see [`SnellHalfRead::local_addr`],
//! [`SnellHalfWrite::shutdown`], and friends.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::cipher::Cipher;
use crate::core::SnellError;
use crate::framed::{FramedReader, FramedWriter};

/// Socket-style metadata a transport may expose, passed through
/// transparently by a session connection.
///
/// Transports without a notion of network addressing (an in-memory
/// duplex pipe, say) can implement this with the default methods,
/// which report [`std::io::ErrorKind::Unsupported`].
pub trait TransportMeta {
    /// The local address this transport is bound to, if any.
    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "transport has no local address",
        ))
    }

    /// The address of the peer this transport is connected to, if any.
    fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "transport has no peer address",
        ))
    }
}

impl TransportMeta for tokio::net::TcpStream {
    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        tokio::net::TcpStream::local_addr(self)
    }

    fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        tokio::net::TcpStream::peer_addr(self)
    }
}

impl TransportMeta for tokio::io::DuplexStream {}

/// A snapshot of a transport's addresses, taken once before the
/// transport is split so both halves can answer `local_addr`/
/// `peer_addr` without needing access back to the original value.
/// TCP addresses don't change over a connection's lifetime, so caching
/// at construction time is exact, not approximate.
struct AddrInfo {
    local: Result<SocketAddr, (std::io::ErrorKind, String)>,
    peer: Result<SocketAddr, (std::io::ErrorKind, String)>,
}

impl AddrInfo {
    fn capture<T: TransportMeta>(transport: &T) -> Self {
        Self {
            local: transport.local_addr().map_err(|e| (e.kind(), e.to_string())),
            peer: transport.peer_addr().map_err(|e| (e.kind(), e.to_string())),
        }
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.local
            .clone()
            .map_err(|(kind, msg)| std::io::Error::new(kind, msg))
    }

    fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.peer
            .clone()
            .map_err(|(kind, msg)| std::io::Error::new(kind, msg))
    }
}

enum ReadState<R> {
    /// Salt not yet exchanged for this direction.
    Uninit {
        transport: R,
        cipher: Arc<Cipher>,
        fallback: Option<Arc<Cipher>>,
    },
    Init(FramedReader<R>),
}

enum WriteState<W> {
    Uninit { transport: W, cipher: Arc<Cipher> },
    Init(FramedWriter<W>),
}

/// The read half of a session connection.
///
/// Performs lazy salt exchange and AEAD construction (including, if a
/// fallback cipher was supplied, the one-shot cipher-fallback probe)
/// on the first call to [`SnellHalfRead::read`] or
/// [`SnellHalfRead::write_to`].
pub struct SnellHalfRead<R> {
    state: Option<ReadState<R>>,
    addr: Arc<AddrInfo>,
}

/// The write half of a session connection.
///
/// Performs lazy salt generation and AEAD construction on the first
/// call to [`SnellHalfWrite::write`] or [`SnellHalfWrite::read_from`].
pub struct SnellHalfWrite<W> {
    state: Option<WriteState<W>>,
    addr: Arc<AddrInfo>,
}

/// A full-duplex encrypted session wrapping an already-open transport.
///
/// [`SnellConnection::new`] hands back independent [`SnellHalfRead`]/
/// [`SnellHalfWrite`] halves rather than keeping an instance of its
/// own: transport-level passthrough (addresses, shutdown, deadlines)
/// lives on those halves, since that's what a caller actually holds
/// after construction.
pub struct SnellConnection;

impl SnellConnection {
    /// Split `transport` into independent read/write halves, each
    /// lazily initializing its own direction on first use.
    ///
    /// `fallback` is tried by the read half only, and only for its
    /// first record: see [`crate::framed::FramedReader::with_fallback`].
    ///
    /// `transport`'s local/peer addresses (if it has any, per
    /// [`TransportMeta`]) are captured before the split and exposed on
    /// both halves.
    pub fn new<T>(
        transport: T,
        cipher: Arc<Cipher>,
        fallback: Option<Arc<Cipher>>,
    ) -> (SnellHalfRead<ReadHalf<T>>, SnellHalfWrite<WriteHalf<T>>)
    where
        T: AsyncRead + AsyncWrite + TransportMeta,
    {
        let addr = Arc::new(AddrInfo::capture(&transport));
        let (read_half, write_half) = io::split(transport);
        let read = SnellHalfRead {
            state: Some(ReadState::Uninit {
                transport: read_half,
                cipher: Arc::clone(&cipher),
                fallback,
            }),
            addr: Arc::clone(&addr),
        };
        let write = SnellHalfWrite {
            state: Some(WriteState::Uninit {
                transport: write_half,
                cipher,
            }),
            addr,
        };
        (read, write)
    }
}

impl<R> SnellHalfRead<R>
where
    R: AsyncRead + Unpin,
{
    async fn framed(&mut self) -> Result<&mut FramedReader<R>, SnellError> {
        let state = self.state.take().expect("read half state poisoned");
        let reader = match state {
            ReadState::Init(reader) => reader,
            ReadState::Uninit {
                mut transport,
                cipher,
                fallback,
            } => {
                let mut salt = vec![0u8; cipher.salt_size()];
                transport.read_exact(&mut salt).await?;
                let aead = cipher.derive_decrypter(&salt)?;
                match fallback {
                    Some(fallback_cipher) => {
                        let fallback_aead = fallback_cipher.derive_decrypter(&salt)?;
                        FramedReader::with_fallback(transport, aead, fallback_aead)
                    }
                    None => FramedReader::new(transport, aead),
                }
            }
        };
        self.state = Some(ReadState::Init(reader));
        match self.state.as_mut().expect("just set above") {
            ReadState::Init(reader) => Ok(reader),
            ReadState::Uninit { .. } => unreachable!("just initialized above"),
        }
    }

    /// See [`crate::framed::FramedReader::read`].
    pub async fn read(&mut self, out: &mut [u8]) -> Result<usize, SnellError> {
        self.framed().await?.read(out).await
    }

    /// See [`crate::framed::FramedReader::write_to`].
    pub async fn write_to<W>(&mut self, sink: &mut W) -> Result<u64, SnellError>
    where
        W: AsyncWrite + Unpin,
    {
        self.framed().await?.write_to(sink).await
    }

    /// The underlying transport's local address, passed through
    /// transparently (see [`TransportMeta`]).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.addr.local_addr()
    }

    /// The underlying transport's peer address, passed through
    /// transparently (see [`TransportMeta`]).
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.addr.peer_addr()
    }

    /// Read with a deadline: like [`SnellHalfRead::read`], but fails
    /// with a timed-out I/O error if `deadline` elapses first. A
    /// timeout does not poison the reader — the transport wasn't
    /// necessarily touched — but any record bytes the timed-out
    /// attempt did consume from the transport are lost, so callers
    /// that time out should treat the session as unusable in practice.
    pub async fn read_with_deadline(
        &mut self,
        out: &mut [u8],
        deadline: Duration,
    ) -> Result<usize, SnellError> {
        match tokio::time::timeout(deadline, self.read(out)).await {
            Ok(result) => result,
            Err(_) => Err(SnellError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "read deadline elapsed",
            ))),
        }
    }
}

impl<W> SnellHalfWrite<W>
where
    W: AsyncWrite + Unpin,
{
    async fn framed(&mut self) -> Result<&mut FramedWriter<W>, SnellError> {
        let state = self.state.take().expect("write half state poisoned");
        let writer = match state {
            WriteState::Init(writer) => writer,
            WriteState::Uninit {
                mut transport,
                cipher,
            } => {
                let mut salt = vec![0u8; cipher.salt_size()];
                rand::rngs::OsRng.fill_bytes(&mut salt);
                transport.write_all(&salt).await?;
                let aead = cipher.derive_encrypter(&salt)?;
                FramedWriter::new(transport, aead)
            }
        };
        self.state = Some(WriteState::Init(writer));
        match self.state.as_mut().expect("just set above") {
            WriteState::Init(writer) => Ok(writer),
            WriteState::Uninit { .. } => unreachable!("just initialized above"),
        }
    }

    /// See [`crate::framed::FramedWriter::write`].
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, SnellError> {
        self.framed().await?.write(buf).await
    }

    /// See [`crate::framed::FramedWriter::read_from`].
    pub async fn read_from<R>(&mut self, source: &mut R) -> Result<u64, SnellError>
    where
        R: AsyncRead + Unpin,
    {
        self.framed().await?.read_from(source).await
    }

    /// The underlying transport's local address, passed through
    /// transparently (see [`TransportMeta`]).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.addr.local_addr()
    }

    /// The underlying transport's peer address, passed through
    /// transparently (see [`TransportMeta`]).
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.addr.peer_addr()
    }

    /// Shut down the transport's write side, passed through
    /// transparently. Works regardless of whether the write half has
    /// performed its lazy salt handshake yet.
    pub async fn shutdown(&mut self) -> Result<(), SnellError> {
        match self.state.as_mut().expect("write half state poisoned") {
            WriteState::Init(writer) => writer.shutdown().await,
            WriteState::Uninit { transport, .. } => {
                transport.shutdown().await.map_err(SnellError::Io)
            }
        }
    }

    /// Write with a deadline: like [`SnellHalfWrite::write`], but
    /// fails with a timed-out I/O error if `deadline` elapses first.
    pub async fn write_with_deadline(
        &mut self,
        buf: &[u8],
        deadline: Duration,
    ) -> Result<usize, SnellError> {
        match tokio::time::timeout(deadline, self.write(buf)).await {
            Ok(result) => result,
            Err(_) => Err(SnellError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "write deadline elapsed",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::CipherKind;
    use tokio::io::duplex;

    #[tokio::test]
    async fn salt_then_ping_roundtrips_over_duplex_pipe() {
        let cipher = Arc::new(Cipher::new(CipherKind::ChaCha20IetfPoly1305, vec![0x77u8; 32]).unwrap());
        let (client_io, server_io) = duplex(4096);

        let (mut client_read, mut client_write) = SnellConnection::new(client_io, Arc::clone(&cipher), None);
        let (mut server_read, mut server_write) = SnellConnection::new(server_io, Arc::clone(&cipher), None);

        client_write.write(b"ping").await.unwrap();
        let mut out = [0u8; 4];
        let n = server_read.read(&mut out).await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(&out, b"ping");

        server_write.write(b"pong").await.unwrap();
        let n = client_read.read(&mut out).await.unwrap();
        assert_eq!(n, 4);
        assert_eq!(&out, b"pong");
    }

    #[tokio::test]
    async fn empty_write_surfaces_as_zero_chunk_on_peer() {
        let cipher = Arc::new(Cipher::new(CipherKind::Aes128Gcm, vec![0x33u8; 16]).unwrap());
        let (client_io, server_io) = duplex(4096);
        let (_client_read, mut client_write) = SnellConnection::new(client_io, Arc::clone(&cipher), None);
        let (mut server_read, _server_write) = SnellConnection::new(server_io, cipher, None);

        let n = client_write.write(b"").await.unwrap();
        assert_eq!(n, 0);
        let mut out = [0u8; 4];
        let err = server_read.read(&mut out).await.unwrap_err();
        assert!(matches!(err, SnellError::ZeroChunk));
    }

    #[tokio::test]
    async fn fallback_probe_commits_across_a_live_connection() {
        let primary = Arc::new(Cipher::new(CipherKind::Aes256Gcm, vec![0x01u8; 32]).unwrap());
        let legacy = Arc::new(Cipher::new(CipherKind::ChaCha20IetfPoly1305, vec![0x02u8; 32]).unwrap());
        let (client_io, server_io) = duplex(4096);

        let (_client_read, mut client_write) = SnellConnection::new(client_io, Arc::clone(&legacy), None);
        let (mut server_read, _server_write) =
            SnellConnection::new(server_io, Arc::clone(&primary), Some(Arc::clone(&legacy)));

        client_write.write(b"ping").await.unwrap();
        let mut out = [0u8; 4];
        let n = server_read.read(&mut out).await.unwrap();
        assert_eq!(&out[..n], b"ping");

        client_write.write(b"pong").await.unwrap();
        let n = server_read.read(&mut out).await.unwrap();
        assert_eq!(&out[..n], b"pong");
    }

    #[tokio::test]
    async fn tcp_transport_reports_real_addresses() {
        use tokio::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_addr = listener.local_addr().unwrap();
        let (client_conn, (server_conn, _)) =
            tokio::join!(TcpStream::connect(server_addr), async {
                listener.accept().await.unwrap()
            });
        let client_conn = client_conn.unwrap();
        let client_peer = client_conn.peer_addr().unwrap();
        let client_local = client_conn.local_addr().unwrap();

        let cipher = Arc::new(Cipher::new(CipherKind::Aes128Gcm, vec![0x44u8; 16]).unwrap());
        let (read, write) = SnellConnection::new(client_conn, cipher, None);

        assert_eq!(read.local_addr().unwrap(), client_local);
        assert_eq!(write.peer_addr().unwrap(), client_peer);
        drop(server_conn);
    }

    #[tokio::test]
    async fn duplex_transport_reports_unsupported_addresses() {
        let cipher = Arc::new(Cipher::new(CipherKind::Aes128Gcm, vec![0x55u8; 16]).unwrap());
        let (client_io, _server_io) = duplex(4096);
        let (read, write) = SnellConnection::new(client_io, cipher, None);

        assert_eq!(
            read.local_addr().unwrap_err().kind(),
            std::io::ErrorKind::Unsupported
        );
        assert_eq!(
            write.peer_addr().unwrap_err().kind(),
            std::io::ErrorKind::Unsupported
        );
    }

    #[tokio::test]
    async fn write_half_shutdown_passes_through_before_and_after_init() {
        let cipher = Arc::new(Cipher::new(CipherKind::Aes128Gcm, vec![0x66u8; 16]).unwrap());
        let (client_io, _server_io) = duplex(4096);
        let (_read, mut write) = SnellConnection::new(client_io, cipher, None);

        // Shutting down before the lazy salt handshake has happened
        // must still reach the underlying transport.
        write.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn read_with_deadline_times_out_when_peer_is_silent() {
        let cipher = Arc::new(Cipher::new(CipherKind::Aes128Gcm, vec![0x77u8; 16]).unwrap());
        let (client_io, _server_io) = duplex(4096);
        let (mut read, _write) = SnellConnection::new(client_io, cipher, None);

        let mut out = [0u8; 4];
        let err = read
            .read_with_deadline(&mut out, std::time::Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, SnellError::Io(e) if e.kind() == std::io::ErrorKind::TimedOut));
    }
}
