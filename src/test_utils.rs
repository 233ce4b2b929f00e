//! Test doubles for the transports.
//!
//! Available to unit tests and, through the `test-util` feature, to
//! integration tests.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509, X509NameBuilder};
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::queue_transport::BrokerProducer;
use crate::transport::TransportError;

/// A message accepted by [`RecordingProducer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub topic: String,
    pub payload: String,
}

/// Producer that accepts every message and remembers it.
///
/// Clones share state, so a test can keep one clone while the client owns
/// another.
#[derive(Clone, Default)]
pub struct RecordingProducer {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    closed: Arc<AtomicBool>,
}

impl RecordingProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far, in send order.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl BrokerProducer for RecordingProducer {
    fn send(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.sent.lock().push(SentMessage {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
        });
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Producer that fails a fixed number of attempts before delegating to a
/// [`RecordingProducer`].
#[derive(Clone, Default)]
pub struct FailingProducer {
    failures: usize,
    attempts: Arc<AtomicUsize>,
    inner: RecordingProducer,
}

impl FailingProducer {
    /// Fail every attempt.
    pub fn always() -> Self {
        Self::failing_first(usize::MAX)
    }

    /// Fail the first `failures` attempts, then succeed.
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    /// Number of send attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Messages that eventually went through.
    pub fn delivered(&self) -> Vec<SentMessage> {
        self.inner.messages()
    }
}

impl BrokerProducer for FailingProducer {
    fn send(&mut self, topic: &str, payload: &str) -> Result<(), TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            let reason = format!("simulated failure {attempt}");
            return Err(TransportError::Broker(reason));
        }
        self.inner.send(topic, payload)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// A request captured by [`MockIngestServer`].
#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Loopback HTTP server answering successive requests with the given statuses.
pub struct MockIngestServer {
    addr: SocketAddr,
    requests: mpsc::Receiver<CapturedRequest>,
}

impl MockIngestServer {
    /// Serve one request per entry of `statuses`, then stop accepting.
    pub fn start(statuses: Vec<u16>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("listener has address");
        let (tx, requests) = mpsc::channel();
        thread::spawn(move || {
            for status in statuses {
                let Ok((stream, _)) = listener.accept() else {
                    break;
                };
                let captured = Self::answer(stream, status);
                if tx.send(captured).is_err() {
                    break;
                }
            }
        });
        Self { addr, requests }
    }

    /// Base URL to use as the API base.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the next captured request.
    pub fn next_request(&self, timeout: Duration) -> Option<CapturedRequest> {
        self.requests.recv_timeout(timeout).ok()
    }

    fn answer(mut stream: TcpStream, status: u16) -> CapturedRequest {
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("set read timeout");
        let captured = Self::capture(BufReader::new(&stream));
        let reply = format!(
            "HTTP/1.1 {status} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Self::reason(status)
        );
        stream.write_all(reply.as_bytes()).expect("write response");
        captured
    }

    /// Read the request line, headers and a `Content-Length` body.
    fn capture(mut reader: impl BufRead) -> CapturedRequest {
        let mut next_line = || {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read request");
            line.trim_end().to_owned()
        };

        let request_line = next_line();
        let (method, rest) = request_line.split_once(' ').unwrap_or_default();
        let path = rest.split(' ').next().unwrap_or_default().to_owned();
        let method = method.to_owned();

        let headers: Vec<(String, String)> = std::iter::from_fn(|| {
            let line = next_line();
            (!line.is_empty()).then_some(line)
        })
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_ascii_lowercase(), value.trim().to_owned()))
        })
        .collect();

        let length = headers
            .iter()
            .find(|(name, _)| name == "content-length")
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(0);
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).expect("read body");

        CapturedRequest {
            method,
            path,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }

    fn reason(status: u16) -> &'static str {
        match status {
            200..=299 => "OK",
            401 => "Unauthorized",
            429 => "Too Many Requests",
            400..=499 => "Client Error",
            _ => "Server Error",
        }
    }
}

/// Self-signed TLS material written to a temporary directory.
///
/// The keystore is a PKCS#12 bundle protected by the given password; the
/// truststore is a PEM file holding the same certificate.
pub struct TestCredentials {
    _dir: TempDir,
    truststore: PathBuf,
    keystore: PathBuf,
}

impl TestCredentials {
    pub fn generate(password: &str) -> Self {
        let dir = tempfile::tempdir().expect("create credential dir");
        let pkey = PKey::from_rsa(Rsa::generate(2048).expect("generate rsa key")).expect("pkey");

        let mut name = X509NameBuilder::new().expect("name builder");
        name.append_entry_by_text("CN", "cloudlog-test")
            .expect("common name");
        let name = name.build();

        let mut builder = X509::builder().expect("x509 builder");
        builder.set_version(2).expect("version");
        let serial = BigNum::from_u32(1)
            .and_then(|bn| bn.to_asn1_integer())
            .expect("serial");
        builder.set_serial_number(&serial).expect("set serial");
        builder.set_subject_name(&name).expect("subject");
        builder.set_issuer_name(&name).expect("issuer");
        builder.set_pubkey(&pkey).expect("pubkey");
        let not_before = Asn1Time::days_from_now(0).expect("not before");
        let not_after = Asn1Time::days_from_now(1).expect("not after");
        builder.set_not_before(&not_before).expect("set not before");
        builder.set_not_after(&not_after).expect("set not after");
        builder
            .sign(&pkey, MessageDigest::sha256())
            .expect("sign certificate");
        let cert = builder.build();

        let mut p12 = Pkcs12::builder();
        p12.name("cloudlog-test").pkey(&pkey).cert(&cert);
        let p12 = p12.build2(password).expect("build pkcs12");

        let truststore = dir.path().join("truststore.pem");
        let keystore = dir.path().join("keystore.p12");
        std::fs::write(&truststore, cert.to_pem().expect("pem")).expect("write truststore");
        std::fs::write(&keystore, p12.to_der().expect("der")).expect("write keystore");

        Self {
            _dir: dir,
            truststore,
            keystore,
        }
    }

    pub fn truststore(&self) -> &Path {
        &self.truststore
    }

    pub fn keystore(&self) -> &Path {
        &self.keystore
    }
}
