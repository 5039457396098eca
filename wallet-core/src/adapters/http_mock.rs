//! Mock action server for testing the HTTP transport
//!
//! A tiny HTTP/1.1 server on a random local port. It accepts form-encoded
//! `POST /api` and `POST /pin` requests, records the decoded `action` and
//! `data` fields, and answers with a canned envelope per action name.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Mock action server for testing
pub struct MockActionServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<ServerState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Configuration of canned behaviour
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// HTTP status of every response
    pub status: u16,
    /// Body sent verbatim instead of an envelope
    pub raw_body: Option<String>,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            status: 200,
            raw_body: None,
            delay_ms: 0,
        }
    }
}

/// A request as seen by the server
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub action: String,
    pub data: String,
}

#[derive(Default)]
struct ServerState {
    responses: HashMap<String, serde_json::Value>,
    received: Vec<ReceivedRequest>,
}

impl MockActionServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(ServerState::default()));

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    /// URL of the general API endpoint
    pub fn api_url(&self) -> String {
        format!("http://127.0.0.1:{}/api", self.port)
    }

    /// URL of the PIN service endpoint
    pub fn pin_api_url(&self) -> String {
        format!("http://127.0.0.1:{}/pin", self.port)
    }

    /// Answer `action` with `envelope` from now on
    pub fn respond(&self, action: &str, envelope: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        state.responses.insert(action.to_string(), envelope);
    }

    /// Requests received so far, in arrival order
    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.state.lock().unwrap().received.clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockActionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, state: &Mutex<ServerState>) {
    let _ = stream.set_nonblocking(false);
    let Some((path, body)) = read_request(&mut stream) else {
        send_response(&mut stream, 400, r#"{"success": false, "error": "Invalid request"}"#);
        return;
    };

    if config.delay_ms > 0 {
        thread::sleep(Duration::from_millis(config.delay_ms));
    }

    let mut action = String::new();
    let mut data = String::new();
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "action" => action = value.into_owned(),
            "data" => data = value.into_owned(),
            _ => {}
        }
    }

    let envelope = {
        let mut state = state.lock().unwrap();
        state.received.push(ReceivedRequest {
            path,
            action: action.clone(),
            data,
        });
        state.responses.get(&action).cloned()
    };

    let body = match (&config.raw_body, envelope) {
        (Some(raw), _) => raw.clone(),
        (None, Some(envelope)) => envelope.to_string(),
        (None, None) => serde_json::json!({"success": false, "error": "Unknown action"}).to_string(),
    };
    send_response(&mut stream, config.status, &body);
}

/// Read the request line, headers and a `Content-Length` body
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let path = head.lines().next()?.split_whitespace().nth(1)?.to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    let end = buffer.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buffer[header_end..end]).to_string();
    Some((path, body))
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        if status == 200 { "OK" } else { "Error" },
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_server_starts() {
        let server = MockActionServer::start(MockConfig::default()).unwrap();
        assert!(server.api_url().starts_with("http://127.0.0.1:"));
        assert!(server.received().is_empty());
    }
}
