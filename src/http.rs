//! Minimal HTTP/1.1 plumbing over `TcpStream`.
//!
//! The service speaks just enough HTTP for its surface: parse a GET request
//! line, write a status line + headers + body, close the connection. Bodies
//! on requests are ignored; responses always carry Content-Length and
//! `Connection: close`.

use crate::error::RequestError;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Cap on the request head; anything longer is rejected.
const MAX_HEAD_BYTES: usize = 8 * 1024;

/// How long to wait for a client to finish sending its request head.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// A parsed request line. Headers beyond the request line are read off the
/// socket but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: String,
  pub path: String,
}

/// Read one request head from the stream and parse its request line.
pub fn read_request(stream: &mut TcpStream) -> Result<Request, RequestError> {
  let _ = stream.set_read_timeout(Some(READ_TIMEOUT));
  let mut head = Vec::new();
  let mut buf = [0u8; 1024];
  loop {
    match stream.read(&mut buf) {
      Ok(0) => break,
      Ok(n) => {
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
          break;
        }
        if head.len() > MAX_HEAD_BYTES {
          return Err(RequestError::TooLarge { limit: MAX_HEAD_BYTES });
        }
      }
      Err(_) => return Err(RequestError::BadRequestLine),
    }
  }
  parse_request_line(&head)
}

fn parse_request_line(head: &[u8]) -> Result<Request, RequestError> {
  let text = std::str::from_utf8(head).map_err(|_| RequestError::BadRequestLine)?;
  let line = text.lines().next().ok_or(RequestError::BadRequestLine)?;
  let mut parts = line.split_whitespace();
  let method = parts.next().ok_or(RequestError::BadRequestLine)?;
  let path = parts.next().ok_or(RequestError::BadRequestLine)?;
  let version = parts.next().ok_or(RequestError::BadRequestLine)?;
  if !version.starts_with("HTTP/") {
    return Err(RequestError::BadRequestLine);
  }
  Ok(Request {
    method: method.to_string(),
    path: path.to_string(),
  })
}

/// An HTTP response ready to be written.
#[derive(Debug, Clone)]
pub struct Response {
  status: u16,
  content_type: &'static str,
  body: Vec<u8>,
}

impl Response {
  pub fn ok(content_type: &'static str, body: Vec<u8>) -> Response {
    Response {
      status: 200,
      content_type,
      body,
    }
  }

  pub fn bad_request(message: String) -> Response {
    Response {
      status: 400,
      content_type: "text/plain",
      body: message.into_bytes(),
    }
  }

  pub fn not_found() -> Response {
    Response {
      status: 404,
      content_type: "text/plain",
      body: b"not found".to_vec(),
    }
  }

  pub fn method_not_allowed() -> Response {
    Response {
      status: 405,
      content_type: "text/plain",
      body: b"only GET is supported".to_vec(),
    }
  }

  pub fn server_error(message: String) -> Response {
    Response {
      status: 500,
      content_type: "text/plain",
      body: message.into_bytes(),
    }
  }

  pub fn unavailable(message: String) -> Response {
    Response {
      status: 503,
      content_type: "text/plain",
      body: message.into_bytes(),
    }
  }

  pub fn status(&self) -> u16 {
    self.status
  }

  pub fn body_len(&self) -> usize {
    self.body.len()
  }

  /// Write status line, headers, and body. The connection is closed by the
  /// caller dropping the stream afterwards.
  pub fn write_to(&self, stream: &mut TcpStream) -> std::io::Result<()> {
    let head = format!(
      "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
      self.status,
      reason_phrase(self.status),
      self.content_type,
      self.body.len()
    );
    stream.write_all(head.as_bytes())?;
    stream.write_all(&self.body)?;
    stream.flush()
  }
}

fn reason_phrase(status: u16) -> &'static str {
  match status {
    200 => "OK",
    400 => "Bad Request",
    404 => "Not Found",
    405 => "Method Not Allowed",
    503 => "Service Unavailable",
    _ => "Internal Server Error",
  }
}
