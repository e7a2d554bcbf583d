#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

pub mod messages {
    use brrtdispatch::{Validate, ValidationError};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Counter {
        pub name: String,
        pub values: Vec<i64>,
    }

    impl Validate for Counter {
        fn validate(&self) -> Result<(), ValidationError> {
            let mut err = ValidationError::default();
            if self.name.is_empty() {
                err.push("name", "required");
            }
            if self.values.len() > 8 {
                err.push("values", "at most 8 entries");
            }
            err.into_result()
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Total {
        pub name: String,
        pub total: i64,
        pub seen: Vec<i64>,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Unrelated {
        pub flag: bool,
    }

    impl Validate for Unrelated {}
}

pub mod handlers {
    use super::messages::{Counter, Total};
    use brrtdispatch::{Context, HandlerError};

    /// Sums `values`, appending each to `seen` so leaked response state shows up.
    pub fn sum(_ctx: &Context, req: &Counter, res: &mut Total) -> Result<(), HandlerError> {
        res.name.push_str(&req.name);
        for v in &req.values {
            res.total += v;
            res.seen.push(*v);
        }
        Ok(())
    }
}

pub mod test_server {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::Once;
    use std::time::Duration;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        send_request_with_timeout(addr, req, Duration::from_millis(200))
    }

    /// Like [`send_request`] with a longer wait for the first reply bytes.
    pub fn send_request_with_timeout(addr: &SocketAddr, req: &str, timeout: Duration) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream.set_read_timeout(Some(timeout)).unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn get(path: &str) -> String {
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n")
    }

    pub fn post_form(path: &str, body: &str) -> String {
        format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    pub fn post_json(path: &str, body: &str) -> String {
        format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    /// Status code and raw body of a single response.
    pub fn parse_response(resp: &str) -> (u16, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let status = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        (status, body.to_string())
    }

    pub fn parse_json(resp: &str) -> (u16, serde_json::Value) {
        let (status, body) = parse_response(resp);
        (status, serde_json::from_str(&body).unwrap_or_default())
    }
}
