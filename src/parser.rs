use thiserror::Error;

/// Largest request body accepted on a connection.
pub const MAX_BODY_LEN: usize = 1024 * 1024;
/// Largest request line plus headers accepted on a connection.
pub const MAX_HEAD_LEN: usize = 16 * 1024;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Method {
    Get,
    Post,
    Delete,
    Other,
}

impl Method {
    fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "DELETE" => Method::Delete,
            _ => Method::Other,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Request {
    pub method: Method,
    /// Request target without its query string, still percent-encoded.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Whether the connection stays open after this request.
    pub keep_alive: bool,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ParserError {
    #[error("incomplete request")]
    Incomplete,
    #[error("malformed request: {0}")]
    InvalidFormat(String),
    #[error("request too large")]
    TooLarge,
    #[error("unsupported: {0}")]
    Unsupported(String),
}

type ParseResult = Result<(Request, usize), ParserError>;

impl Request {
    /// Parses one request from the front of `buffer`, returning it and the
    /// number of bytes it occupied. `Incomplete` means more bytes are needed.
    pub fn parse(buffer: &[u8]) -> ParseResult {
        let Some(head_end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") else {
            if buffer.len() > MAX_HEAD_LEN {
                return Err(ParserError::TooLarge);
            }
            return Err(ParserError::Incomplete);
        };
        if head_end > MAX_HEAD_LEN {
            return Err(ParserError::TooLarge);
        }
        let head = std::str::from_utf8(&buffer[..head_end])
            .map_err(|e| ParserError::InvalidFormat(e.to_string()))?;
        let mut lines = head.split("\r\n");

        let (method, path, http10) = Self::parse_request_line(lines.next().unwrap_or_default())?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParserError::InvalidFormat("header without ':'".to_string()))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let mut request = Request {
            method,
            path,
            headers,
            body: Vec::new(),
            keep_alive: !http10,
        };

        if request.header("transfer-encoding").is_some() {
            return Err(ParserError::Unsupported("transfer-encoding".to_string()));
        }
        match request.header("connection").map(str::to_ascii_lowercase) {
            Some(c) if c == "close" => request.keep_alive = false,
            Some(c) if c == "keep-alive" => request.keep_alive = true,
            _ => {}
        }

        let len = match request.header("content-length") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| ParserError::InvalidFormat(e.to_string()))?,
            None => 0,
        };
        if len > MAX_BODY_LEN {
            return Err(ParserError::TooLarge);
        }

        let body_start = head_end + 4;
        let total_len = body_start + len;
        if buffer.len() < total_len {
            return Err(ParserError::Incomplete);
        }
        request.body = buffer[body_start..total_len].to_vec();

        Ok((request, total_len))
    }

    fn parse_request_line(line: &str) -> Result<(Method, String, bool), ParserError> {
        let mut parts = line.split(' ');
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParserError::InvalidFormat(format!("bad request line `{line}`")));
        };

        let http10 = match version {
            "HTTP/1.1" => false,
            "HTTP/1.0" => true,
            _ => return Err(ParserError::Unsupported(version.to_string())),
        };
        if !target.starts_with('/') {
            return Err(ParserError::InvalidFormat(format!("bad target `{target}`")));
        }
        let path = target.split(['?', '#']).next().unwrap_or(target);

        Ok((Method::from_token(method), path.to_string(), http10))
    }
}

/// Decodes `%XX` escapes in a path segment. Invalid escapes are kept as-is.
pub fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                out.push((hex_value(hi) << 4) | hex_value(lo));
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit.to_ascii_uppercase() - b'A' + 10,
    }
}
