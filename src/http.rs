//! HTTP wire format between peers.
//!
//! A peer serves a value at
//!
//! ```text
//! GET <peer base url><base path><group>/<key>
//! ```
//!
//! with both path segments percent-encoded. The body of a `200 OK` is the raw
//! value (`application/octet-stream`); `404` means the group is unknown at the
//! peer and `500` carries the load error as plain text. Clients treat every
//! status other than `200` as a failed fetch.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{Error, Result};

/// Characters left unencoded in a path segment: ASCII alphanumerics and the
/// unreserved marks `-`, `_`, `.`, `~`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Content type of a successful response.
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Content type of an error response.
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Percent-encodes one path segment.
///
/// ```
/// assert_eq!(peercache::http::escape("a b/c"), "a%20b%2Fc");
/// ```
pub fn escape(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Decodes one percent-encoded path segment.
pub fn unescape(segment: &str) -> Result<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| Error::BadRequest(format!("invalid path segment {segment:?}: {err}")))
}

/// Builds the URL of `(group, key)` on the peer whose base URL (peer address
/// followed by the base path) is `base_url`.
///
/// ```
/// use peercache::http::peer_url;
///
/// assert_eq!(
///     peer_url("http://10.0.0.2:8001/_peercache/", "images", "cat 1.png"),
///     "http://10.0.0.2:8001/_peercache/images/cat%201.png",
/// );
/// ```
pub fn peer_url(base_url: &str, group: &str, key: &str) -> String {
    format!("{base_url}{}/{}", escape(group), escape(key))
}

#[cfg(feature = "http")]
pub use self::client::HttpGetter;

#[cfg(feature = "http")]
mod client {
    use std::fmt;
    use std::io::Read;
    use std::time::Duration;

    use crate::error::{Error, Result};
    use crate::peers::PeerGetter;

    use super::peer_url;

    /// Fetches values from one remote peer over HTTP.
    pub struct HttpGetter {
        base_url: String,
        agent: ureq::Agent,
    }

    impl HttpGetter {
        /// Creates a getter for the peer whose base URL (address followed by
        /// the base path) is `base_url`. `timeout` bounds each request.
        pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Self {
            let mut builder = ureq::AgentBuilder::new();
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            HttpGetter {
                base_url: base_url.into(),
                agent: builder.build(),
            }
        }

        /// The base URL requests are sent to.
        pub fn base_url(&self) -> &str {
            &self.base_url
        }
    }

    impl PeerGetter for HttpGetter {
        fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
            let url = peer_url(&self.base_url, group, key);
            let response = match self.agent.get(&url).call() {
                Ok(response) => response,
                Err(ureq::Error::Status(status, response)) => {
                    return Err(Error::PeerStatus {
                        status,
                        status_text: response.status_text().to_string(),
                    });
                }
                Err(err) => return Err(Error::PeerRequest(err.to_string())),
            };

            if response.status() != 200 {
                return Err(Error::PeerStatus {
                    status: response.status(),
                    status_text: response.status_text().to_string(),
                });
            }

            let mut body = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut body)
                .map_err(|err| Error::PeerRequest(format!("reading response body: {err}")))?;
            Ok(body)
        }
    }

    impl fmt::Debug for HttpGetter {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("HttpGetter")
                .field("base_url", &self.base_url)
                .finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_keeps_unreserved() {
        assert_eq!(escape("Tom-630_v1.0~x"), "Tom-630_v1.0~x");
    }

    #[test]
    fn test_escape_encodes_separators() {
        assert_eq!(escape("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(escape("é"), "%C3%A9");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        for segment in ["plain", "with space", "slash/inside", "ünïcödé", "100%"] {
            assert_eq!(unescape(&escape(segment)).unwrap(), segment);
        }
    }

    #[test]
    fn test_unescape_rejects_invalid_utf8() {
        assert!(matches!(unescape("%FF%FE"), Err(Error::BadRequest(_))));
    }

    /// Accepts one connection on a local port, answers it with `status_line`
    /// and `body`, and yields the request line it received.
    #[cfg(feature = "http")]
    fn answer_once(
        status_line: &'static str,
        body: &'static [u8],
    ) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            write!(
                stream,
                "HTTP/1.1 {status_line}\r\nContent-Type: {CONTENT_TYPE_OCTET_STREAM}\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body).unwrap();
            stream.flush().unwrap();
            request_line.trim_end().to_string()
        });
        (format!("http://{addr}/_peercache/"), server)
    }

    #[cfg(feature = "http")]
    fn fetch(status_line: &'static str, body: &'static [u8]) -> (Result<Vec<u8>>, String) {
        let (base_url, server) = answer_once(status_line, body);
        let getter = HttpGetter::new(base_url, Some(std::time::Duration::from_secs(5)));
        let result = crate::peers::PeerGetter::get(&getter, "my group", "a/b");
        (result, server.join().unwrap())
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_getter_returns_body_of_ok() {
        let (result, request_line) = fetch("200 OK", b"ABC");
        assert_eq!(result.unwrap(), b"ABC");
        assert_eq!(request_line, "GET /_peercache/my%20group/a%2Fb HTTP/1.1");
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_getter_maps_error_statuses() {
        for (status_line, status, status_text) in [
            ("404 Not Found", 404, "Not Found"),
            ("500 Internal Server Error", 500, "Internal Server Error"),
        ] {
            let (result, request_line) = fetch(status_line, b"no such group: my group");
            assert!(request_line.starts_with("GET /_peercache/my%20group/a%2Fb "));
            match result.unwrap_err() {
                Error::PeerStatus {
                    status: got,
                    status_text: text,
                } => {
                    assert_eq!(got, status);
                    assert_eq!(text, status_text);
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_getter_rejects_other_success_statuses() {
        let (result, _) = fetch("203 Non-Authoritative Information", b"stale");
        let err = result.unwrap_err();
        assert!(err.is_peer_error());
        assert_eq!(
            err.to_string(),
            "server returned: 203 Non-Authoritative Information"
        );
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_unreachable_peer_is_a_request_error() {
        let getter = HttpGetter::new(
            "http://127.0.0.1:1/_peercache/",
            Some(std::time::Duration::from_millis(200)),
        );
        let err = crate::peers::PeerGetter::get(&getter, "g", "k").unwrap_err();
        assert!(matches!(err, Error::PeerRequest(_)));
        assert!(err.is_peer_error());
    }
}
