//! Host transports that execute `HttpRequest` values.
//!
//! The core never performs I/O on its own; a `Transport` is what a host
//! hands to `PortalClient::fetch_*` when it is happy to block. With the
//! `blocking` feature, `UreqTransport` is provided.

use crate::http::{HttpRequest, HttpResponse, TransportError};

pub trait Transport {
    /// Execute `request`. Non-2xx statuses are responses, not errors.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

#[cfg(feature = "blocking")]
pub use blocking::UreqTransport;

#[cfg(feature = "blocking")]
mod blocking {
    use super::Transport;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse, TransportError};

    /// Blocking transport over `ureq`, one agent per request timeout.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct UreqTransport;

    impl UreqTransport {
        pub fn new() -> Self {
            Self
        }
    }

    fn map_error(err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout,
            ureq::Error::Io(e) => TransportError::Connect(e.to_string()),
            e @ (ureq::Error::ConnectionFailed | ureq::Error::HostNotFound) => {
                TransportError::Connect(e.to_string())
            }
            other => TransportError::Other(other.to_string()),
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .timeout_global(Some(req.timeout))
                .build()
                .new_agent();

            let result = match req.method {
                HttpMethod::Get | HttpMethod::Delete => {
                    let mut builder = if req.method == HttpMethod::Get {
                        agent.get(&req.path)
                    } else {
                        agent.delete(&req.path)
                    };
                    for (k, v) in &req.headers {
                        builder = builder.header(k.as_str(), v.as_str());
                    }
                    for (k, v) in &req.query {
                        builder = builder.query(k, v);
                    }
                    builder.call()
                }
                HttpMethod::Post | HttpMethod::Put => {
                    let mut builder = if req.method == HttpMethod::Post {
                        agent.post(&req.path)
                    } else {
                        agent.put(&req.path)
                    };
                    for (k, v) in &req.headers {
                        builder = builder.header(k.as_str(), v.as_str());
                    }
                    for (k, v) in &req.query {
                        builder = builder.query(k, v);
                    }
                    match &req.body {
                        Some(body) => builder.send(body.as_bytes()),
                        None => builder.send_empty(),
                    }
                }
            };

            let mut response = result.map_err(map_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| {
                    v.to_str()
                        .ok()
                        .map(|v| (k.as_str().to_string(), v.to_string()))
                })
                .collect();
            let body = response.body_mut().read_to_string().map_err(map_error)?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::http::HttpMethod;

    #[test]
    fn closures_act_as_transports() {
        let transport = |req: HttpRequest| -> Result<HttpResponse, TransportError> {
            assert_eq!(req.method, HttpMethod::Get);
            Ok(HttpResponse::new(204, ""))
        };
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: "http://localhost:3000/user/1".into(),
            endpoint: "/user/1".into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(transport.execute(req).unwrap().status, 204);
    }
}
