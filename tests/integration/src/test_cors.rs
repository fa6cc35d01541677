//! CORS header and preflight tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{TestServer, client, raw_exchange, split_response};

    #[tokio::test]
    async fn test_should_answer_preflight_on_any_path() {
        let server = TestServer::start().await;

        for path in ["/enhance", "/status", "/does/not/exist"] {
            let resp = client()
                .request(reqwest::Method::OPTIONS, server.url(path))
                .send()
                .await
                .expect("OPTIONS");
            assert_eq!(resp.status(), 200, "{path}");
            let headers = resp.headers();
            assert_eq!(headers["access-control-allow-origin"], "*");
            assert_eq!(
                headers["access-control-allow-methods"],
                "GET, POST, OPTIONS"
            );
            assert_eq!(headers["access-control-allow-headers"], "Content-Type");
            assert_eq!(headers["content-length"], "0");
        }

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_emit_cors_headers_before_handler_headers() {
        let server = TestServer::start().await;

        let raw = raw_exchange(
            server.addr(),
            &[b"GET /status HTTP/1.1\r\nHost: localhost\r\n\r\n"],
            Duration::ZERO,
        )
        .await;
        let (head, _) = split_response(&raw);
        let lines: Vec<&str> = head.split("\r\n").collect();
        assert_eq!(lines[0], "HTTP/1.1 200 OK");
        assert!(lines[1].starts_with("Access-Control-Allow-Origin"));
        assert!(lines[2].starts_with("Access-Control-Allow-Methods"));
        assert!(lines[3].starts_with("Access-Control-Allow-Headers"));
        assert!(lines[4].starts_with("Content-Type"));
        assert!(lines[5].starts_with("Content-Length"));
        assert_eq!(lines[6], "Connection: close");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_omit_cors_headers_when_disabled() {
        let server = TestServer::start_with(|mut config| {
            config.enable_cors = false;
            config
        })
        .await;

        let resp = client()
            .get(server.url("/status"))
            .send()
            .await
            .expect("GET /status");
        assert_eq!(resp.status(), 200);
        assert!(resp.headers().get("access-control-allow-origin").is_none());

        server.shutdown().await;
    }
}
