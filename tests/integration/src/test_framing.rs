//! Wire-level request framing tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{TestServer, client, raw_exchange, split_response};

    const PAUSE: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_should_reassemble_fragmented_request() {
        let server = TestServer::start().await;

        let raw = raw_exchange(
            server.addr(),
            &[
                b"POST /enh",
                b"ance HTTP/1.1\r\nHost: local",
                b"host\r\nContent-Type: text/plain\r\n",
                b"Content-Length: 10\r\n\r\nhello",
                b" wrld",
            ],
            PAUSE,
        )
        .await;
        let (head, body) = split_response(&raw);

        // The body arrived intact; the handler rejects it on content type.
        assert!(head.starts_with("HTTP/1.1 400 Bad Request"), "{head}");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            json["error"],
            "Invalid Content-Type, multipart boundary not found"
        );

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_accept_lowercase_header_names() {
        let server = TestServer::start().await;

        let raw = raw_exchange(
            server.addr(),
            &[b"GET /status HTTP/1.1\r\nhost: localhost\r\ncontent-length: 0\r\n\r\n"],
            Duration::ZERO,
        )
        .await;
        let (head, body) = split_response(&raw);
        assert!(head.starts_with("HTTP/1.1 200 OK"), "{head}");
        assert!(head.contains("\r\nConnection: close"));
        assert!(head.contains(&format!("\r\nContent-Length: {}", body.len())));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_drop_malformed_content_length_and_keep_serving() {
        let server = TestServer::start().await;

        let raw = raw_exchange(
            server.addr(),
            &[b"POST /enhance HTTP/1.1\r\nContent-Length: lots\r\n\r\n"],
            Duration::ZERO,
        )
        .await;
        assert!(raw.is_empty());

        let resp = client()
            .get(server.url("/status"))
            .send()
            .await
            .expect("GET /status after bad request");
        assert_eq!(resp.status(), 200);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_reject_oversized_request_with_413() {
        let server = TestServer::start_with(|mut config| {
            config.max_request_size = 4096;
            config
        })
        .await;

        let raw = raw_exchange(
            server.addr(),
            &[b"POST /enhance HTTP/1.1\r\nContent-Type: text/plain\r\nContent-Length: 1000000\r\n\r\n"],
            Duration::ZERO,
        )
        .await;
        let (head, _) = split_response(&raw);
        assert!(head.starts_with("HTTP/1.1 413"), "{head}");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_close_connection_after_one_response() {
        let server = TestServer::start().await;

        // The client never half-closes; the read only ends because the server does.
        let raw = raw_exchange(
            server.addr(),
            &[b"GET /status HTTP/1.1\r\nConnection: keep-alive\r\n\r\n"],
            Duration::ZERO,
        )
        .await;
        let (head, _) = split_response(&raw);
        assert!(head.starts_with("HTTP/1.1 200 OK"), "{head}");
        assert!(head.ends_with("Connection: close"), "{head}");

        server.shutdown().await;
    }
}
