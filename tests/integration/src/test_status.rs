//! `/status` endpoint tests.

#[cfg(test)]
mod tests {
    use crate::{TestServer, client};

    #[tokio::test]
    async fn test_should_report_ready_status() {
        let server = TestServer::start().await;

        let resp = client()
            .get(server.url("/status"))
            .send()
            .await
            .expect("GET /status");
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(
            resp.headers().get("connection").and_then(|v| v.to_str().ok()),
            Some("close")
        );

        let body: serde_json::Value = resp.json().await.expect("json body");
        assert_eq!(body["status"], "ready");
        assert_eq!(body["server"], "Facelift Enhancement Server");
        assert!(body["version"].as_str().is_some_and(|v| !v.is_empty()));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_serve_many_concurrent_requests() {
        let server = TestServer::start_with(|mut config| {
            config.max_connections = 4;
            config
        })
        .await;
        let client = client();

        let requests = (0..32).map(|_| {
            let client = client.clone();
            let url = server.url("/status");
            tokio::spawn(async move { client.get(url).send().await.map(|r| r.status()) })
        });
        for handle in requests.collect::<Vec<_>>() {
            let status = handle.await.expect("join").expect("request");
            assert_eq!(status, 200);
        }

        server.shutdown().await;
    }
}
