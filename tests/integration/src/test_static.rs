//! Static file and 404 tests.

#[cfg(test)]
mod tests {
    use crate::{INDEX_HTML, TestServer, client};

    #[tokio::test]
    async fn test_should_serve_default_document_at_root() {
        let server = TestServer::start().await;

        let resp = client().get(server.url("/")).send().await.expect("GET /");
        assert_eq!(resp.status(), 200);
        assert!(
            resp.headers()["content-type"]
                .to_str()
                .expect("ascii")
                .starts_with("text/html")
        );
        assert_eq!(resp.text().await.expect("body"), INDEX_HTML);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_serve_static_asset_with_mime_type() {
        let server = TestServer::start().await;

        let resp = client()
            .get(server.url("/app.js"))
            .send()
            .await
            .expect("GET /app.js");
        assert_eq!(resp.status(), 200);
        assert!(
            resp.headers()["content-type"]
                .to_str()
                .expect("ascii")
                .starts_with("application/javascript")
        );

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_return_404_html_for_unknown_paths() {
        let server = TestServer::start().await;
        let client = client();

        let resp = client
            .get(server.url("/nonexistent"))
            .send()
            .await
            .expect("GET /nonexistent");
        assert_eq!(resp.status(), 404);
        assert!(
            resp.headers()["content-type"]
                .to_str()
                .expect("ascii")
                .starts_with("text/html")
        );

        let resp = client
            .delete(server.url("/status"))
            .send()
            .await
            .expect("DELETE /status");
        assert_eq!(resp.status(), 404);

        server.shutdown().await;
    }
}
