//! `/enhance` end-to-end tests against the real image pipeline.

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::Value;

    use crate::{TestServer, client, multipart_body, multipart_content_type, tiny_png};

    async fn post_enhance(server: &TestServer, content_type: &str, body: Vec<u8>) -> (u16, Value) {
        let resp = client()
            .post(server.url("/enhance"))
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await
            .expect("POST /enhance");
        let status = resp.status().as_u16();
        let json = resp.json().await.expect("json body");
        (status, json)
    }

    #[tokio::test]
    async fn test_should_enhance_base64_field() {
        let server = TestServer::start().await;

        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(tiny_png(10, 10)));
        let body = multipart_body(&[(r#"name="image""#, data_url.as_bytes())]);
        let (status, json) = post_enhance(&server, &multipart_content_type(), body).await;

        assert_eq!(status, 200, "{json}");
        assert_eq!(json["success"], true);
        let image = json["enhanced_image"].as_str().expect("enhanced_image");
        let payload = image
            .strip_prefix("data:image/jpeg;base64,")
            .expect("jpeg data url");
        let jpeg = STANDARD.decode(payload).expect("base64 payload");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        assert!(json["processing_time"].as_f64().expect("processing_time") > 0.0);
        assert!(json["faces_detected"].as_u64().is_some());
        assert!(json["timing"]["total"].as_f64().is_some());
        assert_eq!(json["metrics"]["resolution"], "10x10 → 20x20");
        assert_eq!(json["metrics"]["scale_factor"], 2.0);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_enhance_file_upload_with_parameters() {
        let server = TestServer::start().await;

        let png = tiny_png(8, 6);
        let body = multipart_body(&[
            (r#"name="mode""#, b"traditional".as_slice()),
            (r#"name="scale""#, b"1".as_slice()),
            (r#"name="image"; filename="face.png""#, png.as_slice()),
        ]);
        let (status, json) = post_enhance(&server, &multipart_content_type(), body).await;

        assert_eq!(status, 200, "{json}");
        assert_eq!(json["faces_detected"], 0);
        assert_eq!(json["metrics"]["resolution"], "8x6 → 8x6");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_reject_non_multipart_content_type() {
        let server = TestServer::start().await;

        let (status, json) = post_enhance(&server, "text/plain", b"hello".to_vec()).await;
        assert_eq!(status, 400);
        assert_eq!(
            json["error"],
            "Invalid Content-Type, multipart boundary not found"
        );

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_reject_request_without_image() {
        let server = TestServer::start().await;

        let body = multipart_body(&[(r#"name="scale""#, b"2".as_slice())]);
        let (status, json) = post_enhance(&server, &multipart_content_type(), body).await;
        assert_eq!(status, 400);
        assert_eq!(json["error"], "No image data found in request");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_reject_undecodable_image() {
        let server = TestServer::start().await;

        let encoded = STANDARD.encode(b"this is not an image");
        let body = multipart_body(&[(r#"name="image""#, encoded.as_bytes())]);
        let (status, json) = post_enhance(&server, &multipart_content_type(), body).await;
        assert_eq!(status, 400);
        assert_eq!(json["error"], "Failed to decode image");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_reject_image_beyond_size_limits() {
        let server = TestServer::start().await;

        // Small on the wire, but wider than any accepted upload.
        let wide = tiny_png(9000, 1);
        let body = multipart_body(&[(r#"name="image"; filename="wide.png""#, wide.as_slice())]);
        let (status, json) = post_enhance(&server, &multipart_content_type(), body).await;
        assert_eq!(status, 400);
        assert_eq!(json["error"], "Failed to decode image");

        // Decodable, but too many pixels once upscaled.
        let big = tiny_png(1100, 1100);
        let body = multipart_body(&[
            (r#"name="image"; filename="big.png""#, big.as_slice()),
            (r#"name="scale""#, b"4".as_slice()),
        ]);
        let (status, json) = post_enhance(&server, &multipart_content_type(), body).await;
        assert_eq!(status, 400);
        assert!(
            json["error"]
                .as_str()
                .is_some_and(|e| e.starts_with("Image too large"))
        );

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_should_reject_out_of_range_parameter() {
        let server = TestServer::start().await;

        let encoded = STANDARD.encode(tiny_png(4, 4));
        let body = multipart_body(&[
            (r#"name="image""#, encoded.as_bytes()),
            (r#"name="scale""#, b"12".as_slice()),
        ]);
        let (status, json) = post_enhance(&server, &multipart_content_type(), body).await;
        assert_eq!(status, 400);
        assert_eq!(json["error"], "invalid value for parameter scale: 12");

        server.shutdown().await;
    }
}
