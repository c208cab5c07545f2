use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use dog_media::{MediaAdapter, MediaBackend, MediaConfig, MemoryChunkStore, StoreGate};
use dog_media_axum::{MediaApp, MediaAxumState};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "dogmediaboundary";

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn app_with(config: MediaConfig) -> (MediaApp, MediaAdapter) {
    let adapter = MediaAdapter::new(MediaBackend::new(MemoryChunkStore::with_chunk_size(64)), config);
    let gate = StoreGate::ready(adapter.clone());
    (MediaApp::new(MediaAxumState::new(gate)), adapter)
}

fn app() -> (MediaApp, MediaAdapter) {
    app_with(MediaConfig::default())
}

async fn seed(adapter: &MediaAdapter, data: &[u8]) -> String {
    let payload: dog_media::ByteStream = Box::pin(futures::stream::iter(
        data.chunks(100)
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect::<Vec<std::io::Result<bytes::Bytes>>>(),
    ));
    adapter.ingest("clip.mp4", Some(payload)).await.unwrap().id.to_string()
}

fn get(uri: &str, range: Option<&str>) -> Request<Body> {
    let mut req = Request::builder().method("GET").uri(uri);
    if let Some(range) = range {
        req = req.header("range", range);
    }
    req.body(Body::empty()).unwrap()
}

fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: video/mp4\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes()),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(res: axum::response::Response) -> Vec<u8> {
    res.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn json_body(res: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(res).await).unwrap()
}

fn header<'a>(res: &'a axum::response::Response, name: &str) -> Option<&'a str> {
    res.headers().get(name).map(|v| v.to_str().unwrap())
}

#[tokio::test]
async fn range_request_returns_partial_content() {
    let (ax, adapter) = app();
    let data = pattern(1000);
    let id = seed(&adapter, &data).await;

    let res = ax.router.oneshot(get(&format!("/video/{id}"), Some("bytes=0-499"))).await.unwrap();

    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&res, "content-range"), Some("bytes 0-499/1000"));
    assert_eq!(header(&res, "content-length"), Some("500"));
    assert_eq!(header(&res, "accept-ranges"), Some("bytes"));
    assert_eq!(header(&res, "content-type"), Some("video/mp4"));
    assert_eq!(body_bytes(res).await, &data[..500]);
}

#[tokio::test]
async fn open_ended_range_runs_to_last_byte() {
    let (ax, adapter) = app();
    let data = pattern(1000);
    let id = seed(&adapter, &data).await;

    let res = ax.router.oneshot(get(&format!("/video/{id}"), Some("bytes=500-"))).await.unwrap();

    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&res, "content-range"), Some("bytes 500-999/1000"));
    assert_eq!(header(&res, "content-length"), Some("500"));
    assert_eq!(body_bytes(res).await, &data[500..]);
}

#[tokio::test]
async fn unsatisfiable_range_is_416_with_size() {
    let (ax, adapter) = app();
    let id = seed(&adapter, &pattern(1000)).await;

    let res = ax.router.oneshot(get(&format!("/video/{id}"), Some("bytes=2000-2500"))).await.unwrap();

    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&res, "content-range"), Some("bytes */1000"));
    assert!(body_bytes(res).await.is_empty());
}

#[tokio::test]
async fn malformed_range_is_416() {
    let (ax, adapter) = app();
    let id = seed(&adapter, &pattern(10)).await;

    let res = ax.router.oneshot(get(&format!("/video/{id}"), Some("items=0-4"))).await.unwrap();

    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&res, "content-range"), Some("bytes */10"));
}

#[tokio::test]
async fn missing_range_serves_whole_object() {
    let (ax, adapter) = app();
    let data = pattern(1000);
    let id = seed(&adapter, &data).await;

    let res = ax.router.oneshot(get(&format!("/video/{id}"), None)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, "content-length"), Some("1000"));
    assert!(res.headers().get("content-range").is_none());
    assert_eq!(body_bytes(res).await, data);
}

#[tokio::test]
async fn missing_range_is_416_in_strict_mode() {
    let (ax, adapter) = app_with(MediaConfig::default().require_range());
    let id = seed(&adapter, &pattern(1000)).await;

    let res = ax.router.oneshot(get(&format!("/video/{id}"), None)).await.unwrap();

    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn unknown_id_is_404_feathers_shape() {
    let (ax, _adapter) = app();

    let res = ax
        .router
        .oneshot(get("/video/6d3c1e1a-8a3b-4b7e-9d4e-1f2a3b4c5d6e", Some("bytes=0-1")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotFound");
    assert_eq!(body["code"], 404);
    assert_eq!(body["className"], "not-found");
}

#[tokio::test]
async fn malformed_id_is_400() {
    let (ax, _adapter) = app();

    let res = ax.router.oneshot(get("/video/not-an-id", None)).await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadRequest");
    assert_eq!(body["className"], "bad-request");
}

#[tokio::test]
async fn requests_before_store_is_ready_get_503() {
    let gate = StoreGate::new();
    let ax = MediaApp::new(MediaAxumState::new(gate.clone()));

    let res = ax.router.clone().oneshot(get("/videos", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(res).await["name"], "Unavailable");

    gate.open(MediaAdapter::new(MediaBackend::new(MemoryChunkStore::new()), MediaConfig::default()))
        .unwrap();
    let res = ax.router.oneshot(get("/videos", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn upload_returns_201_and_is_listed() {
    let (ax, _adapter) = app();
    let data = pattern(300);
    let body = multipart_body(&[("title", None, &b"holiday"[..]), ("file", Some("holiday.mp4"), &data[..])]);

    let res = ax.router.clone().oneshot(upload(body)).await.unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let created = json_body(res).await;
    assert_eq!(created["filename"], "holiday.mp4");
    let id = created["fileId"].as_str().unwrap().to_string();

    let res = ax.router.clone().oneshot(get("/videos", None)).await.unwrap();
    let listed = json_body(res).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["length"], 300);
    assert_eq!(listed[0]["filename"], "holiday.mp4");

    let res = ax.router.oneshot(get(&format!("/video/{id}"), None)).await.unwrap();
    assert_eq!(body_bytes(res).await, data);
}

#[tokio::test]
async fn empty_upload_is_400_and_not_listed() {
    let (ax, _adapter) = app();
    let body = multipart_body(&[("file", Some("empty.mp4"), &b""[..])]);

    let res = ax.router.clone().oneshot(upload(body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = ax.router.oneshot(get("/videos", None)).await.unwrap();
    assert_eq!(json_body(res).await, serde_json::json!([]));
}

#[tokio::test]
async fn upload_without_file_field_is_400() {
    let (ax, _adapter) = app();
    let body = multipart_body(&[("title", None, &b"no file here"[..])]);

    let res = ax.router.oneshot(upload(body)).await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_multipart_upload_is_400() {
    let (ax, _adapter) = app();
    let req = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let res = ax.router.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let (ax, _adapter) = app_with(MediaConfig::default().with_max_object_bytes(100));
    let data = pattern(500);
    let body = multipart_body(&[("file", Some("big.mp4"), &data[..])]);

    let res = ax.router.oneshot(upload(body)).await.unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json_body(res).await["className"], "payload-too-large");
}

#[tokio::test]
async fn health_answers_ok() {
    let (ax, _adapter) = app();

    let res = ax.router.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_bytes(res).await, b"ok");
}

#[tokio::test]
async fn request_id_is_generated() {
    let (ax, _adapter) = app();

    let res = ax.router.oneshot(get("/health", None)).await.unwrap();

    assert!(res.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let (ax, _adapter) = app();
    let provided = HeaderValue::from_static("req-test-123");
    let req = Request::builder()
        .method("GET")
        .uri("/videos")
        .header("x-request-id", provided.clone())
        .body(Body::empty())
        .unwrap();

    let res = ax.router.oneshot(req).await.unwrap();

    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}
