use mockito::Matcher;
use reqwest::StatusCode;
use retry_engine::{Body, Part, ReqwestTransport, Request, Retry, RetryOptions};
use std::io::Cursor;
use std::net::TcpListener;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_retryable_status_is_resent_until_exhausted() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/unstable")
        .with_status(503)
        .with_body("busy")
        .expect(3)
        .create_async()
        .await;

    let options = RetryOptions::default().with_retry_statuses([StatusCode::SERVICE_UNAVAILABLE]);
    let retry = Retry::new(ReqwestTransport::new(), options);
    let response = retry
        .execute(Request::get(format!("{}/unstable", server.url())))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text(), "busy");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_retryable_status_is_sent_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/missing")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let options = RetryOptions::default().with_retry_statuses([StatusCode::SERVICE_UNAVAILABLE]);
    let retry = Retry::new(ReqwestTransport::new(), options);
    let response = retry
        .execute(Request::get(format!("{}/missing", server.url())))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_multipart_file_is_resent_in_full() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/upload")
        .match_body(Matcher::Regex("Test data".to_string()))
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let options = RetryOptions::default()
        .with_retry_statuses([StatusCode::INTERNAL_SERVER_ERROR])
        .with_retry_if(|_, _| true);
    let retry = Retry::new(ReqwestTransport::new(), options);

    let body = Body::Multipart(vec![
        Part::text("kind", "report"),
        Part::stream(
            "file",
            "report.txt",
            "text/plain",
            Cursor::new(b"Test data".to_vec()),
        ),
    ]);
    let response = retry
        .execute(Request::post(format!("{}/upload", server.url())).with_body(body))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retry_after_header_from_server_is_honoured() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/throttled")
        .with_status(429)
        .with_header("Retry-After", "1")
        .expect(2)
        .create_async()
        .await;

    let options = RetryOptions::default()
        .with_max(1)
        .with_retry_statuses([StatusCode::TOO_MANY_REQUESTS]);
    let retry = Retry::new(ReqwestTransport::new(), options);

    let started = Instant::now();
    let response = retry
        .execute(Request::get(format!("{}/throttled", server.url())))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(started.elapsed() >= Duration::from_secs(1));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused_is_retried_when_configured() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let retries = Arc::new(AtomicU32::new(0));
    let counter = retries.clone();
    let options = RetryOptions::default()
        .with_exception_names(["connection"])
        .with_retry_block(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let retry = Retry::new(ReqwestTransport::new(), options);

    let err = retry
        .execute(Request::get(format!("http://127.0.0.1:{}/down", port)))
        .await
        .unwrap_err();

    assert_eq!(retries.load(Ordering::SeqCst), 2);
    assert!(err
        .downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_connect()));
}
