//! Queued requests on an asynchronous client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use strand_http::{ClientConfig, ErrorKind, HttpClient, HttpError, HttpRequest};

#[tokio::test]
async fn test_submit_async_resolves() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/async")
        .with_body("from worker")
        .create_async()
        .await;

    let client = HttpClient::new(ClientConfig::asynchronous()).unwrap();
    let receiver = client
        .submit_async(HttpRequest::get(format!("{}/async", server.url())))
        .unwrap();
    let response = tokio::time::timeout(Duration::from_secs(10), receiver)
        .await
        .unwrap()
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.error(), ErrorKind::Ok);
    assert_eq!(response.body_text(), "from worker");
}

#[tokio::test]
async fn test_submit_async_reports_failures() {
    let client = HttpClient::new(ClientConfig::asynchronous()).unwrap();
    let response = client
        .submit_async(HttpRequest::get("definitely not a url"))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(response.error(), ErrorKind::UrlMalformed);
}

#[test]
fn test_callbacks_in_submission_order() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", mockito::Matcher::Regex("^/n/\\d+$".to_string()))
        .with_body("ok")
        .expect(10)
        .create();

    let client = HttpClient::new(ClientConfig::asynchronous()).unwrap();
    let (tx, rx) = mpsc::channel();
    for i in 0..10 {
        let tx = tx.clone();
        client
            .submit(HttpRequest::get(format!("{}/n/{}", server.url(), i)), move |response| {
                tx.send((i, response.status())).unwrap();
            })
            .unwrap();
    }

    let order: Vec<_> = (0..10)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
        .collect();
    mock.assert();
    assert_eq!(order.iter().map(|(i, _)| *i).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
    assert!(order.iter().all(|(_, status)| *status == 200));
}

#[test]
fn test_submit_on_sync_client() {
    let client = HttpClient::synchronous();
    let called = Arc::new(AtomicUsize::new(0));
    let seen = called.clone();
    let result = client.submit(HttpRequest::get("http://127.0.0.1:1/"), move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    assert!(matches!(result, Err(HttpError::NotAsync)));
    assert!(client.submit_async(HttpRequest::get("http://127.0.0.1:1/")).is_err());
    assert_eq!(called.load(Ordering::SeqCst), 0);
}

#[test]
fn test_submit_after_shutdown() {
    let mut client = HttpClient::new(ClientConfig::asynchronous()).unwrap();
    client.shutdown();
    let result = client.submit(HttpRequest::get("http://127.0.0.1:1/"), |_| {});
    assert!(matches!(result, Err(HttpError::ShuttingDown)));

    let response = client.get("http://127.0.0.1:1/");
    assert_eq!(response.error(), ErrorKind::CannotConnect);
}

#[test]
fn test_dropping_client_from_callback() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/").with_body("bye").create();

    let client = HttpClient::new(ClientConfig::asynchronous()).unwrap();
    let holder = Arc::new(parking_lot::Mutex::new(Some(client)));
    let in_callback = holder.clone();
    let (tx, rx) = mpsc::channel();

    let guard = holder.lock();
    let client = guard.as_ref().unwrap();
    client
        .submit(HttpRequest::get(format!("{}/", server.url())), move |response| {
            // Last handle released on the worker thread.
            let released = in_callback.lock().take();
            drop(released);
            tx.send(response.status()).unwrap();
        })
        .unwrap();
    drop(guard);

    assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), 200);
    assert!(holder.lock().is_none());
}
