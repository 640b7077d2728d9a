use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use apilytics::{
    Client, ClientOptions, Integration, MetricsRecord, RawFields, Transport, TransportFactory,
};

fn record(path: &str) -> MetricsRecord {
    MetricsRecord::build(RawFields {
        path,
        method: "GET",
        status_code: Some(200),
        time_millis: 42,
        ..Default::default()
    })
}

/// A collector that accepts a single request and hands back its head and body.
fn spawn_collector(status: u16) -> (String, mpsc::Receiver<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api/v1/middleware", listener.local_addr().unwrap());
    let (sender, receiver) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            let lower = line.to_ascii_lowercase();
            if let Some(value) = lower.strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
            head.push_str(&lower);
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();
        let response = format!(
            "HTTP/1.1 {} Whatever\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            status
        );
        reader.get_mut().write_all(response.as_bytes()).unwrap();
        sender
            .send((head, String::from_utf8(body).unwrap()))
            .unwrap();
    });

    (url, receiver)
}

#[test]
fn test_api_key_from_environment() {
    std::env::remove_var(apilytics::API_KEY_VAR);
    let apilytics = apilytics::init(());
    assert!(!apilytics.is_enabled());
    // a disabled client silently ignores metrics
    apilytics.send_metrics(record("/"), &Integration::core());
    assert!(apilytics.flush(Some(Duration::from_millis(10))));
    drop(apilytics);

    std::env::set_var(apilytics::API_KEY_VAR, "env-api-key");
    let opts = apilytics::apply_defaults(ClientOptions::default());
    assert_eq!(opts.api_key.as_ref().map(|key| key.as_str()), Some("env-api-key"));
    let opts = apilytics::apply_defaults(ClientOptions::from("explicit-key"));
    assert_eq!(opts.api_key.as_ref().map(|key| key.as_str()), Some("explicit-key"));

    std::env::set_var(apilytics::API_KEY_VAR, "");
    assert!(apilytics::apply_defaults(ClientOptions::default())
        .api_key
        .is_none());
    std::env::remove_var(apilytics::API_KEY_VAR);
}

#[test]
fn test_init_with_api_key_is_enabled() {
    let apilytics = apilytics::init(("my-api-key", ClientOptions::default()));
    assert!(apilytics.is_enabled());
    assert_eq!(apilytics.api_key().unwrap().as_str(), "my-api-key");
    assert!(apilytics.options().transport.is_some());
}

#[test]
fn test_captured_reports() {
    let reports = apilytics::test::with_captured_reports(|client| {
        client.send_metrics(record("/foo/bar/123"), &Integration::core());
    });
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].api_key.as_str(), "test-api-key");
    assert_eq!(
        reports[0].body(),
        br#"{"path":"/foo/bar/123","method":"GET","statusCode":200,"timeMillis":42}"#
    );
}

#[cfg(any(feature = "reqwest", feature = "ureq"))]
fn assert_posts_to_collector<F: TransportFactory + 'static>(factory: F) {
    let (url, receiver) = spawn_collector(200);
    let client = Client::with_options(ClientOptions {
        api_key: Some("secret-key".parse().unwrap()),
        collector_url: url.parse().unwrap(),
        transport: Some(Arc::new(factory)),
        ..Default::default()
    });
    assert!(client.is_enabled());

    client.send_metrics(
        record("/foo/bar/123"),
        &Integration::new("apilytics-rust-test").with_library("testlib/1.0"),
    );

    let (head, body) = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(head.starts_with("post /api/v1/middleware http/1.1"));
    assert!(head.contains("content-type: application/json"));
    assert!(head.contains("x-api-key: secret-key"));
    let version = format!(
        "apilytics-version: apilytics-rust-test/{};",
        apilytics::VERSION
    );
    assert!(head.contains(&version));
    assert!(head.contains(";testlib/1.0"));
    assert_eq!(
        body,
        r#"{"path":"/foo/bar/123","method":"GET","statusCode":200,"timeMillis":42}"#
    );
    assert!(head.contains(&format!("content-length: {}", body.len())));

    assert!(client.close(Some(Duration::from_secs(2))));
}

#[cfg(feature = "reqwest")]
#[test]
fn test_reqwest_transport_posts_to_collector() {
    assert_posts_to_collector(|options: &ClientOptions| -> Arc<dyn Transport> {
        Arc::new(apilytics::transports::ReqwestHttpTransport::new(options))
    });
}

#[cfg(feature = "ureq")]
#[test]
fn test_ureq_transport_posts_to_collector() {
    assert_posts_to_collector(|options: &ClientOptions| -> Arc<dyn Transport> {
        Arc::new(apilytics::transports::UreqHttpTransport::new(options))
    });
}

#[cfg(any(feature = "reqwest", feature = "ureq"))]
#[test]
fn test_guard_drop_is_bounded_by_shutdown_timeout() {
    // accepts connections but never answers
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    thread::spawn(move || {
        let mut open = Vec::new();
        for stream in listener.incoming() {
            open.push(stream);
        }
    });

    let apilytics = apilytics::init((
        "secret-key",
        ClientOptions {
            collector_url: url.parse().unwrap(),
            shutdown_timeout: Duration::from_millis(500),
            ..Default::default()
        },
    ));
    assert!(apilytics.is_enabled());
    apilytics.send_metrics(record("/"), &Integration::core());
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    drop(apilytics);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[cfg(feature = "reqwest")]
#[test]
fn test_unreachable_collector_never_blocks() {
    let client = Client::with_options(ClientOptions {
        api_key: Some("secret-key".parse().unwrap()),
        // nothing listens on the discard port
        collector_url: "http://127.0.0.1:9/".parse().unwrap(),
        transport: Some(Arc::new(apilytics::transports::DefaultTransportFactory)),
        timeout: Duration::from_millis(500),
        ..Default::default()
    });

    let started = Instant::now();
    // more than fits into the queue; the surplus is dropped
    for _ in 0..200 {
        client.send_metrics(record("/"), &Integration::core());
    }
    assert!(started.elapsed() < Duration::from_secs(1));

    client.close(Some(Duration::from_secs(2)));
}

#[cfg(feature = "reqwest")]
#[test]
fn test_collector_error_status_is_swallowed() {
    let (url, receiver) = spawn_collector(500);
    let client = Client::with_options(ClientOptions {
        api_key: Some("secret-key".parse().unwrap()),
        collector_url: url.parse().unwrap(),
        transport: Some(Arc::new(apilytics::transports::DefaultTransportFactory)),
        debug: true,
        ..Default::default()
    });

    client.send_metrics(record("/"), &Integration::core());
    receiver.recv_timeout(Duration::from_secs(10)).unwrap();
    // the worker keeps going after a failed delivery
    assert!(client.flush(Some(Duration::from_secs(5))));
}
