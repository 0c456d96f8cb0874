//! Purpose: End-to-end tests for the bookstore HTTP server and client.
//! Exports: None (integration test module).
//! Role: Validate CRUD, partial updates, and error mapping across TCP.
//! Invariants: Uses a loopback-only server with the in-memory backend.
//! Invariants: Bounded waits avoid test flakiness.
//! Invariants: Server processes are cleaned up on drop.

use bookstore::api::{Book, ErrorKind, RemoteClient};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

static SERVER_LOCK: Mutex<()> = Mutex::new(());

struct TestServer {
    child: Child,
    base_url: String,
    _server_guard: MutexGuard<'static, ()>,
}

impl TestServer {
    fn start() -> TestResult<Self> {
        let guard = SERVER_LOCK
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut last_err: Option<Box<dyn std::error::Error>> = None;
        for _attempt in 0..3 {
            let port = pick_port()?;
            let bind = format!("127.0.0.1:{port}");
            let mut child = Command::new(env!("CARGO_BIN_EXE_bookstored"))
                .arg("--bind")
                .arg(&bind)
                .arg("--backend")
                .arg("mem")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            let base_url = format!("http://{bind}");
            match wait_until_ready(&base_url, &mut child) {
                Ok(()) => {
                    return Ok(Self {
                        child,
                        base_url,
                        _server_guard: guard,
                    });
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| "server failed to start".into()))
    }

    fn client(&self) -> TestResult<RemoteClient> {
        Ok(RemoteClient::new(self.base_url.clone())?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn pick_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn wait_until_ready(base_url: &str, child: &mut Child) -> TestResult<()> {
    let client = RemoteClient::new(base_url.to_string())?;
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            return Err(format!("server exited early: {status}").into());
        }
        if client.health().is_ok() {
            return Ok(());
        }
        sleep(Duration::from_millis(25));
    }
    Err("server did not become ready in time".into())
}

fn sample(id: &str) -> Book {
    Book {
        id: id.to_string(),
        name: "The Go Programming Language".to_string(),
        authors: vec!["Donovan".to_string(), "Kernighan".to_string()],
        press: "Addison-Wesley".to_string(),
    }
}

#[test]
fn crud_round_trip_over_http() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;

    assert!(client.list_books()?.is_empty());

    let book = sample("1");
    client.create_book(&book)?;
    assert_eq!(client.get_book("1")?, book);

    let listed = client.list_books()?;
    assert_eq!(listed, vec![book]);

    client.delete_book("1")?;
    let err = client.get_book("1").expect_err("deleted book");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(client.list_books()?.is_empty());
    Ok(())
}

#[test]
fn partial_update_keeps_unset_fields() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;

    client.create_book(&Book {
        id: "1".to_string(),
        name: "A".to_string(),
        authors: vec!["x".to_string()],
        press: "P".to_string(),
    })?;

    client.update_book(
        "1",
        &Book {
            id: String::new(),
            name: String::new(),
            authors: Vec::new(),
            press: "Q".to_string(),
        },
    )?;

    let stored = client.get_book("1")?;
    assert_eq!(stored.name, "A");
    assert_eq!(stored.authors, vec!["x".to_string()]);
    assert_eq!(stored.press, "Q");
    Ok(())
}

#[test]
fn path_id_overrides_body_id() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;

    client.create_book(&sample("1"))?;

    let mut update = sample("999");
    update.press = "MIT Press".to_string();
    client.update_book("1", &update)?;

    assert_eq!(client.get_book("1")?.press, "MIT Press");
    let err = client.get_book("999").expect_err("no record under body id");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn duplicate_create_maps_to_conflict() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;

    client.create_book(&sample("1"))?;
    let err = client.create_book(&sample("1")).expect_err("duplicate");
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    Ok(())
}

#[test]
fn update_and_delete_of_missing_id_map_to_not_found() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;

    let err = client
        .update_book("nope", &sample("nope"))
        .expect_err("update missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = client.delete_book("nope").expect_err("delete missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[test]
fn create_with_empty_id_is_rejected() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;

    let err = client
        .create_book(&Book {
            id: String::new(),
            name: "No Id".to_string(),
            authors: Vec::new(),
            press: String::new(),
        })
        .expect_err("empty id");
    assert_eq!(err.kind(), ErrorKind::Usage);
    Ok(())
}

#[test]
fn malformed_json_is_bad_request() -> TestResult<()> {
    let server = TestServer::start()?;

    let response = ureq::post(&server.url("/book"))
        .set("Content-Type", "application/json")
        .send_string("{not json");
    match response {
        Err(ureq::Error::Status(status, _)) => assert_eq!(status, 400),
        other => panic!("expected 400 status, got {other:?}"),
    }
    Ok(())
}

#[test]
fn non_json_content_type_is_unsupported_media_type() -> TestResult<()> {
    let server = TestServer::start()?;

    let response = ureq::post(&server.url("/book"))
        .set("Content-Type", "text/plain")
        .send_string(r#"{"id":"1"}"#);
    match response {
        Err(ureq::Error::Status(status, _)) => assert_eq!(status, 415),
        other => panic!("expected 415 status, got {other:?}"),
    }
    Ok(())
}

#[test]
fn bodyless_requests_need_no_content_type() -> TestResult<()> {
    let server = TestServer::start()?;
    let client = server.client()?;

    client.create_book(&sample("1"))?;

    // Raw GET without a Content-Type header must pass the validation layer.
    let response = ureq::get(&server.url("/book/1")).call()?;
    assert_eq!(response.status(), 200);
    let fetched: Book = serde_json::from_str(&response.into_string()?)?;
    assert_eq!(fetched, sample("1"));
    Ok(())
}

#[test]
fn unknown_backend_exits_with_usage_code() -> TestResult<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_bookstored"))
        .arg("--bind")
        .arg("127.0.0.1:0")
        .arg("--backend")
        .arg("etcd")
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown storage backend"), "{stderr}");
    Ok(())
}
