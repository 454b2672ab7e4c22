#![cfg(all(unix, feature = "cli"))]

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use mbgate_server::GatewayClient;

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind should succeed");
    listener
        .local_addr()
        .expect("listener should have an address")
        .port()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/mbgate-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

struct Server {
    child: Option<Child>,
    target: String,
}

impl Server {
    fn start(regsize: &str, extra: &[&str]) -> Self {
        let port = free_port();
        let child = Command::new(env!("CARGO_BIN_EXE_mbgate"))
            .args(["--log-level", "error", "--format", "json", "serve"])
            .args(["--bind", "127.0.0.1", "--port", &port.to_string()])
            .args(extra)
            .arg(regsize)
            .env_remove("NOTIFY_SOCKET")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("serve should start");

        let target = format!("127.0.0.1:{port}");
        let server = Self {
            child: Some(child),
            target,
        };
        wait_for_gateway(&server.target, Duration::from_secs(5));
        server
    }

    /// Send SIGINT and collect the exit status and output.
    fn interrupt(mut self) -> Output {
        let mut child = self.child.take().expect("server should be running");
        let status = Command::new("kill")
            .arg("-INT")
            .arg(child.id().to_string())
            .status()
            .expect("kill should run");
        assert!(status.success());

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if child.try_wait().expect("try_wait should work").is_some() {
                break;
            }
            thread::sleep(Duration::from_millis(25));
        }
        let _ = child.kill();
        child
            .wait_with_output()
            .expect("serve output should be readable")
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn wait_for_gateway(target: &str, timeout: Duration) {
    let start = Instant::now();
    loop {
        if GatewayClient::connect(target, Duration::from_millis(200)).is_ok() {
            return;
        }
        if start.elapsed() >= timeout {
            panic!("gateway at {target} did not come up");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn mbgate(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mbgate"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("mbgate should run")
}

#[test]
fn write_then_read_through_cli() {
    let server = Server::start("10", &[]);

    let write = mbgate(&["write", &server.target, "--start", "3", "42"]);
    assert_eq!(write.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&write.stdout);
    assert!(stdout.contains("\"function\":\"WRITE_SINGLE_REGISTER\""));

    let write = mbgate(&["write", &server.target, "--start", "7", "1", "2", "3"]);
    assert_eq!(write.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&write.stdout).contains("WRITE_MULTIPLE_REGISTERS"));

    let read = mbgate(&["read", &server.target, "--start", "0", "--count", "10"]);
    assert_eq!(read.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&read.stdout);
    assert!(stdout.contains("\"values\":[0,0,0,42,0,0,0,1,2,3]"));
}

#[test]
fn exception_reply_exits_data_invalid() {
    let server = Server::start("10", &[]);

    let read = mbgate(&["read", &server.target, "--start", "5", "--count", "6"]);
    assert_eq!(read.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&read.stderr).contains("ILLEGAL_DATA_ADDRESS"));

    let read = mbgate(&["read", &server.target, "--start", "0", "--count", "126"]);
    assert_eq!(read.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&read.stderr).contains("ILLEGAL_DATA_VALUE"));
}

#[test]
fn clients_share_register_state() {
    let server = Server::start("4", &[]);

    let mut first = GatewayClient::connect(&server.target, Duration::from_secs(2)).unwrap();
    let mut second = GatewayClient::connect(&server.target, Duration::from_secs(2)).unwrap();

    first.write_multiple_registers(0, &[9, 8, 7, 6]).unwrap();
    assert_eq!(second.read_holding_registers(0, 4).unwrap(), vec![9, 8, 7, 6]);
    second.write_single_register(3, 1).unwrap();
    assert_eq!(first.read_holding_registers(3, 1).unwrap(), vec![1]);
}

#[test]
fn interrupt_shuts_down_cleanly() {
    let server = Server::start("10", &[]);

    let mut client = GatewayClient::connect(&server.target, Duration::from_secs(2)).unwrap();
    client.write_single_register(0, 5).unwrap();

    let output = server.interrupt();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"requests\":1"), "stdout: {stdout}");
}

#[test]
fn invalid_register_count_fails_before_listening() {
    let port = free_port().to_string();
    let output = mbgate(&["serve", "--bind", "127.0.0.1", "-p", &port, "0"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("register store size"));
}

#[test]
fn port_in_use_is_startup_failure() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port().to_string();

    let output = mbgate(&["serve", "--bind", "127.0.0.1", "-p", &port, "10"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(&format!("failed to bind to 127.0.0.1:{port}"))
            || stderr.contains(&format!("failed to listen on 127.0.0.1:{port}")),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn daemon_mode_reports_readiness() {
    use std::os::unix::net::UnixDatagram;

    let dir = unique_temp_dir("notify");
    let sock_path = dir.join("notify.sock");
    let receiver = UnixDatagram::bind(&sock_path).expect("notify socket should bind");
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let server = Server::start(
        "10",
        &["--daemon", "--notify-socket", sock_path.to_str().unwrap()],
    );

    let mut buf = [0u8; 256];
    let n = receiver.recv(&mut buf).expect("readiness datagram expected");
    assert_eq!(
        std::str::from_utf8(&buf[..n]).unwrap(),
        mbgate_transport::READY_STATE
    );

    drop(server);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn read_against_closed_port_fails() {
    let port = free_port();
    let output = mbgate(&[
        "read",
        &format!("127.0.0.1:{port}"),
        "--start",
        "0",
        "--timeout",
        "1s",
    ]);
    assert_eq!(output.status.code(), Some(1));
}
