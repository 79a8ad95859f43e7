//! End-to-end tests of the `mcpc` binary.
//!
//! The MCP side is the `mockmcp` binary; the chat API, where needed, is a
//! raw TCP server returning canned responses.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::{Command, Output, Stdio};

const MOCK: &str = env!("CARGO_BIN_EXE_mockmcp");

/// An `mcpc` command isolated from the user's config and credentials.
fn mcpc(config_dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mcpc"));
    cmd.env("MCPC_CONFIG_DIR", config_dir.path())
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL")
        .env_remove("MCPC_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Serve the given bodies, one per connection, then stop accepting.
fn fake_chat_api(bodies: Vec<String>) -> (String, std::thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = std::thread::spawn(move || {
        let mut requests = Vec::new();
        for body in bodies {
            let (mut socket, _) = listener.accept().unwrap();
            requests.push(read_request(&mut socket));
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).unwrap();
        }
        requests
    });

    (format!("http://{addr}/v1"), handle)
}

fn read_request(socket: &mut std::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[test]
fn members_prints_listing() {
    let dir = tempfile::tempdir().unwrap();
    let output = mcpc(&dir).args([MOCK, "--members"]).output().unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let expected = "\
MCP Server Members
==================================================

TOOLS (1):
------------------------------
 > echo - Echo the input back

PROMPTS: None available

RESOURCES: None available

==================================================
";
    assert_eq!(stdout(&output), expected);
}

#[test]
fn server_args_are_passed_through() {
    let dir = tempfile::tempdir().unwrap();
    let output = mcpc(&dir)
        .args([MOCK, "--members", "--", "--with-prompts"])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("PROMPTS (1):"), "{out}");
    assert!(out.contains(" > greet - Greet someone by name"));
}

#[test]
fn missing_script_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = mcpc(&dir)
        .args(["/definitely/not/here.py", "--members"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not found"), "{}", stderr(&output));
}

#[test]
fn failed_handshake_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = mcpc(&dir)
        .args([MOCK, "--members", "--", "--exit-immediately"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to connect"));
}

#[test]
fn chat_without_credential_fails_before_spawning() {
    let dir = tempfile::tempdir().unwrap();
    // A missing script would fail differently if the launch were attempted.
    let output = mcpc(&dir)
        .args(["/definitely/not/here.py", "--chat"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("OPENAI_API_KEY"), "{err}");
    assert!(!err.contains("not found"), "{err}");
}

#[test]
fn mode_is_required() {
    let dir = tempfile::tempdir().unwrap();
    let output = mcpc(&dir).arg(MOCK).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn help_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    let output = mcpc(&dir).arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("--members"));
}

#[test]
fn chat_quit_says_goodbye() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = mcpc(&dir);
    cmd.args([MOCK, "--chat"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", "http://127.0.0.1:9/v1");

    let output = run_with_stdin(cmd, "\n   \nQUIT\n");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("You: "));
    assert!(out.contains("Goodbye!"));
    assert!(!out.contains("Assistant:"));
}

#[test]
fn chat_end_of_input_says_goodbye() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = mcpc(&dir);
    cmd.args([MOCK, "--chat"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", "http://127.0.0.1:9/v1");

    let output = run_with_stdin(cmd, "");
    assert!(output.status.success());
    assert!(stdout(&output).contains("Goodbye!"));
}

#[test]
fn chat_api_failure_is_reported_and_loop_continues() {
    // Nothing listens on this port.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = mcpc(&dir);
    cmd.args([MOCK, "--chat"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", format!("http://127.0.0.1:{port}/v1"));

    let output = run_with_stdin(cmd, "hello\nexit\n");

    assert!(output.status.success());
    assert!(stderr(&output).contains("Error: "), "{}", stderr(&output));
    assert!(stdout(&output).contains("Goodbye!"));
}

#[test]
fn chat_runs_a_tool_round() {
    let tool_call = r#"{"choices":[{"message":{"role":"assistant","content":null,"tool_calls":[{"id":"call_1","type":"function","function":{"name":"echo","arguments":"{\"text\":\"ping\"}"}}]},"finish_reason":"tool_calls"}],"usage":{"prompt_tokens":20,"completion_tokens":5}}"#;
    let final_text = r#"{"choices":[{"message":{"role":"assistant","content":"The server said ping."},"finish_reason":"stop"}],"usage":{"prompt_tokens":30,"completion_tokens":6}}"#;
    let (base_url, server) = fake_chat_api(vec![tool_call.into(), final_text.into()]);

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = mcpc(&dir);
    cmd.args([MOCK, "--chat"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", &base_url);

    let output = run_with_stdin(cmd, "Echo ping please\nquit\n");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains(r#"[Used echo({"text":"ping"})]"#), "{out}");
    assert!(out.contains("Assistant: The server said ping."), "{out}");

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains(r#""name":"echo""#));
    // The second request carries the tool result back.
    assert!(requests[1].contains(r#""role":"tool""#));
    assert!(requests[1].contains(r#""tool_call_id":"call_1""#));
    assert!(requests[1].contains(r#""content":"ping""#));
}

#[test]
fn config_file_sets_model() {
    let body = r#"{"choices":[{"message":{"role":"assistant","content":"ok"},"finish_reason":"stop"}]}"#;
    let (base_url, server) = fake_chat_api(vec![body.into()]);

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[api]\nmodel = \"gpt-test-from-file\"\n",
    )
    .unwrap();

    let mut cmd = mcpc(&dir);
    cmd.args([MOCK, "--chat"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", &base_url);

    let output = run_with_stdin(cmd, "hi\nquit\n");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Assistant: ok"));

    let requests = server.join().unwrap();
    assert!(requests[0].contains(r#""model":"gpt-test-from-file""#));
}

#[test]
fn tool_call_loop_ends_the_turn_but_not_the_chat() {
    let tool_call = r#"{"choices":[{"message":{"role":"assistant","content":null,"tool_calls":[{"id":"call_1","type":"function","function":{"name":"echo","arguments":"{\"text\":\"again\"}"}}]},"finish_reason":"tool_calls"}],"usage":{"prompt_tokens":20,"completion_tokens":5}}"#;
    let final_text = r#"{"choices":[{"message":{"role":"assistant","content":"Back to normal."},"finish_reason":"stop"}],"usage":{"prompt_tokens":30,"completion_tokens":6}}"#;
    let (base_url, server) = fake_chat_api(vec![
        tool_call.into(),
        tool_call.into(),
        final_text.into(),
    ]);

    let dir = tempfile::tempdir().unwrap();
    let mut cmd = mcpc(&dir);
    cmd.args([MOCK, "--chat", "--max-tool-rounds", "1"])
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", &base_url);

    let output = run_with_stdin(cmd, "Loop forever\nAre you ok?\nquit\n");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let err = stderr(&output);
    assert!(
        err.contains("Error: Model kept requesting tools after 1 tool-call rounds"),
        "{err}"
    );
    let out = stdout(&output);
    assert_eq!(out.matches(r#"[Used echo({"text":"again"})]"#).count(), 1, "{out}");
    assert!(out.contains("Assistant: Back to normal."), "{out}");
    assert!(out.contains("Goodbye!"));

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests[2].contains("Are you ok?"));
}

#[cfg(target_os = "linux")]
#[test]
fn interrupt_closes_the_server_and_exits() {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("server.pid");
    let mut child = mcpc(&dir)
        .args([MOCK, "--chat", "--", "--pid-file"])
        .arg(&pid_file)
        .env("OPENAI_API_KEY", "sk-test")
        .env("OPENAI_BASE_URL", "http://127.0.0.1:9/v1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    // Held open so the REPL sits at the prompt.
    let _stdin = child.stdin.take().unwrap();

    let seen = Arc::new(Mutex::new(String::new()));
    let mut out = child.stdout.take().unwrap();
    let sink = Arc::clone(&seen);
    std::thread::spawn(move || {
        let mut chunk = [0u8; 1024];
        while let Ok(n) = out.read(&mut chunk) {
            if n == 0 {
                break;
            }
            sink.lock().unwrap().push_str(&String::from_utf8_lossy(&chunk[..n]));
        }
    });

    let deadline = Instant::now() + Duration::from_secs(10);
    while !seen.lock().unwrap().contains("You: ") {
        assert!(Instant::now() < deadline, "no prompt: {}", seen.lock().unwrap());
        std::thread::sleep(Duration::from_millis(50));
    }
    let server_pid = std::fs::read_to_string(&pid_file).unwrap();
    let server_proc = std::path::PathBuf::from(format!("/proc/{}", server_pid.trim()));
    assert!(server_proc.exists());

    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(10);
    let exit = loop {
        if let Some(exit) = child.try_wait().unwrap() {
            break exit;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("mcpc still running 10s after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    assert_eq!(exit.code(), Some(0));
    let mut err = String::new();
    child.stderr.take().unwrap().read_to_string(&mut err).unwrap();
    assert!(err.contains("Interrupted."), "{err}");
    assert!(!server_proc.exists(), "server still running after interrupt");
}
