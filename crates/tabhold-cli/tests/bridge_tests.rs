//! Bridge protocol over in-memory pipes

use serde_json::{json, Value};
use tabhold_cli::serve;
use tabhold_core::{ArbiterConfig, DEFAULT_HOST_EXTENSION_ID};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;

struct Bridge {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    server: JoinHandle<tabhold_cli::Result<()>>,
}

impl Bridge {
    fn start(settings: Option<Value>) -> Self {
        let (input, server_input) = tokio::io::duplex(64 * 1024);
        let (server_output, output) = tokio::io::duplex(64 * 1024);
        let settings = settings.and_then(|v| v.as_object().cloned());
        let server = tokio::spawn(serve(
            ArbiterConfig::testing(),
            settings,
            BufReader::new(server_input),
            server_output,
        ));
        Self {
            input,
            output: BufReader::new(output).lines(),
            server,
        }
    }

    async fn send(&mut self, line: Value) {
        let mut text = line.to_string();
        text.push('\n');
        self.input.write_all(text.as_bytes()).await.unwrap();
    }

    async fn message(&mut self, id: u64, message: Value) {
        self.send(json!({
            "kind": "message",
            "id": id,
            "sender": DEFAULT_HOST_EXTENSION_ID,
            "message": message,
        }))
        .await;
    }

    async fn next(&mut self) -> Value {
        let line = self.output.next_line().await.unwrap().expect("output line");
        serde_json::from_str(&line).unwrap()
    }

    /// Read `count` lines, in whatever order they were written
    async fn take(&mut self, count: usize) -> Vec<Value> {
        let mut lines = Vec::with_capacity(count);
        for _ in 0..count {
            lines.push(self.next().await);
        }
        lines
    }

    async fn finish(mut self) -> Vec<Value> {
        drop(self.input);
        self.server.await.unwrap().unwrap();
        let mut rest = Vec::new();
        while let Some(line) = self.output.next_line().await.unwrap() {
            rest.push(serde_json::from_str(&line).unwrap());
        }
        rest
    }
}

fn reply(id: u64, value: bool) -> Value {
    json!({ "kind": "reply", "id": id, "value": value })
}

fn request_kind(line: &Value) -> Option<&str> {
    line.get("message")?.get("type")?.as_str()
}

fn press(tab: i64) -> Value {
    json!({ "type": "tab-mousedown", "button": 0, "tab": { "id": tab }, "windowId": 1 })
}

fn release(tab: i64) -> Value {
    json!({ "type": "tab-mouseup", "button": 0, "tab": { "id": tab } })
}

#[tokio::test(start_paused = true)]
async fn registers_after_storage_loaded() {
    let mut bridge = Bridge::start(None);
    bridge
        .send(json!({ "kind": "storage-loaded", "values": { "detectCustomDrag": false } }))
        .await;

    let lines = bridge.take(2).await;
    assert_eq!(request_kind(&lines[0]), Some("unregister-self"));
    assert_eq!(request_kind(&lines[1]), Some("register-self"));
    assert_eq!(
        lines[1]["message"]["listeningTypes"],
        json!(["ready", "tab-mousedown", "tab-mouseup", "native-tab-dragstart"])
    );

    assert!(bridge.finish().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn answers_host_messages() {
    let mut bridge = Bridge::start(Some(json!({})));
    bridge.take(2).await;

    bridge.message(1, press(1)).await;
    bridge.message(2, release(2)).await;
    // "prevent" for the release at once, for the press after the grace period
    assert_eq!(bridge.next().await, reply(2, true));
    assert_eq!(bridge.next().await, reply(1, true));

    bridge.message(3, json!({ "type": "ready" })).await;
    let lines = bridge.take(3).await;
    assert!(lines.contains(&reply(3, true)));
    assert_eq!(
        lines.iter().filter_map(request_kind).collect::<Vec<_>>(),
        vec!["unregister-self", "register-self"]
    );

    bridge.finish().await;
}

#[tokio::test(start_paused = true)]
async fn ignores_foreign_senders_and_bad_lines() {
    let mut bridge = Bridge::start(Some(json!({})));
    bridge.take(2).await;

    bridge
        .send(json!({ "kind": "message", "id": 1, "sender": "other@example", "message": press(1) }))
        .await;
    bridge.input.write_all(b"garbage\n").await.unwrap();
    bridge.message(2, json!({ "type": "tab-dblclicked" })).await;

    assert_eq!(bridge.next().await, reply(2, false));
    assert!(bridge.finish().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn skips_lines_that_are_not_utf8() {
    let mut bridge = Bridge::start(Some(json!({})));
    bridge.take(2).await;

    bridge.message(1, press(1)).await;
    bridge.input.write_all(b"\xff\xfe garbage\n").await.unwrap();
    bridge.message(2, json!({ "type": "tab-dblclicked" })).await;
    assert_eq!(bridge.next().await, reply(2, false));

    // The press is still pending and gets its reply when the input ends
    assert_eq!(bridge.finish().await, vec![reply(1, false)]);
}

#[tokio::test(start_paused = true)]
async fn end_of_input_releases_pending_press() {
    let mut bridge = Bridge::start(Some(json!({})));
    bridge.take(2).await;

    bridge.message(1, press(1)).await;
    assert_eq!(bridge.finish().await, vec![reply(1, false)]);
}
