//! End-to-end behaviour over a real TCP listener
#![cfg(unix)]

mod common;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

use common::{echo_worker, fast_config, stalled_worker, temp_dir, tools_worker};
use switchboard::infrastructure::worker::{MockReply, MockWorkerRunner};
use switchboard::{
    GatewayServer, RequestDispatcher, RouteTable, StdioWorkerRunner, WorkerRunner,
};

const READ_BUDGET: Duration = Duration::from_secs(10);

async fn start_gateway(routes: RouteTable, runner: Arc<dyn WorkerRunner>) -> SocketAddr {
    let dispatcher = RequestDispatcher::new(Arc::new(routes), runner, "2024-11-05");
    let server = GatewayServer::bind("127.0.0.1:0", dispatcher).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let (read_half, writer) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    async fn recv_line(&mut self) -> String {
        timeout(READ_BUDGET, self.lines.next_line())
            .await
            .expect("timed out waiting for a reply")
            .unwrap()
            .expect("connection closed")
    }

    async fn recv(&mut self) -> Value {
        serde_json::from_str(&self.recv_line().await).unwrap()
    }
}

#[tokio::test]
async fn test_ping_is_answered_exactly() {
    let addr = start_gateway(RouteTable::default(), Arc::new(MockWorkerRunner::new())).await;
    let mut client = Client::connect(addr).await;

    client.send(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;

    assert_eq!(client.recv_line().await, r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
}

#[tokio::test]
async fn test_malformed_input_keeps_connection_open() {
    let addr = start_gateway(RouteTable::default(), Arc::new(MockWorkerRunner::new())).await;
    let mut client = Client::connect(addr).await;

    client.send("{this is not json").await;
    let error = client.recv().await;
    assert_eq!(error["id"], Value::Null);
    assert_eq!(error["error"]["code"], -32700);

    client.send(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#).await;
    let pong = client.recv().await;
    assert_eq!(pong["id"], 2);
    assert_eq!(pong["result"], json!({}));
}

#[tokio::test]
async fn test_blank_lines_and_notifications_get_no_reply() {
    let addr = start_gateway(RouteTable::default(), Arc::new(MockWorkerRunner::new())).await;
    let mut client = Client::connect(addr).await;

    client.send("").await;
    client.send("   ").await;
    client
        .send(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;
    client.send(r#"{"jsonrpc":"2.0","id":"last","method":"ping"}"#).await;

    let reply = client.recv().await;
    assert_eq!(reply["id"], "last");
}

#[tokio::test]
async fn test_initialize_is_answered_locally() {
    let runner = Arc::new(MockWorkerRunner::new());
    let addr = start_gateway(RouteTable::default(), runner.clone()).await;
    let mut client = Client::connect(addr).await;

    client
        .send(r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2024-11-05"}}"#)
        .await;

    let reply = client.recv().await;
    assert_eq!(reply["id"], 0);
    assert_eq!(reply["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(reply["result"]["capabilities"], json!({ "tools": {} }));
    assert_eq!(reply["result"]["serverInfo"]["name"], "switchboard");
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let runner = Arc::new(MockWorkerRunner::new());
    let routes = RouteTable::new([("echo", "/opt/workers/echo_server")]).unwrap();
    let addr = start_gateway(routes, runner.clone()).await;
    let mut client = Client::connect(addr).await;

    client
        .send(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"missing_tool"}}"#)
        .await;

    let reply = client.recv().await;
    assert_eq!(reply["id"], 2);
    assert_eq!(reply["error"]["code"], -32601);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_slow_call_does_not_block_later_messages() {
    let runner = Arc::new(MockWorkerRunner::new().with_delayed_reply(
        "/opt/workers/slow_server",
        MockReply::EchoId(json!({ "content": [] })),
        Duration::from_millis(500),
    ));
    let routes = RouteTable::new([("slow", "/opt/workers/slow_server")]).unwrap();
    let addr = start_gateway(routes, runner).await;
    let mut client = Client::connect(addr).await;

    client
        .send(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"slow"}}"#)
        .await;
    client.send(r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#).await;

    let first = client.recv().await;
    let second = client.recv().await;
    assert_eq!(first["id"], 2, "ping should overtake the slow call");
    assert_eq!(second["id"], 1);
}

#[tokio::test]
async fn test_reply_after_client_half_close() {
    let addr = start_gateway(RouteTable::default(), Arc::new(MockWorkerRunner::new())).await;
    let mut client = Client::connect(addr).await;

    client.send(r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#).await;
    client.writer.shutdown().await.unwrap();

    let reply = client.recv().await;
    assert_eq!(reply["id"], 9);
}

#[tokio::test]
async fn test_tool_call_round_trip_through_real_worker() {
    let dir = temp_dir();
    let worker = echo_worker(dir.path());
    let routes = RouteTable::new([("echo", worker)]).unwrap();
    let addr = start_gateway(routes, Arc::new(StdioWorkerRunner::new(fast_config()))).await;
    let mut client = Client::connect(addr).await;

    client
        .send(r#"{"jsonrpc":"2.0","id":"call-1","method":"tools/call","params":{"name":"echo","arguments":{}}}"#)
        .await;

    assert_eq!(
        client.recv_line().await,
        r#"{"jsonrpc":"2.0","id":"call-1","result":{"content":[{"type":"text","text":"ok"}]}}"#
    );
}

#[tokio::test]
async fn test_tools_list_survives_timed_out_worker() {
    let dir = temp_dir();
    let healthy = tools_worker(dir.path(), "todo_server", &["create_task", "list_tasks", "update_task"]);
    let stalled = stalled_worker(dir.path(), "stalled_server");
    let routes = RouteTable::new([
        ("create_task", healthy.clone()),
        ("list_tasks", healthy.clone()),
        ("update_task", healthy),
        ("hang", stalled),
    ])
    .unwrap();
    let config = switchboard::WorkerConfig {
        request_timeout_ms: 300,
        ..fast_config()
    };
    let addr = start_gateway(routes, Arc::new(StdioWorkerRunner::new(config))).await;
    let mut client = Client::connect(addr).await;

    client.send(r#"{"jsonrpc":"2.0","id":"x","method":"tools/list"}"#).await;

    let reply = client.recv().await;
    assert_eq!(reply["id"], "x");
    let tools = reply["result"]["tools"].as_array().expect("tools array");
    assert_eq!(tools.len(), 3);
    let names: Vec<_> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert_eq!(names, vec!["create_task", "list_tasks", "update_task"]);
}

#[tokio::test]
async fn test_tools_list_survives_invalid_worker_output() {
    let dir = temp_dir();
    let good = tools_worker(dir.path(), "echo_server", &["echo"]);
    let broken = common::script_worker(
        dir.path(),
        "broken_server",
        &format!("{}read -r request\necho 'this is not json'\n", common::HANDSHAKE),
    );
    let routes = RouteTable::new([
        ("echo", good),
        ("broken", broken),
    ])
    .unwrap();
    let addr = start_gateway(routes, Arc::new(StdioWorkerRunner::new(fast_config()))).await;
    let mut client = Client::connect(addr).await;

    client.send(r#"{"jsonrpc":"2.0","id":5,"method":"tools/list"}"#).await;

    let reply = client.recv().await;
    assert_eq!(reply["id"], 5);
    assert_eq!(reply["result"]["tools"][0]["name"], "echo");
    assert_eq!(reply["result"]["tools"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_missing_worker_executable_is_internal_error() {
    let routes = RouteTable::new([("ghost", PathBuf::from("/nonexistent/ghost_server"))]).unwrap();
    let addr = start_gateway(routes, Arc::new(StdioWorkerRunner::new(fast_config()))).await;
    let mut client = Client::connect(addr).await;

    client
        .send(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"ghost"}}"#)
        .await;

    let reply = client.recv().await;
    assert_eq!(reply["id"], 3);
    assert_eq!(reply["error"]["code"], -32603);
    assert_eq!(reply["error"]["message"], "Error executing tool 'ghost'");
    assert!(reply["error"]["data"]
        .as_str()
        .is_some_and(|d| d.contains("ghost_server")));
}
