use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::server::Server;
use crate::types::{ERR_CODE_INVALID_REQ, ERR_CODE_PARSE, JsonRpcRequest, new_error_response};

/// Serve newline-delimited JSON-RPC on stdin/stdout until stdin closes.
///
/// Nothing but protocol messages may be written to stdout, so logging must
/// go to stderr while this runs.
pub async fn serve_stdio(server: Arc<Server>) -> std::io::Result<()> {
    tracing::info!("serving MCP over stdio");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = BufWriter::new(tokio::io::stdout());
    serve_lines(&server, stdin, stdout).await
}

/// Drive the request loop over any line-oriented reader and writer.
///
/// Lines are read as raw bytes, so input that is not UTF-8 is answered with
/// a parse error instead of ending the loop.
pub async fn serve_lines<R, W>(server: &Server, mut reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let Some(out) = handle_line(server, &buf).await? else {
            continue;
        };

        writer.write_all(&out).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}

/// Answer one line. `None` means the line was a notification.
async fn handle_line(server: &Server, line: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    let value = match serde_json::from_slice::<Value>(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable message");
            let resp = new_error_response(None, ERR_CODE_PARSE, format!("parse error: {}", e));
            return Ok(Some(serde_json::to_vec(&resp)?));
        }
    };

    let id = value.get("id").cloned();
    let req = match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(req) => req,
        Err(e) => {
            tracing::warn!(error = %e, "invalid request");
            let resp =
                new_error_response(id, ERR_CODE_INVALID_REQ, format!("invalid request: {}", e));
            return Ok(Some(serde_json::to_vec(&resp)?));
        }
    };

    let resp = server.handle(req).await;
    if resp.is_notification() {
        return Ok(None);
    }
    if let Some(err) = resp.rpc_error() {
        tracing::debug!(code = err.code, message = %err.message, "error response");
    }
    Ok(Some(serde_json::to_vec(&resp)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Deps, build_server, image::mock::MockImages};
    use serde_json::json;

    async fn run(input: impl AsRef<[u8]>) -> Vec<Value> {
        let deps = Arc::new(Deps {
            images: Arc::new(MockImages::default()),
        });
        let srv = build_server("stdio-test", "0.1", deps).unwrap();

        let mut output = Vec::new();
        serve_lines(&srv, input.as_ref(), &mut output).await.unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_request_sequence() {
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                   "params": {"name": "greeting", "arguments": {"name": "Kai", "language": "german"}}}),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");

        let replies = run(&input).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["result"]["content"][0]["text"], "Hallo, Kai!");
    }

    #[tokio::test]
    async fn test_parse_error_does_not_stop_loop() {
        let input = "{not json\n\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n";
        let replies = run(input).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error"]["code"], ERR_CODE_PARSE);
        assert_eq!(replies[1]["id"], 9);
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_parse_error() {
        let mut input = b"\xff\xfe\n".to_vec();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");

        let replies = run(input).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["error"]["code"], ERR_CODE_PARSE);
        assert!(replies[0]["id"].is_null());
        assert_eq!(replies[1]["id"], 3);
        assert!(replies[1]["result"].is_object());
    }

    #[tokio::test]
    async fn test_json_that_is_not_a_request_is_invalid_request() {
        let input = "[]\n{\"id\":1}\n{\"jsonrpc\":\"2.0\",\"id\":4,\"method\":\"ping\"}\n";
        let replies = run(input).await;
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["error"]["code"], ERR_CODE_INVALID_REQ);
        assert!(replies[0]["id"].is_null());
        assert_eq!(replies[1]["error"]["code"], ERR_CODE_INVALID_REQ);
        assert_eq!(replies[1]["id"], 1);
        assert_eq!(replies[2]["id"], 4);
    }

    #[tokio::test]
    async fn test_notification_with_id_is_answered() {
        let input = "{\"jsonrpc\":\"2.0\",\"id\":5,\"method\":\"notifications/initialized\"}\n";
        let replies = run(input).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 5);
        assert_eq!(replies[0]["error"]["code"], crate::types::ERR_CODE_NO_METHOD);
    }
}
