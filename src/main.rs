// ==========================================
// 课堂考勤系统 - 命令行入口
// ==========================================
// 协议: stdin 每行一个 JSON 请求 {"id", "command", "params"}
//       stdout 每行一个 JSON 响应 {"id", "ok", "result" | "error"}
// ==========================================

use anyhow::Context;
use lecture_attendance::app::{dispatch, get_default_db_path, AppState};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    command: String,
    #[serde(default)]
    params: Value,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lecture_attendance::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", lecture_attendance::APP_NAME);
    tracing::info!("系统版本: {}", lecture_attendance::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path)
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("读取stdin失败")? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(req) => match dispatch(&state, &req.command, req.params).await {
                Ok(result) => json!({ "id": req.id, "ok": true, "result": embed(result) }),
                Err(error) => json!({ "id": req.id, "ok": false, "error": embed(error) }),
            },
            Err(e) => {
                tracing::warn!("请求解析失败: {}", e);
                json!({
                    "id": Value::Null,
                    "ok": false,
                    "error": { "code": "INVALID_REQUEST", "message": e.to_string(), "details": null }
                })
            }
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    tracing::info!("stdin已关闭，退出");
    Ok(())
}

/// 命令层返回的是 JSON 字符串，嵌入响应前还原为 JSON 值
fn embed(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}
