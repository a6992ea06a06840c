use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;

use crate::server::{FnToolHandler, Server};
use crate::types::{McpError, ToolResult, error_result, structured_result};

/// One instant rendered in a named timezone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZonedTime {
    pub timezone: String,
    pub datetime: String,
    pub date: String,
    pub time: String,
}

/// Render `now` in the IANA zone `timezone`.
pub fn format_in_zone(now: DateTime<Utc>, timezone: &str) -> Result<ZonedTime, String> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| format!("Invalid timezone '{}'", timezone))?;
    let local = now.with_timezone(&tz);

    Ok(ZonedTime {
        timezone: tz.name().to_string(),
        datetime: local.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        date: local.format("%Y-%m-%d").to_string(),
        time: local.format("%H:%M:%S").to_string(),
    })
}

pub fn register(srv: &mut Server) -> Result<(), McpError> {
    srv.handle_tool(
        "current-time",
        FnToolHandler::new(|args: Value| async move { handle_current_time(args, Utc::now()) }),
    )
}

fn handle_current_time(args: Value, now: DateTime<Utc>) -> Result<ToolResult, McpError> {
    let timezone = args.get("timezone").and_then(|v| v.as_str()).unwrap_or("");

    match format_in_zone(now, timezone) {
        Ok(zoned) => {
            let text = format!("Current time in {}: {}", zoned.timezone, zoned.datetime);
            Ok(structured_result(text, serde_json::to_value(&zoned)?))
        }
        Err(msg) => Ok(error_result(format!("Error: {}", msg))),
    }
}
