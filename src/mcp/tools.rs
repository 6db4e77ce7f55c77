use jsonschema::JSONSchema;
use serde_json::{json, Value};

use super::types::{McpTool, McpToolCall, ToolListResponse};
use crate::cli::Args;
use crate::error::{McpError, Result};

/// Parse `--tool-args`. Absent means an empty object; anything that is not a
/// JSON object is rejected.
pub fn parse_tool_args(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(json!({}));
    };

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| McpError::Args(format!("--tool-args is not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(McpError::Args(format!(
            "--tool-args must be a JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(value)
}

/// Build and validate the `tools/call` payload from the command line.
pub fn build_tool_call(args: &Args) -> Result<McpToolCall> {
    let name = args
        .tool_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| McpError::Args("--tool-name is required for --action call".to_string()))?;

    let arguments = parse_tool_args(args.tool_args.as_deref())?;
    validate_tool_arguments(name, &arguments)?;

    Ok(McpToolCall {
        name: name.to_string(),
        arguments,
    })
}

/// Input schema for the tools whose argument shape is known up front.
pub fn builtin_schema(tool_name: &str) -> Option<Value> {
    let schema = match tool_name {
        "search_data" => json!({
            "type": "object",
            "required": ["search_terms", "user_query"],
            "properties": {
                "search_terms": {"type": "array", "items": {"type": "string"}},
                "user_query": {"type": "string"}
            }
        }),
        "get_insights" => json!({
            "type": "object",
            "required": ["kpi", "field_ids"],
            "properties": {
                "kpi": {"type": "string"},
                "field_ids": {"type": "array", "items": {"type": "string"}}
            },
            "patternProperties": {
                "_filters$": {"type": ["array", "object", "string"]}
            }
        }),
        "load_data" => json!({
            "type": "object",
            "required": ["columns"],
            "properties": {
                "columns": {"type": "array", "items": {"type": "string"}},
                "page": {"type": "integer", "minimum": 0},
                "page_size": {"type": "integer", "minimum": 1},
                "order_by": {"type": "string"},
                "ascending": {"type": "boolean"},
                "limit": {"type": "integer", "minimum": 0},
                "applied_filters": {"type": ["array", "object"]}
            }
        }),
        _ => return None,
    };
    Some(schema)
}

/// Check arguments against the tool's known schema. Tools without a
/// built-in schema only need an object, which `parse_tool_args` already
/// guarantees.
pub fn validate_tool_arguments(tool_name: &str, arguments: &Value) -> Result<()> {
    let Some(schema) = builtin_schema(tool_name) else {
        tracing::debug!(tool = tool_name, "no local schema, passing arguments through");
        return Ok(());
    };

    validate_against(&schema, arguments).map_err(|errors| {
        McpError::Args(format!(
            "Tool '{}' argument validation failed: {}",
            tool_name, errors
        ))
    })
}

fn validate_against(schema: &Value, arguments: &Value) -> std::result::Result<(), String> {
    let compiled =
        JSONSchema::compile(schema).map_err(|e| format!("Invalid tool schema: {}", e))?;

    if let Err(errors) = compiled.validate(arguments) {
        let messages: Vec<String> = errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();
        return Err(messages.join("; "));
    }
    Ok(())
}

/// Names from a `tools/list` result, if it has the expected shape.
pub fn tool_names(result: &Value) -> Vec<String> {
    serde_json::from_value::<ToolListResponse>(result.clone())
        .map(|list| list.tools.into_iter().map(|t: McpTool| t.name).collect())
        .unwrap_or_default()
}

/// One line per tool: name and the first line of its description.
pub fn summarize_tools(result: &Value) -> Vec<String> {
    let Ok(list) = serde_json::from_value::<ToolListResponse>(result.clone()) else {
        return Vec::new();
    };
    list.tools
        .iter()
        .map(|tool| {
            let description = tool
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .unwrap_or("")
                .trim();
            if description.is_empty() {
                tool.name.clone()
            } else {
                format!("{} - {}", tool.name, description)
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
