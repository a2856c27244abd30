//! Purpose: Execute lowered flow IR for the subset of statements handled natively.
//! Exports: `ExecConfig`, `IrExecutor`, `execute_ir`.
//! Role: Backend for `n3_exec_ir`; the host runtime falls back to its own executor on NOT_IMPLEMENTED.
//! Invariants: Only `Set`/`Return` statements and `Literal`/`StatePath` expressions run here.
//! Invariants: Unsupported constructs are `NotImplemented`, malformed IR is `Usage`.
//! Invariants: Output JSON keys are sorted; step ids are `step:NNNN` in execution order.
//! Invariants: State nesting stays within `MAX_STATE_DEPTH`, so no walk over it can exhaust the stack.
use crate::core::error::{Error, ErrorKind};
use crate::core::transform::Transform;
use serde_json::{Map, Value, json};

/// Longest `StatePath` accepted in a target or expression.
pub const MAX_STATE_PATH_SEGMENTS: usize = 64;
/// Deepest nesting the state may reach after any `Set`.
pub const MAX_STATE_DEPTH: usize = 256;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecConfig {
    pub flow_name: Option<String>,
    pub runtime_theme: Value,
    pub theme_source: Value,
}

impl ExecConfig {
    /// Parse the optional config document. Empty or whitespace-only input means defaults.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }
        let value = parse_json(bytes, "config")?;
        Ok(Self {
            flow_name: value
                .get("flow_name")
                .and_then(Value::as_str)
                .map(str::to_string),
            runtime_theme: value.get("runtime_theme").cloned().unwrap_or(Value::Null),
            theme_source: value.get("theme_source").cloned().unwrap_or(Value::Null),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct IrExecutor {
    config: ExecConfig,
}

impl IrExecutor {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }
}

impl Transform for IrExecutor {
    fn name(&self) -> &'static str {
        "exec_ir"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let output = execute_ir(input, &self.config)?;
        serde_json::to_vec(&output).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode execution result")
                .with_source(err)
        })
    }
}

pub fn execute_ir(ir: &[u8], config: &ExecConfig) -> Result<Value, Error> {
    let root = parse_json(ir, "ir")?;
    let flows = root
        .get("flows")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("ir.flows must be an array"))?;
    let flow = select_flow(flows, config.flow_name.as_deref())?;
    let flow_name = flow
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("flow.name must be a string"))?;
    let flow_line = flow.get("line").and_then(Value::as_i64);
    let flow_column = flow.get("column").and_then(Value::as_i64);
    let body = flow
        .get("body")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("flow.body must be an array"))?;

    let mut state = Map::new();
    let mut steps = StepLog::default();
    let mut last_value = Value::Null;
    steps.record(
        "flow_start",
        &format!("flow \"{flow_name}\" started"),
        None,
        flow_line,
        flow_column,
    );

    for stmt in body {
        let stmt_type = stmt
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("statement.type must be a string"))?;
        let line = stmt.get("line").and_then(Value::as_i64);
        let column = stmt.get("column").and_then(Value::as_i64);
        match stmt_type {
            "Set" => {
                let target = stmt
                    .get("target")
                    .ok_or_else(|| invalid("Set.target is required"))?;
                let path = state_path(target)?;
                let expr = stmt
                    .get("expression")
                    .ok_or_else(|| invalid("Set.expression is required"))?;
                let value = eval_expr(expr, &state)?;
                if path.len() + value_depth(&value) > MAX_STATE_DEPTH {
                    return Err(invalid(format!(
                        "set state.{} would nest state deeper than {MAX_STATE_DEPTH} levels",
                        path.join(".")
                    )));
                }
                set_state_path(&mut state, &path, value.clone())?;
                steps.record(
                    "statement_set",
                    &format!("set state.{}", path.join(".")),
                    None,
                    line,
                    column,
                );
                last_value = value;
            }
            "Return" => {
                let expr = stmt
                    .get("expression")
                    .ok_or_else(|| invalid("Return.expression is required"))?;
                last_value = eval_expr(expr, &state)?;
                steps.record("statement_return", "returned a value", None, line, column);
                break;
            }
            other => return Err(unsupported(format!("statement type {other}"))),
        }
    }

    steps.record(
        "flow_end",
        &format!("flow \"{flow_name}\" ended"),
        Some("completed successfully"),
        flow_line,
        flow_column,
    );

    Ok(json!({
        "execution_steps": steps.into_values(),
        "last_value": last_value,
        "runtime_theme": config.runtime_theme,
        "state": Value::Object(state),
        "theme_source": config.theme_source,
        "traces": [],
    }))
}

#[derive(Default)]
struct StepLog {
    steps: Vec<Value>,
}

impl StepLog {
    fn record(
        &mut self,
        kind: &str,
        what: &str,
        because: Option<&str>,
        line: Option<i64>,
        column: Option<i64>,
    ) {
        let id = format!("step:{:04}", self.steps.len() + 1);
        self.steps.push(json!({
            "because": because,
            "column": column,
            "data": {},
            "id": id,
            "kind": kind,
            "line": line,
            "what": what,
        }));
    }

    fn into_values(self) -> Vec<Value> {
        self.steps
    }
}

fn select_flow<'a>(flows: &'a [Value], name: Option<&str>) -> Result<&'a Value, Error> {
    match name {
        Some(name) => flows
            .iter()
            .find(|flow| flow.get("name").and_then(Value::as_str) == Some(name))
            .ok_or_else(|| invalid(format!("flow {name:?} not found"))),
        None => flows.first().ok_or_else(|| invalid("ir contains no flows")),
    }
}

fn eval_expr(expr: &Value, state: &Map<String, Value>) -> Result<Value, Error> {
    let expr_type = expr
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("expression.type must be a string"))?;
    match expr_type {
        "Literal" => expr
            .get("value")
            .cloned()
            .ok_or_else(|| invalid("Literal.value is required")),
        "StatePath" => {
            let path = state_path(expr)?;
            resolve_state_path(state, &path)
        }
        other => Err(unsupported(format!("expression type {other}"))),
    }
}

fn state_path(value: &Value) -> Result<Vec<String>, Error> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("path.type must be a string"))?;
    if kind != "StatePath" {
        return Err(unsupported(format!("assignment target {kind}")));
    }
    let segments = value
        .get("path")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("StatePath.path must be an array"))?;
    if segments.len() > MAX_STATE_PATH_SEGMENTS {
        return Err(invalid(format!(
            "StatePath.path has {} segments (limit {MAX_STATE_PATH_SEGMENTS})",
            segments.len()
        )));
    }
    segments
        .iter()
        .map(|segment| {
            segment
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid("StatePath.path segments must be strings"))
        })
        .collect()
}

/// An empty path resolves to the whole state object.
fn resolve_state_path(state: &Map<String, Value>, path: &[String]) -> Result<Value, Error> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(Value::Object(state.clone()));
    };
    let mut current = state
        .get(first)
        .ok_or_else(|| invalid(format!("state.{first} is not set")))?;
    for segment in rest {
        current = current
            .as_object()
            .and_then(|map| map.get(segment))
            .ok_or_else(|| invalid(format!("state path segment {segment:?} is not set")))?;
    }
    Ok(current.clone())
}

/// Scalar parents along the path are replaced by objects.
fn set_state_path(
    state: &mut Map<String, Value>,
    path: &[String],
    value: Value,
) -> Result<(), Error> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| invalid("Set.target path is empty"))?;
    let mut current = state;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(
                    Error::new(ErrorKind::Internal).with_message("state entry is not an object")
                );
            }
        };
    }
    current.insert(last.clone(), value);
    Ok(())
}

/// Container nesting of `value`; scalars count as one level.
fn value_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut pending = vec![(value, 1)];
    while let Some((value, depth)) = pending.pop() {
        deepest = deepest.max(depth);
        match value {
            Value::Array(items) => pending.extend(items.iter().map(|item| (item, depth + 1))),
            Value::Object(map) => pending.extend(map.values().map(|item| (item, depth + 1))),
            _ => {}
        }
    }
    deepest
}

fn parse_json(bytes: &[u8], what: &str) -> Result<Value, Error> {
    serde_json::from_slice(bytes).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid {what} json"))
            .with_source(err)
    })
}

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Usage).with_message(message)
}

fn unsupported(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::NotImplemented).with_message(message)
}
