use serde_json::{Map, Value};

/// Parameters of one action invocation, as a flat JSON object.
pub type Params = Map<String, Value>;

pub const OW_HEADERS: &str = "__ow_headers";
pub const OW_METHOD: &str = "__ow_method";
const OW_PREFIX: &str = "__ow_";

/// Keys may be dotted paths (`data.asset_id`). A key counts as missing when it
/// is absent or the empty string; `0`, `false` and `null` are present.
pub fn missing_keys(obj: &Params, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|path| match lookup(obj, path) {
            None => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        })
        .map(|path| path.to_string())
        .collect()
}

/// Returns `None` when nothing is missing, otherwise the client-facing message.
pub fn check_missing_request_inputs(
    params: &Params,
    required_params: &[&str],
    required_headers: &[&str],
) -> Option<String> {
    let mut message: Option<String> = None;

    // headers arrive lower-cased
    let required_headers: Vec<String> = required_headers.iter().map(|h| h.to_lowercase()).collect();
    let required_headers: Vec<&str> = required_headers.iter().map(String::as_str).collect();
    let empty = Params::new();
    let headers = params
        .get(OW_HEADERS)
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let missing_headers = missing_keys(headers, &required_headers);
    if !missing_headers.is_empty() {
        message = Some(format!("missing header(s) '{}'", missing_headers.join(",")));
    }

    let missing_params = missing_keys(params, required_params);
    if !missing_params.is_empty() {
        let part = format!("missing parameter(s) '{}'", missing_params.join(","));
        message = Some(match message {
            Some(headers) => format!("{} and {}", headers, part),
            None => part,
        });
    }

    message
}

pub fn strip_openwhisk_params(params: &Params) -> Params {
    params
        .iter()
        .filter(|(key, _)| !key.starts_with(OW_PREFIX))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Renders the params for logging with the authorization header hidden.
pub fn string_parameters(params: &Params) -> String {
    let mut shown = params.clone();
    if let Some(Value::Object(headers)) = shown.get_mut(OW_HEADERS) {
        if headers.contains_key("authorization") {
            headers.insert("authorization".to_string(), Value::String("<hidden>".to_string()));
        }
    }
    Value::Object(shown).to_string()
}

/// JavaScript truthiness, which decides things like the webhook challenge.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn lookup<'a>(obj: &'a Params, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = obj.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

pub fn truthy_param<'a>(params: &'a Params, path: &str) -> Option<&'a Value> {
    lookup(params, path).filter(|value| is_truthy(value))
}
