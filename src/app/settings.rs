//! Settings pages.
//!
//! Settings are a JSON tree. The form page renders it with
//! [`TreeLines::html_form`], a POST merges the submitted dotted names back
//! in, and `/settings.yaml` dumps the tree.

use serde_json::{json, Value};

use crate::app::AppState;
use crate::http::{Body, Request, Response};
use crate::routing::HandlerError;
use crate::template::{parse_form, LazyTemplate, Replacement, TreeLines};

const INDENT_STEP: usize = 2;

pub fn defaults() -> Value {
    json!({
        "device": { "name": "pin-board", "location": "bench" },
        "wifi": { "ssid": "workshop", "channel": 6 },
    })
}

/// Recursively overwrite `target` with the leaves of `update`.
pub fn merge(target: &mut Value, update: Value) {
    match (target, update) {
        (Value::Object(target), Value::Object(update)) => {
            for (key, value) in update {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, update) => *target = update,
    }
}

fn page(state: &AppState, message: &str) -> Result<Response, HandlerError> {
    let tree = state.settings.borrow().clone();
    let mut page = LazyTemplate::from_file(state.template_path("settings.html"))?;
    page.set("form_fields", Replacement::lines(TreeLines::html_form(tree, INDENT_STEP)))
        .set("message", message);
    Ok(Response::template(page))
}

/// `GET /settings`
pub fn show(state: &AppState, _request: &Request) -> Result<Response, HandlerError> {
    page(state, "")
}

/// `POST /settings`
pub fn update(state: &AppState, request: &Request) -> Result<Response, HandlerError> {
    let body = request
        .body()
        .ok_or_else(|| HandlerError::BadRequest("missing form body".to_string()))?;
    let submitted = parse_form(body);
    merge(&mut state.settings.borrow_mut(), submitted);
    tracing::info!("Settings updated");
    page(state, "Saved.")
}

/// `GET /settings.yaml`
pub fn yaml(state: &AppState, _request: &Request) -> Result<Response, HandlerError> {
    let tree = state.settings.borrow().clone();
    Ok(Response::ok(Body::from_lines(TreeLines::yaml(tree, INDENT_STEP)))
        .with_header("Content-Type", "text/yaml"))
}
