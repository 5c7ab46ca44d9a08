//! Pin board model and its pages.
//!
//! The index page streams `pins.html`, splicing one eager row template per
//! pin and the `pins.js` lazy template into it. Toggling and status go
//! through small JSON endpoints.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::http::{query, Request, Response};
use crate::routing::HandlerError;
use crate::template::{LazyTemplate, Replacement, Template};

/// Pins exposed on the board, in display order.
pub const PIN_NUMBERS: [u8; 8] = [0, 2, 4, 5, 12, 13, 14, 15];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pin {
    pub number: u8,
    pub high: bool,
}

impl Pin {
    /// Element id used by the page and the toggle endpoint.
    pub fn id(&self) -> String {
        format!("btn{}", self.number)
    }

    fn level(&self) -> &'static str {
        if self.high {
            "HIGH"
        } else {
            "LOW"
        }
    }
}

/// In-memory pin states.
#[derive(Debug, Clone)]
pub struct PinBoard {
    pins: Vec<Pin>,
}

impl PinBoard {
    /// Every pin low except 0 and 5.
    pub fn new() -> Self {
        let pins = PIN_NUMBERS
            .iter()
            .map(|&number| Pin {
                number,
                high: matches!(number, 0 | 5),
            })
            .collect();
        Self { pins }
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn get(&self, number: u8) -> Option<Pin> {
        self.pins.iter().find(|pin| pin.number == number).copied()
    }

    /// Flip the pin with element id `id`, returning its new level.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let pin = self.pins.iter_mut().find(|pin| pin.id() == id)?;
        pin.high = !pin.high;
        Some(pin.high)
    }

    /// `{"btn0": true, ...}`
    pub fn status(&self) -> Map<String, Value> {
        self.pins
            .iter()
            .map(|pin| (pin.id(), Value::Bool(pin.high)))
            .collect()
    }
}

impl Default for PinBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// A JavaScript string literal that cannot close its `<script>` element.
fn script_string(value: &str) -> Result<String, HandlerError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// `GET /`
pub fn index(state: &AppState, request: &Request) -> Result<Response, HandlerError> {
    let mut row = Template::from_file(state.template_path("pins_table_row.html"))?;
    let pins = state.pins.borrow().pins().to_vec();
    let rows = pins.into_iter().flat_map(move |pin| {
        row.format([("pin_id", pin.id()), ("pin_value", pin.level().to_string())]);
        row.lines()
    });

    let base_url = request
        .headers()
        .get_ignore_case("Host")
        .map(|host| format!("http://{host}"))
        .unwrap_or_default();
    let mut javascript = LazyTemplate::from_file(state.template_path("pins.js"))?;
    javascript.set("server_base_url", script_string(&base_url)?);

    let mut page = LazyTemplate::from_file(state.template_path("pins.html"))?;
    page.set("table_content", Replacement::lines(rows))
        .set("comment", "Click a button to toggle its pin.")
        .set("javascript", javascript);
    Ok(Response::template(page))
}

/// `POST /pins` with `btn_id` in the query or the form body.
pub fn toggle(state: &AppState, request: &Request) -> Result<Response, HandlerError> {
    let form = request.body().map(query::parse).unwrap_or_default();
    let id = request
        .query()
        .get("btn_id")
        .or_else(|| form.get("btn_id"))
        .ok_or_else(|| HandlerError::BadRequest("missing btn_id".to_string()))?;

    let mut board = state.pins.borrow_mut();
    let high = board
        .toggle(id)
        .ok_or_else(|| HandlerError::BadRequest(format!("unknown pin {id:?}")))?;
    tracing::info!(pin = id, high, "Pin toggled");
    Ok(Response::json(&board.status())?)
}

/// `GET /pins.json`
pub fn status(state: &AppState, _request: &Request) -> Result<Response, HandlerError> {
    Ok(Response::json(&state.pins.borrow().status())?)
}

/// `GET /pins/<number>`
pub fn pin(state: &AppState, request: &Request) -> Result<Response, HandlerError> {
    let number = request
        .route_match()
        .and_then(|m| m.group(1))
        .and_then(|n| n.parse::<u8>().ok());
    match number.and_then(|n| state.pins.borrow().get(n)) {
        Some(pin) => Ok(Response::json(&pin)?),
        None => state.not_found(),
    }
}
