//! Pin board web application.
//!
//! # Routes
//! ```text
//! GET  /                 pins page (lazy template, eager rows, inline JS)
//! GET  /pins.json        pin levels as JSON
//! GET  /pins/<number>    one pin as JSON
//! POST /pins             toggle ?btn_id=btnN, answers with pin levels
//! GET  /settings         settings form
//! POST /settings         merge submitted form into the settings
//! GET  /settings.yaml    settings as YAML
//! GET  /static/<file>    files from the static directory, chunked
//! *                      404 page
//! ```
//!
//! # Design Decisions
//! - State lives in one `Rc<AppState>` shared by the handler closures;
//!   the server is single-threaded, so `RefCell` is enough
//! - Templates are read from disk per request, so edits show up live

pub mod pins;
pub mod settings;

use std::cell::RefCell;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use http::{Method, StatusCode};
use serde_json::Value;

use crate::config::ServerConfig;
use crate::http::{Request, Response};
use crate::routing::{HandlerError, RouteError, Router};

pub use pins::{Pin, PinBoard};

/// Everything the handlers share.
#[derive(Debug)]
pub struct AppState {
    templates_dir: PathBuf,
    static_dir: PathBuf,
    chunk_size: usize,
    pub pins: RefCell<PinBoard>,
    pub settings: RefCell<Value>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            templates_dir: config.templates.dir.clone(),
            static_dir: config.static_files.dir.clone(),
            chunk_size: config.static_files.chunk_size,
            pins: RefCell::new(PinBoard::new()),
            settings: RefCell::new(settings::defaults()),
        }
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_dir.join(name)
    }

    /// The static `404.html` with a 404 status, or the built-in page when
    /// that file is missing.
    pub fn not_found(&self) -> Result<Response, HandlerError> {
        match Response::file(self.static_dir.join("404.html"), self.chunk_size) {
            Ok(response) => Ok(response.with_status(StatusCode::NOT_FOUND)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Response::not_found()),
            Err(err) => Err(err.into()),
        }
    }
}

/// `GET /static/<file>`
pub fn static_file(state: &AppState, request: &Request) -> Result<Response, HandlerError> {
    let name = request
        .route_match()
        .and_then(|m| m.group(1))
        .unwrap_or_default();
    let relative = Path::new(name);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(HandlerError::BadRequest(format!("refusing path {name:?}")));
    }
    match Response::file(state.static_dir.join(relative), state.chunk_size) {
        Ok(response) => Ok(response),
        Err(err) if err.kind() == io::ErrorKind::NotFound => state.not_found(),
        Err(err) => Err(err.into()),
    }
}

/// Register every route of the application.
pub fn build_router(state: Rc<AppState>) -> Result<Router, RouteError> {
    let mut router = Router::new();

    let s = Rc::clone(&state);
    router.get("/", move |req| pins::index(&s, req));
    let s = Rc::clone(&state);
    router.get("/pins.json", move |req| pins::status(&s, req));
    let s = Rc::clone(&state);
    router.post("/pins", move |req| pins::toggle(&s, req));
    let s = Rc::clone(&state);
    router.register_pattern(Method::GET, r"/pins/(\d+)$", move |req| pins::pin(&s, req))?;

    let s = Rc::clone(&state);
    router.get("/settings", move |req| settings::show(&s, req));
    let s = Rc::clone(&state);
    router.post("/settings", move |req| settings::update(&s, req));
    let s = Rc::clone(&state);
    router.get("/settings.yaml", move |req| settings::yaml(&s, req));

    let s = Rc::clone(&state);
    router.register_pattern(Method::GET, "/static/(.+)", move |req| static_file(&s, req))?;

    router.set_default(move |_| state.not_found());
    Ok(router)
}
