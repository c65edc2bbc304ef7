pub mod random;
pub mod scheduler;
pub mod socket;
pub mod surface;

use std::cell::RefCell;
use std::rc::Rc;

use dropfield::{BootParams, FieldConfig, FieldError, FieldSession};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

pub use random::MathRandom;
pub use scheduler::BrowserScheduler;
pub use socket::FieldSocket;
pub use surface::DomSurface;

/// Default id of the field container in the page markup.
const FIELD_ELEMENT_ID: &str = "field";

/// A running page session plus the socket feeding it.
struct FieldApp {
    session: FieldSession<DomSurface>,
    socket: Option<FieldSocket>,
}

thread_local! {
    static APP: RefCell<Option<FieldApp>> = RefCell::new(None);
}

fn to_js(err: FieldError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Boot the field from `<div id="field" data-id=".." data-pdr="..">`
/// with default timings.
#[wasm_bindgen]
pub fn field_init() -> Result<(), JsValue> {
    field_init_with(FIELD_ELEMENT_ID, None)
}

/// Boot the field from the element with `element_id`, optionally overriding
/// timings and endpoint with a JSON config document.
#[wasm_bindgen]
pub fn field_init_with(element_id: &str, config_json: Option<String>) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = match config_json {
        Some(json) => FieldConfig::from_json(&json).map_err(to_js)?,
        None => FieldConfig::default(),
    };

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let field: HtmlElement = document
        .get_element_by_id(element_id)
        .ok_or_else(|| JsValue::from_str(&format!("no element #{element_id}")))?
        .dyn_into()?;

    let dataset = field.dataset();
    let boot = BootParams::parse(
        &dataset.get("id").unwrap_or_default(),
        &dataset.get("pdr").unwrap_or_default(),
    )
    .map_err(to_js)?;
    field.remove_attribute("data-pdr")?;

    surface::install_animation_rule(&document, config.display_duration_ms);

    // Replace any previous session before arming new timers.
    field_shutdown();

    let url = config.server_url.clone();
    let session = FieldSession::start(
        config,
        boot,
        DomSurface::new(field),
        Rc::new(BrowserScheduler::new(window)),
        Rc::new(MathRandom),
    );

    let socket = match FieldSocket::connect(&url, session.connection()) {
        Ok(socket) => Some(socket),
        Err(err) => {
            log::warn!("could not open {url}: {err:?}");
            session.connection().on_error();
            None
        }
    };

    APP.with(|cell| {
        *cell.borrow_mut() = Some(FieldApp { session, socket });
    });
    log::info!("dropfield: initialized");
    Ok(())
}

/// Current pdr as last reported by the server (or the boot value).
#[wasm_bindgen]
pub fn field_pdr() -> f64 {
    APP.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|app| app.session.pdr())
            .unwrap_or(f64::NAN)
    })
}

/// Drops received but not yet rendered.
#[wasm_bindgen]
pub fn field_pending_drops() -> u32 {
    APP.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|app| app.session.queue().borrow().len() as u32)
            .unwrap_or(0)
    })
}

/// Whether the socket is still open.
#[wasm_bindgen]
pub fn field_is_connected() -> bool {
    APP.with(|cell| {
        cell.borrow()
            .as_ref()
            .and_then(|app| app.socket.as_ref())
            .map(|socket| socket.ready_state() == web_sys::WebSocket::OPEN)
            .unwrap_or(false)
    })
}

/// Stop both loops and detach socket callbacks. Elements on the field still
/// expire on their own.
#[wasm_bindgen]
pub fn field_shutdown() {
    let app = APP.with(|cell| cell.borrow_mut().take());
    if let Some(app) = app {
        app.session.shutdown();
        drop(app.socket);
        log::info!("dropfield: shut down");
    }
}
