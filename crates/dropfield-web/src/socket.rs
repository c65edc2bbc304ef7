//! WebSocket transport for a [`Connection`].

use std::rc::Rc;

use dropfield::Connection;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{MessageEvent, WebSocket};

/// An open socket plus the JS callbacks bound to it. Dropping this detaches
/// the callbacks; the socket itself is left to the browser.
pub struct FieldSocket {
    ws: WebSocket,
    _on_open: Closure<dyn FnMut(JsValue)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
    _on_close: Closure<dyn FnMut(JsValue)>,
}

impl FieldSocket {
    /// Open `url` and route its events into `connection`. No reconnects.
    pub fn connect(url: &str, connection: Rc<Connection>) -> Result<Self, JsValue> {
        let ws = WebSocket::new(url)?;

        let on_open = {
            let connection = Rc::clone(&connection);
            let ws = ws.clone();
            Closure::wrap(Box::new(move |_: JsValue| {
                if let Some(frame) = connection.on_open() {
                    if let Err(err) = ws.send_with_str(&frame) {
                        log::warn!("handshake send failed: {err:?}");
                    }
                }
            }) as Box<dyn FnMut(JsValue)>)
        };

        let on_message = {
            let connection = Rc::clone(&connection);
            Closure::wrap(Box::new(move |event: MessageEvent| {
                match event.data().as_string() {
                    // Errors are logged by the connection; the link stays up.
                    Some(text) => {
                        let _ = connection.on_message(&text);
                    }
                    None => log::warn!("discarding non-text server frame"),
                }
            }) as Box<dyn FnMut(MessageEvent)>)
        };

        let on_error = {
            let connection = Rc::clone(&connection);
            Closure::wrap(Box::new(move |_: JsValue| connection.on_error()) as Box<dyn FnMut(JsValue)>)
        };

        let on_close = Closure::wrap(Box::new(move |_: JsValue| connection.on_close()) as Box<dyn FnMut(JsValue)>);

        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Self {
            ws,
            _on_open: on_open,
            _on_message: on_message,
            _on_error: on_error,
            _on_close: on_close,
        })
    }

    pub fn ready_state(&self) -> u16 {
        self.ws.ready_state()
    }
}

impl Drop for FieldSocket {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
    }
}
