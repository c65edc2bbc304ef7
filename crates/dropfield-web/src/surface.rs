//! DOM-backed [`Surface`]: each element is a `<div class="field-element">`
//! child of the field container, positioned through the `--field-position`
//! custom property and animated by page CSS.

use dropfield::{ElementRole, Surface, VisualElement};
use wasm_bindgen::JsCast;
use web_sys::{CssStyleSheet, Document, HtmlElement};

pub struct DomSurface {
    field: HtmlElement,
}

impl DomSurface {
    pub fn new(field: HtmlElement) -> Self {
        Self { field }
    }

    pub fn field(&self) -> &HtmlElement {
        &self.field
    }

    fn create(&self, element: &VisualElement) -> Option<HtmlElement> {
        let document = self.field.owner_document()?;
        let node: HtmlElement = document.create_element("div").ok()?.dyn_into().ok()?;
        let classes = node.class_list();
        classes.add_1("field-element").ok()?;
        if element.size.is_small() {
            classes.add_1("small").ok()?;
        }
        if element.role == ElementRole::Drop {
            classes.add_1("drop").ok()?;
        }
        node.set_inner_html(&element.symbol);
        node.style()
            .set_property("--field-position", &element.position.to_string())
            .ok()?;
        Some(node)
    }
}

impl Surface for DomSurface {
    type Node = HtmlElement;

    fn attach(&self, element: &VisualElement) -> Option<HtmlElement> {
        // A field that was taken out of the page counts as unavailable.
        if !self.field.is_connected() {
            return None;
        }
        let node = self.create(element)?;
        self.field.append_child(&node).ok()?;
        Some(node)
    }

    fn detach(&self, node: &HtmlElement) {
        // `remove()` on a detached node does nothing.
        node.remove();
    }
}

/// Append `.field-element { animation-duration: <ms>ms; }` to the page's
/// first stylesheet so CSS animations last exactly as long as an element
/// stays attached. Pages without a usable stylesheet are left alone.
pub fn install_animation_rule(document: &Document, display_duration_ms: f64) {
    let Some(sheet) = document
        .style_sheets()
        .get(0)
        .and_then(|sheet| sheet.dyn_into::<CssStyleSheet>().ok())
    else {
        log::debug!("no stylesheet, animation duration left to page CSS");
        return;
    };
    let rule = format!(".field-element {{ animation-duration: {display_duration_ms}ms; }}");
    let index = match sheet.css_rules() {
        Ok(rules) => rules.length(),
        Err(err) => {
            log::warn!("stylesheet rules unreadable: {err:?}");
            return;
        }
    };
    if let Err(err) = sheet.insert_rule_with_index(&rule, index) {
        log::warn!("could not insert animation rule: {err:?}");
    }
}
