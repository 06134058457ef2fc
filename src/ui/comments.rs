//! Friend-link template filler and emoji hover preview

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, EventInit, HtmlElement, HtmlInputElement, HtmlTextAreaElement, MouseEvent};

use super::dom::{self, alert, by_id};
use crate::comments::preview::{self, HOVER_DELAY_MS, MIN_BODY_WIDTH};
use crate::comments::{
    FILL_DELAY_MS, LinkTemplate, NOT_FOUND_TEXT, TEXTAREA_SELECTORS, clear_comment_cache,
};
use crate::platform::LocalStore;

fn find_comment_box() -> Option<Element> {
    let document = dom::document().ok()?;
    TEXTAREA_SELECTORS
        .iter()
        .find_map(|selector| document.query_selector(selector).ok().flatten())
}

fn set_box_value(el: &Element, value: &str) {
    if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
        area.set_value(value);
    } else if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        input.set_value(value);
    } else {
        el.set_text_content(Some(value));
    }
}

/// Let the comment widget's framework see the new value
fn notify(el: &Element, events: &[&str]) {
    let init = EventInit::new();
    init.set_bubbles(true);
    for name in events {
        match web_sys::Event::new_with_event_init_dict(name, &init) {
            Ok(event) => {
                let _ = el.dispatch_event(&event);
            }
            Err(e) => log::warn!("Failed to create {} event: {:?}", name, e),
        }
    }
}

fn place_cursor(el: &Element, at: u32) {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        let _ = html.focus();
    }
    if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
        let _ = area.set_selection_range(at, at);
    }
}

/// Fill the comment box with a friend-link application (`"bf"` for the YAML form)
#[wasm_bindgen]
pub fn link_com(kind: &str) {
    let template = LinkTemplate::from_key(kind);
    clear_comment_cache(&[&LocalStore::local(), &LocalStore::session()]);

    dom::set_timeout(
        move || {
            let Some(comment_box) = find_comment_box() else {
                alert(NOT_FOUND_TEXT);
                return;
            };
            set_box_value(&comment_box, "");
            notify(&comment_box, &["input"]);

            dom::set_timeout(
                move || {
                    set_box_value(&comment_box, template.text());
                    place_cursor(&comment_box, template.cursor());
                    notify(&comment_box, &["input", "change"]);
                    log::info!("Friend-link template filled");
                },
                FILL_DELAY_MS,
            );
        },
        FILL_DELAY_MS,
    );
}

/// Emoji images in the OwO picker or Twikoo comments
fn is_emoji(target: &Element) -> bool {
    let in_picker = target.tag_name() == "IMG"
        && target.closest(".OwO-body").ok().flatten().is_some();
    in_picker || target.class_name() == "tk-owo-emotion"
}

pub fn mount_emoji_preview() -> Result<(), JsValue> {
    let Some(comments) = by_id("post-comment") else {
        return Ok(());
    };
    let document = dom::document()?;
    let body = document.body().ok_or("no body")?;
    if f64::from(body.client_width()) < MIN_BODY_WIDTH {
        return Ok(());
    }

    let big = document.create_element("div")?;
    big.set_id("owo-big");
    body.append_child(&big)?;

    let pending: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));

    {
        let pending = pending.clone();
        let big = big.clone();
        dom::listen(&comments, "mouseover", move |event: MouseEvent| {
            if pending.get().is_some() {
                return;
            }
            let Some(target) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
                return;
            };
            if !is_emoji(&target) {
                return;
            }
            let big = big.clone();
            let body = body.clone();
            let id = dom::set_timeout(
                move || {
                    let rect = target.get_bounding_client_rect();
                    let placed = preview::place(
                        rect.left(),
                        rect.top(),
                        f64::from(target.client_width()),
                        f64::from(target.client_height()),
                        f64::from(body.client_width()),
                    );
                    let _ = big.set_attribute("style", &placed.css());
                    let src = target.get_attribute("src").unwrap_or_default();
                    big.set_inner_html(&format!("<img src=\"{}\">", dom::escape_html(&src)));
                },
                HOVER_DELAY_MS,
            );
            pending.set(Some(id));
        });
    }

    dom::listen(&comments, "mouseout", move |_: MouseEvent| {
        dom::set_style(&big, "display", "none");
        if let Some(id) = pending.take() {
            dom::clear_timeout(id);
        }
    });
    Ok(())
}
