//! Fish-time display, driving the cultivation sync

use std::cell::RefCell;
use std::rc::Rc;

use super::cultivation::SharedCultivation;
use super::dom::{self, alert, confirm, on_click};
use crate::consts::TIMER_TICK_MS;
use crate::idle_timer::{IdleTimer, RESET_CONFIRM, RESET_DONE, format_duration};
use crate::platform::{LocalStore, now_ms};

pub fn mount(cultivation: SharedCultivation) {
    let timer = Rc::new(RefCell::new(IdleTimer::init(
        Box::new(LocalStore::local()),
        now_ms(),
    )));

    let refresh = {
        let timer = timer.clone();
        let cultivation = cultivation.clone();
        move || {
            let tick = timer.borrow().tick(now_ms());
            dom::set_text("fish-time", &format_duration(tick.total_seconds));
            cultivation.borrow_mut().sync(tick.total_seconds);
        }
    };
    refresh();
    dom::set_interval(refresh, TIMER_TICK_MS);

    if let Ok(window) = dom::window() {
        let timer = timer.clone();
        let cultivation = cultivation.clone();
        dom::listen(&window, "beforeunload", move |_: web_sys::Event| {
            let total = timer.borrow().save(now_ms());
            cultivation.borrow_mut().sync(total);
        });
    }

    on_click("reset-fish-time", move |_| {
        if !confirm(RESET_CONFIRM) {
            return;
        }
        timer.borrow_mut().reset(now_ms());
        cultivation.borrow_mut().reset();
        dom::set_text("fish-time", &format_duration(0));
        alert(RESET_DONE);
    });

    log::info!("Idle timer mounted");
}
