//! Full-window fireworks canvas

use std::cell::RefCell;
use std::rc::Rc;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::dom::{self, by_id_as};
use crate::fireworks::Fireworks;
use crate::platform::LocalStore;
use crate::renderer::{self, fireworks_frame};
use crate::settings::Settings;

const CANVAS_ID: &str = "fireworks-canvas";
/// Set on `window` while an instance is animating
const RUNNING_FLAG: &str = "__FIREWORKS_RUNNING__";

struct Show {
    fireworks: Fireworks,
    rng: Pcg32,
    ctx: CanvasRenderingContext2d,
    canvas: HtmlCanvasElement,
    spark_budget: usize,
    glow: bool,
}

impl Show {
    fn fit_to_window(&mut self) {
        let Ok(window) = dom::window() else {
            return;
        };
        let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        self.canvas.set_width(width as u32);
        self.canvas.set_height(height as u32);
        self.fireworks.resize(width as f32, height as f32);
    }

    fn frame(&mut self) {
        self.fireworks.update(self.spark_budget, &mut self.rng);
        renderer::execute(&self.ctx, &fireworks_frame(&self.fireworks, self.glow));
    }
}

fn already_running(window: &web_sys::Window) -> bool {
    js_sys::Reflect::get(window, &JsValue::from_str(RUNNING_FLAG))
        .map(|v| v.is_truthy())
        .unwrap_or(false)
}

pub fn mount() -> Result<(), JsValue> {
    let Some(canvas) = by_id_as::<HtmlCanvasElement>(CANVAS_ID) else {
        return Ok(());
    };
    let settings = Settings::load(&LocalStore::local());
    if !settings.effective_fireworks() {
        log::info!("Fireworks disabled by settings");
        return Ok(());
    }

    let window = dom::window()?;
    if already_running(&window) {
        log::debug!("Fireworks already running");
        return Ok(());
    }
    js_sys::Reflect::set(&window, &JsValue::from_str(RUNNING_FLAG), &JsValue::TRUE)?;

    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or("2d context unavailable")?
        .dyn_into()?;

    let show = Rc::new(RefCell::new(Show {
        fireworks: Fireworks::new(0.0, 0.0),
        rng: Pcg32::seed_from_u64(dom::clock_seed()),
        ctx,
        canvas,
        spark_budget: settings.spark_budget(),
        glow: settings.quality.glow_enabled(),
    }));
    show.borrow_mut().fit_to_window();

    {
        let show = show.clone();
        dom::listen(&window, "resize", move |_: web_sys::Event| {
            show.borrow_mut().fit_to_window();
        });
    }

    request_animation_frame(show);
    log::info!(
        "Fireworks running ({} quality)",
        settings.quality.as_str()
    );
    Ok(())
}

fn request_animation_frame(show: Rc<RefCell<Show>>) {
    dom::request_animation_frame(move |_| {
        show.borrow_mut().frame();
        request_animation_frame(show);
    });
}
