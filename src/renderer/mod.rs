//! Canvas 2D rendering module
//!
//! Frames are built as plain draw lists on any target, then replayed onto a
//! `CanvasRenderingContext2d` in the browser.

pub mod fireworks;
pub mod snake;

pub use fireworks::fireworks_frame;
pub use snake::snake_frame;

/// A single canvas operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    /// Fill a rectangle
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: String,
    },
    /// Centered text
    Text {
        text: String,
        x: f64,
        y: f64,
        font: &'static str,
        color: String,
    },
    /// Disc filled with a radial gradient from `inner` to `outer`
    Glow {
        x: f64,
        y: f64,
        radius: f64,
        inner: String,
        outer: String,
    },
}

impl DrawCmd {
    pub fn rect(x: f64, y: f64, w: f64, h: f64, color: impl Into<String>) -> Self {
        DrawCmd::Rect {
            x,
            y,
            w,
            h,
            color: color.into(),
        }
    }

    pub fn text(text: impl Into<String>, x: f64, y: f64, font: &'static str, color: &str) -> Self {
        DrawCmd::Text {
            text: text.into(),
            x,
            y,
            font,
            color: color.to_string(),
        }
    }
}

/// Replay a draw list
#[cfg(target_arch = "wasm32")]
pub fn execute(ctx: &web_sys::CanvasRenderingContext2d, cmds: &[DrawCmd]) {
    for cmd in cmds {
        match cmd {
            DrawCmd::Rect { x, y, w, h, color } => {
                ctx.set_fill_style_str(color);
                ctx.fill_rect(*x, *y, *w, *h);
            }
            DrawCmd::Text {
                text,
                x,
                y,
                font,
                color,
            } => {
                ctx.set_fill_style_str(color);
                ctx.set_font(font);
                ctx.set_text_align("center");
                if let Err(e) = ctx.fill_text(text, *x, *y) {
                    log::warn!("fill_text failed: {:?}", e);
                }
            }
            DrawCmd::Glow {
                x,
                y,
                radius,
                inner,
                outer,
            } => {
                let Ok(gradient) = ctx.create_radial_gradient(*x, *y, 0.0, *x, *y, *radius) else {
                    continue;
                };
                if gradient.add_color_stop(0.0, inner).is_err()
                    || gradient.add_color_stop(1.0, outer).is_err()
                {
                    continue;
                }
                ctx.set_fill_style_canvas_gradient(&gradient);
                ctx.begin_path();
                if ctx.arc(*x, *y, *radius, 0.0, std::f64::consts::TAU).is_ok() {
                    ctx.fill();
                }
            }
        }
    }
}
