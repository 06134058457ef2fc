//! Fireworks drawing

use super::DrawCmd;
use crate::fireworks::{FADE_FILL, Fireworks};

/// Rocket streak size
const ROCKET_W: f64 = 2.0;
const ROCKET_H: f64 = 10.0;

/// One frame over the previous one; the translucent fill leaves trails
pub fn fireworks_frame(show: &Fireworks, glow: bool) -> Vec<DrawCmd> {
    let mut cmds = vec![DrawCmd::rect(
        0.0,
        0.0,
        show.width as f64,
        show.height as f64,
        FADE_FILL,
    )];

    for rocket in &show.rockets {
        if !rocket.exploded {
            cmds.push(DrawCmd::rect(
                rocket.pos.x as f64,
                rocket.pos.y as f64,
                ROCKET_W,
                ROCKET_H,
                rocket.color(),
            ));
            continue;
        }
        for spark in rocket.sparks.iter().filter(|s| s.is_alive()) {
            let (inner, outer) = spark.gradient();
            let (x, y) = (spark.pos.x as f64, spark.pos.y as f64);
            let radius = spark.size as f64 * 2.0;
            if glow {
                cmds.push(DrawCmd::Glow {
                    x,
                    y,
                    radius,
                    inner,
                    outer,
                });
            } else {
                cmds.push(DrawCmd::rect(x - radius / 2.0, y - radius / 2.0, radius, radius, inner));
            }
        }
    }
    cmds
}
