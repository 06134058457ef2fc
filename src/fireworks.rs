//! Fireworks particle simulation
//!
//! Frame-based (one `update` per animation frame, units are px/frame).
//! Drawing is in `renderer::fireworks`.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

/// Chance of launching a rocket each frame
pub const LAUNCH_CHANCE: f64 = 0.035;
/// Chance a rocket bursts into a ring
pub const RING_CHANCE: f64 = 0.4;
/// Angular slots of a ring burst
pub const RING_SLOTS: u32 = 120;
/// Sparks per burst: `MIN_SPARKS..MIN_SPARKS + SPARK_SPREAD`
pub const MIN_SPARKS: f32 = 90.0;
pub const SPARK_SPREAD: f32 = 120.0;
pub const FRICTION: f32 = 0.98;
pub const GRAVITY: f32 = 0.06;
/// Trail fade fill painted over each frame
pub const FADE_FILL: &str = "rgba(0,0,0,0.18)";

/// A single glowing particle
#[derive(Debug, Clone, PartialEq)]
pub struct Spark {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Opacity, gone at or below zero
    pub alpha: f32,
    pub hue: f32,
    pub fade: f32,
    pub size: f32,
}

impl Spark {
    fn burst(origin: Vec2, hue: f32, ring: bool, rng: &mut impl Rng) -> Self {
        let (angle, speed) = if ring {
            let slot = rng.random_range(0..RING_SLOTS) as f32;
            (TAU / RING_SLOTS as f32 * slot, rng.random_range(4.0..5.5))
        } else {
            (rng.random_range(0.0..TAU), rng.random_range(1.0..7.0))
        };
        Self {
            pos: origin,
            vel: Vec2::new(angle.cos(), angle.sin()) * speed,
            alpha: 1.0,
            hue,
            fade: rng.random_range(0.01..0.03),
            size: rng.random_range(2.0..4.0),
        }
    }

    pub fn update(&mut self) {
        self.vel *= FRICTION;
        self.vel.y += GRAVITY;
        self.pos += self.vel;
        self.alpha -= self.fade;
    }

    pub fn is_alive(&self) -> bool {
        self.alpha > 0.0
    }

    /// Inner and outer gradient stops
    pub fn gradient(&self) -> (String, String) {
        (
            format!("hsla({},100%,70%,{})", self.hue, self.alpha),
            format!("hsla({},100%,40%,0)", self.hue),
        )
    }
}

/// A rising shell that bursts at its target height
#[derive(Debug, Clone, PartialEq)]
pub struct Rocket {
    pub pos: Vec2,
    pub target_y: f32,
    pub speed: f32,
    pub hue: f32,
    pub ring: bool,
    pub exploded: bool,
    pub sparks: Vec<Spark>,
}

impl Rocket {
    pub fn launch(width: f32, height: f32, rng: &mut impl Rng) -> Self {
        Self {
            pos: Vec2::new(rng.random_range(0.0..=width.max(0.0)), height),
            target_y: height * rng.random_range(0.35..0.60),
            speed: rng.random_range(6.0..9.0),
            hue: rng.random_range(0.0..360.0),
            ring: rng.random_bool(RING_CHANCE),
            exploded: false,
            sparks: Vec::new(),
        }
    }

    pub fn update(&mut self, rng: &mut impl Rng) {
        if self.exploded {
            self.sparks.iter_mut().for_each(Spark::update);
            return;
        }
        self.pos.y -= self.speed;
        if self.pos.y <= self.target_y {
            self.explode(rng);
        }
    }

    fn explode(&mut self, rng: &mut impl Rng) {
        self.exploded = true;
        let count = (MIN_SPARKS + rng.random_range(0.0..SPARK_SPREAD)).ceil() as usize;
        self.sparks = (0..count)
            .map(|_| Spark::burst(self.pos, self.hue, self.ring, rng))
            .collect();
    }

    /// Exploded and every spark has faded
    pub fn is_finished(&self) -> bool {
        self.exploded && self.sparks.iter().all(|s| !s.is_alive())
    }

    pub fn color(&self) -> String {
        format!("hsl({},100%,65%)", self.hue)
    }
}

/// The full show on one canvas
#[derive(Debug, Clone, Default)]
pub struct Fireworks {
    pub rockets: Vec<Rocket>,
    pub width: f32,
    pub height: f32,
}

impl Fireworks {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            rockets: Vec::new(),
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Sparks still visible
    pub fn live_sparks(&self) -> usize {
        self.rockets
            .iter()
            .flat_map(|r| r.sparks.iter())
            .filter(|s| s.is_alive())
            .count()
    }

    /// One animation frame. No launches once `spark_budget` live sparks exist.
    pub fn update(&mut self, spark_budget: usize, rng: &mut impl Rng) {
        if self.live_sparks() < spark_budget && rng.random_bool(LAUNCH_CHANCE) {
            self.rockets.push(Rocket::launch(self.width, self.height, rng));
        }

        for rocket in &mut self.rockets {
            rocket.update(rng);
        }
        self.rockets.retain(|r| !r.is_finished());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_rocket_launch_ranges() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..200 {
            let r = Rocket::launch(800.0, 600.0, &mut rng);
            assert!((0.0..=800.0).contains(&r.pos.x));
            assert_eq!(r.pos.y, 600.0);
            assert!(r.target_y >= 210.0 && r.target_y < 360.0);
            assert!(r.speed >= 6.0 && r.speed < 9.0);
        }
    }

    #[test]
    fn test_rocket_explodes_at_target() {
        let mut rng = Pcg32::seed_from_u64(12);
        let mut rocket = Rocket::launch(800.0, 600.0, &mut rng);
        let mut frames = 0;
        while !rocket.exploded {
            rocket.update(&mut rng);
            frames += 1;
            assert!(frames < 100);
        }
        assert!(rocket.pos.y <= rocket.target_y);
        assert!((90..=210).contains(&rocket.sparks.len()));
    }

    #[test]
    fn test_ring_sparks_share_speed_band() {
        let mut rng = Pcg32::seed_from_u64(13);
        let mut rocket = Rocket::launch(100.0, 100.0, &mut rng);
        rocket.ring = true;
        rocket.explode(&mut rng);
        for spark in &rocket.sparks {
            let speed = spark.vel.length();
            assert!(speed >= 3.99 && speed < 5.51, "{speed}");
        }
    }

    #[test]
    fn test_spark_physics() {
        let mut spark = Spark {
            pos: Vec2::ZERO,
            vel: Vec2::new(1.0, 0.0),
            alpha: 1.0,
            hue: 0.0,
            fade: 0.5,
            size: 2.0,
        };
        spark.update();
        assert!((spark.vel.x - 0.98).abs() < 1e-6);
        assert!((spark.vel.y - 0.06).abs() < 1e-6);
        assert!(spark.is_alive());
        spark.update();
        assert!(!spark.is_alive());
    }

    #[test]
    fn test_show_clears_finished_rockets() {
        let mut rng = Pcg32::seed_from_u64(14);
        let mut show = Fireworks::new(800.0, 600.0);
        show.rockets.push(Rocket::launch(800.0, 600.0, &mut rng));
        // spark budget of zero stops new launches
        for _ in 0..2_000 {
            show.update(0, &mut rng);
        }
        assert!(show.rockets.is_empty());
        assert_eq!(show.live_sparks(), 0);
    }
}
