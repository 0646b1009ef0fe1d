use std::f32::consts::PI;
use std::time::Duration;

use glam::{Quat, Vec3};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindConfig {
    /// Seconds between heading changes
    pub cycle_secs: f32,
    /// Standard deviation of each heading change, in radians
    pub spread: f32,
    pub seed: u64,
}

impl Default for WindConfig {
    fn default() -> Self {
        WindConfig {
            cycle_secs: 20.0,
            spread: PI / 3.0,
            seed: 0,
        }
    }
}

/// Drifting texture offset for the cloud layer
///
/// Once per cycle a new wind heading is drawn around the previous one. During
/// the cycle the heading blends from the old to the new direction and the
/// offset advances along it. The x and z components of the offset wrap into
/// [0, 1) so they can index a tiling texture directly.
pub struct WindDrift {
    cycle_secs: f32,
    elapsed_secs: f32,
    last_t: f32,
    angle: f32,
    turn: Normal<f32>,
    rng: Pcg64Mcg,
    position: Vec3,
    old_heading: Vec3,
    new_heading: Vec3,
}

fn heading(angle: f32) -> Vec3 {
    Quat::from_rotation_y(angle) * Vec3::X
}

/// Fractional part in [0, 1), guarding against `-tiny - floor` rounding up to 1
fn wrap_unit(v: f32) -> f32 {
    let w = v - v.floor();
    if w >= 1.0 { 0.0 } else { w }
}

impl WindDrift {
    pub fn new(config: &WindConfig) -> Result<Self> {
        if !(config.cycle_secs.is_finite() && config.cycle_secs > 0.0) {
            return Err(TerrainError::invalid(format!(
                "wind cycle must be positive, got {}",
                config.cycle_secs
            )));
        }
        let turn = Normal::new(0.0, config.spread)
            .map_err(|e| TerrainError::invalid(format!("wind spread {}: {e}", config.spread)))?;
        let mut rng = Pcg64Mcg::seed_from_u64(config.seed);

        let mut angle = turn.sample(&mut rng);
        let old_heading = heading(angle);
        angle += turn.sample(&mut rng);
        let new_heading = heading(angle);

        Ok(WindDrift {
            cycle_secs: config.cycle_secs,
            elapsed_secs: 0.0,
            last_t: 0.0,
            angle,
            turn,
            rng,
            position: Vec3::ZERO,
            old_heading,
            new_heading,
        })
    }

    /// Current offset, x and z in [0, 1)
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Blended wind direction at the current point of the cycle
    pub fn heading(&self) -> Vec3 {
        self.old_heading.lerp(self.new_heading, self.last_t)
    }

    /// Advance by `dt` and return the new offset
    pub fn advance(&mut self, dt: Duration) -> Vec3 {
        self.elapsed_secs = (self.elapsed_secs + dt.as_secs_f32()).rem_euclid(self.cycle_secs);
        let mut t = self.elapsed_secs / self.cycle_secs;

        if self.last_t > t {
            // a cycle boundary was crossed: pick the next heading
            self.old_heading = self.new_heading;
            self.angle += self.turn.sample(&mut self.rng);
            self.new_heading = heading(self.angle);
            self.last_t = 0.0;
            t = 0.0;
        }

        let blended = self.old_heading.lerp(self.new_heading, t);
        self.position += (t - self.last_t) * blended;
        self.position.x = wrap_unit(self.position.x);
        self.position.z = wrap_unit(self.position.z);
        self.last_t = t;
        self.position
    }
}
