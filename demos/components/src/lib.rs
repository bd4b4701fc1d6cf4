//! Example component definitions for the simulation ECS demo.
//!
//! Components are plain data. They implement [`Component`] with a short
//! stable type name, and derive `Serialize`/`Deserialize` so the demo can
//! dump a world snapshot.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use sim_component::Component;

/// A point in world space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub point: Vec3,
}

impl Position {
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            point: Vec3::new(x, y, z),
        }
    }

    /// Move by `speed` for `dt` seconds.
    pub fn advance(&mut self, speed: &Speed, dt: f32) {
        self.point += speed.linear * dt;
    }
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

/// A linear speed in world units per second.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Speed {
    pub linear: Vec3,
}

impl Speed {
    /// Standing still.
    pub const ZERO: Self = Self { linear: Vec3::ZERO };

    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            linear: Vec3::new(x, y, z),
        }
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Component for Speed {
    fn type_name() -> &'static str {
        "Speed"
    }
}

/// A debug label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Info {
    pub label: String,
}

impl Info {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Component for Info {
    fn type_name() -> &'static str {
        "Info"
    }
}
