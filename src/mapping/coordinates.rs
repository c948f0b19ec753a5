//! Camera space to playfield space mapping

use crate::config::Bounds;
use crate::target::GamePosition;
use std::f32::consts::TAU;

/// Where the controller points in the playfield, relative to the player
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aim {
    pub target_x: f32,
    pub target_y: f32,
    /// Counter-clockwise from +x in `[0, 2π)`, with screen y pointing down
    pub angle: f32,
    pub distance: f32,
}

/// Maps tracked controller positions into the game's target-threshold space
///
/// Both bound sets come from a validated configuration, so `min < max` holds
/// on every axis and the remap never divides by zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    camera: Bounds,
    target: Bounds,
}

fn remap(value: f32, old_min: f32, old_max: f32, new_min: f32, new_max: f32) -> f32 {
    new_min + (value - old_min) * (new_max - new_min) / (old_max - old_min)
}

impl CoordinateMapper {
    pub fn new(camera: Bounds, target: Bounds) -> Self {
        Self { camera, target }
    }

    /// Playfield coordinates for a camera position
    ///
    /// The camera sees the player mirrored, so x is flipped inside the target
    /// range after remapping.
    pub fn target_point(&self, x: f32, y: f32) -> (f32, f32) {
        let (cam, th) = (&self.camera, &self.target);
        let x = x.clamp(cam.min_x, cam.max_x);
        let y = y.clamp(cam.min_y, cam.max_y);

        let tx = remap(x, cam.min_x, cam.max_x, th.min_x, th.max_x);
        let ty = remap(y, cam.min_y, cam.max_y, th.min_y, th.max_y);

        (th.max_x - (tx - th.min_x), ty)
    }

    pub fn map(&self, x: f32, y: f32, game: GamePosition) -> Aim {
        let (target_x, target_y) = self.target_point(x, y);
        let dx = target_x - game.x;
        let dy = target_y - game.y;

        Aim {
            target_x,
            target_y,
            angle: ((-dy).atan2(dx) + TAU) % TAU,
            distance: (dx * dx + dy * dy).sqrt(),
        }
    }
}
