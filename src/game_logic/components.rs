use bevy::prelude::*;

use crate::car_types::CarType;
use crate::replay::ReplayFrame;

#[derive(Component)]
pub struct Car;

#[derive(Component)]
pub struct PlayerControlled;

#[derive(Component)]
pub struct GhostCar;

/// A position plus a heading, in track coordinates (degrees, 0 = north,
/// clockwise positive).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl Pose {
    pub const fn new(x: f32, y: f32, angle: f32) -> Self {
        Self { x, y, angle }
    }
}

/// Kinematic state for one car. Positions live in track pixels with +y down;
/// the render transform is derived from this every frame.
#[derive(Component, Clone, Debug)]
pub struct Vehicle {
    pub x: f32,
    pub y: f32,
    /// Direction the chassis points.
    pub facing_angle: f32,
    /// Direction the car actually moves; lags behind facing_angle while drifting.
    pub travel_angle: f32,
    pub speed: f32,
    pub max_speed: f32,
    pub base_max_speed: f32,
    pub acceleration: f32,
    pub turn_speed: f32,
    pub is_off_road: bool,
    pub is_drifting: bool,
    respawn: Pose,
}

impl Vehicle {
    pub fn new(base_max_speed: f32, acceleration: f32, turn_speed: f32, start: Pose) -> Self {
        Self {
            x: start.x,
            y: start.y,
            facing_angle: start.angle,
            travel_angle: start.angle,
            speed: 0.0,
            max_speed: base_max_speed,
            base_max_speed,
            acceleration,
            turn_speed,
            is_off_road: false,
            is_drifting: false,
            respawn: start,
        }
    }

    pub fn from_stats(car_type: &CarType, start: Pose) -> Self {
        Self::new(
            car_type.base_max_speed(),
            car_type.acceleration(),
            car_type.turn_speed(),
            start,
        )
    }

    pub fn set_respawn_point(&mut self, x: f32, y: f32, angle: f32) {
        self.respawn = Pose::new(x, y, angle);
    }

    pub fn respawn_pose(&self) -> Pose {
        self.respawn
    }

    /// Resets the car to the last known respawn point.
    pub fn respawn(&mut self) {
        self.x = self.respawn.x;
        self.y = self.respawn.y;
        self.speed = 0.0;
        self.facing_angle = self.respawn.angle;
        self.travel_angle = self.respawn.angle;
    }

    /// The car's pose as one replay log record.
    pub fn frame(&self) -> ReplayFrame {
        ReplayFrame {
            x: self.x,
            y: self.y,
            travel_angle: self.travel_angle,
            facing_angle: self.facing_angle,
        }
    }
}
