use crate::game_logic::{
    ACCEL_STAT_MULTIPLIER, BASE_ACCELERATION, BASE_MAX_SPEED, BASE_TURN_SPEED,
    HANDLING_STAT_MULTIPLIER, SPEED_STAT_MULTIPLIER,
};

/// A selectable chassis. Stats are small integers; the physics constants
/// turn them into per-tick values.
pub struct CarType {
    pub name: &'static str,
    pub speed_stat: u8,
    pub accel_stat: u8,
    pub handling_stat: u8,
    /// Paint style names, indexed by the player's style choice.
    pub styles: &'static [&'static str],
}

impl CarType {
    pub fn base_max_speed(&self) -> f32 {
        BASE_MAX_SPEED + self.speed_stat as f32 * SPEED_STAT_MULTIPLIER
    }

    pub fn acceleration(&self) -> f32 {
        BASE_ACCELERATION + self.accel_stat as f32 * ACCEL_STAT_MULTIPLIER
    }

    pub fn turn_speed(&self) -> f32 {
        BASE_TURN_SPEED + self.handling_stat as f32 * HANDLING_STAT_MULTIPLIER
    }
}

pub const CAR_TYPES: &[CarType] = &[
    CarType {
        name: "Roadster",
        speed_stat: 1,
        accel_stat: 2,
        handling_stat: 2,
        styles: &["red", "blue", "yellow"],
    },
    CarType {
        name: "Muscle",
        speed_stat: 3,
        accel_stat: 1,
        handling_stat: 0,
        styles: &["black", "orange"],
    },
    CarType {
        name: "Kart",
        speed_stat: 0,
        accel_stat: 3,
        handling_stat: 3,
        styles: &["green", "white", "pink"],
    },
];

pub fn car_type(index: usize) -> &'static CarType {
    &CAR_TYPES[index % CAR_TYPES.len()]
}

/// Sprite path for a chassis and paint style pair.
pub fn car_sprite_path(type_index: usize, style_index: usize) -> String {
    let car = car_type(type_index);
    let style = car.styles[style_index % car.styles.len()];
    format!("cars/{}_{}.png", car.name.to_lowercase(), style)
}
