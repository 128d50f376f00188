use bevy::prelude::*;

use crate::game_logic::{PlayerControlled, TrackLayout};

pub const WIN_W: f32 = 1280.;
pub const WIN_H: f32 = 720.;

/// Follows the user car, clamped so the view never leaves the track image.
pub fn move_camera(
    track: Res<TrackLayout>,
    player_car: Single<&Transform, With<PlayerControlled>>,
    mut camera: Single<&mut Transform, (With<Camera>, Without<PlayerControlled>)>,
) {
    let max = Vec3::new(
        (track.width / 2. - WIN_W / 2.).max(0.),
        (track.height / 2. - WIN_H / 2.).max(0.),
        0.,
    );
    let min = -max;

    let mut target = player_car.translation.clamp(min, max);

    // round to integers to prevent subpixel gaps
    target.x = target.x.round();
    target.y = target.y.round();

    camera.translation = target;
}

/// Menus render at the world origin.
pub fn reset_camera(mut camera: Single<&mut Transform, With<Camera>>) {
    camera.translation = Vec3::ZERO;
}
