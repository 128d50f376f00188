use bevy::prelude::*;

use crate::controls::RaceInput;
use crate::game_logic::{
    Car, GhostCar, PlayerControlled, TrackLayout, Vehicle, DRIFT_RECOVERY_SPEED, FRICTION,
    MAX_DRIFT_ANGLE, MIN_DRIFT_ANGLE,
};
use crate::race::RacePhase;

/// Decays a signed speed toward zero by `amount` without crossing zero.
fn decay_toward_zero(speed: f32, amount: f32) -> f32 {
    (speed.abs() - amount).max(0.0).copysign(speed)
}

/// Nudges travel_angle toward facing_angle by at most `step` degrees,
/// never overshooting past zero error.
fn recover_travel_angle(car: &mut Vehicle, step: f32) {
    let error = car.facing_angle - car.travel_angle;
    car.travel_angle += error.signum() * step.min(error.abs());
}

/// Converts one tick of input into updated speed and angles.
///
/// When the race is not active (countdown, or rolling out after the finish)
/// the car only decelerates and straightens; steering and throttle are ignored.
pub fn apply_input(car: &mut Vehicle, input: &RaceInput, is_race_active: bool) {
    if !is_race_active {
        car.speed = decay_toward_zero(car.speed, FRICTION);
        recover_travel_angle(car, 2.0 * DRIFT_RECOVERY_SPEED);
        return;
    }

    if input.forward {
        car.speed += car.acceleration;
    } else if input.backward {
        car.speed -= car.acceleration;
    } else {
        car.speed = decay_toward_zero(car.speed, FRICTION);
    }

    // Steering authority scales with speed: no turning at a standstill.
    let turn_factor = car.turn_speed * (car.speed / car.base_max_speed);
    if input.left {
        car.facing_angle -= turn_factor;
    }
    if input.right {
        car.facing_angle += turn_factor;
    }

    // The travel angle lags behind the facing angle. Holding the drift key
    // slows the recovery; a large error is snapped back to MAX_DRIFT_ANGLE.
    let error = car.facing_angle - car.travel_angle;
    car.is_drifting = error.abs() > MIN_DRIFT_ANGLE;

    let step = if error.abs() > MAX_DRIFT_ANGLE {
        error.abs() - MAX_DRIFT_ANGLE
    } else if input.drift {
        DRIFT_RECOVERY_SPEED
    } else {
        2.0 * DRIFT_RECOVERY_SPEED
    };
    car.travel_angle += error.signum() * step.min(error.abs());
}

/// Recomputes the speed cap from the off-road and drift state.
///
/// Off-road the cap tracks the current speed decaying toward half the
/// baseline, so the car slows down instead of snapping. Drifting compounds a
/// 10% allowance per tick up to twice the baseline.
pub fn set_max_speed(car: &mut Vehicle) {
    if car.is_off_road {
        car.max_speed = (car.speed - car.acceleration).max(car.base_max_speed * 0.5);
    } else if car.is_drifting {
        car.max_speed = (car.max_speed * 1.1).min(car.base_max_speed * 2.0);
    } else {
        car.max_speed = car.base_max_speed;
    }
}

/// Clamps speed to the current cap and integrates the position along the
/// travel angle (0 degrees = up, clockwise positive, +y down).
pub fn update_position(car: &mut Vehicle) {
    car.speed = car.speed.clamp(-car.max_speed / 2.0, car.max_speed);

    let rad = car.travel_angle.to_radians();
    car.x += rad.sin() * car.speed;
    car.y -= rad.cos() * car.speed;
}

/// Per-tick physics for the user car. Runs while racing and, with the
/// race inactive, while rolling to a stop after the finish line.
pub fn drive_player(
    phase: Res<State<RacePhase>>,
    track: Res<TrackLayout>,
    input: Res<RaceInput>,
    player: Single<&mut Vehicle, (With<PlayerControlled>, Without<GhostCar>)>,
) {
    let mut car = player.into_inner();
    let is_race_active = *phase.get() == RacePhase::Racing;

    car.is_off_road = track.is_off_road(car.x, car.y);
    apply_input(&mut car, &input, is_race_active);
    set_max_speed(&mut car);
    update_position(&mut car);
}

/// Mirrors each car's logical pose into its render transform.
pub fn sync_vehicle_transforms(
    track: Res<TrackLayout>,
    mut cars: Query<(&Vehicle, &mut Transform), With<Car>>,
) {
    for (car, mut transform) in cars.iter_mut() {
        let world = track.to_world(car.x, car.y);
        transform.translation.x = world.x;
        transform.translation.y = world.y;
        transform.rotation = Quat::from_rotation_z(-car.facing_angle.to_radians());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_logic::Pose;

    fn test_car() -> Vehicle {
        // base max speed 6, acceleration 0.2, turn speed 2.5
        Vehicle::new(6.0, 0.2, 2.5, Pose::new(100.0, 500.0, 0.0))
    }

    fn held(forward: bool, drift: bool) -> RaceInput {
        RaceInput {
            forward,
            drift,
            ..RaceInput::default()
        }
    }

    #[test]
    fn throttle_then_release_decays_by_friction() {
        let mut car = test_car();
        apply_input(&mut car, &held(true, false), true);
        assert_eq!(car.speed, 0.2);
        apply_input(&mut car, &RaceInput::default(), true);
        assert!((car.speed - 0.1).abs() < 1e-6);
    }

    #[test]
    fn friction_decay_stops_exactly_at_zero() {
        let mut car = test_car();
        car.speed = 0.25;
        for _ in 0..10 {
            apply_input(&mut car, &RaceInput::default(), false);
        }
        assert_eq!(car.speed, 0.0);
        // and stays there, no oscillation past zero
        apply_input(&mut car, &RaceInput::default(), false);
        assert_eq!(car.speed, 0.0);
    }

    #[test]
    fn drift_flag_set_past_min_angle() {
        let mut car = test_car();
        car.facing_angle = 200.0;
        car.travel_angle = 180.0;
        apply_input(&mut car, &held(false, true), true);
        assert!(car.is_drifting);
    }

    #[test]
    fn travel_angle_never_overshoots_facing() {
        let mut car = test_car();
        car.facing_angle = 1.0;
        car.travel_angle = 0.0;
        apply_input(&mut car, &RaceInput::default(), true);
        assert_eq!(car.travel_angle, 1.0);
    }

    #[test]
    fn large_angle_error_snaps_back_to_bound() {
        let mut car = test_car();
        car.facing_angle = 100.0;
        car.travel_angle = 0.0;
        apply_input(&mut car, &held(false, true), true);
        assert!((car.facing_angle - car.travel_angle).abs() <= MAX_DRIFT_ANGLE + 1e-4);
    }

    #[test]
    fn drift_bound_holds_under_sustained_steering() {
        let mut car = test_car();
        car.speed = 6.0;
        let input = RaceInput {
            forward: true,
            right: true,
            drift: true,
            ..RaceInput::default()
        };
        for _ in 0..600 {
            apply_input(&mut car, &input, true);
            let error = (car.facing_angle - car.travel_angle).abs();
            assert!(error <= MAX_DRIFT_ANGLE + car.turn_speed * 2.0 + 1e-3);
        }
    }

    #[test]
    fn speed_clamped_to_cap_after_update() {
        let mut car = test_car();
        let input = held(true, false);
        for _ in 0..300 {
            apply_input(&mut car, &input, true);
            set_max_speed(&mut car);
            update_position(&mut car);
            assert!(car.speed <= car.max_speed + 1e-6);
            assert!(car.speed >= -car.max_speed / 2.0 - 1e-6);
        }
    }

    #[test]
    fn reverse_capped_at_half_max() {
        let mut car = test_car();
        let input = RaceInput {
            backward: true,
            ..RaceInput::default()
        };
        for _ in 0..300 {
            apply_input(&mut car, &input, true);
            set_max_speed(&mut car);
            update_position(&mut car);
        }
        assert!((car.speed - -3.0).abs() < 1e-4);
    }

    #[test]
    fn off_road_cap_decays_toward_half_baseline() {
        let mut car = test_car();
        car.speed = 6.0;
        car.is_off_road = true;
        set_max_speed(&mut car);
        assert!((car.max_speed - 5.8).abs() < 1e-6);
        for _ in 0..100 {
            set_max_speed(&mut car);
            update_position(&mut car);
            car.speed = car.max_speed;
        }
        assert!((car.max_speed - 3.0).abs() < 1e-4);
    }

    #[test]
    fn drifting_cap_compounds_up_to_double() {
        let mut car = test_car();
        car.is_drifting = true;
        for _ in 0..100 {
            set_max_speed(&mut car);
        }
        assert!((car.max_speed - 12.0).abs() < 1e-4);
    }

    #[test]
    fn position_moves_north_at_angle_zero() {
        let mut car = test_car();
        car.speed = 2.0;
        car.max_speed = 6.0;
        update_position(&mut car);
        assert!((car.x - 100.0).abs() < 1e-4);
        assert!((car.y - 498.0).abs() < 1e-4);
    }

    #[test]
    fn respawn_restores_pose_and_zeroes_speed() {
        let mut car = test_car();
        car.set_respawn_point(250.0, 300.0, 180.0);
        car.x = 999.0;
        car.y = -50.0;
        car.speed = 5.0;
        car.facing_angle = 42.0;
        car.travel_angle = 17.0;
        car.respawn();
        assert_eq!((car.x, car.y), (250.0, 300.0));
        assert_eq!(car.speed, 0.0);
        assert_eq!(car.facing_angle, 180.0);
        assert_eq!(car.travel_angle, 180.0);
    }
}
