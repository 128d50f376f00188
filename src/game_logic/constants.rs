// Simulation and physics timing
pub const SIM_TICK_HZ: f32 = 60.0; // one logical tick per rendered frame

// Base car parameters; per-car stats scale these (see car_types.rs)
pub const BASE_MAX_SPEED: f32 = 6.0;
pub const SPEED_STAT_MULTIPLIER: f32 = 0.5;
pub const BASE_ACCELERATION: f32 = 0.2;
pub const ACCEL_STAT_MULTIPLIER: f32 = 0.05;
pub const BASE_TURN_SPEED: f32 = 2.5;
pub const HANDLING_STAT_MULTIPLIER: f32 = 0.25;
pub const FRICTION: f32 = 0.1;

// Drift model, all angles in degrees
pub const MIN_DRIFT_ANGLE: f32 = 15.0;
pub const MAX_DRIFT_ANGLE: f32 = 80.0;
pub const DRIFT_RECOVERY_SPEED: f32 = 2.0;

// Rendering constants
pub const CAR_WIDTH: f32 = 20.0;
pub const CAR_HEIGHT: f32 = 40.0;
