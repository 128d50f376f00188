pub mod clock;
pub mod components;
pub mod constants;
pub mod lap_system;
pub mod physics;
pub mod track;

pub use clock::{CountdownPhase, RaceClock};
pub use components::{Car, GhostCar, PlayerControlled, Pose, Vehicle};
pub use constants::*;
pub use lap_system::{update_laps, LapCounter};
pub use physics::{drive_player, sync_vehicle_transforms};
pub use track::{load_track, TrackId, TrackInfo, TrackLayout, Zone, TRACKS};
