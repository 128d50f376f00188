use bevy::prelude::*;
use std::time::Duration;

use crate::game_logic::{PlayerControlled, RaceClock, TrackLayout, Vehicle};
use crate::race::{AudioCue, RacePhase};

/// Lap progress for the live race. A finish-line crossing only counts once
/// the checkpoint has been touched on the current lap, so cutting the course
/// cannot score a lap.
#[derive(Resource, Debug)]
pub struct LapCounter {
    pub current_lap: u8,
    pub has_checkpoint: bool,
}

impl Default for LapCounter {
    fn default() -> Self {
        Self {
            current_lap: 1,
            has_checkpoint: false,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum LapEvent {
    None,
    Checkpoint,
    LapComplete { lap_time: Duration, is_final_next: bool },
    RaceFinished { lap_time: Duration },
}

/// Advances checkpoint/lap state from the car's current position. Crossing
/// the checkpoint also moves the respawn point forward; completing a lap
/// resets it to the start line.
pub fn advance_lap_state(
    laps: &mut LapCounter,
    clock: &mut RaceClock,
    track: &TrackLayout,
    car: &mut Vehicle,
    now: Duration,
) -> LapEvent {
    if track.check_checkpoint(car.x, car.y) && !laps.has_checkpoint {
        laps.has_checkpoint = true;
        let pose = track.checkpoint_respawn;
        car.set_respawn_point(pose.x, pose.y, pose.angle);
        return LapEvent::Checkpoint;
    }

    if laps.has_checkpoint && track.check_finish_line(car.x, car.y) {
        laps.has_checkpoint = false;
        let lap_time = clock.complete_lap(now);
        let start = track.start;
        car.set_respawn_point(start.x, start.y, start.angle);
        laps.current_lap += 1;

        if laps.current_lap > track.laps_required {
            clock.finish(now);
            return LapEvent::RaceFinished { lap_time };
        }
        return LapEvent::LapComplete {
            lap_time,
            is_final_next: laps.current_lap == track.laps_required,
        };
    }

    LapEvent::None
}

pub fn update_laps(
    time: Res<Time<Real>>,
    track: Res<TrackLayout>,
    mut laps: ResMut<LapCounter>,
    mut clock: ResMut<RaceClock>,
    mut next_phase: ResMut<NextState<RacePhase>>,
    mut cues: EventWriter<AudioCue>,
    player: Single<&mut Vehicle, With<PlayerControlled>>,
) {
    let mut car = player.into_inner();
    match advance_lap_state(&mut laps, &mut clock, &track, &mut car, time.elapsed()) {
        LapEvent::None => {}
        LapEvent::Checkpoint => {
            info!("checkpoint reached on lap {}", laps.current_lap);
        }
        LapEvent::LapComplete {
            lap_time,
            is_final_next,
        } => {
            info!(
                "lap {} complete in {:.2}s",
                laps.current_lap - 1,
                lap_time.as_secs_f64()
            );
            if is_final_next {
                cues.write(AudioCue::FinalLap);
            } else {
                cues.write(AudioCue::NextLap);
            }
        }
        LapEvent::RaceFinished { lap_time } => {
            info!("final lap in {:.2}s, race over", lap_time.as_secs_f64());
            next_phase.set(RacePhase::Finished);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_logic::{Pose, Zone};

    fn test_track() -> TrackLayout {
        let mut track =
            crate::game_logic::track::test_support::layout_with_mask(vec![vec![0; 40]; 40], 10.0);
        track.checkpoint = Zone::new(300.0, 100.0, 50.0, 50.0);
        track.finish_line = Zone::new(100.0, 100.0, 50.0, 50.0);
        track.laps_required = 2;
        track.start = Pose::new(110.0, 160.0, 0.0);
        track.checkpoint_respawn = Pose::new(310.0, 110.0, 180.0);
        track
    }

    fn test_car(track: &TrackLayout) -> Vehicle {
        Vehicle::new(6.0, 0.2, 2.5, track.start)
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn started_clock() -> RaceClock {
        let mut clock = RaceClock::start_countdown(ms(0));
        clock.countdown_phase(ms(3000));
        clock
    }

    #[test]
    fn finish_line_without_checkpoint_does_not_count() {
        let track = test_track();
        let mut laps = LapCounter::default();
        let mut clock = started_clock();
        let mut car = test_car(&track);
        car.x = 110.0;
        car.y = 110.0; // on the finish line, checkpoint not yet touched

        let event = advance_lap_state(&mut laps, &mut clock, &track, &mut car, ms(10_000));
        assert_eq!(event, LapEvent::None);
        assert_eq!(laps.current_lap, 1);
    }

    #[test]
    fn checkpoint_then_finish_scores_a_lap() {
        let track = test_track();
        let mut laps = LapCounter::default();
        let mut clock = started_clock();
        let mut car = test_car(&track);

        car.x = 310.0;
        car.y = 110.0;
        assert_eq!(
            advance_lap_state(&mut laps, &mut clock, &track, &mut car, ms(10_000)),
            LapEvent::Checkpoint
        );
        // respawn pose moved up to the checkpoint
        assert_eq!(car.respawn_pose(), track.checkpoint_respawn);

        car.x = 110.0;
        car.y = 110.0;
        let event = advance_lap_state(&mut laps, &mut clock, &track, &mut car, ms(40_000));
        assert_eq!(
            event,
            LapEvent::LapComplete {
                lap_time: ms(37_000),
                is_final_next: true,
            }
        );
        assert_eq!(laps.current_lap, 2);
        assert!(!laps.has_checkpoint);
        // respawn pose reset to the start line
        assert_eq!(car.respawn_pose(), track.start);
    }

    #[test]
    fn final_lap_finishes_the_race() {
        let track = test_track();
        let mut laps = LapCounter {
            current_lap: 2,
            has_checkpoint: true,
        };
        let mut clock = started_clock();
        clock.complete_lap(ms(40_000));
        let mut car = test_car(&track);
        car.x = 110.0;
        car.y = 110.0;

        let event = advance_lap_state(&mut laps, &mut clock, &track, &mut car, ms(75_000));
        assert_eq!(
            event,
            LapEvent::RaceFinished {
                lap_time: ms(35_000)
            }
        );
        assert!(clock.is_finished());
        assert_eq!(clock.elapsed_race_time(ms(99_000)), ms(72_000));
    }

    #[test]
    fn lingering_on_finish_line_scores_only_once() {
        let track = test_track();
        let mut laps = LapCounter {
            current_lap: 1,
            has_checkpoint: true,
        };
        let mut clock = started_clock();
        let mut car = test_car(&track);
        car.x = 110.0;
        car.y = 110.0;

        advance_lap_state(&mut laps, &mut clock, &track, &mut car, ms(40_000));
        let event = advance_lap_state(&mut laps, &mut clock, &track, &mut car, ms(40_016));
        assert_eq!(event, LapEvent::None);
        assert_eq!(laps.current_lap, 2);
    }
}
