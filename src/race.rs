use bevy::audio::{PlaybackSettings, Volume};
use bevy::prelude::*;
use std::time::Duration;

use crate::car_types::car_sprite_path;
use crate::controls::RaceInput;
use crate::game_logic::{
    load_track, Car, CountdownPhase, GhostCar, LapCounter, PlayerControlled, RaceClock,
    TrackId, TrackLayout, Vehicle, CAR_HEIGHT, CAR_WIDTH, SIM_TICK_HZ,
};
use crate::replay::{
    best_meta_path, best_replay_path, current_log_path, load_personal_best, settle_record,
    tier_ghost_path, GhostReplay, PersonalBest, RaceResult, ReplayWriter, REPLAY_GRACE,
};
use crate::save::SaveManager;
use crate::GameState;

/// Race lifecycle. Paused is only reachable from Countdown and Racing, so a
/// finished race can never be paused.
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RacePhase {
    #[default]
    Idle,
    Countdown,
    Racing,
    Paused,
    Finished,
}

/// Which ghost the user races against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GhostOpponent {
    #[default]
    PersonalBest,
    Easy,
    Medium,
    Hard,
}

impl GhostOpponent {
    pub fn as_str(self) -> &'static str {
        match self {
            GhostOpponent::PersonalBest => "Personal Best",
            GhostOpponent::Easy => "Easy",
            GhostOpponent::Medium => "Medium",
            GhostOpponent::Hard => "Hard",
        }
    }

    /// File-name key for the shipped tier ghosts; the personal best has its
    /// own per-profile file.
    fn tier_key(self) -> Option<&'static str> {
        match self {
            GhostOpponent::PersonalBest => None,
            GhostOpponent::Easy => Some("easy"),
            GhostOpponent::Medium => Some("medium"),
            GhostOpponent::Hard => Some("hard"),
        }
    }

    pub fn next(self) -> Self {
        match self {
            GhostOpponent::PersonalBest => GhostOpponent::Easy,
            GhostOpponent::Easy => GhostOpponent::Medium,
            GhostOpponent::Medium => GhostOpponent::Hard,
            GhostOpponent::Hard => GhostOpponent::PersonalBest,
        }
    }
}

/// The menu choices a race is started with.
#[derive(Resource, Clone, Copy, Debug)]
pub struct RaceConfig {
    pub track: TrackId,
    pub car_type_index: usize,
    pub style_index: usize,
    pub ghost: GhostOpponent,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            track: TrackId::MeadowCircuit,
            car_type_index: 0,
            style_index: 0,
            ghost: GhostOpponent::PersonalBest,
        }
    }
}

/// Ghost playback for the current race. The whole replay sits in memory, so
/// advancing is just a cursor bump.
#[derive(Resource)]
pub struct GhostState {
    pub replay: Option<GhostReplay>,
    pub cursor: usize,
    pub visible: bool,
}

/// The in-flight replay log and the record it is racing against.
#[derive(Resource)]
pub struct RaceRecords {
    pub writer: Option<ReplayWriter>,
    pub best: Option<PersonalBest>,
    pub settled: bool,
}

/// Phase to return to when the pause menu closes.
#[derive(Resource)]
pub struct ResumeTo(pub RacePhase);

/// Discrete sound triggers; the audio system maps them to files.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    CountdownTick,
    Go,
    NextLap,
    FinalLap,
    Respawn,
    Applause,
}

/// Fired once when a race settles, for unlock progression.
#[derive(Event, Debug, Clone, Copy)]
pub struct RaceFinished {
    pub track: TrackId,
    pub total_time_s: f64,
    pub ghost: GhostOpponent,
    pub ghost_time_s: Option<f64>,
}

/// Everything spawned for one race, torn down together.
#[derive(Component)]
pub struct RaceEntity;

/// The looping background music entity for the current race.
#[derive(Component)]
pub struct RaceMusic;

fn ghost_replay_for(config: &RaceConfig) -> Option<GhostReplay> {
    let stem = config.track.info().file_stem;
    let path = match config.ghost.tier_key() {
        Some(key) => tier_ghost_path(stem, key),
        None => best_replay_path(stem),
    };
    GhostReplay::load(&path)
}

/// Builds the whole race scene: track, cars, clock, lap counter, ghost and
/// replay log. Runs on every countdown entry, so retrying rebuilds from
/// scratch.
pub fn setup_race(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    config: Res<RaceConfig>,
    time: Res<Time<Real>>,
    mut next_phase: ResMut<NextState<RacePhase>>,
    mut next_game: ResMut<NextState<GameState>>,
    leftovers: Query<Entity, With<RaceEntity>>,
) {
    for entity in leftovers.iter() {
        commands.entity(entity).despawn();
    }

    let info = config.track.info();
    let track = match load_track(config.track) {
        Ok(track) => track,
        Err(err) => {
            warn!("could not load track {}: {err}", info.name);
            next_phase.set(RacePhase::Idle);
            next_game.set(GameState::Title);
            return;
        }
    };

    let start = track.start;
    let world = track.to_world(start.x, start.y);
    commands.spawn((
        Sprite {
            image: asset_server.load(car_sprite_path(config.car_type_index, config.style_index)),
            custom_size: Some(Vec2::new(CAR_WIDTH, CAR_HEIGHT)),
            ..default()
        },
        Transform::from_xyz(world.x, world.y, 2.0),
        Vehicle::from_stats(crate::car_types::car_type(config.car_type_index), start),
        Car,
        PlayerControlled,
        RaceEntity,
    ));

    let replay = ghost_replay_for(&config);
    if replay.is_some() {
        commands.spawn((
            Sprite {
                image: asset_server.load("cars/ghost.png"),
                custom_size: Some(Vec2::new(CAR_WIDTH, CAR_HEIGHT)),
                color: Color::srgba(1.0, 1.0, 1.0, 0.5),
                ..default()
            },
            Transform::from_xyz(world.x, world.y, 1.0),
            Car,
            GhostCar,
            RaceEntity,
        ));
    } else {
        info!("no ghost available for {} ({})", info.name, config.ghost.as_str());
    }

    let stem = info.file_stem;
    let writer = match ReplayWriter::create(&current_log_path(stem)) {
        Ok(writer) => Some(writer),
        Err(err) => {
            warn!("replay recording disabled: {err}");
            None
        }
    };

    commands.insert_resource(track);
    commands.insert_resource(RaceClock::start_countdown(time.elapsed()));
    commands.insert_resource(LapCounter::default());
    commands.insert_resource(GhostState {
        replay,
        cursor: 0,
        visible: true,
    });
    commands.insert_resource(RaceRecords {
        writer,
        best: load_personal_best(&best_meta_path(stem)),
        settled: false,
    });
    commands.insert_resource(RaceInput::default());
}

/// Steps the countdown display, firing a tick cue per phase change and the
/// transition to Racing on "Go!".
pub fn run_countdown(
    time: Res<Time<Real>>,
    mut clock: ResMut<RaceClock>,
    mut next_phase: ResMut<NextState<RacePhase>>,
    mut cues: EventWriter<AudioCue>,
    mut last_phase: Local<Option<CountdownPhase>>,
) {
    let phase = clock.countdown_phase(time.elapsed());
    if *last_phase == Some(phase) {
        return;
    }
    *last_phase = Some(phase);
    match phase {
        CountdownPhase::Three | CountdownPhase::Two | CountdownPhase::One => {
            cues.write(AudioCue::CountdownTick);
        }
        CountdownPhase::Go | CountdownPhase::Done => {
            cues.write(AudioCue::Go);
            next_phase.set(RacePhase::Racing);
        }
    }
}

/// Hard out-of-bounds correction: put the car back at its respawn point.
pub fn enforce_bounds(
    track: Res<TrackLayout>,
    mut cues: EventWriter<AudioCue>,
    player: Single<&mut Vehicle, With<PlayerControlled>>,
) {
    let mut car = player.into_inner();
    if track.is_out_of_bounds(car.x, car.y) {
        car.respawn();
        cues.write(AudioCue::Respawn);
    }
}

/// Appends the current pose to the replay log while the run can still beat
/// the record (plus a grace margin).
pub fn record_replay(
    time: Res<Time<Real>>,
    clock: Res<RaceClock>,
    mut records: ResMut<RaceRecords>,
    player: Single<&Vehicle, With<PlayerControlled>>,
) {
    let records = &mut *records;
    let Some(writer) = records.writer.as_mut() else {
        return;
    };
    let elapsed = clock.elapsed_race_time(time.elapsed());
    let still_in_contention = records
        .best
        .as_ref()
        .is_none_or(|best| elapsed <= Duration::from_secs_f64(best.time) + REPLAY_GRACE);
    if !still_in_contention {
        return;
    }
    if let Err(err) = writer.append(&player.frame()) {
        warn!("replay recording stopped: {err}");
        if let Some(writer) = records.writer.take() {
            writer.discard();
        }
    }
}

/// Moves the ghost to its recorded pose for this tick, exactly once per tick.
/// Past the end of the replay the ghost has finished and disappears.
pub fn advance_ghost(
    track: Res<TrackLayout>,
    mut ghost: ResMut<GhostState>,
    mut sprites: Query<(&mut Transform, &mut Visibility), With<GhostCar>>,
) {
    let Some(replay) = ghost.replay.as_ref() else {
        return;
    };
    let frame = replay.frame(ghost.cursor).copied();
    ghost.cursor += 1;

    for (mut transform, mut visibility) in sprites.iter_mut() {
        match frame {
            Some(frame) if ghost.visible => {
                let world = track.to_world(frame.x, frame.y);
                transform.translation.x = world.x;
                transform.translation.y = world.y;
                transform.rotation = Quat::from_rotation_z(-frame.facing_angle.to_radians());
                *visibility = Visibility::Inherited;
            }
            _ => *visibility = Visibility::Hidden,
        }
    }
}

/// G toggles ghost display without affecting playback position.
pub fn toggle_ghost_visibility(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut ghost: ResMut<GhostState>,
) {
    if keyboard.just_pressed(KeyCode::KeyG) {
        ghost.visible = !ghost.visible;
    }
}

/// Escape during countdown or racing opens the pause menu, freezing the
/// clock and the music.
pub fn toggle_pause(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time<Real>>,
    phase: Res<State<RacePhase>>,
    mut clock: ResMut<RaceClock>,
    mut next_phase: ResMut<NextState<RacePhase>>,
    mut commands: Commands,
    music: Query<&AudioSink, With<RaceMusic>>,
) {
    if !keyboard.just_pressed(KeyCode::Escape) {
        return;
    }
    clock.pause(time.elapsed());
    commands.insert_resource(ResumeTo(*phase.get()));
    next_phase.set(RacePhase::Paused);
    for sink in music.iter() {
        sink.pause();
    }
}

/// Pause menu: Escape/Enter resume, R retries, Q quits to the title screen.
pub fn pause_menu_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    time: Res<Time<Real>>,
    resume_to: Res<ResumeTo>,
    mut clock: ResMut<RaceClock>,
    mut records: ResMut<RaceRecords>,
    mut next_phase: ResMut<NextState<RacePhase>>,
    mut next_game: ResMut<NextState<GameState>>,
    music: Query<&AudioSink, With<RaceMusic>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) || keyboard.just_pressed(KeyCode::Enter) {
        clock.resume(time.elapsed());
        next_phase.set(resume_to.0);
        for sink in music.iter() {
            sink.play();
        }
    } else if keyboard.just_pressed(KeyCode::KeyR) {
        if let Some(writer) = records.writer.take() {
            writer.discard();
        }
        next_phase.set(RacePhase::Countdown);
    } else if keyboard.just_pressed(KeyCode::KeyQ) {
        if let Some(writer) = records.writer.take() {
            writer.discard();
        }
        next_phase.set(RacePhase::Idle);
        next_game.set(GameState::Title);
    }
}

/// Promotes or discards the replay log against the record, exactly once,
/// and reports the finish for unlock progression.
pub fn settle_race(
    time: Res<Time<Real>>,
    clock: Res<RaceClock>,
    config: Res<RaceConfig>,
    ghost: Res<GhostState>,
    mut records: ResMut<RaceRecords>,
    mut cues: EventWriter<AudioCue>,
    mut finishes: EventWriter<RaceFinished>,
) {
    if records.settled {
        return;
    }
    records.settled = true;
    cues.write(AudioCue::Applause);

    let total_time = clock.elapsed_race_time(time.elapsed());
    let stem = config.track.info().file_stem;
    if let Some(writer) = records.writer.take() {
        let result = RaceResult {
            total_time,
            fastest_lap: clock.fastest_lap,
            car_type_index: config.car_type_index,
            style_index: config.style_index,
        };
        match settle_record(
            writer,
            &best_replay_path(stem),
            &best_meta_path(stem),
            &result,
            records.best.clone(),
        ) {
            Ok(best) => records.best = best,
            Err(err) => warn!("could not settle race record: {err}"),
        }
    }

    finishes.write(RaceFinished {
        track: config.track,
        total_time_s: total_time.as_secs_f64(),
        ghost: config.ghost,
        ghost_time_s: ghost
            .replay
            .as_ref()
            .map(|replay| replay.len() as f64 / SIM_TICK_HZ as f64),
    });
}

/// Race-over menu: R retries, Escape/Q back to the title screen.
pub fn race_over_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut next_phase: ResMut<NextState<RacePhase>>,
    mut next_game: ResMut<NextState<GameState>>,
) {
    if keyboard.just_pressed(KeyCode::KeyR) {
        next_phase.set(RacePhase::Countdown);
    } else if keyboard.just_pressed(KeyCode::Escape) || keyboard.just_pressed(KeyCode::KeyQ) {
        next_phase.set(RacePhase::Idle);
        next_game.set(GameState::Title);
    }
}

/// Tears down everything a race spawned. An unsettled replay log at this
/// point means the user quit mid-race, so it is deleted.
pub fn cleanup_race(
    mut commands: Commands,
    records: Option<ResMut<RaceRecords>>,
    leftovers: Query<Entity, With<RaceEntity>>,
) {
    if let Some(mut records) = records {
        if let Some(writer) = records.writer.take() {
            writer.discard();
        }
    }
    for entity in leftovers.iter() {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<TrackLayout>();
    commands.remove_resource::<RaceClock>();
    commands.remove_resource::<LapCounter>();
    commands.remove_resource::<GhostState>();
    commands.remove_resource::<RaceRecords>();
}

/// Maps cue events onto sound files. One-shots despawn themselves; the race
/// loop swaps to the fast variant on the final lap and stops for applause.
pub fn play_audio_cues(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    save: Res<SaveManager>,
    mut cues: EventReader<AudioCue>,
    music: Query<Entity, With<RaceMusic>>,
) {
    let sfx = Volume::Linear(save.data.sfx_volume);
    let music_volume = Volume::Linear(save.data.music_volume);
    for cue in cues.read() {
        let one_shot = match cue {
            AudioCue::CountdownTick => Some("sounds/countdown_tick.ogg"),
            AudioCue::Go => Some("sounds/countdown_go.ogg"),
            AudioCue::NextLap => Some("sounds/lap_chime.ogg"),
            AudioCue::Respawn => Some("sounds/respawn.ogg"),
            AudioCue::FinalLap => None,
            AudioCue::Applause => Some("sounds/applause.ogg"),
        };
        if let Some(path) = one_shot {
            commands.spawn((
                AudioPlayer::new(asset_server.load(path)),
                PlaybackSettings::DESPAWN.with_volume(sfx),
            ));
        }
        match cue {
            AudioCue::Go => {
                commands.spawn((
                    AudioPlayer::new(asset_server.load("sounds/race_loop.ogg")),
                    PlaybackSettings::LOOP.with_volume(music_volume),
                    RaceMusic,
                    RaceEntity,
                ));
            }
            AudioCue::FinalLap => {
                for entity in music.iter() {
                    commands.entity(entity).despawn();
                }
                commands.spawn((
                    AudioPlayer::new(asset_server.load("sounds/race_loop_fast.ogg")),
                    PlaybackSettings::LOOP.with_volume(music_volume),
                    RaceMusic,
                    RaceEntity,
                ));
            }
            AudioCue::Applause => {
                for entity in music.iter() {
                    commands.entity(entity).despawn();
                }
            }
            _ => {}
        }
    }
}
