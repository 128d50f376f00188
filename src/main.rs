mod camera;
mod car_types;
mod controls;
mod game_logic;
mod hud;
mod race;
mod replay;
mod save;
mod title_screen;

use bevy::render::camera::{Projection, ScalingMode};
use bevy::{prelude::*, window::PresentMode};

use camera::{WIN_H, WIN_W};
use controls::RaceInput;
use game_logic::{drive_player, sync_vehicle_transforms, update_laps, RaceClock};
use race::{AudioCue, RaceConfig, RaceFinished, RacePhase};
use save::SaveManager;

#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GameState {
    #[default]
    Title,
    TrackSelect,
    Racing,
}

fn main() {
    App::new()
        .add_plugins(
            DefaultPlugins
                .set(ImagePlugin::default_nearest())
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Drift Dash".into(),
                        resolution: (WIN_W, WIN_H).into(),
                        present_mode: PresentMode::AutoVsync,
                        resizable: false,
                        ..default()
                    }),
                    ..default()
                }),
        )
        .insert_resource(ClearColor(Color::BLACK))
        .insert_resource(Time::<Fixed>::from_hz(60.0)) // one physics tick per frame at 60fps
        .init_state::<GameState>()
        .init_state::<RacePhase>()
        .add_event::<AudioCue>()
        .add_event::<RaceFinished>()
        .init_resource::<RaceConfig>()
        .init_resource::<SaveManager>()
        .init_resource::<RaceInput>()
        .add_systems(Startup, (camera_setup, load_key_bindings))
        .add_systems(OnEnter(GameState::Title), title_screen::setup_title_screen)
        .add_systems(OnExit(GameState::Title), title_screen::destroy_title_screen)
        .add_systems(OnEnter(GameState::TrackSelect), title_screen::setup_track_screen)
        .add_systems(OnExit(GameState::TrackSelect), title_screen::destroy_track_screen)
        .add_systems(
            Update,
            title_screen::check_for_title_input
                .run_if(in_state(GameState::Title).or(in_state(GameState::TrackSelect))),
        )
        .add_systems(
            OnEnter(GameState::Racing),
            (camera::reset_camera, hud::setup_hud, enter_countdown),
        )
        .add_systems(
            OnExit(GameState::Racing),
            (race::cleanup_race, hud::destroy_hud, camera::reset_camera),
        )
        .add_systems(OnEnter(RacePhase::Countdown), race::setup_race)
        .add_systems(
            Update,
            race::run_countdown.run_if(in_state(RacePhase::Countdown)),
        )
        .add_systems(
            FixedUpdate,
            (
                controls::read_race_input,
                drive_player,
                race::enforce_bounds,
                update_laps,
                race::record_replay,
                race::advance_ghost,
            )
                .chain()
                .run_if(in_state(RacePhase::Racing)),
        )
        // the car rolls out under friction after the finish line
        .add_systems(
            FixedUpdate,
            (controls::read_race_input, drive_player)
                .chain()
                .run_if(in_state(RacePhase::Finished)),
        )
        .add_systems(
            Update,
            (
                race::toggle_pause
                    .run_if(in_state(RacePhase::Countdown).or(in_state(RacePhase::Racing))),
                race::pause_menu_input.run_if(in_state(RacePhase::Paused)),
                race::race_over_input.run_if(in_state(RacePhase::Finished)),
                race::toggle_ghost_visibility.run_if(in_state(RacePhase::Racing)),
            ),
        )
        .add_systems(
            OnEnter(RacePhase::Finished),
            (race::settle_race, hud::spawn_finish_screen).chain(),
        )
        .add_systems(OnExit(RacePhase::Finished), hud::destroy_finish_screen)
        .add_systems(OnEnter(RacePhase::Paused), hud::spawn_pause_menu)
        .add_systems(OnExit(RacePhase::Paused), hud::destroy_pause_menu)
        .add_systems(
            Update,
            (
                sync_vehicle_transforms,
                camera::move_camera,
                hud::update_hud,
                hud::update_countdown_text,
            )
                .run_if(in_state(GameState::Racing).and(resource_exists::<RaceClock>)),
        )
        .add_systems(Update, (race::play_audio_cues, save::handle_race_finished))
        .run();
}

fn camera_setup(mut commands: Commands) {
    let mut projection = OrthographicProjection::default_2d();
    projection.scaling_mode = ScalingMode::WindowSize;
    projection.scale = 1.0;

    commands
        .spawn(Camera2d::default())
        .insert(Projection::Orthographic(projection));
}

fn load_key_bindings(mut commands: Commands, save: Res<SaveManager>) {
    commands.insert_resource(save.key_bindings());
}

fn enter_countdown(mut next_phase: ResMut<NextState<RacePhase>>) {
    next_phase.set(RacePhase::Countdown);
}
