use bevy::prelude::*;

use crate::car_types::{car_type, CAR_TYPES};
use crate::game_logic::TRACKS;
use crate::race::RaceConfig;
use crate::save::SaveManager;
use crate::GameState;

#[derive(Component)]
pub struct MainScreenEntity;

#[derive(Component)]
pub struct TrackScreenEntity;

#[derive(Component)]
pub struct TitleScreenAudio;

#[derive(Component)]
pub struct CarChoiceText;

#[derive(Component)]
pub struct StyleChoiceText;

#[derive(Component)]
pub struct GhostChoiceText;

fn car_label(config: &RaceConfig) -> String {
    format!("[C] Car: {}", car_type(config.car_type_index).name)
}

fn style_label(config: &RaceConfig) -> String {
    let car = car_type(config.car_type_index);
    format!(
        "[V] Style: {}",
        car.styles[config.style_index % car.styles.len()]
    )
}

fn ghost_label(config: &RaceConfig) -> String {
    format!("[B] Ghost: {}", config.ghost.as_str())
}

fn menu_text(
    label: String,
    size: f32,
    y: f32,
    color: Color,
) -> (Text2d, TextColor, TextFont, Transform) {
    (
        Text2d::new(label),
        TextColor(color),
        TextFont {
            font_size: size,
            ..default()
        },
        Transform::from_xyz(0., y, 1.),
    )
}

pub fn setup_title_screen(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    config: Res<RaceConfig>,
) {
    commands.spawn((
        AudioPlayer::new(asset_server.load("sounds/title_theme.ogg")),
        PlaybackSettings::LOOP,
        TitleScreenAudio,
        MainScreenEntity,
    ));

    commands.spawn((menu_text("DRIFT DASH".into(), 90.0, 200., Color::WHITE), MainScreenEntity));
    commands.spawn((menu_text(car_label(&config), 36.0, 40., Color::WHITE), CarChoiceText, MainScreenEntity));
    commands.spawn((menu_text(style_label(&config), 36.0, -20., Color::WHITE), StyleChoiceText, MainScreenEntity));
    commands.spawn((menu_text(ghost_label(&config), 36.0, -80., Color::WHITE), GhostChoiceText, MainScreenEntity));

    commands.spawn((
        menu_text(
            "Enter: choose a track".into(),
            40.0,
            -220.,
            Color::srgb(1.0, 0.85, 0.3),
        ),
        MainScreenEntity,
    ));
}

pub fn destroy_title_screen(mut commands: Commands, screen: Query<Entity, With<MainScreenEntity>>) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
}

pub fn setup_track_screen(mut commands: Commands, save: Res<SaveManager>) {
    commands.spawn((menu_text("SELECT TRACK".into(), 64.0, 220., Color::WHITE), TrackScreenEntity));

    for (index, track) in TRACKS.iter().enumerate() {
        let unlocked = save.is_unlocked(index);
        let label = if unlocked {
            format!("[{}] {}  ({} laps)", index + 1, track.name, track.laps)
        } else {
            format!("[{}] {}  (locked)", index + 1, track.name)
        };
        let color = if unlocked {
            Color::WHITE
        } else {
            Color::srgb(0.5, 0.5, 0.5)
        };
        commands.spawn((
            menu_text(label, 40.0, 80. - 80. * index as f32, color),
            TrackScreenEntity,
        ));
    }

    commands.spawn((
        menu_text("Esc: back".into(), 28.0, -240., Color::srgb(0.7, 0.7, 0.7)),
        TrackScreenEntity,
    ));
}

pub fn destroy_track_screen(mut commands: Commands, screen: Query<Entity, With<TrackScreenEntity>>) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
}

pub fn check_for_title_input(
    input: Res<ButtonInput<KeyCode>>,
    current_state: Res<State<GameState>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut config: ResMut<RaceConfig>,
    save: Res<SaveManager>,
    mut car_text: Query<
        &mut Text2d,
        (With<CarChoiceText>, Without<StyleChoiceText>, Without<GhostChoiceText>),
    >,
    mut style_text: Query<&mut Text2d, (With<StyleChoiceText>, Without<GhostChoiceText>)>,
    mut ghost_text: Query<&mut Text2d, (With<GhostChoiceText>, Without<StyleChoiceText>)>,
) {
    match *current_state.get() {
        GameState::Title => {
            if input.just_pressed(KeyCode::KeyC) {
                config.car_type_index = (config.car_type_index + 1) % CAR_TYPES.len();
                config.style_index = 0;
                if let Ok(mut text) = car_text.single_mut() {
                    text.0 = car_label(&config);
                }
                if let Ok(mut text) = style_text.single_mut() {
                    text.0 = style_label(&config);
                }
            } else if input.just_pressed(KeyCode::KeyV) {
                let styles = car_type(config.car_type_index).styles.len();
                config.style_index = (config.style_index + 1) % styles;
                if let Ok(mut text) = style_text.single_mut() {
                    text.0 = style_label(&config);
                }
            } else if input.just_pressed(KeyCode::KeyB) {
                config.ghost = config.ghost.next();
                if let Ok(mut text) = ghost_text.single_mut() {
                    text.0 = ghost_label(&config);
                }
            } else if input.just_pressed(KeyCode::Enter) {
                next_state.set(GameState::TrackSelect);
            }
        }
        GameState::TrackSelect => {
            let picks = [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3];
            for (index, key) in picks.iter().enumerate().take(TRACKS.len()) {
                if input.just_pressed(*key) {
                    if save.is_unlocked(index) {
                        config.track = TRACKS[index].id;
                        next_state.set(GameState::Racing);
                    } else {
                        info!("{} is still locked", TRACKS[index].name);
                    }
                }
            }
            if input.just_pressed(KeyCode::Escape) {
                next_state.set(GameState::Title);
            }
        }
        _ => {}
    }
}
