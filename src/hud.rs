use bevy::prelude::*;
use std::time::Duration;

use crate::game_logic::{LapCounter, RaceClock, TrackLayout};
use crate::race::{RaceRecords, ResumeTo};

#[derive(Component)]
pub struct HudRoot;

#[derive(Component)]
pub struct LapText;

#[derive(Component)]
pub struct TotalTimeText;

#[derive(Component)]
pub struct CurrentLapText;

#[derive(Component)]
pub struct SplitsText;

#[derive(Component)]
pub struct RecordText;

#[derive(Component)]
pub struct CountdownText;

#[derive(Component)]
pub struct PauseScreenEntity;

#[derive(Component)]
pub struct FinishScreenEntity;

/// MM:SS:cc, centiseconds truncated.
pub fn format_race_time(time: Duration) -> String {
    let total_cs = time.as_millis() / 10;
    let minutes = total_cs / 6000;
    let seconds = (total_cs / 100) % 60;
    let centis = total_cs % 100;
    format!("{minutes:02}:{seconds:02}:{centis:02}")
}

fn hud_font(size: f32) -> TextFont {
    TextFont {
        font_size: size,
        ..default()
    }
}

pub fn setup_hud(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: Val::Px(10.0),
                left: Val::Px(10.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(4.0),
                ..default()
            },
            HudRoot,
        ))
        .with_children(|parent| {
            parent.spawn((Text::new(""), hud_font(32.0), TextColor(Color::WHITE), LapText));
            parent.spawn((
                Text::new(""),
                hud_font(28.0),
                TextColor(Color::WHITE),
                TotalTimeText,
            ));
            parent.spawn((
                Text::new(""),
                hud_font(22.0),
                TextColor(Color::WHITE),
                CurrentLapText,
            ));
            parent.spawn((
                Text::new(""),
                hud_font(18.0),
                TextColor(Color::srgb(0.8, 0.8, 0.8)),
                SplitsText,
            ));
            parent.spawn((
                Text::new(""),
                hud_font(18.0),
                TextColor(Color::srgb(1.0, 0.85, 0.3)),
                RecordText,
            ));
        });

    // big centered text for the countdown
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            HudRoot,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                hud_font(96.0),
                TextColor(Color::WHITE),
                CountdownText,
            ));
        });
}

pub fn destroy_hud(mut commands: Commands, hud: Query<Entity, With<HudRoot>>) {
    for entity in hud.iter() {
        commands.entity(entity).despawn();
    }
}

pub fn update_hud(
    time: Res<Time<Real>>,
    clock: Res<RaceClock>,
    laps: Res<LapCounter>,
    track: Res<TrackLayout>,
    records: Res<RaceRecords>,
    mut lap_text: Single<&mut Text, (With<LapText>, Without<TotalTimeText>, Without<CurrentLapText>, Without<SplitsText>, Without<RecordText>)>,
    mut total_text: Single<&mut Text, (With<TotalTimeText>, Without<CurrentLapText>, Without<SplitsText>, Without<RecordText>)>,
    mut current_text: Single<&mut Text, (With<CurrentLapText>, Without<SplitsText>, Without<RecordText>)>,
    mut splits_text: Single<&mut Text, (With<SplitsText>, Without<RecordText>)>,
    mut record_text: Single<&mut Text, With<RecordText>>,
) {
    let now = time.elapsed();
    let shown_lap = laps.current_lap.min(track.laps_required);
    lap_text.0 = format!("Lap {shown_lap}/{}", track.laps_required);
    total_text.0 = format_race_time(clock.elapsed_race_time(now));

    current_text.0 = match clock.current_lap_time(now) {
        Some(lap) => format!("Lap time {}", format_race_time(lap)),
        None => String::new(),
    };

    splits_text.0 = clock
        .lap_times
        .iter()
        .enumerate()
        .map(|(index, split)| format!("Lap {}: {}", index + 1, format_race_time(*split)))
        .collect::<Vec<_>>()
        .join("\n");

    record_text.0 = match &records.best {
        Some(best) => {
            let mut line = format!(
                "Best {}",
                format_race_time(Duration::from_secs_f64(best.time))
            );
            if let Some(lap) = best.fastest_lap {
                line.push_str(&format!(
                    "  Fastest lap {}",
                    format_race_time(Duration::from_secs_f64(lap))
                ));
            }
            line
        }
        None => "No record yet".to_string(),
    };
}

pub fn update_countdown_text(
    time: Res<Time<Real>>,
    clock: Res<RaceClock>,
    mut text: Single<&mut Text, With<CountdownText>>,
) {
    text.0 = clock
        .countdown_label(time.elapsed())
        .unwrap_or("")
        .to_string();
}

pub fn spawn_pause_menu(mut commands: Commands, resume_to: Option<Res<ResumeTo>>) {
    let resuming = resume_to.is_some();
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(12.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.6)),
            PauseScreenEntity,
        ))
        .with_children(|parent| {
            parent.spawn((Text::new("Paused"), hud_font(64.0), TextColor(Color::WHITE)));
            let hint = if resuming {
                "Enter / Esc  resume\nR  retry\nQ  quit to title"
            } else {
                "R  retry\nQ  quit to title"
            };
            parent.spawn((Text::new(hint), hud_font(28.0), TextColor(Color::WHITE)));
        });
}

pub fn destroy_pause_menu(mut commands: Commands, screen: Query<Entity, With<PauseScreenEntity>>) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
}

pub fn spawn_finish_screen(
    mut commands: Commands,
    time: Res<Time<Real>>,
    clock: Res<RaceClock>,
    records: Res<RaceRecords>,
) {
    let total = clock.elapsed_race_time(time.elapsed());
    let mut lines = vec![format!("Finished!  {}", format_race_time(total))];
    if let Some(fastest) = clock.fastest_lap {
        lines.push(format!("Fastest lap {}", format_race_time(fastest)));
    }
    if let Some(best) = &records.best {
        if (best.time - total.as_secs_f64()).abs() < 1e-9 {
            lines.push("New track record!".to_string());
        } else {
            lines.push(format!(
                "Best {}",
                format_race_time(Duration::from_secs_f64(best.time))
            ));
        }
    }

    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(12.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
            FinishScreenEntity,
        ))
        .with_children(|parent| {
            for (index, line) in lines.iter().enumerate() {
                let size = if index == 0 { 56.0 } else { 30.0 };
                parent.spawn((Text::new(line.clone()), hud_font(size), TextColor(Color::WHITE)));
            }
            parent.spawn((
                Text::new("R  retry    Esc  title screen"),
                hud_font(24.0),
                TextColor(Color::srgb(0.8, 0.8, 0.8)),
            ));
        });
}

pub fn destroy_finish_screen(
    mut commands: Commands,
    screen: Query<Entity, With<FinishScreenEntity>>,
) {
    for entity in screen.iter() {
        commands.entity(entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_seconds_centiseconds() {
        assert_eq!(format_race_time(Duration::ZERO), "00:00:00");
        assert_eq!(format_race_time(Duration::from_millis(61_230)), "01:01:23");
        assert_eq!(format_race_time(Duration::from_millis(599_999)), "09:59:99");
        // centiseconds truncate, never round up
        assert_eq!(format_race_time(Duration::from_millis(1009)), "00:01:00");
    }
}
