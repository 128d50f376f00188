use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::controls::KeyBindings;
use crate::game_logic::TRACKS;
use crate::race::{GhostOpponent, RaceFinished};

const SAVE_FILE: &str = "saves/save_data.json";

/// Everything persisted between sessions. Key bindings are stored as
/// key-name strings so the file stays hand-editable.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SaveData {
    pub unlocked_tracks: Vec<usize>,
    #[serde(default)]
    pub key_bindings: Vec<(String, String)>,
    #[serde(default = "default_volume")]
    pub music_volume: f32,
    #[serde(default = "default_volume")]
    pub sfx_volume: f32,
}

fn default_volume() -> f32 {
    0.7
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            unlocked_tracks: vec![0],
            key_bindings: Vec::new(),
            music_volume: default_volume(),
            sfx_volume: default_volume(),
        }
    }
}

#[derive(Resource)]
pub struct SaveManager {
    path: PathBuf,
    pub data: SaveData,
}

impl Default for SaveManager {
    fn default() -> Self {
        Self::load_from(Path::new(SAVE_FILE))
    }
}

impl SaveManager {
    /// Missing or corrupt save data starts a fresh profile with the first
    /// track unlocked.
    pub fn load_from(path: &Path) -> Self {
        let data = match File::open(path) {
            Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
                Ok(data) => data,
                Err(err) => {
                    warn!("corrupt save data {}: {err}", path.display());
                    SaveData::default()
                }
            },
            Err(_) => SaveData::default(),
        };
        Self {
            path: path.to_path_buf(),
            data,
        }
    }

    pub fn write(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.data)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }

    pub fn is_unlocked(&self, track_index: usize) -> bool {
        self.data.unlocked_tracks.contains(&track_index)
    }

    /// Unlocks a track, returning true if it was newly unlocked.
    pub fn unlock(&mut self, track_index: usize) -> bool {
        if track_index >= TRACKS.len() || self.is_unlocked(track_index) {
            return false;
        }
        self.data.unlocked_tracks.push(track_index);
        self.data.unlocked_tracks.sort_unstable();
        true
    }

    pub fn key_bindings(&self) -> KeyBindings {
        if self.data.key_bindings.is_empty() {
            KeyBindings::default()
        } else {
            KeyBindings::from_names(&self.data.key_bindings)
        }
    }

    pub fn set_key_bindings(&mut self, bindings: &KeyBindings) {
        self.data.key_bindings = bindings.to_names();
    }
}

/// Beating a medium or hard tier ghost opens the next track in the registry.
pub fn track_unlocked_by(
    track_index: usize,
    ghost: GhostOpponent,
    total_time_s: f64,
    ghost_time_s: Option<f64>,
) -> Option<usize> {
    if !matches!(ghost, GhostOpponent::Medium | GhostOpponent::Hard) {
        return None;
    }
    let ghost_time = ghost_time_s?;
    if total_time_s < ghost_time && track_index + 1 < TRACKS.len() {
        Some(track_index + 1)
    } else {
        None
    }
}

pub fn handle_race_finished(
    mut finishes: EventReader<RaceFinished>,
    mut save: ResMut<SaveManager>,
) {
    for finish in finishes.read() {
        let track_index = finish.track as usize;
        let Some(next) = track_unlocked_by(
            track_index,
            finish.ghost,
            finish.total_time_s,
            finish.ghost_time_s,
        ) else {
            continue;
        };
        if save.unlock(next) {
            info!("unlocked track: {}", TRACKS[next].name);
            if let Err(err) = save.write() {
                warn!("could not write save data: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_save_starts_with_first_track() {
        let dir = tempfile::tempdir().unwrap();
        let save = SaveManager::load_from(&dir.path().join("absent.json"));
        assert!(save.is_unlocked(0));
        assert!(!save.is_unlocked(1));
    }

    #[test]
    fn corrupt_save_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, "{ not json").unwrap();
        let save = SaveManager::load_from(&path);
        assert_eq!(save.data.unlocked_tracks, vec![0]);
    }

    #[test]
    fn unlocks_persist_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        let mut save = SaveManager::load_from(&path);
        assert!(save.unlock(1));
        assert!(!save.unlock(1));
        save.write().unwrap();

        let reloaded = SaveManager::load_from(&path);
        assert!(reloaded.is_unlocked(1));
        assert!(!reloaded.is_unlocked(2));
    }

    #[test]
    fn only_medium_and_hard_ghosts_unlock() {
        assert_eq!(
            track_unlocked_by(0, GhostOpponent::Medium, 58.0, Some(60.0)),
            Some(1)
        );
        assert_eq!(
            track_unlocked_by(0, GhostOpponent::Hard, 58.0, Some(60.0)),
            Some(1)
        );
        assert_eq!(
            track_unlocked_by(0, GhostOpponent::Easy, 58.0, Some(60.0)),
            None
        );
        assert_eq!(
            track_unlocked_by(0, GhostOpponent::PersonalBest, 58.0, Some(60.0)),
            None
        );
        // losing to the ghost unlocks nothing
        assert_eq!(
            track_unlocked_by(0, GhostOpponent::Medium, 62.0, Some(60.0)),
            None
        );
        // last track has nothing after it
        assert_eq!(
            track_unlocked_by(2, GhostOpponent::Medium, 58.0, Some(60.0)),
            None
        );
    }
}
