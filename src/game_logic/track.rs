use bevy::prelude::*;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::game_logic::Pose;

// Surface codes used in the track mask files
pub const SURFACE_ROAD: u8 = 0;
pub const SURFACE_OFF_ROAD: u8 = 1;
pub const SURFACE_OUT_OF_BOUNDS: u8 = 2;

/// Axis-aligned rectangle in track coordinates, used for the checkpoint and
/// finish line trigger areas.
#[derive(Clone, Copy, Debug)]
pub struct Zone {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Zone {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackId {
    MeadowCircuit = 0,
    HarborRun = 1,
    DuneRally = 2,
}

pub struct TrackInfo {
    pub id: TrackId,
    pub name: &'static str,
    pub file_stem: &'static str,
    pub laps: u8,
    pub start: Pose,
    /// Where the car is put back after going out of bounds past the checkpoint.
    pub checkpoint_respawn: Pose,
    pub checkpoint: Zone,
    pub finish_line: Zone,
}

/// Shipped tracks in unlock order.
pub const TRACKS: &[TrackInfo] = &[
    TrackInfo {
        id: TrackId::MeadowCircuit,
        name: "Meadow Circuit",
        file_stem: "meadow_circuit",
        laps: 3,
        start: Pose::new(100.0, 500.0, 0.0),
        checkpoint_respawn: Pose::new(1260.0, 350.0, 180.0),
        checkpoint: Zone::new(1150.0, 330.0, 220.0, 40.0),
        finish_line: Zone::new(30.0, 430.0, 240.0, 40.0),
    },
    TrackInfo {
        id: TrackId::HarborRun,
        name: "Harbor Run",
        file_stem: "harbor_run",
        laps: 3,
        start: Pose::new(100.0, 500.0, 0.0),
        checkpoint_respawn: Pose::new(1260.0, 350.0, 180.0),
        checkpoint: Zone::new(1150.0, 330.0, 220.0, 40.0),
        finish_line: Zone::new(30.0, 430.0, 240.0, 40.0),
    },
    TrackInfo {
        id: TrackId::DuneRally,
        name: "Dune Rally",
        file_stem: "dune_rally",
        laps: 4,
        start: Pose::new(100.0, 500.0, 0.0),
        checkpoint_respawn: Pose::new(1260.0, 350.0, 180.0),
        checkpoint: Zone::new(1150.0, 330.0, 220.0, 40.0),
        finish_line: Zone::new(30.0, 430.0, 240.0, 40.0),
    },
];

impl TrackId {
    pub fn info(self) -> &'static TrackInfo {
        &TRACKS[self as usize]
    }
}

/// Immutable circuit definition: the surface mask plus the trigger zones.
/// Loaded once per race; only queried afterwards.
#[derive(Resource, Clone)]
pub struct TrackLayout {
    pub id: TrackId,
    pub width: f32,
    pub height: f32,
    cell: f32,
    mask: Vec<Vec<u8>>,
    pub laps_required: u8,
    pub start: Pose,
    pub checkpoint_respawn: Pose,
    pub checkpoint: Zone,
    pub finish_line: Zone,
}

impl TrackLayout {
    fn surface_at(&self, x: f32, y: f32) -> u8 {
        if x < 0.0 || y < 0.0 {
            return SURFACE_OUT_OF_BOUNDS;
        }
        let cx = (x / self.cell) as usize;
        let cy = (y / self.cell) as usize;
        match self.mask.get(cy).and_then(|row| row.get(cx)) {
            Some(&surface) => surface,
            // off the mask entirely counts as out of bounds
            None => SURFACE_OUT_OF_BOUNDS,
        }
    }

    pub fn is_off_road(&self, x: f32, y: f32) -> bool {
        self.surface_at(x, y) != SURFACE_ROAD
    }

    pub fn is_out_of_bounds(&self, x: f32, y: f32) -> bool {
        self.surface_at(x, y) == SURFACE_OUT_OF_BOUNDS
    }

    pub fn check_checkpoint(&self, x: f32, y: f32) -> bool {
        self.checkpoint.contains(x, y)
    }

    pub fn check_finish_line(&self, x: f32, y: f32) -> bool {
        self.finish_line.contains(x, y)
    }

    /// Track coordinates (top-left origin, +y down) to world coordinates
    /// (centered origin, +y up).
    pub fn to_world(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(x - self.width / 2.0, self.height / 2.0 - y)
    }
}

/// Loads a track mask file: a `width height cell` header line followed by
/// rows of hex surface digits.
pub fn load_track(id: TrackId) -> io::Result<TrackLayout> {
    let info = id.info();
    let path = format!("assets/tracks/{}.txt", info.file_stem);
    load_track_from_path(id, Path::new(&path))
}

fn bad_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

pub fn load_track_from_path(id: TrackId, path: &Path) -> io::Result<TrackLayout> {
    let info = id.info();
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = lines
        .next()
        .ok_or_else(|| bad_data("empty track file".into()))??;
    let parts: Vec<&str> = header.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(bad_data(format!("bad track header: {header}")));
    }
    let width: f32 = parts[0]
        .parse()
        .map_err(|_| bad_data(format!("bad track width: {}", parts[0])))?;
    let height: f32 = parts[1]
        .parse()
        .map_err(|_| bad_data(format!("bad track height: {}", parts[1])))?;
    let cell: f32 = parts[2]
        .parse()
        .map_err(|_| bad_data(format!("bad track cell size: {}", parts[2])))?;

    let mut mask: Vec<Vec<u8>> = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Vec<u8> = line
            .split_whitespace()
            .map(|s| {
                u8::from_str_radix(s, 16).map_err(|_| bad_data(format!("bad surface digit: {s}")))
            })
            .collect::<Result<_, _>>()?;
        mask.push(row);
    }
    if mask.is_empty() {
        return Err(bad_data("track file has no mask rows".into()));
    }

    Ok(TrackLayout {
        id,
        width,
        height,
        cell,
        mask,
        laps_required: info.laps,
        start: info.start,
        checkpoint_respawn: info.checkpoint_respawn,
        checkpoint: info.checkpoint,
        finish_line: info.finish_line,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_layout() -> TrackLayout {
        // 3x3 cells of 10px: out-of-bounds ring is only the top-left cell
        let mask = vec![vec![2, 1, 1], vec![1, 0, 0], vec![1, 0, 1]];
        TrackLayout {
            id: TrackId::MeadowCircuit,
            width: 30.0,
            height: 30.0,
            cell: 10.0,
            mask,
            laps_required: 3,
            start: Pose::new(15.0, 15.0, 0.0),
            checkpoint_respawn: Pose::new(25.0, 15.0, 180.0),
            checkpoint: Zone::new(20.0, 10.0, 10.0, 10.0),
            finish_line: Zone::new(10.0, 10.0, 10.0, 10.0),
        }
    }

    #[test]
    fn road_and_off_road_classification() {
        let track = test_layout();
        assert!(!track.is_off_road(15.0, 15.0));
        assert!(track.is_off_road(15.0, 5.0));
        assert!(track.is_off_road(5.0, 5.0));
        assert!(track.is_out_of_bounds(5.0, 5.0));
        assert!(!track.is_out_of_bounds(15.0, 5.0));
    }

    #[test]
    fn out_of_range_coordinates_fail_safe() {
        let track = test_layout();
        assert!(track.is_off_road(-1.0, 15.0));
        assert!(track.is_off_road(15.0, 1000.0));
        assert!(track.is_out_of_bounds(-1.0, 15.0));
        assert!(track.is_out_of_bounds(1000.0, 15.0));
    }

    #[test]
    fn zone_containment_is_half_open() {
        let zone = Zone::new(10.0, 10.0, 10.0, 10.0);
        assert!(zone.contains(10.0, 10.0));
        assert!(zone.contains(19.9, 19.9));
        assert!(!zone.contains(20.0, 15.0));
        assert!(!zone.contains(9.9, 15.0));
    }

    #[test]
    fn loads_mask_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "30 30 10").unwrap();
        writeln!(file, "2 2 2").unwrap();
        writeln!(file, "2 0 2").unwrap();
        writeln!(file, "2 1 2").unwrap();
        drop(file);

        let track = load_track_from_path(TrackId::MeadowCircuit, &path).unwrap();
        assert_eq!(track.width, 30.0);
        assert!(!track.is_off_road(15.0, 15.0));
        assert!(track.is_off_road(15.0, 25.0));
        assert!(!track.is_out_of_bounds(15.0, 25.0));
        assert!(track.is_out_of_bounds(5.0, 15.0));
    }

    #[test]
    fn rejects_corrupt_mask_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.txt");
        std::fs::write(&path, "30 30 10\n0 z 0\n").unwrap();
        assert!(load_track_from_path(TrackId::MeadowCircuit, &path).is_err());
    }
}
