use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Recording continues this long past the personal best, so a run that just
/// misses the record still produces a complete log for comparison.
pub const REPLAY_GRACE: Duration = Duration::from_millis(500);

/// One simulation tick of a car's pose, as stored in a replay log.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReplayFrame {
    pub x: f32,
    pub y: f32,
    pub travel_angle: f32,
    pub facing_angle: f32,
}

impl ReplayFrame {
    /// Parses one CSV line. Older logs carried three fields (no facing
    /// angle); those render with the chassis aligned to the travel direction.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split(',');
        let x: f32 = fields.next()?.trim().parse().ok()?;
        let y: f32 = fields.next()?.trim().parse().ok()?;
        let travel_angle: f32 = fields.next()?.trim().parse().ok()?;
        let facing_angle: f32 = match fields.next() {
            Some(field) => field.trim().parse().ok()?,
            None => travel_angle,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            x,
            y,
            travel_angle,
            facing_angle,
        })
    }
}

/// Appends one pose per tick to a temporary per-race log file. The file is
/// either promoted to the personal-best replay or deleted when the race
/// settles.
pub struct ReplayWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ReplayWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn append(&mut self, frame: &ReplayFrame) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},{},{},{}",
            frame.x, frame.y, frame.travel_angle, frame.facing_angle
        )
    }

    /// Flushes and closes the log, returning its path for promotion.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        self.writer.flush()?;
        Ok(self.path)
    }

    /// Closes and deletes the log. Removal failure only costs disk space.
    pub fn discard(self) {
        let path = self.path;
        drop(self.writer);
        if let Err(err) = fs::remove_file(&path) {
            warn!("could not remove replay log {}: {err}", path.display());
        }
    }
}

/// A fully loaded replay, indexed by simulation tick. Loaded once at race
/// start so playback never touches the filesystem mid-race.
pub struct GhostReplay {
    frames: Vec<ReplayFrame>,
}

impl GhostReplay {
    /// Returns `None` if the file is missing or any line is malformed; a
    /// race without a ghost is a normal state, not an error.
    pub fn load(path: &Path) -> Option<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(_) => return None,
        };
        let mut frames = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("unreadable replay {}: {err}", path.display());
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match ReplayFrame::parse(&line) {
                Some(frame) => frames.push(frame),
                None => {
                    warn!("corrupt replay line in {}: {line}", path.display());
                    return None;
                }
            }
        }
        Some(Self { frames })
    }

    /// The pose at a given tick, or `None` once the ghost has finished.
    pub fn frame(&self, tick: usize) -> Option<&ReplayFrame> {
        self.frames.get(tick)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Record metadata stored beside the personal-best replay.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PersonalBest {
    /// Total race time in seconds.
    pub time: f64,
    pub car_type_index: usize,
    #[serde(default)]
    pub style_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_lap: Option<f64>,
}

/// Missing or corrupt metadata means no record is on file.
pub fn load_personal_best(path: &Path) -> Option<PersonalBest> {
    let file = File::open(path).ok()?;
    match serde_json::from_reader(BufReader::new(file)) {
        Ok(best) => Some(best),
        Err(err) => {
            warn!("corrupt personal best {}: {err}", path.display());
            None
        }
    }
}

fn write_personal_best(path: &Path, best: &PersonalBest) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), best)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// What the finished race achieved, for comparison against the record.
#[derive(Clone, Copy, Debug)]
pub struct RaceResult {
    pub total_time: Duration,
    pub fastest_lap: Option<Duration>,
    pub car_type_index: usize,
    pub style_index: usize,
}

fn beats(candidate: Option<Duration>, incumbent: Option<f64>) -> bool {
    match (candidate, incumbent) {
        (Some(lap), Some(best)) => lap.as_secs_f64() < best,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Settles the temporary log against the record, exactly once per race.
///
/// A new total record promotes the log to the personal-best replay and
/// rewrites the metadata. A fastest-lap-only record updates the metadata in
/// place. Anything else deletes the log. Returns the metadata now on file.
pub fn settle_record(
    writer: ReplayWriter,
    best_replay: &Path,
    metadata: &Path,
    result: &RaceResult,
    previous: Option<PersonalBest>,
) -> io::Result<Option<PersonalBest>> {
    let total = result.total_time.as_secs_f64();
    let new_total_record = previous.as_ref().is_none_or(|best| total < best.time);
    let previous_fastest = previous.as_ref().and_then(|best| best.fastest_lap);

    if new_total_record {
        let log_path = writer.finish()?;
        if let Some(parent) = best_replay.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&log_path, best_replay)?;
        let best = PersonalBest {
            time: total,
            car_type_index: result.car_type_index,
            style_index: result.style_index,
            fastest_lap: match (result.fastest_lap, previous_fastest) {
                (Some(lap), Some(old)) => Some(lap.as_secs_f64().min(old)),
                (Some(lap), None) => Some(lap.as_secs_f64()),
                (None, old) => old,
            },
        };
        write_personal_best(metadata, &best)?;
        info!("new track record: {total:.2}s");
        return Ok(Some(best));
    }

    writer.discard();
    if beats(result.fastest_lap, previous_fastest) {
        if let (Some(mut best), Some(lap)) = (previous.clone(), result.fastest_lap) {
            best.fastest_lap = Some(lap.as_secs_f64());
            write_personal_best(metadata, &best)?;
            info!("new fastest lap: {:.2}s", lap.as_secs_f64());
            return Ok(Some(best));
        }
    }
    Ok(previous)
}

pub fn current_log_path(file_stem: &str) -> PathBuf {
    PathBuf::from(format!("saves/{file_stem}_current.csv"))
}

pub fn best_replay_path(file_stem: &str) -> PathBuf {
    PathBuf::from(format!("saves/{file_stem}_best.csv"))
}

pub fn best_meta_path(file_stem: &str) -> PathBuf {
    PathBuf::from(format!("saves/{file_stem}_best.json"))
}

/// Shipped ghost replay for one of the difficulty tiers.
pub fn tier_ghost_path(file_stem: &str, tier_key: &str) -> PathBuf {
    PathBuf::from(format!("assets/ghosts/{file_stem}_{tier_key}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    fn frame(x: f32) -> ReplayFrame {
        ReplayFrame {
            x,
            y: 500.0,
            travel_angle: 0.0,
            facing_angle: 5.0,
        }
    }

    fn result(total: f64, fastest: Option<f64>) -> RaceResult {
        RaceResult {
            total_time: secs(total),
            fastest_lap: fastest.map(secs),
            car_type_index: 1,
            style_index: 2,
        }
    }

    #[test]
    fn parses_four_and_three_field_lines() {
        let full = ReplayFrame::parse("100.5,200.0,45.0,60.0").unwrap();
        assert_eq!(full.facing_angle, 60.0);
        let legacy = ReplayFrame::parse("100.5,200.0,45.0").unwrap();
        assert_eq!(legacy.facing_angle, 45.0);
        assert!(ReplayFrame::parse("1,2").is_none());
        assert!(ReplayFrame::parse("1,2,3,4,5").is_none());
        assert!(ReplayFrame::parse("1,oops,3,4").is_none());
    }

    #[test]
    fn written_log_plays_back_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let frames: Vec<ReplayFrame> = (0..120).map(|tick| frame(tick as f32)).collect();

        let mut writer = ReplayWriter::create(&path).unwrap();
        for frame in &frames {
            writer.append(frame).unwrap();
        }
        writer.finish().unwrap();

        let ghost = GhostReplay::load(&path).unwrap();
        assert_eq!(ghost.len(), 120);
        for (tick, expected) in frames.iter().enumerate() {
            assert_eq!(ghost.frame(tick), Some(expected));
        }
        assert_eq!(ghost.frame(120), None);
    }

    #[test]
    fn missing_or_corrupt_replay_loads_as_no_ghost() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GhostReplay::load(&dir.path().join("absent.csv")).is_none());

        let path = dir.path().join("bad.csv");
        fs::write(&path, "1,2,3,4\nnot,a,frame\n").unwrap();
        assert!(GhostReplay::load(&path).is_none());
    }

    #[test]
    fn discard_removes_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");
        let mut writer = ReplayWriter::create(&path).unwrap();
        writer.append(&frame(0.0)).unwrap();
        writer.discard();
        assert!(!path.exists());
    }

    #[test]
    fn faster_total_promotes_log_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("current.csv");
        let best_replay = dir.path().join("best.csv");
        let metadata = dir.path().join("best.json");
        fs::write(&best_replay, "0,0,0,0\n").unwrap();

        let mut writer = ReplayWriter::create(&log).unwrap();
        writer.append(&frame(7.0)).unwrap();
        let previous = PersonalBest {
            time: 60.0,
            car_type_index: 0,
            style_index: 0,
            fastest_lap: Some(19.0),
        };
        let settled = settle_record(
            writer,
            &best_replay,
            &metadata,
            &result(55.0, Some(20.0)),
            Some(previous),
        )
        .unwrap()
        .unwrap();

        assert!(!log.exists());
        let ghost = GhostReplay::load(&best_replay).unwrap();
        assert_eq!(ghost.frame(0), Some(&frame(7.0)));
        assert_eq!(settled.time, 55.0);
        assert_eq!(settled.car_type_index, 1);
        // old fastest lap survives a slower-lap record run
        assert_eq!(settled.fastest_lap, Some(19.0));
        assert_eq!(load_personal_best(&metadata), Some(settled));
    }

    #[test]
    fn slower_total_discards_log_and_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("current.csv");
        let best_replay = dir.path().join("best.csv");
        let metadata = dir.path().join("best.json");
        fs::write(&best_replay, "0,0,0,0\n").unwrap();
        let previous = PersonalBest {
            time: 60.0,
            car_type_index: 0,
            style_index: 0,
            fastest_lap: Some(19.0),
        };
        write_personal_best(&metadata, &previous).unwrap();

        let writer = ReplayWriter::create(&log).unwrap();
        let settled = settle_record(
            writer,
            &best_replay,
            &metadata,
            &result(65.0, Some(21.0)),
            Some(previous.clone()),
        )
        .unwrap();

        assert!(!log.exists());
        assert_eq!(settled, Some(previous.clone()));
        assert_eq!(load_personal_best(&metadata), Some(previous));
    }

    #[test]
    fn lap_only_record_updates_metadata_not_replay() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("current.csv");
        let best_replay = dir.path().join("best.csv");
        let metadata = dir.path().join("best.json");
        fs::write(&best_replay, "0,0,0,0\n").unwrap();
        let previous = PersonalBest {
            time: 60.0,
            car_type_index: 0,
            style_index: 0,
            fastest_lap: Some(19.0),
        };
        write_personal_best(&metadata, &previous).unwrap();

        let mut writer = ReplayWriter::create(&log).unwrap();
        writer.append(&frame(9.0)).unwrap();
        let settled = settle_record(
            writer,
            &best_replay,
            &metadata,
            &result(65.0, Some(17.5)),
            Some(previous),
        )
        .unwrap()
        .unwrap();

        assert!(!log.exists());
        assert_eq!(settled.time, 60.0);
        assert_eq!(settled.fastest_lap, Some(17.5));
        // the record replay is untouched
        let ghost = GhostReplay::load(&best_replay).unwrap();
        assert_eq!(ghost.len(), 1);
        assert_eq!(load_personal_best(&metadata), Some(settled));
    }

    #[test]
    fn first_finish_is_always_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("current.csv");
        let best_replay = dir.path().join("best.csv");
        let metadata = dir.path().join("best.json");

        let mut writer = ReplayWriter::create(&log).unwrap();
        writer.append(&frame(1.0)).unwrap();
        let settled = settle_record(
            writer,
            &best_replay,
            &metadata,
            &result(90.0, Some(29.0)),
            None,
        )
        .unwrap()
        .unwrap();

        assert_eq!(settled.time, 90.0);
        assert_eq!(settled.fastest_lap, Some(29.0));
        assert!(best_replay.exists());
    }
}
