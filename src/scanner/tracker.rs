//! 时序确认：同一位置、同一标签在窗口内多次出现才算确认

use std::collections::{HashMap, VecDeque};

use log::debug;

use super::config::PipelineConfig;
use super::detector::Detection;

/// Label plus the bbox origin snapped to a coarse grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub label: String,
    pub cell_x: i32,
    pub cell_y: i32,
}

impl TrackKey {
    pub fn for_detection(detection: &Detection, grid: f32) -> Self {
        Self {
            label: detection.label.clone(),
            cell_x: (detection.bbox.x * grid).round() as i32,
            cell_y: (detection.bbox.y * grid).round() as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Unconfirmed,
    /// Sticky until the entry is evicted.
    Confirmed,
}

#[derive(Debug, Clone)]
pub struct TrackEntry {
    pub id: u64,
    pub state: TrackState,
    /// Frame indices, oldest first.
    pub sightings: VecDeque<u64>,
    pub last: Detection,
}

impl TrackEntry {
    fn newest(&self) -> Option<u64> {
        self.sightings.back().copied()
    }
}

pub struct TemporalTracker {
    window: u64,
    confirmations: usize,
    grid: f32,
    tracks: HashMap<TrackKey, TrackEntry>,
    next_track_id: u64,
}

impl TemporalTracker {
    pub fn new(window: u64, confirmations: usize, grid: f32) -> Self {
        Self {
            window,
            confirmations,
            grid,
            tracks: HashMap::new(),
            next_track_id: 0,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.temporal_window,
            config.temporal_confirmations,
            config.track_grid,
        )
    }

    /// Pick up new thresholds; existing tracks are kept.
    pub fn reconfigure(&mut self, config: &PipelineConfig) {
        self.window = config.temporal_window;
        self.confirmations = config.temporal_confirmations;
        self.grid = config.track_grid;
    }

    /// Sweep, then record this frame's detections and flag the confirmed ones.
    ///
    /// Stale entries go first so a sighting after a gap starts a fresh track.
    /// Every detection comes back with its `track_id` set.
    pub fn update(&mut self, frame_index: u64, detections: Vec<Detection>) -> Vec<Detection> {
        self.sweep(frame_index);
        let mut out = Vec::with_capacity(detections.len());

        for mut det in detections {
            let key = TrackKey::for_detection(&det, self.grid);
            let next_id = &mut self.next_track_id;
            let entry = self.tracks.entry(key).or_insert_with(|| {
                *next_id += 1;
                TrackEntry {
                    id: *next_id,
                    state: TrackState::Unconfirmed,
                    sightings: VecDeque::new(),
                    last: det.clone(),
                }
            });

            // a bucket counts once per frame
            if entry.newest() != Some(frame_index) {
                entry.sightings.push_back(frame_index);
            }
            while let Some(&oldest) = entry.sightings.front() {
                if frame_index.saturating_sub(oldest) > self.window {
                    entry.sightings.pop_front();
                } else {
                    break;
                }
            }
            if entry.sightings.len() >= self.confirmations {
                entry.state = TrackState::Confirmed;
            }

            det.confirmed = entry.state == TrackState::Confirmed;
            det.track_id = Some(entry.id);
            entry.last = det.clone();
            out.push(det);
        }
        out
    }

    /// Evict entries whose newest sighting fell out of the window.
    pub fn sweep(&mut self, frame_index: u64) {
        let window = self.window;
        let before = self.tracks.len();
        self.tracks.retain(|_, entry| {
            entry
                .newest()
                .map(|newest| frame_index.saturating_sub(newest) <= window)
                .unwrap_or(false)
        });
        let evicted = before - self.tracks.len();
        if evicted > 0 {
            debug!("🧹 Evicted {} stale tracks at frame {}", evicted, frame_index);
        }
    }

    pub fn get(&self, key: &TrackKey) -> Option<&TrackEntry> {
        self.tracks.get(key)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::NormBox;

    fn det(label: &str, x: f32, y: f32) -> Detection {
        Detection {
            id: 0,
            label: label.to_string(),
            score: 0.8,
            bbox: NormBox::new(x, y, 0.1, 0.1),
            confirmed: false,
            track_id: None,
        }
    }

    #[test]
    fn test_confirms_on_second_sighting() {
        let mut tracker = TemporalTracker::new(4, 2, 20.0);

        let first = tracker.update(1, vec![det("wally", 0.30, 0.40)]);
        assert!(!first[0].confirmed);

        // jitter inside the same grid cell
        let second = tracker.update(2, vec![det("wally", 0.31, 0.41)]);
        assert!(second[0].confirmed);
        assert_eq!(first[0].track_id, second[0].track_id);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_label_and_cell_separate_tracks() {
        let mut tracker = TemporalTracker::new(4, 2, 20.0);
        tracker.update(1, vec![det("wally", 0.3, 0.4), det("odlaw", 0.3, 0.4)]);
        let out = tracker.update(2, vec![det("wally", 0.6, 0.4), det("odlaw", 0.3, 0.4)]);

        assert!(!out[0].confirmed);
        assert!(out[1].confirmed);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_stale_entry_evicted() {
        let mut tracker = TemporalTracker::new(4, 2, 20.0);
        tracker.update(1, vec![det("wally", 0.3, 0.4)]);

        tracker.update(5, Vec::new());
        assert_eq!(tracker.len(), 1);

        tracker.update(6, Vec::new());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_sightings_outside_window_do_not_count() {
        let mut tracker = TemporalTracker::new(4, 2, 20.0);
        tracker.update(1, vec![det("wally", 0.3, 0.4)]);
        let out = tracker.update(6, vec![det("wally", 0.3, 0.4)]);
        assert!(!out[0].confirmed);
    }

    #[test]
    fn test_confirmed_is_sticky() {
        let mut tracker = TemporalTracker::new(4, 3, 20.0);
        for frame in 1..=3 {
            tracker.update(frame, vec![det("wally", 0.3, 0.4)]);
        }
        let key = TrackKey::for_detection(&det("wally", 0.3, 0.4), 20.0);
        assert_eq!(tracker.get(&key).map(|e| e.state), Some(TrackState::Confirmed));

        // only frame 3 is still inside the window, yet the track stays confirmed
        let out = tracker.update(7, vec![det("wally", 0.3, 0.4)]);
        assert!(out[0].confirmed);
        assert_eq!(tracker.get(&key).map(|e| e.sightings.len()), Some(2));
    }

    #[test]
    fn test_confirmed_track_restarts_after_gap() {
        let mut tracker = TemporalTracker::new(4, 2, 20.0);
        tracker.update(1, vec![det("wally", 0.3, 0.4)]);
        let confirmed = tracker.update(2, vec![det("wally", 0.3, 0.4)]);
        assert!(confirmed[0].confirmed);

        // no sweeps in between: frame 10 alone must not inherit the old state
        let out = tracker.update(10, vec![det("wally", 0.3, 0.4)]);
        assert!(!out[0].confirmed);
        assert_ne!(out[0].track_id, confirmed[0].track_id);

        let key = TrackKey::for_detection(&det("wally", 0.3, 0.4), 20.0);
        assert_eq!(tracker.get(&key).map(|e| e.sightings.len()), Some(1));

        let out = tracker.update(11, vec![det("wally", 0.3, 0.4)]);
        assert!(out[0].confirmed);
    }

    #[test]
    fn test_same_frame_counts_once() {
        let mut tracker = TemporalTracker::new(4, 2, 20.0);
        let out = tracker.update(1, vec![det("wally", 0.30, 0.40), det("wally", 0.31, 0.40)]);
        assert!(out.iter().all(|d| !d.confirmed));
    }
}
