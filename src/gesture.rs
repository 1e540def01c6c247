// src/gesture.rs - Pinch inference: EMA smoothing, adaptive hysteresis, frame debouncing
use std::time::{Duration, Instant};

use crate::tracker::HandFrame;

// MediaPipe hand landmark indices
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const PINKY_MCP: usize = 17;

// Palm width is the scale normalizer; floor it so the adaptive
// thresholds never collapse to zero.
const PALM_WIDTH_FLOOR: f64 = 1e-4;
const PALM_WIDTH_DEFAULT: f64 = 0.1;

pub const DEFAULT_SENSITIVITY: u8 = 3;

/// Discrete gesture outcome for one channel on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinchEvent {
    /// Short index pinch released: flip the pen on/off.
    PenToggled,
    /// Long index pinch released: wipe the canvas.
    CanvasCleared,
    /// Short middle pinch released while the pen is off.
    UndoRequested,
}

/// Per-frame detector output, one slot per channel. `None` means no
/// discrete transition happened on that channel this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEvents {
    pub index: Option<PinchEvent>,
    pub middle: Option<PinchEvent>,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Hold an index pinch at least this long to clear instead of toggle.
    pub long_press: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(800),
        }
    }
}

/// Detector tuning derived from the 1-5 sensitivity level. Higher levels
/// respond faster: tighter enter threshold, stronger EMA follow, fewer
/// stable frames required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensitivityProfile {
    pub enter_coef: f64,
    pub exit_coef: f64,
    pub ema_alpha: f64,
    pub enter_frames: u32,
    pub exit_frames: u32,
}

impl SensitivityProfile {
    pub fn for_level(level: u8) -> Self {
        match level {
            1 => Self {
                enter_coef: 0.45,
                exit_coef: 0.70,
                ema_alpha: 0.40,
                enter_frames: 4,
                exit_frames: 4,
            },
            2 => Self {
                enter_coef: 0.42,
                exit_coef: 0.65,
                ema_alpha: 0.45,
                enter_frames: 3,
                exit_frames: 3,
            },
            3 => Self {
                enter_coef: 0.40,
                exit_coef: 0.60,
                ema_alpha: 0.50,
                enter_frames: 3,
                exit_frames: 3,
            },
            4 => Self {
                enter_coef: 0.35,
                exit_coef: 0.55,
                ema_alpha: 0.55,
                enter_frames: 2,
                exit_frames: 2,
            },
            5 => Self {
                enter_coef: 0.30,
                exit_coef: 0.50,
                ema_alpha: 0.60,
                enter_frames: 2,
                exit_frames: 2,
            },
            _ => Self::for_level(DEFAULT_SENSITIVITY),
        }
    }
}

impl Default for SensitivityProfile {
    fn default() -> Self {
        Self::for_level(DEFAULT_SENSITIVITY)
    }
}

enum Transition {
    Engaged,
    Released { held: Duration },
}

/// One pinch channel: smoothed distance, stability counters and a
/// two-state (inactive/active) machine. The index and middle channels
/// each own one of these.
#[derive(Debug, Clone, Default)]
struct PinchChannel {
    ema: Option<f64>,
    frames_below: u32,
    frames_above: u32,
    active: bool,
    engaged_at: Option<Instant>,
}

impl PinchChannel {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn advance(
        &mut self,
        raw: f64,
        on_threshold: f64,
        off_threshold: f64,
        profile: &SensitivityProfile,
        now: Instant,
    ) -> Option<Transition> {
        let ema = match self.ema {
            Some(prev) => profile.ema_alpha * raw + (1.0 - profile.ema_alpha) * prev,
            None => raw,
        };
        self.ema = Some(ema);

        if ema < on_threshold {
            self.frames_below += 1;
            self.frames_above = 0;
        } else if ema > off_threshold {
            self.frames_above += 1;
            self.frames_below = 0;
        }
        // readings between the two thresholds touch neither counter

        if !self.active {
            if self.frames_below >= profile.enter_frames {
                self.active = true;
                self.engaged_at = Some(now);
                self.frames_below = 0;
                return Some(Transition::Engaged);
            }
        } else if self.frames_above >= profile.exit_frames {
            self.active = false;
            self.frames_above = 0;
            let held = self
                .engaged_at
                .take()
                .map(|start| now.duration_since(start))
                .unwrap_or_default();
            return Some(Transition::Released { held });
        }

        None
    }
}

/// Turns per-frame hand landmarks into discrete pinch events. The two
/// channels run independently but share the palm-width scale so both
/// thresholds track hand distance from the camera.
pub struct GestureDetector {
    config: DetectorConfig,
    profile: SensitivityProfile,
    level: u8,
    index: PinchChannel,
    middle: PinchChannel,
}

impl GestureDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            profile: SensitivityProfile::default(),
            level: DEFAULT_SENSITIVITY,
            index: PinchChannel::default(),
            middle: PinchChannel::default(),
        }
    }

    /// Applies a 1-5 sensitivity level; anything else falls back to the
    /// default. Both channels restart from neutral so stale smoothing
    /// history is never judged against the new thresholds.
    pub fn set_sensitivity(&mut self, level: u8) {
        self.level = if (1..=5).contains(&level) {
            level
        } else {
            DEFAULT_SENSITIVITY
        };
        self.profile = SensitivityProfile::for_level(self.level);
        self.index.reset();
        self.middle.reset();
    }

    pub fn sensitivity(&self) -> u8 {
        self.level
    }

    pub fn profile(&self) -> &SensitivityProfile {
        &self.profile
    }

    pub fn index_active(&self) -> bool {
        self.index.active
    }

    pub fn middle_active(&self) -> bool {
        self.middle.active
    }

    /// Runs one frame through both channels. `now` comes from the control
    /// loop; `pen_active` gates the undo channel so it cannot fire while a
    /// stroke is in progress. Skipping a frame entirely (hand not visible)
    /// is done by simply not calling this - all channel state persists.
    pub fn update(&mut self, frame: &HandFrame, now: Instant, pen_active: bool) -> FrameEvents {
        let palm_width = palm_width(frame);
        let on_threshold = self.profile.enter_coef * palm_width;
        let off_threshold = self.profile.exit_coef * palm_width;

        let mut events = FrameEvents::default();

        // Index channel: short pinch toggles the pen, long pinch clears.
        if let Some(dist) = pinch_distance(frame, INDEX_TIP) {
            if let Some(Transition::Released { held }) =
                self.index
                    .advance(dist, on_threshold, off_threshold, &self.profile, now)
            {
                events.index = Some(if held >= self.config.long_press {
                    PinchEvent::CanvasCleared
                } else {
                    PinchEvent::PenToggled
                });
            }
        }

        // Middle channel: short pinch undoes, but never while drawing and
        // never as the tail of a long hold (that would collide with clear).
        if let Some(dist) = pinch_distance(frame, MIDDLE_TIP) {
            if let Some(Transition::Released { held }) =
                self.middle
                    .advance(dist, on_threshold, off_threshold, &self.profile, now)
            {
                if held < self.config.long_press && !pen_active {
                    events.middle = Some(PinchEvent::UndoRequested);
                }
            }
        }

        events
    }
}

fn pinch_distance(frame: &HandFrame, fingertip: usize) -> Option<f64> {
    let thumb = frame.landmark(THUMB_TIP)?;
    let tip = frame.landmark(fingertip)?;
    Some((thumb.xy() - tip.xy()).norm())
}

fn palm_width(frame: &HandFrame) -> f64 {
    match (frame.landmark(INDEX_MCP), frame.landmark(PINKY_MCP)) {
        (Some(index_mcp), Some(pinky_mcp)) => {
            (index_mcp.xy() - pinky_mcp.xy()).norm().max(PALM_WIDTH_FLOOR)
        }
        _ => PALM_WIDTH_DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    // Builds a frame with the thumb/index gap set to `index_dist`, the
    // middle fingertip held far away, and a palm width of exactly 0.1.
    fn frame(index_dist: f64) -> HandFrame {
        frame_with(index_dist, 0.2)
    }

    fn frame_with(index_dist: f64, middle_dist: f64) -> HandFrame {
        let mut points = vec![Vector3::new(0.5, 0.8, 0.0); 21];
        points[THUMB_TIP] = Vector3::new(0.5, 0.5, 0.0);
        points[INDEX_TIP] = Vector3::new(0.5 + index_dist, 0.5, 0.0);
        points[MIDDLE_TIP] = Vector3::new(0.5 + middle_dist, 0.5, 0.0);
        points[INDEX_MCP] = Vector3::new(0.45, 0.65, 0.0);
        points[PINKY_MCP] = Vector3::new(0.55, 0.65, 0.0);
        HandFrame::new(points)
    }

    fn detector() -> GestureDetector {
        GestureDetector::new(DetectorConfig::default())
    }

    #[test]
    fn activates_after_enter_frames_and_only_once() {
        // level 3, palm 0.1: on = 0.04, off = 0.06; raw 0.02 keeps the
        // EMA pinned at 0.02, so the channel arms on the third tick.
        let mut det = detector();
        let t = Instant::now();

        for tick in 1..=2 {
            let events = det.update(&frame(0.02), t, false);
            assert_eq!(events, FrameEvents::default(), "tick {tick}");
            assert!(!det.index_active(), "tick {tick}");
        }
        assert_eq!(det.update(&frame(0.02), t, false), FrameEvents::default());
        assert!(det.index_active());

        // Staying pinched must not re-trigger anything.
        for _ in 0..10 {
            assert_eq!(det.update(&frame(0.02), t, false), FrameEvents::default());
            assert!(det.index_active());
        }

        // One release, one event.
        let mut released = Vec::new();
        for _ in 0..10 {
            if let Some(event) = det.update(&frame(0.2), t, false).index {
                released.push(event);
            }
        }
        assert_eq!(released, vec![PinchEvent::PenToggled]);
        assert!(!det.index_active());
    }

    #[test]
    fn dead_zone_freezes_counters() {
        let mut det = detector();
        let t = Instant::now();

        // Two below-threshold ticks: EMA stays 0.02, count = 2.
        det.update(&frame(0.02), t, false);
        det.update(&frame(0.02), t, false);
        assert!(!det.index_active());

        // Raw 0.08 lifts the EMA to 0.05 - inside the 0.04..0.06 dead
        // zone, so neither counter moves.
        det.update(&frame(0.08), t, false);
        assert!(!det.index_active());

        // One more below tick completes the original count of three.
        det.update(&frame(0.01), t, false);
        assert!(det.index_active());
    }

    #[test]
    fn dead_zone_alone_never_triggers() {
        let mut det = detector();
        let t = Instant::now();

        // First sample lands in the dead zone and stays there.
        for _ in 0..20 {
            let events = det.update(&frame(0.05), t, false);
            assert_eq!(events, FrameEvents::default());
            assert!(!det.index_active());
        }
    }

    // Pinches for `enter` ticks at t0, releases with `now` = t0 + held.
    fn pinch_and_release(det: &mut GestureDetector, held: Duration) -> Option<PinchEvent> {
        let t0 = Instant::now();
        let enter = det.profile().enter_frames;
        let exit = det.profile().exit_frames;
        for _ in 0..enter {
            det.update(&frame(0.001), t0, false);
        }
        assert!(det.index_active());

        let release_at = t0 + held;
        let mut event = None;
        for _ in 0..(exit + 4) {
            if let Some(e) = det.update(&frame(0.3), release_at, false).index {
                event = Some(e);
            }
        }
        assert!(!det.index_active());
        event
    }

    #[test]
    fn long_press_boundary_selects_clear_or_toggle() {
        let mut det = detector();
        assert_eq!(
            pinch_and_release(&mut det, Duration::from_millis(799)),
            Some(PinchEvent::PenToggled)
        );

        let mut det = detector();
        assert_eq!(
            pinch_and_release(&mut det, Duration::from_millis(800)),
            Some(PinchEvent::CanvasCleared)
        );

        let mut det = detector();
        assert_eq!(
            pinch_and_release(&mut det, Duration::from_millis(2500)),
            Some(PinchEvent::CanvasCleared)
        );
    }

    #[test]
    fn middle_release_undoes_only_with_pen_off() {
        let t0 = Instant::now();

        // Pen off, short hold: undo fires.
        let mut det = detector();
        for _ in 0..3 {
            det.update(&frame_with(0.2, 0.001), t0, false);
        }
        assert!(det.middle_active());
        let mut event = None;
        for _ in 0..6 {
            if let Some(e) = det.update(&frame_with(0.2, 0.3), t0, false).middle {
                event = Some(e);
            }
        }
        assert_eq!(event, Some(PinchEvent::UndoRequested));

        // Pen on: same motion is swallowed.
        let mut det = detector();
        for _ in 0..3 {
            det.update(&frame_with(0.2, 0.001), t0, true);
        }
        for _ in 0..6 {
            assert_eq!(det.update(&frame_with(0.2, 0.3), t0, true).middle, None);
        }

        // Long hold with pen off: reserved for clear, so no undo.
        let mut det = detector();
        for _ in 0..3 {
            det.update(&frame_with(0.2, 0.001), t0, false);
        }
        let late = t0 + Duration::from_millis(900);
        for _ in 0..6 {
            assert_eq!(det.update(&frame_with(0.2, 0.3), late, false).middle, None);
        }
    }

    #[test]
    fn sensitivity_change_resets_accumulated_progress() {
        let mut det = detector();
        let t = Instant::now();

        // Two of the three required ticks under level 3.
        det.update(&frame(0.02), t, false);
        det.update(&frame(0.02), t, false);
        assert!(!det.index_active());

        // Level 4 requires 2 fresh ticks - the old progress is gone.
        det.set_sensitivity(4);
        det.update(&frame(0.02), t, false);
        assert!(!det.index_active());
        det.update(&frame(0.02), t, false);
        assert!(det.index_active());
    }

    #[test]
    fn invalid_sensitivity_falls_back_to_default() {
        let mut det = detector();
        det.set_sensitivity(9);
        assert_eq!(det.sensitivity(), DEFAULT_SENSITIVITY);
        assert_eq!(*det.profile(), SensitivityProfile::for_level(3));

        det.set_sensitivity(0);
        assert_eq!(det.sensitivity(), DEFAULT_SENSITIVITY);
    }

    #[test]
    fn short_frame_skips_only_the_missing_channel() {
        // Nine landmarks: index tip (8) present, middle tip (12) missing,
        // both MCPs missing so palm width takes its 0.1 default.
        let mut points = vec![Vector3::new(0.5, 0.8, 0.0); 9];
        points[THUMB_TIP] = Vector3::new(0.5, 0.5, 0.0);
        points[INDEX_TIP] = Vector3::new(0.51, 0.5, 0.0);
        let short = HandFrame::new(points);

        let mut det = detector();
        let t = Instant::now();
        for _ in 0..3 {
            assert_eq!(det.update(&short, t, false), FrameEvents::default());
        }
        assert!(det.index_active());
        assert!(!det.middle_active());
    }
}
