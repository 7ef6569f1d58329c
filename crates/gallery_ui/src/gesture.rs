//! Touch gesture recognizers for the lightbox
//!
//! Both recognizers consume [`TouchInput`] so they can be driven by winit or
//! by a test without a window.

use gallery_core::GestureConfig;
use std::collections::BTreeMap;
use std::time::Instant;
use winit::event::{Touch, TouchPhase};

/// Platform-neutral touch sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchInput {
    pub id: u64,
    pub phase: TouchPhase,
    pub x: f64,
    pub y: f64,
    pub at: Instant,
}

impl TouchInput {
    pub fn new(id: u64, phase: TouchPhase, x: f64, y: f64, at: Instant) -> Self {
        Self { id, phase, x, y, at }
    }

    /// Adapt a winit touch; winit carries no timestamp so the caller supplies one
    pub fn from_winit(touch: &Touch, at: Instant) -> Self {
        Self {
            id: touch.id,
            phase: touch.phase,
            x: touch.location.x,
            y: touch.location.y,
            at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swipe {
    /// Finger moved right-to-left: next image
    Left,
    /// Finger moved left-to-right: previous image
    Right,
}

#[derive(Debug, Clone, Copy)]
struct TrackedTouch {
    id: u64,
    x: f64,
    y: f64,
    at: Instant,
}

/// Single-finger horizontal swipe detector
pub struct SwipeRecognizer {
    min_distance: f64,
    min_velocity: f64,
    tracked: Option<TrackedTouch>,
    /// A second finger joined; the tracked touch can no longer be a swipe
    spoiled: bool,
}

impl SwipeRecognizer {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            min_distance: config.swipe_min_distance_px,
            min_velocity: config.swipe_min_velocity,
            tracked: None,
            spoiled: false,
        }
    }

    /// Forget any touch in progress
    pub fn reset(&mut self) {
        self.tracked = None;
        self.spoiled = false;
    }

    pub fn handle(&mut self, touch: &TouchInput) -> Option<Swipe> {
        match touch.phase {
            TouchPhase::Started => {
                if self.tracked.is_none() {
                    self.tracked = Some(TrackedTouch {
                        id: touch.id,
                        x: touch.x,
                        y: touch.y,
                        at: touch.at,
                    });
                    self.spoiled = false;
                } else {
                    self.spoiled = true;
                }
                None
            }
            TouchPhase::Moved => None,
            TouchPhase::Ended => {
                let start = self.take_if_tracked(touch.id)?;
                if std::mem::take(&mut self.spoiled) {
                    return None;
                }
                self.classify(&start, touch)
            }
            TouchPhase::Cancelled => {
                if self.take_if_tracked(touch.id).is_some() {
                    self.spoiled = false;
                }
                None
            }
        }
    }

    fn take_if_tracked(&mut self, id: u64) -> Option<TrackedTouch> {
        match self.tracked {
            Some(t) if t.id == id => self.tracked.take(),
            _ => None,
        }
    }

    fn classify(&self, start: &TrackedTouch, end: &TouchInput) -> Option<Swipe> {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let elapsed_ms = end.at.saturating_duration_since(start.at).as_secs_f64() * 1000.0;
        let velocity = dx.abs() / elapsed_ms.max(1.0);

        if dx.abs() <= dy.abs() || dx.abs() < self.min_distance || velocity < self.min_velocity {
            tracing::trace!(dx, dy, velocity, "Touch released without swipe");
            return None;
        }

        let swipe = if dx < 0.0 { Swipe::Left } else { Swipe::Right };
        tracing::debug!(?swipe, dx, velocity, "Swipe recognized");
        Some(swipe)
    }
}

/// Two-finger pinch-to-zoom
pub struct PinchRecognizer {
    min_scale: f64,
    max_scale: f64,
    touches: BTreeMap<u64, (f64, f64)>,
    /// `(start distance, scale at start)` while a pinch is in progress
    active: Option<(f64, f64)>,
    scale: f64,
}

impl PinchRecognizer {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            touches: BTreeMap::new(),
            active: None,
            scale: config.min_scale,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_pinching(&self) -> bool {
        self.active.is_some()
    }

    /// Back to the minimum scale (e.g. when the shown image changes)
    pub fn reset_scale(&mut self) {
        self.scale = self.min_scale;
        self.active = None;
    }

    /// Drop all tracked touches as well as the scale
    pub fn reset(&mut self) {
        self.touches.clear();
        self.reset_scale();
    }

    /// Feed a touch; returns the new scale while a pinch is in progress
    pub fn handle(&mut self, touch: &TouchInput) -> Option<f64> {
        match touch.phase {
            TouchPhase::Started => {
                self.touches.insert(touch.id, (touch.x, touch.y));
                self.active = None;
                if self.touches.len() == 2 {
                    let distance = self.distance()?;
                    if distance > f64::EPSILON {
                        self.active = Some((distance, self.scale));
                        tracing::trace!(distance, scale = self.scale, "Pinch started");
                    }
                }
                None
            }
            TouchPhase::Moved => {
                let point = self.touches.get_mut(&touch.id)?;
                *point = (touch.x, touch.y);

                let (start_distance, start_scale) = self.active?;
                let distance = self.distance()?;
                self.scale =
                    (start_scale * distance / start_distance).clamp(self.min_scale, self.max_scale);
                Some(self.scale)
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.remove(&touch.id);
                if self.touches.len() < 2 && self.active.take().is_some() {
                    tracing::debug!(scale = self.scale, "Pinch ended");
                }
                None
            }
        }
    }

    /// Distance between the two touches, if exactly two are down
    fn distance(&self) -> Option<f64> {
        if self.touches.len() != 2 {
            return None;
        }
        let mut points = self.touches.values();
        let (x1, y1) = points.next()?;
        let (x2, y2) = points.next()?;
        Some((x2 - x1).hypot(y2 - y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    fn config() -> GestureConfig {
        GestureConfig::default()
    }

    #[test]
    fn test_fast_left_swipe_is_next() {
        let t0 = Instant::now();
        let mut swipe = SwipeRecognizer::new(&config());

        assert_eq!(swipe.handle(&TouchInput::new(1, TouchPhase::Started, 300.0, 200.0, t0)), None);
        swipe.handle(&TouchInput::new(1, TouchPhase::Moved, 250.0, 205.0, at(t0, 50)));
        let result = swipe.handle(&TouchInput::new(1, TouchPhase::Ended, 180.0, 210.0, at(t0, 150)));
        assert_eq!(result, Some(Swipe::Left));

        swipe.handle(&TouchInput::new(2, TouchPhase::Started, 100.0, 200.0, t0));
        let result = swipe.handle(&TouchInput::new(2, TouchPhase::Ended, 200.0, 200.0, at(t0, 100)));
        assert_eq!(result, Some(Swipe::Right));
    }

    #[test]
    fn test_slow_short_or_vertical_moves_are_not_swipes() {
        let t0 = Instant::now();
        let mut swipe = SwipeRecognizer::new(&config());

        // 120px over 1s = 0.12 px/ms
        swipe.handle(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        assert_eq!(swipe.handle(&TouchInput::new(1, TouchPhase::Ended, 180.0, 0.0, at(t0, 1000))), None);

        // 40px is under the distance threshold
        swipe.handle(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        assert_eq!(swipe.handle(&TouchInput::new(1, TouchPhase::Ended, 260.0, 0.0, at(t0, 20))), None);

        // Mostly vertical
        swipe.handle(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        assert_eq!(swipe.handle(&TouchInput::new(1, TouchPhase::Ended, 200.0, 150.0, at(t0, 100))), None);
    }

    #[test]
    fn test_cancelled_touch_is_discarded() {
        let t0 = Instant::now();
        let mut swipe = SwipeRecognizer::new(&config());
        swipe.handle(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        swipe.handle(&TouchInput::new(1, TouchPhase::Cancelled, 100.0, 0.0, at(t0, 50)));
        assert_eq!(swipe.handle(&TouchInput::new(1, TouchPhase::Ended, 100.0, 0.0, at(t0, 60))), None);
    }

    #[test]
    fn test_two_finger_gesture_is_not_a_swipe() {
        let t0 = Instant::now();
        let mut swipe = SwipeRecognizer::new(&config());
        swipe.handle(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        swipe.handle(&TouchInput::new(2, TouchPhase::Started, 400.0, 0.0, t0));
        swipe.handle(&TouchInput::new(2, TouchPhase::Ended, 500.0, 0.0, at(t0, 50)));
        assert_eq!(swipe.handle(&TouchInput::new(1, TouchPhase::Ended, 100.0, 0.0, at(t0, 80))), None);
    }

    #[test]
    fn test_pinch_scales_and_clamps() {
        let t0 = Instant::now();
        let mut pinch = PinchRecognizer::new(&config());

        pinch.handle(&TouchInput::new(1, TouchPhase::Started, 100.0, 100.0, t0));
        pinch.handle(&TouchInput::new(2, TouchPhase::Started, 200.0, 100.0, t0));
        assert!(pinch.is_pinching());

        let scale = pinch.handle(&TouchInput::new(2, TouchPhase::Moved, 400.0, 100.0, t0));
        assert_eq!(scale, Some(3.0));

        let scale = pinch.handle(&TouchInput::new(2, TouchPhase::Moved, 700.0, 100.0, t0));
        assert_eq!(scale, Some(5.0));

        let scale = pinch.handle(&TouchInput::new(2, TouchPhase::Moved, 110.0, 100.0, t0));
        assert_eq!(scale, Some(1.0));
    }

    #[test]
    fn test_third_touch_ends_pinch_until_fresh_start() {
        let t0 = Instant::now();
        let mut pinch = PinchRecognizer::new(&config());

        pinch.handle(&TouchInput::new(1, TouchPhase::Started, 0.0, 0.0, t0));
        pinch.handle(&TouchInput::new(2, TouchPhase::Started, 100.0, 0.0, t0));
        pinch.handle(&TouchInput::new(2, TouchPhase::Moved, 200.0, 0.0, t0));
        assert_eq!(pinch.scale(), 2.0);

        pinch.handle(&TouchInput::new(3, TouchPhase::Started, 50.0, 50.0, t0));
        assert!(!pinch.is_pinching());
        pinch.handle(&TouchInput::new(3, TouchPhase::Ended, 50.0, 50.0, t0));
        assert_eq!(pinch.handle(&TouchInput::new(2, TouchPhase::Moved, 400.0, 0.0, t0)), None);
        assert_eq!(pinch.scale(), 2.0);

        // Lift and re-place a finger: the new pinch starts from the current scale
        pinch.handle(&TouchInput::new(2, TouchPhase::Ended, 400.0, 0.0, t0));
        pinch.handle(&TouchInput::new(4, TouchPhase::Started, 100.0, 0.0, t0));
        assert_eq!(pinch.handle(&TouchInput::new(4, TouchPhase::Moved, 150.0, 0.0, t0)), Some(3.0));
    }

    #[test]
    fn test_reset_forgets_lost_touches() {
        let t0 = Instant::now();
        let mut swipe = SwipeRecognizer::new(&config());
        let mut pinch = PinchRecognizer::new(&config());

        // Finger 1 went down and its release was never delivered
        swipe.handle(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        pinch.handle(&TouchInput::new(1, TouchPhase::Started, 300.0, 0.0, t0));
        swipe.reset();
        pinch.reset();

        swipe.handle(&TouchInput::new(2, TouchPhase::Started, 300.0, 0.0, t0));
        assert_eq!(
            swipe.handle(&TouchInput::new(2, TouchPhase::Ended, 100.0, 0.0, at(t0, 100))),
            Some(Swipe::Left)
        );

        pinch.handle(&TouchInput::new(2, TouchPhase::Started, 100.0, 0.0, t0));
        pinch.handle(&TouchInput::new(3, TouchPhase::Started, 200.0, 0.0, t0));
        assert!(pinch.is_pinching());
        assert_eq!(pinch.handle(&TouchInput::new(3, TouchPhase::Moved, 400.0, 0.0, t0)), Some(3.0));
    }

    #[test]
    fn test_reset_scale_keeps_touches() {
        let t0 = Instant::now();
        let mut pinch = PinchRecognizer::new(&config());
        pinch.handle(&TouchInput::new(1, TouchPhase::Started, 0.0, 0.0, t0));
        pinch.handle(&TouchInput::new(2, TouchPhase::Started, 100.0, 0.0, t0));
        pinch.handle(&TouchInput::new(2, TouchPhase::Moved, 200.0, 0.0, t0));
        pinch.reset_scale();
        assert_eq!(pinch.scale(), 1.0);

        // Both fingers are still down, so a third one is not a fresh pair
        pinch.handle(&TouchInput::new(3, TouchPhase::Started, 50.0, 0.0, t0));
        assert!(!pinch.is_pinching());
    }
}
