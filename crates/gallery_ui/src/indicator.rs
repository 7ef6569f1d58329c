//! Position indicator: dots for small galleries, "n of total" otherwise

use gallery_core::IndicatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorMode {
    /// One dot per image
    Dots(usize),
    Counter,
}

/// Where an observed item sits relative to the viewport, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    pub index: usize,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorAction {
    /// Move the lightbox to this index
    Seek(usize),
}

pub struct PositionIndicator {
    max_dots: usize,
    band_margin: f64,
    current: usize,
    total: usize,
}

impl PositionIndicator {
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            max_dots: config.max_dots,
            band_margin: config.center_band_margin,
            current: 0,
            total: 0,
        }
    }

    pub fn mode(&self) -> IndicatorMode {
        if self.total < self.max_dots {
            IndicatorMode::Dots(self.total)
        } else {
            IndicatorMode::Counter
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn set_total(&mut self, total: usize) {
        self.total = total;
        if total > 0 && self.current >= total {
            self.current = total - 1;
        }
    }

    pub fn set_current(&mut self, index: usize) {
        self.current = index;
    }

    /// `"3 of 120"` (1-based)
    pub fn label(&self) -> String {
        if self.total == 0 {
            return String::new();
        }
        format!("{} of {}", self.current + 1, self.total)
    }

    /// Pick the entry overlapping the viewport's center band the most.
    ///
    /// Returns the new current index when it changed.
    pub fn observe(&mut self, entries: &[VisibilityEntry], viewport_height: f64) -> Option<usize> {
        let band_top = viewport_height * self.band_margin;
        let band_bottom = viewport_height * (1.0 - self.band_margin);

        let best = entries
            .iter()
            .filter(|e| e.index < self.total)
            .map(|e| (e.index, e.bottom.min(band_bottom) - e.top.max(band_top)))
            .filter(|&(_, overlap)| overlap > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)?;

        if best == self.current {
            return None;
        }
        tracing::trace!(from = self.current, to = best, "Indicator moved");
        self.current = best;
        Some(best)
    }

    /// A dot was clicked. `current` follows once the seek actually lands.
    pub fn activate_dot(&self, index: usize) -> Option<IndicatorAction> {
        match self.mode() {
            IndicatorMode::Dots(len) if index < len => Some(IndicatorAction::Seek(index)),
            _ => None,
        }
    }
}
