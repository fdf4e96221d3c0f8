//! Geometric disambiguation among several matches
//!
//! The heuristic targets a small interactive glyph pinned to the top-right
//! corner of a reference element, such as the close link of a startup popup.

use crate::element::{Bounds, Capability, UIElement};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Constraints a candidate must satisfy relative to the anchor bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerBand {
    /// Candidate top may be at most this far below the anchor top
    pub top_band: f64,
    /// Candidate right edge may be at most this far left of the anchor right edge
    pub right_band: f64,
    pub max_width: f64,
    pub max_height: f64,
    /// Areas closer than this are considered equal
    pub area_tolerance: f64,
    /// A candidate needs at least one of these
    pub required: Vec<Capability>,
}

impl Default for CornerBand {
    fn default() -> Self {
        Self {
            top_band: 80.0,
            right_band: 120.0,
            max_width: 60.0,
            max_height: 60.0,
            area_tolerance: 0.1,
            required: vec![Capability::Invoke, Capability::LegacyAction],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidateSelector {
    band: CornerBand,
}

impl CandidateSelector {
    pub fn new(band: CornerBand) -> Self {
        Self { band }
    }

    pub fn band(&self) -> &CornerBand {
        &self.band
    }

    /// Pick at most one candidate lying in the corner band of `anchor`.
    ///
    /// Smallest area wins. Areas within `area_tolerance` of each other count as
    /// equal, and then the right-most edge wins. A full tie keeps the earlier
    /// candidate, so the result depends only on the input order.
    pub fn select(&self, candidates: Vec<UIElement>, anchor: Bounds) -> Option<UIElement> {
        let total = candidates.len();
        let mut best: Option<(UIElement, Bounds)> = None;
        for candidate in candidates {
            let Some(bounds) = self.admit(&candidate, &anchor) else {
                continue;
            };
            let replace = match &best {
                None => true,
                Some((_, current)) => self.is_better(&bounds, current),
            };
            if replace {
                best = Some((candidate, bounds));
            }
        }
        debug!(
            total,
            picked = best.is_some(),
            "corner-band candidate selection"
        );
        best.map(|(element, _)| element)
    }

    /// Bounds of the candidate if it passes every filter.
    fn admit(&self, candidate: &UIElement, anchor: &Bounds) -> Option<Bounds> {
        let bounds = candidate.bounds().ok()?;
        let band = &self.band;
        let reject = |reason: &str| {
            trace!(?bounds, reason, "candidate rejected");
            None
        };
        if bounds.is_empty() || !anchor.contains(&bounds) {
            return reject("outside anchor");
        }
        if bounds.top() > anchor.top() + band.top_band {
            return reject("below top band");
        }
        if bounds.right() < anchor.right() - band.right_band {
            return reject("left of right band");
        }
        if bounds.width > band.max_width || bounds.height > band.max_height {
            return reject("too large");
        }
        if matches!(candidate.is_offscreen(), Ok(true)) {
            return reject("off-screen");
        }
        if !band.required.iter().any(|cap| candidate.supports(*cap)) {
            return reject("not interactive");
        }
        Some(bounds)
    }

    fn is_better(&self, challenger: &Bounds, current: &Bounds) -> bool {
        let delta = challenger.area() - current.area();
        if delta.abs() < self.band.area_tolerance {
            challenger.right() > current.right()
        } else {
            delta < 0.0
        }
    }
}
