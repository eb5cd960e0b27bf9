// Temporal vibe stabilization

use crate::models::{FaceId, Probabilities, Vibe};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum time a differing, non-neutral candidate must wait since the last
/// accepted reading before it may replace the current vibe.
pub const DEFAULT_SWITCH_DWELL: Duration = Duration::from_millis(300);

/// How many classes the diagnostic top-list reports.
const TOP_COUNT: usize = 3;

/// Per-class acceptance threshold. Happy and angry are reliably
/// distinguishable at low confidence; fear, disgust and sad need high
/// confidence to avoid false positives.
fn threshold(vibe: Vibe) -> f32 {
    match vibe {
        Vibe::Happy | Vibe::Angry => 0.02,
        Vibe::Fear | Vibe::Disgust | Vibe::Sad => 0.45,
        Vibe::Neutral => 0.20,
    }
}

/// Turns noisy per-frame probability vectors into a temporally stable vibe,
/// one call per frame per tracked face.
///
/// A candidate is picked from the classes that clear their threshold (raw
/// argmax when none do). Candidates equal to the current vibe, or equal to
/// neutral, are accepted immediately; any other switch is held back until
/// the dwell window since the last accepted reading has passed, which
/// suppresses single-frame classifier spikes.
#[derive(Debug, Clone)]
pub struct VibeStabilizer {
    current: Vibe,
    last_switch: Option<Instant>,
    switch_dwell: Duration,
}

impl Default for VibeStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

impl VibeStabilizer {
    pub fn new() -> Self {
        Self::with_dwell(DEFAULT_SWITCH_DWELL)
    }

    pub fn with_dwell(switch_dwell: Duration) -> Self {
        Self {
            current: Vibe::Neutral,
            last_switch: None,
            switch_dwell,
        }
    }

    /// The most recently accepted vibe.
    pub fn current(&self) -> Vibe {
        self.current
    }

    /// Feed one frame's scores and return the stabilized vibe.
    pub fn classify(&mut self, probs: &Probabilities, now: Instant) -> Vibe {
        let candidate = select_candidate(probs);

        if candidate != self.current && candidate != Vibe::Neutral {
            let dwell_passed = match self.last_switch {
                None => true,
                Some(last) => now.duration_since(last) > self.switch_dwell,
            };
            if dwell_passed {
                debug!("Vibe switch accepted: {} -> {}", self.current, candidate);
                self.current = candidate;
                self.last_switch = Some(now);
            }
            // On rejection neither field advances: the dwell window keeps
            // counting from the last accepted reading, not from this frame.
        } else {
            // Same vibe or neutral: accept immediately.
            self.current = candidate;
            self.last_switch = Some(now);
        }

        self.current
    }
}

/// Candidate selection from one frame's scores, before debouncing:
/// - no class over threshold: raw argmax (never Unknown);
/// - only neutral over threshold: neutral;
/// - otherwise the highest-scoring class over threshold, with neutral
///   excluded whenever any other class also cleared its threshold. Ties go
///   to the first class in declaration order.
fn select_candidate(probs: &Probabilities) -> Vibe {
    let over: Vec<(Vibe, f32)> = probs
        .iter()
        .filter(|&(vibe, score)| score > threshold(vibe))
        .collect();

    if over.is_empty() {
        return probs.argmax();
    }
    if over.len() == 1 {
        return over[0].0;
    }

    let mut best: Option<(Vibe, f32)> = None;
    for &(vibe, score) in &over {
        if vibe == Vibe::Neutral {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((vibe, score)),
        }
    }
    // `over` has at least two members here, so at least one is non-neutral.
    best.map(|(vibe, _)| vibe).unwrap_or(Vibe::Neutral)
}

/// Top classes by raw score for diagnostic display, highest first.
/// Stateless; does not touch any stabilizer.
pub fn top_vibes(probs: &Probabilities) -> Vec<(Vibe, f32)> {
    let mut scored: Vec<(Vibe, f32)> = probs.iter().collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(TOP_COUNT);
    scored
}

/// Stabilizer registry keyed by tracked-face identity.
///
/// A stabilizer is created the first time a face is observed and discarded
/// when tracking is lost, so each face keeps an independent vibe.
#[derive(Debug)]
pub struct VibeTracker {
    stabilizers: HashMap<FaceId, VibeStabilizer>,
    switch_dwell: Duration,
}

impl Default for VibeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl VibeTracker {
    pub fn new() -> Self {
        Self::with_dwell(DEFAULT_SWITCH_DWELL)
    }

    pub fn with_dwell(switch_dwell: Duration) -> Self {
        Self {
            stabilizers: HashMap::new(),
            switch_dwell,
        }
    }

    /// Stabilize one face's scores for this frame.
    pub fn classify(&mut self, face: FaceId, probs: &Probabilities, now: Instant) -> Vibe {
        let dwell = self.switch_dwell;
        self.stabilizers
            .entry(face)
            .or_insert_with(|| VibeStabilizer::with_dwell(dwell))
            .classify(probs, now)
    }

    /// Drop state for faces the detection service no longer reports.
    pub fn retain_visible(&mut self, visible: &[FaceId]) {
        self.stabilizers.retain(|face, _| visible.contains(face));
    }

    /// Number of faces currently tracked.
    pub fn len(&self) -> usize {
        self.stabilizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stabilizers.is_empty()
    }
}
