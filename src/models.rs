// Core data models for the VibeCheck vibe detection core

/// Number of emotion classes the classifier scores.
pub const VIBE_COUNT: usize = 6;

/// One of the six emotion classes the on-device model distinguishes.
///
/// The declaration order matches the model's output layout and is used for
/// deterministic tie-breaking; it carries no other meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Vibe {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Neutral,
}

impl Vibe {
    /// All classes in declaration order.
    pub const ALL: [Vibe; VIBE_COUNT] = [
        Vibe::Angry,
        Vibe::Disgust,
        Vibe::Fear,
        Vibe::Happy,
        Vibe::Sad,
        Vibe::Neutral,
    ];

    /// Position in the declaration order (also the model output index).
    pub fn index(self) -> usize {
        match self {
            Vibe::Angry => 0,
            Vibe::Disgust => 1,
            Vibe::Fear => 2,
            Vibe::Happy => 3,
            Vibe::Sad => 4,
            Vibe::Neutral => 5,
        }
    }

    /// Lowercase label as used by overlays and logs.
    pub fn label(self) -> &'static str {
        match self {
            Vibe::Angry => "angry",
            Vibe::Disgust => "disgust",
            Vibe::Fear => "fear",
            Vibe::Happy => "happy",
            Vibe::Sad => "sad",
            Vibe::Neutral => "neutral",
        }
    }

    /// Display color (RGB) for the overlay bounding box and label.
    pub fn color(self) -> [u8; 3] {
        match self {
            Vibe::Happy => [0x4c, 0xaf, 0x50],
            Vibe::Angry => [0xf4, 0x43, 0x36],
            Vibe::Neutral => [0xff, 0xff, 0xff],
            Vibe::Fear => [0x90, 0xca, 0xf9],
            Vibe::Disgust => [0xff, 0xb7, 0x4d],
            Vibe::Sad => [0x78, 0x93, 0xad],
        }
    }
}

impl std::fmt::Display for Vibe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A per-face vibe reading as consumed by the auto-snap trigger and shown
/// on overlays. `Unknown` covers faces without a stable reading yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VibeLabel {
    Known(Vibe),
    Unknown,
}

impl VibeLabel {
    /// Overlay color; unknown faces are drawn in light gray.
    pub fn color(self) -> [u8; 3] {
        match self {
            VibeLabel::Known(vibe) => vibe.color(),
            VibeLabel::Unknown => [0xcc, 0xcc, 0xcc],
        }
    }
}

impl From<Vibe> for VibeLabel {
    fn from(vibe: Vibe) -> Self {
        VibeLabel::Known(vibe)
    }
}

impl std::fmt::Display for VibeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VibeLabel::Known(vibe) => write!(f, "{vibe}"),
            VibeLabel::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Raw per-class scores for one face in one frame, in class declaration
/// order. Scores are expected in [0, 1] but are not required to sum to 1;
/// the classifier may skip normalization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Probabilities([f32; VIBE_COUNT]);

impl Probabilities {
    pub fn new(scores: [f32; VIBE_COUNT]) -> Self {
        Self(scores)
    }

    /// Score for a single class.
    pub fn get(&self, vibe: Vibe) -> f32 {
        self.0[vibe.index()]
    }

    /// Iterate `(class, score)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Vibe, f32)> + '_ {
        Vibe::ALL.iter().map(|&vibe| (vibe, self.0[vibe.index()]))
    }

    /// Class with the highest raw score; ties broken by declaration order,
    /// first wins. NaN and out-of-range scores are never selected while any
    /// in-range score exists; if every entry is invalid, the first class is
    /// returned.
    pub fn argmax(&self) -> Vibe {
        let mut best: Option<(Vibe, f32)> = None;
        for (vibe, score) in self.iter() {
            if !valid_score(score) {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((vibe, score)),
            }
        }
        best.map(|(vibe, _)| vibe).unwrap_or(Vibe::ALL[0])
    }
}

fn valid_score(score: f32) -> bool {
    score.is_finite() && (0.0..=1.0).contains(&score)
}

/// Tracked-face identity as delivered by the external detection service.
pub type FaceId = i32;

/// One face in one frame: identity plus the classifier's raw scores,
/// as handed to the core by the detection and classification collaborators.
#[derive(Clone, Copy, Debug)]
pub struct FaceObservation {
    pub face: FaceId,
    pub probs: Probabilities,
}

impl FaceObservation {
    pub fn new(face: FaceId, probs: Probabilities) -> Self {
        Self { face, probs }
    }
}

/// Overlay instruction for one face: stabilized label, its display color,
/// and the top-scoring classes for optional diagnostic display.
#[derive(Clone, Debug)]
pub struct FaceVibe {
    pub face: FaceId,
    pub label: VibeLabel,
    pub color: [u8; 3],
    pub top: Vec<(Vibe, f32)>,
}

/// Result of processing one frame, broadcast to the rendering collaborator.
#[derive(Clone, Debug)]
pub struct FrameAnalysis {
    /// One overlay per face classified this frame.
    pub faces: Vec<FaceVibe>,
    /// Whether the auto-snap trigger fired on this frame.
    pub snap: bool,
    /// Frames-per-second measurement, present when a one-second window closed.
    pub fps: Option<u32>,
}
