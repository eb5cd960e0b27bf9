// Auto-snap triggering on a matching group vibe

use crate::error::Result;
use crate::models::{Vibe, VibeLabel};
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Minimum time between accepted triggers.
pub const DEFAULT_SNAP_COOLDOWN: Duration = Duration::from_millis(5000);

/// What happened to a capture attempt. The trigger only mutates state and
/// reports; presentation belongs to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapEvent {
    Started,
    Completed,
    Failed { message: String },
}

impl std::fmt::Display for SnapEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapEvent::Started => write!(f, "snap started"),
            SnapEvent::Completed => write!(f, "snap completed"),
            SnapEvent::Failed { message } => write!(f, "snap failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SnapState {
    last_snap: Option<Instant>,
    /// A trigger has been accepted and not yet resolved.
    armed: bool,
    /// A capture is physically in flight.
    capturing: bool,
}

/// Decides, once per frame, whether to initiate an automatic capture.
///
/// Fires when more than two faces share the same non-neutral vibe, no
/// capture is pending or in flight, and the cooldown has elapsed. The whole
/// check-and-set runs under one lock: the completion callbacks arrive from
/// the capture collaborator's execution context, not the frame path.
#[derive(Debug)]
pub struct AutoSnapTrigger {
    state: Mutex<SnapState>,
    cooldown: Duration,
}

impl Default for AutoSnapTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoSnapTrigger {
    pub fn new() -> Self {
        Self::with_cooldown(DEFAULT_SNAP_COOLDOWN)
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(SnapState {
                last_snap: None,
                armed: false,
                capturing: false,
            }),
            cooldown,
        }
    }

    /// Evaluate this frame's stabilized labels. Returns true when a capture
    /// should be initiated; the trigger is then armed until one of the
    /// resolution callbacks runs.
    pub fn should_snap(&self, labels: &[VibeLabel], now: Instant) -> bool {
        let Some(vibe) = group_vibe(labels) else {
            return false;
        };

        let mut state = self.state.lock().unwrap();
        if state.armed || state.capturing {
            debug!("Group vibe {} matched but a snap is pending", vibe);
            return false;
        }
        if let Some(last) = state.last_snap {
            if now.duration_since(last) <= self.cooldown {
                debug!("Group vibe {} matched within cooldown", vibe);
                return false;
            }
        }

        state.armed = true;
        state.last_snap = Some(now);
        info!(
            "Group vibe {} matched across {} labels, triggering snap",
            vibe,
            labels.len()
        );
        true
    }

    /// The external capture call is about to be made.
    pub fn on_snap_started(&self) -> SnapEvent {
        let mut state = self.state.lock().unwrap();
        state.capturing = true;
        SnapEvent::Started
    }

    /// The capture resolved successfully; the trigger returns to idle.
    pub fn on_snap_completed(&self) -> SnapEvent {
        let mut state = self.state.lock().unwrap();
        state.armed = false;
        state.capturing = false;
        SnapEvent::Completed
    }

    /// The capture failed; the trigger returns to idle. Failures are never
    /// retried — the next qualifying frame after the cooldown is the only
    /// recovery path.
    pub fn on_snap_failed(&self, message: impl Into<String>) -> SnapEvent {
        let message = message.into();
        warn!("Snap failed: {}", message);
        let mut state = self.state.lock().unwrap();
        state.armed = false;
        state.capturing = false;
        SnapEvent::Failed { message }
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().unwrap().armed
    }

    pub fn is_capturing(&self) -> bool {
        self.state.lock().unwrap().capturing
    }
}

/// The shared vibe across the frame's faces, if more than two agree.
/// Neutral and unknown readings are excluded before comparing.
pub fn group_vibe(labels: &[VibeLabel]) -> Option<Vibe> {
    let mut filtered = labels.iter().filter_map(|label| match label {
        VibeLabel::Known(vibe) if *vibe != Vibe::Neutral => Some(*vibe),
        _ => None,
    });

    let first = filtered.next()?;
    let mut count = 1;
    for vibe in filtered {
        if vibe != first {
            return None;
        }
        count += 1;
    }
    (count > 2).then_some(first)
}

/// External capture collaborator. Performs the actual image write and
/// resolves when it is done.
pub trait SnapService {
    fn take_snap(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Drives one capture through the external service, applying the trigger's
/// state transitions on start and on resolution. Call after `should_snap`
/// returned true.
pub async fn run_snap<S: SnapService>(trigger: &AutoSnapTrigger, service: &S) -> SnapEvent {
    trigger.on_snap_started();
    match service.take_snap().await {
        Ok(()) => trigger.on_snap_completed(),
        Err(e) => trigger.on_snap_failed(e.to_string()),
    }
}
