// Frame-processing pipeline: stabilized labels in, overlay + snap decisions out

use crate::autosnap::AutoSnapTrigger;
use crate::error::Result;
use crate::models::{FaceObservation, FaceVibe, FrameAnalysis, VibeLabel};
use crate::stabilizer::{top_vibes, VibeTracker};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::warn;

/// Upstream detection + classification front end: everything between a
/// camera frame and per-face probability vectors. The implementation is
/// expected to drop stale frames rather than queue them, so at most one
/// frame is in flight.
pub trait VibeSource {
    /// The faces visible in the next frame, with their raw scores.
    fn observe(&mut self) -> Result<Vec<FaceObservation>>;
}

/// Tuning knobs for the frame-processing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Minimum dwell before a stabilizer accepts a non-neutral switch.
    pub switch_dwell: Duration,

    /// Minimum time between accepted auto-snap triggers.
    pub snap_cooldown: Duration,

    /// Classify only every Nth frame; intermediate frames produce an empty
    /// analysis. 1 means every frame.
    pub inference_interval: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            switch_dwell: crate::stabilizer::DEFAULT_SWITCH_DWELL,
            snap_cooldown: crate::autosnap::DEFAULT_SNAP_COOLDOWN,
            inference_interval: 1,
        }
    }
}

/// Per-frame orchestration: stabilizes each visible face's vibe, evaluates
/// the auto-snap trigger on the result, and broadcasts the analysis to the
/// rendering collaborator.
///
/// Strictly single-threaded, one call per frame; the trigger is shared
/// behind an `Arc` so the capture collaborator can resolve completions from
/// its own execution context.
pub struct VibePipeline {
    tracker: VibeTracker,
    trigger: Arc<AutoSnapTrigger>,
    fps: FpsCounter,
    frame_count: u64,
    inference_interval: u32,
    result_sender: broadcast::Sender<FrameAnalysis>,
}

impl VibePipeline {
    pub fn new(config: PipelineConfig, result_sender: broadcast::Sender<FrameAnalysis>) -> Self {
        Self {
            tracker: VibeTracker::with_dwell(config.switch_dwell),
            trigger: Arc::new(AutoSnapTrigger::with_cooldown(config.snap_cooldown)),
            fps: FpsCounter::new(),
            frame_count: 0,
            inference_interval: config.inference_interval.max(1),
            result_sender,
        }
    }

    /// Handle to the trigger, for the capture collaborator's lifecycle
    /// callbacks.
    pub fn trigger(&self) -> Arc<AutoSnapTrigger> {
        Arc::clone(&self.trigger)
    }

    /// Number of faces with live stabilizer state.
    pub fn tracked_faces(&self) -> usize {
        self.tracker.len()
    }

    /// Process one frame's observations.
    pub fn process_frame(&mut self, faces: &[FaceObservation], now: Instant) -> FrameAnalysis {
        self.frame_count += 1;
        let fps = self.fps.tick(now);

        let visible: Vec<_> = faces.iter().map(|obs| obs.face).collect();
        self.tracker.retain_visible(&visible);

        let mut overlays = Vec::new();
        let mut labels = Vec::new();

        if self.frame_count % u64::from(self.inference_interval) == 0 {
            for obs in faces {
                let vibe = self.tracker.classify(obs.face, &obs.probs, now);
                let label = VibeLabel::from(vibe);
                labels.push(label);
                overlays.push(FaceVibe {
                    face: obs.face,
                    label,
                    color: label.color(),
                    top: top_vibes(&obs.probs),
                });
            }
        }

        let snap = self.trigger.should_snap(&labels, now);

        let analysis = FrameAnalysis {
            faces: overlays,
            snap,
            fps,
        };
        if let Err(e) = self.result_sender.send(analysis.clone()) {
            warn!("Failed to send frame analysis: {}", e);
        }
        analysis
    }

    /// Pull one frame from the upstream collaborators and process it.
    pub fn poll<S: VibeSource>(&mut self, source: &mut S) -> Result<FrameAnalysis> {
        let faces = source.observe()?;
        Ok(self.process_frame(&faces, Instant::now()))
    }
}

/// Counts frames per wall-clock second; reports the rate each time a
/// one-second window closes.
#[derive(Debug, Default)]
pub struct FpsCounter {
    window_start: Option<Instant>,
    frames: u32,
    fps: u32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame. Returns the measured rate when a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;
        if now.duration_since(start) >= Duration::from_secs(1) {
            self.fps = self.frames;
            self.frames = 0;
            self.window_start = Some(now);
            Some(self.fps)
        } else {
            None
        }
    }

    /// The most recently completed window's rate.
    pub fn current(&self) -> u32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Probabilities, Vibe, VIBE_COUNT};

    fn probs_for(scores: &[(Vibe, f32)]) -> Probabilities {
        let mut raw = [0.0f32; VIBE_COUNT];
        for &(vibe, score) in scores {
            raw[vibe.index()] = score;
        }
        Probabilities::new(raw)
    }

    fn happy_face(face: i32) -> FaceObservation {
        FaceObservation::new(face, probs_for(&[(Vibe::Happy, 0.80)]))
    }

    fn pipeline() -> (VibePipeline, broadcast::Receiver<FrameAnalysis>) {
        let (sender, receiver) = broadcast::channel(32);
        (VibePipeline::new(PipelineConfig::default(), sender), receiver)
    }

    #[test]
    fn overlays_carry_label_color_and_top_list() {
        let (mut pipeline, _rx) = pipeline();
        let analysis = pipeline.process_frame(&[happy_face(1)], Instant::now());

        assert_eq!(analysis.faces.len(), 1);
        let overlay = &analysis.faces[0];
        assert_eq!(overlay.label, VibeLabel::Known(Vibe::Happy));
        assert_eq!(overlay.color, Vibe::Happy.color());
        assert_eq!(overlay.top.len(), 3);
        assert_eq!(overlay.top[0].0, Vibe::Happy);
    }

    #[test]
    fn faces_stabilize_independently() {
        let (mut pipeline, _rx) = pipeline();
        let t0 = Instant::now();
        let sad = FaceObservation::new(2, probs_for(&[(Vibe::Sad, 0.60)]));

        pipeline.process_frame(&[happy_face(1), sad], t0);

        // Face 2 flips to happy within its dwell window: still sad.
        let analysis = pipeline.process_frame(
            &[happy_face(1), happy_face(2)],
            t0 + Duration::from_millis(100),
        );
        assert_eq!(analysis.faces[0].label, VibeLabel::Known(Vibe::Happy));
        assert_eq!(analysis.faces[1].label, VibeLabel::Known(Vibe::Sad));
    }

    #[test]
    fn three_matching_faces_raise_the_snap_flag() {
        let (mut pipeline, _rx) = pipeline();
        let faces = [happy_face(1), happy_face(2), happy_face(3)];

        let analysis = pipeline.process_frame(&faces, Instant::now());
        assert!(analysis.snap);
        assert!(pipeline.trigger().is_armed());
    }

    #[test]
    fn two_matching_faces_do_not_snap() {
        let (mut pipeline, _rx) = pipeline();
        let faces = [happy_face(1), happy_face(2)];

        let analysis = pipeline.process_frame(&faces, Instant::now());
        assert!(!analysis.snap);
    }

    #[test]
    fn lost_faces_are_dropped_from_tracking() {
        let (mut pipeline, _rx) = pipeline();
        let t0 = Instant::now();

        pipeline.process_frame(&[happy_face(1), happy_face(2)], t0);
        assert_eq!(pipeline.tracked_faces(), 2);

        pipeline.process_frame(&[happy_face(1)], t0 + Duration::from_millis(33));
        assert_eq!(pipeline.tracked_faces(), 1);
    }

    #[test]
    fn inference_interval_skips_frames() {
        let (sender, _rx) = broadcast::channel(32);
        let config = PipelineConfig {
            inference_interval: 2,
            ..Default::default()
        };
        let mut pipeline = VibePipeline::new(config, sender);
        let t0 = Instant::now();

        // Frame 1 is skipped, frame 2 classifies.
        let first = pipeline.process_frame(&[happy_face(1)], t0);
        assert!(first.faces.is_empty());
        let second = pipeline.process_frame(&[happy_face(1)], t0 + Duration::from_millis(33));
        assert_eq!(second.faces.len(), 1);
    }

    #[test]
    fn analyses_reach_the_broadcast_channel() {
        let (mut pipeline, mut rx) = pipeline();
        pipeline.process_frame(&[happy_face(1)], Instant::now());

        let received = rx.try_recv().expect("analysis should be broadcast");
        assert_eq!(received.faces.len(), 1);
    }

    #[test]
    fn poll_pulls_from_the_source() {
        struct Scripted(Vec<FaceObservation>);
        impl VibeSource for Scripted {
            fn observe(&mut self) -> crate::error::Result<Vec<FaceObservation>> {
                Ok(self.0.clone())
            }
        }

        let (mut pipeline, _rx) = pipeline();
        let mut source = Scripted(vec![happy_face(1)]);
        let analysis = pipeline.poll(&mut source).expect("source never fails");
        assert_eq!(analysis.faces.len(), 1);
    }

    #[test]
    fn fps_counter_reports_on_window_close() {
        let mut fps = FpsCounter::new();
        let t0 = Instant::now();

        assert_eq!(fps.tick(t0), None);
        for i in 1..10 {
            assert_eq!(fps.tick(t0 + Duration::from_millis(i * 100)), None);
        }
        // The tick that closes the one-second window reports all frames in it.
        assert_eq!(fps.tick(t0 + Duration::from_millis(1000)), Some(11));
        assert_eq!(fps.current(), 11);
    }
}
