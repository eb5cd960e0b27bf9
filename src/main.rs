use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vibecheck::autosnap::{run_snap, SnapService};
use vibecheck::error::Result;
use vibecheck::models::{FaceObservation, Probabilities, Vibe, VIBE_COUNT};
use vibecheck::pipeline::{PipelineConfig, VibePipeline, VibeSource};

/// Initializes the logging system (file only, no console output)
fn init_logging() -> Result<()> {
    let log_file = std::fs::File::create("vibecheck.log").map_err(vibecheck::error::VibeCheckError::Io)?;

    let file_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false);

    tracing_subscriber::registry().with(file_layer).init();

    Ok(())
}

/// Scripted stand-in for the camera + detection + classification front end:
/// three faces that drift from neutral into a shared happy vibe.
struct ScriptedSource {
    frame: u32,
}

impl ScriptedSource {
    fn new() -> Self {
        Self { frame: 0 }
    }

    fn face(face: i32, happy: f32, neutral: f32) -> FaceObservation {
        let mut raw = [0.0f32; VIBE_COUNT];
        raw[Vibe::Happy.index()] = happy;
        raw[Vibe::Neutral.index()] = neutral;
        FaceObservation::new(face, Probabilities::new(raw))
    }
}

impl VibeSource for ScriptedSource {
    fn observe(&mut self) -> Result<Vec<FaceObservation>> {
        self.frame += 1;
        // Smiles spread over the first second of frames.
        let happy = (self.frame as f32 / 30.0).min(0.9);
        Ok(vec![
            Self::face(1, happy, 0.5),
            Self::face(2, happy * 0.8, 0.5),
            Self::face(3, happy * 0.6, 0.5),
        ])
    }
}

/// Stand-in for the external capture collaborator.
struct DemoSnapService;

impl SnapService for DemoSnapService {
    async fn take_snap(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }
}

fn main() -> Result<()> {
    init_logging()?;

    let (result_sender, mut result_receiver) = broadcast::channel(32);
    let mut pipeline = VibePipeline::new(PipelineConfig::default(), result_sender);
    let trigger = pipeline.trigger();
    let mut source = ScriptedSource::new();
    let service = DemoSnapService;

    let rt = tokio::runtime::Runtime::new().map_err(vibecheck::error::VibeCheckError::Io)?;

    info!("Starting scripted vibe demo");
    let started = Instant::now();

    // ~3 seconds of frames at roughly 30 FPS.
    for _ in 0..90 {
        let analysis = pipeline.poll(&mut source)?;

        if let Ok(result) = result_receiver.try_recv() {
            for overlay in &result.faces {
                info!("Face {} stabilized vibe: {}", overlay.face, overlay.label);
            }
        }

        if analysis.snap {
            let event = rt.block_on(run_snap(&trigger, &service));
            println!("[{:>6.2?}] {event}", started.elapsed());
        }
        if let Some(fps) = analysis.fps {
            println!("[{:>6.2?}] FPS: {fps}", started.elapsed());
        }

        std::thread::sleep(Duration::from_millis(33));
    }

    println!("Demo finished after {:.2?}", started.elapsed());
    Ok(())
}
