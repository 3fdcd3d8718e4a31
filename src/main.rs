//! Command line tools for pose capture: template inspection, offline pose
//! validation, sensor log smoothing and a simulated capture run.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use pose_capture::camera::{Camera, SyntheticCamera};
use pose_capture::capture::{CaptureEvent, CaptureFlow, CaptureState};
use pose_capture::config::{Config, SmoothingMode, EXAMPLE_CONFIG};
use pose_capture::estimator::ScriptedEstimator;
use pose_capture::keypoint::Pose;
use pose_capture::motion::MotionSample;
use pose_capture::template::{FsTemplateSource, PoseKind, PoseTemplate, TemplateCache};
use pose_capture::validation::{create_check, PoseCheck};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a reference template and print its zones and colors
    InspectTemplate {
        /// Template PNG
        template: PathBuf,

        /// Pose type the template belongs to (front, side)
        #[arg(short, long, default_value = "front")]
        kind: PoseKind,
    },

    /// Validate a keypoint file against a template
    Validate {
        /// Template PNG
        template: PathBuf,

        /// YAML file with a `keypoints` list
        keypoints: PathBuf,

        /// Video frame width the keypoints refer to
        #[arg(long, default_value = "640")]
        width: u32,

        /// Video frame height the keypoints refer to
        #[arg(long, default_value = "480")]
        height: u32,

        /// Pose type (front, side)
        #[arg(short, long, default_value = "front")]
        kind: PoseKind,
    },

    /// Smooth an accelerometer log with lines of `timestamp_ms,x,y`
    Smooth {
        /// CSV log
        samples: PathBuf,

        /// Filter mode (auto, low_pass, advanced, kalman)
        #[arg(short, long)]
        mode: Option<String>,

        /// Also classify each smoothed sample as upright or not
        #[arg(long)]
        orientation: bool,
    },

    /// Run a capture flow against a simulated camera with fixed keypoints
    Demo {
        /// YAML file with the keypoints the simulated estimator reports
        keypoints: PathBuf,

        /// Pose type (front, side)
        #[arg(short, long, default_value = "front")]
        kind: PoseKind,

        /// Where to write the captured JPEG
        #[arg(short, long, default_value = "capture.jpg")]
        output: PathBuf,

        /// Simulated time limit in seconds
        #[arg(long, default_value = "10")]
        timeout: u64,
    },

    /// Print an example configuration file
    ExampleConfig,
}

fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    info!("Loading configuration from: {}", path.display());
    match Config::from_file(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Failed to load config file: {}. Using defaults.", e);
            Config::default()
        }
    }
}

fn load_pose(path: &Path) -> Result<Pose> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("parsing keypoints in {}", path.display()))
}

fn parse_mode(name: &str) -> Result<SmoothingMode> {
    Ok(match name.to_lowercase().as_str() {
        "auto" => SmoothingMode::Auto,
        "low_pass" | "lowpass" => SmoothingMode::LowPass,
        "advanced" => SmoothingMode::Advanced,
        "kalman" => SmoothingMode::Kalman,
        other => bail!("Unknown smoothing mode: {other}"),
    })
}

fn inspect_template(path: &Path, kind: PoseKind) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let template = PoseTemplate::decode(&bytes, kind.zones())?;

    println!("{}: {}x{} ({} pose)", path.display(), template.width(), template.height(), kind);
    println!("Marker pixels: {}", template.pixel_count());
    println!("Colors (dark to bright):");
    for color in template.unique_colors() {
        println!("  {} x{}", color, template.pixels_by_color(color).len());
    }
    println!("Zones:");
    for zone in template.zones() {
        let pixels = template.zone_coordinates(zone.name).map_or(0, |set| set.len());
        println!("  {:<12} {:>6} px", zone.name, pixels);
        if pixels == 0 {
            warn!("Zone {} has no pixels in this template", zone.name);
        }
    }
    Ok(())
}

fn validate(config: &Config, template: &Path, keypoints: &Path, size: (u32, u32), kind: PoseKind) -> Result<bool> {
    let bytes = std::fs::read(template).with_context(|| format!("reading {}", template.display()))?;
    let template = Arc::new(PoseTemplate::decode(&bytes, kind.zones())?);
    let pose = load_pose(keypoints)?;

    let check = create_check(&config.validation, kind, Some(template));
    let report = check.evaluate(Some(&pose), size.0, size.1);
    println!("Policy:      {}", check.name());
    println!("Satisfied:   {}", report.satisfied.join(", "));
    println!("Unsatisfied: {}", report.unsatisfied.join(", "));
    println!("Valid:       {}", report.is_valid);
    Ok(report.is_valid)
}

fn smooth(config: &Config, samples: &Path, mode: Option<&str>, orientation: bool) -> Result<()> {
    let mut smoothing = config.smoothing.clone();
    if let Some(mode) = mode {
        smoothing.mode = parse_mode(mode)?;
    }
    let mut smoother = pose_capture::motion::MotionSmoother::new(smoothing)?;
    let classifier = config.orientation.classifier();
    info!("Smoothing with {}", smoother.filter_name());

    let content = std::fs::read_to_string(samples).with_context(|| format!("reading {}", samples.display()))?;
    let mut throttled = 0usize;
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('t') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [t, x, y] = fields.as_slice() else {
            bail!("line {}: expected `timestamp_ms,x,y`", line_no + 1);
        };
        let sample = MotionSample::new(
            x.parse().with_context(|| format!("line {}: x", line_no + 1))?,
            y.parse().with_context(|| format!("line {}: y", line_no + 1))?,
            t.parse().with_context(|| format!("line {}: timestamp", line_no + 1))?,
        );
        let sample = if orientation { classifier.normalize_raw(sample) } else { sample };

        match smoother.smooth(sample) {
            Some((sx, sy)) if orientation => {
                let o = classifier.classify((sx, sy));
                println!("{},{:.4},{:.4},{}", sample.timestamp_ms, o.x, o.y, o.upright);
            }
            Some((sx, sy)) => println!("{},{:.4},{:.4}", sample.timestamp_ms, sx, sy),
            None => throttled += 1,
        }
    }
    info!("{} samples throttled", throttled);
    Ok(())
}

fn demo(config: &Config, keypoints: &Path, kind: PoseKind, output: &Path, timeout_s: u64) -> Result<()> {
    const FRAME_MS: u64 = 33;

    let pose = load_pose(keypoints)?;
    let resolution = config.camera.ideal;
    let camera = Camera::new(
        Box::new(SyntheticCamera::new(resolution.width, resolution.height, resolution.fps)),
        config.camera.clone(),
    );
    let estimator = ScriptedEstimator::constant(pose);
    let mut flow = CaptureFlow::new(kind, config.clone(), camera, Box::new(estimator), false)?;

    let mut templates = TemplateCache::new();
    flow.load_template(&mut templates, &FsTemplateSource::new(&config.templates.root))?;
    flow.start()?;

    let mut elapsed = 0;
    while flow.state() != CaptureState::Reviewing {
        if elapsed > timeout_s * 1000 {
            let report = flow.last_report();
            bail!("No capture after {}s, unsatisfied zones: {:?}", timeout_s, report.unsatisfied);
        }
        if let Err(e) = flow.process_frame() {
            if e.is_terminal() {
                return Err(e.into());
            }
            warn!("{e}, restarting detection");
            flow.restart_detection()?;
        }
        for event in flow.advance(FRAME_MS) {
            match event {
                CaptureEvent::CountdownStarted(n) | CaptureEvent::CountdownTick(n) => println!("{n}"),
                CaptureEvent::CountdownCheck => println!("✓"),
                CaptureEvent::Failed(reason) => bail!("Capture failed: {reason}"),
                other => info!("{other:?}"),
            }
        }
        elapsed += FRAME_MS;
    }

    let Some(still) = flow.still() else {
        bail!("Flow is reviewing without a still");
    };
    std::fs::write(output, &still.jpeg).with_context(|| format!("writing {}", output.display()))?;
    println!("Captured {}x{} to {}", still.width, still.height, output.display());
    flow.cancel();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let config = load_config(args.config.as_deref());
    config.validate()?;

    match args.command {
        Command::InspectTemplate { template, kind } => inspect_template(&template, kind),
        Command::Validate {
            template,
            keypoints,
            width,
            height,
            kind,
        } => {
            if !validate(&config, &template, &keypoints, (width, height), kind)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Smooth {
            samples,
            mode,
            orientation,
        } => smooth(&config, &samples, mode.as_deref(), orientation),
        Command::Demo {
            keypoints,
            kind,
            output,
            timeout,
        } => demo(&config, &keypoints, kind, &output, timeout),
        Command::ExampleConfig => {
            print!("{EXAMPLE_CONFIG}");
            Ok(())
        }
    }
}
