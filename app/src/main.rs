use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{ArgAction, Parser};
use env_logger::Builder;
use log::LevelFilter;

use kitti_core::{FrameId, SceneId};
use kitti_pipeline::{FramePipeline, FramePolicy, PipelineConfig, PipelineError, RunSummary};

#[derive(Parser, Debug)]
#[command(
    name = "KITTI Merge",
    about = "Merges per-sensor Semantic-KITTI frames into combined point and label files",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
struct Cli {
    #[arg(short, long, required = true, value_name = "FILE")]
    config: PathBuf,

    /// Overrides output_root
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Overrides scene_ids, e.g. `--scenes 0 1 02`
    #[arg(long, num_args = 1.., value_name = "ID")]
    scenes: Vec<SceneId>,

    /// Restricts every scene to these frames
    #[arg(long, num_args = 1.., value_name = "ID")]
    frames: Vec<FrameId>,

    /// primary, union or intersection
    #[arg(long, value_name = "POLICY")]
    frame_policy: Option<FramePolicy>,

    #[arg(short, long)]
    jobs: Option<usize>,

    #[arg(long)]
    emit_sensor_frames: bool,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(output) = &self.output {
            config.output_root = output.clone();
        }
        if !self.scenes.is_empty() {
            config.scene_ids = self.scenes.clone();
        }
        if !self.frames.is_empty() {
            config.frames = Some(self.frames.clone());
        }
        if let Some(policy) = self.frame_policy {
            config.frame_policy = policy;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if self.emit_sensor_frames {
            config.emit_sensor_frames = true;
        }
    }
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(args: &Cli) -> Result<RunSummary, PipelineError> {
    let mut config = PipelineConfig::from_path(&args.config)?;
    args.apply(&mut config);

    log::info!("config: {:?}", args.config);
    log::info!("output folder: {:?}", config.output_root);
    for sensor in &config.sensors {
        log::info!(
            "sensor {}: {:?} (discriminator {})",
            sensor.name,
            sensor.source_root,
            sensor.discriminator
        );
    }
    log::info!("frame policy: {:?}", config.frame_policy);

    let pipeline = FramePipeline::new(config)?;
    let summary = pipeline.run()?;
    log::info!("report written to {:?}", pipeline.report_path());
    Ok(summary)
}

fn main() -> ExitCode {
    let args = Cli::parse();

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level(args.verbose))
        .init();

    let start = std::time::Instant::now();
    log::info!("start processing...");

    match run(&args) {
        Ok(summary) => {
            log::info!(
                "{} units: {} merged ({} empty), {} skipped, {} points written",
                summary.units,
                summary.merged,
                summary.empty,
                summary.skipped,
                summary.merged_points
            );
            for report in summary.skipped_reports() {
                log::warn!("skipped {}", report.key());
            }
            log::info!("Elapsed: {:?}", start.elapsed());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_config() {
        let args = Cli::try_parse_from([
            "kitti-merge",
            "--config",
            "merge.json",
            "--scenes",
            "0",
            "4",
            "--frames",
            "7",
            "--frame-policy",
            "Intersection",
            "-j",
            "3",
            "-vv",
        ])
        .unwrap();
        let mut config = PipelineConfig::new("out", Vec::new());
        args.apply(&mut config);

        assert_eq!(config.output_root, PathBuf::from("out"));
        assert_eq!(
            config.scene_ids.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            vec!["00", "04"]
        );
        assert_eq!(config.frames.unwrap()[0].to_string(), "007");
        assert_eq!(config.frame_policy, FramePolicy::Intersection);
        assert_eq!(config.jobs, Some(3));
        assert_eq!(level(args.verbose), LevelFilter::Trace);
    }

    #[test]
    fn rejects_bad_ids() {
        assert!(Cli::try_parse_from(["kitti-merge", "-c", "x.json", "--scenes", "a1"]).is_err());
        assert!(Cli::try_parse_from(["kitti-merge", "-c", "x.json", "--frames", "1000"]).is_err());
    }
}
