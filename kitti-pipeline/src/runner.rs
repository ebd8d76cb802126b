use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
};

use itertools::Itertools as _;
use kitti_core::{FrameError, FrameKey, LabelRecord, PointRecord, Result, SceneId};
use kitti_io::{
    layout::ATTRIBUTE_EXTENSION, locate_attribute_file, AttributeReader, PcdAttributeReader,
    SceneLayout,
};
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};

use crate::{
    config::{PipelineConfig, SensorConfig},
    error::PipelineError,
    filter::{FilteredFrame, FrameFilter},
    inject::{AttributeAlignment, IntensityInjector},
    merge::{FrameMerger, MergedFrame, SensorContribution},
    planner::UnitPlanner,
    report::{FrameReport, RunSummary},
};

pub const REPORT_FILE: &str = "merge_report.json";
pub const SENSOR_FRAMES_DIR: &str = "sensors";

const PROGRESS_INTERVAL: usize = 100;

struct SensorStage {
    config: SensorConfig,
    layout: SceneLayout,
    filter: FrameFilter,
    /// Where this sensor's enriched frames go when they are emitted.
    emit: Option<SceneLayout>,
}

impl SensorStage {
    fn name(&self) -> &str {
        &self.config.name
    }
}

/// Runs filter, inject and merge over every planned (scene, frame) unit.
pub struct FramePipeline {
    config: PipelineConfig,
    sensors: Vec<SensorStage>,
    injector: IntensityInjector,
    merger: FrameMerger,
    reader: Box<dyn AttributeReader>,
    output: SceneLayout,
}

impl FramePipeline {
    pub fn new(config: PipelineConfig) -> std::result::Result<Self, PipelineError> {
        config.validate()?;

        let sensors = config
            .sensors
            .iter()
            .map(|sensor| SensorStage {
                config: sensor.clone(),
                layout: SceneLayout::new(&sensor.source_root),
                filter: FrameFilter::new(sensor.discriminator),
                emit: config.emit_sensor_frames.then(|| {
                    SceneLayout::new(
                        config
                            .output_root
                            .join(SENSOR_FRAMES_DIR)
                            .join(&sensor.name),
                    )
                }),
            })
            .collect();

        Ok(Self {
            reader: Box::new(PcdAttributeReader::new(config.attribute_fields.clone())),
            output: SceneLayout::new(&config.output_root),
            injector: IntensityInjector::default(),
            merger: FrameMerger::new(),
            sensors,
            config,
        })
    }

    /// Swaps the attribute container reader.
    pub fn with_reader(mut self, reader: impl AttributeReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn report_path(&self) -> PathBuf {
        self.config.output_root.join(REPORT_FILE)
    }

    pub fn run(&self) -> std::result::Result<RunSummary, PipelineError> {
        let units = UnitPlanner::new(&self.config).plan()?;
        log::info!(
            "{} units planned across {} sensors, {} jobs",
            units.len(),
            self.sensors.len(),
            self.config.jobs()
        );

        for scene in units.iter().map(|key| key.scene).dedup() {
            self.copy_ancillary(&scene);
        }

        let summary = self.execute(&units)?;
        summary.write_json(&self.report_path())?;
        Ok(summary)
    }

    /// Processes `units` on a worker pool. Reports are aggregated by a single
    /// collector thread; a failed unit never stops the others.
    pub fn execute(&self, units: &[FrameKey]) -> std::result::Result<RunSummary, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs())
            .build()?;
        let (sender, receiver) = crossbeam::channel::unbounded::<FrameReport>();
        let total = units.len();

        let summary = crossbeam::thread::scope(|scope| {
            let collector = scope.spawn(move |_| {
                let mut summary = RunSummary::default();
                for report in receiver {
                    summary.record(report);
                    if summary.units % PROGRESS_INTERVAL == 0 {
                        log::info!("{}/{} units processed", summary.units, total);
                    }
                }
                summary
            });

            pool.install(|| {
                units.par_iter().for_each_with(sender, |sender, key| {
                    // only fails when the collector is gone
                    let _ = sender.send(self.run_unit(key));
                });
            });

            collector.join()
        })
        .map_err(|_| PipelineError::Collector)?
        .map_err(|_| PipelineError::Collector)?;

        Ok(summary.finish())
    }

    /// Processes one unit. Failures, panics included, become a skipped report.
    pub fn run_unit(&self, key: &FrameKey) -> FrameReport {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(key)))
            .unwrap_or_else(|payload| Err(FrameError::Panicked(panic_message(payload.as_ref()))));
        match outcome {
            Ok(merged) => {
                log::debug!("{key}: merged {} points", merged.len());
                FrameReport::merged(key, &merged)
            }
            Err(e) => {
                log::warn!("{key}: skipped, {} check failed: {e}", e.check());
                FrameReport::skipped(key, &e)
            }
        }
    }

    fn process(&self, key: &FrameKey) -> Result<MergedFrame> {
        let mut contributions = Vec::with_capacity(self.sensors.len());
        for stage in &self.sensors {
            match self.load_sensor(stage, key) {
                Ok(filtered) => {
                    log_label_classes(key, stage.name(), &filtered.labels);
                    contributions.push(SensorContribution::present(
                        stage.name(),
                        filtered.points,
                        filtered.labels,
                    ));
                }
                Err(e) if e.is_missing_source() => {
                    contributions.push(SensorContribution::missing(stage.name(), e.to_string()));
                }
                Err(e) => return Err(e.in_sensor(stage.name())),
            }
        }

        let merged = self.merger.merge(key, contributions)?;
        kitti_io::write_points(&self.output.points_path(key), &merged.points)?;
        kitti_io::write_labels(&self.output.labels_path(key), &merged.labels)?;
        log_label_classes(key, "merged", &merged.labels);
        Ok(merged)
    }

    fn load_sensor(&self, stage: &SensorStage, key: &FrameKey) -> Result<FilteredFrame> {
        let points = kitti_io::read_points(&stage.layout.points_path(key))?;
        let labels = kitti_io::read_labels(&stage.layout.labels_path(key))?;
        let mut filtered = stage.filter.filter(&points, &labels)?;
        if let Some(root) = &stage.config.intensity_root {
            // empty frames never touch the container
            if !filtered.points.is_empty() {
                filtered.points = self.inject_intensity(root, key, &filtered)?;
            }
        }

        if let Some(emit) = &stage.emit {
            kitti_io::write_points(&emit.points_path(key), &filtered.points)?;
            kitti_io::write_labels(&emit.labels_path(key), &filtered.labels)?;
        }
        Ok(filtered)
    }

    fn inject_intensity(
        &self,
        root: &Path,
        key: &FrameKey,
        filtered: &FilteredFrame,
    ) -> Result<PointRecord> {
        let dir = root.join(key.scene.to_string());
        let path = locate_attribute_file(&dir, &key.frame)?.ok_or_else(|| {
            FrameError::MissingSource(dir.join(format!("{}.{ATTRIBUTE_EXTENSION}", key.frame)))
        })?;
        let raw = self.reader.read_attribute(&path)?;
        match self.config.attribute_alignment {
            AttributeAlignment::Source => {
                self.injector
                    .inject_selected(&filtered.points, &raw, &filtered.selection)
            }
            AttributeAlignment::Filtered => self.injector.inject(&filtered.points, &raw),
        }
    }

    /// Copies calibration, poses and camera folders from the first sensor
    /// that has the scene.
    fn copy_ancillary(&self, scene: &SceneId) {
        let Some(src) = self
            .sensors
            .iter()
            .map(|stage| stage.layout.scene_dir(scene))
            .find(|dir| dir.is_dir())
        else {
            return;
        };
        let copied = kitti_io::ancillary::copy_ancillary(
            &src,
            &self.output.scene_dir(scene),
            &self.config.ancillary.files,
            &self.config.ancillary.folders,
        );
        log::debug!("scene {scene}: copied {copied} ancillary entries from {:?}", src);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn log_label_classes(key: &FrameKey, origin: &str, labels: &LabelRecord) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    // lower 16 bits hold the semantic class, upper 16 the instance
    let classes = labels
        .as_slice()
        .iter()
        .map(|label| label & 0xffff)
        .unique()
        .count();
    log::debug!("{key}: {origin} has {} labels in {classes} classes", labels.len());
}
