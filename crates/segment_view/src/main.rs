//! Headless scene driver: paints a synthetic label image, replays a scripted
//! sequence of selection, focus and time point changes against a
//! [`SceneSynchronizer`], and reports what ended up on the surface.

mod config;
mod surface;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glam::DVec3;
use segment_mesh::scene::{ColoringModel, GlasbeyColoring, SceneSynchronizer, SelectionSet};
use segment_mesh::{Color, DenseLabelVolume, LabelId, LabelPyramid, RenderSurface, Segment};

use config::{ImageSpec, ObjectSpec, Scenario, Step};
use surface::HeadlessScene;

const BUNDLED_SCENARIO: &str = include_str!("../scenario.toml");

#[derive(Parser, Debug)]
#[command(name = "segment_view")]
#[command(about = "Replay a segment selection scenario against a headless 3D scene")]
struct Args {
  /// Scenario TOML file (defaults to the bundled scenario)
  #[arg(short, long)]
  scenario: Option<PathBuf>,

  /// Override the voxel spacing used for meshing (0 = auto-resolution)
  #[arg(long)]
  voxel_spacing: Option<f64>,

  /// Override the transparency of displayed segments
  #[arg(long)]
  transparency: Option<f32>,

  /// Override the number of smoothing iterations
  #[arg(long)]
  smoothing: Option<u32>,

  /// Seconds to wait for the scene to settle after each step
  #[arg(long, default_value_t = 30)]
  timeout: u64,
}

/// Glasbey coloring whose seed can be changed between steps.
#[derive(Default)]
struct SeededColoring {
  seed: AtomicU64,
}

impl ColoringModel for SeededColoring {
  fn color_of(&self, segment: &Segment) -> Color {
    GlasbeyColoring::new(self.seed.load(Ordering::Relaxed)).color_of(segment)
  }
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  let mut scenario = match &args.scenario {
    Some(path) => Scenario::load(path)?,
    None => Scenario::parse(BUNDLED_SCENARIO).context("Bundled scenario is invalid")?,
  };
  if let Some(spacing) = args.voxel_spacing {
    scenario.view.voxel_spacing = spacing;
  }
  if let Some(transparency) = args.transparency {
    scenario.view.transparency = transparency;
  }
  if let Some(iterations) = args.smoothing {
    scenario.view.smoothing_iterations = iterations;
  }

  println!("Segment view");
  println!(
    "  Image: {} {:?} voxels, spacing {:?}, {} coarser levels, {} time points",
    scenario.image.name,
    scenario.image.dimensions,
    scenario.image.spacing,
    scenario.image.levels.len(),
    scenario.image.time_points
  );
  println!("  Objects: {}", scenario.objects.len());
  println!("  Steps: {}", scenario.steps.len());
  println!();

  let pyramid = paint_pyramid(&scenario.image, &scenario.objects);
  let segments = segments(&scenario.image, &scenario.objects);

  let scene = HeadlessScene::new();
  let selection = Arc::new(SelectionSet::new());
  let coloring = Arc::new(SeededColoring::default());
  let factory = {
    let scene = scene.clone();
    move || -> segment_mesh::Result<Box<dyn RenderSurface>> { Ok(scene.surface()) }
  };

  let sync = SceneSynchronizer::new(selection.clone(), coloring.clone(), factory);
  sync.set_config(scenario.view.clone())?;
  sync.register_source(Arc::new(pyramid));
  sync.set_enabled(true)?;

  let timeout = Duration::from_secs(args.timeout);
  let lookup = |label: LabelId, time_point: u32| -> Result<Arc<Segment>> {
    match segments.get(&(label, time_point)) {
      Some(segment) => Ok(Arc::clone(segment)),
      None => bail!("no object with label {} at time point {}", label, time_point),
    }
  };

  for (i, step) in scenario.steps.iter().enumerate() {
    match step {
      Step::Select { label, time_point } => {
        selection.select(lookup(*label, *time_point)?);
        sync.on_selection_changed();
      }
      Step::Deselect { label, time_point } => {
        selection.deselect(&lookup(*label, *time_point)?.key);
        sync.on_selection_changed();
      }
      Step::Focus { label, time_point } => {
        let segment = lookup(*label, *time_point)?;
        selection.focus(Arc::clone(&segment));
        sync.on_focus(segment);
      }
      Step::Recolor { seed } => {
        coloring.seed.store(*seed, Ordering::Relaxed);
        sync.on_coloring_changed();
      }
      Step::Recompute => {
        sync.reconcile(true);
      }
      Step::TimePoint { time_point } => {
        sync.switch_time_point(*time_point);
      }
      Step::Enable => {
        sync.set_enabled(true)?;
      }
      Step::Disable => {
        sync.set_enabled(false)?;
      }
    }

    if !sync.wait_idle(timeout) {
      bail!("scene did not settle within {}s after step {} ({:?})", args.timeout, i + 1, step);
    }

    let shown: Vec<String> = scene.contents().into_iter().map(|c| c.name).collect();
    println!(
      "[{:>2}] {:<40} t={} shown: [{}]",
      i + 1,
      format!("{:?}", step),
      sync.current_time_point(),
      shown.join(", ")
    );
  }

  println!();
  println!("Final scene:");
  for content in scene.contents() {
    println!(
      "  {:<20} {:>6} triangles  color {:#010x}  transparency {:.2}",
      content.name, content.triangles, content.color.0, content.transparency
    );
  }
  println!("  Focus animations: {}", scene.focus_animations());

  let stats = sync.stats();
  println!();
  println!("Stats:");
  println!("  Flood fills:    {}", stats.flood_fills);
  println!("  Extractions:    {}", stats.extractions);
  println!("  Cache hits:     {}", stats.cache_hits);
  println!("  Empty results:  {}", stats.empty_results);
  println!("  Failures:       {}", stats.failures);
  println!("  Mean extraction: {:.0} us", stats.mean_extraction_us);

  sync.close()?;
  sync.wait_idle(timeout);
  Ok(())
}

/// Level 0 frames with every object painted in, plus downsampled levels.
fn paint_pyramid(image: &ImageSpec, objects: &[ObjectSpec]) -> LabelPyramid {
  let frames = (0..image.time_points).map(|time_point| {
    let mut volume = DenseLabelVolume::new(image.dimensions);
    for object in objects.iter().filter(|o| o.time_point() == time_point) {
      paint(&mut volume, object);
    }
    (time_point, volume)
  });

  LabelPyramid::with_downsampled_levels(
    image.name.clone(),
    DVec3::from_array(image.spacing),
    &image.levels,
    frames,
  )
}

fn paint(volume: &mut DenseLabelVolume, object: &ObjectSpec) {
  match object {
    ObjectSpec::Block { label, min, max, .. } => volume.fill_block(*min, *max, *label),
    ObjectSpec::Ball {
      label, center, radius, ..
    } => {
      let dims = volume.dimensions();
      let center = DVec3::from_array(*center);
      let lo = (center - *radius).floor().max(DVec3::ZERO);
      let hi = center + *radius;
      for z in lo.z as usize..=(hi.z as usize).min(dims[2].saturating_sub(1)) {
        for y in lo.y as usize..=(hi.y as usize).min(dims[1].saturating_sub(1)) {
          for x in lo.x as usize..=(hi.x as usize).min(dims[0].saturating_sub(1)) {
            if DVec3::new(x as f64, y as f64, z as f64).distance(center) <= *radius {
              volume.set(x, y, z, *label);
            }
          }
        }
      }
    }
  }
}

/// One segment per (label, time point), anchored inside its object.
fn segments(image: &ImageSpec, objects: &[ObjectSpec]) -> HashMap<(LabelId, u32), Arc<Segment>> {
  let spacing = DVec3::from_array(image.spacing);
  let mut segments = HashMap::new();
  for object in objects {
    segments
      .entry((object.label(), object.time_point()))
      .or_insert_with(|| {
        let anchor = DVec3::from_array(object.anchor_voxel()) * spacing;
        Arc::new(Segment::new(
          image.name.as_str(),
          object.label(),
          object.time_point(),
          anchor,
        ))
      });
  }
  segments
}
