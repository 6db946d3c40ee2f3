use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, SecondsFormat};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trackscrub::geojson::{segment_collection, track_feature};
use trackscrub::{
    parse_cursor_token, parse_track, ChartPrimitive, ChartScene, MapScene, RangePolicy,
    ScrubReport, Session, Track, ViewConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scrub GPS tracks in time and render synchronized views", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Move the cursor to one or more instants and report what every view shows
    Scrub(ScrubArgs),
    /// Write the per-sample table (time, position, elevation, heart rate) as CSV
    Export(ExportArgs),
    /// Convert the track to GeoJSON
    Geojson(GeojsonArgs),
    /// Render the elevation/heart-rate chart at one cursor position
    Render(RenderArgs),
    /// Render evenly spaced cursor positions as a PNG frame sequence
    Frames(FramesArgs),
}

impl Command {
    fn track(&self) -> &TrackArgs {
        match self {
            Command::Scrub(args) => &args.track,
            Command::Export(args) => &args.track,
            Command::Geojson(args) => &args.track,
            Command::Render(args) => &args.track,
            Command::Frames(args) => &args.track,
        }
    }
}

#[derive(Parser, Debug)]
struct TrackArgs {
    /// GPX/FIT file to load
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// View configuration JSON (sizes, colors, range policy)
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct ScrubArgs {
    #[command(flatten)]
    track: TrackArgs,

    /// Cursor positions: seconds since start (`95`, `95s`), `MM:SS`, `H:MM:SS` or RFC 3339
    #[arg(long = "at", required = true, num_args = 1.., value_delimiter = ',')]
    at: Vec<String>,

    /// Reject cursors outside the track instead of clamping
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    track: TrackArgs,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Parser, Debug)]
struct GeojsonArgs {
    #[command(flatten)]
    track: TrackArgs,

    /// Output GeoJSON path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Emit heart-rate styled two-point segments instead of one line
    #[arg(long, action = ArgAction::SetTrue)]
    segments: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    track: TrackArgs,

    /// Cursor position (same syntax as `scrub --at`)
    #[arg(long, default_value = "0")]
    at: String,

    /// Output PNG path (defaults to chart.png when no SVG is requested)
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Output SVG path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Pixel density multiplier
    #[arg(long, default_value_t = 2)]
    scale: u32,
}

#[derive(Parser, Debug)]
struct FramesArgs {
    #[command(flatten)]
    track: TrackArgs,

    /// Directory receiving frame_00000.png ...
    #[arg(long, value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Number of frames spread over the whole track
    #[arg(long, default_value_t = 24)]
    count: usize,

    /// Pixel density multiplier
    #[arg(long, default_value_t = 2)]
    scale: u32,
}

#[derive(Copy, Clone, Debug)]
enum ChartKind {
    Png,
    Svg,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.command.track().verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Scrub(args) => handle_scrub(args),
        Command::Export(args) => handle_export(args),
        Command::Geojson(args) => handle_geojson(args),
        Command::Render(args) => handle_render(args),
        Command::Frames(args) => handle_frames(args),
    }
}

fn load_inputs(args: &TrackArgs) -> Result<(Track, ViewConfig)> {
    let config = match args.config.as_ref() {
        Some(path) => ViewConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ViewConfig::default(),
    };
    let data = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let hint = args
        .input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("gpx");
    let track = parse_track(&data, hint)
        .with_context(|| format!("failed to parse {}", args.input.display()))?;
    info!(
        "Loaded {} points from {} ({}s)",
        track.len(),
        args.input.display(),
        track.time_domain().span().num_seconds()
    );
    Ok((track, config))
}

fn build_session(track: Track, config: &ViewConfig) -> Result<Session<MapScene, ChartScene>> {
    let chart = ChartScene::new(config.slider_width, config.chart_height, config.margin);
    Ok(Session::new(track, MapScene::new(), chart, config)?)
}

fn handle_scrub(args: ScrubArgs) -> Result<()> {
    let (track, mut config) = load_inputs(&args.track)?;
    if args.strict {
        config.range_policy = RangePolicy::Strict;
    }
    let start = track.time_domain().start;
    let mut session = build_session(track, &config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for token in &args.at {
        let cursor = parse_cursor_token(token, start)?;
        let report = session
            .scrub(cursor)
            .with_context(|| format!("cannot move cursor to '{}'", token))?;
        let marker = session
            .map()
            .marker_position(session.marker())
            .ok_or_else(|| anyhow!("session has no marker"))?;
        writeln!(
            out,
            "{}\t{}\t{:.6},{:.6}\t{}\t{:.1} m",
            report.elapsed,
            report
                .sample
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            marker.lon,
            marker.lat,
            report.heart_label,
            report.sample.value.elevation
        )?;
    }
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<()> {
    let (track, config) = load_inputs(&args.track)?;
    let session = build_session(track, &config)?;
    if args.output.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut writer = csv::Writer::from_writer(stdout.lock());
        write_sample_rows(&session, &mut writer)
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        write_sample_rows(&session, &mut writer)?;
        info!("Wrote sample CSV: {}", args.output.display());
        Ok(())
    }
}

fn write_sample_rows<W: Write>(
    session: &Session<MapScene, ChartScene>,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record([
        "time",
        "elapsed",
        "longitude",
        "latitude",
        "elevation_m",
        "heart_rate_bpm",
        "distance_m",
        "heart_color",
    ])?;

    let colors = session.heart_colors();
    let distances = session.track().distances_m();
    for (sample, distance) in session.samples().iter().zip(distances.iter()) {
        let value = &sample.value;
        writer.write_record([
            sample.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            session.slider().label(sample.timestamp),
            format!("{:.6}", value.position.lon),
            format!("{:.6}", value.position.lat),
            format!("{:.1}", value.elevation),
            value
                .heart_rate
                .map(|v| format!("{:.0}", v))
                .unwrap_or_else(|| "".into()),
            format!("{:.1}", distance),
            value
                .heart_rate
                .map(|v| colors.apply(v).to_hex())
                .unwrap_or_else(|| "".into()),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn handle_geojson(args: GeojsonArgs) -> Result<()> {
    let (track, config) = load_inputs(&args.track)?;
    let value = if args.segments {
        let (low, high) = config.heart_colors()?;
        let extent = track.heart_rate_extent().unwrap_or((0.0, 0.0));
        let colors = trackscrub::ColorScale::new(extent, low, high);
        segment_collection(&track, &colors, config.elevation_weight_divisor)
    } else {
        track_feature(&track)
    };
    let text = serde_json::to_string_pretty(&value)?;
    if args.output.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", text)?;
    } else {
        fs::write(&args.output, text)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        info!("Wrote GeoJSON: {}", args.output.display());
    }
    Ok(())
}

fn handle_render(args: RenderArgs) -> Result<()> {
    let (track, config) = load_inputs(&args.track)?;
    let start = track.time_domain().start;
    let mut session = build_session(track, &config)?;
    let report = session.scrub(parse_cursor_token(&args.at, start)?)?;
    let caption = frame_caption(&report);
    let (_, scene) = session.into_surfaces();

    let mut targets: Vec<(PathBuf, ChartKind)> = Vec::new();
    if let Some(path) = args.png.as_ref() {
        targets.push((path.clone(), ChartKind::Png));
    }
    if let Some(path) = args.svg.as_ref() {
        targets.push((path.clone(), ChartKind::Svg));
    }
    if targets.is_empty() {
        targets.push((PathBuf::from("chart.png"), ChartKind::Png));
    }

    for (path, kind) in targets {
        if let Err(err) = render_scene_guard(&scene, &caption, &path, kind, args.scale) {
            warn!("Skipping {:?} render ({}): {}", kind, path.display(), err);
        } else {
            info!("Wrote chart: {}", path.display());
        }
    }
    Ok(())
}

fn handle_frames(args: FramesArgs) -> Result<()> {
    let (track, config) = load_inputs(&args.track)?;
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let domain = track.time_domain();
    let span_ms = domain.span().num_milliseconds() as f64;
    let count = args.count.max(1);

    let written = (0..count)
        .into_par_iter()
        .map(|i| -> Result<PathBuf> {
            let frac = if count == 1 {
                0.0
            } else {
                i as f64 / (count - 1) as f64
            };
            let cursor = domain.start + Duration::milliseconds((span_ms * frac).round() as i64);
            let mut session = build_session(track.clone(), &config)?;
            let report = session.scrub(cursor)?;
            let caption = frame_caption(&report);
            let (_, scene) = session.into_surfaces();
            let path = args.out_dir.join(format!("frame_{:05}.png", i));
            render_scene_guard(&scene, &caption, &path, ChartKind::Png, args.scale)
                .map_err(|err| anyhow!("frame {}: {}", i, err))?;
            Ok(path)
        })
        .collect::<Result<Vec<_>>>()?;

    info!("Wrote {} frames to {}", written.len(), args.out_dir.display());
    Ok(())
}

fn frame_caption(report: &ScrubReport) -> String {
    format!(
        "{}  {}  {:.0} m",
        report.elapsed, report.heart_label, report.sample.value.elevation
    )
}

fn render_scene_guard(
    scene: &ChartScene,
    caption: &str,
    path: &Path,
    kind: ChartKind,
    scale: u32,
) -> Result<(), String> {
    let render = || -> Result<(), String> {
        render_scene(scene, caption, path, kind, scale.max(1))
            .map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn render_scene(
    scene: &ChartScene,
    caption: &str,
    path: &Path,
    kind: ChartKind,
    scale: u32,
) -> Result<()> {
    let (w, h) = scene.outer_size();
    let factor = scale as f64;
    // room for the caption under the plot
    let size = ((w * factor).ceil() as u32, ((h + 24.0) * factor).ceil() as u32);
    match kind {
        ChartKind::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_scene(root, scene, caption, factor)?;
        }
        ChartKind::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_scene(root, scene, caption, factor)?;
        }
    }
    Ok(())
}

fn class_color(class: &str) -> RGBColor {
    match class {
        "elevation-area" => RGBColor(204, 204, 204),
        "heart-line" => RGBColor(200, 0, 100),
        "heart-indicator" => RGBColor(139, 0, 0),
        _ => RGBColor(0, 0, 0),
    }
}

fn draw_scene<DB>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    scene: &ChartScene,
    caption: &str,
    factor: f64,
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let margin = scene.margin();
    let to_px = |(x, y): (f64, f64)| -> (i32, i32) {
        (
            ((margin.left + x) * factor).round() as i32,
            ((margin.top + y) * factor).round() as i32,
        )
    };

    for primitive in scene.primitives() {
        match primitive {
            ChartPrimitive::Area {
                class,
                baseline,
                points,
            } => {
                let (Some(first), Some(last)) = (points.first(), points.last()) else {
                    continue;
                };
                let mut outline = Vec::with_capacity(points.len() + 2);
                outline.push(to_px((first.0, *baseline)));
                outline.extend(points.iter().map(|&p| to_px(p)));
                outline.push(to_px((last.0, *baseline)));
                root.draw(&Polygon::new(outline, class_color(class).filled()))?;
            }
            ChartPrimitive::Path { class, runs } => {
                let style = class_color(class).stroke_width((factor * 1.5).round() as u32);
                for run in runs {
                    let pixels: Vec<(i32, i32)> = run.iter().map(|&p| to_px(p)).collect();
                    root.draw(&PathElement::new(pixels, style))?;
                }
            }
            ChartPrimitive::Text {
                class,
                x,
                y,
                text,
            } => {
                if text.is_empty() {
                    continue;
                }
                let style = ("sans-serif", 11.0 * factor)
                    .into_font()
                    .color(&class_color(class))
                    .pos(Pos::new(HPos::Center, VPos::Bottom));
                root.draw(&Text::new(text.clone(), to_px((*x, *y)), style))?;
            }
            ChartPrimitive::Rect {
                class,
                x,
                y,
                width,
                height,
            } => {
                root.draw(&Rectangle::new(
                    [to_px((*x, *y)), to_px((x + width, y + height))],
                    class_color(class).filled(),
                ))?;
            }
        }
    }

    let caption_style = ("sans-serif", 12.0 * factor)
        .into_font()
        .color(&BLACK.mix(0.85))
        .pos(Pos::new(HPos::Left, VPos::Top));
    root.draw(&Text::new(
        caption.to_string(),
        to_px((0.0, scene.height() + margin.bottom + 6.0)),
        caption_style,
    ))?;

    root.present()?;
    Ok(())
}
