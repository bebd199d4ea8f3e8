use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use cluster::{ClusterId, ClusterIndex, Rendered};
use engine::{
    ClusterEngine, Command as EngineCommand, EngineConfig, EngineEvent, HeadlessSurface,
    MapSurface,
};
use foundation::bounds::Bbox;
use foundation::geo::LngLat;
use listings::{
    CountyTable, CountyTableCell, DomainRecord, InMemoryViewStore, JsonFileViewStore, PointSet,
    Projector, ViewStore,
};
use runtime::Frame;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Stamp used for the one-off indexes the CLI builds.
const CLI_BUILD: u32 = 1;
const FRAME_DT_S: f64 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect clusters and visible sets for a listings file")]
struct Args {
    /// Engine config JSON (default: $MAPCLUST_CONFIG, else built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listings file: a JSON array of records
    #[arg(long)]
    records: PathBuf,

    /// Routing-key to county table JSON
    #[arg(long)]
    counties: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clusters and points rendered for a bbox at a zoom
    Clusters {
        /// Bounding box: west,south,east,north
        #[arg(long)]
        bbox: String,

        #[arg(long)]
        zoom: f64,
    },

    /// Ids visible on a headless map once the engine has settled
    Visible {
        /// Map center: lng,lat (default: persisted view, else config)
        #[arg(long)]
        center: Option<String>,

        #[arg(long)]
        zoom: Option<f64>,

        #[arg(long, default_value_t = 1280.0)]
        width: f64,

        #[arg(long, default_value_t = 800.0)]
        height: f64,

        /// Directory holding view.json / layers.json
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },

    /// Expansion zoom and leaves of one cluster (`raw@build` from `clusters`)
    Expand {
        #[arg(long)]
        cluster: ClusterId,

        /// Max number of leaf ids to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum UnitReport {
    Point {
        id: String,
        lng: f64,
        lat: f64,
    },
    #[serde(rename_all = "camelCase")]
    Cluster {
        id: String,
        lng: f64,
        lat: f64,
        count: u32,
        expansion_zoom: Option<i32>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VisibleReport {
    ready: bool,
    zoom: f64,
    bbox: Option<[f64; 4]>,
    rendered_units: usize,
    visible: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpandReport {
    cluster: String,
    expansion_zoom: i32,
    children: usize,
    leaves: Vec<String>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let projector = load_projector(args.counties.as_deref());
    let records = load_records(&args.records)?;
    info!(records = records.len(), "listings loaded");

    match args.command {
        Command::Clusters { bbox, zoom } => {
            let bbox = parse_bbox(&bbox)?;
            let (points, index) = build_index(&config, &projector, &records)?;
            print_json(&cluster_report(&points, &index, bbox, zoom))?;
        }
        Command::Visible {
            center,
            zoom,
            width,
            height,
            state_dir,
        } => {
            let center = center.as_deref().map(parse_lng_lat).transpose()?;
            let view = ViewArgs {
                center,
                zoom,
                width,
                height,
            };
            let report = match state_dir {
                Some(dir) => {
                    fs::create_dir_all(&dir)?;
                    let store = JsonFileViewStore::open(dir)?;
                    run_visible(config, projector, store, records, &view)?
                }
                None => run_visible(config, projector, InMemoryViewStore::new(), records, &view)?,
            };
            print_json(&report)?;
        }
        Command::Expand { cluster, limit } => {
            let (points, index) = build_index(&config, &projector, &records)?;
            print_json(&expand_report(&points, &index, cluster, limit)?)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env::var("MAPCLUST_CONFIG").ok().map(PathBuf::from));
    match path {
        Some(p) => {
            debug!(path = %p.display(), "loading engine config");
            Ok(EngineConfig::from_path(&p)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_projector(counties: Option<&Path>) -> Projector {
    let Some(path) = counties else {
        return Projector::default();
    };
    let cell = CountyTableCell::new();
    let table = cell.get_or_load(|| CountyTable::from_path(path));
    debug!(entries = table.len(), "county table loaded");
    Projector::new(table)
}

fn load_records(path: &Path) -> CliResult<Vec<DomainRecord>> {
    let raw = fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
    let records = serde_json::from_str(&raw).map_err(|e| format!("parse {}: {e}", path.display()))?;
    Ok(records)
}

fn build_index(
    config: &EngineConfig,
    projector: &Projector,
    records: &[DomainRecord],
) -> CliResult<(PointSet, ClusterIndex)> {
    let points = PointSet::new(projector.project(records));
    let index = ClusterIndex::build(config.cluster.clone(), CLI_BUILD, &points.positions())?;
    Ok((points, index))
}

fn cluster_report(points: &PointSet, index: &ClusterIndex, bbox: Bbox, zoom: f64) -> Vec<UnitReport> {
    index
        .clusters(bbox, zoom.round() as i32)
        .into_iter()
        .filter_map(|unit| match unit {
            Rendered::Point { index: i, at } => Some(UnitReport::Point {
                id: points.points().get(i)?.id.clone(),
                lng: at.lng,
                lat: at.lat,
            }),
            Rendered::Cluster(c) => Some(UnitReport::Cluster {
                id: c.id.to_string(),
                lng: c.at.lng,
                lat: c.at.lat,
                count: c.count,
                expansion_zoom: index.expansion_zoom(c.id).ok(),
            }),
        })
        .collect()
}

fn expand_report(
    points: &PointSet,
    index: &ClusterIndex,
    cluster: ClusterId,
    limit: usize,
) -> CliResult<ExpandReport> {
    let leaves = index
        .leaves(cluster, limit, 0)?
        .into_iter()
        .filter_map(|i| points.points().get(i).map(|p| p.id.clone()))
        .collect();
    Ok(ExpandReport {
        cluster: cluster.to_string(),
        expansion_zoom: index.expansion_zoom(cluster)?,
        children: index.children(cluster)?.len(),
        leaves,
    })
}

struct ViewArgs {
    center: Option<LngLat>,
    zoom: Option<f64>,
    width: f64,
    height: f64,
}

/// Boot an engine on a headless surface and run frames until the boot
/// emissions are done.
fn run_visible<V: ViewStore>(
    config: EngineConfig,
    projector: Projector,
    store: V,
    records: Vec<DomainRecord>,
    view: &ViewArgs,
) -> CliResult<VisibleReport> {
    let settle_ms = config.emit_retry_delays_ms.iter().copied().max().unwrap_or(0) + 50;
    let center = view.center.unwrap_or_else(|| config.default_center());
    let zoom = view.zoom.unwrap_or_else(|| config.initial_zoom(false));
    let surface = HeadlessSurface::new(center, zoom, view.width, view.height)
        .with_zoom_range(config.min_zoom(), config.max_zoom())
        .with_tile_size(config.tile_size_px);

    let (engine, commands, events) = ClusterEngine::connect(config, surface, store)?;
    let mut engine = engine.with_projector(projector);
    if view.center.is_some() || view.zoom.is_some() {
        engine.surface_mut().set_view(center, zoom);
    }

    commands.send(EngineCommand::SetRecords(records));
    commands.send(EngineCommand::BaseLayerLoaded);
    commands.send(EngineCommand::MoveEnd);

    let mut frame = Frame::new(0, FRAME_DT_S);
    let until = frame.time.after_millis(settle_ms);
    let mut ready = false;
    let mut visible = Vec::new();
    while frame.time <= until {
        engine.tick(frame);
        for event in events.drain() {
            match event {
                EngineEvent::Ready => ready = true,
                EngineEvent::VisibleChanged(ids) => visible = ids,
                EngineEvent::ClusterPicked { .. } | EngineEvent::Selected(_) => {}
            }
        }
        frame = frame.next();
    }
    commands.send(EngineCommand::Shutdown);
    engine.tick(frame);

    visible.sort();
    Ok(VisibleReport {
        ready,
        zoom: engine.surface().zoom(),
        bbox: engine.viewport().map(|vp| vp.bbox.to_array()),
        rendered_units: engine.rendered().len(),
        visible,
    })
}

fn parse_numbers<const N: usize>(s: &str, what: &str) -> CliResult<[f64; N]> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("{what} {s:?}: {e}"))?;
    let parts: [f64; N] = parts
        .try_into()
        .map_err(|_| format!("{what} {s:?}: expected {N} comma-separated numbers"))?;
    Ok(parts)
}

fn parse_bbox(s: &str) -> CliResult<Bbox> {
    let bbox = Bbox::from_array(parse_numbers::<4>(s, "bbox")?);
    if !bbox.is_finite() || bbox.south > bbox.north {
        return Err(format!("bbox {s:?} is not a valid box").into());
    }
    Ok(bbox)
}

fn parse_lng_lat(s: &str) -> CliResult<LngLat> {
    let at = LngLat::from_array(parse_numbers::<2>(s, "center")?);
    if !at.is_valid() {
        return Err(format!("center {s:?} is out of range").into());
    }
    Ok(at)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
