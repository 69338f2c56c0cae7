/// Command line front end: dataset summary, height profiles and cross-sections from LAS/LAZ files
mod laz;

use clap::{Parser, Subcommand, ValueEnum};
use constants::get_class_name;
use env_logger::Env;
use point_cloud_profiler::export::{write_cross_section_csv, write_profile_csv, write_profile_json};
use point_cloud_profiler::{
    AnalysisConfig, AttributeColumn, CameraState, CrossSectionExtractor, LodEngine, LodLevel,
    Point3, PointCloudBounds, ProfileEngine, RenderPreparer, RenderStats, SearchStrategy,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "point-cloud-profiler")]
#[command(about = "Height profiles, cross-sections and LOD statistics for LAS/LAZ point clouds")]
struct Args {
    /// JSON analysis settings; defaults are used for anything missing
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print bounds, attributes and the LOD decision for a camera distance
    Info {
        input: PathBuf,

        /// Camera distance from the scene centre; defaults to twice the scene size
        #[arg(long)]
        camera_distance: Option<f64>,

        /// Force a LOD level (close, near, medium, far)
        #[arg(long)]
        level: Option<LodLevel>,
    },
    /// Sample a height profile along a line
    Profile {
        input: PathBuf,

        /// Line start as x,y,z
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        start: Point3,

        /// Line end as x,y,z
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        end: Point3,

        #[arg(short = 'n', long)]
        samples: Option<usize>,

        /// Horizontal search radius around each station (metres)
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Profile CSV, defaults to <input>_profile.csv
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the full profile with summary as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Extract the points lying within a tolerance of a line
    CrossSection {
        input: PathBuf,

        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        start: Point3,

        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        end: Point3,

        #[arg(short, long)]
        tolerance: Option<f64>,

        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Write the selected points with their attributes as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Station,
    Point,
}

impl From<StrategyArg> for SearchStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Station => SearchStrategy::StationIndex,
            StrategyArg::Point => SearchStrategy::PointIndex,
        }
    }
}

fn parse_point(s: &str) -> Result<Point3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z but got '{}'", s));
    }
    let mut point = [0.0; 3];
    for (slot, part) in point.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{}': {}", part, e))?;
    }
    Ok(point)
}

fn output_stem(input: &Path) -> String {
    let path = input.to_string_lossy();
    path.trim_end_matches(".laz")
        .trim_end_matches(".las")
        .to_string()
}

fn print_bounds(bounds: &PointCloudBounds) {
    let (dx, dy, dz) = bounds.dimensions();
    println!("Bounds:");
    println!(
        "  X: {:.3} to {:.3} ({:.3}m)",
        bounds.min_x, bounds.max_x, dx
    );
    println!(
        "  Y: {:.3} to {:.3} ({:.3}m)",
        bounds.min_y, bounds.max_y, dy
    );
    println!(
        "  Z: {:.3} to {:.3} ({:.3}m)",
        bounds.min_z, bounds.max_z, dz
    );
}

fn run_info(
    config: &AnalysisConfig,
    input: &Path,
    camera_distance: Option<f64>,
    level: Option<LodLevel>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cloud = laz::load_point_cloud(input)?;
    let bounds = PointCloudBounds::from_points(&cloud.points);

    println!("{}: {} points", input.display(), cloud.points.len());
    print_bounds(&bounds);

    println!("Attributes:");
    for (name, column) in cloud.attributes.iter() {
        println!("  {} ({} values)", name, column.len());
    }

    let mut preparer = RenderPreparer::new(config.performance_mode);
    preparer.lod_mut().configure(config.lod_config())?;

    let scene_size = LodEngine::scene_size(&cloud.points);
    let camera = CameraState::new(camera_distance.unwrap_or(scene_size * 2.0), scene_size);
    let scalars = if cloud.has_colour {
        cloud.attributes.get("colour")
    } else {
        cloud.attributes.get("classification")
    };

    let (batch, stats) =
        preparer.prepare(&cloud.points, scalars, camera, level, RenderStats::default());

    println!("LOD ({:?} mode):", preparer.mode());
    println!(
        "  Scene size {:.3}m, camera distance {:.3}m",
        camera.scene_size, camera.distance
    );
    println!(
        "  Level {} (stride {}): {} -> {} points ({:.1}% reduction)",
        batch.lod.level,
        batch.lod.stride,
        batch.lod.original_count,
        batch.lod.final_count,
        batch.lod.reduction_percent
    );
    println!(
        "  Colour mode {:?}, spheres: {}",
        batch.color_mode, batch.render_as_spheres
    );
    println!(
        "  Adaptive stride for this size: {}",
        preparer.lod().adaptive_stride(cloud.points.len())
    );
    println!(
        "  Preparation took {:.2}ms",
        stats.last_render_time * 1000.0
    );
    Ok(())
}

fn run_profile(
    config: &AnalysisConfig,
    input: &Path,
    start: Point3,
    end: Point3,
    output: Option<PathBuf>,
    json: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cloud = laz::load_point_cloud(input)?;
    let engine = ProfileEngine::new(&cloud.points)?;
    let profile = engine.calculate(start, end, &config.profile)?;

    let csv_path =
        output.unwrap_or_else(|| PathBuf::from(format!("{}_profile.csv", output_stem(input))));
    write_profile_csv(&profile, BufWriter::new(File::create(&csv_path)?))?;
    println!("Profile written to {}", csv_path.display());

    if let Some(json_path) = json {
        write_profile_json(&profile, BufWriter::new(File::create(&json_path)?))?;
        println!("Profile JSON written to {}", json_path.display());
    }

    let summary = &profile.summary;
    println!(
        "Length {:.2}m, {} samples, {} valid ({} measured, {:.1}% coverage)",
        profile.total_length,
        profile.len(),
        summary.valid_samples,
        summary.measured_samples,
        summary.coverage_percentage
    );
    if let (Some(min), Some(max)) = (summary.min_elevation, summary.max_elevation) {
        println!(
            "Elevation {:.3} to {:.3} (range {:.3}m, change {:.3}m)",
            min, max, summary.elevation_range, summary.total_elevation_change
        );
    } else {
        println!("No points found near the line");
    }
    Ok(())
}

fn run_cross_section(
    config: &AnalysisConfig,
    input: &Path,
    start: Point3,
    end: Point3,
    tolerance: Option<f64>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cloud = laz::load_point_cloud(input)?;
    let extractor = CrossSectionExtractor::new(config.cross_section)?;
    let tolerance = tolerance.unwrap_or(config.cross_section.tolerance);

    let section = extractor.extract(&cloud.points, Some(&cloud.attributes), start, end, tolerance)?;

    let source = input.file_stem().map(|s| s.to_string_lossy().into_owned());
    println!("{}", section.layer_name(source.as_deref()));
    println!(
        "{} points within {}m of a {:.2}m line",
        section.len(),
        tolerance,
        section.total_length
    );

    let classes = section
        .attributes
        .as_ref()
        .and_then(|table| table.get("classification"));
    if let Some(AttributeColumn::Code(codes)) = classes {
        let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
        for &code in codes {
            *counts.entry(code).or_default() += 1;
        }
        for (code, count) in counts {
            println!("  {:>3} {:<20} {}", code, get_class_name(code), count);
        }
    }

    if let Some(path) = output {
        write_cross_section_csv(&section, BufWriter::new(File::create(&path)?))?;
        println!("Cross-section written to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };

    match args.command {
        Command::Info {
            input,
            camera_distance,
            level,
        } => run_info(&config, &input, camera_distance, level),
        Command::Profile {
            input,
            start,
            end,
            samples,
            tolerance,
            output,
            json,
        } => {
            if let Some(n) = samples {
                config.profile.num_samples = n;
            }
            if let Some(t) = tolerance {
                config.profile.tolerance = t;
            }
            run_profile(&config, &input, start, end, output, json)
        }
        Command::CrossSection {
            input,
            start,
            end,
            tolerance,
            strategy,
            output,
        } => {
            if let Some(strategy) = strategy {
                config.cross_section.strategy = strategy.into();
            }
            run_cross_section(&config, &input, start, end, tolerance, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("1,2.5,-3").unwrap(), [1.0, 2.5, -3.0]);
        assert_eq!(parse_point(" 0 , 0 , 0 ").unwrap(), [0.0; 3]);
        assert!(parse_point("1,2").is_err());
        assert!(parse_point("a,b,c").is_err());
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem(Path::new("data/street.laz")), "data/street");
        assert_eq!(output_stem(Path::new("street.las")), "street");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "point-cloud-profiler",
            "profile",
            "in.laz",
            "--start",
            "0,0,0",
            "--end",
            "10,-5,0",
            "-n",
            "50",
        ])
        .unwrap();
        match args.command {
            Command::Profile { end, samples, .. } => {
                assert_eq!(end, [10.0, -5.0, 0.0]);
                assert_eq!(samples, Some(50));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
