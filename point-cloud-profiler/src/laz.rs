use indicatif::{ProgressBar, ProgressStyle};
use las::Reader;
use point_cloud_profiler::{AttributeColumn, AttributeTable, Point3};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Points and attribute columns read from one LAS/LAZ file.
pub struct LoadedCloud {
    pub points: Vec<Point3>,
    pub attributes: AttributeTable,
    pub has_colour: bool,
}

/// Create LAS file reader for point cloud access.
/// Handles both .las and .laz compressed formats.
pub fn create_reader(file_path: &Path) -> Result<Reader, Box<dyn std::error::Error>> {
    let file = File::open(file_path)?;
    let buf_reader = BufReader::new(file);
    Ok(Reader::new(buf_reader)?)
}

/// Read every point into a dense array and resolve the per-point attributes into typed columns.
pub fn load_point_cloud(file_path: &Path) -> Result<LoadedCloud, Box<dyn std::error::Error>> {
    let mut reader = create_reader(file_path)?;
    let total_points = reader.header().number_of_points() as usize;

    log::info!("Loading {} ({} points)", file_path.display(), total_points);

    let pb = ProgressBar::new(total_points as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} points ({percent}%) {msg}")?
            .progress_chars("▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Loading points");

    let mut points = Vec::with_capacity(total_points);
    let mut classification = Vec::with_capacity(total_points);
    let mut intensity = Vec::with_capacity(total_points);
    let mut return_number = Vec::with_capacity(total_points);
    let mut colour = Vec::with_capacity(total_points);
    let mut gps_time = Vec::with_capacity(total_points);
    let mut colour_points = 0usize;
    let mut timed_points = 0usize;

    for (idx, point_result) in reader.points().enumerate() {
        let point = point_result?;

        points.push([point.x, point.y, point.z]);
        classification.push(u8::from(point.classification));
        intensity.push(point.intensity);
        return_number.push(point.return_number);

        match point.color {
            Some(c) => {
                colour_points += 1;
                colour.push([
                    c.red as f32 / 65535.0,
                    c.green as f32 / 65535.0,
                    c.blue as f32 / 65535.0,
                ]);
            }
            None => colour.push([1.0, 1.0, 1.0]),
        }

        match point.gps_time {
            Some(t) => {
                timed_points += 1;
                gps_time.push(t);
            }
            None => gps_time.push(f64::NAN),
        }

        if idx % 50_000 == 0 {
            pb.set_position(idx as u64);
        }
    }
    pb.finish_with_message("Points loaded");

    let mut attributes = AttributeTable::new(points.len());
    attributes.insert("classification", AttributeColumn::Code(classification))?;
    attributes.insert("intensity", AttributeColumn::Count(intensity))?;
    attributes.insert("return_number", AttributeColumn::Code(return_number))?;

    let has_colour = colour_points > 0;
    if has_colour {
        log::info!(
            "Colour data detected: {}/{} points have RGB",
            colour_points,
            points.len()
        );
        attributes.insert("colour", AttributeColumn::Rgb(colour))?;
    }
    if timed_points > 0 {
        attributes.insert("gps_time", AttributeColumn::Scalar(gps_time))?;
    }

    Ok(LoadedCloud {
        points,
        attributes,
        has_colour,
    })
}
