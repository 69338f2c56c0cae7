/// Tabular export of profile and cross-section results
use crate::cross_section::CrossSectionResult;
use crate::error::Result;
use crate::profile::ProfileResult;
use constants::profile::PROFILE_CSV_HEADER;
use std::io::Write;

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write one row per station: distance, min, max, mean, std, count. No-data heights are empty fields.
pub fn write_profile_csv<W: Write>(profile: &ProfileResult, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(PROFILE_CSV_HEADER)?;

    for sample in &profile.samples {
        csv.write_record([
            sample.distance.to_string(),
            optional(sample.min_height),
            optional(sample.max_height),
            optional(sample.mean_height),
            optional(sample.std_height),
            sample.point_count.to_string(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

pub fn profile_csv_string(profile: &ProfileResult) -> Result<String> {
    let mut buffer = Vec::new();
    write_profile_csv(profile, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write the profile, samples and summary as pretty JSON.
pub fn write_profile_json<W: Write>(profile: &ProfileResult, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, profile)?;
    Ok(())
}

/// Write selected points with their line metrics and any scalar attributes widened to f64.
pub fn write_cross_section_csv<W: Write>(section: &CrossSectionResult, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let attribute_names: Vec<&str> = section
        .attributes
        .as_ref()
        .map(|table| table.names().collect())
        .unwrap_or_default();

    let mut header = vec!["Index", "X", "Y", "Z", "Along_m", "Offset_m"];
    header.extend(attribute_names.iter().copied());
    csv.write_record(&header)?;

    for (row, &index) in section.indices.iter().enumerate() {
        let p = section.points[row];
        let mut record = vec![
            index.to_string(),
            p[0].to_string(),
            p[1].to_string(),
            p[2].to_string(),
            section.along_distances[row].to_string(),
            section.perpendicular_distances[row].to_string(),
        ];
        if let Some(table) = &section.attributes {
            for name in &attribute_names {
                let value = table.get(name).and_then(|column| column.value_f64(row));
                record.push(optional(value));
            }
        }
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_section::CrossSectionExtractor;
    use crate::point_set::{AttributeColumn, AttributeTable};
    use crate::profile::{ProfileParams, calculate_profile};

    #[test]
    fn test_profile_csv_layout() {
        let points = [[0.0, 0.0, 1.0], [2.0, 0.0, 3.0]];
        let profile = calculate_profile(
            &points,
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            &ProfileParams::new(3, 0.5),
        )
        .unwrap();

        let text = profile_csv_string(&profile).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Distance_m,Min_Height_m,Max_Height_m,Mean_Height_m,Std_Height_m,Point_Count"
        );
        assert_eq!(lines[1], "0,1,1,1,0,1");
        assert_eq!(lines[2], "2,3,3,3,0,1");
        // trailing station has no data and nothing to interpolate towards
        assert_eq!(lines[3], "4,,,,,0");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_profile_json_has_summary() {
        let points = [[0.0, 0.0, 1.0], [1.0, 0.0, 2.0]];
        let profile = calculate_profile(
            &points,
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            &ProfileParams::new(2, 0.5),
        )
        .unwrap();

        let mut buffer = Vec::new();
        write_profile_json(&profile, &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["summary"]["valid_samples"], 2);
        assert_eq!(value["samples"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_cross_section_csv_includes_attributes() {
        let points = [[0.0, 0.0, 1.0], [1.0, 0.1, 2.0], [1.0, 5.0, 3.0]];
        let mut table = AttributeTable::new(3);
        table
            .insert("classification", AttributeColumn::Code(vec![2, 5, 6]))
            .unwrap();

        let section = CrossSectionExtractor::default()
            .extract(&points, Some(&table), [0.0; 3], [2.0, 0.0, 0.0], 0.5)
            .unwrap();

        let mut buffer = Vec::new();
        write_cross_section_csv(&section, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Index,X,Y,Z,Along_m,Offset_m,classification");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("1,1,0.1,2,1,"));
        assert!(lines[2].ends_with(",5"));
    }
}
