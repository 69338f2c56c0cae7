//! Height profile and cross-section defaults

/// Stations sampled along a profile line
pub const DEFAULT_NUM_SAMPLES: usize = 100;

/// Horizontal search radius around each station (metres)
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Minimum number of stations used to test cross-section membership
pub const MIN_CROSS_SECTION_STATIONS: usize = 100;

/// Cross-section stations per metre of line length
pub const CROSS_SECTION_STATIONS_PER_METRE: f64 = 10.0;

/// Column header of the exported profile table
pub const PROFILE_CSV_HEADER: [&str; 6] = [
    "Distance_m",
    "Min_Height_m",
    "Max_Height_m",
    "Mean_Height_m",
    "Std_Height_m",
    "Point_Count",
];
