use crate::geo::{Bounds, MAX_LAT, MAX_LNG, MIN_LAT, MIN_LNG};
use crate::location::Pin;

/// Marker for the first (primary) pin.
pub const PRIMARY: char = '@';

/// Smallest span shown, in degrees, so a lone pin still gets surroundings.
const MIN_SPAN: f64 = 0.01;

/// Render a framed ASCII preview of a tree's pins. The first pin is drawn as
/// [`PRIMARY`], the rest as `marker`. Returns an empty string when there is
/// nothing to draw.
#[must_use]
pub fn render_preview(pins: &[Pin], marker: char, width: usize, height: usize) -> String {
    if width == 0 || height == 0 {
        return String::new();
    }
    let Some(bounds) = Bounds::from_coordinates(pins.iter().map(|p| p.coordinate)) else {
        return String::new();
    };

    // Pad so edge pins are not drawn on the frame
    let lat_span = (bounds.max_lat - bounds.min_lat).max(MIN_SPAN);
    let lng_span = (bounds.max_lng - bounds.min_lng).max(MIN_SPAN);
    let lat_range = lat_span * 1.5;
    let lng_range = lng_span * 1.5;

    // Terminal chars are ~2x taller than wide
    let char_aspect = 2.0;
    let desired_lng = lat_range * (width as f64) / (height as f64) / char_aspect;
    let desired_lat = lng_range * (height as f64) / (width as f64) * char_aspect;
    let (final_lat_range, final_lng_range) = if desired_lng > lng_range {
        (lat_range, desired_lng)
    } else {
        (desired_lat, lng_range)
    };
    let final_lat_range = final_lat_range.min(MAX_LAT - MIN_LAT);
    let final_lng_range = final_lng_range.min(MAX_LNG - MIN_LNG);

    let (center_lat, center_lng) = bounds.center();
    let vp_min_lng = (center_lng - final_lng_range / 2.0).max(MIN_LNG);
    let vp_max_lat = (center_lat + final_lat_range / 2.0).min(MAX_LAT);

    let lng_per_col = final_lng_range / width as f64;
    let lat_per_row = final_lat_range / height as f64;

    let mut grid = vec![vec![' '; width]; height];

    // Later pins never overwrite the primary marker
    for (i, pin) in pins.iter().enumerate().rev() {
        let col = cell((pin.coordinate.lng() - vp_min_lng) / lng_per_col, width);
        let row = cell((vp_max_lat - pin.coordinate.lat()) / lat_per_row, height);
        grid[row][col] = if i == 0 { PRIMARY } else { marker };
    }

    let edge = format!("+{}+", "-".repeat(width));
    let mut lines = Vec::with_capacity(height + 2);
    lines.push(edge.clone());
    lines.extend(
        grid.iter()
            .map(|row| format!("|{}|", row.iter().collect::<String>())),
    );
    lines.push(edge);
    lines.join("\n")
}

/// Grid index for a fractional position, clamped into `0..len`.
fn cell(pos: f64, len: usize) -> usize {
    if pos.is_finite() && pos > 0.0 {
        (pos as usize).min(len - 1)
    } else {
        0
    }
}
