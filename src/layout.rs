//! Page layout calculations for the PDF overlay

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_inches(8.5),
            height: Length::from_inches(11.0),
        }
    }

    /// Page centre in points, origin at bottom-left
    pub fn center_pt(&self) -> (f64, f64) {
        (self.width.pt() / 2.0, self.height.pt() / 2.0)
    }

    /// Length of the page diagonal in points
    pub fn diagonal_pt(&self) -> f64 {
        self.width.pt().hypot(self.height.pt())
    }
}

/// Origins of evenly spaced text lines crossing a page at `angle_deg`.
///
/// Each line runs along the direction `angle_deg` (counter-clockwise from the
/// x axis). Lines are `stride` points apart, measured perpendicular to the
/// text, and together cover the whole page. Each origin is shifted back by
/// half of `line_width` so the line is centred on its axis.
pub fn tile_origins(
    page: &PageDimensions,
    angle_deg: f64,
    stride: f64,
    line_width: f64,
) -> Vec<(f64, f64)> {
    let (cx, cy) = page.center_pt();
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    // Perpendicular to the text direction
    let (nx, ny) = (-sin, cos);

    let reach = (page.diagonal_pt() / 2.0 / stride).ceil() as i64;
    (-reach..=reach)
        .map(|k| {
            let offset = k as f64 * stride;
            let x = cx + offset * nx - line_width / 2.0 * cos;
            let y = cy + offset * ny - line_width / 2.0 * sin;
            (x, y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversions() {
        assert!((Length::from_inches(1.0).pt() - 72.0).abs() < 0.01);
        assert!((Length(25.4).pt() - 72.0).abs() < 0.01);
    }

    #[test]
    fn test_letter_size() {
        let letter = PageDimensions::letter();
        assert!((letter.width.pt() - 612.0).abs() < 0.01);
        assert!((letter.height.pt() - 792.0).abs() < 0.01);
        assert!((letter.diagonal_pt() - 1000.9).abs() < 0.1);
    }

    #[test]
    fn test_tiles_cover_page_diagonal() {
        let page = PageDimensions::letter();
        let origins = tile_origins(&page, 45.0, 200.0, 0.0);

        // ceil(500.45 / 200) = 3 lines on each side of the centre
        assert_eq!(origins.len(), 7);
        let (cx, cy) = page.center_pt();
        let (mx, my) = origins[3];
        assert!((mx - cx).abs() < 1e-9 && (my - cy).abs() < 1e-9);
    }

    #[test]
    fn test_tiles_are_evenly_spaced_perpendicular_to_text() {
        let page = PageDimensions {
            width: Length::from_inches(8.0),
            height: Length::from_inches(12.0),
        };
        let angle: f64 = 30.0;
        let origins = tile_origins(&page, angle, 150.0, 120.0);
        let (sin, cos) = angle.to_radians().sin_cos();

        for pair in origins.windows(2) {
            let (dx, dy) = (pair[1].0 - pair[0].0, pair[1].1 - pair[0].1);
            // Step has no component along the text direction
            assert!((dx * cos + dy * sin).abs() < 1e-9);
            assert!((dx.hypot(dy) - 150.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_horizontal_tiles_are_centred() {
        let page = PageDimensions::letter();
        let origins = tile_origins(&page, 0.0, 200.0, 100.0);
        let (cx, _) = page.center_pt();
        for (x, _) in origins {
            assert!((x - (cx - 50.0)).abs() < 1e-9);
        }
    }
}
