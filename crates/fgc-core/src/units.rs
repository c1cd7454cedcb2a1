//! Viewport-unit ↔ pixel conversion.
//!
//! Stored geometry is resolution independent: a position is a multiple of
//! `viewport_width_unit` / `viewport_height_unit`. These helpers are the only
//! place the two coordinate spaces meet.

use crate::settings::{LayoutSetting, UserSettings};
use kurbo::{Point, Rect, Size, Vec2};

/// Viewport units → pixels.
pub fn to_pixels(p: Point, settings: &UserSettings) -> Point {
    Point::new(
        p.x * settings.viewport_width_unit,
        p.y * settings.viewport_height_unit,
    )
}

/// Pixels → viewport units.
pub fn to_viewport(p: Point, settings: &UserSettings) -> Point {
    Point::new(
        p.x / settings.viewport_width_unit,
        p.y / settings.viewport_height_unit,
    )
}

pub fn offset_to_pixels(v: Vec2, settings: &UserSettings) -> Vec2 {
    Vec2::new(
        v.x * settings.viewport_width_unit,
        v.y * settings.viewport_height_unit,
    )
}

pub fn offset_to_viewport(v: Vec2, settings: &UserSettings) -> Vec2 {
    Vec2::new(
        v.x / settings.viewport_width_unit,
        v.y / settings.viewport_height_unit,
    )
}

/// Convert a flat relative `x, y` list from pixels to viewport units.
pub fn points_to_viewport(points: &[f64], settings: &UserSettings) -> Vec<f64> {
    points
        .chunks_exact(2)
        .flat_map(|pair| {
            let v = offset_to_viewport(Vec2::new(pair[0], pair[1]), settings);
            [v.x, v.y]
        })
        .collect()
}

/// Pixel size of a numpad block holding `token_count` icons.
pub fn numpad_block_size(token_count: usize, settings: &UserSettings) -> Size {
    let width = (token_count as f64 + LayoutSetting::HORIZONTAL_MARGIN_SCALE * 2.0)
        * settings.command_size;
    let height = settings.command_size * LayoutSetting::BLOCK_HEIGHT_SCALE;
    Size::new(width * settings.length_unit, height * settings.length_unit)
}

/// Block-local pixel frame of the icon at `index`.
pub fn numpad_icon_frame(index: usize, settings: &UserSettings) -> Rect {
    let side = settings.command_size * settings.length_unit;
    let block_height = settings.command_size * LayoutSetting::BLOCK_HEIGHT_SCALE;
    let x = (index as f64 + LayoutSetting::HORIZONTAL_MARGIN_SCALE) * side;
    let y = (block_height - settings.command_size) * (settings.length_unit / 2.0);
    Rect::from_origin_size((x, y), (side, side))
}

/// Uniform scale that makes a move image `move_image_height` viewport units tall.
pub fn move_image_scale(natural_height: f64, settings: &UserSettings) -> f64 {
    if natural_height <= 0.0 {
        return 1.0;
    }
    settings.viewport_height_unit * settings.move_image_height / natural_height
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(vw: f64, vh: f64) -> UserSettings {
        UserSettings {
            viewport_width_unit: vw,
            viewport_height_unit: vh,
            ..UserSettings::default()
        }
    }

    #[test]
    fn viewport_pixel_roundtrip() {
        for (vw, vh) in [(1000.0, 1000.0), (1920.0, 1080.0), (0.37, 13.5), (3.3e4, 7.1e-3)] {
            let s = settings(vw, vh);
            for (x, y) in [(0.1, 0.2), (0.0, 0.0), (1.75, 0.333), (-0.4, 12.0)] {
                let back = to_viewport(to_pixels(Point::new(x, y), &s), &s);
                assert!((back.x - x).abs() < 1e-9, "x drifted for {vw}x{vh}");
                assert!((back.y - y).abs() < 1e-9, "y drifted for {vw}x{vh}");
            }
        }
    }

    #[test]
    fn to_pixels_scales_each_axis() {
        let s = settings(1000.0, 500.0);
        assert_eq!(to_pixels(Point::new(0.1, 0.2), &s), Point::new(100.0, 100.0));
    }

    #[test]
    fn block_size_includes_margins() {
        let s = UserSettings {
            command_size: 3.0,
            length_unit: 10.0,
            ..UserSettings::default()
        };
        let size = numpad_block_size(4, &s);
        assert!((size.width - (4.0 + 1.0 / 3.0) * 30.0).abs() < 1e-9);
        assert_eq!(size.height, 60.0);
    }

    #[test]
    fn icon_frames_are_vertically_centred() {
        let s = UserSettings {
            command_size: 3.0,
            length_unit: 10.0,
            ..UserSettings::default()
        };
        let frame = numpad_icon_frame(1, &s);
        assert!((frame.x0 - (1.0 + 1.0 / 6.0) * 30.0).abs() < 1e-9);
        assert_eq!(frame.y0, 15.0);
        assert_eq!(frame.height(), 30.0);
    }

    #[test]
    fn move_image_scale_targets_configured_height() {
        let s = UserSettings {
            viewport_height_unit: 1000.0,
            move_image_height: 0.2,
            ..UserSettings::default()
        };
        assert_eq!(move_image_scale(400.0, &s), 0.5);
        assert_eq!(move_image_scale(0.0, &s), 1.0);
    }

    #[test]
    fn point_lists_convert_pairwise() {
        let s = settings(1000.0, 500.0);
        assert_eq!(points_to_viewport(&[0.0, 0.0, 100.0, 50.0], &s), vec![0.0, 0.0, 0.1, 0.1]);
    }
}
