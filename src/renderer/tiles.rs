//! Splits the image into square tasks for the worker pool.

use crate::bounds::Bounds2i;
use crate::vecmath::Point2i;

/// Partitions `resolution` into row-major `grid_size`-sided tiles.
/// Border tiles are clipped to the image, so the tiles cover every
/// pixel exactly once.
pub fn partition(resolution: Point2i, grid_size: i32) -> Vec<Bounds2i> {
    let x_tasks = (resolution.x + grid_size - 1) / grid_size;
    let y_tasks = (resolution.y + grid_size - 1) / grid_size;
    let mut tiles = Vec::with_capacity((x_tasks * y_tasks) as usize);
    for ty in 0..y_tasks {
        for tx in 0..x_tasks {
            let low = Point2i::new(tx * grid_size, ty * grid_size);
            let high = Point2i::new(
                (low.x + grid_size).min(resolution.x),
                (low.y + grid_size).min(resolution.y),
            );
            tiles.push(Bounds2i::new(low, high));
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hd_with_32_grid_yields_2040_tasks() {
        let tiles = partition(Point2i::new(1920, 1080), 32);
        assert_eq!(tiles.len(), 60 * 34);
    }

    #[test]
    fn tiles_cover_every_pixel_exactly_once() {
        let res = Point2i::new(70, 33);
        let tiles = partition(res, 32);
        let mut covered = vec![0u8; (res.x * res.y) as usize];
        for tile in &tiles {
            for p in tile.pixels() {
                covered[(p.y * res.x + p.x) as usize] += 1;
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn tiny_image_is_a_single_tile() {
        let tiles = partition(Point2i::new(8, 8), 32);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0], Bounds2i::new(Point2i::new(0, 0), Point2i::new(8, 8)));
    }
}
