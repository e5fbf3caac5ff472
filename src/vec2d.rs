use crate::bounds::Bounds2i;
use crate::vecmath::Point2i;

/// Stores 2 dimensional data over a pixel rectangle in a flat
/// contiguous Vec.
#[derive(Debug, Clone)]
pub struct Vec2d<T>
where
    T: Default + Copy,
{
    data: Vec<T>,
    extent: Bounds2i,
}

impl<T> Vec2d<T>
where
    T: Default + Copy,
{
    pub fn from_bounds(bounds: Bounds2i) -> Self {
        let n = bounds.area().max(0) as usize;
        Vec2d {
            data: vec![T::default(); n],
            extent: bounds,
        }
    }

    pub fn get(&self, p: Point2i) -> T {
        self.data[self.offset(p)]
    }

    pub fn get_mut(&mut self, p: Point2i) -> &mut T {
        let i = self.offset(p);
        &mut self.data[i]
    }

    pub fn set(&mut self, p: Point2i, val: T) {
        let i = self.offset(p);
        self.data[i] = val;
    }

    pub fn extent(&self) -> Bounds2i {
        self.extent
    }

    pub fn width(&self) -> i32 {
        self.extent.width()
    }

    pub fn height(&self) -> i32 {
        self.extent.height()
    }

    fn offset(&self, p: Point2i) -> usize {
        debug_assert!(self.extent.contains(p));
        let x = p.x - self.extent.low.x;
        let y = p.y - self.extent.low.y;
        (y * self.width() + x) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_addressing_respects_extent_origin() {
        let b = Bounds2i::new(Point2i::new(10, 20), Point2i::new(14, 24));
        let mut v: Vec2d<i32> = Vec2d::from_bounds(b);
        v.set(Point2i::new(10, 20), 7);
        v.set(Point2i::new(13, 23), 9);
        assert_eq!(v.get(Point2i::new(10, 20)), 7);
        assert_eq!(v.get(Point2i::new(13, 23)), 9);
        assert_eq!(v.get(Point2i::new(11, 21)), 0);
    }
}
