use glam::{Affine2, Vec2};

/// A rectangle.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Rect {
    /// The position of the top-left corner
    /// of this rectangle.
    pub pos: Vec2,
    /// The side lengths of this rectangle.
    pub size: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self { pos, size }
    }

    pub fn offset(self, offset: Vec2) -> Self {
        Self {
            pos: self.pos + offset,
            size: self.size,
        }
    }

    pub fn max(self) -> Vec2 {
        self.pos + self.size
    }

    pub fn is_empty(self) -> bool {
        self.size.x <= 0. || self.size.y <= 0.
    }

    pub fn contains(self, pos: Vec2) -> bool {
        pos.x >= self.pos.x
            && pos.y >= self.pos.y
            && pos.x < (self.pos.x + self.size.x)
            && pos.y < (self.pos.y + self.size.y)
    }

    /// Computes the overlap of two rectangles. The result
    /// is empty if they do not intersect.
    pub fn intersection(self, other: Rect) -> Rect {
        let pos = self.pos.max(other.pos);
        let max = self.max().min(other.max());
        Rect {
            pos,
            size: (max - pos).max(Vec2::ZERO),
        }
    }

    /// The smallest rectangle containing both inputs.
    pub fn union(self, other: Rect) -> Rect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let pos = self.pos.min(other.pos);
        let max = self.max().max(other.max());
        Rect {
            pos,
            size: max - pos,
        }
    }

    pub fn transformed(self, transform: Affine2) -> Self {
        Self {
            pos: transform.transform_point2(self.pos),
            size: transform.transform_vector2(self.size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;

    #[test]
    fn intersection_disjoint_is_empty() {
        let a = Rect::new(vec2(0., 0.), vec2(10., 10.));
        let b = Rect::new(vec2(20., 0.), vec2(5., 5.));
        assert!(a.intersection(b).is_empty());
    }

    #[test]
    fn intersection_overlapping() {
        let a = Rect::new(vec2(0., 0.), vec2(10., 10.));
        let b = Rect::new(vec2(5., 5.), vec2(10., 10.));
        let i = a.intersection(b);
        assert_eq!(i.pos, vec2(5., 5.));
        assert_eq!(i.size, vec2(5., 5.));
    }
}
