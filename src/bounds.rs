use glam::Vec2;

/// Axis-aligned rectangle in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Rectangle spanning `[0, size]` on both axes.
    pub fn from_size(size: Vec2) -> Self {
        Self { min: Vec2::ZERO, max: size }
    }

    /// Tight box around a set of points. Returns `None` for an empty set.
    pub fn enclosing<I: IntoIterator<Item = Vec2>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Straddling containment: true when the circle's bounding box touches
    /// this rectangle. A circle lying across an edge is contained by both
    /// sides of it.
    pub fn contains_circle(&self, center: Vec2, radius: f32) -> bool {
        center.x + radius >= self.min.x
            && center.x - radius <= self.max.x
            && center.y + radius >= self.min.y
            && center.y - radius <= self.max.y
    }

    /// Exact circle/rectangle overlap via the closest point on the rectangle.
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }

    /// The four equal quadrants, ordered NW, NE, SW, SE (y grows upward).
    pub fn quadrants(&self) -> [Rect; 4] {
        let c = self.center();
        [
            Rect::new(Vec2::new(self.min.x, c.y), Vec2::new(c.x, self.max.y)),
            Rect::new(c, self.max),
            Rect::new(self.min, c),
            Rect::new(Vec2::new(c.x, self.min.y), Vec2::new(self.max.x, c.y)),
        ]
    }
}
