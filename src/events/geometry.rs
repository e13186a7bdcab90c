use serde::{Deserialize, Serialize};
use std::fmt;

/// Точка в координатах рабочего стола
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Прямоугольник. Всегда нормализован: `origin` левее и выше `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RectCorners")]
pub struct Rect {
    origin: Point,
    end: Point,
}

impl Rect {
    /// Углы в любом порядке; перевёрнутые углы нормализуются, а не отвергаются
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            origin: Point::new(a.x.min(b.x), a.y.min(b.y)),
            end: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_origin_size(origin: Point, width: u32, height: u32) -> Self {
        let end = Point::new(
            origin.x.saturating_add_unsigned(width),
            origin.y.saturating_add_unsigned(height),
        );
        Self::new(origin, end)
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn left(&self) -> i32 {
        self.origin.x
    }

    pub fn right(&self) -> i32 {
        self.end.x
    }

    pub fn top(&self) -> i32 {
        self.origin.y
    }

    pub fn bottom(&self) -> i32 {
        self.end.y
    }

    pub fn width(&self) -> u32 {
        self.end.x.abs_diff(self.origin.x)
    }

    pub fn height(&self) -> u32 {
        self.end.y.abs_diff(self.origin.y)
    }

    /// Включая границы
    pub fn contains(&self, point: Point) -> bool {
        self.origin.x <= point.x
            && point.x <= self.end.x
            && self.origin.y <= point.y
            && point.y <= self.end.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains(other.origin) && self.contains(other.end)
    }

    /// Пересечение с учётом касания границ
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.bottom() < other.top()
            || self.top() > other.bottom()
            || self.right() < other.left()
            || self.left() > other.right())
    }

    /// Площадь пересечения; 0 для непересекающихся или лишь касающихся прямоугольников
    pub fn overlap_area(&self, other: &Rect) -> u64 {
        let left = i64::from(self.left().max(other.left()));
        let right = i64::from(self.right().min(other.right()));
        let top = i64::from(self.top().max(other.top()));
        let bottom = i64::from(self.bottom().min(other.bottom()));

        if right <= left || bottom <= top {
            return 0;
        }
        ((right - left) * (bottom - top)) as u64
    }

    pub fn center(&self) -> Point {
        let cx = (i64::from(self.origin.x) + i64::from(self.end.x)) / 2;
        let cy = (i64::from(self.origin.y) + i64::from(self.end.y)) / 2;
        Point::new(cx as i32, cy as i32)
    }
}

#[derive(Deserialize)]
struct RectCorners {
    origin: Point,
    end: Point,
}

impl From<RectCorners> for Rect {
    fn from(corners: RectCorners) -> Self {
        Rect::new(corners.origin, corners.end)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} {}x{}", self.origin, self.end, self.width(), self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_reversed_corners() {
        let rect = Rect::new(Point::new(100, 80), Point::new(10, 20));
        assert_eq!(rect.origin(), Point::new(10, 20));
        assert_eq!(rect.end(), Point::new(100, 80));
        assert_eq!(rect, Rect::new(Point::new(10, 20), Point::new(100, 80)));
        assert_eq!(rect.width(), 90);
        assert_eq!(rect.height(), 60);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let rect = Rect::new(Point::new(0, 0), Point::new(10, 10));
        assert!(rect.contains(Point::new(0, 0)));
        assert!(rect.contains(Point::new(10, 10)));
        assert!(rect.contains(Point::new(5, 10)));
        assert!(!rect.contains(Point::new(11, 5)));
        assert!(!rect.contains(Point::new(-1, 5)));
    }

    #[test]
    fn test_overlap_area() {
        let a = Rect::new(Point::new(0, 0), Point::new(10, 10));
        let b = Rect::new(Point::new(5, 5), Point::new(20, 20));
        let c = Rect::new(Point::new(10, 0), Point::new(20, 10));
        let d = Rect::new(Point::new(30, 30), Point::new(40, 40));

        assert_eq!(a.overlap_area(&b), 25);
        assert_eq!(b.overlap_area(&a), 25);
        assert_eq!(a.overlap_area(&c), 0);
        assert!(a.intersects(&c));
        assert_eq!(a.overlap_area(&d), 0);
        assert!(!a.intersects(&d));
        assert_eq!(a.overlap_area(&a), 100);
    }

    #[test]
    fn test_center_and_size() {
        let rect = Rect::from_origin_size(Point::new(-100, 50), 200, 100);
        assert_eq!(rect.end(), Point::new(100, 150));
        assert_eq!(rect.center(), Point::new(0, 100));
        assert!(rect.contains_rect(&Rect::new(Point::new(0, 60), Point::new(10, 70))));
    }

    #[test]
    fn test_deserialized_rect_is_normalized() {
        use figment::{providers::{Format, Toml}, Figment};

        let rect: Rect = Figment::new()
            .merge(Toml::string(
                "origin = { x = 100, y = 80 }\nend = { x = 10, y = 20 }",
            ))
            .extract()
            .unwrap();
        assert_eq!(rect, Rect::new(Point::new(10, 20), Point::new(100, 80)));
        assert!(rect.contains(Point::new(50, 50)));
        assert_eq!(rect.width(), 90);
    }
}
