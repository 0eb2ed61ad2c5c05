//! Window geometry in desktop coordinates.
//!
//! Coordinates grow right and down. A [`Rect`] is always normalized so that
//! its width and height are non-negative.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Point { x, y } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size { width: 0.0, height: 0.0 };

    pub const fn new(width: f64, height: f64) -> Self { Size { width, height } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRect")]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Unvalidated wire form; goes through [`Rect::new`] so that documents with
/// negative extents still produce normalized rects.
#[derive(Deserialize)]
struct RawRect {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl From<RawRect> for Rect {
    fn from(raw: RawRect) -> Self { Rect::new(raw.left, raw.top, raw.width, raw.height) }
}

impl Rect {
    pub const ZERO: Rect = Rect { left: 0.0, top: 0.0, width: 0.0, height: 0.0 };

    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        let (left, width) = if width < 0.0 { (left + width, -width) } else { (left, width) };
        let (top, height) = if height < 0.0 { (top + height, -height) } else { (top, height) };
        Rect { left, top, width, height }
    }

    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Rect::new(left, top, right - left, bottom - top)
    }

    pub fn right(&self) -> f64 { self.left + self.width }

    pub fn bottom(&self) -> f64 { self.top + self.height }

    pub fn origin(&self) -> Point { Point::new(self.left, self.top) }

    pub fn size(&self) -> Size { Size::new(self.width, self.height) }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Rect { left: self.left + dx, top: self.top + dy, ..*self }
    }
}

/// Snaps to whole pixels, keeping edges that were adjacent adjacent.
pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    fn round(&self) -> Self {
        let left = self.left.round();
        let top = self.top.round();
        Rect::from_edges(left, top, self.right().round(), self.bottom().round())
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for Rect {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.origin().is_within(how_much, other.origin())
            && self.size().is_within(how_much, other.size())
    }
}

impl IsWithin for Point {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x) && self.y.is_within(how_much, other.y)
    }
}

impl IsWithin for Size {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.width.is_within(how_much, other.width) && self.height.is_within(how_much, other.height)
    }
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool { (self - other).abs() < how_much }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool { self.is_within(0.1, other) }
}

impl SameAs for Rect {}
impl SameAs for Point {}
impl SameAs for Size {}
impl SameAs for f64 {}
