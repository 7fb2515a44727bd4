//! Small fixed-size numeric composite types that can travel through the
//! clipboard, and the `VectorValue` six-float slot they all project into.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

/// Axis-aligned rectangle: origin + size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned box: center + extents (half-size).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub center: Vector3,
    pub extents: Vector3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vector2Int {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vector3Int {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectInt {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsInt {
    pub position: Vector3Int,
    pub size: Vector3Int,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Lossless union slot for every small fixed-size numeric composite.
///
/// One clipboard slot stores up to six components; the consumer knows which
/// projection to apply from the destination property's declared kind.
/// Mappings:
///   Vector2      -> (x, y, 0, 0, 0, 0)
///   Vector3      -> (x, y, z, 0, 0, 0)
///   Vector4/Quat -> (x, y, z, w, 0, 0)
///   Rect         -> (x, y, width, height, 0, 0)
///   Bounds       -> (center.xyz, extents.xyz)
///   *Int         -> same layout, components stored as f32
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorValue {
    pub c1: f32,
    pub c2: f32,
    pub c3: f32,
    pub c4: f32,
    pub c5: f32,
    pub c6: f32,
}

impl VectorValue {
    pub const fn new(c1: f32, c2: f32, c3: f32, c4: f32, c5: f32, c6: f32) -> Self {
        Self {
            c1,
            c2,
            c3,
            c4,
            c5,
            c6,
        }
    }
}

// -------------------- Projections into the slot --------------------

impl From<Vector2> for VectorValue {
    #[inline]
    fn from(v: Vector2) -> Self {
        Self::new(v.x, v.y, 0.0, 0.0, 0.0, 0.0)
    }
}
impl From<Vector3> for VectorValue {
    #[inline]
    fn from(v: Vector3) -> Self {
        Self::new(v.x, v.y, v.z, 0.0, 0.0, 0.0)
    }
}
impl From<Vector4> for VectorValue {
    #[inline]
    fn from(v: Vector4) -> Self {
        Self::new(v.x, v.y, v.z, v.w, 0.0, 0.0)
    }
}
impl From<Quaternion> for VectorValue {
    #[inline]
    fn from(q: Quaternion) -> Self {
        Self::new(q.x, q.y, q.z, q.w, 0.0, 0.0)
    }
}
impl From<Rect> for VectorValue {
    #[inline]
    fn from(r: Rect) -> Self {
        Self::new(r.x, r.y, r.width, r.height, 0.0, 0.0)
    }
}
impl From<Bounds> for VectorValue {
    #[inline]
    fn from(b: Bounds) -> Self {
        Self::new(
            b.center.x, b.center.y, b.center.z, b.extents.x, b.extents.y, b.extents.z,
        )
    }
}
impl From<Vector2Int> for VectorValue {
    #[inline]
    fn from(v: Vector2Int) -> Self {
        Self::new(v.x as f32, v.y as f32, 0.0, 0.0, 0.0, 0.0)
    }
}
impl From<Vector3Int> for VectorValue {
    #[inline]
    fn from(v: Vector3Int) -> Self {
        Self::new(v.x as f32, v.y as f32, v.z as f32, 0.0, 0.0, 0.0)
    }
}
impl From<RectInt> for VectorValue {
    #[inline]
    fn from(r: RectInt) -> Self {
        Self::new(
            r.x as f32,
            r.y as f32,
            r.width as f32,
            r.height as f32,
            0.0,
            0.0,
        )
    }
}
impl From<BoundsInt> for VectorValue {
    #[inline]
    fn from(b: BoundsInt) -> Self {
        Self::new(
            b.position.x as f32,
            b.position.y as f32,
            b.position.z as f32,
            b.size.x as f32,
            b.size.y as f32,
            b.size.z as f32,
        )
    }
}

// -------------------- Projections out of the slot --------------------

impl VectorValue {
    #[inline]
    pub fn to_vector2(self) -> Vector2 {
        Vector2 {
            x: self.c1,
            y: self.c2,
        }
    }

    #[inline]
    pub fn to_vector3(self) -> Vector3 {
        Vector3 {
            x: self.c1,
            y: self.c2,
            z: self.c3,
        }
    }

    #[inline]
    pub fn to_vector4(self) -> Vector4 {
        Vector4 {
            x: self.c1,
            y: self.c2,
            z: self.c3,
            w: self.c4,
        }
    }

    #[inline]
    pub fn to_quaternion(self) -> Quaternion {
        Quaternion {
            x: self.c1,
            y: self.c2,
            z: self.c3,
            w: self.c4,
        }
    }

    #[inline]
    pub fn to_rect(self) -> Rect {
        Rect {
            x: self.c1,
            y: self.c2,
            width: self.c3,
            height: self.c4,
        }
    }

    #[inline]
    pub fn to_bounds(self) -> Bounds {
        Bounds {
            center: Vector3 {
                x: self.c1,
                y: self.c2,
                z: self.c3,
            },
            extents: Vector3 {
                x: self.c4,
                y: self.c5,
                z: self.c6,
            },
        }
    }

    #[inline]
    pub fn to_vector2_int(self) -> Vector2Int {
        Vector2Int {
            x: self.c1 as i32,
            y: self.c2 as i32,
        }
    }

    #[inline]
    pub fn to_vector3_int(self) -> Vector3Int {
        Vector3Int {
            x: self.c1 as i32,
            y: self.c2 as i32,
            z: self.c3 as i32,
        }
    }

    #[inline]
    pub fn to_rect_int(self) -> RectInt {
        RectInt {
            x: self.c1 as i32,
            y: self.c2 as i32,
            width: self.c3 as i32,
            height: self.c4 as i32,
        }
    }

    #[inline]
    pub fn to_bounds_int(self) -> BoundsInt {
        BoundsInt {
            position: Vector3Int {
                x: self.c1 as i32,
                y: self.c2 as i32,
                z: self.c3 as i32,
            },
            size: Vector3Int {
                x: self.c4 as i32,
                y: self.c5 as i32,
                z: self.c6 as i32,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_projection_roundtrips() {
        let b = Bounds {
            center: Vector3 {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            },
            extents: Vector3 {
                x: 0.5,
                y: 0.25,
                z: 8.0,
            },
        };
        assert_eq!(VectorValue::from(b).to_bounds(), b);
    }

    #[test]
    fn rect_int_projection_roundtrips() {
        let r = RectInt {
            x: -3,
            y: 7,
            width: 640,
            height: 480,
        };
        assert_eq!(VectorValue::from(r).to_rect_int(), r);
    }

    #[test]
    fn quaternion_and_vector4_share_the_slot() {
        let q = Quaternion {
            x: 0.1,
            y: 0.2,
            z: 0.3,
            w: 0.9,
        };
        let slot = VectorValue::from(q);
        assert_eq!(slot.to_vector4(), Vector4 {
            x: 0.1,
            y: 0.2,
            z: 0.3,
            w: 0.9,
        });
        assert_eq!(slot.to_quaternion(), q);
    }
}
