use enum_map::Enum;
use std::ops;

use crate::util::*;

/// A geometric axis of the puzzle frame.
#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basis {
    X,
    Y,
    Z,
}

/// Cyclic difference between two bases.
#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq)]
pub enum BasisDiff {
    D0,
    D1,
    D2,
}

impl Basis {
    fn from_index(i: u8) -> Self {
        match i % 3 {
            0 => Basis::X,
            1 => Basis::Y,
            _ => Basis::Z,
        }
    }

    fn index(self) -> u8 {
        match self {
            Basis::X => 0,
            Basis::Y => 1,
            Basis::Z => 2,
        }
    }

    /// Unit vector along the positive direction of the axis.
    pub fn unit(self) -> Vec3 {
        match self {
            Basis::X => Vec3::new(1.0, 0.0, 0.0),
            Basis::Y => Vec3::new(0.0, 1.0, 0.0),
            Basis::Z => Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// The coordinate of `v` along this axis.
    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Basis::X => v.x,
            Basis::Y => v.y,
            Basis::Z => v.z,
        }
    }
}

impl BasisDiff {
    fn index(self) -> u8 {
        match self {
            BasisDiff::D0 => 0,
            BasisDiff::D1 => 1,
            BasisDiff::D2 => 2,
        }
    }
}

impl ops::Sub for Basis {
    type Output = BasisDiff;

    fn sub(self, rhs: Self) -> BasisDiff {
        match (self.index() + 3 - rhs.index()) % 3 {
            0 => BasisDiff::D0,
            1 => BasisDiff::D1,
            _ => BasisDiff::D2,
        }
    }
}

impl ops::Add<BasisDiff> for Basis {
    type Output = Basis;

    fn add(self, rhs: BasisDiff) -> Basis {
        Basis::from_index(self.index() + rhs.index())
    }
}

#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Pos,
    Neg,
}

impl Sign {
    pub fn to_f32(self) -> f32 {
        match self {
            Sign::Pos => 1.0,
            Sign::Neg => -1.0,
        }
    }

    pub fn to_i8(self) -> i8 {
        match self {
            Sign::Pos => 1,
            Sign::Neg => -1,
        }
    }
}

impl ops::Neg for Sign {
    type Output = Sign;

    fn neg(self) -> Sign {
        match self {
            Sign::Pos => Sign::Neg,
            Sign::Neg => Sign::Pos,
        }
    }
}

impl ops::Mul for Sign {
    type Output = Sign;

    fn mul(self, rhs: Self) -> Sign {
        if self == rhs {
            Sign::Pos
        } else {
            Sign::Neg
        }
    }
}

/// A signed axis direction: one of the six directions a cube face or
/// sticker can point. +X: right, +Y: up, +Z: toward the viewer.
#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ray(pub Basis, pub Sign);

impl Ray {
    /// Cross product of two rays, or `None` if they are parallel.
    pub fn cross(&self, other: Self) -> Option<Self> {
        let diff = other.0 - self.0;
        let handedness = match diff {
            BasisDiff::D0 => return None,
            BasisDiff::D1 => Sign::Pos,
            BasisDiff::D2 => Sign::Neg,
        };
        Some(Ray(other.0 + diff, self.1 * other.1 * handedness))
    }

    pub fn to_vec(&self) -> Vec3 {
        self.0.unit() * self.1.to_f32()
    }

    /// Snaps a vector that points roughly along one of the six directions.
    pub fn from_vec(v: Vec3) -> Option<Self> {
        use cgmath::InnerSpace;

        let magnitude = v.magnitude();
        if magnitude < f32::EPSILON {
            return None;
        }
        enum_iter::<Ray>().find(|ray| ray.to_vec().dot(v) > 0.9 * magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;
    use itertools::Itertools;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn cross_matches_vectors() {
        for (a, b) in enum_iter::<Ray>().cartesian_product(enum_iter::<Ray>().collect_vec()) {
            let expected = a.to_vec().cross(b.to_vec());
            match a.cross(b) {
                Some(c) => assert!(
                    (c.to_vec() - expected).magnitude() < EPSILON,
                    "{a:?} x {b:?} should be {expected:?}, got {c:?}",
                ),
                None => assert!(expected.magnitude() < EPSILON, "{a:?} x {b:?}"),
            }
        }
    }

    #[test]
    fn basis_arithmetic() {
        assert_eq!(Basis::Z - Basis::X, BasisDiff::D2);
        assert_eq!(Basis::X - Basis::Z, BasisDiff::D1);
        assert_eq!(Basis::Y + BasisDiff::D2, Basis::X);
        for a in enum_iter::<Basis>() {
            for b in enum_iter::<Basis>() {
                assert_eq!(b + (a - b), a);
            }
        }
    }

    #[test]
    fn from_vec_snaps_drifted_vectors() {
        let drifted = Vec3::new(0.02, -0.999, 0.01);
        assert_eq!(Ray::from_vec(drifted), Some(Ray(Basis::Y, Sign::Neg)));
        assert_eq!(Ray::from_vec(Vec3::new(0.7, 0.7, 0.0)), None);
        assert_eq!(Ray::from_vec(Vec3::new(0.0, 0.0, 0.0)), None);
        for ray in enum_iter::<Ray>() {
            assert_eq!(Ray::from_vec(ray.to_vec() * 2.1), Some(ray));
        }
    }
}
