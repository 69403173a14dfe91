use cgmath::{InnerSpace, SquareMatrix};
use enum_map::{enum_map, Enum, EnumMap};
use eyre::{ensure, eyre};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::puzzle::common::*;
use crate::puzzle::tree::{PieceId, PieceTree};
use crate::util::*;

/// The six sticker colors. Each names the face that shows it when solved.
#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    White,
    Orange,
    Blue,
    Red,
    Green,
    Yellow,
}

impl Face {
    /// Outward direction of this face on the solved puzzle.
    pub fn ray(self) -> Ray {
        use Face::*;

        match self {
            White => Ray(Basis::Y, Sign::Pos),
            Orange => Ray(Basis::X, Sign::Pos),
            Blue => Ray(Basis::Z, Sign::Pos),
            Red => Ray(Basis::X, Sign::Neg),
            Green => Ray(Basis::Z, Sign::Neg),
            Yellow => Ray(Basis::Y, Sign::Neg),
        }
    }

    pub fn from_ray(ray: Ray) -> Self {
        enum_iter::<Face>()
            .find(|face| face.ray() == ray)
            .expect("every ray belongs to a face")
    }

    pub fn opposite(self) -> Self {
        let Ray(basis, sign) = self.ray();
        Face::from_ray(Ray(basis, -sign))
    }

    /// White, orange and blue sit on the positive end of their axes.
    pub fn is_positive(self) -> bool {
        self.ray().1 == Sign::Pos
    }

    /// Neither the same face nor the opposite one.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.ray().0 != other.ray().0
    }

    pub fn name(&self) -> &'static str {
        match self {
            Face::White => "white",
            Face::Orange => "orange",
            Face::Blue => "blue",
            Face::Red => "red",
            Face::Green => "green",
            Face::Yellow => "yellow",
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Edges and corners are handed to the first face in this order whose
/// slice contains them.
const ASSEMBLY_ORDER: [Face; 6] = [
    Face::White,
    Face::Orange,
    Face::Blue,
    Face::Red,
    Face::Green,
    Face::Yellow,
];

/// The 3x3x3 puzzle: a piece tree plus the handles of its six face groups.
#[derive(Debug)]
pub struct Cube {
    pub tree: PieceTree,
    groups: EnumMap<Face, PieceId>,
}

impl Cube {
    /// Builds the solved puzzle with pieces `spacing` apart.
    pub fn make_solved(spacing: f32) -> Self {
        let mut tree = PieceTree::new();
        let root = tree.root();

        let groups = EnumMap::from_fn(|face: Face| {
            let mut point: EnumMap<Basis, i8> = EnumMap::default();
            let Ray(basis, sign) = face.ray();
            point[basis] = sign.to_i8();
            let (colors, visible) = solved_stickers(&point);
            tree.add_piece(root, colors, visible, lattice_to_vec(&point, spacing))
        });

        for x in -1..=1 {
            for y in -1..=1 {
                for z in -1..=1 {
                    let point = enum_map! { Basis::X => x, Basis::Y => y, Basis::Z => z };
                    if point.values().filter(|&&c| c != 0).count() < 2 {
                        // root and centers are already placed
                        continue;
                    }
                    let owner = ASSEMBLY_ORDER
                        .iter()
                        .find(|face| {
                            let Ray(basis, sign) = face.ray();
                            point[basis] == sign.to_i8()
                        })
                        .expect("every edge and corner touches a face");
                    let (colors, visible) = solved_stickers(&point);
                    tree.add_piece(groups[*owner], colors, visible, lattice_to_vec(&point, spacing));
                }
            }
        }

        Self { tree, groups }
    }

    /// The center piece acting as group node for `face`.
    pub fn group(&self, face: Face) -> PieceId {
        self.groups[face]
    }

    /// Every visible sticker faces the direction of its own color.
    pub fn is_solved(&self) -> bool {
        self.tree.pieces().all(|(_, piece)| {
            piece
                .stickers()
                .all(|(ray, color)| piece.facing(ray) == Some(color.ray()))
        })
    }

    /// Checks the ownership structure: the root owns exactly the six groups,
    /// and the remaining pieces are leaves split among the groups.
    pub fn check_partition(&self) -> eyre::Result<()> {
        let tree = &self.tree;
        let root = tree.root();
        ensure!(tree.len() == 27, "puzzle has {} pieces", tree.len());

        let group_set: HashSet<PieceId> = self.groups.values().copied().collect();
        let root_children: HashSet<PieceId> = tree[root].children().iter().copied().collect();
        ensure!(
            root_children == group_set && tree[root].children().len() == 6,
            "root owns {:?}, expected the six face groups",
            tree[root].children(),
        );

        let mut seen = HashSet::new();
        for (face, &group) in &self.groups {
            ensure!(tree[group].parent() == Some(root), "{face} group is detached");
            for &child in tree[group].children() {
                ensure!(
                    !group_set.contains(&child) && child != root,
                    "{face} group owns another group",
                );
                ensure!(seen.insert(child), "{child:?} is owned twice");
                ensure!(
                    tree[child].parent() == Some(group),
                    "{child:?} disagrees about its owner",
                );
                ensure!(
                    tree[child].children().is_empty(),
                    "{child:?} owns pieces of its own",
                );
            }
        }
        ensure!(seen.len() == 20, "{} edges and corners are owned", seen.len());
        Ok(())
    }

    /// Lattice coordinates of every piece, failing if any is off the lattice.
    pub fn lattice_points(
        &self,
        spacing: f32,
        epsilon: f32,
    ) -> eyre::Result<Vec<(PieceId, EnumMap<Basis, i8>)>> {
        self.tree
            .positions()
            .map(|(id, position)| {
                crate::puzzle::tree::lattice_point(position, spacing, epsilon)
                    .map(|point| (id, point))
                    .ok_or_else(|| eyre!("{id:?} is off the lattice at {position:?}"))
            })
            .collect()
    }

    /// Whether every piece's rotation is a proper rotation.
    pub fn transforms_are_rigid(&self) -> bool {
        self.tree.pieces().all(|(_, piece)| {
            let rot = rotation_part(piece.transform());
            approx_eq(rot.determinant(), 1.0, 1e-3)
                && approx_eq(rot.x.magnitude(), 1.0, 1e-3)
                && approx_eq(rot.y.magnitude(), 1.0, 1e-3)
                && approx_eq(rot.z.magnitude(), 1.0, 1e-3)
        })
    }
}

fn lattice_to_vec(point: &EnumMap<Basis, i8>, spacing: f32) -> Vec3 {
    Vec3::new(
        point[Basis::X] as f32,
        point[Basis::Y] as f32,
        point[Basis::Z] as f32,
    ) * spacing
}

/// Stickers for a piece at `point` on the solved puzzle: one on each
/// direction that faces out of the shell.
fn solved_stickers(point: &EnumMap<Basis, i8>) -> (EnumMap<Ray, Option<Face>>, EnumMap<Ray, bool>) {
    let colors = EnumMap::from_fn(|ray: Ray| {
        (point[ray.0] == ray.1.to_i8()).then(|| Face::from_ray(ray))
    });
    let visible = EnumMap::from_fn(|ray: Ray| colors[ray].is_some());
    (colors, visible)
}
