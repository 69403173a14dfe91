use cgmath::{Deg, InnerSpace, Matrix, SquareMatrix};
use enum_map::EnumMap;
use std::ops;

use crate::puzzle::common::*;
use crate::puzzle::cube::Face;
use crate::util::*;

/// Stable handle of a piece inside a [`PieceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(usize);

/// A rigid sub-block of the puzzle.
#[derive(Debug)]
pub struct Piece {
    /// For each local direction, the color of the sticker there (`None` is blank).
    colors: EnumMap<Ray, Option<Face>>,
    /// For each local direction, whether the sticker is on the outer shell.
    visible: EnumMap<Ray, bool>,
    /// Translation of `transform`, kept separately for lattice matching.
    position: Vec3,
    /// Transform from the puzzle origin to this piece. This is absolute,
    /// not relative to the parent.
    transform: Mat4,
    parent: Option<PieceId>,
    children: Vec<PieceId>,
}

impl Piece {
    fn new(
        colors: EnumMap<Ray, Option<Face>>,
        visible: EnumMap<Ray, bool>,
        position: Vec3,
    ) -> Self {
        Self {
            colors,
            visible,
            position,
            transform: Mat4::from_translation(position),
            parent: None,
            children: vec![],
        }
    }

    pub fn colors(&self) -> &EnumMap<Ray, Option<Face>> {
        &self.colors
    }

    pub fn visible(&self) -> &EnumMap<Ray, bool> {
        &self.visible
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn parent(&self) -> Option<PieceId> {
        self.parent
    }

    pub fn children(&self) -> &[PieceId] {
        &self.children
    }

    /// The puzzle-frame direction the local direction `ray` currently faces,
    /// or `None` while the piece is mid-turn.
    pub fn facing(&self, ray: Ray) -> Option<Ray> {
        let current = rotation_part(&self.transform) * ray.to_vec();
        Ray::from_vec(current).filter(|r| (r.to_vec() - current).magnitude() < 1e-3)
    }

    /// Visible stickers as (local direction, color) pairs.
    pub fn stickers(&self) -> impl Iterator<Item = (Ray, Face)> + '_ {
        self.colors
            .iter()
            .filter(|&(ray, _)| self.visible[ray])
            .filter_map(|(ray, color)| color.map(|c| (ray, c)))
    }
}

/// Integer lattice coordinates of `position` if it lies within `epsilon`
/// of a point of the 3x3x3 lattice with the given spacing.
pub fn lattice_point(position: Vec3, spacing: f32, epsilon: f32) -> Option<EnumMap<Basis, i8>> {
    let mut point: EnumMap<Basis, i8> = EnumMap::default();
    for (basis, coord) in point.iter_mut() {
        let value = basis.component(position);
        *coord = (-1..=1).find(|&i| approx_eq(value, i as f32 * spacing, epsilon))?;
    }
    Some(point)
}

/// The composition tree of the puzzle: every piece lives in one arena and
/// refers to its owner and owned pieces by handle.
#[derive(Debug)]
pub struct PieceTree {
    pieces: Vec<Piece>,
}

impl Default for PieceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceTree {
    /// A tree holding only the invisible root anchor at the origin.
    pub fn new() -> Self {
        let root = Piece::new(
            EnumMap::default(),
            EnumMap::default(),
            Vec3::new(0.0, 0.0, 0.0),
        );
        Self { pieces: vec![root] }
    }

    pub fn root(&self) -> PieceId {
        PieceId(0)
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn pieces(&self) -> impl Iterator<Item = (PieceId, &Piece)> {
        self.pieces.iter().enumerate().map(|(i, piece)| (PieceId(i), piece))
    }

    pub fn add_piece(
        &mut self,
        parent: PieceId,
        colors: EnumMap<Ray, Option<Face>>,
        visible: EnumMap<Ray, bool>,
        position: Vec3,
    ) -> PieceId {
        let id = PieceId(self.pieces.len());
        let mut piece = Piece::new(colors, visible, position);
        piece.parent = Some(parent);
        self.pieces.push(piece);
        self.pieces[parent.0].children.push(id);
        id
    }

    /// Moves `piece` from `old_parent` to the end of `new_parent`'s children
    /// without touching its transform.
    ///
    /// Panics if `piece` is not a direct child of `old_parent`.
    pub fn transfer_ownership(
        &mut self,
        piece: PieceId,
        old_parent: PieceId,
        new_parent: PieceId,
    ) {
        assert_eq!(
            self.pieces[piece.0].parent,
            Some(old_parent),
            "{piece:?} is not owned by {old_parent:?}",
        );
        let siblings = &mut self.pieces[old_parent.0].children;
        let index = siblings
            .iter()
            .position(|&child| child == piece)
            .expect("a piece should be listed by its parent");
        siblings.remove(index);
        self.pieces[new_parent.0].children.push(piece);
        self.pieces[piece.0].parent = Some(new_parent);
    }

    /// Rotates `node` by `angle` degrees about `local_axis` (in the node's own
    /// frame) and every descendant by the same angle about `world_axis`, so
    /// the whole subtree turns about a shared pivot at the origin.
    pub fn rotate(&mut self, node: PieceId, angle: f32, local_axis: Vec3, world_axis: Vec3) {
        let base = self.pieces[node.0].transform;
        self.rotate_from(node, base, angle, local_axis, world_axis);
        let piece = &mut self.pieces[node.0];
        piece.position = translation_part(&piece.transform);
    }

    fn rotate_from(
        &mut self,
        node: PieceId,
        base: Mat4,
        angle: f32,
        local_axis: Vec3,
        world_axis: Vec3,
    ) {
        let rotation = Mat4::from_axis_angle(world_axis, Deg(angle));
        let inverse_rotation = rotation.transpose();

        self.pieces[node.0].transform = base * Mat4::from_axis_angle(local_axis, Deg(angle));

        for i in 0..self.pieces[node.0].children.len() {
            let child = self.pieces[node.0].children[i];
            // conjugate so that turning about world_axis in the child's frame
            // lands on rotation * transform
            let conjugated = rotation * self.pieces[child.0].transform * inverse_rotation;
            self.rotate_from(child, conjugated, angle, world_axis, world_axis);
            let piece = &mut self.pieces[child.0];
            piece.position = translation_part(&piece.transform);
        }
    }

    /// Depth-first positions of every piece, starting at the root.
    pub fn positions(&self) -> Positions<'_> {
        self.positions_from(self.root())
    }

    /// Depth-first positions of `node` and everything below it.
    pub fn positions_from(&self, node: PieceId) -> Positions<'_> {
        Positions {
            tree: self,
            stack: vec![node],
        }
    }

    /// Rounds every transform below `node` to an exact quarter-turn rotation
    /// and a lattice translation.
    pub fn snap(&mut self, node: PieceId, spacing: f32) {
        let ids: Vec<PieceId> = self.positions_from(node).map(|(id, _)| id).collect();
        for id in ids {
            let piece = &mut self.pieces[id.0];
            let mat = &mut piece.transform;
            for col in 0..3 {
                for row in 0..3 {
                    mat[col][row] = mat[col][row].round();
                }
                mat[col][3] = 0.0;
            }
            for row in 0..3 {
                mat[3][row] = (mat[3][row] / spacing).round() * spacing;
            }
            mat[3][3] = 1.0;
            debug_assert!(
                approx_eq(rotation_part(mat).determinant(), 1.0, 1e-4),
                "{id:?} snapped to a non-rotation",
            );
            piece.position = translation_part(mat);
        }
    }
}

impl ops::Index<PieceId> for PieceTree {
    type Output = Piece;

    fn index(&self, id: PieceId) -> &Piece {
        &self.pieces[id.0]
    }
}

/// Depth-first walk yielding each piece with its current position.
pub struct Positions<'a> {
    tree: &'a PieceTree,
    stack: Vec<PieceId>,
}

impl<'a> Iterator for Positions<'a> {
    type Item = (PieceId, Vec3);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let piece = &self.tree[id];
        self.stack.extend(piece.children.iter().rev());
        Some((id, piece.position))
    }
}
