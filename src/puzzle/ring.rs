//! Regrouping pieces before a turn so that rotating a face group reaches
//! exactly the pieces in its slice.

use log::debug;
use std::collections::HashSet;

use crate::puzzle::common::Basis;
use crate::puzzle::tree::{PieceId, PieceTree};
use crate::util::approx_eq;

/// Pieces in a face slice besides its group node.
pub const RING_SIZE: usize = 8;

/// Every piece whose coordinate along `basis` matches `group`'s within
/// `epsilon`, excluding `group` itself.
///
/// Panics unless exactly [`RING_SIZE`] pieces match.
pub fn select_ring_members(
    tree: &PieceTree,
    group: PieceId,
    basis: Basis,
    epsilon: f32,
) -> Vec<PieceId> {
    let slice = basis.component(tree[group].position());
    let members: Vec<PieceId> = tree
        .positions()
        .filter(|&(id, position)| {
            id != group && approx_eq(basis.component(position), slice, epsilon)
        })
        .map(|(id, _)| id)
        .collect();
    assert_eq!(
        members.len(),
        RING_SIZE,
        "slice of {group:?} along {basis:?} should hold {RING_SIZE} other pieces",
    );
    members
}

/// Hands every member not already owned by `group` over to it. Returns the
/// number of pieces moved; running it again right away moves nothing.
pub fn reparent(tree: &mut PieceTree, group: PieceId, members: &[PieceId]) -> usize {
    let root = tree.root();
    let mut moved = 0;
    for &piece in members {
        let owner = tree[piece]
            .parent()
            .expect("ring members are never the root");
        assert_ne!(owner, root, "{piece:?} is a face group, not a ring member");
        if owner != group {
            debug!("moving {piece:?} from {owner:?} to {group:?}");
            tree.transfer_ownership(piece, owner, group);
            moved += 1;
        }
    }

    let owned: HashSet<PieceId> = tree[group].children().iter().copied().collect();
    let expected: HashSet<PieceId> = members.iter().copied().collect();
    assert!(
        owned == expected,
        "{group:?} owns {owned:?} after reparenting, expected {expected:?}",
    );
    moved
}
