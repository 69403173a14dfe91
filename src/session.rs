use cgmath::Matrix;
use enum_map::Enum;
use eyre::{bail, ensure};
use log::{debug, info, trace};
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::preferences::{AnimationPreferences, GeometryPreferences, Preferences};
use crate::puzzle::cube::{Cube, Face};
use crate::puzzle::orientation::{self, Layer, Orientation, Reorientation};
use crate::puzzle::ring;
use crate::puzzle::tree::{Piece, PieceId};
use crate::util::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnDirection {
    Clockwise,
    CounterClockwise,
}

impl TurnDirection {
    /// Clockwise as seen from outside the face is positive.
    pub fn sign(self) -> f32 {
        match self {
            TurnDirection::Clockwise => 1.0,
            TurnDirection::CounterClockwise => -1.0,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            TurnDirection::Clockwise => TurnDirection::CounterClockwise,
            TurnDirection::CounterClockwise => TurnDirection::Clockwise,
        }
    }
}

/// A discrete request from the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Reorient(Reorientation),
    Turn(Layer, TurnDirection),
}

/// A quarter turn of one face, named by the color of its center so it keeps
/// its meaning across reorientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Twist {
    pub face: Face,
    pub direction: TurnDirection,
}

impl Twist {
    pub fn inverse(self) -> Self {
        Self {
            face: self.face,
            direction: self.direction.inverse(),
        }
    }
}

impl fmt::Display for Twist {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let direction = match self.direction {
            TurnDirection::Clockwise => "clockwise",
            TurnDirection::CounterClockwise => "counterclockwise",
        };
        write!(f, "{} {}", self.face, direction)
    }
}

/// The turn currently animating.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub twist: Twist,
    pub group: PieceId,
    /// Rotation axis in the group node's own frame.
    pub local_axis: Vec3,
    /// Outward normal of the turning face.
    pub world_axis: Vec3,
    /// Degrees; negative for clockwise.
    pub target_angle: f32,
    /// Cumulative angle applied so far, same sign as `target_angle`.
    pub angle: f32,
}

/// Notifications for the audio and rendering layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Reoriented {
        direction: Reorientation,
        front: Face,
        top: Face,
    },
    TurnStarted(Twist),
    TurnCompleted(Twist),
}

pub struct Session {
    animation: AnimationPreferences,
    geometry: GeometryPreferences,
    cube: Cube,
    orientation: Orientation,
    queue: VecDeque<Twist>,
    pending: Option<PendingTurn>,
    /// Every accepted turn, queued or done, oldest first.
    pub twists: Vec<Twist>,
    pub undid_twists: Vec<Twist>,
    events: Vec<Event>,
}

impl Session {
    pub fn new(prefs: &Preferences) -> eyre::Result<Self> {
        prefs.validate()?;
        orientation::validate_table()?;
        Ok(Self {
            animation: prefs.animation.clone(),
            geometry: prefs.geometry.clone(),
            cube: Cube::make_solved(prefs.geometry.spacing),
            orientation: Orientation::default(),
            queue: VecDeque::new(),
            pending: None,
            twists: vec![],
            undid_twists: vec![],
            events: vec![],
        })
    }

    pub fn apply(&mut self, mv: Move) -> eyre::Result<()> {
        match mv {
            Move::Reorient(direction) => self.submit_reorientation(direction)?,
            Move::Turn(layer, direction) => self.enqueue_turn(layer, direction),
        }
        Ok(())
    }

    /// Relabels which colors sit at which layers. Refused while a turn is
    /// animating.
    pub fn submit_reorientation(&mut self, direction: Reorientation) -> eyre::Result<()> {
        if let Some(pending) = &self.pending {
            bail!("cannot reorient while {} is turning", pending.twist);
        }
        self.orientation.apply_reorientation(direction);
        let (front, top) = (self.orientation.front(), self.orientation.top());
        info!("reoriented {direction:?}: {front} in front, {top} on top");
        self.events.push(Event::Reoriented {
            direction,
            front,
            top,
        });
        Ok(())
    }

    /// Queues a quarter turn of whatever face is at `layer` right now.
    pub fn enqueue_turn(&mut self, layer: Layer, direction: TurnDirection) {
        let twist = Twist {
            face: self.orientation.face_at(layer),
            direction,
        };
        self.push_twist(twist);
        self.twists.push(twist);
        self.undid_twists = vec![];
    }

    fn push_twist(&mut self, twist: Twist) {
        debug!("queued {twist} ({} waiting)", self.queue.len() + 1);
        self.queue.push_back(twist);
    }

    /// Advances the engine by `delta_ms` milliseconds. A turn popped from the
    /// queue starts moving in the same tick.
    pub fn tick(&mut self, delta_ms: f32) {
        if self.pending.is_none() {
            if let Some(twist) = self.queue.pop_front() {
                self.start_turn(twist);
            }
        }
        if self.pending.is_some() {
            self.advance(delta_ms.max(0.0));
        }
    }

    fn start_turn(&mut self, twist: Twist) {
        let layer = self.orientation.layer_of(twist.face);
        let role = layer.axis_role();
        let world_axis = self.orientation.resolve_axis(role, twist.face);
        let group = self.cube.group(twist.face);

        let tree = &mut self.cube.tree;
        let members = ring::select_ring_members(
            tree,
            group,
            self.orientation.axis(role),
            self.geometry.epsilon,
        );
        let moved = ring::reparent(tree, group, &members);
        debug!("{} group took {moved} pieces", twist.face);

        let local_axis = rotation_part(tree[group].transform()).transpose() * world_axis;
        info!("turning {twist} ({layer:?})");
        self.pending = Some(PendingTurn {
            twist,
            group,
            local_axis,
            world_axis,
            target_angle: -90.0 * twist.direction.sign(),
            angle: 0.0,
        });
        self.events.push(Event::TurnStarted(twist));
    }

    fn advance(&mut self, delta_ms: f32) {
        let Some(pending) = &mut self.pending else {
            return;
        };
        let target = pending.target_angle;
        let prev = pending.angle;
        let mut next = prev + self.animation.turn_speed * delta_ms * target.signum();
        let done = next.abs() >= target.abs();
        if done {
            next = target;
        }

        if next != prev {
            let tree = &mut self.cube.tree;
            tree.rotate(pending.group, next, pending.local_axis, pending.world_axis);
            tree.rotate(pending.group, -prev, pending.local_axis, pending.world_axis);
            pending.angle = next;
        }
        trace!("{} at {next:.1} of {target}", pending.twist);

        if done {
            let twist = pending.twist;
            self.cube.tree.snap(pending.group, self.geometry.spacing);
            self.pending = None;
            info!("finished {twist}");
            self.events.push(Event::TurnCompleted(twist));
        }
    }

    /// Queues the inverse of the latest turn.
    pub fn undo(&mut self) {
        if let Some(twist) = self.twists.pop() {
            self.undid_twists.push(twist);
            self.push_twist(twist.inverse());
        } else {
            // no undo left
        }
    }

    pub fn redo(&mut self) {
        if let Some(twist) = self.undid_twists.pop() {
            self.twists.push(twist);
            self.push_twist(twist);
        } else {
            // no redo left
        }
    }

    /// Queues `count` random face turns. The scramble is not part of the
    /// history, so it cannot be undone.
    pub fn scramble<R: Rng + ?Sized>(&mut self, rng: &mut R, count: usize) {
        info!("scrambling with {count} turns");
        for _ in 0..count {
            let face = Face::from_usize(rng.gen_range(0..Face::LENGTH));
            let direction = if rng.gen_bool(0.5) {
                TurnDirection::Clockwise
            } else {
                TurnDirection::CounterClockwise
            };
            self.push_twist(Twist { face, direction });
        }
        self.twists = vec![];
        self.undid_twists = vec![];
    }

    /// Back to the solved puzzle in the default orientation, dropping any
    /// queued or animating turn.
    pub fn reset(&mut self) {
        info!("reset");
        self.cube = Cube::make_solved(self.geometry.spacing);
        self.orientation = Orientation::default();
        self.queue.clear();
        self.pending = None;
        self.twists = vec![];
        self.undid_twists = vec![];
    }

    pub fn is_solved(&self) -> bool {
        self.cube.is_solved()
    }

    /// Checks the ownership partition and, between turns, that every piece
    /// sits on its own lattice point with a proper rotation.
    pub fn check_invariants(&self) -> eyre::Result<()> {
        self.cube.check_partition()?;
        ensure!(self.cube.transforms_are_rigid(), "a piece transform is not a rotation");
        if self.pending.is_none() {
            let points = self
                .cube
                .lattice_points(self.geometry.spacing, self.geometry.epsilon)?;
            let distinct: HashSet<_> = points
                .iter()
                .map(|(_, p)| p.values().copied().collect::<Vec<i8>>())
                .collect();
            ensure!(distinct.len() == points.len(), "two pieces share a lattice point");
        }
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Read-only view of every piece for rendering.
    pub fn pieces(&self) -> impl Iterator<Item = (PieceId, &Piece)> {
        self.cube.tree.pieces()
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    pub fn pending(&self) -> Option<&PendingTurn> {
        self.pending.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Idle with nothing left in the queue.
    pub fn is_settled(&self) -> bool {
        self.pending.is_none() && self.queue.is_empty()
    }

    pub fn queued(&self) -> &VecDeque<Twist> {
        &self.queue
    }

    pub fn orientation(&self) -> &Orientation {
        &self.orientation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::common::Basis;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FRAME: f32 = 16.0;

    fn session() -> Session {
        Session::new(&Preferences::default()).unwrap()
    }

    fn settle(session: &mut Session) {
        let mut ticks = 0;
        while !session.is_settled() {
            session.tick(FRAME);
            ticks += 1;
            assert!(ticks < 100_000, "session never settled");
        }
    }

    fn positions(session: &Session) -> Vec<(PieceId, Vec3)> {
        let mut positions: Vec<_> = session.cube.tree.positions().collect();
        positions.sort_by_key(|&(id, _)| id);
        positions
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        let eps = 1e-3;
        approx_eq(a.x, b.x, eps) && approx_eq(a.y, b.y, eps) && approx_eq(a.z, b.z, eps)
    }

    fn same_positions(a: &[(PieceId, Vec3)], b: &[(PieceId, Vec3)]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|((i, p), (j, q))| i == j && close(*p, *q))
    }

    fn piece_at(session: &Session, x: i8, y: i8, z: i8) -> PieceId {
        let s = session.geometry.spacing;
        let target = Vec3::new(x as f32, y as f32, z as f32) * s;
        session
            .cube
            .tree
            .positions()
            .find(|&(_, p)| close(p, target))
            .map(|(id, _)| id)
            .unwrap()
    }

    /// Front clockwise from solved: the blue group ends up owning its ring
    /// and the top-front edge moves to the right.
    #[test]
    fn front_clockwise() {
        let mut session = session();
        let s = session.geometry.spacing;
        let edge = piece_at(&session, 0, 1, 1);
        let blue = session.cube.group(Face::Blue);
        assert_eq!(session.cube.tree[blue].children().len(), 3);

        session.enqueue_turn(Layer::Front, TurnDirection::Clockwise);
        assert_eq!(session.queued().len(), 1);
        settle(&mut session);

        assert!(session.queued().is_empty());
        assert!(session.pending().is_none());
        assert_eq!(session.cube.tree[blue].children().len(), 8);
        for &child in session.cube.tree[blue].children() {
            assert!(approx_eq(session.cube.tree[child].position().z, s, 1e-3));
        }
        assert!(close(session.cube.tree[edge].position(), Vec3::new(s, 0.0, s)));
        assert!(!session.is_solved());
        session.check_invariants().unwrap();
        assert_eq!(
            session.drain_events(),
            vec![
                Event::TurnStarted(Twist { face: Face::Blue, direction: TurnDirection::Clockwise }),
                Event::TurnCompleted(Twist { face: Face::Blue, direction: TurnDirection::Clockwise }),
            ],
        );
    }

    #[test]
    fn turn_then_inverse() {
        let mut session = session();
        let before = positions(&session);
        session.enqueue_turn(Layer::Right, TurnDirection::Clockwise);
        session.enqueue_turn(Layer::Right, TurnDirection::CounterClockwise);
        settle(&mut session);
        assert!(same_positions(&before, &positions(&session)));
        assert!(session.is_solved());
    }

    #[test]
    fn four_turns_are_identity() {
        let mut session = session();
        let before = positions(&session);
        for _ in 0..4 {
            session.enqueue_turn(Layer::Top, TurnDirection::CounterClockwise);
        }
        settle(&mut session);
        assert!(same_positions(&before, &positions(&session)));
        assert!(session.is_solved());
    }

    /// R U R' U' has order 6.
    #[test]
    fn sexy_move_order() {
        let mut session = session();
        for i in 0..6 {
            session.enqueue_turn(Layer::Right, TurnDirection::Clockwise);
            session.enqueue_turn(Layer::Top, TurnDirection::Clockwise);
            session.enqueue_turn(Layer::Right, TurnDirection::CounterClockwise);
            session.enqueue_turn(Layer::Top, TurnDirection::CounterClockwise);
            settle(&mut session);
            session.check_invariants().unwrap();
            assert_eq!(session.is_solved(), i == 5, "after {} repetitions", i + 1);
        }
    }

    /// The second turn only moves pieces of the first turn's ring that also
    /// lie in its own slice.
    #[test]
    fn back_to_back_turns() {
        let mut session = session();
        let s = session.geometry.spacing;
        session.enqueue_turn(Layer::Front, TurnDirection::Clockwise);
        session.enqueue_turn(Layer::Right, TurnDirection::Clockwise);

        session.tick(FRAME);
        assert_eq!(session.pending().map(|p| p.twist.face), Some(Face::Blue));
        assert_eq!(session.queued().len(), 1);

        while session.pending().is_some() {
            session.tick(FRAME);
        }
        let blue = session.cube.group(Face::Blue);
        let after_front: Vec<(PieceId, Vec3)> = session.cube.tree[blue]
            .children()
            .iter()
            .map(|&id| (id, session.cube.tree[id].position()))
            .collect();

        settle(&mut session);
        session.check_invariants().unwrap();
        let orange = session.cube.group(Face::Orange);
        assert_eq!(session.cube.tree[orange].children().len(), 8);
        for (id, position) in after_front {
            let now = session.cube.tree[id].position();
            if approx_eq(position.x, s, 1e-3) {
                assert!(approx_eq(now.x, s, 1e-3), "{id:?} left the right slice");
            } else {
                assert!(close(now, position), "{id:?} moved without being in the right slice");
            }
        }
    }

    #[test]
    fn reorientation_waits_for_turn() {
        let mut session = session();
        session.enqueue_turn(Layer::Front, TurnDirection::Clockwise);
        session.tick(1.0);
        assert!(!session.is_idle());
        assert!(session.submit_reorientation(Reorientation::YawLeft).is_err());
        assert_eq!(*session.orientation(), Orientation::default());

        settle(&mut session);
        session.submit_reorientation(Reorientation::YawLeft).unwrap();
        assert_eq!(session.orientation().front(), Face::Orange);
        assert_eq!(session.orientation().top(), Face::White);
    }

    /// A queued turn keeps its color even if the puzzle is reoriented before
    /// it starts.
    #[test]
    fn queued_turns_keep_their_face() {
        let mut session = session();
        session.enqueue_turn(Layer::Front, TurnDirection::Clockwise);
        session.submit_reorientation(Reorientation::PitchDown).unwrap();
        session.enqueue_turn(Layer::Front, TurnDirection::Clockwise);
        let faces: Vec<Face> = session.queued().iter().map(|t| t.face).collect();
        assert_eq!(faces, vec![Face::Blue, Face::White]);
        settle(&mut session);
        session.check_invariants().unwrap();
    }

    /// After a reorientation, the same layer turns the same way as seen by
    /// the viewer: front clockwise with white in front carries the back-top
    /// edge to the right.
    #[test]
    fn reoriented_front_clockwise() {
        let mut session = session();
        session.apply(Move::Reorient(Reorientation::PitchDown)).unwrap();
        assert_eq!(session.orientation().front(), Face::White);
        assert_eq!(session.orientation().top(), Face::Green);
        let right = session.orientation().face_at(Layer::Right);
        assert_eq!(right, Face::Orange);

        // white-green edge, top of the new front
        let edge = piece_at(&session, 0, 1, -1);
        session.apply(Move::Turn(Layer::Front, TurnDirection::Clockwise)).unwrap();
        settle(&mut session);
        let s = session.geometry.spacing;
        assert!(close(session.cube.tree[edge].position(), Vec3::new(s, s, 0.0)));
    }

    #[test]
    fn events_in_order() {
        let mut session = session();
        let f = Twist { face: Face::Blue, direction: TurnDirection::Clockwise };
        let u = Twist { face: Face::White, direction: TurnDirection::CounterClockwise };
        session.enqueue_turn(Layer::Front, f.direction);
        session.enqueue_turn(Layer::Top, u.direction);
        settle(&mut session);
        session.submit_reorientation(Reorientation::YawRight).unwrap();
        assert_eq!(
            session.drain_events(),
            vec![
                Event::TurnStarted(f),
                Event::TurnCompleted(f),
                Event::TurnStarted(u),
                Event::TurnCompleted(u),
                Event::Reoriented {
                    direction: Reorientation::YawRight,
                    front: Face::Red,
                    top: Face::White,
                },
            ],
        );
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn undo_and_redo() {
        let mut session = session();
        session.enqueue_turn(Layer::Left, TurnDirection::Clockwise);
        settle(&mut session);
        assert!(!session.is_solved());

        session.undo();
        settle(&mut session);
        assert!(session.is_solved());
        assert!(session.twists.is_empty());
        assert_eq!(session.undid_twists.len(), 1);

        session.redo();
        settle(&mut session);
        assert!(!session.is_solved());
        assert_eq!(session.twists.len(), 1);

        // a new turn drops the redo stack
        session.undo();
        session.enqueue_turn(Layer::Bottom, TurnDirection::Clockwise);
        assert!(session.undid_twists.is_empty());
        settle(&mut session);
        session.undo();
        settle(&mut session);
        assert!(session.is_solved());

        // nothing left to undo
        assert!(session.twists.is_empty());
        session.undo();
        assert!(session.is_settled());
    }

    /// Undo is by color, so it still works after reorienting.
    #[test]
    fn undo_after_reorientation() {
        let mut session = session();
        session.enqueue_turn(Layer::Front, TurnDirection::Clockwise);
        settle(&mut session);
        session.submit_reorientation(Reorientation::YawLeft).unwrap();
        session.undo();
        settle(&mut session);
        assert!(session.is_solved());
    }

    #[test]
    fn scramble_keeps_invariants() {
        let mut session = session();
        let stickers: Vec<_> = session
            .pieces()
            .map(|(_, piece)| (*piece.colors(), *piece.visible()))
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        session.scramble(&mut rng, 30);
        assert_eq!(session.queued().len(), 30);
        assert!(session.twists.is_empty());

        let mut ticks = 0;
        while !session.is_settled() {
            session.tick(FRAME);
            session.check_invariants().unwrap();
            ticks += 1;
        }
        assert!(ticks >= 30 * 13);

        let after: Vec<_> = session
            .pieces()
            .map(|(_, piece)| (*piece.colors(), *piece.visible()))
            .collect();
        assert_eq!(stickers, after);

        // the scramble is not undoable
        session.undo();
        assert!(session.is_settled());

        session.reset();
        assert!(session.is_solved());
        session.check_invariants().unwrap();
    }

    #[test]
    fn non_positive_deltas() {
        let mut session = session();
        session.enqueue_turn(Layer::Back, TurnDirection::Clockwise);
        session.tick(0.0);
        let pending = session.pending().unwrap();
        assert_eq!(pending.angle, 0.0);
        assert_eq!(pending.twist.face, Face::Green);
        session.tick(-50.0);
        assert_eq!(session.pending().unwrap().angle, 0.0);
        assert_eq!(session.drain_events().len(), 1);

        session.tick(FRAME);
        let angle = session.pending().unwrap().angle;
        assert!(approx_eq(angle, -0.45 * FRAME, 1e-4), "{angle}");
    }

    /// A long frame finishes the turn exactly on target.
    #[test]
    fn long_frame_snaps() {
        let mut session = session();
        session.enqueue_turn(Layer::Right, TurnDirection::CounterClockwise);
        session.tick(10_000.0);
        assert!(session.is_settled());
        let orange = session.cube.group(Face::Orange);
        let edge = session.cube.tree[orange].children()[0];
        let point = crate::puzzle::tree::lattice_point(
            session.cube.tree[edge].position(),
            session.geometry.spacing,
            1e-6,
        );
        assert!(point.is_some());
        assert_eq!(point.unwrap()[Basis::X], 1);
        session.check_invariants().unwrap();
    }

    #[test]
    fn partition_holds_mid_turn() {
        let mut session = session();
        session.enqueue_turn(Layer::Bottom, TurnDirection::Clockwise);
        session.tick(FRAME * 5.0);
        let pending = session.pending().unwrap();
        assert!(pending.angle < 0.0 && pending.angle > -90.0);
        session.check_invariants().unwrap();
        assert!(!session.is_solved());
    }
}
