use enum_map::{enum_map, Enum, EnumMap};
use eyre::{bail, ensure};
use std::collections::{HashSet, VecDeque};

use crate::puzzle::common::*;
use crate::puzzle::cube::Face;
use crate::util::*;

/// A whole-puzzle reorientation, as seen by the viewer.
#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reorientation {
    /// The right face comes to the front.
    YawLeft,
    /// The left face comes to the front.
    YawRight,
    /// The front face goes to the top.
    PitchUp,
    /// The top face comes to the front.
    PitchDown,
}

impl Reorientation {
    pub fn inverse(self) -> Self {
        use Reorientation::*;

        match self {
            YawLeft => YawRight,
            YawRight => YawLeft,
            PitchUp => PitchDown,
            PitchDown => PitchUp,
        }
    }
}

/// The role an axis plays for the viewer.
#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisRole {
    LeftRight,
    UpDown,
    FrontBack,
}

/// A face position relative to the viewer.
#[derive(Debug, Enum, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Top,
    Bottom,
    Left,
    Right,
    Front,
    Back,
}

impl Layer {
    pub fn axis_role(self) -> AxisRole {
        match self {
            Layer::Top | Layer::Bottom => AxisRole::UpDown,
            Layer::Left | Layer::Right => AxisRole::LeftRight,
            Layer::Front | Layer::Back => AxisRole::FrontBack,
        }
    }
}

type Entry = Option<(Face, Face)>;
type Table = [[[Entry; 6]; 4]; 6];

/// `FACE_TABLE[front][direction][top]` is the (front, top) pair after
/// reorienting. Rows follow the order of [`Reorientation`], columns the
/// order of [`Face`]. Pairs that are not adjacent have no entry.
#[rustfmt::skip]
const FACE_TABLE: Table = {
    use Face::*;
    [
        // front: White
        [
            [None, Some((Blue, Orange)), Some((Red, Blue)), Some((Green, Red)), Some((Orange, Green)), None],
            [None, Some((Green, Orange)), Some((Orange, Blue)), Some((Blue, Red)), Some((Red, Green)), None],
            [None, Some((Red, White)), Some((Green, White)), Some((Orange, White)), Some((Blue, White)), None],
            [None, Some((Orange, Yellow)), Some((Blue, Yellow)), Some((Red, Yellow)), Some((Green, Yellow)), None],
        ],
        // front: Orange
        [
            [Some((Green, White)), None, Some((White, Blue)), None, Some((Yellow, Green)), Some((Blue, Yellow))],
            [Some((Blue, White)), None, Some((Yellow, Blue)), None, Some((White, Green)), Some((Green, Yellow))],
            [Some((Yellow, Orange)), None, Some((Green, Orange)), None, Some((Blue, Orange)), Some((White, Orange))],
            [Some((White, Red)), None, Some((Blue, Red)), None, Some((Green, Red)), Some((Yellow, Red))],
        ],
        // front: Blue
        [
            [Some((Orange, White)), Some((Yellow, Orange)), None, Some((White, Red)), None, Some((Red, Yellow))],
            [Some((Red, White)), Some((White, Orange)), None, Some((Yellow, Red)), None, Some((Orange, Yellow))],
            [Some((Yellow, Blue)), Some((Red, Blue)), None, Some((Orange, Blue)), None, Some((White, Blue))],
            [Some((White, Green)), Some((Orange, Green)), None, Some((Red, Green)), None, Some((Yellow, Green))],
        ],
        // front: Red
        [
            [Some((Blue, White)), None, Some((Yellow, Blue)), None, Some((White, Green)), Some((Green, Yellow))],
            [Some((Green, White)), None, Some((White, Blue)), None, Some((Yellow, Green)), Some((Blue, Yellow))],
            [Some((Yellow, Red)), None, Some((Green, Red)), None, Some((Blue, Red)), Some((White, Red))],
            [Some((White, Orange)), None, Some((Blue, Orange)), None, Some((Green, Orange)), Some((Yellow, Orange))],
        ],
        // front: Green
        [
            [Some((Red, White)), Some((White, Orange)), None, Some((Yellow, Red)), None, Some((Orange, Yellow))],
            [Some((Orange, White)), Some((Yellow, Orange)), None, Some((White, Red)), None, Some((Red, Yellow))],
            [Some((Yellow, Green)), Some((Red, Green)), None, Some((Orange, Green)), None, Some((White, Green))],
            [Some((White, Blue)), Some((Orange, Blue)), None, Some((Red, Blue)), None, Some((Yellow, Blue))],
        ],
        // front: Yellow
        [
            [None, Some((Green, Orange)), Some((Orange, Blue)), Some((Blue, Red)), Some((Red, Green)), None],
            [None, Some((Blue, Orange)), Some((Red, Blue)), Some((Green, Red)), Some((Orange, Green)), None],
            [None, Some((Red, Yellow)), Some((Green, Yellow)), Some((Orange, Yellow)), Some((Blue, Yellow)), None],
            [None, Some((Orange, White)), Some((Blue, White)), Some((Red, White)), Some((Green, White)), None],
        ],
    ]
};

fn lookup(front: Face, direction: Reorientation, top: Face) -> Entry {
    lookup_in(&FACE_TABLE, front, direction, top)
}

fn lookup_in(table: &Table, front: Face, direction: Reorientation, top: Face) -> Entry {
    table[front.into_usize()][direction.into_usize()][top.into_usize()]
}

/// Which geometric axis plays each role when `front` faces the viewer and
/// `top` points up.
fn axis_roles(front: Face, top: Face) -> EnumMap<AxisRole, Basis> {
    let right = top
        .ray()
        .cross(front.ray())
        .expect("front and top should be adjacent");
    enum_map! {
        AxisRole::LeftRight => right.0,
        AxisRole::UpDown => top.ray().0,
        AxisRole::FrontBack => front.ray().0,
    }
}

/// All 24 orientations: adjacent (front, top) pairs.
pub fn all_orientations() -> Vec<(Face, Face)> {
    enum_iter::<Face>()
        .flat_map(|front| enum_iter::<Face>().map(move |top| (front, top)))
        .filter(|(front, top)| front.is_adjacent(*top))
        .collect()
}

/// Checks that the reorientation table is a group action on the 24
/// orientations. Run once at startup.
pub fn validate_table() -> eyre::Result<()> {
    validate(&FACE_TABLE)
}

fn validate(table: &Table) -> eyre::Result<()> {
    let orientations = all_orientations();
    ensure!(orientations.len() == 24, "expected 24 orientations");

    for front in enum_iter::<Face>() {
        for top in enum_iter::<Face>() {
            for direction in enum_iter::<Reorientation>() {
                match (front.is_adjacent(top), lookup_in(table, front, direction, top)) {
                    (true, Some((new_front, new_top))) => ensure!(
                        new_front.is_adjacent(new_top),
                        "{direction:?} from ({front}, {top}) gives non-adjacent ({new_front}, {new_top})",
                    ),
                    (true, None) => bail!("{direction:?} from ({front}, {top}) is missing"),
                    (false, Some(entry)) => {
                        bail!("({front}, {top}) is not an orientation but maps to {entry:?}")
                    }
                    (false, None) => (),
                }
            }
        }
    }

    let step = |(front, top): (Face, Face), direction| {
        lookup_in(table, front, direction, top).expect("entries were checked above")
    };

    for direction in enum_iter::<Reorientation>() {
        let images: HashSet<(Face, Face)> = orientations.iter().map(|&o| step(o, direction)).collect();
        ensure!(images.len() == 24, "{direction:?} is not a bijection");

        for &o in &orientations {
            ensure!(
                step(step(o, direction), direction.inverse()) == o,
                "{direction:?} is not undone by {:?} at {o:?}",
                direction.inverse(),
            );
            let cycled = (0..4).fold(o, |o, _| step(o, direction));
            ensure!(cycled == o, "{direction:?} does not have order 4 at {o:?}");
        }
    }

    let start = (Face::Blue, Face::White);
    let mut reached = HashSet::from([start]);
    let mut frontier = VecDeque::from([start]);
    while let Some(o) = frontier.pop_front() {
        for direction in enum_iter::<Reorientation>() {
            let next = step(o, direction);
            if reached.insert(next) {
                frontier.push_back(next);
            }
        }
    }
    ensure!(reached.len() == 24, "only {} orientations are reachable", reached.len());

    Ok(())
}

/// Which colors face the viewer and point up, and the axis roles that
/// follow from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    front: Face,
    top: Face,
    axes: EnumMap<AxisRole, Basis>,
}

impl Default for Orientation {
    /// Blue in front, white on top.
    fn default() -> Self {
        Self {
            front: Face::Blue,
            top: Face::White,
            axes: axis_roles(Face::Blue, Face::White),
        }
    }
}

impl Orientation {
    pub fn new(front: Face, top: Face) -> eyre::Result<Self> {
        ensure!(front.is_adjacent(top), "{front} and {top} are not adjacent");
        Ok(Self {
            front,
            top,
            axes: axis_roles(front, top),
        })
    }

    pub fn front(&self) -> Face {
        self.front
    }

    pub fn top(&self) -> Face {
        self.top
    }

    pub fn apply_reorientation(&mut self, direction: Reorientation) {
        let (front, top) = lookup(self.front, direction, self.top)
            .expect("the table covers every orientation");
        self.front = front;
        self.top = top;
        self.axes = axis_roles(front, top);
    }

    /// The geometric axis currently playing `role`.
    pub fn axis(&self, role: AxisRole) -> Basis {
        self.axes[role]
    }

    /// Unit vector along the axis playing `role`, pointing out of `face`.
    pub fn resolve_axis(&self, role: AxisRole, face: Face) -> Vec3 {
        let axis = self.axes[role].unit();
        if face.is_positive() {
            axis
        } else {
            -axis
        }
    }

    /// The color currently at `layer`.
    pub fn face_at(&self, layer: Layer) -> Face {
        let right = Face::from_ray(
            self.top
                .ray()
                .cross(self.front.ray())
                .expect("front and top should be adjacent"),
        );
        match layer {
            Layer::Top => self.top,
            Layer::Bottom => self.top.opposite(),
            Layer::Front => self.front,
            Layer::Back => self.front.opposite(),
            Layer::Right => right,
            Layer::Left => right.opposite(),
        }
    }

    /// Where `face` currently sits.
    pub fn layer_of(&self, face: Face) -> Layer {
        enum_iter::<Layer>()
            .find(|&layer| self.face_at(layer) == face)
            .expect("every face has a layer")
    }

    /// Rotation taking the puzzle frame to the view frame, so the current
    /// right, top and front faces point along +X, +Y and +Z.
    pub fn view_rotation(&self) -> Mat3 {
        use cgmath::Matrix;

        Mat3::from_cols(
            self.face_at(Layer::Right).ray().to_vec(),
            self.top.ray().to_vec(),
            self.front.ray().to_vec(),
        )
        .transpose()
    }
}
