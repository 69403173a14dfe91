use crate::puzzle::cube::Face;
use enum_map::enum_map;
use enum_map::EnumMap;
use eyre::{ensure, WrapErr};
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;

pub const PREFS_PATH: &'static str = "./preferences.json";

/// Linear RGB, each channel in `0.0..=1.0`.
pub type Color = [f32; 3];

fn color_cube_default() -> EnumMap<Face, Color> {
    enum_map! {
        Face::White => [1.0, 1.0, 1.0],
        Face::Orange => [1.0, 0.3, 0.0],
        Face::Blue => [0.0, 0.0, 1.0],
        Face::Red => [1.0, 0.0, 0.0],
        Face::Green => [0.0, 1.0, 0.0],
        Face::Yellow => [1.0, 1.0, 0.0],
    }
}

fn turn_speed_default() -> f32 {
    // a quarter turn in 200 ms
    0.45
}

fn spacing_default() -> f32 {
    2.1
}

fn epsilon_default() -> f32 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationPreferences {
    /// Degrees per millisecond.
    #[serde(default = "turn_speed_default")]
    pub turn_speed: f32,
}

impl Default for AnimationPreferences {
    fn default() -> Self {
        Self {
            turn_speed: turn_speed_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryPreferences {
    /// Distance between neighboring piece centers.
    #[serde(default = "spacing_default")]
    pub spacing: f32,
    /// Tolerance when matching coordinates that drift under rotation.
    #[serde(default = "epsilon_default")]
    pub epsilon: f32,
}

impl Default for GeometryPreferences {
    fn default() -> Self {
        Self {
            spacing: spacing_default(),
            epsilon: epsilon_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub animation: AnimationPreferences,
    #[serde(default)]
    pub geometry: GeometryPreferences,
    #[serde(default = "color_cube_default")]
    pub colors: EnumMap<Face, Color>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            animation: Default::default(),
            geometry: Default::default(),
            colors: color_cube_default(),
        }
    }
}

impl Preferences {
    pub fn save(&self) -> eyre::Result<()> {
        self.save_to(PREFS_PATH)
    }

    pub fn load() -> eyre::Result<Self> {
        Self::load_from(PREFS_PATH)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .wrap_err_with(|| format!("writing preferences to {}", path.display()))?;
        Ok(())
    }

    /// Reads preferences from `path`, falling back to the defaults when the
    /// file does not exist.
    pub fn load_from(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file;
        if path.exists() {
            file = std::fs::File::open(path)
                .wrap_err_with(|| format!("opening {}", path.display()))?;
        } else {
            return Ok(Default::default());
        }
        let reader = std::io::BufReader::new(file);
        let prefs: Self = serde_json::from_reader(reader)
            .wrap_err_with(|| format!("parsing {}", path.display()))?;
        prefs.validate()?;
        Ok(prefs)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let speed = self.animation.turn_speed;
        ensure!(
            speed.is_finite() && speed > 0.0,
            "turn speed must be positive, got {speed}",
        );
        let GeometryPreferences { spacing, epsilon } = self.geometry;
        ensure!(
            spacing.is_finite() && spacing > 0.0,
            "spacing must be positive, got {spacing}",
        );
        ensure!(
            epsilon > 0.0 && epsilon < spacing / 2.0,
            "epsilon must lie strictly between 0 and half the spacing, got {epsilon}",
        );
        for (face, color) in &self.colors {
            ensure!(
                color.iter().all(|c| (0.0..=1.0).contains(c)),
                "{face} color {color:?} is out of range",
            );
        }
        Ok(())
    }
}
