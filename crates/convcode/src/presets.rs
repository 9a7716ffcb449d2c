//! Named generator-polynomial sets for well-known convolutional codes, plus
//! a TOML file format for user-supplied presets.

use serde::Deserialize;

/// A named `(k, polynomials)` configuration, given high-bit-first as the
/// public API expects.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub k: u32,
    pub polys: &'static [u32],
}

pub const VOYAGER: Preset = Preset { name: "voyager", k: 7, polys: &[0o171, 0o133] };
pub const LTE: Preset = Preset { name: "lte", k: 7, polys: &[0o117, 0o127, 0o155] };
pub const CDMA2000: Preset =
    Preset { name: "cdma2000", k: 9, polys: &[0o671, 0o645, 0o473, 0o537] };
pub const CASSINI: Preset = Preset {
    name: "cassini",
    k: 15,
    polys: &[0o74000, 0o46321, 0o51271, 0o70535, 0o63667, 0o73277, 0o76513],
};

/// Three small k=3 rate-1/2 codes used as worked examples (see spec.md §8
/// S1/S2, S3, and the corpus's third small test vector).
pub const K3_5_7: Preset = Preset { name: "k3-5-7", k: 3, polys: &[5, 7] };
pub const K3_3_7: Preset = Preset { name: "k3-3-7", k: 3, polys: &[3, 7] };
pub const K3_5_3: Preset = Preset { name: "k3-5-3", k: 3, polys: &[5, 3] };

pub const ALL: &[Preset] = &[VOYAGER, LTE, CDMA2000, CASSINI, K3_5_7, K3_3_7, K3_5_3];

pub fn find(name: &str) -> Option<&'static Preset> {
    ALL.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// User-supplied preset file, loaded with `toml`/`serde` the way
/// `tetra-config` loads its stack configuration.
#[derive(Debug, Deserialize)]
pub struct PresetFile {
    #[serde(default)]
    pub presets: Vec<UserPreset>,
}

#[derive(Debug, Deserialize)]
pub struct UserPreset {
    pub name: String,
    pub k: u32,
    pub polys: Vec<u32>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default = "default_true")]
    pub do_tail: bool,
}

fn default_true() -> bool {
    true
}

impl PresetFile {
    pub fn parse_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
