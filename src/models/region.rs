use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Side length of a region in blocks. One region file stores 32x32 chunks of 16 blocks.
pub const REGION_SIZE_BLOCKS: i32 = 512;

/// Errors raised while constructing regions or dimensions from raw input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("Invalid dimension id {0}, expected -1, 0 or 1")]
    InvalidDimensionId(i32),

    #[error("Unknown dimension name: {0}")]
    UnknownDimensionName(String),
}

/// One of the three parallel worlds a region can live in.
///
/// Serialized as its numeric id (`-1`, `0`, `1`), which is also the key used in
/// the `dimension_region_folder` config mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Dimension {
    /// The nether, id -1
    Lower,
    /// The overworld, id 0
    Overworld,
    /// The end, id 1
    Upper,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Lower, Dimension::Overworld, Dimension::Upper];

    pub fn id(self) -> i32 {
        match self {
            Dimension::Lower => -1,
            Dimension::Overworld => 0,
            Dimension::Upper => 1,
        }
    }

    pub fn from_id(id: i32) -> Result<Self, RegionError> {
        match id {
            -1 => Ok(Dimension::Lower),
            0 => Ok(Dimension::Overworld),
            1 => Ok(Dimension::Upper),
            other => Err(RegionError::InvalidDimensionId(other)),
        }
    }

    /// Namespaced identifier reported by the server, e.g. `minecraft:the_nether`
    pub fn resource_name(self) -> &'static str {
        match self {
            Dimension::Lower => "minecraft:the_nether",
            Dimension::Overworld => "minecraft:overworld",
            Dimension::Upper => "minecraft:the_end",
        }
    }

    /// Parse a namespaced dimension identifier. The `minecraft:` namespace is optional.
    pub fn from_resource_name(name: &str) -> Result<Self, RegionError> {
        let path = name.strip_prefix("minecraft:").unwrap_or(name);
        match path {
            "the_nether" => Ok(Dimension::Lower),
            "overworld" => Ok(Dimension::Overworld),
            "the_end" => Ok(Dimension::Upper),
            _ => Err(RegionError::UnknownDimensionName(name.to_string())),
        }
    }

    /// Key of this dimension in the folder mapping
    pub fn config_key(self) -> String {
        self.id().to_string()
    }
}

impl TryFrom<i32> for Dimension {
    type Error = RegionError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Dimension::from_id(id)
    }
}

impl From<Dimension> for i32 {
    fn from(dim: Dimension) -> Self {
        dim.id()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A 512x512 block cell of one dimension, stored on disk as `r.<x>.<z>.mca`.
///
/// Regions are values: equality and hashing cover all three fields, and there
/// are no setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    x: i32,
    z: i32,
    dim: Dimension,
}

impl Region {
    pub fn new(x: i32, z: i32, dim: Dimension) -> Self {
        Self { x, z, dim }
    }

    /// Region containing the given world position.
    ///
    /// Positions are floored to the containing block first, so `-0.5` lands in
    /// region `-1`, not `0`.
    pub fn from_position(x: f64, z: f64, dim: Dimension) -> Self {
        let block_x = x.floor() as i32;
        let block_z = z.floor() as i32;
        Self {
            x: block_x.div_euclid(REGION_SIZE_BLOCKS),
            z: block_z.div_euclid(REGION_SIZE_BLOCKS),
            dim,
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn dim(&self) -> Dimension {
        self.dim
    }

    /// File name of this region inside a region folder
    pub fn file_name(&self) -> String {
        format!("r.{}.{}.mca", self.x, self.z)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region[x={}, z={}, dim={}]", self.x, self.z, self.dim)
    }
}
