use crate::models::{Dimension, Region};
use thiserror::Error;

/// Chat/console prefix of every plugin command
pub const PREFIX: &str = "!!region";

/// Which region a command refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionTarget {
    /// The region the issuing player stands in
    Player,
    Explicit(Region),
}

/// A parsed `!!region` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Add(RegionTarget),
    Del(RegionTarget),
    DelAll,
    Protect(RegionTarget),
    Deprotect(RegionTarget),
    DeprotectAll,
    List,
    ListProtect,
    History,
    Update,
    Reload,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("Invalid region coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Dimension {0} is out of range, expected -1, 0 or 1")]
    DimensionOutOfRange(i32),
}

impl Command {
    /// Parse the arguments that follow the prefix
    pub fn parse(args: &[&str]) -> Result<Self, CommandError> {
        let command = match args {
            [] => Command::Help,
            ["add"] => Command::Add(RegionTarget::Player),
            ["del"] => Command::Del(RegionTarget::Player),
            ["protect"] => Command::Protect(RegionTarget::Player),
            ["deprotect"] => Command::Deprotect(RegionTarget::Player),
            ["add", x, z, dim] => Command::Add(parse_target(x, z, dim)?),
            ["del", x, z, dim] => Command::Del(parse_target(x, z, dim)?),
            ["protect", x, z, dim] => Command::Protect(parse_target(x, z, dim)?),
            ["deprotect", x, z, dim] => Command::Deprotect(parse_target(x, z, dim)?),
            ["del-all"] => Command::DelAll,
            ["deprotect-all"] => Command::DeprotectAll,
            ["list"] => Command::List,
            ["list-protect"] => Command::ListProtect,
            ["history"] => Command::History,
            ["update"] => Command::Update,
            ["reload"] => Command::Reload,
            other => return Err(CommandError::UnknownArgument(other.join(" "))),
        };
        Ok(command)
    }

    /// Parse a whole input line. Returns `None` if the line is not a plugin command.
    pub fn parse_line(line: &str) -> Option<Result<Self, CommandError>> {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some(PREFIX) {
            return None;
        }
        let args: Vec<&str> = tokens.collect();
        Some(Self::parse(&args))
    }
}

fn parse_target(x: &str, z: &str, dim: &str) -> Result<RegionTarget, CommandError> {
    let parse_int = |raw: &str| {
        raw.parse::<i32>()
            .map_err(|_| CommandError::InvalidCoordinate(raw.to_string()))
    };

    let x = parse_int(x)?;
    let z = parse_int(z)?;
    let dim_id = parse_int(dim)?;
    let dim = Dimension::from_id(dim_id).map_err(|_| CommandError::DimensionOutOfRange(dim_id))?;

    Ok(RegionTarget::Explicit(Region::new(x, z, dim)))
}
