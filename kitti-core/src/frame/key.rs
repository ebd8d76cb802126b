use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

// Accepts any all-digit stem ("5", "05", "000005") whose value fits in `width` digits.
fn parse_padded(kind: &'static str, value: &str, width: u32) -> Result<u32> {
    let invalid = || FrameError::InvalidKey {
        kind,
        value: value.to_string(),
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let trimmed = value.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(0);
    }
    let parsed: u32 = trimmed.parse().map_err(|_| invalid())?;
    if parsed >= 10u32.pow(width) {
        return Err(invalid());
    }
    Ok(parsed)
}

/// One recording session, rendered as two zero-padded digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SceneId(u32);

impl SceneId {
    pub const WIDTH: u32 = 2;

    pub fn new(value: u32) -> Result<Self> {
        parse_padded("scene", &value.to_string(), Self::WIDTH).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl FromStr for SceneId {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        parse_padded("scene", s, Self::WIDTH).map(Self)
    }
}

impl TryFrom<String> for SceneId {
    type Error = FrameError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SceneId> for String {
    fn from(id: SceneId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// One capture instant within a scene, rendered as three zero-padded digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrameId(u32);

impl FrameId {
    pub const WIDTH: u32 = 3;

    pub fn new(value: u32) -> Result<Self> {
        parse_padded("frame", &value.to_string(), Self::WIDTH).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl FromStr for FrameId {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        parse_padded("frame", s, Self::WIDTH).map(Self)
    }
}

impl TryFrom<String> for FrameId {
    type Error = FrameError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FrameId> for String {
    fn from(id: FrameId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameKey {
    pub scene: SceneId,
    pub frame: FrameId,
}

impl FrameKey {
    pub fn new(scene: SceneId, frame: FrameId) -> Self {
        Self { scene, frame }
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scene, self.frame)
    }
}
