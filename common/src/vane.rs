use serde::{Deserialize, Serialize};

use crate::error::ArbiterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VanePosition {
    Auto,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    Swing,
}

impl VanePosition {
    pub const ALL: [VanePosition; 7] = [
        Self::Auto,
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Swing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Swing => "Swing",
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Auto => 0x00,
            Self::One => 0x01,
            Self::Two => 0x02,
            Self::Three => 0x03,
            Self::Four => 0x04,
            Self::Five => 0x05,
            Self::Swing => 0x07,
        }
    }

    pub fn from_label(label: &str) -> Result<Self, ArbiterError> {
        Self::ALL
            .into_iter()
            .find(|position| position.as_str() == label)
            .ok_or_else(|| ArbiterError::UnknownOption {
                select: "vane position",
                label: label.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalVanePosition {
    Auto,
    #[serde(rename = "<<")]
    LeftFull,
    #[serde(rename = "<")]
    Left,
    #[serde(rename = "|")]
    Center,
    #[serde(rename = ">")]
    Right,
    #[serde(rename = ">>")]
    RightFull,
    #[serde(rename = "<>")]
    Split,
    Swing,
}

impl HorizontalVanePosition {
    pub const ALL: [HorizontalVanePosition; 8] = [
        Self::Auto,
        Self::LeftFull,
        Self::Left,
        Self::Center,
        Self::Right,
        Self::RightFull,
        Self::Split,
        Self::Swing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::LeftFull => "<<",
            Self::Left => "<",
            Self::Center => "|",
            Self::Right => ">",
            Self::RightFull => ">>",
            Self::Split => "<>",
            Self::Swing => "Swing",
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Auto => 0x00,
            Self::LeftFull => 0x01,
            Self::Left => 0x02,
            Self::Center => 0x03,
            Self::Right => 0x04,
            Self::RightFull => 0x05,
            Self::Split => 0x08,
            Self::Swing => 0x0C,
        }
    }

    pub fn from_label(label: &str) -> Result<Self, ArbiterError> {
        Self::ALL
            .into_iter()
            .find(|position| position.as_str() == label)
            .ok_or_else(|| ArbiterError::UnknownOption {
                select: "horizontal vane position",
                label: label.to_string(),
            })
    }
}
