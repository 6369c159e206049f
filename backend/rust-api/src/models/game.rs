use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Arithmetic practice category. Each mode owns its batch size and the
/// value ranges its questions are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Addition,
    Subtraction,
    Multiplication,
    Squares,
    Cubes,
}

impl GameMode {
    pub const ALL: [GameMode; 5] = [
        GameMode::Addition,
        GameMode::Subtraction,
        GameMode::Multiplication,
        GameMode::Squares,
        GameMode::Cubes,
    ];

    pub fn batch_size(self) -> usize {
        match self {
            GameMode::Addition => 25,
            GameMode::Subtraction => 25,
            GameMode::Multiplication => 50,
            GameMode::Squares => 30,
            GameMode::Cubes => 15,
        }
    }

    /// Number of distinct prompts the mode can render.
    pub fn prompt_space(self) -> usize {
        match self {
            GameMode::Addition => 90 * 90,
            // a in 20..=99 pairs with b in 10..=a-10
            GameMode::Subtraction => (20..=99).map(|a: usize| a - 19).sum(),
            GameMode::Multiplication => 19 * 20,
            GameMode::Squares => 30,
            GameMode::Cubes => 15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Addition => "addition",
            GameMode::Subtraction => "subtraction",
            GameMode::Multiplication => "multiplication",
            GameMode::Squares => "squares",
            GameMode::Cubes => "cubes",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GameMode::Addition => "Addition",
            GameMode::Subtraction => "Subtraction",
            GameMode::Multiplication => "Multiplication",
            GameMode::Squares => "Squares",
            GameMode::Cubes => "Cubes",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        GameMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| format!("Unknown game mode: {}", value))
    }
}

/// How answers are collected during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    #[default]
    MultipleChoice,
    Direct,
}
