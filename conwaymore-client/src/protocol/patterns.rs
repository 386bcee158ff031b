//! Built-in Life patterns that can be dropped onto the board.
//!
//! Each pattern is drawn as rows of `|...|`, with `x` marking a live cell.
//! Offsets are relative to the top-left corner; placing a pattern centres it
//! on the target cell.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    Acorn,
    BiGun,
    BlinkerPuffer,
    Glider,
    GosperGliderGun,
    LightWeightSpaceship,
    MiddleWeightSpaceship,
    HeavyWeightSpaceship,
    NoahsArk,
    PiHeptomino,
    RPentomino,
    SwitchEngine,
}

impl PatternKind {
    pub const ALL: [PatternKind; 12] = [
        Self::Acorn,
        Self::BiGun,
        Self::BlinkerPuffer,
        Self::Glider,
        Self::GosperGliderGun,
        Self::LightWeightSpaceship,
        Self::MiddleWeightSpaceship,
        Self::HeavyWeightSpaceship,
        Self::NoahsArk,
        Self::PiHeptomino,
        Self::RPentomino,
        Self::SwitchEngine,
    ];

    /// Identifier used on the worker boundary.
    pub fn id(self) -> &'static str {
        match self {
            Self::Acorn => "acorn",
            Self::BiGun => "bi-gun",
            Self::BlinkerPuffer => "blinker-puffer",
            Self::Glider => "glider",
            Self::GosperGliderGun => "gosper-glider-gun",
            Self::LightWeightSpaceship => "light-weight-spaceship",
            Self::MiddleWeightSpaceship => "middle-weight-spaceship",
            Self::HeavyWeightSpaceship => "heavy-weight-spaceship",
            Self::NoahsArk => "noahs-ark",
            Self::PiHeptomino => "pi-heptomino",
            Self::RPentomino => "r-pentomino",
            Self::SwitchEngine => "switch-engine",
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Acorn => "Acorn",
            Self::BiGun => "Bi-Gun",
            Self::BlinkerPuffer => "Blinker Puffer",
            Self::Glider => "Glider",
            Self::GosperGliderGun => "Gosper Glider Gun",
            Self::LightWeightSpaceship => "Light Weight Spaceship",
            Self::MiddleWeightSpaceship => "Middle Weight Spaceship",
            Self::HeavyWeightSpaceship => "Heavy Weight Spaceship",
            Self::NoahsArk => "Noah's Ark",
            Self::PiHeptomino => "pi-Heptomino",
            Self::RPentomino => "r-Pentomino",
            Self::SwitchEngine => "Switch Engine",
        }
    }

    /// The parsed pattern.
    pub fn pattern(self) -> &'static Pattern {
        static CATALOGUE: OnceLock<HashMap<PatternKind, Pattern>> = OnceLock::new();
        let catalogue = CATALOGUE.get_or_init(|| {
            PatternKind::ALL
                .iter()
                .map(|&kind| (kind, Pattern::parse(art(kind))))
                .collect()
        });
        &catalogue[&self]
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PatternKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| WorkerError::UnknownPattern(s.to_owned()))
    }
}

/// Live-cell offsets of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub cells: Vec<(u16, u16)>,
    pub width: u16,
    pub height: u16,
}

impl Pattern {
    /// Parse `|...|` rows. Text outside the pipes is ignored.
    pub fn parse(art: &str) -> Self {
        let mut cells = Vec::new();
        let mut width = 0u16;
        let mut height = 0u16;

        for line in art.lines() {
            let Some(start) = line.find('|') else {
                continue;
            };
            let Some(len) = line[start + 1..].find('|') else {
                continue;
            };
            let row = &line[start + 1..start + 1 + len];
            let y = height;
            height += 1;
            width = width.max(row.chars().count() as u16);

            for (x, c) in row.chars().enumerate() {
                if c == 'x' {
                    cells.push((x as u16, y));
                }
            }
        }

        Self {
            cells,
            width,
            height,
        }
    }

    /// Offset of the cell that lands on the drop target.
    pub fn centre(&self) -> (u16, u16) {
        (self.width / 2, self.height / 2)
    }
}

fn art(kind: PatternKind) -> &'static str {
    match kind {
        PatternKind::Acorn => {
            "
            | x     |
            |   x   |
            |xx  xxx|
            "
        }
        PatternKind::BiGun => {
            "
            |           x                                      |
            |          xx                                      |
            |         xx                                       |
            |          xx  xx                                  |
            |                                      x           |
            |                                      xx        xx|
            |                                       xx       xx|
            |          xx  xx                  xx  xx          |
            |xx       xx                                       |
            |xx        xx                                      |
            |           x                                      |
            |                                  xx  xx          |
            |                                       xx         |
            |                                      xx          |
            |                                      x           |
            "
        }
        PatternKind::BlinkerPuffer => {
            "
            |   x     |
            | x   x   |
            |x        |
            |x    x   |
            |xxxxx    |
            |         |
            |         |
            |         |
            | xx      |
            |xx xxx   |
            | xxxx    |
            |  xx     |
            |         |
            |     xx  |
            |   x    x|
            |  x      |
            |  x     x|
            |  xxxxxx |
            "
        }
        PatternKind::Glider => {
            "
            |  x|
            |x x|
            | xx|
            "
        }
        PatternKind::GosperGliderGun => {
            "
            |                        x           |
            |                      x x           |
            |            xx      xx            xx|
            |           x   x    xx            xx|
            |xx        x     x   xx              |
            |xx        x   x xx    x x           |
            |          x     x       x           |
            |           x   x                    |
            |            xx                      |
            "
        }
        PatternKind::LightWeightSpaceship => {
            "
            | xxxx|
            |x   x|
            |    x|
            |x  x |
            "
        }
        PatternKind::MiddleWeightSpaceship => {
            "
            |  x   |
            |x   x |
            |     x|
            |x    x|
            | xxxxx|
            "
        }
        PatternKind::HeavyWeightSpaceship => {
            "
            |  xx   |
            |x    x |
            |      x|
            |x     x|
            | xxxxxx|
            "
        }
        PatternKind::NoahsArk => {
            "
            |          x x  |
            |         x     |
            |          x  x |
            |            xxx|
            |               |
            |               |
            |               |
            |               |
            |               |
            | x             |
            |x x            |
            |               |
            |x  x           |
            |  xx           |
            |   x           |
            "
        }
        PatternKind::PiHeptomino => {
            "
            |xxx|
            |x x|
            |x x|
            "
        }
        PatternKind::RPentomino => {
            "
            | xx|
            |xx |
            | x |
            "
        }
        PatternKind::SwitchEngine => {
            "
            | x x  |
            |x     |
            | x  x |
            |   xxx|
            "
        }
    }
}
