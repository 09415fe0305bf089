//! Closed vocabularies for structural, zone and utility cells.
//!
//! Each kind serializes as its snake_case name and parses from that name or
//! from the legacy camelCase / abbreviated spellings still found in older
//! site files.

use serde::{Deserialize, Serialize};
use siteplan_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

macro_rules! kind_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical snake_case name.
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim() {
                    $($text $(| $alias)* => Ok($name::$variant),)+
                    other => Err(Error::UnknownKind {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(kind: $name) -> Self {
                kind.name()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

kind_enum! {
    /// Structural cell classification. Structural cells are never auto-placed.
    StructureKind, "structure kind" {
        /// Blocks both placement and movement.
        Wall => "wall",
        Loading => "loading",
        Exit => "exit" | "ex",
        Entrance => "entrance" | "ent",
        ExitEntrance => "exit_entrance" | "ex_ent",
    }
}

kind_enum! {
    /// Environmental zone an entity may be constrained to.
    ZoneKind, "zone kind" {
        HighTemp => "high_temp" | "highTemp",
        LowTemp => "low_temp" | "lowTemp",
        HighHumidity => "high_humidity" | "highHumidity",
        LowHumidity => "low_humidity" | "lowHumidity",
    }
}

kind_enum! {
    /// Utility supply an entity may depend on.
    UtilityKind, "utility kind" {
        Gas => "gas",
        Electric => "electric",
        Water => "water",
        Air => "air",
        Earth => "earth",
        Network => "network",
        Security => "security",
    }
}

impl ZoneKind {
    /// Bit used in the grid's per-cell zone mask.
    pub(crate) fn bit(self) -> u8 {
        1 << (self as u8)
    }
}
