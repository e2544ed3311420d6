//! crates/ccs_core/src/domain.rs
//! Habitat domains with explicit wire tokens.
//!
//! Closed domains (seasons, species, management categories, habitat types,
//! effort levels, attribute columns) reject unknown tokens. Meadow and conifer
//! classes are open: tokens outside the known set are kept verbatim as `Other`.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::CoreError;

/// Define a closed enum with explicit wire tokens, `ALL`, `as_str`, `Display`, `FromStr`.
macro_rules! token_enum {
    ($(#[$m:meta])* $name:ident ($kind:literal) { $($variant:ident = $token:literal),+ $(,)? }) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum $name {
            $(
                #[cfg_attr(feature = "serde", serde(rename = $token))]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[inline]
            pub const fn as_str(self) -> &'static str {
                match self { $($name::$variant => $token),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($token => Ok($name::$variant),)+
                    other => Err(CoreError::UnknownToken { kind: $kind, token: other.to_owned() }),
                }
            }
        }
    };
}

/// Define an open enum: known tokens map to variants, anything else is `Other(String)`.
macro_rules! open_enum {
    ($(#[$m:meta])* $name:ident { $($variant:ident = $token:literal),+ $(,)? }) => {
        $(#[$m])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $token,)+
                    $name::Other(s) => s.as_str(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $($token => $name::$variant,)+
                    other => $name::Other(other.to_owned()),
                }
            }
        }

        #[cfg(feature = "serde")]
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(self.as_str())
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                Ok($name::from(s.as_str()))
            }
        }
    };
}

token_enum!(
    /// Independent habitat-function evaluation periods.
    Season("season") {
        Breed = "breed",
        Summer = "summer",
        Winter = "winter",
    }
);

token_enum!(
    /// Sagebrush species present on the map unit; gates the winter curves.
    SageSpecies("sage species") {
        Big = "Big Sagebrush",
        LowOrBlack = "Low or Black Sagebrush",
        None = "None",
    }
);

token_enum!(
    /// Management categories carrying a policy credit multiplier.
    MgmtCategory("management category") {
        Phma = "PHMA",
        Ghma = "GHMA",
        Ohma = "OHMA",
    }
);

token_enum!(
    /// Season with the largest credit value, or `None` when credits are zero.
    HabitatType("habitat type") {
        Breeding = "Breeding",
        LateBroodRearing = "Late Brood-Rearing",
        Winter = "Winter",
        None = "None",
    }
);

token_enum!(
    /// Scenario effort level.
    Effort("effort") {
        Low = "low",
        Med = "med",
        High = "high",
    }
);

token_enum!(
    /// Site-scale attribute columns.
    Attribute("attribute") {
        SageCover = "sage_cover",
        SageHeight = "sage_height",
        ShrubCover = "shrub_cover",
        ForbCover = "forb_cover",
        ForbRich = "forb_rich",
        GrassCover = "grass_cover",
        BrotecCover = "brotec_cover",
        DistSage = "dist_sage",
    }
);

open_enum!(
    /// Meadow classification of a map unit.
    Meadow {
        NoMeadow = "No Meadow",
        Altered = "Altered",
        Unaltered = "Unaltered",
    }
);

open_enum!(
    /// Conifer encroachment phase.
    ConiferPhase {
        None = "None",
        PhaseI = "Phase I",
        PhaseII = "Phase II",
        PhaseIII = "Phase III",
    }
);

impl Season {
    /// Habitat type reported when this season carries the maximal credit.
    pub const fn habitat_type(self) -> HabitatType {
        match self {
            Season::Breed => HabitatType::Breeding,
            Season::Summer => HabitatType::LateBroodRearing,
            Season::Winter => HabitatType::Winter,
        }
    }
}

impl Attribute {
    /// Attributes a projection or scenario may override, in projection order.
    pub const PROJECTABLE: &'static [Attribute] = &[
        Attribute::SageCover,
        Attribute::SageHeight,
        Attribute::ShrubCover,
        Attribute::ForbCover,
        Attribute::ForbRich,
        Attribute::GrassCover,
        Attribute::BrotecCover,
    ];

    /// Fractional cover in [0,1]; scaled ×100 before curve lookup.
    pub const fn is_cover(self) -> bool {
        matches!(
            self,
            Attribute::SageCover
                | Attribute::ShrubCover
                | Attribute::ForbCover
                | Attribute::GrassCover
                | Attribute::BrotecCover
        )
    }

    /// First projectable attribute whose name is a suffix of `column`
    /// (e.g. `b_forb_cover` → `forb_cover`).
    pub fn projectable_suffix_of(column: &str) -> Option<Attribute> {
        Attribute::PROJECTABLE
            .iter()
            .copied()
            .find(|a| column.ends_with(a.as_str()))
    }
}

impl Meadow {
    /// Any class other than "No Meadow" counts as meadow.
    #[inline]
    pub fn is_meadow(&self) -> bool {
        !matches!(self, Meadow::NoMeadow)
    }
}

impl ConiferPhase {
    #[inline]
    pub fn is_phase_iii(&self) -> bool {
        matches!(self, ConiferPhase::PhaseIII)
    }
}

impl Default for ConiferPhase {
    fn default() -> Self {
        ConiferPhase::None
    }
}
