//! # Reference Geochemical Patterns
//!
//! An immutable catalogue of element associations that PCA components are compared
//! against. Each pattern lists its elements in three tiers, from most to least diagnostic,
//! plus "anti" elements whose presence argues for a different process. Patterns that are
//! easily confused carry [`Discriminator`]s naming auxiliary elements that separate them
//! from a specific rival.
//!
//! Scoring reads the tiers generically, so a new signature is added by appending data to
//! [`REFERENCE_PATTERNS`]; no code changes are needed. Element symbols are stored in
//! canonical capitalization (`"Cu"`, `"Au"`, `"K"`).

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Host-rock elements whose co-loading with an ore association suggests a mixed signal.
pub const LITHOPHILE_ELEMENTS: [&str; 7] = ["Al", "Zr", "Ti", "Y", "Hf", "Nb", "Th"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternCategory {
    Mineralisation,
    Lithology,
    Alteration,
    Regolith,
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mineralisation => f.write_str("mineralisation"),
            Self::Lithology => f.write_str("lithology"),
            Self::Alteration => f.write_str("alteration"),
            Self::Regolith => f.write_str("regolith"),
        }
    }
}

/// Auxiliary evidence separating a pattern from one specific `rival`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Discriminator {
    pub rival: &'static str,
    /// Elements whose presence favours this pattern over the rival.
    pub favouring: &'static [&'static str],
    /// Elements whose presence favours the rival.
    pub opposing: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferencePattern {
    pub id: &'static str,
    pub name: &'static str,
    pub category: PatternCategory,
    pub description: &'static str,
    pub core_elements: &'static [&'static str],
    pub common_elements: &'static [&'static str],
    pub optional_elements: &'static [&'static str],
    pub anti_elements: &'static [&'static str],
    pub discriminators: &'static [Discriminator],
}

impl ReferencePattern {
    /// Core, common and optional elements in tier order.
    pub fn tier_elements(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.core_elements
            .iter()
            .chain(self.common_elements)
            .chain(self.optional_elements)
            .copied()
    }

    pub fn tier_len(&self) -> usize {
        self.core_elements.len() + self.common_elements.len() + self.optional_elements.len()
    }

    pub fn in_tiers(&self, symbol: &str) -> bool {
        self.tier_elements().any(|e| e == symbol)
    }
}

/// Normalizes an element symbol to `Xx` capitalization so `"CU"`, `"cu"` and `"Cu"`
/// compare equal.
pub fn canonical_symbol(symbol: &str) -> String {
    let trimmed = symbol.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub static REFERENCE_PATTERNS: &[ReferencePattern] = &[
    ReferencePattern {
        id: "vhms",
        name: "Volcanic-hosted massive sulphide",
        category: PatternCategory::Mineralisation,
        description: "Cu-Zn-Pb sulphides formed at or below the seafloor in volcanic sequences.",
        core_elements: &["Cu", "Zn", "Pb", "Fe", "S"],
        common_elements: &["Ag", "Au", "Ba", "As", "Sb"],
        optional_elements: &["Cd", "Co", "Mn", "Hg", "In"],
        anti_elements: &["Cr", "Ni", "Zr"],
        discriminators: &[Discriminator {
            rival: "sedex",
            favouring: &["Bi", "Se", "Sn", "In", "Te"],
            opposing: &["Tl", "Mn", "Hg"],
        }],
    },
    ReferencePattern {
        id: "sedex",
        name: "Sedimentary exhalative Zn-Pb",
        category: PatternCategory::Mineralisation,
        description: "Stratiform Zn-Pb-Ag in fine-grained clastic basins.",
        core_elements: &["Zn", "Pb", "Ag", "Fe", "S"],
        common_elements: &["Ba", "Mn", "Cd", "Tl"],
        optional_elements: &["Cu", "Hg", "Sb", "As"],
        anti_elements: &["Cr", "Ni", "Co"],
        discriminators: &[
            Discriminator {
                rival: "vhms",
                favouring: &["Tl", "Mn", "Hg"],
                opposing: &["Bi", "Se", "Sn", "In", "Te"],
            },
            Discriminator {
                rival: "mvt",
                favouring: &["Mn", "Tl", "Ba"],
                opposing: &["Ge", "F", "Mg"],
            },
        ],
    },
    ReferencePattern {
        id: "mvt",
        name: "Mississippi Valley-type Zn-Pb",
        category: PatternCategory::Mineralisation,
        description: "Carbonate-hosted Zn-Pb from basinal brines.",
        core_elements: &["Zn", "Pb", "S"],
        common_elements: &["Cd", "Ag", "Fe", "Ca", "Mg"],
        optional_elements: &["Ge", "Ga", "F", "Ba", "Cu"],
        anti_elements: &["Al", "Ti", "Zr", "K"],
        discriminators: &[Discriminator {
            rival: "sedex",
            favouring: &["Ge", "F", "Mg"],
            opposing: &["Mn", "Tl", "Ba"],
        }],
    },
    ReferencePattern {
        id: "porphyry_cu",
        name: "Porphyry Cu-Mo-Au",
        category: PatternCategory::Mineralisation,
        description: "Disseminated Cu-Mo-Au around porphyritic intrusions with potassic cores.",
        core_elements: &["Cu", "Mo", "Au", "S"],
        common_elements: &["Ag", "K", "Re", "Te"],
        optional_elements: &["Bi", "W", "Sn", "Se"],
        anti_elements: &["Cr", "Ni", "Co"],
        discriminators: &[Discriminator {
            rival: "iocg",
            favouring: &["Mo", "Re", "K"],
            opposing: &["Co", "U", "La", "Ce"],
        }],
    },
    ReferencePattern {
        id: "iocg",
        name: "Iron oxide copper-gold",
        category: PatternCategory::Mineralisation,
        description: "Magnetite or hematite breccias with Cu-Au and REE-U enrichment.",
        core_elements: &["Fe", "Cu", "Au"],
        common_elements: &["Co", "U", "La", "Ce", "Ag"],
        optional_elements: &["Mo", "Ba", "F", "P", "Bi"],
        anti_elements: &["Cr", "Zr"],
        discriminators: &[Discriminator {
            rival: "porphyry_cu",
            favouring: &["Co", "U", "La", "Ce"],
            opposing: &["Mo", "Re", "K"],
        }],
    },
    ReferencePattern {
        id: "orogenic_au",
        name: "Orogenic gold",
        category: PatternCategory::Mineralisation,
        description: "Quartz-carbonate vein gold in metamorphic terranes.",
        core_elements: &["Au", "As", "S"],
        common_elements: &["Sb", "W", "Bi", "Te"],
        optional_elements: &["Ag", "Mo", "B", "Pb"],
        anti_elements: &["Cu", "Zn", "Sn"],
        discriminators: &[Discriminator {
            rival: "epithermal_au",
            favouring: &["W", "Bi", "B", "Te"],
            opposing: &["Hg", "Tl", "Se"],
        }],
    },
    ReferencePattern {
        id: "epithermal_au",
        name: "Epithermal Au-Ag",
        category: PatternCategory::Mineralisation,
        description: "Shallow low- and high-sulphidation precious metal veins.",
        core_elements: &["Au", "Ag", "As", "Sb"],
        common_elements: &["Hg", "Tl", "Se", "Te"],
        optional_elements: &["Pb", "Zn", "Cu", "Ba", "Mn"],
        anti_elements: &["Cr", "Ni", "W"],
        discriminators: &[Discriminator {
            rival: "orogenic_au",
            favouring: &["Hg", "Tl", "Se"],
            opposing: &["W", "Bi", "B"],
        }],
    },
    ReferencePattern {
        id: "magmatic_ni",
        name: "Magmatic Ni-Cu-PGE sulphide",
        category: PatternCategory::Mineralisation,
        description: "Sulphide segregations in mafic and ultramafic intrusions.",
        core_elements: &["Ni", "Cu", "Co", "S"],
        common_elements: &["Pt", "Pd", "Fe", "Se"],
        optional_elements: &["Cr", "Mg", "Te", "Au"],
        anti_elements: &["Zr", "Hf", "Nb", "Th", "K", "Rb"],
        discriminators: &[Discriminator {
            rival: "ultramafic",
            favouring: &["Cu", "Pt", "Pd", "Se", "S"],
            opposing: &[],
        }],
    },
    ReferencePattern {
        id: "sn_w_greisen",
        name: "Granite-related Sn-W",
        category: PatternCategory::Mineralisation,
        description: "Greisen and vein Sn-W around fractionated granites.",
        core_elements: &["Sn", "W", "F"],
        common_elements: &["Li", "Rb", "Cs", "Be", "Bi"],
        optional_elements: &["Mo", "Nb", "Ta", "As"],
        anti_elements: &["Cr", "Ni", "Mg"],
        discriminators: &[],
    },
    ReferencePattern {
        id: "uranium",
        name: "Uranium",
        category: PatternCategory::Mineralisation,
        description: "Redox-front or unconformity-related uranium enrichment.",
        core_elements: &["U", "V", "Mo"],
        common_elements: &["Se", "As", "Pb"],
        optional_elements: &["Cu", "Ni", "Co", "Zn"],
        anti_elements: &["Th", "Zr"],
        discriminators: &[],
    },
    ReferencePattern {
        id: "mafic",
        name: "Mafic igneous",
        category: PatternCategory::Lithology,
        description: "Basalt, dolerite and gabbro host rocks.",
        core_elements: &["Fe", "Mg", "Ti", "V"],
        common_elements: &["Sc", "Ca", "Cu", "Co", "Mn"],
        optional_elements: &["Cr", "Ni", "Zn"],
        anti_elements: &["K", "Rb", "Th", "U", "Zr"],
        discriminators: &[Discriminator {
            rival: "ultramafic",
            favouring: &["Ti", "V", "Sc", "Ca", "Al"],
            opposing: &["Cr", "Ni"],
        }],
    },
    ReferencePattern {
        id: "ultramafic",
        name: "Ultramafic igneous",
        category: PatternCategory::Lithology,
        description: "Peridotite, komatiite and serpentinite host rocks.",
        core_elements: &["Mg", "Cr", "Ni", "Co"],
        common_elements: &["Fe", "Mn"],
        optional_elements: &["Pt", "Pd", "Cu"],
        anti_elements: &["K", "Rb", "Th", "Zr", "Al", "Na"],
        discriminators: &[
            Discriminator {
                rival: "mafic",
                favouring: &["Cr", "Ni"],
                opposing: &["Ti", "Al", "Ca"],
            },
            Discriminator {
                rival: "magmatic_ni",
                favouring: &["Cr", "Mg"],
                opposing: &["Cu", "Se", "S"],
            },
        ],
    },
    ReferencePattern {
        id: "felsic",
        name: "Felsic igneous",
        category: PatternCategory::Lithology,
        description: "Granite, rhyolite and evolved volcanic rocks.",
        core_elements: &["K", "Rb", "Th", "U"],
        common_elements: &["Zr", "Hf", "Nb", "Y", "La", "Ce"],
        optional_elements: &["Na", "Al", "Ba"],
        anti_elements: &["Mg", "Cr", "Ni", "Co"],
        discriminators: &[Discriminator {
            rival: "potassic",
            favouring: &["Zr", "Hf", "Nb", "Y"],
            opposing: &["Cu", "Mo"],
        }],
    },
    ReferencePattern {
        id: "carbonate",
        name: "Carbonate sediment",
        category: PatternCategory::Lithology,
        description: "Limestone, dolomite and marl.",
        core_elements: &["Ca", "Mg", "Sr"],
        common_elements: &["Mn"],
        optional_elements: &["Ba", "Fe"],
        anti_elements: &["Al", "Ti", "Zr", "K"],
        discriminators: &[],
    },
    ReferencePattern {
        id: "black_shale",
        name: "Black shale",
        category: PatternCategory::Lithology,
        description: "Organic-rich mudstone with redox-sensitive metal enrichment.",
        core_elements: &["Mo", "V", "U", "Ni"],
        common_elements: &["Cu", "Zn", "Se", "Cd"],
        optional_elements: &["Ag", "As", "Sb", "Tl"],
        anti_elements: &["Ca", "Sr"],
        discriminators: &[],
    },
    ReferencePattern {
        id: "resistate",
        name: "Resistate heavy minerals",
        category: PatternCategory::Lithology,
        description: "Zircon, rutile and monazite concentrated in clastic sediments.",
        core_elements: &["Zr", "Hf", "Ti"],
        common_elements: &["Nb", "Th", "Y"],
        optional_elements: &["La", "Ce", "Cr", "Sn"],
        anti_elements: &["Ca", "Na", "Mg"],
        discriminators: &[],
    },
    ReferencePattern {
        id: "potassic",
        name: "Potassic alteration",
        category: PatternCategory::Alteration,
        description: "K-feldspar and biotite alteration in the core of intrusive systems.",
        core_elements: &["K", "Rb", "Ba"],
        common_elements: &["Cs", "Tl"],
        optional_elements: &["Cu", "Mo"],
        anti_elements: &["Na", "Ca", "Sr"],
        discriminators: &[Discriminator {
            rival: "felsic",
            favouring: &["Cu", "Mo", "Tl"],
            opposing: &["Zr", "Hf", "Nb"],
        }],
    },
    ReferencePattern {
        id: "sodic",
        name: "Sodic alteration",
        category: PatternCategory::Alteration,
        description: "Albitisation and sodic-calcic alteration.",
        core_elements: &["Na", "Sr"],
        common_elements: &["Ca"],
        optional_elements: &["Fe", "V"],
        anti_elements: &["K", "Rb", "Ba"],
        discriminators: &[],
    },
    ReferencePattern {
        id: "silica_sericite",
        name: "Phyllic alteration",
        category: PatternCategory::Alteration,
        description: "Quartz-sericite-pyrite alteration with alkali leaching.",
        core_elements: &["K", "S", "Fe"],
        common_elements: &["Rb", "Cs", "As"],
        optional_elements: &["Cu", "Mo", "Tl"],
        anti_elements: &["Na", "Ca", "Sr", "Mg"],
        discriminators: &[],
    },
    ReferencePattern {
        id: "laterite",
        name: "Lateritic regolith",
        category: PatternCategory::Regolith,
        description: "Residual Fe-Al enrichment in deeply weathered profiles.",
        core_elements: &["Fe", "Al", "Cr"],
        common_elements: &["V", "Ga", "Sc", "Ti"],
        optional_elements: &["Zr", "Th", "Nb"],
        anti_elements: &["Na", "Ca", "Mg", "K", "Sr"],
        discriminators: &[],
    },
    ReferencePattern {
        id: "ferruginous",
        name: "Ferruginous scavenging",
        category: PatternCategory::Regolith,
        description: "Fe-Mn oxide coatings that scavenge base and trace metals.",
        core_elements: &["Fe", "Mn"],
        common_elements: &["Co", "Ni", "Zn", "As"],
        optional_elements: &["Ba", "Ce", "Pb", "Cu"],
        anti_elements: &["Zr", "Hf"],
        discriminators: &[],
    },
];

pub static PATTERN_BY_ID: LazyLock<AHashMap<&'static str, &'static ReferencePattern>> =
    LazyLock::new(|| REFERENCE_PATTERNS.iter().map(|p| (p.id, p)).collect());

pub fn pattern_by_id(id: &str) -> Option<&'static ReferencePattern> {
    PATTERN_BY_ID.get(id).copied()
}
