//! Agents living in the arena: bacteria (prey), phagocytes (predators) and
//! glucose particles (food).
//!
//! Behaviour is dispatched on concrete types. The [`Agent`] trait only
//! exposes the shared [`Body`] so collection-wide passes (dead removal,
//! population caps, sanity checks) can be written once.

pub mod bacteria;
pub mod body;
pub mod glucose;
pub mod phagocyte;

pub use bacteria::Bacteria;
pub use body::{Body, Bounds, Kinematics, MAX_ENERGY};
pub use glucose::Glucose;
pub use phagocyte::Phagocyte;

use serde::{Deserialize, Serialize};

/// Species tag carried by every agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Bacteria,
    Phagocyte,
    Glucose,
}

/// What an agent can take part in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub movable: bool,
    /// Can be seen by a hunter
    pub detectable: bool,
    pub reproducible: bool,
    /// Can be captured
    pub huntable: bool,
}

impl Species {
    pub fn prefix(self) -> &'static str {
        match self {
            Species::Bacteria => "bacteria",
            Species::Phagocyte => "phagocyte",
            Species::Glucose => "glucose",
        }
    }

    /// Genes a freshly generated genome carries.
    pub fn gene_names(self) -> &'static [&'static str] {
        match self {
            Species::Bacteria => &[
                "color_gene",
                "length_gene",
                "width_gene",
                "reproduction_rate",
                "metabolism",
            ],
            Species::Phagocyte => &[
                "sensitivity_gene",
                "speed_gene",
                "vision_gene",
                "aggression_gene",
                "endurance_gene",
            ],
            Species::Glucose => &[],
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            Species::Bacteria => Capabilities {
                movable: true,
                detectable: true,
                reproducible: true,
                huntable: true,
            },
            Species::Phagocyte => Capabilities {
                movable: true,
                detectable: false,
                reproducible: true,
                huntable: false,
            },
            Species::Glucose => Capabilities {
                movable: false,
                detectable: false,
                reproducible: false,
                huntable: false,
            },
        }
    }
}

/// Shared view over mobile agents
pub trait Agent {
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;

    /// Species the concrete type belongs to.
    fn expected_species() -> Species
    where
        Self: Sized;

    fn id(&self) -> &str {
        &self.body().id
    }

    fn species(&self) -> Species {
        self.body().species
    }

    fn capabilities(&self) -> Capabilities {
        self.species().capabilities()
    }

    #[inline]
    fn is_alive(&self) -> bool {
        self.body().is_alive()
    }

    fn fitness(&self) -> f32 {
        self.body().fitness
    }

    fn position(&self) -> (f32, f32) {
        (self.body().x, self.body().y)
    }
}

/// Monotonic id source, `"<species>_<n>"`
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering after the highest `prefix_n` suffix in `ids`.
    pub fn after_existing<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> Self {
        let next = ids
            .into_iter()
            .filter_map(|id| id.rsplit_once('_'))
            .filter_map(|(_, n)| n.parse::<u64>().ok())
            .max()
            .map_or(0, |n| n + 1);
        Self { next }
    }

    pub fn next_id(&mut self, species: Species) -> String {
        let id = format!("{}_{}", species.prefix(), self.next);
        self.next += 1;
        id
    }

    /// Ids handed out so far
    pub fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_across_species() {
        let mut ids = IdGenerator::new();
        let a = ids.next_id(Species::Bacteria);
        let b = ids.next_id(Species::Phagocyte);
        let c = ids.next_id(Species::Bacteria);
        assert_eq!(a, "bacteria_0");
        assert_eq!(b, "phagocyte_1");
        assert_eq!(c, "bacteria_2");
        assert_eq!(ids.issued(), 3);
    }

    #[test]
    fn test_ids_continue_after_existing() {
        let mut ids = IdGenerator::after_existing(["bacteria_7", "phagocyte_12", "glucose_x"]);
        assert_eq!(ids.next_id(Species::Glucose), "glucose_13");
        assert_eq!(IdGenerator::after_existing([]).issued(), 0);
    }

    #[test]
    fn test_capabilities() {
        assert!(Species::Bacteria.capabilities().huntable);
        assert!(!Species::Phagocyte.capabilities().huntable);
        assert!(!Species::Glucose.capabilities().movable);
    }
}
