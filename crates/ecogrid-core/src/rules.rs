//! Per-cell rule evaluation.
//!
//! [`evaluate`] is a pure decision function: it looks at one cell and a
//! classified snapshot of its neighbors and returns exactly one
//! [`Intent`]. It never touches the grid. [`resolve`] then turns an
//! accepted intent into the concrete cell values to write.
//!
//! Rules are checked in a fixed priority order per kind and the first one
//! that holds wins:
//!
//! | Kind | 1 | 2 | 3 | 4 | 5 |
//! |------|---|---|---|---|---|
//! | Plant | die at max age | spread into empty | age | | |
//! | Herbivore | die at max age or zero energy | reproduce | eat plant | move | age |
//! | Carnivore | die at max age or zero energy | reproduce | eat herbivore | move | age |
//!
//! Each probabilistic rule draws before checking its candidates, and a
//! target is picked only once the rule fires, so the number of draws per
//! cell is fully determined by the rule path taken.

use ecogrid_types::{Animal, Cell, CellKind, Intent, Position};

use crate::config::RuleConfig;
use crate::random::{self, RandomnessSource};

/// A cell's usable neighbors, partitioned by what occupies them.
///
/// Claimed destinations and the cell itself are excluded before
/// classification, so every listed position is still up for grabs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighborhood {
    /// Empty neighbors.
    pub empty: Vec<Position>,
    /// Plant neighbors.
    pub plants: Vec<Position>,
    /// Herbivore neighbors.
    pub herbivores: Vec<Position>,
}

impl Neighborhood {
    /// Classify neighbors by kind. Carnivore neighbors are never targets
    /// and are dropped.
    pub fn classify(neighbors: impl IntoIterator<Item = (Position, Cell)>) -> Self {
        let mut hood = Self::default();
        for (pos, cell) in neighbors {
            match cell.kind() {
                CellKind::Empty => hood.empty.push(pos),
                CellKind::Plant => hood.plants.push(pos),
                CellKind::Herbivore => hood.herbivores.push(pos),
                CellKind::Carnivore => {}
            }
        }
        hood
    }

    /// Prey candidates for an animal of the given kind.
    fn prey(&self, hunter: CellKind) -> &[Position] {
        match hunter {
            CellKind::Herbivore => &self.plants,
            CellKind::Carnivore => &self.herbivores,
            CellKind::Empty | CellKind::Plant => &[],
        }
    }
}

/// Species-specific thresholds for the animal rule chain.
struct AnimalRules {
    max_age: u32,
    reproduction_probability: f64,
    eat_probability: f64,
    move_probability: f64,
}

impl AnimalRules {
    const fn for_kind(kind: CellKind, rules: &RuleConfig) -> Option<Self> {
        match kind {
            CellKind::Herbivore => Some(Self {
                max_age: rules.herbivore_max_age,
                reproduction_probability: rules.herbivore_reproduction_probability,
                eat_probability: rules.herbivore_eat_probability,
                move_probability: rules.herbivore_move_probability,
            }),
            CellKind::Carnivore => Some(Self {
                max_age: rules.carnivore_max_age,
                reproduction_probability: rules.carnivore_reproduction_probability,
                eat_probability: rules.carnivore_eat_probability,
                move_probability: rules.carnivore_move_probability,
            }),
            CellKind::Empty | CellKind::Plant => None,
        }
    }
}

/// Decide what `cell` does this tick.
///
/// Empty cells always yield [`Intent::Age`], which [`resolve`] leaves as a
/// no-op.
pub fn evaluate<R: RandomnessSource + ?Sized>(
    cell: &Cell,
    hood: &Neighborhood,
    rules: &RuleConfig,
    rng: &mut R,
) -> Intent {
    match cell {
        Cell::Empty => Intent::Age,
        Cell::Plant { age } => evaluate_plant(*age, hood, rules, rng),
        Cell::Herbivore(animal) | Cell::Carnivore(animal) => {
            AnimalRules::for_kind(cell.kind(), rules).map_or(Intent::Age, |species| {
                evaluate_animal(cell.kind(), *animal, &species, hood, rules, rng)
            })
        }
    }
}

fn evaluate_plant<R: RandomnessSource + ?Sized>(
    age: u32,
    hood: &Neighborhood,
    rules: &RuleConfig,
    rng: &mut R,
) -> Intent {
    if age >= rules.plant_max_age {
        return Intent::Die;
    }
    if rng.chance(rules.plant_reproduction_probability) {
        if let Some(target) = random::pick(rng, &hood.empty) {
            return Intent::Reproduce { target };
        }
    }
    Intent::Age
}

fn evaluate_animal<R: RandomnessSource + ?Sized>(
    kind: CellKind,
    animal: Animal,
    species: &AnimalRules,
    hood: &Neighborhood,
    rules: &RuleConfig,
    rng: &mut R,
) -> Intent {
    if animal.age >= species.max_age || animal.energy == 0 {
        return Intent::Die;
    }

    if rng.chance(species.reproduction_probability)
        && animal.energy > rules.reproduction_energy_threshold
    {
        if let Some(target) = random::pick(rng, &hood.empty) {
            return Intent::Reproduce { target };
        }
    }

    if rng.chance(species.eat_probability) {
        if let Some(target) = random::pick(rng, hood.prey(kind)) {
            return Intent::Eat { target };
        }
    }

    if rng.chance(species.move_probability) {
        if let Some(target) = random::pick(rng, &hood.empty) {
            return Intent::Move { target };
        }
    }

    Intent::Age
}

/// The cell values an accepted intent writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// New contents of the source cell.
    pub source: Cell,
    /// Immediate write to the destination cell (moves and meals).
    pub target: Option<(Position, Cell)>,
    /// Deferred write materialized after the tick barrier (births).
    pub birth: Option<(Position, Cell)>,
}

impl Transition {
    const fn stay(source: Cell) -> Self {
        Self {
            source,
            target: None,
            birth: None,
        }
    }
}

/// Compute the writes for `intent` applied to `cell`.
///
/// Energy never drops below zero; an animal that runs out dies on its next
/// evaluation.
pub fn resolve(cell: Cell, intent: Intent, rules: &RuleConfig) -> Transition {
    match intent {
        Intent::Die => Transition::stay(Cell::Empty),
        Intent::Age => Transition::stay(aged(cell)),
        Intent::Reproduce { target } => match cell.animal() {
            Some(parent) => Transition {
                source: cell.with_animal(Animal {
                    age: parent.age,
                    energy: parent.energy.saturating_sub(rules.reproduction_cost),
                }),
                target: None,
                birth: Some((
                    target,
                    cell.with_animal(Animal {
                        age: 0,
                        energy: rules.newborn_energy,
                    }),
                )),
            },
            None => Transition {
                source: aged(cell),
                target: None,
                birth: Some((target, Cell::plant(0))),
            },
        },
        Intent::Eat { target } => travel(cell, target, |energy| {
            energy.saturating_add(rules.meal_energy)
        }),
        Intent::Move { target } => travel(cell, target, |energy| {
            energy.saturating_sub(rules.move_cost)
        }),
    }
}

/// The animal leaves its cell and arrives one tick older at `target`.
fn travel(cell: Cell, target: Position, energy: impl FnOnce(u32) -> u32) -> Transition {
    match cell.animal() {
        Some(animal) => Transition {
            source: Cell::Empty,
            target: Some((
                target,
                cell.with_animal(Animal {
                    age: animal.age.saturating_add(1),
                    energy: energy(animal.energy),
                }),
            )),
            birth: None,
        },
        None => Transition::stay(aged(cell)),
    }
}

const fn aged(cell: Cell) -> Cell {
    match cell {
        Cell::Empty => Cell::Empty,
        Cell::Plant { age } => Cell::Plant {
            age: age.saturating_add(1),
        },
        Cell::Herbivore(a) => Cell::Herbivore(Animal {
            age: a.age.saturating_add(1),
            energy: a.energy,
        }),
        Cell::Carnivore(a) => Cell::Carnivore(Animal {
            age: a.age.saturating_add(1),
            energy: a.energy,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays a fixed script of draws. Running out of script panics, so a
    /// test also pins down how many draws each rule path makes.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedRandomness {
        chances: VecDeque<bool>,
        picks: VecDeque<usize>,
    }

    impl ScriptedRandomness {
        pub(crate) fn new(chances: &[bool], picks: &[usize]) -> Self {
            Self {
                chances: chances.iter().copied().collect(),
                picks: picks.iter().copied().collect(),
            }
        }

        pub(crate) fn exhausted(&self) -> bool {
            self.chances.is_empty() && self.picks.is_empty()
        }
    }

    impl RandomnessSource for ScriptedRandomness {
        fn chance(&mut self, _probability: f64) -> bool {
            self.chances.pop_front().unwrap()
        }

        fn pick_index(&mut self, len: usize) -> Option<usize> {
            if len == 0 {
                return None;
            }
            let i = self.picks.pop_front().unwrap();
            assert!(i < len, "scripted pick {i} out of range {len}");
            Some(i)
        }
    }

    fn hood(empty: &[(usize, usize)], plants: &[(usize, usize)], herbs: &[(usize, usize)]) -> Neighborhood {
        let to_pos = |v: &[(usize, usize)]| v.iter().map(|&(r, c)| Position::new(r, c)).collect();
        Neighborhood {
            empty: to_pos(empty),
            plants: to_pos(plants),
            herbivores: to_pos(herbs),
        }
    }

    #[test]
    fn classify_partitions_by_kind() {
        let hood = Neighborhood::classify([
            (Position::new(0, 1), Cell::Empty),
            (Position::new(1, 0), Cell::plant(2)),
            (Position::new(1, 2), Cell::herbivore(1, 40)),
            (Position::new(2, 1), Cell::carnivore(1, 40)),
        ]);
        assert_eq!(hood.empty, vec![Position::new(0, 1)]);
        assert_eq!(hood.plants, vec![Position::new(1, 0)]);
        assert_eq!(hood.herbivores, vec![Position::new(1, 2)]);
    }

    #[test]
    fn plant_at_max_age_dies_without_drawing() {
        let rules = RuleConfig::default();
        let mut rng = ScriptedRandomness::new(&[], &[]);
        let intent = evaluate(&Cell::plant(10), &hood(&[(0, 1)], &[], &[]), &rules, &mut rng);
        assert_eq!(intent, Intent::Die);
        assert!(rng.exhausted());
        let t = resolve(Cell::plant(10), intent, &rules);
        assert_eq!(t.source, Cell::Empty);
        assert_eq!(t.source.age(), 0);
    }

    #[test]
    fn plant_spreads_and_still_ages() {
        let rules = RuleConfig::default();
        let mut rng = ScriptedRandomness::new(&[true], &[1]);
        let cell = Cell::plant(3);
        let intent = evaluate(&cell, &hood(&[(0, 1), (1, 0)], &[], &[]), &rules, &mut rng);
        assert_eq!(
            intent,
            Intent::Reproduce {
                target: Position::new(1, 0)
            }
        );
        let t = resolve(cell, intent, &rules);
        assert_eq!(t.source, Cell::plant(4));
        assert_eq!(t.birth, Some((Position::new(1, 0), Cell::plant(0))));
        assert_eq!(t.target, None);
    }

    #[test]
    fn plant_without_room_ages() {
        let rules = RuleConfig::default();
        let mut rng = ScriptedRandomness::new(&[true], &[]);
        let intent = evaluate(&Cell::plant(3), &Neighborhood::default(), &rules, &mut rng);
        assert_eq!(intent, Intent::Age);
        assert_eq!(resolve(Cell::plant(3), intent, &rules).source, Cell::plant(4));
    }

    #[test]
    fn starving_animal_dies_regardless_of_draws() {
        let rules = RuleConfig::default();
        for cell in [Cell::herbivore(3, 0), Cell::carnivore(3, 0)] {
            let mut rng = ScriptedRandomness::new(&[], &[]);
            let intent = evaluate(&cell, &hood(&[(0, 1)], &[(1, 0)], &[(1, 2)]), &rules, &mut rng);
            assert_eq!(intent, Intent::Die);
            assert_eq!(resolve(cell, intent, &rules).source, Cell::Empty);
        }
    }

    #[test]
    fn old_animals_die() {
        let rules = RuleConfig::default();
        let mut rng = ScriptedRandomness::new(&[], &[]);
        assert_eq!(
            evaluate(&Cell::herbivore(50, 80), &Neighborhood::default(), &rules, &mut rng),
            Intent::Die
        );
        assert_eq!(
            evaluate(&Cell::carnivore(80, 80), &Neighborhood::default(), &rules, &mut rng),
            Intent::Die
        );
        // A carnivore outlives the herbivore limit.
        let mut rng = ScriptedRandomness::new(&[false, false, false], &[]);
        assert_eq!(
            evaluate(&Cell::carnivore(50, 80), &Neighborhood::default(), &rules, &mut rng),
            Intent::Age
        );
    }

    #[test]
    fn herbivore_eats_single_plant_neighbor() {
        // Herbivore at (5,5) with energy 15 and age 10; its only usable
        // neighbor is a plant at (5,6).
        let rules = RuleConfig::default();
        let cell = Cell::herbivore(10, 15);
        let mut rng = ScriptedRandomness::new(&[true, true], &[0]);
        let intent = evaluate(&cell, &hood(&[], &[(5, 6)], &[]), &rules, &mut rng);
        assert_eq!(
            intent,
            Intent::Eat {
                target: Position::new(5, 6)
            }
        );
        assert!(rng.exhausted());

        let t = resolve(cell, intent, &rules);
        assert_eq!(t.source, Cell::Empty);
        assert_eq!(t.target, Some((Position::new(5, 6), Cell::herbivore(11, 45))));
        assert_eq!(t.birth, None);
    }

    #[test]
    fn low_energy_blocks_reproduction() {
        let rules = RuleConfig::default();
        // Reproduction draw succeeds but energy 20 is not above the threshold,
        // so evaluation falls through to eating.
        let cell = Cell::herbivore(1, 20);
        let mut rng = ScriptedRandomness::new(&[true, true], &[0]);
        let intent = evaluate(&cell, &hood(&[(0, 0)], &[(0, 2)], &[]), &rules, &mut rng);
        assert_eq!(
            intent,
            Intent::Eat {
                target: Position::new(0, 2)
            }
        );
    }

    #[test]
    fn animal_reproduction_costs_parent_energy() {
        let rules = RuleConfig::default();
        let cell = Cell::carnivore(7, 21);
        let mut rng = ScriptedRandomness::new(&[true], &[0]);
        let intent = evaluate(&cell, &hood(&[(2, 2)], &[], &[]), &rules, &mut rng);
        assert_eq!(
            intent,
            Intent::Reproduce {
                target: Position::new(2, 2)
            }
        );
        let t = resolve(cell, intent, &rules);
        assert_eq!(t.source, Cell::carnivore(7, 11));
        assert_eq!(t.birth, Some((Position::new(2, 2), Cell::carnivore(0, 100))));
    }

    #[test]
    fn reproduction_needs_an_empty_neighbor() {
        let rules = RuleConfig::default();
        let cell = Cell::herbivore(1, 90);
        // Reproduce draw fires but there is no room; eat draw misses; move
        // draw fires but there is still no room.
        let mut rng = ScriptedRandomness::new(&[true, false, true], &[]);
        let intent = evaluate(&cell, &hood(&[], &[(0, 2)], &[]), &rules, &mut rng);
        assert_eq!(intent, Intent::Age);
        assert_eq!(resolve(cell, intent, &rules).source, Cell::herbivore(2, 90));
    }

    #[test]
    fn carnivore_hunts_herbivores_not_plants() {
        let rules = RuleConfig::default();
        let cell = Cell::carnivore(4, 50);
        let mut rng = ScriptedRandomness::new(&[false, true], &[1]);
        let intent = evaluate(
            &cell,
            &hood(&[], &[(3, 3)], &[(3, 5), (4, 4)]),
            &rules,
            &mut rng,
        );
        assert_eq!(
            intent,
            Intent::Eat {
                target: Position::new(4, 4)
            }
        );
        let t = resolve(cell, intent, &rules);
        assert_eq!(t.target, Some((Position::new(4, 4), Cell::carnivore(5, 80))));
    }

    #[test]
    fn move_costs_energy_and_ages() {
        let rules = RuleConfig::default();
        let cell = Cell::herbivore(9, 40);
        let mut rng = ScriptedRandomness::new(&[false, false, true], &[0]);
        let intent = evaluate(&cell, &hood(&[(8, 8)], &[], &[]), &rules, &mut rng);
        assert_eq!(
            intent,
            Intent::Move {
                target: Position::new(8, 8)
            }
        );
        let t = resolve(cell, intent, &rules);
        assert_eq!(t.source, Cell::Empty);
        assert_eq!(t.target, Some((Position::new(8, 8), Cell::herbivore(10, 35))));
    }

    #[test]
    fn move_never_drives_energy_negative() {
        let rules = RuleConfig::default();
        let t = resolve(
            Cell::herbivore(1, 3),
            Intent::Move {
                target: Position::new(0, 0),
            },
            &rules,
        );
        assert_eq!(t.target, Some((Position::new(0, 0), Cell::herbivore(2, 0))));
    }

    #[test]
    fn carnivore_move_chance_is_configurable() {
        // With the move chance at zero a carnivore next to open ground
        // never moves.
        let rules = RuleConfig {
            carnivore_move_probability: 0.0,
            ..RuleConfig::default()
        };
        let cell = Cell::carnivore(1, 50);
        let mut rng = crate::random::SeededRandomness::new(3);
        for _ in 0..64 {
            let intent = evaluate(&cell, &hood(&[(0, 0)], &[], &[]), &rules, &mut rng);
            assert!(!matches!(intent, Intent::Move { .. }));
        }
    }

    #[test]
    fn empty_cell_is_inert() {
        let rules = RuleConfig::default();
        let mut rng = ScriptedRandomness::new(&[], &[]);
        let intent = evaluate(&Cell::Empty, &hood(&[(0, 1)], &[], &[]), &rules, &mut rng);
        assert_eq!(intent, Intent::Age);
        assert_eq!(resolve(Cell::Empty, intent, &rules).source, Cell::Empty);
    }
}
