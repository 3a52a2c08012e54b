//! Roster Generation
//!
//! Seeded names, palettes and personalities for the office staff. Everyone
//! gets a home desk pod and starts at one of its chairs.

use office_events::{Gender, Rgb};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::{Appearance, CharacterSpec, Needs, Personality};
use crate::map::{SpatialMap, TilePos};

use super::layout::DESK_ZONES;

const FIRST_NAMES: &[(&str, Gender)] = &[
    ("Dana", Gender::Female),
    ("Priya", Gender::Female),
    ("Marcus", Gender::Male),
    ("Jun", Gender::Male),
    ("Alex", Gender::Neutral),
    ("Sofia", Gender::Female),
    ("Tomas", Gender::Male),
    ("Rin", Gender::Neutral),
    ("Hannah", Gender::Female),
    ("Omar", Gender::Male),
    ("Lea", Gender::Female),
    ("Kai", Gender::Neutral),
    ("Grace", Gender::Female),
    ("Ivan", Gender::Male),
    ("Noor", Gender::Female),
    ("Felix", Gender::Male),
];

const LAST_NAMES: &[&str] = &[
    "Whitfield", "Okafor", "Lindqvist", "Moreau", "Tanaka", "Alvarez", "Brennan", "Novak",
    "Castillo", "Hughes", "Petrov", "Adeyemi", "Sato", "Keller", "Rossi", "Dubois",
];

const SKIN: &[Rgb] = &[
    Rgb(0xf6, 0xd5, 0xb8),
    Rgb(0xf1, 0xc2, 0x7d),
    Rgb(0xd1, 0x9a, 0x6a),
    Rgb(0xa8, 0x6b, 0x45),
    Rgb(0x7a, 0x4a, 0x2e),
    Rgb(0x4e, 0x2f, 0x1f),
];

const HAIR: &[Rgb] = &[
    Rgb(0x1e, 0x16, 0x10),
    Rgb(0x3b, 0x2a, 0x1a),
    Rgb(0x7b, 0x4a, 0x22),
    Rgb(0xc9, 0x9a, 0x4b),
    Rgb(0xa3, 0x3b, 0x20),
    Rgb(0x9e, 0x9e, 0xa8),
];

const SHIRT: &[Rgb] = &[
    Rgb(0x4a, 0x7a, 0xbf),
    Rgb(0xc0, 0x39, 0x2b),
    Rgb(0x27, 0xae, 0x60),
    Rgb(0xf3, 0x9c, 0x12),
    Rgb(0x8e, 0x44, 0xad),
    Rgb(0xec, 0xf0, 0xf1),
    Rgb(0x16, 0xa0, 0x85),
];

const TROUSERS: &[Rgb] = &[
    Rgb(0x33, 0x33, 0x44),
    Rgb(0x2c, 0x3e, 0x50),
    Rgb(0x5d, 0x4a, 0x3a),
    Rgb(0x1b, 0x1b, 0x1b),
    Rgb(0x4b, 0x55, 0x63),
];

/// Trait value leaning towards the middle of 0-100
fn roll_trait<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    let a: u32 = rng.gen_range(0..=100);
    let b: u32 = rng.gen_range(0..=100);
    ((a + b) / 2) as u8
}

fn pick<R: Rng + ?Sized>(rng: &mut R, colors: &[Rgb]) -> Rgb {
    colors.choose(rng).copied().unwrap_or_default()
}

/// Generate character ID
pub fn character_id(index: usize) -> String {
    format!("c{}", index + 1)
}

/// Start tile for the `index`-th character: the chairs of its home pod in
/// turn, falling back to the first walkable tile in the pod.
fn start_tile(map: &SpatialMap, desk: &str, index: usize) -> Option<TilePos> {
    let zone = map.zone(desk)?;
    let pods = DESK_ZONES.len();
    let seat = index / pods;
    zone.interaction_points
        .get(seat % zone.interaction_points.len().max(1))
        .copied()
        .filter(|&p| map.is_walkable(p))
        .or_else(|| zone.tiles().filter(|&t| map.is_walkable(t)).nth(seat))
}

/// Generates `count` characters for the office. Same RNG state, same roster.
pub fn generate_roster<R: Rng + ?Sized>(
    map: &SpatialMap,
    count: usize,
    rng: &mut R,
) -> Vec<CharacterSpec> {
    let mut firsts: Vec<&(&str, Gender)> = FIRST_NAMES.iter().collect();
    firsts.shuffle(rng);
    let mut roster = Vec::with_capacity(count);

    for index in 0..count {
        let (first, gender) = *firsts[index % firsts.len()];
        let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
        let name = if index < firsts.len() {
            format!("{} {}", first, last)
        } else {
            format!("{} {} {}", first, last, index / firsts.len() + 1)
        };

        let desk = DESK_ZONES[index % DESK_ZONES.len()];
        let position = start_tile(map, desk, index)
            .or_else(|| map.walkable_tiles().nth(index))
            .unwrap_or_else(|| TilePos::new(0, 0));

        let mut spec = CharacterSpec::new(character_id(index), name, position);
        spec.appearance = Appearance {
            palette: [
                pick(rng, SKIN),
                pick(rng, HAIR),
                pick(rng, SHIRT),
                pick(rng, TROUSERS),
            ],
            gender,
        };
        spec.personality = Personality {
            openness: roll_trait(rng),
            conscientiousness: roll_trait(rng),
            extraversion: roll_trait(rng),
            agreeableness: roll_trait(rng),
            neuroticism: roll_trait(rng),
        };
        spec.home_desk = map.zone(desk).map(|z| z.id.clone());
        spec.mood = rng.gen_range(45.0..65.0);
        spec.needs = Needs {
            bladder: rng.gen_range(0.0..30.0),
            hunger: rng.gen_range(0.0..30.0),
            thirst: rng.gen_range(0.0..30.0),
        };
        roster.push(spec);
    }

    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::office_layout;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_roster_is_seeded() {
        let map = office_layout().unwrap();
        let a = generate_roster(&map, 8, &mut SmallRng::seed_from_u64(7));
        let b = generate_roster(&map, 8, &mut SmallRng::seed_from_u64(7));
        let names_a: Vec<_> = a.iter().map(|c| c.name.clone()).collect();
        let names_b: Vec<_> = b.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names_a, names_b);
        assert_eq!(a[3].appearance, b[3].appearance);
    }

    #[test]
    fn test_start_positions_are_distinct_and_walkable() {
        let map = office_layout().unwrap();
        let roster = generate_roster(&map, 12, &mut SmallRng::seed_from_u64(3));
        let positions: HashSet<TilePos> = roster.iter().map(|c| c.position).collect();
        assert_eq!(positions.len(), 12);
        for spec in &roster {
            assert!(map.is_walkable(spec.position));
            let desk = spec.home_desk.as_deref().unwrap();
            assert!(map.zone(desk).unwrap().contains(spec.position));
        }
    }

    #[test]
    fn test_ids_and_traits() {
        let map = office_layout().unwrap();
        let roster = generate_roster(&map, 20, &mut SmallRng::seed_from_u64(1));
        assert_eq!(roster[0].id, "c1");
        assert_eq!(roster[19].id, "c20");
        assert!(roster.iter().all(|c| c.personality.extraversion <= 100));
        let names: HashSet<&str> = roster.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), 20);
    }
}
