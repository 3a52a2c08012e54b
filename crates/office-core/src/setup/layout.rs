//! Office Layout
//!
//! The default 32x20 office: six desk pods and a meeting room on the north
//! side, a corridor with the water cooler, and bathroom, kitchen, breakroom
//! and reception along the south side.

use office_events::ZoneType;

use crate::error::MapError;
use crate::map::{SpatialMap, Zone};

const OFFICE_ROWS: [&str; 20] = [
    "####w#####w#####w#########w#####",
    "#pDDD....DDD....DDD..#........p#",
    "#....................#.........#",
    "#....................#..DDDDD..#",
    "#....................+..DDDDD..#",
    "#....................#..DDDDD..#",
    "#....................#.........#",
    "#.DDD....DDD....DDD..#.........#",
    "####+######+######+#######+#####",
    "#=.............................#",
    "#..............................#",
    "###+########+#######+######+####",
    "#c...c.#.======........p#p.....#",
    "#......#................#......#",
    "#......#................#......#",
    "#......#................#......#",
    "#......#..........c..c..#......#",
    "#......#................#......#",
    "#......#........p.......#......#",
    "############################+###",
];

/// Desk pod zone ids, in home-desk assignment order
pub const DESK_ZONES: [&str; 6] = ["desk_1", "desk_2", "desk_3", "desk_4", "desk_5", "desk_6"];

fn desk_pod(index: usize, x: i32, y: i32, chair_row: i32) -> Zone {
    Zone::new(
        DESK_ZONES[index],
        format!("Desk Pod {}", index + 1),
        ZoneType::Desk,
        (x, y, 6, 3),
        2,
    )
    .with_points(&[(x + 1, chair_row), (x + 3, chair_row)])
}

/// Zones of the default office. The water cooler is listed before the
/// corridor it sits in so lookups resolve to it first.
pub fn office_zones() -> Vec<Zone> {
    vec![
        desk_pod(0, 1, 1, 2),
        desk_pod(1, 8, 1, 2),
        desk_pod(2, 15, 1, 2),
        desk_pod(3, 1, 5, 6),
        desk_pod(4, 8, 5, 6),
        desk_pod(5, 15, 5, 6),
        Zone::new("meeting", "Meeting Room", ZoneType::Meeting, (22, 1, 9, 7), 6).with_points(&[
            (23, 3),
            (23, 5),
            (29, 3),
            (29, 5),
            (25, 2),
            (27, 6),
        ]),
        Zone::new("water_cooler", "Water Cooler", ZoneType::WaterCooler, (1, 9, 3, 2), 3)
            .with_points(&[(2, 9), (1, 10)]),
        Zone::new("corridor", "Corridor", ZoneType::Corridor, (4, 9, 27, 2), 12),
        Zone::new("bathroom", "Bathroom", ZoneType::Bathroom, (1, 12, 6, 7), 2)
            .with_points(&[(2, 12), (4, 12)]),
        Zone::new("kitchen", "Kitchen", ZoneType::Kitchen, (8, 12, 8, 7), 4)
            .with_points(&[(9, 13), (11, 13), (13, 13)]),
        Zone::new("breakroom", "Breakroom", ZoneType::Breakroom, (16, 12, 8, 7), 6)
            .with_points(&[(18, 15), (21, 15), (19, 17)]),
        Zone::new("reception", "Reception", ZoneType::Entrance, (25, 12, 6, 7), 8),
    ]
}

/// Builds the default office map
pub fn office_layout() -> Result<SpatialMap, MapError> {
    SpatialMap::from_ascii(&OFFICE_ROWS, office_zones())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TilePos;
    use crate::pathfinding::{plan_path, PathOutcome};

    #[test]
    fn test_layout_dimensions() {
        let map = office_layout().unwrap();
        assert_eq!(map.width(), 32);
        assert_eq!(map.height(), 20);
        assert_eq!(map.zones().len(), 13);
    }

    #[test]
    fn test_interaction_points_are_walkable_and_inside() {
        let map = office_layout().unwrap();
        for zone in map.zones() {
            for &point in &zone.interaction_points {
                assert!(map.is_walkable(point), "{} point {:?}", zone.id, point);
                assert!(zone.contains(point), "{} point {:?}", zone.id, point);
            }
        }
    }

    #[test]
    fn test_every_zone_reachable_from_reception() {
        let map = office_layout().unwrap();
        let start = TilePos::new(27, 15);
        for zone in map.zones() {
            let target = zone
                .tiles()
                .find(|&t| map.is_walkable(t))
                .unwrap_or_else(|| panic!("{} has no floor", zone.id));
            let outcome = plan_path(&map, start, target);
            assert!(
                matches!(outcome, PathOutcome::Path(_) | PathOutcome::Arrived),
                "{} unreachable",
                zone.id
            );
        }
    }

    #[test]
    fn test_water_cooler_wins_over_corridor() {
        let map = office_layout().unwrap();
        assert_eq!(map.zone_at(TilePos::new(2, 9)).unwrap().id, "water_cooler");
        assert_eq!(map.zone_at(TilePos::new(10, 10)).unwrap().id, "corridor");
    }

    #[test]
    fn test_need_zones_exist() {
        let map = office_layout().unwrap();
        for zone_type in [ZoneType::Bathroom, ZoneType::Kitchen, ZoneType::WaterCooler] {
            assert!(map.zones_of_type(zone_type).next().is_some());
        }
    }
}
