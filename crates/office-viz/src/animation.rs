//! Animation frame selection.
//!
//! Frames are keyed by behavior state, facing and a monotonically
//! increasing frame counter. Moving states cycle a four frame gait, resting
//! states breathe slowly and talking flaps the mouth fastest.

use office_events::{BehaviorState, Direction};

pub const GAIT_FRAMES: u8 = 4;
/// Render frames per gait frame
pub const GAIT_MODULUS: u64 = 8;
pub const BREATH_MODULUS: u64 = 40;
pub const MOUTH_MODULUS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pose {
    Gait(u8),
    Breath(u8),
    Talk(u8),
}

impl Pose {
    pub fn all() -> Vec<Pose> {
        let mut poses: Vec<Pose> = (0..GAIT_FRAMES).map(Pose::Gait).collect();
        poses.extend([Pose::Breath(0), Pose::Breath(1), Pose::Talk(0), Pose::Talk(1)]);
        poses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameKey {
    pub facing: Direction,
    pub pose: Pose,
}

impl FrameKey {
    pub fn all() -> Vec<FrameKey> {
        let facings = [Direction::Down, Direction::Up, Direction::Left, Direction::Right];
        facings
            .iter()
            .flat_map(|&facing| Pose::all().into_iter().map(move |pose| FrameKey { facing, pose }))
            .collect()
    }
}

pub fn select_frame(state: BehaviorState, facing: Direction, counter: u64) -> FrameKey {
    let pose = match state {
        BehaviorState::Walking | BehaviorState::Busy => {
            Pose::Gait(((counter / GAIT_MODULUS) % GAIT_FRAMES as u64) as u8)
        }
        BehaviorState::Talking => Pose::Talk(((counter / MOUTH_MODULUS) % 2) as u8),
        // Everything else, working included, just breathes.
        _ => Pose::Breath(((counter / BREATH_MODULUS) % 2) as u8),
    };
    FrameKey { facing, pose }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walking_cycles_four_gait_frames() {
        let frames: Vec<Pose> = (0..4)
            .map(|i| select_frame(BehaviorState::Walking, Direction::Left, i * GAIT_MODULUS).pose)
            .collect();
        assert_eq!(
            frames,
            vec![Pose::Gait(0), Pose::Gait(1), Pose::Gait(2), Pose::Gait(3)]
        );
        let wrapped = select_frame(BehaviorState::Busy, Direction::Left, 4 * GAIT_MODULUS);
        assert_eq!(wrapped.pose, Pose::Gait(0));
    }

    #[test]
    fn test_idle_breathes_slower_than_talking() {
        assert_eq!(select_frame(BehaviorState::Sitting, Direction::Down, 0).pose, Pose::Breath(0));
        assert_eq!(
            select_frame(BehaviorState::Eating, Direction::Down, BREATH_MODULUS).pose,
            Pose::Breath(1)
        );
        assert_eq!(
            select_frame(BehaviorState::Talking, Direction::Down, MOUTH_MODULUS).pose,
            Pose::Talk(1)
        );
        assert!(MOUTH_MODULUS < GAIT_MODULUS && GAIT_MODULUS < BREATH_MODULUS);
    }

    #[test]
    fn test_facing_is_kept() {
        let key = select_frame(BehaviorState::Idle, Direction::Right, 7);
        assert_eq!(key.facing, Direction::Right);
        assert_eq!(FrameKey::all().len(), 4 * 8);
    }
}
