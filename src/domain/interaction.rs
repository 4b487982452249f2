/// Drill-vs-enemy contact, resolved once per tick after everything moved.
///
/// Per active enemy, in order:
///   1. head contact: hazardous ends the tick with a life lost,
///      destructible is destroyed and checking continues
///   2. otherwise pipe contact: any pipe segment within
///      `enemy radius + pipe radius` ends the tick with a life lost
///
/// Head is checked before pipe so an enemy touching both is destroyed.

use super::drill::DrillController;
use super::enemy::EnemyAgent;
use super::tilemap::EnemyKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ContactCause {
    /// A hazardous enemy touched the head.
    EnemyHead,
    /// Any enemy touched the pipe.
    PipeContact,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InteractionOutcome {
    pub life_lost: Option<ContactCause>,
    /// Ids of enemies destroyed this tick, in resolution order.
    pub destroyed: Vec<usize>,
}

impl InteractionOutcome {
    pub fn is_life_lost(&self) -> bool {
        self.life_lost.is_some()
    }
}

pub fn resolve_interactions(drill: &DrillController, enemies: &mut [EnemyAgent]) -> InteractionOutcome {
    let mut outcome = InteractionOutcome::default();

    for enemy in enemies.iter_mut().filter(|e| e.is_active()) {
        let pos = enemy.position();
        let radius = enemy.radius();

        if drill.collides_with_head(pos, radius) {
            match enemy.kind() {
                EnemyKind::Hazardous => {
                    outcome.life_lost = Some(ContactCause::EnemyHead);
                    break;
                }
                EnemyKind::Destructible => {
                    enemy.handle_destroyed();
                    outcome.destroyed.push(enemy.id());
                    continue;
                }
            }
        }

        let touching_pipe = drill.pipe()
            .distance_to(pos)
            .map_or(false, |d| d <= radius + drill.pipe_radius());
        if touching_pipe {
            outcome.life_lost = Some(ContactCause::PipeContact);
            break;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DrillConfig, EnemyConfig};
    use crate::domain::tile::TileCoord;
    use crate::domain::tilemap::{PatrolStyle, SpawnPoint, TileGeometry, TileMap};

    /// Entry at (2,0); the drill digs straight down and rests on (2,4).
    fn setup() -> (TileMap, DrillController) {
        let mut map = TileMap::parse(&[
            "  W  ",
            "     ",
            "     ",
            "     ",
            "     ",
        ], TileGeometry::new(16.0)).unwrap();
        let entry = map.entry_tile();
        let mut drill = DrillController::new(&map, map.tile_center(entry), entry, DrillConfig::default());
        drill.set_direction(0, 1);
        for _ in 0..600 {
            drill.update(&mut map, 1.0 / 60.0);
            if drill.tile() == TileCoord::new(2, 3) {
                drill.set_direction(0, 0);
                break;
            }
        }
        // Let it finish the leg into (2,4) and stop.
        for _ in 0..120 {
            drill.update(&mut map, 1.0 / 60.0);
        }
        (map, drill)
    }

    /// An active enemy parked at `at`.
    fn enemy_at(map: &TileMap, id: usize, kind: EnemyKind, at: TileCoord) -> EnemyAgent {
        let spawn = SpawnPoint { tile: at, kind, style: PatrolStyle::Reciprocating };
        let cfg = EnemyConfig { speed: 0.0, speed_jitter: 0.0, ..EnemyConfig::default() };
        let mut e = EnemyAgent::new(id, spawn, map, cfg, 0.0, id as u64);
        e.update(map, 0.001);
        assert!(e.is_active());
        e
    }

    #[test]
    fn hazardous_head_contact_costs_one_life() {
        let (map, drill) = setup();
        let mut enemies = vec![
            enemy_at(&map, 0, EnemyKind::Hazardous, drill.tile()),
            enemy_at(&map, 1, EnemyKind::Hazardous, drill.tile()),
        ];
        let out = resolve_interactions(&drill, &mut enemies);
        assert_eq!(out.life_lost, Some(ContactCause::EnemyHead));
        assert!(out.destroyed.is_empty());
        // Hazardous enemies survive the contact.
        assert!(enemies.iter().all(|e| e.is_active()));
    }

    #[test]
    fn head_life_loss_stops_checking_later_enemies() {
        let (map, drill) = setup();
        let mut enemies = vec![
            enemy_at(&map, 0, EnemyKind::Hazardous, drill.tile()),
            enemy_at(&map, 1, EnemyKind::Destructible, drill.tile()),
        ];
        let out = resolve_interactions(&drill, &mut enemies);
        assert_eq!(out.life_lost, Some(ContactCause::EnemyHead));
        assert!(out.destroyed.is_empty());
        assert!(enemies[1].is_active());
    }

    #[test]
    fn pipe_life_loss_stops_checking_later_enemies() {
        let (map, drill) = setup();
        let mut enemies = vec![
            enemy_at(&map, 0, EnemyKind::Hazardous, TileCoord::new(2, 2)),
            enemy_at(&map, 1, EnemyKind::Destructible, drill.tile()),
        ];
        let out = resolve_interactions(&drill, &mut enemies);
        assert_eq!(out.life_lost, Some(ContactCause::PipeContact));
        assert!(out.destroyed.is_empty());
        assert!(enemies[1].is_active());
    }

    #[test]
    fn destructible_head_contact_destroys_enemy() {
        let (map, drill) = setup();
        let mut enemies = vec![enemy_at(&map, 3, EnemyKind::Destructible, drill.tile())];
        let out = resolve_interactions(&drill, &mut enemies);
        assert!(!out.is_life_lost());
        assert_eq!(out.destroyed, vec![3]);
        assert!(!enemies[0].is_active());
        assert!(enemies[0].respawn_timer() > 0.0);
    }

    #[test]
    fn destructible_touching_head_and_pipe_is_still_destroyed() {
        let (map, drill) = setup();
        let mut enemies = vec![enemy_at(&map, 0, EnemyKind::Destructible, drill.tile())];
        let pos = enemies[0].position();
        // The head sits on the pipe's last point, so this enemy touches both.
        assert!(drill.pipe().distance_to(pos).unwrap() < 1e-3);
        assert!(drill.collides_with_head(pos, enemies[0].radius()));

        let out = resolve_interactions(&drill, &mut enemies);
        assert_eq!(out.life_lost, None);
        assert_eq!(out.destroyed, vec![0]);
    }

    #[test]
    fn destroyed_enemy_does_not_shield_later_hazards() {
        let (map, drill) = setup();
        let mut enemies = vec![
            enemy_at(&map, 0, EnemyKind::Destructible, drill.tile()),
            enemy_at(&map, 1, EnemyKind::Destructible, drill.tile()),
            enemy_at(&map, 2, EnemyKind::Hazardous, TileCoord::new(2, 2)),
        ];
        let out = resolve_interactions(&drill, &mut enemies);
        assert_eq!(out.destroyed, vec![0, 1]);
        assert_eq!(out.life_lost, Some(ContactCause::PipeContact));
    }

    #[test]
    fn pipe_contact_costs_a_life() {
        let (map, drill) = setup();
        let mut enemies = vec![enemy_at(&map, 0, EnemyKind::Destructible, TileCoord::new(2, 1))];
        let out = resolve_interactions(&drill, &mut enemies);
        assert_eq!(out.life_lost, Some(ContactCause::PipeContact));
        assert!(out.destroyed.is_empty());
    }

    #[test]
    fn enemies_clear_of_drill_and_pipe_are_ignored() {
        let (map, drill) = setup();
        let mut enemies = vec![
            enemy_at(&map, 0, EnemyKind::Hazardous, TileCoord::new(0, 2)),
            enemy_at(&map, 1, EnemyKind::Destructible, TileCoord::new(4, 4)),
        ];
        let out = resolve_interactions(&drill, &mut enemies);
        assert_eq!(out, InteractionOutcome::default());
    }

    #[test]
    fn inactive_enemies_never_interact() {
        let (map, drill) = setup();
        let mut e = enemy_at(&map, 0, EnemyKind::Hazardous, drill.tile());
        e.reset();
        let out = resolve_interactions(&drill, &mut [e]);
        assert!(!out.is_life_lost());
    }

    #[test]
    fn docked_drill_with_enemy_at_well_is_safe() {
        let map = TileMap::parse(&[" W ", "   "], TileGeometry::new(16.0)).unwrap();
        let entry = map.entry_tile();
        let drill = DrillController::new(&map, map.tile_center(entry), entry, DrillConfig::default());
        let mut enemies = vec![enemy_at(&map, 0, EnemyKind::Hazardous, entry)];
        assert!(!resolve_interactions(&drill, &mut enemies).is_life_lost());
    }
}
