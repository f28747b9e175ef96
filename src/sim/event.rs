/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and flashes.

use serde::Serialize;

use crate::domain::ability::Character;
use crate::domain::entity::{ItemKind, PlayerId};
use crate::domain::grid::TilePos;

use super::world::Outcome;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum GameEvent {
    BombPlaced { player: PlayerId, pos: TilePos },
    BombDetonated { owner: PlayerId, pos: TilePos, chained: bool },
    BlockDestroyed { pos: TilePos },
    ItemSpawned { kind: ItemKind, pos: TilePos },
    ItemCollected { player: PlayerId, kind: ItemKind, applied: bool },
    ItemExpired { kind: ItemKind, pos: TilePos },
    ItemBurned { kind: ItemKind, pos: TilePos },
    ShieldBroken { player: PlayerId },
    PlayerKilled { player: PlayerId },
    SkillActivated { player: PlayerId, character: Character },
    SkillExpired { player: PlayerId, character: Character },
    MatchOver { outcome: Outcome },
}
