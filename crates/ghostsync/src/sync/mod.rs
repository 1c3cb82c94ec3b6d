mod appearance;
mod hiscores;
mod outgoing;
mod packer;

pub use appearance::{BodyPartKits, KitCounts};
pub use hiscores::{HISCORES_QUEUE_CAPACITY, HiscoresBoard};
pub use outgoing::{
    AdminCommand, MAX_SKILL_XP, MAX_XP_ACCUMULATOR, OutgoingState, XP_ACCUMULATOR_RESET,
};
pub use packer::{FEMALE_MAX_CAPE, GhostSync, MAX_GHOSTS, NO_CAPE, SELF_GHOST_SLOT, SyncEvent};
