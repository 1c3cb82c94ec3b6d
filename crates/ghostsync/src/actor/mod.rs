pub mod collision;
pub mod orientation;
mod remote;
mod target;

pub use remote::{ActorView, CHAT_DURATION_TICKS, RemoteActor};
pub use target::{
    HARD_CATCH_UP_LEN, MoveRequest, MovementSpeed, MovementTarget, TARGET_QUEUE_CAPACITY,
    TargetQueue,
};
