pub mod actor;
pub mod config;
pub mod net;
pub mod scene;
pub mod simulation;
pub mod sync;

pub use actor::{ActorView, MoveRequest, MovementSpeed, MovementTarget, RemoteActor, TargetQueue};
pub use config::SyncConfig;
pub use net::{
    ConnectionState, Credentials, DEFAULT_PORT, NetworkEndpoint, NetworkStats, PacketError,
    PacketFrame, PlayerName, Session, SessionEvent, TickRing,
};
pub use scene::{AppearanceProvider, CollisionFlags, LocalPlayer, PoseAnimations, Scene};
pub use simulation::{ClockStep, FixedTimestep, SimulationLoop};
pub use sync::{BodyPartKits, GhostSync, HiscoresBoard, OutgoingState, SyncEvent};
