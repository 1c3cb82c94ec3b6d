use glam::IVec2;

use super::collision::{self, Route};
use super::orientation::turn_toward;
use super::target::{HARD_CATCH_UP_LEN, MoveRequest, MovementSpeed, MovementTarget, TargetQueue};
use crate::net::PlayerName;
use crate::scene::{PoseAnimations, Scene, pose_slot_for_tick};

/// Game ticks an overhead chat line stays visible.
pub const CHAT_DURATION_TICKS: u8 = 6;

const BASE_STEP: i32 = 4;
const TURNING_STEP: i32 = 2;
const BACKLOG_STEP: i32 = 6;
const MAX_STEP: i32 = 8;

/// Render state the host draws for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorView<'a> {
    pub tile: IVec2,
    pub plane: u8,
    pub local: IVec2,
    pub orientation: u16,
    pub animation_id: u16,
    pub name: &'a str,
    pub overhead_text: &'a str,
    pub chat: Option<&'a str>,
}

/// A ghost driven entirely by received destinations, smoothed per render
/// step toward the head of its target queue.
#[derive(Debug, Clone, Default)]
pub struct RemoteActor {
    active: bool,
    world: u16,
    plane: u8,
    name: String,
    overhead_text: String,
    chat: String,
    chat_ticks: u8,
    local: IVec2,
    orientation: u16,
    queue: TargetQueue,
    speed: MovementSpeed,
    explicit_animation: Option<u16>,
    poses: [u16; 3],
    animation_stall: u32,
}

impl RemoteActor {
    pub fn new(poses: PoseAnimations) -> Self {
        Self {
            poses: poses.as_slots(),
            ..Default::default()
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn world(&self) -> u16 {
        self.world
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local(&self) -> IVec2 {
        self.local
    }

    pub fn orientation(&self) -> u16 {
        self.orientation
    }

    pub fn speed(&self) -> MovementSpeed {
        self.speed
    }

    pub fn queue(&self) -> &TargetQueue {
        &self.queue
    }

    pub fn chat(&self) -> Option<&str> {
        (!self.chat.is_empty()).then_some(self.chat.as_str())
    }

    /// Animation currently playing: an explicit one, or the pose for the
    /// current speed.
    pub fn animation_id(&self) -> u16 {
        self.explicit_animation
            .unwrap_or(self.poses[self.speed.pose_slot()])
    }

    pub fn set_pose_animations(&mut self, poses: PoseAnimations) {
        self.poses = poses.as_slots();
    }

    pub fn set_world(&mut self, world: u16) {
        self.world = world;
        self.refresh_overhead_text();
    }

    pub fn set_name(&mut self, name: &PlayerName) {
        self.name = name.as_string();
        self.refresh_overhead_text();
    }

    fn refresh_overhead_text(&mut self) {
        self.overhead_text = if self.world != 0 {
            format!("[W{}] {}", self.world, self.name)
        } else {
            self.name.clone()
        };
    }

    pub fn set_chat(&mut self, message: &str) {
        self.chat = message.to_string();
        self.chat_ticks = CHAT_DURATION_TICKS;
    }

    /// Keeps catch-up speed up while a long non-movement animation plays.
    pub fn stall_animation(&mut self, steps: u32) {
        self.animation_stall = steps;
    }

    /// World tile under the rendered position.
    pub fn world_tile<S: Scene + ?Sized>(&self, scene: &S) -> IVec2 {
        scene.to_world(scene.local_to_scene(self.local))
    }

    pub fn view<S: Scene + ?Sized>(&self, scene: &S) -> Option<ActorView<'_>> {
        self.active.then(|| ActorView {
            tile: self.world_tile(scene),
            plane: self.plane,
            local: self.local,
            orientation: self.orientation,
            animation_id: self.animation_id(),
            name: &self.name,
            overhead_text: &self.overhead_text,
            chat: self.chat(),
        })
    }

    fn spawn<S: Scene + ?Sized>(&mut self, scene: &S, request: &MoveRequest) {
        let scene_tile = scene.to_scene(request.tile);
        if scene.plane() != request.plane || !scene.contains(scene_tile) {
            return;
        }

        log::trace!("Spawning actor at {} on plane {}", request.tile, request.plane);
        self.active = true;
        self.plane = request.plane;
        self.local = scene.to_local(scene_tile);
        self.orientation = request.facing();
        self.speed = MovementSpeed::Stationary;
        self.explicit_animation = None;
        self.queue.clear();
        self.chat_ticks = 0;
    }

    pub fn despawn(&mut self) {
        if self.active {
            log::trace!("Despawning actor {:?}", self.name);
        }
        self.active = false;
        self.world = 0;
        self.plane = 0;
        self.name.clear();
        self.overhead_text.clear();
        self.chat.clear();
        self.chat_ticks = 0;
        self.speed = MovementSpeed::Stationary;
        self.explicit_animation = None;
        self.animation_stall = 0;
        self.queue.clear();
    }

    /// Queues the next destination, inserting a waypoint when a short move
    /// would otherwise cut through a wall. Called once per game tick.
    pub fn move_to<S: Scene + ?Sized>(&mut self, scene: &S, request: &MoveRequest) {
        if !self.active {
            self.spawn(scene, request);
            if !self.active {
                return;
            }
        }

        if self.queue.len() >= HARD_CATCH_UP_LEN {
            log::debug!("Actor {:?} fell {} targets behind, catching up", self.name, self.queue.len());
            self.queue.clear();
        }

        let destination = scene.to_scene(request.tile);
        if !scene.contains(destination) {
            return;
        }

        let mut previous = match self.queue.back() {
            Some(target) => target.tile,
            None => self.world_tile(scene),
        };
        let delta = request.tile - previous;
        let mut distance = collision::tile_distance(delta);
        let mut orientation = request.facing();

        if (1..=2).contains(&distance) {
            let Route { midpoint, distance: routed } =
                collision::route(scene, request.plane, destination, delta);
            distance = routed;

            if let Some(step) = midpoint {
                let tile = previous + step;
                let mut target = MovementTarget::from_request(
                    request,
                    scene.to_local(scene.to_scene(tile)),
                    MovementSpeed::from_distance(distance),
                );
                target.tile = tile;
                target.is_midpoint = true;
                if !request.is_interacting {
                    target.orientation = collision::facing(step);
                }
                self.queue.push(target);
                previous = tile;
            }

            if !request.is_interacting {
                orientation = collision::facing(request.tile - previous);
            }
        }

        let mut target = MovementTarget::from_request(
            request,
            scene.to_local(destination),
            MovementSpeed::from_distance(distance),
        );
        target.orientation = orientation;
        self.queue.push(target);

        if self.chat_ticks > 0 {
            self.chat_ticks -= 1;
            if self.chat_ticks == 0 {
                self.chat.clear();
            }
        }
    }

    /// One render step toward the head target. Returns false when the actor
    /// is, or just became, inactive.
    pub fn advance<S: Scene + ?Sized>(&mut self, scene: &S) -> bool {
        if !self.active {
            return false;
        }
        let Some(target) = self.queue.front().copied() else {
            return true;
        };

        let scene_tile = scene.to_scene(target.tile);
        if scene.plane() != target.plane || self.plane != target.plane || !scene.contains(scene_tile) {
            self.despawn();
            return false;
        }

        self.select_animation(&target);

        let delta = target.local - self.local;
        if delta != IVec2::ZERO {
            let reach = self.speed.tiles_per_tick() * self.step_rate(&target);
            let step = if reach > 0 {
                delta.clamp(IVec2::splat(-reach), IVec2::splat(reach))
            } else {
                delta
            };
            self.local += step;
        }

        self.orientation = turn_toward(self.orientation, target.orientation);

        if self.local == target.local && self.orientation == target.orientation {
            self.queue.pop_front();
        }

        true
    }

    fn select_animation(&mut self, target: &MovementTarget) {
        let mut refreshed_slot = None;

        if target.is_pose_animation {
            let slot = pose_slot_for_tick(target.tick);
            if self.poses[slot] != target.animation_id {
                self.poses[slot] = target.animation_id;
                refreshed_slot = Some(slot);
            }
        }

        if !target.is_pose_animation {
            self.explicit_animation = Some(target.animation_id);
        } else if self.explicit_animation.is_some()
            || self.speed != target.speed
            || refreshed_slot == Some(target.speed.pose_slot())
        {
            self.explicit_animation = None;
        }

        self.speed = target.speed;
    }

    fn step_rate(&mut self, target: &MovementTarget) -> i32 {
        let backlog = self.queue.len();
        let mut rate = BASE_STEP;

        if self.orientation != target.orientation && !target.is_interacting {
            rate = TURNING_STEP;
        }
        if backlog > 2 {
            rate = BACKLOG_STEP;
        }
        if backlog > 3 {
            rate = MAX_STEP;
        }
        if self.animation_stall > 0 && backlog > 1 {
            rate = MAX_STEP;
            self.animation_stall -= 1;
        }

        rate
    }
}
