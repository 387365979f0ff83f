//! Top-down racing simulation core.
//!
//! Cars are rigid-body aggregates (one chassis, four jointed tires) simulated
//! by rapier2d; AI opponents chase an ordered checkpoint route; a race
//! session tracks laps, timing and live standings. Rendering and audio stay
//! outside: the crate exposes draw poses and discrete race events and leaves
//! the rest to the host.

pub mod ai;
pub mod car;
pub mod leaderboard;
pub mod map;
pub mod physics;
pub mod race;
pub mod state;
pub mod tire;
pub mod waypoints;

pub use car::{Car, CarConfig, CarId};
pub use map::{MapData, MapError};
pub use physics::{FIXED_DT, PhysicsWorld};
pub use race::{PlayerInput, RaceConfig, RaceEvent, RaceResults, RaceSession, RaceSetupError};
pub use state::{GameFlow, GameState};
pub use waypoints::{ProgressDetection, Route};
