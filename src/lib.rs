//! Tick-based combat simulation for idle-game parties: buffs, combat, abilities and loot,
//! with parallel zone sweeps and an HTTP API on top.

pub mod cli;
pub mod combat;
pub mod config;
pub mod data;
pub mod optimizer;
pub mod parallel;
pub mod server;
pub mod simulation;
