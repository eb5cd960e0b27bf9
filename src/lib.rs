// Library exports for VibeCheck - group vibe camera core

pub mod autosnap;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod stabilizer;
