pub mod board;
pub mod clock;
pub mod easing;
pub mod perspective;
pub mod rng;
pub mod roster;
