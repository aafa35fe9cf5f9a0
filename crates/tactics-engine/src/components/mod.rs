pub mod animation;
pub mod layer;
pub mod player;
pub mod sprite;
pub mod unit;
