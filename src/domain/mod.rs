pub mod drill;
pub mod enemy;
pub mod geom;
pub mod interaction;
pub mod pipe;
pub mod tile;
pub mod tilemap;
