pub mod app;
pub mod assets;
pub mod camera;
pub mod config;
pub mod input;
pub mod particles;
pub mod renderer;
pub mod scene;
pub mod spotlight;
pub mod window;
