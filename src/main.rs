use std::{env, path::PathBuf, process};

use anyhow::{Context, Result};
use log::{error, info};
use pollster::FutureExt as _;
use winit::{
    dpi::LogicalSize,
    event::{DeviceEvent, Event, KeyboardInput, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use ember_lantern::{app::App, config::DemoConfig};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let config_path = env::args_os().nth(1).map(PathBuf::from);
    match &config_path {
        Some(path) => info!("Loading config from {}", path.display()),
        None => info!("Using built-in config"),
    }
    let config = DemoConfig::load_or_default(config_path.as_deref())?;

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(&config.window.title)
        .with_inner_size(LogicalSize::<u32> {
            width: config.window.width,
            height: config.window.height,
        })
        .build(&event_loop)
        .context("Failed to build window")?;

    let mut app = App::new(window, &config).block_on()?;

    event_loop.run(move |e, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match e {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::Resized(size) => app.on_resize(size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    app.on_resize(*new_inner_size)
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    app.on_mouse_button(button, state)
                }
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state,
                            virtual_keycode: Some(keycode),
                            ..
                        },
                    ..
                } => app.on_key(keycode, state),
                _ => (),
            },
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => app.on_mouse_move(delta),
            Event::MainEventsCleared => app.request_redraw(),
            Event::RedrawRequested(..) => {
                if let Err(e) = app.update() {
                    error!("{:#}", e);
                    process::exit(1);
                }
            }
            _ => (),
        }
    });
}
