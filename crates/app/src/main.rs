use bevy::prelude::*;
use bevy::window::PresentMode;
use bevy::winit::{UpdateMode, WinitSettings};
use clap::Parser;

use rendering::{FacadeRenderPlugin, FacadeSource};

mod cli;
mod compile_mode;
mod viewer;

use cli::Cli;
use viewer::{SpecWatch, ViewerCamera, ViewerPlugin};

fn main() {
    let cli = Cli::parse();

    // Headless mode: compile once, print the report and exit
    if cli.compile {
        std::process::exit(compile_mode::run_compile_mode(&cli));
    }

    let inputs = match cli.load() {
        Ok(inputs) => inputs,
        Err(err) => {
            eprintln!("facade-viewer: {err}");
            std::process::exit(compile_mode::EXIT_IO);
        }
    };
    let height = inputs.spec.total_height();
    let camera = ViewerCamera::framing(&inputs.placement, height);

    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: viewer::window_title(),
            resolution: (1280.0, 720.0).into(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    }))
    .insert_resource(WinitSettings {
        focused_mode: UpdateMode::reactive_low_power(std::time::Duration::from_millis(16)),
        unfocused_mode: UpdateMode::reactive_low_power(std::time::Duration::from_millis(100)),
    })
    .add_plugins((FacadeRenderPlugin, ViewerPlugin))
    .insert_resource(camera)
    .insert_resource(SpecWatch::new(cli.spec.clone()))
    .insert_resource(FacadeSource::new(
        inputs.spec,
        inputs.placement,
        inputs.registry,
        inputs.params,
    ));

    app.run();
}
