// Noctis sandbox
//
// Loads config.toml, sets up logging, opens the window and runs the
// application with a single example layer until the window closes.

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;

use noctis::{Application, Config, Event, EventKind, FrameStatsOverlay, KeyCode, Layer};

fn main() -> Result<()> {
    let (config, source) = Config::load();

    init_logging(&config);
    log::info!("Starting Noctis");
    source.log();
    log::info!(
        "Window: {}x{} ({})",
        config.window.width,
        config.window.height,
        if config.window.fullscreen { "fullscreen" } else { "windowed" }
    );
    log::info!("Renderer: {:?}, present mode: {}", config.renderer.api, config.renderer.present_mode);

    if let Err(e) = run(&config) {
        log::error!("Fatal: {:#}", e);
        return Err(e);
    }

    log::info!("Exited cleanly");
    Ok(())
}

fn run(config: &Config) -> Result<()> {
    let mut app = Application::from_config(config)?;

    app.push_layer(Box::new(ExampleLayer::default()));
    if config.debug.show_fps {
        app.set_ui_overlay(Box::new(FrameStatsOverlay::new(config.window.display_title())));
    }

    app.run()?;
    app.shutdown()
}

/// Initialize logging with the configured level and optional file output.
/// `RUST_LOG` takes precedence over the config file.
fn init_logging(config: &Config) {
    use env_logger::{Builder, Env, Target};

    let mut builder =
        Builder::from_env(Env::default().default_filter_or(config.debug.level_filter().as_str()));

    if config.debug.log_to_file {
        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "=== Noctis Log ===");
                let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
                let _ = writeln!(file);
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Could not open log file {}: {}", config.debug.log_file, e),
        }
    }

    builder.init();
}

/// Logs keyboard input and consumes Tab presses
#[derive(Default)]
struct ExampleLayer {
    updates: u64,
}

impl Layer for ExampleLayer {
    fn name(&self) -> &str {
        "Example"
    }

    fn on_attach(&mut self) {
        log::info!("Example layer attached");
    }

    fn on_detach(&mut self) {
        log::info!("Example layer detached after {} updates", self.updates);
    }

    fn on_update(&mut self) {
        self.updates += 1;
    }

    fn on_event(&mut self, event: &mut Event) {
        event.dispatch(|kind| match kind {
            EventKind::KeyPressed { key: KeyCode::Tab, .. } => {
                log::info!("Tab key is pressed");
                true
            }
            EventKind::KeyPressed { key, repeat: false } => {
                log::debug!("Key pressed: {:?}", key);
                false
            }
            _ => false,
        });
    }
}
