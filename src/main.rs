//! scaffold2d demo
//!
//! Opens a window, loads a level (or a built-in platform and box) and lets
//! you push the first dynamic entity around:
//! - A / D: run
//! - Space: jump while grounded
//! - Escape: quit

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use macroquad::input::KeyCode;
use macroquad::prelude::{get_frame_time, next_frame, Conf};

use scaffold2d::game::BodyType;
use scaffold2d::{
    load_level, Controller, ControllerNode, Engine, EngineConfig, EngineContext, EntityRef, Level, LevelDef,
    MacroquadCanvas, MacroquadInput, PhysicalDef, Vec2,
};

const RUN_SPEED: f32 = 6.0;
const JUMP_SPEED: f32 = 60.0;
/// Ticks allowed per rendered frame before the simulation falls behind
const MAX_TICKS_PER_FRAME: u32 = 5;

#[derive(Parser)]
#[command(name = "scaffold2d")]
#[command(version, about = "2D physics scaffold demo")]
struct Cli {
    /// Engine configuration (RON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Level to load (JSON)
    #[arg(long)]
    level: Option<PathBuf>,

    /// Log filter, overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Write the default configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn window_conf() -> Conf {
    // errors are reported once logging is up; the window just falls back
    let config = load_config(&Cli::parse()).unwrap_or_default();
    Conf {
        window_title: config.window.title.clone(),
        window_width: config.window.width as i32,
        window_height: config.window.height as i32,
        fullscreen: config.window.fullscreen,
        ..Default::default()
    }
}

/// The built-in level: a platform with a box above it.
fn demo_level() -> LevelDef {
    LevelDef {
        graphic: Vec::new(),
        physical: vec![
            PhysicalDef::fixed(Vec2::new(5.0, 1.0), Vec2::new(8.0, 10.0)).with_box_fixture(),
            PhysicalDef::dynamic(Vec2::splat(0.5), Vec2::new(8.0, 0.0)).with_box_fixture(),
        ],
    }
}

struct PlayerController {
    level: LevelDef,
    player: Option<EntityRef>,
}

impl Controller for PlayerController {
    fn init(&mut self, ctx: &mut EngineContext) {
        ctx.add_inputs([KeyCode::A, KeyCode::D, KeyCode::Space, KeyCode::Escape]);

        match Level::spawn(&self.level, ctx) {
            Ok(level) => {
                self.player = level.physical.iter().copied().find(|e| {
                    ctx.entity(*e)
                        .and_then(|entity| entity.physical())
                        .is_some_and(|part| part.body_type() == BodyType::Dynamic)
                });
            }
            Err(e) => log::error!("level rejected: {}", e),
        }
        if self.player.is_none() {
            log::warn!("level has no dynamic entity to control");
        }
    }

    fn update(&mut self, ctx: &mut EngineContext) {
        if ctx.is_clicked(KeyCode::Escape) {
            ctx.close_window();
        }
        let Some(player) = self.player else {
            return;
        };

        let direction = ctx.is_pressed(KeyCode::D) as i32 - ctx.is_pressed(KeyCode::A) as i32;
        let jump = ctx.is_clicked(KeyCode::Space) && ctx.is_grounded(player);
        if let Some(part) = ctx.physical_mut(player) {
            part.set_x_velocity(direction as f32 * RUN_SPEED);
            if jump {
                part.set_y_velocity(-JUMP_SPEED);
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if let Some(path) = &cli.write_config {
        config
            .save(path)
            .with_context(|| format!("writing config {}", path.display()))?;
        log::info!("wrote configuration to {}", path.display());
        return Ok(());
    }

    let level = match &cli.level {
        Some(path) => load_level(path).with_context(|| format!("loading level {}", path.display()))?,
        None => demo_level(),
    };

    let tick = 1.0 / config.window.framerate.max(1) as f32;
    let mut engine = Engine::builder(config)
        .canvas(MacroquadCanvas::new())
        .input(MacroquadInput)
        .controllers(ControllerNode::new(PlayerController { level, player: None }))
        .build()
        .context("starting engine")?;

    let mut accumulator = 0.0;
    while engine.is_running() {
        accumulator += get_frame_time();
        let mut ticks = 0;
        while accumulator >= tick && ticks < MAX_TICKS_PER_FRAME && engine.is_running() {
            engine.update()?;
            accumulator -= tick;
            ticks += 1;
        }
        if ticks == MAX_TICKS_PER_FRAME {
            accumulator = 0.0;
        }

        engine.render()?;
        next_frame().await;
    }

    let ctx = engine.context_mut();
    for diagnostic in ctx.diagnostics.drain() {
        log::debug!("unhandled diagnostic: {}", diagnostic);
    }
    for rejected in ctx.take_rejected_spawns() {
        log::debug!("rejected spawn: {}", rejected);
    }
    log::info!("bye");
    Ok(())
}

#[macroquad::main(window_conf)]
async fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = &cli.log_level {
        logger.parse_filters(filter);
    }
    logger.init();

    log::info!("scaffold2d v{}", scaffold2d::VERSION);
    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
