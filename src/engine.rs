//! Engine and per-tick orchestration
//!
//! `EngineContext` is the state controllers see: the entity registry, the
//! physics world, input counters, pending commands and diagnostics.
//! `Engine` owns a context plus the collaborators (canvas, input source,
//! controller chain) and drives the fixed tick:
//!
//! ```text
//! update: poll window -> refresh input -> pre-step -> physics step
//!         -> post-step -> flush commands -> controller update
//! render: clear -> entities (+ hitboxes) -> controller render -> display
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use macroquad::color::BLACK;

use crate::config::EngineConfig;
use crate::controller::ControllerNode;
use crate::error::{Diagnostic, Diagnostics, EngineError, LevelError};
use crate::game::{CommandQueue, Entity, EntityDef, EntityRef, EntityRegistry, PhysicalPart};
use crate::input::{self, InputId, InputSource, InputState, ScriptedInput};
use crate::math::Vec2;
use crate::physics::{ContactBinding, ContactListener, PhysicsWorld};
use crate::render::{Canvas, WindowEvent};

/// Engines currently alive in this process.
static LIVE_ENGINES: AtomicUsize = AtomicUsize::new(0);

/// Number of engines currently alive in this process.
pub fn live_engines() -> usize {
    LIVE_ENGINES.load(Ordering::SeqCst)
}

// =============================================================================
// Context
// =============================================================================

pub struct EngineContext {
    pub registry: EntityRegistry,
    pub physics: PhysicsWorld,
    pub input: InputState,
    pub commands: CommandQueue,
    pub diagnostics: Diagnostics,
    rejected_spawns: Vec<LevelError>,
    config: EngineConfig,
    window_open: bool,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: EntityRegistry::new(config.render.scale),
            physics: PhysicsWorld::new(&config.physics, config.material),
            input: InputState::new(),
            commands: CommandQueue::new(),
            diagnostics: Diagnostics::new(),
            rejected_spawns: Vec::new(),
            config,
            window_open: true,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    /// Ask the engine to stop after this tick.
    pub fn close_window(&mut self) {
        self.window_open = false;
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Create an entity right away. Not usable from inside a contact
    /// listener; queue through `commands` there instead.
    pub fn spawn(&mut self, def: impl Into<EntityDef>) -> Result<EntityRef, LevelError> {
        self.registry.create(def.into(), &mut self.physics)
    }

    /// Remove an entity right away. Stale references are reported and ignored.
    pub fn despawn(&mut self, entity: EntityRef) -> bool {
        self.registry.remove(entity, &mut self.physics, &mut self.diagnostics)
    }

    pub fn entity(&self, entity: EntityRef) -> Option<&Entity> {
        self.registry.get(entity)
    }

    /// Physical part of a live entity. A stale reference is reported.
    pub fn physical_mut(&mut self, entity: EntityRef) -> Option<&mut PhysicalPart> {
        if !self.registry.contains(entity) {
            self.diagnostics.report(Diagnostic::StaleEntity(entity));
            return None;
        }
        self.registry.get_mut(entity).and_then(Entity::physical_mut)
    }

    /// Contact binding of a live physical entity.
    pub fn binding(&self, entity: EntityRef) -> Option<&ContactBinding> {
        let body = self.registry.get(entity)?.body()?;
        self.physics.binding(body)
    }

    pub fn is_grounded(&self, entity: EntityRef) -> bool {
        self.binding(entity).is_some_and(|b| b.grounded)
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn add_input(&mut self, id: impl Into<InputId>) {
        self.input.add_input(id);
    }

    pub fn add_inputs<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<InputId>,
    {
        self.input.add_inputs(ids);
    }

    /// Frame counter of a registered input. Unregistered inputs read as 0
    /// and are reported.
    pub fn frames(&mut self, id: impl Into<InputId>) -> i64 {
        let id = id.into();
        match self.input.get(id) {
            Some(frames) => frames,
            None => {
                self.diagnostics.report(Diagnostic::UnknownInput(id));
                0
            }
        }
    }

    pub fn is_pressed(&mut self, id: impl Into<InputId>) -> bool {
        input::is_pressed(self.frames(id))
    }

    pub fn is_clicked(&mut self, id: impl Into<InputId>) -> bool {
        input::is_clicked(self.frames(id))
    }

    /// Last mouse position in view coordinates (window pixel plus view offset).
    pub fn mouse_position(&self) -> Vec2 {
        self.input.mouse_position()
    }

    /// Last mouse position in world units: view coordinates over the render scale.
    pub fn mouse_world_position(&self) -> Vec2 {
        self.input.mouse_position() / self.config.render.scale
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    /// One simulation tick without the window or controllers: pre-step,
    /// physics step, post-step, then the command flush. Returns the entities
    /// spawned by the flush; spawns it rejected are kept for
    /// `take_rejected_spawns`.
    pub fn step(&mut self) -> Vec<EntityRef> {
        self.registry
            .pre_step(&mut self.physics, &self.config.gravity, &self.config.velocity_cap);
        self.physics.step(&mut self.commands);
        self.registry.post_step(&self.physics);
        let outcome = self
            .registry
            .apply_commands(&mut self.commands, &mut self.physics, &mut self.diagnostics);
        self.rejected_spawns.extend(outcome.rejected);
        outcome.spawned
    }

    /// Deferred spawns rejected since the last call.
    pub fn take_rejected_spawns(&mut self) -> Vec<LevelError> {
        std::mem::take(&mut self.rejected_spawns)
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct Engine {
    ctx: EngineContext,
    canvas: Option<Box<dyn Canvas>>,
    input: Box<dyn InputSource>,
    controllers: Option<ControllerNode>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    pub fn set_canvas(&mut self, canvas: Box<dyn Canvas>) {
        self.canvas = Some(canvas);
    }

    pub fn take_canvas(&mut self) -> Option<Box<dyn Canvas>> {
        self.canvas.take()
    }

    pub fn set_input_source(&mut self, source: Box<dyn InputSource>) {
        self.input = source;
    }

    pub fn is_running(&self) -> bool {
        self.ctx.window_open
    }

    /// Advance one tick.
    pub fn update(&mut self) -> Result<(), EngineError> {
        let canvas = self
            .canvas
            .as_deref_mut()
            .ok_or(EngineError::MissingCollaborator("canvas"))?;

        for event in canvas.poll_events() {
            match event {
                WindowEvent::Closed => {
                    log::info!("window closed");
                    self.ctx.window_open = false;
                }
                WindowEvent::MouseMoved(pixel) => {
                    let coords = canvas.map_pixel_to_coords(pixel);
                    self.ctx.input.set_mouse_position(coords);
                }
            }
        }
        self.ctx.input.refresh(&*self.input);

        self.ctx.step();

        if let Some(controllers) = &mut self.controllers {
            controllers.on_update(&mut self.ctx);
        }
        Ok(())
    }

    /// Draw one frame.
    pub fn render(&mut self) -> Result<(), EngineError> {
        let canvas = self
            .canvas
            .as_deref_mut()
            .ok_or(EngineError::MissingCollaborator("canvas"))?;

        canvas.clear(BLACK);
        self.ctx
            .registry
            .render(canvas, self.ctx.config.render.show_hitboxes);
        if let Some(controllers) = &mut self.controllers {
            controllers.on_render(&self.ctx, canvas);
        }
        canvas.display();
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        LIVE_ENGINES.fetch_sub(1, Ordering::SeqCst);
        log::debug!("engine dropped, {} still alive", live_engines());
    }
}

// =============================================================================
// Builder
// =============================================================================

pub struct EngineBuilder {
    config: EngineConfig,
    canvas: Option<Box<dyn Canvas>>,
    input: Option<Box<dyn InputSource>>,
    listener: Option<Box<dyn ContactListener>>,
    controllers: Option<ControllerNode>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            canvas: None,
            input: None,
            listener: None,
            controllers: None,
        }
    }

    pub fn canvas(mut self, canvas: impl Canvas + 'static) -> Self {
        self.canvas = Some(Box::new(canvas));
        self
    }

    /// Defaults to a source with nothing held.
    pub fn input(mut self, source: impl InputSource + 'static) -> Self {
        self.input = Some(Box::new(source));
        self
    }

    /// Replaces the default grounding listener.
    pub fn contact_listener(mut self, listener: impl ContactListener + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn controllers(mut self, root: ControllerNode) -> Self {
        self.controllers = Some(root);
        self
    }

    /// Validate the configuration, claim an instance slot and run the
    /// controllers' `init`.
    pub fn build(self) -> Result<Engine, EngineError> {
        self.config.validate()?;

        let previous = LIVE_ENGINES.fetch_add(1, Ordering::SeqCst);
        if previous > 0 && !self.config.allow_multiple_instances {
            LIVE_ENGINES.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::InstanceLimit { live: previous });
        }

        let mut ctx = EngineContext::new(self.config);
        if let Some(listener) = self.listener {
            ctx.physics.set_contact_listener(listener);
        }
        log::info!(
            "engine started: timestep {:.4}s, render scale {}, {} live",
            ctx.physics.timestep(),
            ctx.config.render.scale,
            previous + 1
        );

        let mut engine = Engine {
            ctx,
            canvas: self.canvas,
            input: self.input.unwrap_or_else(|| Box::new(ScriptedInput::new())),
            controllers: self.controllers,
        };
        if let Some(controllers) = &mut engine.controllers {
            controllers.on_init(&mut engine.ctx);
        }
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::game::{GraphicDef, PhysicalDef};
    use crate::render::{DrawCall, DrawRect, HeadlessCanvas, RenderStates, View};
    use macroquad::color::Color;
    use macroquad::input::KeyCode;
    use crate::game::Command;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Engines share a process-wide counter; tests that build one run one at a time.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn headless() -> Engine {
        Engine::builder(EngineConfig::default())
            .canvas(HeadlessCanvas::new())
            .build()
            .unwrap()
    }

    fn platform() -> PhysicalDef {
        PhysicalDef::fixed(Vec2::new(5.0, 1.0), Vec2::new(8.0, 10.0)).with_box_fixture()
    }

    fn crate_box(position: Vec2) -> PhysicalDef {
        PhysicalDef::dynamic(Vec2::splat(0.5), position).with_box_fixture()
    }

    #[test]
    fn test_box_lands_on_platform() {
        let _guard = serial();
        let mut engine = headless();
        let ctx = engine.context_mut();
        let floor = ctx.spawn(platform()).unwrap();
        let falling = ctx.spawn(crate_box(Vec2::new(8.0, 0.0))).unwrap();

        let mut landed = false;
        for _ in 0..240 {
            engine.update().unwrap();
            let ctx = engine.context();
            if ctx.is_grounded(falling) && ctx.binding(falling).unwrap().is_touching(floor) {
                landed = true;
                break;
            }
        }
        assert!(landed);

        let ctx = engine.context();
        let normal = ctx.binding(falling).unwrap().contact_with(floor).unwrap().normal;
        assert!(normal.x.abs() < 0.1, "normal {:?}", normal);
        assert!(normal.y > 0.9, "normal {:?}", normal);

        // the platform sees the same contact from the other side
        let back = ctx.binding(floor).unwrap().contact_with(falling).unwrap().normal;
        assert!(back.y < -0.9);
        assert!(!ctx.is_grounded(floor));

        let resting = ctx.entity(falling).unwrap().position();
        assert!(resting.y < 10.0 && resting.y > 7.0, "box at {:?}", resting);
    }

    #[test]
    fn test_separated_bodies_never_touch() {
        let _guard = serial();
        let mut engine = headless();
        let ctx = engine.context_mut();
        let left = ctx.spawn(crate_box(Vec2::new(-50.0, 0.0))).unwrap();
        let right = ctx.spawn(crate_box(Vec2::new(50.0, 0.0))).unwrap();

        for _ in 0..100 {
            engine.update().unwrap();
            let ctx = engine.context();
            assert_eq!(ctx.binding(left).unwrap().contact_count(), 0);
            assert_eq!(ctx.binding(right).unwrap().contact_count(), 0);
        }
    }

    #[test]
    fn test_second_instance_is_refused() {
        let _guard = serial();
        let first = headless();
        let before = live_engines();

        let second = Engine::builder(EngineConfig::default()).build();
        assert!(matches!(second, Err(EngineError::InstanceLimit { live: 1 })));
        assert_eq!(live_engines(), before);

        let config = EngineConfig {
            allow_multiple_instances: true,
            ..EngineConfig::default()
        };
        let third = Engine::builder(config).build().unwrap();
        assert_eq!(live_engines(), 2);

        drop(third);
        drop(first);
        assert_eq!(live_engines(), 0);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let _guard = serial();
        let mut config = EngineConfig::default();
        config.physics.timestep = 0.0;
        assert!(matches!(Engine::builder(config).build(), Err(EngineError::Config(_))));
        assert_eq!(live_engines(), 0);
    }

    #[test]
    fn test_missing_canvas_is_fatal() {
        let _guard = serial();
        let mut engine = Engine::builder(EngineConfig::default()).build().unwrap();
        engine.context_mut().spawn(crate_box(Vec2::ZERO)).unwrap();

        assert!(matches!(engine.update(), Err(EngineError::MissingCollaborator("canvas"))));
        assert!(matches!(engine.render(), Err(EngineError::MissingCollaborator("canvas"))));
        // nothing ran
        assert_eq!(engine.context().physics.steps(), 0);

        engine.set_canvas(Box::new(HeadlessCanvas::new()));
        assert!(engine.update().is_ok());
        assert_eq!(engine.context().physics.steps(), 1);
    }

    #[test]
    fn test_window_events() {
        let _guard = serial();
        let mut canvas = HeadlessCanvas::new();
        canvas.set_view(View { offset: Vec2::new(10.0, -2.0) });
        canvas.push_event(WindowEvent::MouseMoved(Vec2::new(5.0, 5.0)));
        canvas.push_event(WindowEvent::Closed);

        let mut engine = Engine::builder(EngineConfig::default()).canvas(canvas).build().unwrap();
        assert!(engine.is_running());
        engine.update().unwrap();
        assert!(!engine.is_running());
        assert_eq!(engine.context().mouse_position(), Vec2::new(15.0, 3.0));

        let scale = engine.context().config().render.scale;
        let world = engine.context().mouse_world_position();
        assert!((world.x - 15.0 / scale).abs() < 1e-5);
        assert!((world.y - 3.0 / scale).abs() < 1e-5);
    }

    #[test]
    fn test_input_counts_and_diagnostics() {
        let _guard = serial();
        let mut engine = headless();
        engine.context_mut().add_input(KeyCode::Space);

        let mut source = ScriptedInput::new();
        source.press(KeyCode::Space);
        engine.set_input_source(Box::new(source));
        engine.update().unwrap();

        let ctx = engine.context_mut();
        assert!(ctx.is_clicked(KeyCode::Space));
        assert_eq!(ctx.frames(KeyCode::W), 0);
        assert!(!ctx.is_pressed(KeyCode::W));
        assert_eq!(
            ctx.diagnostics.drain().collect::<Vec<_>>(),
            vec![
                Diagnostic::UnknownInput(InputId::Key(KeyCode::W)),
                Diagnostic::UnknownInput(InputId::Key(KeyCode::W)),
            ]
        );

        engine.update().unwrap();
        let ctx = engine.context_mut();
        assert_eq!(ctx.frames(KeyCode::Space), 2);
        assert!(!ctx.is_clicked(KeyCode::Space));
    }

    /// Lets a test keep looking at the canvas the engine draws into.
    struct Shared(Rc<RefCell<HeadlessCanvas>>);

    impl Canvas for Shared {
        fn clear(&mut self, color: Color) {
            self.0.borrow_mut().clear(color);
        }
        fn draw_rect(&mut self, rect: &DrawRect, states: &RenderStates) {
            self.0.borrow_mut().draw_rect(rect, states);
        }
        fn draw_outline(&mut self, points: &[Vec2], states: &RenderStates) {
            self.0.borrow_mut().draw_outline(points, states);
        }
        fn display(&mut self) {
            self.0.borrow_mut().display();
        }
        fn poll_events(&mut self) -> Vec<WindowEvent> {
            self.0.borrow_mut().poll_events()
        }
        fn view(&self) -> View {
            self.0.borrow().view()
        }
        fn set_view(&mut self, view: View) {
            self.0.borrow_mut().set_view(view);
        }
    }

    /// Draws a marker line after the entities.
    struct Overlay;

    impl Controller for Overlay {
        fn render(&mut self, _ctx: &EngineContext, canvas: &mut dyn Canvas) {
            canvas.draw_outline(&[Vec2::ZERO, Vec2::ONE], &RenderStates::default());
        }
    }

    #[test]
    fn test_render_order() {
        let _guard = serial();
        let canvas = Rc::new(RefCell::new(HeadlessCanvas::new()));
        let mut config = EngineConfig::default();
        config.render.show_hitboxes = false;
        let mut engine = Engine::builder(config)
            .canvas(Shared(canvas.clone()))
            .controllers(ControllerNode::new(Overlay))
            .build()
            .unwrap();
        engine
            .context_mut()
            .spawn(GraphicDef::new(Vec2::ONE, Vec2::new(2.0, 2.0)))
            .unwrap();

        engine.render().unwrap();
        let calls = canvas.borrow_mut().take_calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], DrawCall::Clear(BLACK));
        assert!(matches!(calls[1], DrawCall::Rect { position, .. } if position == Vec2::new(2.0, 2.0)));
        assert!(matches!(calls[2], DrawCall::Outline { .. }));
        assert_eq!(calls[3], DrawCall::Display);
        assert_eq!(canvas.borrow().frames(), 1);
    }

    /// Spawns a box on init and despawns it on the first update.
    struct Janitor {
        spawned: Option<EntityRef>,
    }

    impl Controller for Janitor {
        fn init(&mut self, ctx: &mut EngineContext) {
            self.spawned = ctx.spawn(crate_box(Vec2::ZERO)).ok();
        }

        fn update(&mut self, ctx: &mut EngineContext) {
            if let Some(entity) = self.spawned.take() {
                ctx.commands.despawn(entity);
            }
        }
    }

    /// Queues a spawn that cannot be built, then counts its updates.
    struct BadSpawner {
        updates: Rc<Cell<u32>>,
    }

    impl Controller for BadSpawner {
        fn update(&mut self, ctx: &mut EngineContext) {
            if self.updates.get() == 0 {
                let def = PhysicalDef::dynamic(Vec2::ONE, Vec2::ZERO).with_fixture(vec![Vec2::ZERO, Vec2::X]);
                ctx.commands.push(Command::Spawn(def.into()));
            }
            self.updates.set(self.updates.get() + 1);
        }
    }

    #[test]
    fn test_rejected_spawn_keeps_the_tick_going() {
        let _guard = serial();
        let updates = Rc::new(Cell::new(0));
        let mut engine = Engine::builder(EngineConfig::default())
            .canvas(HeadlessCanvas::new())
            .controllers(ControllerNode::new(BadSpawner { updates: updates.clone() }))
            .build()
            .unwrap();

        engine.update().unwrap();
        // the flush in this tick rejects the spawn; controllers still run
        engine.update().unwrap();
        assert_eq!(updates.get(), 2);
        assert!(engine.is_running());

        let ctx = engine.context_mut();
        assert!(ctx.registry.is_empty());
        let rejected = ctx.take_rejected_spawns();
        assert_eq!(rejected.len(), 1);
        assert!(matches!(rejected[0], LevelError::TooFewVertices { .. }));
        assert!(ctx.take_rejected_spawns().is_empty());
    }

    #[test]
    fn test_two_footed_body_stays_touching_while_one_foot_is_down() {
        let mut ctx = EngineContext::new(EngineConfig::default());
        let floor = ctx.spawn(platform()).unwrap();
        let walker = ctx
            .spawn(
                PhysicalDef::dynamic(Vec2::new(1.0, 0.5), Vec2::new(10.0, 7.0))
                    .with_fixture(vec![
                        Vec2::new(-1.0, 0.1),
                        Vec2::new(-0.6, 0.1),
                        Vec2::new(-0.6, 0.5),
                        Vec2::new(-1.0, 0.5),
                    ])
                    .with_fixture(vec![
                        Vec2::new(0.6, 0.1),
                        Vec2::new(1.0, 0.1),
                        Vec2::new(1.0, 0.5),
                        Vec2::new(0.6, 0.5),
                    ]),
            )
            .unwrap();

        let mut grounded_without_contact = 0;
        let mut one_foot_ticks = 0;
        for _ in 0..180 {
            if let Some(part) = ctx.physical_mut(walker) {
                part.set_x_velocity(4.0);
            }
            ctx.step();

            let touching = ctx.binding(walker).unwrap().is_touching(floor);
            if ctx.is_grounded(walker) && !touching {
                grounded_without_contact += 1;
            }
            // platform ends at x = 13: only the left foot can be over it
            let x = ctx.entity(walker).unwrap().position().x;
            if touching && x > 12.5 && x < 13.5 {
                one_foot_ticks += 1;
                assert_eq!(ctx.binding(walker).unwrap().touching_pairs(floor), 1);
                assert_eq!(ctx.binding(floor).unwrap().touching_pairs(walker), 1);
            }
        }
        assert_eq!(grounded_without_contact, 0);
        assert!(one_foot_ticks > 0);
    }

    #[test]
    fn test_controllers_drive_the_registry() {
        let _guard = serial();
        let mut engine = Engine::builder(EngineConfig::default())
            .canvas(HeadlessCanvas::new())
            .controllers(ControllerNode::new(Janitor { spawned: None }))
            .build()
            .unwrap();
        assert_eq!(engine.context().registry.len(), 1);

        // queued during the first update, applied by the second tick's flush
        engine.update().unwrap();
        assert_eq!(engine.context().registry.len(), 1);
        engine.update().unwrap();
        assert!(engine.context().registry.is_empty());
        assert_eq!(engine.context().physics.body_count(), 0);
    }
}
