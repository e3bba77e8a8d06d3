//! Controller chain
//!
//! Gameplay code plugs in as a `Controller`. Controllers are linked into a
//! chain where each node owns at most one child; every hook runs on the node
//! itself first, then on its child, down to the end of the chain.

use crate::engine::EngineContext;
use crate::render::Canvas;

/// Gameplay hooks. All default to doing nothing.
pub trait Controller {
    /// Once, when the engine is built.
    fn init(&mut self, _ctx: &mut EngineContext) {}

    /// Every tick, after the physics step.
    fn update(&mut self, _ctx: &mut EngineContext) {}

    /// Every frame, after entities are drawn.
    fn render(&mut self, _ctx: &EngineContext, _canvas: &mut dyn Canvas) {}
}

/// One link of the chain.
pub struct ControllerNode {
    controller: Box<dyn Controller>,
    child: Option<Box<ControllerNode>>,
}

impl ControllerNode {
    pub fn new(controller: impl Controller + 'static) -> Self {
        Self {
            controller: Box::new(controller),
            child: None,
        }
    }

    /// Builder form of `set_child`.
    pub fn with_child(mut self, child: ControllerNode) -> Self {
        self.set_child(child);
        self
    }

    /// Replace this node's child, returning the old one.
    pub fn set_child(&mut self, child: ControllerNode) -> Option<ControllerNode> {
        self.child.replace(Box::new(child)).map(|old| *old)
    }

    pub fn child(&self) -> Option<&ControllerNode> {
        self.child.as_deref()
    }

    /// Nodes in the chain, this one included.
    pub fn len(&self) -> usize {
        1 + self.child.as_ref().map_or(0, |child| child.len())
    }

    pub fn on_init(&mut self, ctx: &mut EngineContext) {
        self.controller.init(ctx);
        if let Some(child) = &mut self.child {
            child.on_init(ctx);
        }
    }

    pub fn on_update(&mut self, ctx: &mut EngineContext) {
        self.controller.update(ctx);
        if let Some(child) = &mut self.child {
            child.on_update(ctx);
        }
    }

    pub fn on_render(&mut self, ctx: &EngineContext, canvas: &mut dyn Canvas) {
        self.controller.render(ctx, canvas);
        if let Some(child) = &mut self.child {
            child.on_render(ctx, canvas);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::render::HeadlessCanvas;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Controller for Recorder {
        fn init(&mut self, _ctx: &mut EngineContext) {
            self.log.borrow_mut().push(format!("{}:init", self.name));
        }

        fn update(&mut self, _ctx: &mut EngineContext) {
            self.log.borrow_mut().push(format!("{}:update", self.name));
        }

        fn render(&mut self, _ctx: &EngineContext, _canvas: &mut dyn Canvas) {
            self.log.borrow_mut().push(format!("{}:render", self.name));
        }
    }

    struct Silent;
    impl Controller for Silent {}

    fn chain(log: &Rc<RefCell<Vec<String>>>) -> ControllerNode {
        let node = |name| Recorder { name, log: log.clone() };
        ControllerNode::new(node("root"))
            .with_child(ControllerNode::new(node("mid")).with_child(ControllerNode::new(node("leaf"))))
    }

    #[test]
    fn test_hooks_run_parent_then_child() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut root = chain(&log);
        let mut ctx = EngineContext::new(EngineConfig::default());
        let mut canvas = HeadlessCanvas::new();

        root.on_init(&mut ctx);
        root.on_update(&mut ctx);
        root.on_render(&ctx, &mut canvas);

        assert_eq!(
            *log.borrow(),
            vec![
                "root:init", "mid:init", "leaf:init",
                "root:update", "mid:update", "leaf:update",
                "root:render", "mid:render", "leaf:render",
            ]
        );
    }

    #[test]
    fn test_default_hooks_are_noops() {
        let mut node = ControllerNode::new(Silent);
        let mut ctx = EngineContext::new(EngineConfig::default());
        node.on_init(&mut ctx);
        node.on_update(&mut ctx);
        assert_eq!(node.len(), 1);
        assert!(node.child().is_none());
    }

    #[test]
    fn test_set_child_replaces() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut root = chain(&log);
        assert_eq!(root.len(), 3);

        let old = root.set_child(ControllerNode::new(Silent));
        assert_eq!(old.map(|n| n.len()), Some(2));
        assert_eq!(root.len(), 2);
    }
}
