// Application loop driven by a scripted window and the headless renderer

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use noctis::backend::context::NativeHandles;
use noctis::config::RendererConfig;
use noctis::{
    Application, Event, EventKind, FrameContext, KeyCode, Layer, Renderer, RendererApi,
    RendererError, UiOverlay, Window,
};

type Journal = Rc<RefCell<Vec<String>>>;
type Script = Rc<RefCell<VecDeque<Vec<EventKind>>>>;

/// Delivers one scripted batch of events per poll
struct ScriptedWindow {
    width: u32,
    height: u32,
    title: String,
    vsync: bool,
    script: Script,
}

impl ScriptedWindow {
    fn new(script: &Script) -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Scripted".to_string(),
            vsync: true,
            script: script.clone(),
        }
    }
}

impl Window for ScriptedWindow {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.vsync = enabled;
    }

    fn is_vsync(&self) -> bool {
        self.vsync
    }

    fn native_handles(&self) -> Option<NativeHandles> {
        None
    }

    fn poll_events(&mut self, callback: &mut dyn FnMut(&mut Event)) {
        let batch = self.script.borrow_mut().pop_front().unwrap_or_default();
        for kind in batch {
            if let EventKind::WindowResize { width, height } = kind {
                self.width = width;
                self.height = height;
            }
            callback(&mut Event::new(kind));
        }
    }
}

struct Recorder {
    name: String,
    journal: Journal,
    consumes_keys: bool,
    frames: Rc<RefCell<Vec<FrameContext>>>,
}

impl Recorder {
    fn boxed(name: &str, journal: &Journal, consumes_keys: bool) -> Box<dyn Layer> {
        Box::new(Self {
            name: name.to_string(),
            journal: journal.clone(),
            consumes_keys,
            frames: Rc::default(),
        })
    }

    fn log(&self, hook: &str) {
        self.journal.borrow_mut().push(format!("{} {}", hook, self.name));
    }
}

impl Layer for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_attach(&mut self) {
        self.log("attach");
    }

    fn on_detach(&mut self) {
        self.log("detach");
    }

    fn on_update(&mut self) {
        self.log("update");
    }

    fn on_render(&mut self, frame: &FrameContext) {
        self.frames.borrow_mut().push(*frame);
        self.log("render");
    }

    fn on_ui_render(&mut self) {
        self.log("ui");
    }

    fn on_event(&mut self, event: &mut Event) {
        self.log(&format!("event({})", event));
        let consumes = self.consumes_keys;
        event.dispatch(|kind| consumes && matches!(kind, EventKind::KeyPressed { .. }));
    }
}

struct RecordingOverlay {
    journal: Journal,
}

impl UiOverlay for RecordingOverlay {
    fn begin(&mut self) {
        self.journal.borrow_mut().push("ui begin".to_string());
    }

    fn end(&mut self, window: &mut dyn Window) {
        self.journal.borrow_mut().push("ui end".to_string());
        window.set_title("drawn");
    }
}

fn headless_app(script: &Script) -> Application {
    let _ = env_logger::builder().is_test(true).try_init();

    let window = ScriptedWindow::new(script);
    let config = RendererConfig {
        api: RendererApi::Headless,
        ..Default::default()
    };
    let renderer = Renderer::init(&config, &window, false).unwrap();
    Application::new(Box::new(window), renderer)
}

fn entries(journal: &Journal, prefix: &str) -> Vec<String> {
    journal
        .borrow()
        .iter()
        .filter(|entry| entry.starts_with(prefix))
        .cloned()
        .collect()
}

#[test]
fn attach_happens_once_before_any_hook() {
    let script = Script::default();
    let journal = Journal::default();
    let mut app = headless_app(&script);

    app.push_layer(Recorder::boxed("a", &journal, false));
    assert_eq!(*journal.borrow(), ["attach a"]);

    app.tick().unwrap();
    app.tick().unwrap();

    assert_eq!(entries(&journal, "attach"), ["attach a"]);
    assert_eq!(journal.borrow()[0], "attach a");
}

#[test]
fn overlays_update_last_and_see_events_first() {
    let script = Script::default();
    script.borrow_mut().push_back(vec![EventKind::KeyReleased { key: KeyCode::KeyA }]);
    let journal = Journal::default();
    let mut app = headless_app(&script);

    app.push_layer(Recorder::boxed("a", &journal, false));
    app.push_overlay(Recorder::boxed("overlay", &journal, false));
    app.push_layer(Recorder::boxed("b", &journal, false));

    app.tick().unwrap();

    assert_eq!(entries(&journal, "update"), ["update a", "update b", "update overlay"]);
    assert_eq!(entries(&journal, "render"), ["render a", "render b", "render overlay"]);
    assert_eq!(
        entries(&journal, "event"),
        [
            "event(KeyReleasedEvent: KeyA) overlay",
            "event(KeyReleasedEvent: KeyA) b",
            "event(KeyReleasedEvent: KeyA) a",
        ]
    );
}

#[test]
fn handled_event_stops_at_the_consumer() {
    let script = Script::default();
    let journal = Journal::default();
    let mut app = headless_app(&script);

    app.push_layer(Recorder::boxed("bottom", &journal, false));
    app.push_overlay(Recorder::boxed("consumer", &journal, true));

    let mut event = Event::new(EventKind::KeyPressed {
        key: KeyCode::Space,
        repeat: false,
    });
    app.on_event(&mut event);

    assert!(event.handled);
    let events = entries(&journal, "event");
    assert_eq!(events.len(), 1);
    assert!(events[0].ends_with("consumer"));

    // Unconsumed input still reaches the bottom layer
    app.on_event(&mut Event::new(EventKind::MouseMoved { x: 1.0, y: 2.0 }));
    assert_eq!(entries(&journal, "event").len(), 3);
}

#[test]
fn zero_size_resize_suspends_updates_until_restored() {
    let script = Script::default();
    {
        let mut script = script.borrow_mut();
        script.push_back(vec![EventKind::WindowResize { width: 0, height: 0 }]);
        script.push_back(vec![]);
        script.push_back(vec![EventKind::WindowResize {
            width: 1024,
            height: 768,
        }]);
        script.push_back(vec![]);
    }
    let journal = Journal::default();
    let mut app = headless_app(&script);
    app.push_layer(Recorder::boxed("a", &journal, false));

    app.tick().unwrap();
    assert!(app.is_minimized());
    app.tick().unwrap();
    app.tick().unwrap();
    assert!(!app.is_minimized());
    app.tick().unwrap();

    assert_eq!(entries(&journal, "update").len(), 2);
    assert_eq!(app.renderer().frame_counter(), 2);

    // Resize is not consumed by the application
    assert_eq!(
        entries(&journal, "event"),
        ["event(WindowResizeEvent: 0, 0) a", "event(WindowResizeEvent: 1024, 768) a"]
    );
    assert_eq!(app.window().width(), 1024);
}

#[test]
fn close_stops_the_loop_and_reaches_layers() {
    let script = Script::default();
    {
        let mut script = script.borrow_mut();
        script.push_back(vec![]);
        script.push_back(vec![]);
        script.push_back(vec![EventKind::WindowClose]);
    }
    let journal = Journal::default();
    let mut app = headless_app(&script);
    app.push_layer(Recorder::boxed("a", &journal, false));

    app.run().unwrap();

    assert!(!app.is_running());
    assert_eq!(app.renderer().frame_counter(), 3);
    assert_eq!(entries(&journal, "event"), ["event(WindowCloseEvent) a"]);

    app.shutdown().unwrap();
    assert_eq!(entries(&journal, "detach"), ["detach a"]);
}

#[test]
fn frame_slots_rotate_with_the_counter() {
    let script = Script::default();
    let journal = Journal::default();
    let frames = Rc::new(RefCell::new(Vec::new()));
    let mut app = headless_app(&script);
    app.push_layer(Box::new(Recorder {
        name: "a".to_string(),
        journal: journal.clone(),
        consumes_keys: false,
        frames: frames.clone(),
    }));

    for _ in 0..5 {
        app.tick().unwrap();
    }

    assert_eq!(app.renderer().frame_counter(), 5);
    for (k, frame) in frames.borrow().iter().enumerate() {
        assert_eq!(frame.frame_number, k as u64);
        assert_eq!(frame.slot, k % 2);
        assert_eq!(frame.extent.width, 800);
    }
}

#[test]
fn ui_overlay_brackets_ui_hooks() {
    let script = Script::default();
    let journal = Journal::default();
    let mut app = headless_app(&script);
    app.push_layer(Recorder::boxed("a", &journal, false));
    app.set_ui_overlay(Box::new(RecordingOverlay {
        journal: journal.clone(),
    }));

    app.tick().unwrap();

    let ui: Vec<String> = entries(&journal, "ui");
    assert_eq!(ui, ["ui begin", "ui a", "ui end"]);
    assert_eq!(app.window().title(), "drawn");
}

#[test]
fn close_request_from_code() {
    let script = Script::default();
    let mut app = headless_app(&script);
    assert!(app.is_running());
    app.close();
    app.run().unwrap();
    assert_eq!(app.renderer().frame_counter(), 0);
}

#[test]
fn unsupported_renderer_api_is_fatal() {
    let script = Script::default();
    let window = ScriptedWindow::new(&script);
    let config = RendererConfig {
        api: RendererApi::None,
        ..Default::default()
    };

    let err = Renderer::init(&config, &window, false).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<RendererError>(),
        Some(RendererError::UnsupportedApi(RendererApi::None))
    ));
}
