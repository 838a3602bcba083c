//! In-memory surfaces and host for controller tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::task::Poll;
use std::time::Duration;

use formats::{RiskCategory, RiskDataset, sample_dataset};
use futures_util::future::{self, LocalBoxFuture};
use layers::CategoryLayer;
use store::{DatasetOrigin, LoadedDataset};

use crate::config::MapConfig;
use crate::controller::ViewController;
use crate::surface::{
    ControlKind, Decoration, MapSurface, PerspectiveView, PlanarView, SurfaceError,
    SurfaceFactory, TaskHost, ViewMode,
};

pub const TEST_TOKEN: &str = "pk.test-token-0123";

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Created(ViewMode),
    Attach {
        category: RiskCategory,
        visible: bool,
        opacity: f64,
    },
    Detach(RiskCategory),
    Visible(RiskCategory, bool),
    Opacity(RiskCategory, f64),
    Decoration(&'static str),
    Control(ControlKind),
    Chrome(bool),
    Released(ViewMode),
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceLog(Rc<RefCell<Vec<SurfaceEvent>>>);

impl SurfaceLog {
    pub fn push(&self, event: SurfaceEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&SurfaceEvent) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn chrome_changes(&self) -> Vec<bool> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Chrome(v) => Some(*v),
                _ => None,
            })
            .collect()
    }
}

pub struct FakeSurface {
    mode: ViewMode,
    log: SurfaceLog,
}

impl FakeSurface {
    pub fn new(mode: ViewMode, log: SurfaceLog) -> Self {
        Self { mode, log }
    }
}

impl MapSurface for FakeSurface {
    fn mode(&self) -> ViewMode {
        self.mode
    }

    fn attach_layer(&mut self, layer: &CategoryLayer) -> Result<(), SurfaceError> {
        self.log.push(SurfaceEvent::Attach {
            category: layer.category,
            visible: layer.style.visible,
            opacity: layer.style.fill_opacity,
        });
        Ok(())
    }

    fn detach_layer(&mut self, category: RiskCategory) {
        self.log.push(SurfaceEvent::Detach(category));
    }

    fn set_layer_visible(&mut self, category: RiskCategory, visible: bool) {
        self.log.push(SurfaceEvent::Visible(category, visible));
    }

    fn set_layer_opacity(&mut self, category: RiskCategory, opacity: f64) {
        self.log.push(SurfaceEvent::Opacity(category, opacity));
    }

    fn add_decoration(&mut self, decoration: &Decoration) -> Result<(), SurfaceError> {
        let name = match decoration {
            Decoration::Terrain(_) => "terrain",
            Decoration::Buildings(_) => "buildings",
        };
        self.log.push(SurfaceEvent::Decoration(name));
        Ok(())
    }

    fn add_control(&mut self, control: ControlKind) {
        self.log.push(SurfaceEvent::Control(control));
    }

    fn set_chrome_visible(&mut self, visible: bool) {
        self.log.push(SurfaceEvent::Chrome(visible));
    }

    fn release(&mut self) {
        self.log.push(SurfaceEvent::Released(self.mode));
    }
}

/// How the next terrain map build behaves.
#[derive(Debug, Clone)]
pub enum PerspectiveScript {
    Ready,
    Fail(SurfaceError),
    EngineFail,
    /// Never resolves.
    Never,
    /// Resolves on the second poll.
    YieldOnce,
}

pub struct FakeFactory {
    log: SurfaceLog,
    pub script: RefCell<PerspectiveScript>,
    pub engine_loads: Cell<usize>,
}

impl FakeFactory {
    pub fn new(log: SurfaceLog) -> Self {
        Self {
            log,
            script: RefCell::new(PerspectiveScript::Ready),
            engine_loads: Cell::new(0),
        }
    }

    pub fn script(&self, script: PerspectiveScript) {
        *self.script.borrow_mut() = script;
    }
}

fn yield_once() -> impl Future<Output = ()> {
    let mut yielded = false;
    future::poll_fn(move |cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
}

impl SurfaceFactory for FakeFactory {
    fn create_planar(&self, _view: &PlanarView) -> Result<Box<dyn MapSurface>, SurfaceError> {
        self.log.push(SurfaceEvent::Created(ViewMode::Planar));
        Ok(Box::new(FakeSurface::new(ViewMode::Planar, self.log.clone())))
    }

    fn load_perspective_engine(&self) -> LocalBoxFuture<'static, Result<(), SurfaceError>> {
        self.engine_loads.set(self.engine_loads.get() + 1);
        let res = match &*self.script.borrow() {
            PerspectiveScript::EngineFail => {
                Err(SurfaceError::EngineLoad("script blocked".to_string()))
            }
            _ => Ok(()),
        };
        Box::pin(future::ready(res))
    }

    fn create_perspective(
        &self,
        _view: &PerspectiveView,
    ) -> LocalBoxFuture<'static, Result<Box<dyn MapSurface>, SurfaceError>> {
        let log = self.log.clone();
        let script = self.script.borrow().clone();
        Box::pin(async move {
            match script {
                PerspectiveScript::Fail(err) => return Err(err),
                PerspectiveScript::EngineFail => {
                    return Err(SurfaceError::Construction("engine missing".to_string()));
                }
                PerspectiveScript::Never => future::pending::<()>().await,
                PerspectiveScript::YieldOnce => yield_once().await,
                PerspectiveScript::Ready => {}
            }
            log.push(SurfaceEvent::Created(ViewMode::Perspective));
            Ok(Box::new(FakeSurface::new(ViewMode::Perspective, log)) as Box<dyn MapSurface>)
        })
    }
}

/// Timers fire immediately; spawned tasks wait for [`FakeHost::run_spawned`].
#[derive(Default)]
pub struct FakeHost {
    spawned: RefCell<Vec<LocalBoxFuture<'static, ()>>>,
    pub sleeps: RefCell<Vec<Duration>>,
}

impl FakeHost {
    pub fn spawned_count(&self) -> usize {
        self.spawned.borrow().len()
    }

    pub fn run_spawned(&self) {
        let tasks = std::mem::take(&mut *self.spawned.borrow_mut());
        for task in tasks {
            pollster::block_on(task);
        }
    }
}

impl TaskHost for FakeHost {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        self.sleeps.borrow_mut().push(duration);
        Box::pin(future::ready(()))
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawned.borrow_mut().push(task);
    }
}

pub fn loaded(dataset: RiskDataset) -> LoadedDataset {
    LoadedDataset {
        dataset,
        origin: DatasetOrigin::Fetched {
            location: "test.geojson".to_string(),
        },
    }
}

pub fn fixture_with_token(token: Option<&str>) -> (Rc<FakeFactory>, SurfaceLog, ViewController) {
    let log = SurfaceLog::default();
    let factory = Rc::new(FakeFactory::new(log.clone()));
    let config = MapConfig {
        mapbox_token: token.map(str::to_string),
        ..MapConfig::default()
    };
    let ctl = ViewController::new(config, factory.clone());
    (factory, log, ctl)
}

pub fn fixture() -> (Rc<FakeFactory>, SurfaceLog, ViewController) {
    fixture_with_token(Some(TEST_TOKEN))
}

/// Initialized controller with the sample dataset attached.
pub fn controller_with_sample() -> (ViewController, SurfaceLog) {
    let (_factory, log, mut ctl) = fixture();
    ctl.initialize().expect("fake planar surface");
    let t = ctl.begin_load();
    ctl.finish_load(t, loaded(sample_dataset()));
    log.clear();
    (ctl, log)
}
