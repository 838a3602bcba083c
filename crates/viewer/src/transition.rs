use std::cell::RefCell;
use std::rc::Rc;

use futures_util::future::{self, Either};
use store::DatasetFetcher;
use tracing::debug;

use crate::controller::{ModeState, PerspectiveOutcome, ViewController, ViewError};
use crate::surface::{TaskHost, ViewMode};

/// Builds the terrain map, racing construction against the configured
/// timeout.
///
/// A build that loses the race keeps running on the host; when it finishes
/// its surface is handed back as stale and released.
pub async fn enter_perspective(
    controller: &Rc<RefCell<ViewController>>,
    host: &dyn TaskHost,
) -> Result<(), ViewError> {
    let request = controller.borrow_mut().begin_perspective();
    host.publish(&mut controller.borrow_mut());
    let request = request?;
    let ticket = request.ticket;
    let timer = host.sleep(request.timeout);
    let build = request.into_future();

    let outcome = match future::select(build, timer).await {
        Either::Left((res, _)) => PerspectiveOutcome::from(res),
        Either::Right(((), late)) => {
            debug!(%ticket, "3D build timed out");
            let controller = Rc::clone(controller);
            host.spawn(Box::pin(async move {
                let res = late.await;
                let _ = controller
                    .borrow_mut()
                    .complete_perspective(ticket, PerspectiveOutcome::from(res));
            }));
            PerspectiveOutcome::TimedOut
        }
    };
    let res = controller.borrow_mut().complete_perspective(ticket, outcome);
    host.publish(&mut controller.borrow_mut());
    res
}

/// Switches to whichever mode is not active and returns the new mode.
pub async fn toggle_view_mode(
    controller: &Rc<RefCell<ViewController>>,
    host: &dyn TaskHost,
) -> Result<ViewMode, ViewError> {
    let mode = controller.borrow().mode_state();
    match mode {
        ModeState::Planar => enter_perspective(controller, host).await?,
        _ => {
            let res = controller.borrow_mut().switch_to_planar();
            host.publish(&mut controller.borrow_mut());
            res?
        }
    }
    let mode = controller.borrow().view_mode();
    Ok(mode)
}

/// Fetches the configured dataset and installs it. Returns `false` when a
/// newer load superseded this one.
pub async fn load_dataset(
    controller: &RefCell<ViewController>,
    fetcher: &dyn DatasetFetcher,
    host: &dyn TaskHost,
) -> bool {
    let (ticket, location) = {
        let mut c = controller.borrow_mut();
        let ticket = c.begin_load();
        host.publish(&mut c);
        (ticket, c.config().dataset_path.clone())
    };
    let loaded = store::load(fetcher, &location).await;
    let installed = controller.borrow_mut().finish_load(ticket, loaded);
    host.publish(&mut controller.borrow_mut());
    installed
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use formats::{RiskCategory, sample_dataset};
    use pretty_assertions::assert_eq;
    use store::InMemoryFetcher;

    use super::{enter_perspective, load_dataset, toggle_view_mode};
    use crate::controller::{ModeState, ViewError};
    use crate::surface::{SurfaceError, ViewMode};
    use crate::testing::{
        FakeHost, PerspectiveScript, SurfaceEvent, controller_with_sample, fixture,
    };

    #[test]
    fn toggles_both_ways() {
        let (factory, _log, mut ctl) = fixture();
        ctl.initialize().unwrap();
        let ctl = Rc::new(RefCell::new(ctl));
        let host = FakeHost::default();

        let mode = pollster::block_on(toggle_view_mode(&ctl, &host)).unwrap();
        assert_eq!(mode, ViewMode::Perspective);
        assert_eq!(factory.engine_loads.get(), 1);
        assert_eq!(host.sleeps.borrow()[0], Duration::from_secs(30));

        let mode = pollster::block_on(toggle_view_mode(&ctl, &host)).unwrap();
        assert_eq!(mode, ViewMode::Planar);

        pollster::block_on(toggle_view_mode(&ctl, &host)).unwrap();
        assert_eq!(factory.engine_loads.get(), 1);
    }

    #[test]
    fn failed_build_reverts() {
        let (factory, _log, mut ctl) = fixture();
        ctl.initialize().unwrap();
        factory.script(PerspectiveScript::Fail(SurfaceError::MissingContainer(
            "landslide-map".to_string(),
        )));
        let ctl = Rc::new(RefCell::new(ctl));
        let err = pollster::block_on(enter_perspective(&ctl, &FakeHost::default())).unwrap_err();
        assert!(matches!(err, ViewError::ConstructionFailed(_)));
        assert_eq!(ctl.borrow().mode_state(), ModeState::Planar);
        assert!(ctl.borrow().has_surface());
    }

    #[test]
    fn engine_load_failure_is_reported() {
        let (factory, _log, mut ctl) = fixture();
        ctl.initialize().unwrap();
        factory.script(PerspectiveScript::EngineFail);
        let ctl = Rc::new(RefCell::new(ctl));
        let err = pollster::block_on(enter_perspective(&ctl, &FakeHost::default())).unwrap_err();
        assert_eq!(
            err.to_string(),
            "error creating 3D map: 3D engine failed to load: script blocked"
        );
        assert!(!ctl.borrow().engine_ready());
    }

    #[test]
    fn timeout_reverts_and_late_surface_is_released() {
        let (factory, log, mut ctl) = fixture();
        ctl.initialize().unwrap();
        factory.script(PerspectiveScript::YieldOnce);
        let ctl = Rc::new(RefCell::new(ctl));
        let host = FakeHost::default();

        let err = pollster::block_on(enter_perspective(&ctl, &host)).unwrap_err();
        assert!(matches!(err, ViewError::ConstructionTimeout(_)));
        assert_eq!(ctl.borrow().mode_state(), ModeState::Planar);
        assert_eq!(host.spawned_count(), 1);

        host.run_spawned();
        assert_eq!(ctl.borrow().mode_state(), ModeState::Planar);
        assert_eq!(
            log.count(|e| matches!(e, SurfaceEvent::Released(ViewMode::Perspective))),
            1
        );
        // The late build proved the engine works.
        assert!(ctl.borrow().engine_ready());
    }

    #[test]
    fn round_trip_restores_visibility_and_opacity() {
        let (mut ctl, log) = controller_with_sample();
        ctl.toggle_category(RiskCategory::High, false);
        ctl.set_opacity(0.25);
        let ctl = Rc::new(RefCell::new(ctl));
        let host = FakeHost::default();

        pollster::block_on(toggle_view_mode(&ctl, &host)).unwrap();
        log.clear();
        let mode = pollster::block_on(toggle_view_mode(&ctl, &host)).unwrap();
        assert_eq!(mode, ViewMode::Planar);

        let attached: Vec<SurfaceEvent> = log
            .events()
            .into_iter()
            .filter(|e| matches!(e, SurfaceEvent::Attach { .. }))
            .collect();
        assert_eq!(
            attached,
            vec![
                SurfaceEvent::Attach {
                    category: RiskCategory::Low,
                    visible: true,
                    opacity: 0.25
                },
                SurfaceEvent::Attach {
                    category: RiskCategory::Moderate,
                    visible: true,
                    opacity: 0.25
                },
                SurfaceEvent::Attach {
                    category: RiskCategory::High,
                    visible: false,
                    opacity: 0.25
                },
            ]
        );
        let c = ctl.borrow();
        assert!(!c.view_state().is_visible(RiskCategory::High));
        assert_eq!(c.view_state().opacity(), 0.25);
    }

    #[test]
    fn stalled_build_times_out() {
        let (factory, log, mut ctl) = fixture();
        ctl.initialize().unwrap();
        factory.script(PerspectiveScript::Never);
        let ctl = Rc::new(RefCell::new(ctl));
        let host = FakeHost::default();

        let err = pollster::block_on(enter_perspective(&ctl, &host)).unwrap_err();
        assert_eq!(err.to_string(), "map loading timed out after 30 seconds");
        assert_eq!(ctl.borrow().mode_state(), ModeState::Planar);
        assert!(ctl.borrow().has_surface());
        assert!(!ctl.borrow().notices().is_busy());
        assert_eq!(host.spawned_count(), 1);
        assert_eq!(
            log.count(|e| matches!(e, SurfaceEvent::Created(ViewMode::Perspective))),
            0
        );
    }

    #[test]
    fn load_falls_back_to_sample() {
        let (_factory, _log, mut ctl) = fixture();
        ctl.initialize().unwrap();
        let ctl = RefCell::new(ctl);
        assert!(pollster::block_on(load_dataset(
            &ctl,
            &InMemoryFetcher::new(),
            &FakeHost::default()
        )));
        let c = ctl.borrow();
        assert_eq!(c.store().dataset(), Some(&sample_dataset()));
        assert!(!c.notices().is_busy());
    }

    #[test]
    fn load_uses_configured_path() {
        let (_factory, _log, mut ctl) = fixture();
        ctl.initialize().unwrap();
        let mut fetcher = InMemoryFetcher::new();
        let mut ds = sample_dataset();
        ds.features.truncate(1);
        fetcher.insert(
            ctl.config().dataset_path.clone(),
            ds.to_geojson_string().unwrap(),
        );
        let ctl = RefCell::new(ctl);
        pollster::block_on(load_dataset(&ctl, &fetcher, &FakeHost::default()));
        assert_eq!(ctl.borrow().store().len(), 1);
    }
}
