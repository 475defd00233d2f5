use std::cell::RefCell;
use std::rc::Rc;
use vistra_core::{
    ChannelData, ChannelKind, GeometryKind, ObjectId, ObjectRegistry, Session, StepLoadError,
    StepLoader, StepOutcome,
};

/// Loader fixture that records its invocations and registers one object
/// per loaded step.
struct RecordingLoader {
    calls: Rc<RefCell<Vec<i32>>>,
    fail_on: Option<i32>,
}

impl StepLoader for RecordingLoader {
    fn load_step(
        &mut self,
        step: i32,
        objects: &mut ObjectRegistry,
    ) -> Result<Vec<ObjectId>, StepLoadError> {
        self.calls.borrow_mut().push(step);
        if self.fail_on == Some(step) {
            return Err(StepLoadError::new("simulated unreadable data source"));
        }
        let id = objects.create(format!("step-{step}"));
        objects
            .get_mut(id)
            .expect("object just created")
            .geometry_mut(GeometryKind::Points)
            .append(
                ChannelKind::Vertices,
                ChannelData::Float(vec![step as f32, 0.0, 0.0]),
            )
            .map_err(|err| StepLoadError::new(err.to_string()))?;
        Ok(vec![id])
    }
}

fn session_with_loader(fail_on: Option<i32>) -> (Session, Rc<RefCell<Vec<i32>>>) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut session = Session::new();
    session.model_mut().set_timesteps(vec![0, 10, 20]);
    session.model_mut().set_loader(Box::new(RecordingLoader {
        calls: Rc::clone(&calls),
        fail_on,
    }));
    (session, calls)
}

#[test]
fn repeated_load_step_invokes_the_loader_at_most_once() {
    let (mut session, calls) = session_with_loader(None);

    let first = session.load_step(10, false).expect("first load");
    assert!(matches!(first, StepOutcome::Loaded(10)));
    let active_after_first: Vec<ObjectId> = session.model().active_objects().to_vec();

    let second = session.load_step(10, false).expect("second load");
    assert!(matches!(second, StepOutcome::AlreadyResident(10)));
    assert_eq!(session.model().active_objects(), active_after_first);

    assert_eq!(calls.borrow().as_slice(), [10]);
}

#[test]
fn stepping_back_reuses_the_resident_cache() {
    let (mut session, calls) = session_with_loader(None);

    session.load_step(0, false).expect("step 0");
    session.load_step(10, false).expect("step 10");
    session.load_step(0, false).expect("back to step 0");

    // No third loader invocation: step 0 came from the cache.
    assert_eq!(calls.borrow().as_slice(), [0, 10]);
    assert_eq!(session.model().current_step(), Some(0));
}

#[test]
fn force_reload_invokes_the_loader_again() {
    let (mut session, calls) = session_with_loader(None);

    session.load_step(0, false).expect("initial load");
    session.load_step(0, true).expect("forced reload");
    assert_eq!(calls.borrow().as_slice(), [0, 0]);
}

#[test]
fn failed_load_reports_recoverable_error_and_keeps_prior_step() {
    let (mut session, _calls) = session_with_loader(Some(20));

    session.load_step(10, false).expect("healthy step");
    let err = session.load_step(20, false).expect_err("failing step");
    assert!(err.to_string().contains("unreadable"));

    // The model stayed at the previously loaded timestep; a retry with a
    // different step succeeds.
    assert_eq!(session.model().current_step(), Some(10));
    session.load_step(0, false).expect("recovery load");
    assert_eq!(session.model().current_step(), Some(0));
}

#[test]
fn try_step_clamps_instead_of_wrapping() {
    let (mut session, calls) = session_with_loader(None);

    session.try_step(1).expect("enter the sequence");
    assert_eq!(session.model().current_step(), Some(0));

    let clamped = session.try_step(-1).expect("clamp at the start");
    assert!(matches!(clamped, StepOutcome::Clamped(0)));

    session.try_step(10).expect("clamp to the last step");
    assert_eq!(session.model().current_step(), Some(20));

    let end = session.try_step(1).expect("clamp at the end");
    assert!(matches!(end, StepOutcome::Clamped(20)));

    // Clamped no-ops never reached the loader.
    assert_eq!(calls.borrow().as_slice(), [0, 20]);
}

#[test]
fn view_fit_is_requested_not_automatic() {
    let (mut session, _calls) = session_with_loader(None);

    session.load_step(10, false).expect("load step");
    // Stepping alone never moves the camera.
    assert!(session.view().bounds().is_none());

    session.fit_view_to_active().expect("explicit fit");
    assert!(session.view().bounds().is_some());
}
