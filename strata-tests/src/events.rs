use crate::model::Event;
use strata::{DataContext, Driver, params};
use time::macros::datetime;

pub async fn events<D: Driver>(context: &DataContext<D>) {
    let mut session = context
        .default_session()
        .await
        .expect("Could not open a session");

    // Setup
    session
        .delete_where::<Event>("", params![])
        .await
        .expect("Failed to clear the EVENTS table");

    let mut started = Event {
        name: "started".into(),
        happened_at: Some(datetime!(2024-02-29 23:59:59.250)),
        ..Default::default()
    };
    session
        .insert(&mut started)
        .await
        .expect("Failed to insert the first event");
    assert!(started.id > 0, "The generated key was not assigned");
    let mut stopped = Event {
        name: "stopped".into(),
        ..Default::default()
    };
    session
        .insert(&mut stopped)
        .await
        .expect("Failed to insert the second event");
    assert!(stopped.id > started.id);

    let found = session
        .get_by_id::<Event>(started.id)
        .await
        .expect("Failed to query the first event")
        .expect("Failed to find the first event");
    assert_eq!(found, started);
    let names = session
        .get_list::<Event>("{Id} >= ?", "{Id}", params![started.id])
        .await
        .expect("Failed to query the events")
        .into_iter()
        .map(|v| v.name)
        .collect::<Vec<_>>();
    assert_eq!(names, ["started", "stopped"]);

    stopped.happened_at = Some(datetime!(2024-03-01 00:00:00));
    let updated = session
        .update(&stopped)
        .await
        .expect("Failed to update the second event");
    assert_eq!(updated, 1);
    let found = session
        .get_object::<Event>("{Name} = ?", params!["stopped"])
        .await
        .expect("Failed to query the second event")
        .expect("Failed to find the second event");
    assert_eq!(found, stopped);
    session.release().await;
}
