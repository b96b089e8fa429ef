use calllog_core::{ContextFactory, PhoneCall, ScratchDatabase};
use std::collections::HashSet;

fn start() -> (ScratchDatabase, ContextFactory) {
    let db = ScratchDatabase::start().unwrap();
    let factory = db.factory().unwrap();
    factory.ensure_created().unwrap();
    (db, factory)
}

#[test]
fn add_call_with_topics_round_trips_as_set() {
    let (_db, factory) = start();
    let mut context = factory.create_context().unwrap();
    let mut tx = context.begin_transaction().unwrap();

    tx.add_phone_call(PhoneCall::now("123-456-7890").with_topics(["Support", "Billing"]));
    tx.save_changes().unwrap();
    tx.clear_tracking();

    let calls = tx.phone_calls().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].topics.len(), 2);
    assert!(calls[0].has_topic("Support"));
    assert!(calls[0].has_topic("Billing"));
    tx.commit().unwrap();
}

#[test]
fn topics_survive_a_new_context_and_ignore_order() {
    let (_db, factory) = start();
    {
        let mut context = factory.create_context().unwrap();
        context.add_phone_call(
            PhoneCall::new("123-456-7890", 0).with_topics(["Billing", "Support"]),
        );
        context.save_changes().unwrap();
    }

    let mut context = factory.create_context().unwrap();
    let calls = context.phone_calls().unwrap();
    let topics: HashSet<&str> = calls[0].topics.iter().map(String::as_str).collect();
    assert_eq!(topics, HashSet::from(["Support", "Billing"]));
}

#[test]
fn duplicate_topics_collapse_to_one_member() {
    let (_db, factory) = start();
    let mut context = factory.create_context().unwrap();
    context.add_phone_call(
        PhoneCall::new("123-456-7890", 0).with_topics(["Support", " Support", "Billing"]),
    );
    let saved = context.save_changes().unwrap();
    assert_eq!(saved.rows_written, 3);

    context.clear_tracking();
    let call = context.find_phone_call(saved.phone_call_ids[0]).unwrap().unwrap();
    assert_eq!(call.topics, vec!["Support".to_string(), "Billing".to_string()]);
}

#[test]
fn call_without_topics_reads_back_empty() {
    let (_db, factory) = start();
    let mut context = factory.create_context().unwrap();
    context.add_phone_call(PhoneCall::new("123-456-7890", 0));
    context.save_changes().unwrap();
    context.clear_tracking();

    let calls = context.phone_calls().unwrap();
    assert!(calls[0].topics.is_empty());
}
