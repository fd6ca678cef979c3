use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use trellis_bus::{Flow, Observable};
use trellis_model::{RefreshOptions, SaveOptions, Schema, Store, StoreEvent};
use trellis_types::{channel, Attributes, RecordId};

fn item_store() -> Store {
    Store::new(Schema::new("item", &["name", "price"])).unwrap()
}

fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other:?}"),
    }
}

fn counting(store: &Store, names: &str) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    store.bind(names, move |_: &StoreEvent| {
        seen.fetch_add(1, Ordering::SeqCst);
        Flow::Continue
    });
    count
}

// ── Construction & configure ─────────────────────────────────────

#[test]
fn new_rejects_empty_name() {
    let result = Store::new(Schema::new("", &["name"]));
    assert_eq!(
        result.err().map(|e| e.to_string()),
        Some("missing required argument: name".to_string())
    );
}

#[test]
fn configure_drops_records_and_subscriptions() {
    let store = item_store();
    store
        .create(attrs(json!({"name": "Apple"})), SaveOptions::default())
        .unwrap();
    let changes = counting(&store, channel::CHANGE);

    store
        .configure(Schema::new("product", &["name", "sku"]))
        .unwrap();

    assert_eq!(store.name(), "product");
    assert!(store.is_empty());
    assert!(store.events().is_empty());
    store
        .create(attrs(json!({"name": "Pear"})), SaveOptions::default())
        .unwrap();
    assert_eq!(changes.load(Ordering::SeqCst), 0);
}

#[test]
fn configure_rejects_empty_name() {
    let store = item_store();
    assert!(store.configure(Schema::new("", &[])).is_err());
    assert_eq!(store.name(), "item");
}

#[test]
fn client_ids_stay_unique_across_configure() {
    let store = item_store();
    let before = store
        .create(attrs(json!({"name": "Apple"})), SaveOptions::default())
        .unwrap()
        .unwrap();
    store.configure(Schema::new("item", &["name", "price"])).unwrap();
    let after = store
        .create(attrs(json!({"name": "Pear"})), SaveOptions::default())
        .unwrap()
        .unwrap();
    assert_ne!(before.cid(), after.cid());
}

// ── Create & find ────────────────────────────────────────────────

#[test]
fn create_persists_and_finds() {
    let store = item_store();
    let saved = store
        .create(
            attrs(json!({"name": "Apple", "price": 1.5})),
            SaveOptions::default(),
        )
        .unwrap()
        .unwrap();

    let found = store.find(saved.id().unwrap()).unwrap();
    assert_eq!(found.get_str("name"), Some("Apple".to_string()));
    assert_eq!(found.get_f64("price"), Some(1.5));
    assert!(found.equals(&saved));
}

#[test]
fn create_without_id_uses_the_client_id() {
    let store = item_store();
    let saved = store
        .create(attrs(json!({"name": "Apple"})), SaveOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(saved.id().unwrap().as_str(), saved.cid().as_str());
}

#[test]
fn create_adopts_a_provided_id() {
    let store = item_store();
    let saved = store
        .create(
            attrs(json!({"id": "41", "name": "Apple"})),
            SaveOptions::default(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(saved.id().unwrap().as_str(), "41");
    assert!(store.exists(&RecordId::from("41")));
}

#[test]
fn find_falls_back_to_the_client_id() {
    let store = item_store();
    let saved = store
        .create(
            attrs(json!({"id": "41", "name": "Apple"})),
            SaveOptions::default(),
        )
        .unwrap()
        .unwrap();

    // known under "41", but the cid still resolves
    let by_cid = store.find(&saved.cid().to_record_id()).unwrap();
    assert!(by_cid.equals(&saved));
}

#[test]
fn find_unknown_id_fails() {
    let store = item_store();
    let error = store.find(&RecordId::from("missing")).unwrap_err();
    assert_eq!(error.to_string(), "unknown record: missing");
}

#[test]
fn exists_probes_without_failing() {
    let store = item_store();
    let saved = store
        .create(attrs(json!({"name": "Apple"})), SaveOptions::default())
        .unwrap()
        .unwrap();
    let id = saved.id().unwrap().clone();

    assert!(store.exists(&id));
    store.destroy(&id).unwrap();
    assert!(!store.exists(&id));
}

// ── Finders ──────────────────────────────────────────────────────

#[test]
fn all_returns_records_in_insertion_order() {
    let store = item_store();
    for name in ["Apple", "Pear", "Plum"] {
        store
            .create(attrs(json!({"name": name})), SaveOptions::default())
            .unwrap();
    }
    let names: Vec<_> = store.all().iter().filter_map(|r| r.get_str("name")).collect();
    assert_eq!(names, vec!["Apple", "Pear", "Plum"]);
}

#[test]
fn first_and_last_follow_insertion_order() {
    let store = item_store();
    assert!(store.first().is_none());
    assert!(store.last().is_none());

    for name in ["Apple", "Pear", "Plum"] {
        store
            .create(attrs(json!({"name": name})), SaveOptions::default())
            .unwrap();
    }
    assert_eq!(store.first().unwrap().get_str("name"), Some("Apple".to_string()));
    assert_eq!(store.last().unwrap().get_str("name"), Some("Plum".to_string()));
}

#[test]
fn count_and_is_empty_track_contents() {
    let store = item_store();
    assert!(store.is_empty());
    assert_eq!(store.count(), 0);

    store
        .create(attrs(json!({"name": "Apple"})), SaveOptions::default())
        .unwrap();
    assert!(!store.is_empty());
    assert_eq!(store.count(), 1);
}

#[test]
fn select_filters_by_predicate() {
    let store = item_store();
    for (name, price) in [("Apple", 1.5), ("Pear", 3.0), ("Plum", 4.5)] {
        store
            .create(
                attrs(json!({"name": name, "price": price})),
                SaveOptions::default(),
            )
            .unwrap();
    }
    let pricey = store.select(|r| r.get_f64("price").is_some_and(|p| p > 2.0));
    let names: Vec<_> = pricey.iter().filter_map(|r| r.get_str("name")).collect();
    assert_eq!(names, vec!["Pear", "Plum"]);
}

#[test]
fn find_by_attribute_answers_the_oldest_match() {
    let store = item_store();
    for (name, price) in [("Apple", 2.0), ("Pear", 2.0)] {
        store
            .create(
                attrs(json!({"name": name, "price": price})),
                SaveOptions::default(),
            )
            .unwrap();
    }
    let found = store.find_by_attribute("price", &json!(2.0)).unwrap();
    assert_eq!(found.get_str("name"), Some("Apple".to_string()));
    assert!(store.find_by_attribute("price", &json!(9.0)).is_none());
}

#[test]
fn find_all_by_attribute_answers_every_match() {
    let store = item_store();
    for (name, price) in [("Apple", 2.0), ("Pear", 3.0), ("Plum", 2.0)] {
        store
            .create(
                attrs(json!({"name": name, "price": price})),
                SaveOptions::default(),
            )
            .unwrap();
    }
    let matches = store.find_all_by_attribute("price", &json!(2.0));
    let names: Vec<_> = matches.iter().filter_map(|r| r.get_str("name")).collect();
    assert_eq!(names, vec!["Apple", "Plum"]);
}

#[test]
fn each_visits_every_record() {
    let store = item_store();
    for name in ["Apple", "Pear"] {
        store
            .create(attrs(json!({"name": name})), SaveOptions::default())
            .unwrap();
    }
    let mut names = Vec::new();
    store.each(|r| names.extend(r.get_str("name")));
    assert_eq!(names, vec!["Apple", "Pear"]);
}

#[test]
fn each_tolerates_mutation_mid_walk() {
    let store = item_store();
    for name in ["Apple", "Pear", "Plum"] {
        store
            .create(attrs(json!({"name": name})), SaveOptions::default())
            .unwrap();
    }
    let mut visited = 0;
    store.each(|record| {
        visited += 1;
        store.destroy(record.id().unwrap()).unwrap();
    });
    assert_eq!(visited, 3);
    assert!(store.is_empty());
}

// ── Refresh & serialization ──────────────────────────────────────

#[test]
fn refresh_appends_and_fires_once() {
    let store = item_store();
    let announced = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&announced);
    store.bind(channel::REFRESH, move |event: &StoreEvent| {
        sink.fetch_add(event.records().len(), Ordering::SeqCst);
        Flow::Continue
    });
    let per_record = counting(&store, "create update change");

    let records = store.refresh(
        vec![
            attrs(json!({"name": "Apple"})),
            attrs(json!({"name": "Pear"})),
        ],
        RefreshOptions::default(),
    );

    assert_eq!(records.len(), 2);
    assert_eq!(store.count(), 2);
    assert_eq!(announced.load(Ordering::SeqCst), 2);
    assert_eq!(per_record.load(Ordering::SeqCst), 0);
}

#[test]
fn refresh_clearing_replaces_contents_silently() {
    let store = item_store();
    let old = store
        .create(attrs(json!({"name": "Apple"})), SaveOptions::default())
        .unwrap()
        .unwrap();
    let destroys = counting(&store, "destroy change");

    store.refresh(
        vec![attrs(json!({"name": "Pear"}))],
        RefreshOptions::clearing(),
    );

    assert_eq!(store.count(), 1);
    assert!(!store.exists(old.id().unwrap()));
    assert_eq!(destroys.load(Ordering::SeqCst), 0);
}

#[test]
fn refresh_assigns_ids() {
    let store = item_store();
    let records = store.refresh(
        vec![
            attrs(json!({"id": "41", "name": "Apple"})),
            attrs(json!({"name": "Pear"})),
        ],
        RefreshOptions::default(),
    );

    assert_eq!(records[0].id().unwrap().as_str(), "41");
    // no id in the payload: the client id stands in
    assert_eq!(records[1].id().unwrap().as_str(), records[1].cid().as_str());
    assert!(store.exists(&RecordId::from("41")));
}

#[test]
fn refresh_keeps_undeclared_keys_readable() {
    let store = item_store();
    store.refresh(
        vec![attrs(json!({"name": "Apple", "color": "red"}))],
        RefreshOptions::default(),
    );

    let record = store.first().unwrap();
    assert_eq!(record.get_str("color"), Some("red".to_string()));
    // undeclared keys stay out of the serialized shape
    assert!(!record.attributes().contains_key("color"));
}

#[test]
fn refresh_json_accepts_object_and_array() {
    let store = item_store();
    store
        .refresh_json(r#"{"name": "Apple"}"#, RefreshOptions::default())
        .unwrap();
    store
        .refresh_json(
            r#"[{"name": "Pear"}, {"name": "Plum"}]"#,
            RefreshOptions::default(),
        )
        .unwrap();
    assert_eq!(store.count(), 3);
}

#[test]
fn refresh_json_rejects_wrong_shapes() {
    let store = item_store();
    let scalar = store.refresh_json("7", RefreshOptions::default()).unwrap_err();
    assert_eq!(
        scalar.to_string(),
        "invalid data: expected an object or an array of objects, got a number"
    );

    let mixed = store
        .refresh_json(r#"[{"name": "Apple"}, null]"#, RefreshOptions::default())
        .unwrap_err();
    assert_eq!(
        mixed.to_string(),
        "invalid data: expected attribute objects, got null"
    );
    assert!(store.is_empty());
}

#[test]
fn refresh_json_reports_parse_failures() {
    let store = item_store();
    assert!(store
        .refresh_json("not json", RefreshOptions::default())
        .is_err());
}

#[test]
fn to_json_round_trips_through_refresh_json() {
    let store = item_store();
    store
        .create(
            attrs(json!({"id": "41", "name": "Apple", "price": 1.5})),
            SaveOptions::default(),
        )
        .unwrap();
    store
        .create(attrs(json!({"name": "Pear"})), SaveOptions::default())
        .unwrap();
    let json = store.to_json().unwrap();

    let copy = item_store();
    copy.refresh_json(&json, RefreshOptions::default()).unwrap();

    assert_eq!(copy.count(), 2);
    let apple = copy.find(&RecordId::from("41")).unwrap();
    assert_eq!(apple.get_str("name"), Some("Apple".to_string()));
    assert_eq!(apple.get_f64("price"), Some(1.5));
}

// ── Bulk removal ─────────────────────────────────────────────────

#[test]
fn delete_all_is_silent() {
    let store = item_store();
    for name in ["Apple", "Pear"] {
        store
            .create(attrs(json!({"name": name})), SaveOptions::default())
            .unwrap();
    }
    let events = counting(&store, "destroy change refresh");

    store.delete_all();

    assert!(store.is_empty());
    assert_eq!(events.load(Ordering::SeqCst), 0);
}

#[test]
fn destroy_all_runs_the_full_cascade() {
    let store = item_store();
    for name in ["Apple", "Pear", "Plum"] {
        store
            .create(attrs(json!({"name": name})), SaveOptions::default())
            .unwrap();
    }
    let destroys = counting(&store, channel::DESTROY);

    store.destroy_all();

    assert!(store.is_empty());
    assert_eq!(destroys.load(Ordering::SeqCst), 3);
}

// ── Minting ──────────────────────────────────────────────────────

#[test]
fn minting_skips_ids_already_in_the_store() {
    let store = item_store();
    // seeds records["c-2"], so a later mint may not hand out c-2
    store.refresh(
        vec![attrs(json!({"id": "c-2", "name": "Apple"}))],
        RefreshOptions::default(),
    );

    let mut cids = vec![store.first().unwrap().cid().clone()];
    for _ in 0..3 {
        cids.push(store.mint_client_id());
    }

    for cid in &cids {
        assert_ne!(cid.as_str(), "c-2");
    }
    for (i, a) in cids.iter().enumerate() {
        for b in &cids[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

// ── Store-level update & destroy ─────────────────────────────────

#[test]
fn update_by_id_merges_attributes() {
    let store = item_store();
    let saved = store
        .create(
            attrs(json!({"name": "Apple", "price": 1.5})),
            SaveOptions::default(),
        )
        .unwrap()
        .unwrap();

    let updated = store
        .update(
            saved.id().unwrap(),
            attrs(json!({"price": 2.0})),
            SaveOptions::default(),
        )
        .unwrap()
        .unwrap();

    assert_eq!(updated.get_str("name"), Some("Apple".to_string()));
    assert_eq!(updated.get_f64("price"), Some(2.0));
}

#[test]
fn update_unknown_id_fails() {
    let store = item_store();
    let error = store
        .update(
            &RecordId::from("missing"),
            attrs(json!({"name": "x"})),
            SaveOptions::default(),
        )
        .unwrap_err();
    assert_eq!(error.to_string(), "unknown record: missing");
}

#[test]
fn destroy_by_id_removes_the_record() {
    let store = item_store();
    let saved = store
        .create(attrs(json!({"name": "Apple"})), SaveOptions::default())
        .unwrap()
        .unwrap();

    let gone = store.destroy(saved.id().unwrap()).unwrap();

    assert!(gone.destroyed());
    assert!(store.is_empty());
    assert!(store.destroy(saved.id().unwrap()).is_err());
}
