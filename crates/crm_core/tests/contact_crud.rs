use chrono::{TimeZone, Timelike, Utc};
use crm_core::db::open_db_in_memory;
use crm_core::{
    ContactListQuery, ContactPatch, ContactRepository, CrmService, FixedClock, NewContact,
    RepoError, SequentialIdGenerator, SqliteContactRepository, ValidationError,
};
use rusqlite::Connection;

fn service(conn: &Connection) -> CrmService<'_, FixedClock, SequentialIdGenerator> {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap());
    CrmService::with_parts(conn, clock, SequentialIdGenerator::new()).unwrap()
}

fn alice() -> NewContact {
    NewContact::new("Alice Ng", "alice@example.com")
        .with_phone("555-0100")
        .with_company("Acme Corp")
        .with_tags(["vip", "enterprise"])
}

#[test]
fn add_contact_roundtrips_through_id_and_email_lookup() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);

    let created = crm
        .add_contact(alice().with_notes("met at expo"))
        .unwrap();
    assert_eq!(created.id, uuid::Uuid::from_u128(1));
    assert_eq!(created.last_contact, None);

    let by_id = crm.get_contact(created.id).unwrap().unwrap();
    assert_eq!(by_id, created);
    let by_email = crm.find_contact_by_email("alice@example.com").unwrap().unwrap();
    assert_eq!(by_email, created);
    assert_eq!(by_email.tags, vec!["vip", "enterprise"]);
}

#[test]
fn lookups_for_unknown_records_return_none() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);
    crm.add_contact(alice()).unwrap();

    assert!(crm.find_contact_by_email("unknown@x.com").unwrap().is_none());
    assert!(crm.get_contact(uuid::Uuid::from_u128(99)).unwrap().is_none());
}

#[test]
fn duplicate_email_is_a_constraint_violation_and_adds_no_row() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);
    crm.add_contact(alice()).unwrap();

    let err = crm
        .add_contact(NewContact::new("Alice Clone", "alice@example.com"))
        .unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM contacts;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn invalid_contacts_are_rejected_before_insert() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);

    let err = crm
        .add_contact(NewContact::new("  ", "blank@example.com"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::BlankName)
    ));
    assert!(crm
        .list_contacts(&ContactListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn update_contact_changes_whitelisted_fields() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);
    let created = crm.add_contact(alice()).unwrap();

    let patch = ContactPatch {
        phone: Some("555-9999".to_string()),
        company: Some("NewCorp".to_string()),
        tags: Some(vec!["churn-risk".to_string()]),
        ..ContactPatch::default()
    };
    assert!(crm.update_contact(created.id, &patch).unwrap());

    let fetched = crm.get_contact(created.id).unwrap().unwrap();
    assert_eq!(fetched.phone, "555-9999");
    assert_eq!(fetched.company, "NewCorp");
    assert_eq!(fetched.tags, vec!["churn-risk"]);
    assert_eq!(fetched.name, created.name);
    assert_eq!(fetched.created_at, created.created_at);
}

#[test]
fn update_contact_is_a_noop_for_unknown_fields_or_ids() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);
    let created = crm.add_contact(alice()).unwrap();

    let unknown_only = ContactPatch::from_fields([("last_contact", "2020-01-01"), ("id", "x")]);
    assert!(!crm.update_contact(created.id, &unknown_only).unwrap());
    assert_eq!(crm.get_contact(created.id).unwrap().unwrap(), created);

    let patch = ContactPatch::from_fields([("notes", "hello")]);
    assert!(!crm.update_contact(uuid::Uuid::from_u128(42), &patch).unwrap());
}

#[test]
fn update_contact_to_taken_email_fails() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);
    crm.add_contact(alice()).unwrap();
    let bob = crm
        .add_contact(NewContact::new("Bob Smith", "bob@example.com"))
        .unwrap();

    let patch = ContactPatch::from_fields([("email", "alice@example.com")]);
    let err = crm.update_contact(bob.id, &patch).unwrap_err();
    assert!(err.is_constraint_violation());
}

#[test]
fn list_contacts_filters_by_company_or_tag_and_orders_by_name() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);
    crm.add_contact(
        NewContact::new("Zed Young", "zed@example.com")
            .with_company("Acme Corp")
            .with_tags(["enterprise"]),
    )
    .unwrap();
    crm.add_contact(alice()).unwrap();
    crm.add_contact(
        NewContact::new("Bob Smith", "bob@example.com")
            .with_company("Beta LLC")
            .with_tags(["smb"]),
    )
    .unwrap();

    let names = |query: ContactListQuery| -> Vec<String> {
        crm.list_contacts(&query)
            .unwrap()
            .into_iter()
            .map(|contact| contact.name)
            .collect()
    };

    assert_eq!(
        names(ContactListQuery::default()),
        vec!["Alice Ng", "Bob Smith", "Zed Young"]
    );
    assert_eq!(
        names(ContactListQuery {
            company: Some("Acme Corp".to_string()),
            tag: None,
        }),
        vec!["Alice Ng", "Zed Young"]
    );
    assert_eq!(
        names(ContactListQuery {
            company: None,
            tag: Some("enter".to_string()),
        }),
        vec!["Alice Ng", "Zed Young"]
    );
    assert_eq!(
        names(ContactListQuery {
            company: Some("Beta LLC".to_string()),
            tag: Some("vip".to_string()),
        }),
        vec!["Bob Smith"]
    );
}

#[test]
fn tag_filter_ignores_ascii_case() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);
    let alice = crm.add_contact(alice()).unwrap();
    crm.add_contact(NewContact::new("Bob Smith", "bob@example.com").with_tags(["smb"]))
        .unwrap();

    for tag in ["VIP", "Vip", "ENTERPRISE"] {
        let found = crm
            .list_contacts(&ContactListQuery {
                company: None,
                tag: Some(tag.to_string()),
            })
            .unwrap();
        assert_eq!(found, vec![alice.clone()], "tag {tag}");
    }

    // `_` is not a wildcard.
    let wildcard = crm
        .list_contacts(&ContactListQuery {
            company: None,
            tag: Some("v_p".to_string()),
        })
        .unwrap();
    assert!(wildcard.is_empty());
}

#[test]
fn email_is_stored_as_given_and_only_uniqueness_is_enforced() {
    let conn = open_db_in_memory().unwrap();
    let crm = service(&conn);

    let bob = crm.add_contact(NewContact::new("Bob", "bob")).unwrap();
    assert_eq!(crm.find_contact_by_email("bob").unwrap(), Some(bob.clone()));

    let err = crm
        .add_contact(NewContact::new("Other Bob", "bob"))
        .unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");

    let patch = ContactPatch::from_fields([("email", "bob at home")]);
    assert!(crm.update_contact(bob.id, &patch).unwrap());
    let fetched = crm.get_contact(bob.id).unwrap().unwrap();
    assert_eq!(fetched.email, "bob at home");
}

#[test]
fn contact_inserted_through_repository_reads_back_equal_despite_nanoseconds() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteContactRepository::try_new(&conn).unwrap();
    let created_at = Utc
        .with_ymd_and_hms(2026, 10, 18, 9, 30, 0)
        .unwrap()
        .with_nanosecond(123_456_789)
        .unwrap();

    let contact = alice().into_contact(uuid::Uuid::from_u128(7), created_at);
    assert_eq!(contact.created_at.nanosecond(), 123_456_000);
    repo.insert_contact(&contact).unwrap();

    assert_eq!(repo.get_contact(contact.id).unwrap(), Some(contact));
}
