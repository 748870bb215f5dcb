use contacts_core::{
    AccountRef, Capabilities, ContactId, ContactProperty, ContactRecord, GraphError, GraphEvent,
    IdentityGraph, Presence, PresenceSource, PresenceType, RosterRecord, ATTR_PHOTO,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn roster(uid: &str, kind: PresenceType, caps: Capabilities) -> RosterRecord {
    RosterRecord::new(uid, AccountRef::new("mesh0", "lxmf"))
        .with_presence(Presence::new(kind))
        .with_capabilities(caps)
}

fn plain(uid: &str, kind: PresenceType) -> RosterRecord {
    roster(uid, kind, Capabilities::empty())
}

fn source(roster: ContactId) -> Option<PresenceSource> {
    Some(PresenceSource::Roster(roster))
}

fn expected_capabilities(graph: &IdentityGraph, master: ContactId) -> Capabilities {
    let own = graph.get(master).expect("master").own_capabilities();
    graph
        .attached(master)
        .iter()
        .map(|r| graph.get(*r).expect("roster").own_capabilities())
        .fold(own, |acc, caps| acc | caps)
}

#[test]
fn attach_rejects_invalid_pairs_without_side_effects() {
    init_logging();
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let ann = graph.insert_master(ContactRecord::new("ann"));
    let r = graph.insert_roster(roster("bob@mesh", PresenceType::Available, Capabilities::CHAT));

    assert_eq!(graph.attach(bob, bob), Err(GraphError::SelfAttachment(bob)));
    assert_eq!(graph.attach(bob, ann), Err(GraphError::NotRoster(ann)));
    assert_eq!(graph.attach(r, bob), Err(GraphError::NotMaster(r)));

    graph.attach(bob, r).expect("attach");
    let duplicate = GraphError::AlreadyAttached {
        master: bob,
        roster: r,
    };
    assert_eq!(graph.attach(bob, r), Err(duplicate));
    assert_eq!(graph.attached(bob), [r]);

    graph.remove(ann).expect("remove ann");
    assert_eq!(graph.attach(ann, r), Err(GraphError::UnknownContact(ann)));
}

#[test]
fn detach_without_edge_fails() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let r = graph.insert_roster(roster("bob@mesh", PresenceType::Available, Capabilities::CHAT));
    let missing = GraphError::NotAttached {
        master: bob,
        roster: r,
    };
    assert_eq!(graph.detach(bob, r), Err(missing));
    assert!(!graph.has_pending_events());
}

#[test]
fn combined_capabilities_track_every_mutation() {
    let mut graph = IdentityGraph::new();
    let bob =
        graph.insert_master(ContactRecord::new("bob").with_capabilities(Capabilities::PHONE));
    let chat = graph.insert_roster(roster("bob@mesh", PresenceType::Available, Capabilities::CHAT));
    let voice = graph.insert_roster(roster("bob@sip", PresenceType::Offline, Capabilities::VOICE));

    assert_eq!(graph.capabilities(bob), expected_capabilities(&graph, bob));

    graph.attach(bob, chat).expect("attach chat");
    let phone_and_chat = Capabilities::PHONE | Capabilities::CHAT;
    assert_eq!(graph.capabilities(bob), phone_and_chat);

    graph.attach(bob, voice).expect("attach voice");
    assert_eq!(graph.capabilities(bob), expected_capabilities(&graph, bob));

    let video = Capabilities::VOICE | Capabilities::VIDEO;
    graph.set_roster_capabilities(voice, video).expect("caps");
    assert!(graph.capabilities(bob).contains(Capabilities::VIDEO));
    assert_eq!(graph.capabilities(bob), expected_capabilities(&graph, bob));

    graph.detach(bob, chat).expect("detach chat");
    assert!(!graph.capabilities(bob).contains(Capabilities::CHAT));
    assert_eq!(graph.capabilities(bob), expected_capabilities(&graph, bob));

    graph.remove(voice).expect("remove voice");
    assert_eq!(graph.capabilities(bob), Capabilities::PHONE);
}

#[test]
fn capability_change_is_notified_on_master() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let r = graph.insert_roster(plain("bob@mesh", PresenceType::Available));
    graph.attach(bob, r).expect("attach");
    graph.drain_events();

    graph
        .set_roster_capabilities(r, Capabilities::CHAT)
        .expect("caps");
    let events = graph.drain_events();
    assert!(events.contains(&GraphEvent::Notify {
        contact: bob,
        property: ContactProperty::Capabilities,
    }));
}

#[test]
fn attaching_better_presence_switches_source() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let away = graph.insert_roster(plain("a", PresenceType::Away));
    let available = graph.insert_roster(plain("b", PresenceType::Available));

    graph.attach(bob, away).expect("attach away");
    assert_eq!(graph.presence_source(bob), source(away));

    graph.attach(bob, available).expect("attach available");
    assert_eq!(graph.presence_source(bob), source(available));
    let resolved = graph.resolve_presence(bob).expect("resolve");
    assert_eq!(resolved.kind, PresenceType::Available);
}

#[test]
fn attaching_worse_or_equal_presence_keeps_source() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let busy = graph.insert_roster(plain("a", PresenceType::Busy));
    let offline = graph.insert_roster(plain("b", PresenceType::Offline));
    let also_busy = graph.insert_roster(plain("c", PresenceType::Busy));

    graph.attach(bob, busy).expect("attach busy");
    graph.attach(bob, offline).expect("attach offline");
    assert_eq!(graph.presence_source(bob), source(busy));
    graph.attach(bob, also_busy).expect("attach busy twin");
    assert_eq!(graph.presence_source(bob), source(busy));
}

#[test]
fn own_presence_wins_when_nothing_beats_it() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(
        ContactRecord::new("bob").with_presence(Presence::new(PresenceType::Available)),
    );
    let r = graph.insert_roster(plain("a", PresenceType::Away));
    graph.attach(bob, r).expect("attach");
    assert_eq!(graph.presence_source(bob), Some(PresenceSource::Own));
    let resolved = graph.resolve_presence(bob).expect("resolve");
    assert_eq!(resolved.kind, PresenceType::Available);
}

#[test]
fn detaching_presence_source_forces_rescan() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let away = graph.insert_roster(plain("a", PresenceType::Away));
    let available = graph.insert_roster(plain("b", PresenceType::Available));
    graph.attach(bob, away).expect("attach away");
    graph.attach(bob, available).expect("attach available");

    graph.detach(bob, available).expect("detach");
    assert_eq!(graph.presence_source(bob), None);
    let resolved = graph.resolve_presence(bob).expect("resolve");
    assert_eq!(resolved.kind, PresenceType::Away);
    assert_eq!(graph.presence_source(bob), source(away));
}

#[test]
fn improved_roster_presence_takes_over() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let a = graph.insert_roster(plain("a", PresenceType::Away));
    let b = graph.insert_roster(plain("b", PresenceType::Offline));
    graph.attach(bob, a).expect("attach a");
    graph.attach(bob, b).expect("attach b");
    graph.drain_events();

    let available = Presence::new(PresenceType::Available);
    graph.set_roster_presence(b, available).expect("presence");
    assert_eq!(graph.presence_source(bob), source(b));
    let events = graph.drain_events();
    assert!(events.contains(&GraphEvent::Notify {
        contact: bob,
        property: ContactProperty::PresenceType,
    }));
}

#[test]
fn degraded_source_stops_forwarding_status() {
    init_logging();
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let a = graph.insert_roster(plain("a", PresenceType::Available));
    let b = graph.insert_roster(plain("b", PresenceType::Busy));
    graph.attach(bob, a).expect("attach a");
    graph.attach(bob, b).expect("attach b");
    assert_eq!(graph.presence_source(bob), source(a));
    assert!(graph.is_listening(bob, a, ContactProperty::PresenceStatus));

    let offline = Presence::new(PresenceType::Offline);
    graph.set_roster_presence(a, offline).expect("offline");
    assert_eq!(graph.presence_source(bob), None);
    for property in ContactProperty::PRESENCE_FORWARD {
        assert!(!graph.is_listening(bob, a, property), "{property:?}");
    }
    graph.drain_events();

    let farewell = Presence::new(PresenceType::Offline).with_message("gone");
    graph.set_roster_presence(a, farewell).expect("message");
    let forwarded = GraphEvent::Notify {
        contact: bob,
        property: ContactProperty::PresenceStatusMessage,
    };
    assert!(!graph.drain_events().contains(&forwarded));

    let resolved = graph.resolve_presence(bob).expect("resolve");
    assert_eq!(resolved.kind, PresenceType::Busy);
    assert!(graph.is_listening(bob, b, ContactProperty::PresenceStatusMessage));
    assert!(!graph.is_listening(bob, a, ContactProperty::PresenceStatusMessage));
}

#[test]
fn master_update_stops_forwarding_until_resolved() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let r = graph.insert_roster(plain("a", PresenceType::Available));
    graph.attach(bob, r).expect("attach");
    assert!(graph.is_listening(bob, r, ContactProperty::PresenceStatus));

    graph
        .update_master(bob, ContactRecord::new("bob").with_name("Robert"))
        .expect("update");
    assert!(!graph.is_listening(bob, r, ContactProperty::PresenceStatus));

    graph.resolve_presence(bob).expect("resolve");
    assert!(graph.is_listening(bob, r, ContactProperty::PresenceStatus));
}

#[test]
fn attachment_subscribes_and_detachment_unsubscribes() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let r = graph.insert_roster(plain("a", PresenceType::Available));
    graph.attach(bob, r).expect("attach");
    for property in ContactProperty::ATTACHMENT {
        assert!(graph.is_listening(bob, r, property), "{property:?}");
    }
    graph.detach(bob, r).expect("detach");
    let every = ContactProperty::ATTACHMENT
        .into_iter()
        .chain(ContactProperty::PRESENCE_FORWARD);
    for property in every {
        assert!(!graph.is_listening(bob, r, property), "{property:?}");
    }

    graph.drain_events();
    graph
        .set_roster_capabilities(r, Capabilities::SMS)
        .expect("caps");
    let events = graph.drain_events();
    assert!(events.iter().all(|event| event.subject() != bob));
}

#[test]
fn master_uid_bookkeeping_is_idempotent() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let carol = graph.insert_master(ContactRecord::new("carol"));
    let r = graph.insert_roster(roster("shared@mesh", PresenceType::Available, Capabilities::CHAT));

    graph.attach(bob, r).expect("attach bob");
    graph.attach(carol, r).expect("attach carol");
    assert_eq!(graph.master_uids(r), ["bob", "carol"]);
    assert_eq!(graph.masters_of(r), [bob, carol]);

    graph.detach(bob, r).expect("detach bob");
    graph.attach(bob, r).expect("reattach bob");
    assert_eq!(graph.master_uids(r), ["carol", "bob"]);

    graph.detach(bob, r).expect("detach bob");
    graph.detach(carol, r).expect("detach carol");
    assert!(graph.master_uids(r).is_empty());
}

#[test]
fn temporary_masters_are_not_recorded_on_rosters() {
    let mut graph = IdentityGraph::new();
    let tmp = graph.insert_master(ContactRecord::temporary_for("stranger@mesh"));
    let r = graph.insert_roster(roster("stranger@mesh", PresenceType::Away, Capabilities::CHAT));
    graph.attach(tmp, r).expect("attach");
    assert!(graph.master_uids(r).is_empty());
    assert_eq!(graph.masters_of(r), [tmp]);

    let saved = ContactRecord::new("stranger").with_name("Stranger");
    graph.update_master(tmp, saved).expect("update");
    assert_eq!(graph.master_uids(r), ["stranger"]);
    assert_eq!(graph.find_by_uid("stranger"), [tmp]);
}

#[test]
fn update_master_recomputes_and_notifies() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let r = graph.insert_roster(roster("a", PresenceType::Away, Capabilities::CHAT));
    graph.attach(bob, r).expect("attach");
    graph.drain_events();

    let record = ContactRecord::new("bob")
        .with_name("Robert")
        .with_capabilities(Capabilities::EMAIL)
        .with_presence(Presence::new(PresenceType::Available));
    graph.update_master(bob, record).expect("update");

    let chat_and_email = Capabilities::CHAT | Capabilities::EMAIL;
    assert_eq!(graph.capabilities(bob), chat_and_email);
    assert_eq!(graph.presence_source(bob), None);
    let resolved = graph.resolve_presence(bob).expect("resolve");
    assert_eq!(resolved.kind, PresenceType::Available);
    assert_eq!(graph.display_name(bob), "Robert");
    let events = graph.drain_events();
    assert!(events.contains(&GraphEvent::Notify {
        contact: bob,
        property: ContactProperty::Attributes,
    }));
}

#[test]
fn avatar_prefers_own_photo_then_newest_roster_avatar() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let a = graph.insert_roster(plain("a", PresenceType::Away).with_avatar("a.png"));
    let b = graph.insert_roster(plain("b", PresenceType::Away).with_avatar("b.png"));
    graph.attach(bob, b).expect("attach b");
    graph.attach(bob, a).expect("attach a");
    assert_eq!(graph.resolve_avatar(bob), Some("b.png"));

    graph
        .set_roster_avatar(a, Some("a2.png".into()))
        .expect("avatar");
    assert_eq!(graph.resolve_avatar(bob), Some("a2.png"));

    let photo = ContactRecord::new("bob").with_attribute(ATTR_PHOTO, "own.png");
    graph.update_master(bob, photo).expect("update");
    assert_eq!(graph.resolve_avatar(bob), Some("own.png"));
}

#[test]
fn roster_attribute_replacement_keeps_master_uids() {
    let mut graph = IdentityGraph::new();
    let bob = graph.insert_master(ContactRecord::new("bob"));
    let r = graph.insert_roster(plain("a", PresenceType::Away));
    graph.attach(bob, r).expect("attach");

    let attrs = [("FN", "Bobby")].into_iter().collect();
    graph.set_roster_attributes(r, attrs).expect("attributes");
    assert_eq!(graph.master_uids(r), ["bob"]);
    assert_eq!(graph.display_name(r), "Bobby");
}
