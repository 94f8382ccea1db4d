use classhub::{
    announcement::{AnnouncementGateway, ComposerError, LocalFile},
    classroom::Partition,
    AppEvent, AuthContext, ComposerState, JoinOutcome, JoinState, PostOutcome,
};

mod utils;

use utils::*;

fn png(name: &str) -> LocalFile {
    LocalFile::new(name, "image/png", 4 * 1024)
}

#[tokio::test]
async fn test_join_refreshes_mounted_class_list() {
    let setup = TestSetupBuilder::new()
        .teaching("Algebra")
        .with_other_class("Biology")
        .build()
        .await;

    let class_list = setup.context.mount_class_list(&setup.user.id).await;
    let mut changes = class_list.watch();
    let view = ready_view(changes.borrow_and_update().clone());
    assert_eq!(class_names(&view.teaching), vec!["Algebra"]);
    assert_eq!(view.enrolled, Partition::Empty);

    let join = setup.context.join_workflow();
    join.open();
    join.set_code(&setup.class("Biology").code);
    assert_eq!(join.submit().await, JoinOutcome::Joined);

    let view = next_ready_view(&mut changes).await;
    assert_eq!(class_names(&view.teaching), vec!["Algebra"]);
    assert_eq!(class_names(&view.enrolled), vec!["Biology"]);

    let notification = join.take_notification().unwrap();
    assert_eq!(notification.message, "You have joined the class");
    assert_eq!(join.take_notification(), None);
}

#[tokio::test]
async fn test_join_as_teacher_lands_in_teaching_partition() {
    let setup = TestSetupBuilder::new().with_other_class("Chemistry").build().await;
    let class_list = setup.context.mount_class_list(&setup.user.id).await;
    let mut changes = class_list.watch();
    changes.borrow_and_update();

    let join = setup.context.join_workflow();
    join.open();
    join.set_code(&setup.class("Chemistry").code);
    join.toggle_teacher();
    assert_eq!(join.submit().await, JoinOutcome::Joined);

    let view = next_ready_view(&mut changes).await;
    assert_eq!(class_names(&view.teaching), vec!["Chemistry"]);
    assert_eq!(view.enrolled, Partition::Empty);
}

#[tokio::test]
async fn test_double_submit_creates_one_membership() {
    let setup = TestSetupBuilder::new()
        .with_other_class("Biology")
        .holding_joins()
        .build()
        .await;
    let join = setup.context.join_workflow();
    join.open();
    join.set_code(&setup.class("Biology").code);

    let (first, second) = tokio::join!(join.submit(), async {
        setup.classrooms.join_started().await;
        let second = join.submit().await;
        setup.classrooms.release_join();
        second
    });

    assert_eq!(first, JoinOutcome::Joined);
    assert_eq!(second, JoinOutcome::AlreadySubmitting);
    assert_eq!(setup.classrooms.join_calls(), 1);
    let memberships = setup.classrooms.store().memberships();
    assert_eq!(
        memberships
            .iter()
            .filter(|m| m.user_id == setup.user.id)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_reopened_join_form_waits_for_pending_call() {
    let setup = TestSetupBuilder::new()
        .with_other_class("Biology")
        .holding_joins()
        .build()
        .await;
    let join = setup.context.join_workflow();
    join.open();
    join.set_code(&setup.class("Biology").code);

    let (first, second) = tokio::join!(join.submit(), async {
        setup.classrooms.join_started().await;
        join.cancel();
        join.open();
        join.set_code(&setup.class("Biology").code);
        let second = join.submit().await;
        setup.classrooms.release_join();
        second
    });

    assert_eq!(first, JoinOutcome::Discarded);
    assert_eq!(second, JoinOutcome::AlreadySubmitting);
    assert_eq!(setup.classrooms.join_calls(), 1);
}

#[tokio::test]
async fn test_rejected_code_does_not_refresh_list() {
    let setup = TestSetupBuilder::new().teaching("Algebra").build().await;
    let _class_list = setup.context.mount_class_list(&setup.user.id).await;
    assert_eq!(setup.classrooms.refreshes(), 1);

    let join = setup.context.join_workflow();
    join.open();
    join.set_code("zzzzzzz");
    assert_eq!(
        join.submit().await,
        JoinOutcome::Rejected("Invalid class code".to_string())
    );

    tokio::task::yield_now().await;
    assert_eq!(setup.classrooms.refreshes(), 1);
    let JoinState::Open(form) = join.state() else {
        panic!("expected the form to stay open");
    };
    assert_eq!(form.code, "zzzzzzz");
    assert_eq!(form.error.as_deref(), Some("Invalid class code"));
}

#[tokio::test]
async fn test_every_mounted_list_refreshes_on_one_join() {
    let setup = TestSetupBuilder::new().with_other_class("Biology").build().await;
    let sidebar = setup.context.mount_class_list(&setup.user.id).await;
    let dashboard = setup.context.mount_class_list(&setup.user.id).await;
    let mut sidebar_changes = sidebar.watch();
    let mut dashboard_changes = dashboard.watch();
    sidebar_changes.borrow_and_update();
    dashboard_changes.borrow_and_update();
    assert_eq!(
        setup
            .context
            .event_bus
            .subscriber_count(AppEvent::ClassesChanged),
        2
    );

    let join = setup.context.join_workflow();
    join.open();
    join.set_code(&setup.class("Biology").code);
    join.submit().await;

    for changes in [&mut sidebar_changes, &mut dashboard_changes] {
        let view = next_ready_view(changes).await;
        assert_eq!(class_names(&view.enrolled), vec!["Biology"]);
    }
}

#[tokio::test]
async fn test_dismissed_list_is_not_refreshed() {
    let setup = TestSetupBuilder::new().with_other_class("Biology").build().await;
    let class_list = setup.context.mount_class_list(&setup.user.id).await;
    class_list.dismiss();

    let join = setup.context.join_workflow();
    join.open();
    join.set_code(&setup.class("Biology").code);
    assert_eq!(join.submit().await, JoinOutcome::Joined);

    tokio::task::yield_now().await;
    assert_eq!(setup.classrooms.refreshes(), 1);
}

#[tokio::test]
async fn test_signed_out_user_cannot_join_or_post() {
    let setup = TestSetupBuilder::new()
        .with_other_class("Biology")
        .signed_out()
        .build()
        .await;
    assert!(setup.auth.current_user().is_none());

    let join = setup.context.join_workflow();
    join.open();
    join.set_code(&setup.class("Biology").code);
    assert_eq!(join.submit().await, JoinOutcome::Unauthenticated);
    assert_eq!(setup.classrooms.join_calls(), 0);

    let composer = setup.context.composer(&setup.class("Biology").id);
    assert_eq!(composer.prompt(), None);
    composer.expand();
    composer.set_text("Hello");
    assert_eq!(
        composer.post().await,
        PostOutcome::Invalid(ComposerError::Unauthenticated)
    );
}

#[tokio::test(start_paused = true)]
async fn test_attachments_staged_in_completion_order() {
    let setup = TestSetupBuilder::new()
        .teaching("Algebra")
        .with_upload_delay("a.png", 30)
        .with_upload_delay("b.png", 10)
        .with_upload_delay("c.png", 50)
        .build()
        .await;
    let composer = setup.context.composer(&setup.class("Algebra").id);
    composer.expand();
    composer.open_picker();

    composer
        .upload(vec![png("a.png"), png("b.png"), png("c.png")])
        .await
        .unwrap();
    composer.close_picker();

    let ComposerState::Expanded(draft) = composer.state() else {
        panic!("expected an expanded composer");
    };
    assert_eq!(
        draft.urls(),
        vec![
            MockUploadGateway::url_for("b.png"),
            MockUploadGateway::url_for("a.png"),
            MockUploadGateway::url_for("c.png"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_posted_announcement_round_trips_links() {
    let setup = TestSetupBuilder::new()
        .teaching("Algebra")
        .with_upload_delay("slides.pdf", 20)
        .with_upload_delay("board.png", 5)
        .build()
        .await;
    let classroom_id = setup.class("Algebra").id.clone();
    let composer = setup.context.composer(&classroom_id);

    composer.expand();
    composer.set_text("Week 2");
    composer.open_picker();
    composer
        .upload(vec![
            LocalFile::new("slides.pdf", "application/pdf", 1024),
            png("board.png"),
        ])
        .await
        .unwrap();
    composer.close_picker();

    let PostOutcome::Posted(created) = composer.post().await else {
        panic!("expected the announcement to post");
    };
    assert_eq!(composer.state(), ComposerState::Collapsed);

    let stored = setup
        .announcements
        .list_announcements(&classroom_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].author_id, setup.user.id);
    assert_eq!(stored[0].text.as_deref(), Some("Week 2"));
    assert_eq!(
        stored[0].link_list(),
        vec![
            MockUploadGateway::url_for("board.png"),
            MockUploadGateway::url_for("slides.pdf"),
        ]
    );
    assert_eq!(created.link_list(), stored[0].link_list());
}

#[tokio::test]
async fn test_non_member_post_keeps_draft() {
    let setup = TestSetupBuilder::new().with_other_class("Biology").build().await;
    let composer = setup.context.composer(&setup.class("Biology").id);
    composer.expand();
    composer.set_text("Am I in this class?");

    let outcome = composer.post().await;

    assert!(matches!(outcome, PostOutcome::Failed(_)));
    let ComposerState::Expanded(draft) = composer.state() else {
        panic!("expected the composer to stay expanded");
    };
    assert_eq!(draft.text, "Am I in this class?");
    assert!(matches!(draft.error, Some(ComposerError::Post(_))));
    assert_eq!(setup.announcements.count(), 0);
}
