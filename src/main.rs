use classhub::announcement::{
    AnnouncementGateway, InMemoryAnnouncementGateway, InMemoryUploadGateway, LocalFile,
};
use classhub::classroom::{ClassroomGateway, CreateClassroomRequest, InMemoryClassroomGateway};
use classhub::{AppConfig, AppContext, ClassListState, StaticAuthContext, UserProfile};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classhub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting classhub demo session");

    if let Err(e) = run().await {
        error!(error = %e, "Demo session failed");
        std::process::exit(1);
    }
}

/// Walks one user through joining a class and posting to it
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();

    // In-memory services; swap for remote gateways in a real client
    let classrooms = Arc::new(InMemoryClassroomGateway::new());
    let announcements = Arc::new(InMemoryAnnouncementGateway::new(classrooms.clone()));
    let uploads = Arc::new(InMemoryUploadGateway::default());

    let grace = UserProfile::new("Grace");
    let ada = UserProfile::new("Ada").with_image("https://avatars.classhub.local/ada.png");

    let biology = classrooms
        .create_classroom(CreateClassroomRequest::new("Biology", &grace.id))
        .await?;
    classrooms
        .create_classroom(CreateClassroomRequest::new("Algebra", &ada.id))
        .await?;

    let auth = Arc::new(StaticAuthContext::signed_in(ada.clone()));
    let context = AppContext::new(classrooms, announcements.clone(), uploads, auth, config);

    let class_list = context.mount_class_list(&ada.id).await;
    let mut changes = class_list.watch();
    changes.borrow_and_update();
    if let ClassListState::Ready(view) = class_list.state() {
        println!("{view}");
    }

    let join = context.join_workflow();
    join.open();
    join.set_code(biology.code.to_uppercase());
    let outcome = join.submit().await;
    info!(outcome = ?outcome, "Join finished");
    if let Some(notification) = join.take_notification() {
        println!("{}", serde_json::to_string_pretty(&notification)?);
    }

    // The list refetches on its own once the join lands
    changes.changed().await?;
    if let ClassListState::Ready(view) = class_list.state() {
        println!("{view}");
    }

    let composer = context.composer(&biology.id);
    if let Some(prompt) = composer.prompt() {
        info!(label = prompt.label, "Composer ready");
    }
    composer.expand();
    composer.set_text("Lab report template attached");
    composer.open_picker();
    composer
        .upload(vec![
            LocalFile::new("template.pdf", "application/pdf", 48 * 1024),
            LocalFile::new("microscope.png", "image/png", 512 * 1024),
        ])
        .await;
    composer.close_picker();
    let outcome = composer.post().await;
    info!(outcome = ?outcome, "Post finished");

    let posted = announcements.list_announcements(&biology.id).await?;
    println!("{}", serde_json::to_string_pretty(&posted)?);

    class_list.dismiss();
    Ok(())
}
