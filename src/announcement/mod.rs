// Public API - what other modules can use
pub use composer::{
    AnnouncementComposer, ComposerError, ComposerPrompt, ComposerState, Draft, PostOutcome,
    UploadReport,
};
pub use gateway::{AnnouncementGateway, InMemoryAnnouncementGateway};
pub use models::{
    encode_link, join_links, split_links, Announcement, CreatedAnnouncement, NewAnnouncement, StagedAttachment,
    LINK_DELIMITER,
};
pub use picker::{AcceptedType, PickerConfig};
pub use upload::{InMemoryUploadGateway, LocalFile, UploadError, UploadGateway, UploadedFile};

// Internal modules
pub mod composer;
pub mod gateway;
pub mod models;
pub mod picker;
pub mod upload;
