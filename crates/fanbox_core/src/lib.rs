//! FANBOX core: pure post reconstruction and aggregation, no IO.
mod aggregate;
mod filename;
mod html;
mod ordering;
mod page;
mod reconstruct;
mod types;
mod unit;

pub use aggregate::{Aggregator, PlanNames};
pub use filename::{
    encode_extension, encode_file_name, information_file, post_dir_name, InformationFile,
};
pub use html::escape_html;
pub use ordering::resolve;
pub use page::{detect_page, PageKind};
pub use reconstruct::{reconstruct, ReconstructOptions, ReconstructedPost};
pub use types::{
    ArticleBody, Block, BodyError, EmbeddedPost, FeaturedTag, FileBody, FileInfo, ImageBody,
    ImageInfo, Plan, PostBody, PostInfo, PostType, TextBody, UrlEmbed,
};
pub use unit::{
    DownloadUnit, FileDescriptor, Information, MetadataFormat, PostEntry, UnitError,
};
