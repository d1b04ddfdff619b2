//! Pipeline entry points for the CLI commands.
//!
//! - `run_crawl`: Crawl one community board and export the posts
//! - `run_youtube`: Search YouTube, optionally with captions, and export
//! - `run_caption`: Fetch the caption text of one video
//! - `authorize` and the `run_*` license commands: license gating and tooling
//! - `run_validate`: Check the configuration and external tools

pub mod crawl;
pub mod license;
pub mod validate;
pub mod youtube;

pub use crawl::run_crawl;
pub use license::{
    IssueRequest, authorize, run_activate, run_device_id, run_issue, run_keygen, run_verify,
};
pub use validate::run_validate;
pub use youtube::{YoutubeJob, run_caption, run_youtube};
