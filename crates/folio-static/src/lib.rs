//! Static site generation for folio.
//!
//! Assembles rendered documents into pages, listings and tag indexes, writes them
//! to an output root with a build report, and hands clean builds to a deployment
//! target.

pub mod assembler;
pub mod assets;
pub mod builder;
pub mod lock;
pub mod publish;
pub mod report;
pub mod templates;

pub use assembler::{Page, Site, SiteAssembler, TagCase, TagIndex};
pub use builder::{BuildConfig, BuildError, CancelFlag, DiagramMode, StaticBuilder};
pub use publish::{
    CommandTarget, DeployError, DeployTarget, DirectoryTarget, PublishOutcome, PublishTrigger,
};
pub use report::{BuildReport, ErrorKind, ReportBuilder};
