//! Native resource formats produced or updated by locsynth.
//!
//! - [`android_strings`]: Android `res/values*/strings.xml`
//! - [`strings`]: Apple `.strings` tables
//! - [`pbxproj`]: the Xcode project manifest (`project.pbxproj`)

pub mod android_strings;
pub mod pbxproj;
pub mod strings;

// Reexporting the formats for easier access
pub use android_strings::Format as AndroidStringsFormat;
pub use pbxproj::Format as PbxprojFormat;
pub use strings::{Format as StringsFormat, StringsEncoding};
