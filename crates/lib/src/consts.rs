/// Application name used for platform directories.
pub const APP_NAME: &str = "prof";

/// Length of the truncated hash used in store object names.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Name of the manifest file written into every profile generation.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// The only manifest format version this crate reads and writes.
pub const MANIFEST_VERSION: u32 = 1;

/// Priority assigned to every active element when merging a profile.
///
/// Lower values win file conflicts. Elements do not carry their own
/// priority yet, so all of them merge at this level.
pub const DEFAULT_PRIORITY: u32 = 5;

/// Store object name given to built profile generations.
pub const PROFILE_OBJECT_NAME: &str = "profile";
